//! Conversions between the typed values in this crate and SQLite columns.
//!
//! Every value is stored as `TEXT`. Decoding re-runs validation, so a row
//! written by an older tool with an empty key surfaces as a conversion error
//! instead of a silently invalid value.

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

use crate::{ChannelId, GuildId, Locale, Prefix, RoleId, Site, UserId};

/// Escape character used by every `LIKE` pattern built with [`escape_like`].
pub const LIKE_ESCAPE: char = '\\';

macro_rules! text_column {
    ($($name:ident),*) => {
        $(
            impl ToSql for $name {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.as_str()))
                }
            }

            impl FromSql for $name {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    let raw = value.as_str()?;
                    $name::new(raw).map_err(|e| FromSqlError::Other(Box::new(e)))
                }
            }
        )*
    };
}

text_column!(GuildId, UserId, ChannelId, RoleId, Site, Prefix, Locale);

/// Escapes `LIKE` metacharacters so `input` only matches itself.
///
/// `%`, `_` and the escape character are each prefixed with [`LIKE_ESCAPE`].
/// The resulting pattern must be used with `ESCAPE '\'`.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if ch == '%' || ch == '_' || ch == LIKE_ESCAPE {
            escaped.push(LIKE_ESCAPE);
        }
        escaped.push(ch);
    }
    escaped
}

/// Builds a `LIKE` pattern matching any value that contains `input`.
pub fn contains_pattern(input: &str) -> String {
    format!("%{}%", escape_like(input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn escape_like_handles_metacharacters() {
        assert_eq!(escape_like("cat"), "cat");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("cat_girl"), "cat\\_girl");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
        assert_eq!(contains_pattern("_"), "%\\_%");
    }

    #[test]
    fn escaped_pattern_matches_literally() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        let matches = |value: &str, input: &str| -> bool {
            conn.query_row(
                "SELECT ?1 LIKE ?2 ESCAPE '\\'",
                [value, contains_pattern(input).as_str()],
                |row| row.get(0),
            )
            .expect("like query should run")
        };

        assert!(matches("cat_girl", "_"));
        assert!(!matches("catgirl", "_"));
        assert!(!matches("anything", "%"));
        assert!(matches("50%off", "%"));
    }

    #[test]
    fn ids_round_trip_through_sqlite() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        let guild = GuildId::new("1234").expect("valid guild");
        let back: GuildId = conn
            .query_row("SELECT ?1", [&guild], |row| row.get(0))
            .expect("select should succeed");
        assert_eq!(back, guild);
    }

    #[test]
    fn decoding_rejects_invalid_stored_values() {
        let conn = Connection::open_in_memory().expect("should open in-memory db");
        let err = conn
            .query_row("SELECT ''", [], |row| row.get::<_, GuildId>(0))
            .expect_err("empty guild id must not decode");
        assert!(
            matches!(err, rusqlite::Error::FromSqlConversionFailure(..)),
            "unexpected error: {err:?}"
        );
    }
}
