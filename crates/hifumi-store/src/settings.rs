//! Per-guild command prefix and locale records.
//!
//! Both tables hold at most one row per guild. Writes replace the row
//! wholesale; deletes of a missing row are no-ops.

use std::str::FromStr;

use hifumi_types::{GuildId, Locale, Prefix};
use rusqlite::{params, Connection, OptionalExtension};

use crate::legacy;

/// Returns the guild's configured prefix, if any. A stored prefix that no
/// longer validates reads as unset.
pub fn get_prefix(conn: &Connection, guild: &GuildId) -> rusqlite::Result<Option<Prefix>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT prefix FROM prefix WHERE server = ?1",
            [guild],
            |row| row.get(0),
        )
        .optional()?;
    Ok(raw.and_then(|raw| legacy::decode("prefix", &raw, Prefix::from_str)))
}

/// Sets or replaces the guild's prefix.
pub fn set_prefix(conn: &Connection, guild: &GuildId, prefix: &Prefix) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO prefix (server, prefix) VALUES (?1, ?2)
         ON CONFLICT (server) DO UPDATE SET prefix = excluded.prefix",
        params![guild, prefix],
    )?;
    Ok(())
}

/// Removes the guild's prefix. Returns `true` if a row was deleted.
pub fn delete_prefix(conn: &Connection, guild: &GuildId) -> rusqlite::Result<bool> {
    let count = conn.execute("DELETE FROM prefix WHERE server = ?1", [guild])?;
    Ok(count > 0)
}

/// Returns the guild's configured locale, if any. A stored locale that no
/// longer validates reads as unset.
pub fn get_language(conn: &Connection, guild: &GuildId) -> rusqlite::Result<Option<Locale>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT lan FROM language WHERE server = ?1",
            [guild],
            |row| row.get(0),
        )
        .optional()?;
    Ok(raw.and_then(|raw| legacy::decode("language", &raw, Locale::from_str)))
}

/// Sets or replaces the guild's locale.
pub fn set_language(conn: &Connection, guild: &GuildId, locale: &Locale) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO language (server, lan) VALUES (?1, ?2)
         ON CONFLICT (server) DO UPDATE SET lan = excluded.lan",
        params![guild, locale],
    )?;
    Ok(())
}

/// Removes the guild's locale. Returns `true` if a row was deleted.
pub fn delete_language(conn: &Connection, guild: &GuildId) -> rusqlite::Result<bool> {
    let count = conn.execute("DELETE FROM language WHERE server = ?1", [guild])?;
    Ok(count > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hifumi_db::run_migrations;

    fn setup_db() -> Connection {
        let conn = Connection::open_in_memory().expect("failed to open in-memory db");
        run_migrations(&conn).expect("failed to run migrations");
        conn
    }

    fn guild(id: &str) -> GuildId {
        GuildId::new(id).expect("valid guild id")
    }

    #[test]
    fn test_prefix_crud() {
        let conn = setup_db();
        let g = guild("100");

        assert_eq!(get_prefix(&conn, &g).expect("get failed"), None);

        set_prefix(&conn, &g, &Prefix::new("?").unwrap()).expect("set failed");
        assert_eq!(
            get_prefix(&conn, &g).expect("get failed"),
            Some(Prefix::new("?").unwrap())
        );

        // Last writer wins.
        set_prefix(&conn, &g, &Prefix::new("$").unwrap()).expect("replace failed");
        assert_eq!(
            get_prefix(&conn, &g).expect("get failed"),
            Some(Prefix::new("$").unwrap())
        );

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM prefix WHERE server = '100'", [], |row| {
                row.get(0)
            })
            .expect("count failed");
        assert_eq!(rows, 1, "at most one prefix row per guild");

        assert!(delete_prefix(&conn, &g).expect("delete failed"));
        assert_eq!(get_prefix(&conn, &g).expect("get failed"), None);
        assert!(!delete_prefix(&conn, &g).expect("second delete failed"));
    }

    #[test]
    fn test_language_crud() {
        let conn = setup_db();
        let g = guild("200");

        assert_eq!(get_language(&conn, &g).expect("get failed"), None);

        set_language(&conn, &g, &Locale::new("ja").unwrap()).expect("set failed");
        assert_eq!(
            get_language(&conn, &g).expect("get failed"),
            Some(Locale::new("ja").unwrap())
        );

        assert!(delete_language(&conn, &g).expect("delete failed"));
        assert_eq!(get_language(&conn, &g).expect("get failed"), None);
    }

    #[test]
    fn test_guilds_are_isolated() {
        let conn = setup_db();
        set_prefix(&conn, &guild("1"), &Prefix::new("!").unwrap()).expect("set failed");
        assert_eq!(get_prefix(&conn, &guild("2")).expect("get failed"), None);
    }

    #[test]
    fn legacy_values_that_fail_validation_read_as_unset() {
        let conn = setup_db();
        let g = guild("100");
        conn.execute_batch(
            "INSERT INTO prefix (server, prefix) VALUES ('100', 'hey bot ');
             INSERT INTO language (server, lan) VALUES ('100', 'english (us)');",
        )
        .expect("legacy rows should insert");

        assert_eq!(get_prefix(&conn, &g).expect("get failed"), None);
        assert_eq!(get_language(&conn, &g).expect("get failed"), None);

        set_prefix(&conn, &g, &Prefix::new("!").unwrap()).expect("set failed");
        assert_eq!(
            get_prefix(&conn, &g).expect("get failed"),
            Some(Prefix::new("!").unwrap())
        );
    }
}
