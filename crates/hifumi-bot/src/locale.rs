//! Localized reply templates.
//!
//! English ships inside the binary. Additional `<locale>.json` files in the
//! language directory are layered on top, and may also override English
//! keys. A key missing from the requested locale falls back to the default
//! locale and finally to the key itself.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::ports::Localizer;

const BUILTIN_LOCALE: &str = "en";
const BUILTIN_TABLE: &str = include_str!("language/en.json");

/// Errors from loading language files.
#[derive(Debug, Error)]
pub enum LanguageError {
    #[error("failed to read language file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse language file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// All loaded templates, keyed by locale then by message key.
#[derive(Debug, Clone, Default)]
pub struct LanguageTable {
    locales: HashMap<String, HashMap<String, String>>,
}

impl LanguageTable {
    /// The table with only the built-in English templates.
    pub fn builtin() -> Self {
        let mut table = Self::default();
        // The embedded file is checked by `builtin_table_parses`.
        if let Ok(entries) = serde_json::from_str(BUILTIN_TABLE) {
            table.locales.insert(BUILTIN_LOCALE.to_string(), entries);
        }
        table
    }

    /// Loads every `*.json` file in `dir` on top of the built-in table.
    ///
    /// A missing directory is not an error; the built-in table is returned.
    ///
    /// # Errors
    ///
    /// Returns `LanguageError` if a file cannot be read or is not a flat
    /// JSON object of strings.
    pub fn load_dir(dir: &Path) -> Result<Self, LanguageError> {
        let mut table = Self::builtin();

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(dir = %dir.display(), "language directory not found, using built-in English");
                return Ok(table);
            }
            Err(source) => {
                return Err(LanguageError::Read {
                    path: dir.to_path_buf(),
                    source,
                })
            }
        };

        for entry in entries {
            let path = entry
                .map_err(|source| LanguageError::Read {
                    path: dir.to_path_buf(),
                    source,
                })?
                .path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(locale) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            let locale = locale.to_string();

            let contents = std::fs::read_to_string(&path).map_err(|source| LanguageError::Read {
                path: path.clone(),
                source,
            })?;
            let templates: HashMap<String, String> =
                serde_json::from_str(&contents).map_err(|source| LanguageError::Parse {
                    path: path.clone(),
                    source,
                })?;

            tracing::debug!(locale = %locale, keys = templates.len(), "loaded language file");
            table.locales.entry(locale).or_default().extend(templates);
        }

        Ok(table)
    }
}

impl Localizer for LanguageTable {
    fn lookup(&self, locale: &str, key: &str) -> Option<&str> {
        self.locales.get(locale)?.get(key).map(String::as_str)
    }

    fn has_locale(&self, locale: &str) -> bool {
        self.locales.contains_key(locale)
    }

    fn locales(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.locales.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Looks up `key` for `locale`, falling back to `default_locale` and then to
/// the key itself, and fills in `{0}`, `{1}`... from `args`.
pub fn localize<L>(
    localizer: &L,
    locale: &str,
    default_locale: &str,
    key: &str,
    args: &[&str],
) -> String
where
    L: Localizer + ?Sized,
{
    let template = localizer
        .lookup(locale, key)
        .or_else(|| localizer.lookup(default_locale, key))
        .unwrap_or(key);
    format_template(template, args)
}

/// Substitutes positional `{n}` placeholders. Placeholders without a
/// matching argument are left as written.
pub fn format_template(template: &str, args: &[&str]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let substituted = after.find('}').and_then(|close| {
            let index: usize = after[..close].parse().ok()?;
            let arg = args.get(index)?;
            Some((arg, close))
        });
        match substituted {
            Some((arg, close)) => {
                out.push_str(arg);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_parses() {
        serde_json::from_str::<HashMap<String, String>>(BUILTIN_TABLE)
            .expect("embedded English table must be a flat string map");
        let table = LanguageTable::builtin();
        assert!(table.has_locale("en"));
        assert!(table.lookup("en", "guild_only").is_some());
    }

    #[test]
    fn format_template_fills_positional_args() {
        assert_eq!(format_template("{0} has {1}", &["a", "2"]), "a has 2");
        assert_eq!(format_template("{1}{0}{1}", &["x", "y"]), "yxy");
        assert_eq!(format_template("no args {2}", &["x"]), "no args {2}");
        assert_eq!(format_template("braces {} {x} {", &["a"]), "braces {} {x} {");
    }

    #[test]
    fn lookup_falls_back_to_default_then_key() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ja.json"), r#"{"prefix_set": "設定: {0}"}"#).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let table = LanguageTable::load_dir(dir.path()).expect("load should succeed");
        assert_eq!(table.locales(), ["en", "ja"]);

        assert_eq!(localize(&table, "ja", "en", "prefix_set", &["?"]), "設定: ?");
        assert_eq!(
            localize(&table, "ja", "en", "guild_only", &[]),
            "This command can only be used in a server."
        );
        assert_eq!(localize(&table, "fr", "en", "no_such_key", &[]), "no_such_key");
    }

    #[test]
    fn missing_directory_yields_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let table = LanguageTable::load_dir(&dir.path().join("absent")).expect("not an error");
        assert_eq!(table.locales(), ["en"]);
    }

    #[test]
    fn malformed_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("de.json"), "[1, 2]").unwrap();

        let err = LanguageTable::load_dir(dir.path()).expect_err("array is not a table");
        assert!(matches!(err, LanguageError::Parse { .. }));
    }
}
