//! TOML-backed translation tables.
//!
//! Each `{lang}.toml` file in the translations directory is a flat table of
//! `key = "text with {param}"` entries. A bare language hint such as `en`
//! resolves to the first loaded tag it prefixes (`en-US`). Lookups fall back
//! to the default language, then to a small built-in English table, then to
//! the key itself.

use std::collections::HashMap;
use std::path::Path;

use huddle_core::service::translate::Translator;

/// Built-in texts for the keys the session coordinator emits.
const BUILTIN: &[(&str, &str)] = &[
    ("session_summary", "Players in session: {players}\nInvite link: {invite}"),
    ("theme_spy", "You are the spy"),
    ("theme_dealt", "Your card: {theme}"),
    ("spyfall_role", "Location: {location}\nYour role: {role}"),
    ("number_dealt", "Your number: {number}"),
];

type Table = HashMap<String, String>;

/// In-memory translation tables keyed by language tag.
pub struct TomlTranslator {
    default_language: String,
    tables: HashMap<String, Table>,
}

impl TomlTranslator {
    /// A translator with only the built-in texts.
    pub fn new(default_language: impl Into<String>) -> Self {
        Self {
            default_language: default_language.into(),
            tables: HashMap::new(),
        }
    }

    /// Load every `*.toml` file in `dir`. Unreadable or malformed files are
    /// skipped with a warning; a missing directory yields the built-ins only.
    pub async fn load(dir: &Path, default_language: &str) -> Self {
        let mut translator = Self::new(default_language);

        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(err) => {
                tracing::warn!(
                    "Cannot read translations directory {}: {err}, using built-in texts",
                    dir.display()
                );
                return translator;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!("Error listing {}: {err}", dir.display());
                    break;
                }
            };
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            let Some(language) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string)
            else {
                continue;
            };

            let content = match tokio::fs::read_to_string(&path).await {
                Ok(content) => content,
                Err(err) => {
                    tracing::warn!("Failed to read {}: {err}, skipping", path.display());
                    continue;
                }
            };
            match toml::from_str::<Table>(&content) {
                Ok(table) => {
                    tracing::debug!(language = %language, keys = table.len(), "translations loaded");
                    translator.tables.insert(language, table);
                }
                Err(err) => {
                    tracing::warn!("Failed to parse {}: {err}, skipping", path.display());
                }
            }
        }

        translator
    }

    /// Register a table directly.
    pub fn with_table(mut self, language: impl Into<String>, table: Table) -> Self {
        self.tables.insert(language.into(), table);
        self
    }

    /// Languages with a loaded table, sorted.
    pub fn languages(&self) -> Vec<&str> {
        let mut languages: Vec<&str> = self.tables.keys().map(String::as_str).collect();
        languages.sort_unstable();
        languages
    }

    /// The loaded tag to use for `language`: an exact match, else the first
    /// tag (in sorted order) that `language` prefixes.
    fn closest_language<'a>(&'a self, language: &'a str) -> Option<&'a str> {
        if language.is_empty() {
            return None;
        }
        if self.tables.contains_key(language) {
            return Some(language);
        }
        self.languages()
            .into_iter()
            .find(|tag| tag.starts_with(language))
    }

    fn lookup(&self, language: &str, key: &str) -> Option<&str> {
        [language, self.default_language.as_str()]
            .into_iter()
            .filter_map(|lang| self.closest_language(lang))
            .find_map(|lang| self.tables.get(lang).and_then(|t| t.get(key)))
            .map(String::as_str)
            .or_else(|| {
                BUILTIN
                    .iter()
                    .find(|(builtin, _)| *builtin == key)
                    .map(|(_, text)| *text)
            })
    }
}

impl Translator for TomlTranslator {
    fn translate(&self, language: &str, key: &str, params: &[(&str, &str)]) -> String {
        let Some(template) = self.lookup(language, key) else {
            tracing::debug!(language, key, "missing translation");
            return key.to_string();
        };
        params
            .iter()
            .fold(template.to_string(), |text, (name, value)| {
                text.replace(&format!("{{{name}}}"), value)
            })
    }
}
