//! Translator trait for localized text lookup.

/// Abstraction over translation tables.
///
/// Implementations fall back to their default language when `language` is
/// empty or lacks the key, and to the key itself when nothing matches.
/// `{name}` placeholders in the text are replaced from `params`.
pub trait Translator: Send + Sync {
    fn translate(&self, language: &str, key: &str, params: &[(&str, &str)]) -> String;
}
