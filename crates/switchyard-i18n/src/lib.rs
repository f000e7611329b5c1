#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const SAVED: &str = "switchyard.view.saved";
pub const SAVED_UNNAMED: &str = "switchyard.view.saved_unnamed";
pub const PASSWORD_UPDATED: &str = "switchyard.view.password_updated";
pub const PASSWORD_FAILED: &str = "switchyard.view.password_failed";
pub const DELETE_FAILED: &str = "switchyard.view.delete_failed";
pub const METHOD_NOT_ALLOWED: &str = "switchyard.dispatch.method_not_allowed";

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct I18nText {
    pub message_key: String,
    pub fallback: String,
}

impl I18nText {
    pub fn new(message_key: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            message_key: message_key.into(),
            fallback: fallback.into(),
        }
    }
}

pub fn normalize_locale(value: &str) -> String {
    let lower = value.replace('_', "-").to_ascii_lowercase();
    match lower.split('-').next() {
        Some("en") => "en".to_string(),
        Some(primary) if !primary.is_empty() => primary.to_string(),
        _ => "en".to_string(),
    }
}

pub fn select_locale_with_sources(
    explicit: Option<&str>,
    env_locale: Option<&str>,
    system_locale: Option<&str>,
) -> String {
    [explicit, env_locale, system_locale]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(normalize_locale)
        .unwrap_or_else(|| "en".to_string())
}

pub fn resolve_text(text: &I18nText, locale: &str) -> String {
    resolve_message(&text.message_key, &text.fallback, locale)
}

pub fn resolve_message(key: &str, fallback: &str, locale: &str) -> String {
    let normalized = normalize_locale(locale);
    match normalized.as_str() {
        "en" => english_message(key).unwrap_or(fallback).to_string(),
        _ => fallback.to_string(),
    }
}

/// Resolves `key` and substitutes `{name}` placeholders from `args`.
///
/// Placeholders without a matching argument are left untouched.
pub fn format_message(key: &str, fallback: &str, locale: &str, args: &[(&str, &str)]) -> String {
    let mut message = resolve_message(key, fallback, locale);
    for (name, value) in args {
        message = message.replace(&format!("{{{name}}}"), value);
    }
    message
}

fn english_message(key: &str) -> Option<&'static str> {
    match key {
        SAVED => Some("Successfully {verb} the {object} [{name}]"),
        SAVED_UNNAMED => Some("Successfully {verb} the {object}"),
        PASSWORD_UPDATED => Some("Password updated"),
        PASSWORD_FAILED => Some("Could not change the password"),
        DELETE_FAILED => Some("Could not delete the {object}"),
        METHOD_NOT_ALLOWED => {
            Some("Method [{method}] is not allowed here [{view}], methods allowed:[{allowed}]")
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_message_uses_fallback_for_unknown_key() {
        let message = resolve_message("switchyard.unknown", "fallback message", "en");
        assert_eq!(message, "fallback message");
    }

    #[test]
    fn resolve_text_uses_key_and_fallback() {
        let text = I18nText::new(PASSWORD_UPDATED, "fallback");
        assert_eq!(resolve_text(&text, "en"), "Password updated");
        assert_eq!(resolve_text(&text, "de"), "fallback");
    }

    #[test]
    fn format_message_fills_placeholders() {
        let message = format_message(
            SAVED,
            "saved",
            "en-GB",
            &[("verb", "created"), ("object", "channel"), ("name", "crm")],
        );
        assert_eq!(message, "Successfully created the channel [crm]");
    }

    #[test]
    fn format_message_leaves_unknown_placeholders() {
        let message = format_message(SAVED_UNNAMED, "x", "en", &[("verb", "updated")]);
        assert_eq!(message, "Successfully updated the {object}");
    }

    #[test]
    fn normalize_locale_reduces_variants() {
        assert_eq!(normalize_locale("en-US"), "en");
        assert_eq!(normalize_locale("nl_NL"), "nl");
        assert_eq!(normalize_locale(""), "en");
    }

    #[test]
    fn select_locale_prefers_explicit_over_env_and_system() {
        assert_eq!(
            select_locale_with_sources(Some("en-US"), Some("fr-FR"), Some("nl_NL.UTF-8")),
            "en"
        );
    }

    #[test]
    fn select_locale_skips_blank_sources() {
        assert_eq!(
            select_locale_with_sources(Some("  "), Some("de-DE"), Some("nl_NL")),
            "de"
        );
        assert_eq!(select_locale_with_sources(None, None, None), "en");
    }
}
