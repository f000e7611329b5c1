use std::env;

pub use switchyard_i18n::{
    DELETE_FAILED, I18nText, METHOD_NOT_ALLOWED, PASSWORD_FAILED, PASSWORD_UPDATED, SAVED,
    SAVED_UNNAMED,
};
use switchyard_i18n as shared;

pub const LOCALE_ENV: &str = "SWITCHYARD_LOCALE";

pub fn select_locale(explicit: Option<&str>) -> String {
    let env_locale = env::var(LOCALE_ENV).ok();
    let system = system_locale();
    shared::select_locale_with_sources(explicit, env_locale.as_deref(), system.as_deref())
}

pub fn resolve_message(key: &str, fallback: &str, locale: &str) -> String {
    shared::resolve_message(key, fallback, locale)
}

pub fn resolve_text(text: &I18nText, locale: &str) -> String {
    shared::resolve_text(text, locale)
}

pub fn format_message(key: &str, fallback: &str, locale: &str, args: &[(&str, &str)]) -> String {
    shared::format_message(key, fallback, locale, args)
}

fn system_locale() -> Option<String> {
    for key in ["LC_ALL", "LANG", "LC_MESSAGES"] {
        if let Ok(value) = env::var(key) {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                continue;
            }
            let stripped = trimmed.split('.').next().unwrap_or(trimmed);
            if !stripped.is_empty() {
                return Some(shared::normalize_locale(stripped));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn unknown_key_uses_fallback() {
        let message = resolve_message("switchyard.unknown", "fallback message", "en");
        assert_eq!(message, "fallback message");
    }

    #[test]
    fn text_resolves_known_key() {
        let text = I18nText::new(PASSWORD_UPDATED, "fallback");
        assert_eq!(resolve_text(&text, "en"), "Password updated");
    }

    #[test]
    fn saved_message_fills_placeholders() {
        let message = format_message(
            SAVED,
            "saved",
            "en",
            &[("verb", "created"), ("object", "channel"), ("name", "crm")],
        );
        assert_eq!(message, "Successfully created the channel [crm]");
    }

    #[test]
    #[serial]
    fn explicit_locale_beats_environment() {
        unsafe {
            env::set_var(LOCALE_ENV, "de-DE");
        }
        assert_eq!(select_locale(Some("fr")), "fr");
        assert_eq!(select_locale(None), "de");
        unsafe {
            env::remove_var(LOCALE_ENV);
        }
    }
}
