//! # Localization Tests
//!
//! Loading of the shipped translations, fallbacks, and reverse lookup of
//! button labels.

use ride_bot::config::LocalizationConfig;
use ride_bot::localization::Translator;
use std::collections::BTreeSet;
use std::fs;

fn shipped() -> LocalizationConfig {
    LocalizationConfig {
        locales_path: concat!(env!("CARGO_MANIFEST_DIR"), "/locales").to_string(),
        ..LocalizationConfig::default()
    }
}

fn message_ids(language: &str) -> BTreeSet<String> {
    let path = format!("{}/{}/main.ftl", shipped().locales_path, language);
    fs::read_to_string(path)
        .expect("locale file")
        .lines()
        .filter(|line| line.chars().next().is_some_and(|c| c.is_ascii_lowercase()))
        .filter_map(|line| line.split_once('=').map(|(id, _)| id.trim().to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipped_languages_load() {
        let translator = Translator::load(&shipped()).expect("Failed to load translations");
        assert_eq!(translator.languages(), vec!["en", "ru", "uz"]);
        assert_eq!(translator.default_language(), "en");
    }

    #[test]
    fn test_every_language_has_the_same_keys() {
        let en = message_ids("en");
        assert!(en.len() > 50);
        assert_eq!(message_ids("ru"), en);
        assert_eq!(message_ids("uz"), en);
    }

    #[test]
    fn test_message_with_args() {
        let translator = Translator::load(&shipped()).unwrap();
        let message = translator.t_args("main-menu", "en", &[("name", "Dilnoza")]);
        assert!(message.contains("Dilnoza"));
        assert!(!message.contains("{"));
    }

    #[test]
    fn test_unsupported_language_falls_back_to_default() {
        let translator = Translator::load(&shipped()).unwrap();
        assert_eq!(translator.t("btn-back", "de"), translator.t("btn-back", "en"));
        assert_eq!(translator.resolve_language(Some("ru-RU")), "ru");
        assert_eq!(translator.resolve_language(Some("de")), "en");
        assert_eq!(translator.resolve_language(None), "en");
    }

    #[test]
    fn test_missing_key_returns_the_key() {
        let translator = Translator::load(&shipped()).unwrap();
        assert_eq!(translator.t("no-such-message", "en"), "no-such-message");
    }

    #[test]
    fn test_labels_are_detected_in_every_language() {
        let translator = Translator::load(&shipped()).unwrap();
        for language in ["en", "ru", "uz"] {
            let label = translator.t("btn-cancel", language);
            let found = translator
                .detect_slug(&label, language, &["btn-back", "btn-cancel", "btn-skip"])
                .expect("label detected");
            assert_eq!(found.key, "btn-cancel");
        }
    }

    #[test]
    fn test_missing_locale_file_fails_to_load() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("en")).unwrap();
        fs::write(dir.path().join("en").join("main.ftl"), "btn-back = Back\n").unwrap();

        let config = LocalizationConfig {
            locales_path: dir.path().to_string_lossy().into_owned(),
            ..LocalizationConfig::default()
        };
        assert!(Translator::load(&config).is_err());

        let english_only = LocalizationConfig {
            supported_languages: vec!["en".to_string()],
            ..config
        };
        let translator = Translator::load(&english_only).unwrap();
        assert_eq!(translator.t("btn-back", "en"), "Back");
    }

    #[test]
    fn test_broken_ftl_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("en")).unwrap();
        fs::write(dir.path().join("en").join("main.ftl"), "btn-back = { $\n").unwrap();

        let config = LocalizationConfig {
            locales_path: dir.path().to_string_lossy().into_owned(),
            supported_languages: vec!["en".to_string()],
            ..LocalizationConfig::default()
        };
        assert!(Translator::load(&config).is_err());
    }
}
