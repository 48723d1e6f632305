//! # Localization
//!
//! Fluent bundles loaded from `{locales_path}/{lang}/main.ftl`, one per
//! supported language, plus a reverse index from rendered labels back to
//! their message ids for slug detection.

use crate::config::LocalizationConfig;
use crate::errors::{AppError, AppResult};
use crate::slug_detection::{self, SlugMatch};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use unic_langid::LanguageIdentifier;

lazy_static! {
    static ref MESSAGE_ID: Regex =
        Regex::new(r"(?m)^([a-zA-Z][a-zA-Z0-9_-]*)\s*=").expect("valid message id regex");
}

/// Translation lookup shared by every handler
pub struct Translator {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
    /// `(label, message id)` per language
    labels: HashMap<String, Vec<(String, String)>>,
    default_language: String,
    slug_threshold: f64,
}

impl std::fmt::Debug for Translator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Translator")
            .field("languages", &self.languages())
            .field("default_language", &self.default_language)
            .finish()
    }
}

impl Translator {
    /// Load every supported language from disk.
    ///
    /// A missing or unparsable file is an error; the caller treats it as fatal.
    pub fn load(config: &LocalizationConfig) -> AppResult<Self> {
        let mut sources = Vec::with_capacity(config.supported_languages.len());
        for language in &config.supported_languages {
            let path = Path::new(&config.locales_path)
                .join(language)
                .join("main.ftl");
            let content = fs::read_to_string(&path).map_err(|e| {
                AppError::Translation(format!(
                    "Failed to read translations {}: {}",
                    path.display(),
                    e
                ))
            })?;
            sources.push((language.clone(), content));
        }

        let translator = Self::from_sources(
            &config.default_language,
            config.slug_threshold,
            sources,
        )?;

        tracing::info!(
            languages = ?translator.languages(),
            path = %config.locales_path,
            "Translations loaded"
        );

        Ok(translator)
    }

    /// Build a translator from in-memory FTL sources, keyed by language code
    pub fn from_sources<I>(default_language: &str, slug_threshold: f64, sources: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut bundles = HashMap::new();
        let mut labels = HashMap::new();

        for (language, content) in sources {
            let ids: Vec<String> = MESSAGE_ID
                .captures_iter(&content)
                .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
                .collect();

            let bundle = Self::create_bundle(&language, content)?;

            let mut language_labels = Vec::with_capacity(ids.len());
            for id in ids {
                if let Some(label) = Self::format(&bundle, &id, None) {
                    language_labels.push((label, id));
                }
            }

            labels.insert(language.clone(), language_labels);
            bundles.insert(language, bundle);
        }

        if !bundles.contains_key(default_language) {
            return Err(AppError::Translation(format!(
                "No translations for default language '{}'",
                default_language
            )));
        }

        Ok(Self {
            bundles,
            labels,
            default_language: default_language.to_string(),
            slug_threshold,
        })
    }

    /// Create a fluent bundle for a specific locale
    fn create_bundle(language: &str, content: String) -> AppResult<FluentBundle<FluentResource>> {
        let locale: LanguageIdentifier = language.parse().map_err(|e| {
            AppError::Translation(format!("Invalid language code '{}': {:?}", language, e))
        })?;

        let resource = FluentResource::try_new(content).map_err(|(_, errors)| {
            AppError::Translation(format!(
                "Failed to parse translations for '{}': {:?}",
                language, errors
            ))
        })?;

        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        bundle.set_use_isolating(false);
        bundle.add_resource(resource).map_err(|errors| {
            AppError::Translation(format!(
                "Duplicate messages in translations for '{}': {:?}",
                language, errors
            ))
        })?;

        Ok(bundle)
    }

    /// Render one message; `None` when absent or when formatting reported errors
    fn format(
        bundle: &FluentBundle<FluentResource>,
        key: &str,
        args: Option<&FluentArgs>,
    ) -> Option<String> {
        let message = bundle.get_message(key)?;
        let pattern = message.value()?;
        let mut errors = vec![];
        let value = bundle.format_pattern(pattern, args, &mut errors);
        if errors.is_empty() {
            Some(value.into_owned())
        } else {
            None
        }
    }

    fn bundle_for(&self, language: &str) -> Option<&FluentBundle<FluentResource>> {
        self.bundles
            .get(language)
            .or_else(|| self.bundles.get(&self.default_language))
    }

    /// Get a localized message
    pub fn t(&self, key: &str, language: &str) -> String {
        self.t_args(key, language, &[])
    }

    /// Get a localized message with named arguments
    pub fn t_args(&self, key: &str, language: &str, args: &[(&str, &str)]) -> String {
        let Some(bundle) = self.bundle_for(language) else {
            return key.to_string();
        };

        let Some(pattern) = bundle.get_message(key).and_then(|m| m.value()) else {
            tracing::warn!(key = %key, language = %language, "Missing translation");
            return key.to_string();
        };

        let fluent_args = if args.is_empty() {
            None
        } else {
            let mut fluent_args = FluentArgs::new();
            for (name, value) in args {
                fluent_args.set(*name, FluentValue::from(*value));
            }
            Some(fluent_args)
        };

        let mut errors = vec![];
        let value = bundle.format_pattern(pattern, fluent_args.as_ref(), &mut errors);
        if !errors.is_empty() {
            tracing::warn!(key = %key, language = %language, errors = ?errors, "Translation formatted with errors");
        }
        value.into_owned()
    }

    /// Whether `key` exists for `language`
    pub fn has_key(&self, key: &str, language: &str) -> bool {
        self.bundles
            .get(language)
            .is_some_and(|b| b.has_message(key))
    }

    /// Check if a language is supported
    pub fn is_supported(&self, language: &str) -> bool {
        self.bundles.contains_key(language)
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    /// Supported language codes, sorted
    pub fn languages(&self) -> Vec<String> {
        let mut languages: Vec<String> = self.bundles.keys().cloned().collect();
        languages.sort();
        languages
    }

    /// Map a Telegram language code (`ru-RU`, `uz`) to a supported language
    pub fn resolve_language(&self, code: Option<&str>) -> String {
        code.and_then(|c| c.split(['-', '_']).next())
            .map(|c| c.to_lowercase())
            .filter(|c| self.is_supported(c))
            .unwrap_or_else(|| self.default_language.clone())
    }

    /// Reverse lookup of free text to a message id.
    ///
    /// Only ids listed in `keys` are considered; an empty slice searches all
    /// labels of the language.
    pub fn detect_slug(&self, text: &str, language: &str, keys: &[&str]) -> Option<SlugMatch> {
        let labels = self
            .labels
            .get(language)
            .or_else(|| self.labels.get(&self.default_language))?;

        let candidates = labels
            .iter()
            .filter(|(_, id)| keys.is_empty() || keys.contains(&id.as_str()))
            .map(|(label, id)| (label.as_str(), id.as_str()));

        slug_detection::detect_slug(text, candidates, self.slug_threshold)
    }

    pub fn slug_threshold(&self) -> f64 {
        self.slug_threshold
    }
}
