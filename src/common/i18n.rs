// src/common/i18n.rs

use std::collections::HashMap;
use std::sync::LazyLock;

pub const DEFAULT_LANG: &str = "en";

// Catalogs are compiled into the binary, so there is nothing to ship next to it.
const EMBEDDED_CATALOGS: &[(&str, &str)] = &[
    ("en", include_str!("../../locales/en.json")),
    ("pt", include_str!("../../locales/pt.json")),
];

static EMBEDDED: LazyLock<I18nStore> = LazyLock::new(I18nStore::from_embedded);

/// Message catalogs keyed by language, then by message key.
#[derive(Debug, Clone, Default)]
pub struct I18nStore {
    catalogs: HashMap<String, HashMap<String, String>>,
}

impl I18nStore {
    pub fn from_embedded() -> Self {
        let mut catalogs = HashMap::new();

        for (lang, raw) in EMBEDDED_CATALOGS {
            match serde_json::from_str::<HashMap<String, String>>(raw) {
                Ok(messages) => {
                    catalogs.insert(lang.to_string(), messages);
                }
                Err(e) => tracing::error!("Failed to parse the '{}' message catalog: {}", lang, e),
            }
        }

        Self { catalogs }
    }

    /// Shared instance used where no application state is reachable
    /// (e.g. `IntoResponse` for bare errors).
    pub fn embedded() -> &'static I18nStore {
        &EMBEDDED
    }

    pub fn supports(&self, lang: &str) -> bool {
        self.catalogs.contains_key(lang)
    }

    /// Looks up `key` in `lang`, falling back to English and finally to the key itself.
    /// `{name}` placeholders are replaced with the matching argument.
    pub fn translate(&self, lang: &str, key: &str, args: &[(&str, String)]) -> String {
        let template = self
            .catalogs
            .get(lang)
            .and_then(|messages| messages.get(key))
            .or_else(|| self.catalogs.get(DEFAULT_LANG).and_then(|m| m.get(key)));

        let mut message = match template {
            Some(t) => t.clone(),
            None => return key.to_string(),
        };

        for (name, value) in args {
            message = message.replace(&format!("{{{}}}", name), value);
        }
        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translates_with_placeholders() {
        let store = I18nStore::from_embedded();
        let msg = store.translate("en", "resource.not_found", &[("resource", "Product".into())]);
        assert_eq!(msg, "Product not found.");
    }

    #[test]
    fn unknown_language_falls_back_to_english() {
        let store = I18nStore::from_embedded();
        assert!(!store.supports("de"));
        assert_eq!(
            store.translate("de", "auth.invalid_credentials", &[]),
            "Invalid email or password."
        );
    }

    #[test]
    fn portuguese_catalog_is_loaded() {
        let store = I18nStore::from_embedded();
        assert_eq!(
            store.translate("pt", "conflict.email_exists", &[]),
            "Este e-mail já está em uso."
        );
    }

    #[test]
    fn unknown_key_is_returned_verbatim() {
        let store = I18nStore::embedded();
        assert_eq!(store.translate("en", "no.such.key", &[]), "no.such.key");
    }

    #[test]
    fn every_catalog_has_the_same_keys() {
        let store = I18nStore::from_embedded();
        let en = &store.catalogs["en"];
        let pt = &store.catalogs["pt"];
        for key in en.keys() {
            assert!(pt.contains_key(key), "missing pt translation for {key}");
        }
        assert_eq!(en.len(), pt.len());
    }
}
