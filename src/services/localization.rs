use lazy_static::lazy_static;
use std::collections::HashMap;

type Table = HashMap<String, String>;

lazy_static! {
    static ref LOCALES: HashMap<&'static str, Table> = {
        let mut locales = HashMap::new();
        for (name, raw) in [
            ("en-US", include_str!("../../locales/en-US.json")),
            ("es-US", include_str!("../../locales/es-US.json")),
        ] {
            match serde_json::from_str::<Table>(raw) {
                Ok(table) => {
                    locales.insert(name, table);
                }
                Err(e) => log::error!("❌ Locale {} failed to load: {}", name, e),
            }
        }
        locales
    };
}

/// Key based message lookup with `{{name}}` interpolation.
#[derive(Debug, Clone)]
pub struct Localization {
    default_locale: String,
}

impl Localization {
    pub fn new(default_locale: &str) -> Self {
        Localization { default_locale: default_locale.to_string() }
    }

    /// Best supported locale for a request. Accepts a raw `Accept-Language`
    /// header; only its language tags are considered, in order.
    pub fn negotiate(&self, accept_language: Option<&str>) -> String {
        let Some(header) = accept_language else {
            return self.default_locale.clone();
        };
        for tag in header.split(',').map(|t| t.split(';').next().unwrap_or("").trim()) {
            if let Some(exact) = LOCALES.keys().find(|l| l.eq_ignore_ascii_case(tag)) {
                return exact.to_string();
            }
            let language = tag.split('-').next().unwrap_or("");
            if language.is_empty() {
                continue;
            }
            let mut candidates: Vec<&&str> = LOCALES
                .keys()
                .filter(|l| l.split('-').next().map_or(false, |p| p.eq_ignore_ascii_case(language)))
                .collect();
            candidates.sort();
            if let Some(found) = candidates.first() {
                return found.to_string();
            }
        }
        self.default_locale.clone()
    }

    pub fn t(&self, key: &str, locale: &str, args: &[(&str, &str)]) -> String {
        let template = LOCALES
            .get(locale)
            .and_then(|table| table.get(key))
            .or_else(|| LOCALES.get(self.default_locale.as_str()).and_then(|t| t.get(key)));

        match template {
            Some(template) => interpolate(template, args),
            None => {
                log::warn!("Missing localization key {} ({})", key, locale);
                key.to_string()
            }
        }
    }
}

fn interpolate(template: &str, args: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in args {
        out = out.replace(&format!("{{{{{}}}}}", name), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_named_arguments() {
        let l10n = Localization::new("en-US");
        assert_eq!(
            l10n.t("createNewTag.labelExists", "en-US", &[("label", "Food")]),
            "A tag named Food already exists"
        );
    }

    #[test]
    fn falls_back_to_default_locale_then_key() {
        let l10n = Localization::new("en-US");
        assert_eq!(l10n.t("createService.success", "es-US", &[]), "Servicio creado");
        assert_eq!(l10n.t("tag.notFound", "es-US", &[]), "Etiqueta no encontrada");
        assert_eq!(l10n.t("no.such.key", "en-US", &[]), "no.such.key");
        assert_eq!(l10n.t("tag.notFound", "fr-FR", &[]), "Tag not found");
    }

    #[test]
    fn every_locale_has_the_same_keys() {
        let english: Vec<&String> = {
            let mut keys: Vec<_> = LOCALES["en-US"].keys().collect();
            keys.sort();
            keys
        };
        assert_eq!(LOCALES.len(), 2);
        for (name, table) in LOCALES.iter() {
            let mut keys: Vec<_> = table.keys().collect();
            keys.sort();
            assert_eq!(keys, english, "{} differs from en-US", name);
        }
    }

    #[test]
    fn placeholders_match_across_locales() {
        let placeholders = |text: &str| -> Vec<String> {
            let mut found: Vec<String> = text
                .split("{{")
                .skip(1)
                .filter_map(|rest| rest.split_once("}}").map(|(name, _)| name.to_string()))
                .collect();
            found.sort();
            found
        };
        for (key, english) in LOCALES["en-US"].iter() {
            let spanish = &LOCALES["es-US"][key];
            assert_eq!(placeholders(english), placeholders(spanish), "{}", key);
        }
    }

    #[test]
    fn negotiates_accept_language() {
        let l10n = Localization::new("en-US");
        assert_eq!(l10n.negotiate(Some("es-MX,es;q=0.9")), "es-US");
        assert_eq!(l10n.negotiate(Some("fr-FR")), "en-US");
        assert_eq!(l10n.negotiate(Some("en-us")), "en-US");
        assert_eq!(l10n.negotiate(None), "en-US");
    }
}
