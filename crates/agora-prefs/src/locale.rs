//! Supported locales and the context that carries the device locale.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PrefsError;

/// Locale used when nothing better can be detected.
pub const DEFAULT_LOCALE: Locale = Locale::English;

/// Environment variables consulted for the device locale, highest priority first.
const LOCALE_ENV_VARS: [&str; 3] = ["LC_ALL", "LC_MESSAGES", "LANG"];

/// Locales the app ships translations for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// English.
    #[default]
    English,
    /// French.
    French,
    /// Spanish.
    Spanish,
}

impl Locale {
    /// All supported locales in display order.
    pub const ALL: [Self; 3] = [Self::English, Self::French, Self::Spanish];

    /// Two-letter language code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::English => "en",
            Self::French => "fr",
            Self::Spanish => "es",
        }
    }

    /// Stable identifier used on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::English => "english",
            Self::French => "french",
            Self::Spanish => "spanish",
        }
    }

    /// Map a language tag such as `fr`, `fr-CA`, or `fr_FR.UTF-8` to a locale.
    #[must_use]
    pub fn from_lang_tag(tag: &str) -> Option<Self> {
        let primary = tag
            .split(['-', '_', '.', '@'])
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|locale| locale.code() == primary)
    }
}

impl Display for Locale {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = PrefsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|locale| locale.as_str() == normalized)
            .or_else(|| Self::from_lang_tag(&normalized))
            .ok_or_else(|| PrefsError::UnknownLocale {
                value: value.to_string(),
            })
    }
}

/// Locale information handed to the store instead of a process-wide global.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocaleContext {
    device: Locale,
}

impl LocaleContext {
    /// Context with an explicit device locale.
    #[must_use]
    pub const fn new(device: Locale) -> Self {
        Self { device }
    }

    /// Detect the device locale from the POSIX locale variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_env_values(
            LOCALE_ENV_VARS
                .iter()
                .map(|name| std::env::var(name).ok()),
        )
    }

    /// The first non-empty value decides, matching POSIX precedence.
    fn from_env_values(values: impl IntoIterator<Item = Option<String>>) -> Self {
        let device = values
            .into_iter()
            .flatten()
            .find(|value| !value.trim().is_empty())
            .and_then(|value| Locale::from_lang_tag(&value))
            .unwrap_or(DEFAULT_LOCALE);
        Self { device }
    }

    /// Locale the device reports; used for fresh snapshots.
    #[must_use]
    pub const fn device(&self) -> Locale {
        self.device
    }

    /// Locales a picker may offer.
    #[must_use]
    pub const fn supported(&self) -> &'static [Locale] {
        &Locale::ALL
    }
}

impl Default for LocaleContext {
    fn default() -> Self {
        Self::new(DEFAULT_LOCALE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lang_tags_map_to_locales() {
        assert_eq!(Locale::from_lang_tag("fr_FR.UTF-8"), Some(Locale::French));
        assert_eq!(Locale::from_lang_tag("es-MX"), Some(Locale::Spanish));
        assert_eq!(Locale::from_lang_tag("EN"), Some(Locale::English));
        assert_eq!(Locale::from_lang_tag("de_DE"), None);
        assert_eq!(Locale::from_lang_tag("C"), None);
    }

    #[test]
    fn parses_wire_names_and_codes() {
        assert_eq!("spanish".parse::<Locale>().ok(), Some(Locale::Spanish));
        assert_eq!(" French ".parse::<Locale>().ok(), Some(Locale::French));
        assert_eq!("en".parse::<Locale>().ok(), Some(Locale::English));
        assert_eq!(
            "klingon".parse::<Locale>(),
            Err(PrefsError::UnknownLocale {
                value: "klingon".into()
            })
        );
    }

    #[test]
    fn env_precedence_uses_first_non_empty_value() {
        let ctx = LocaleContext::from_env_values([
            None,
            Some(String::new()),
            Some("es_ES.UTF-8".into()),
        ]);
        assert_eq!(ctx.device(), Locale::Spanish);

        let posix = LocaleContext::from_env_values([Some("C".into()), Some("fr_FR".into())]);
        assert_eq!(posix.device(), DEFAULT_LOCALE);

        let empty = LocaleContext::from_env_values([None, None, None]);
        assert_eq!(empty.device(), DEFAULT_LOCALE);
    }

    #[test]
    fn supported_lists_every_locale() {
        assert_eq!(LocaleContext::default().supported(), &Locale::ALL);
    }
}
