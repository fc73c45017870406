//! Locale code validation.

use crate::error::{CatalogError, CatalogResult};
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

static BCP47_REGEX: OnceLock<Regex> = OnceLock::new();

/// A locale code with BCP-47 shape: `language[-Script][-REGION]`
/// (e.g. "en", "pt-BR", "zh-Hant-TW", "es-419").
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocaleCode(String);

impl LocaleCode {
    /// Validate a locale code.
    ///
    /// # Returns
    /// * `Ok(LocaleCode)` if the code has BCP-47 shape
    /// * `Err(InvalidArgument)` otherwise
    pub fn parse(code: &str) -> CatalogResult<LocaleCode> {
        let regex = BCP47_REGEX.get_or_init(|| {
            Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z]{4})?(-([A-Za-z]{2}|[0-9]{3}))?$")
                .expect("static locale pattern")
        });

        if regex.is_match(code) {
            Ok(LocaleCode(code.to_string()))
        } else {
            Err(CatalogError::InvalidArgument(format!(
                "'{}' is not a valid locale code (expected e.g. 'fr' or 'pt-BR')",
                code
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocaleCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LocaleCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_codes() {
        for code in ["en", "es", "fil", "pt-BR", "zh-Hant", "zh-Hant-TW", "es-419"] {
            assert!(LocaleCode::parse(code).is_ok(), "{} should be valid", code);
        }
    }

    #[test]
    fn test_rejects_malformed_codes() {
        for code in ["", "e", "english", "en_US", "en-", "../en", "en-US-x", "12"] {
            assert!(
                matches!(
                    LocaleCode::parse(code),
                    Err(CatalogError::InvalidArgument(_))
                ),
                "{} should be rejected",
                code
            );
        }
    }

    #[test]
    fn test_display_round_trips() {
        let code = LocaleCode::parse("pt-BR").unwrap();
        assert_eq!(code.to_string(), "pt-BR");
        assert_eq!(code.as_str(), "pt-BR");
    }
}
