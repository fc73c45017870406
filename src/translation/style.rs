//! Per-locale style instructions for the translation model.

/// Language name and register guidance for one locale.
#[derive(Debug, Clone, Copy)]
pub struct LocaleStyle {
    /// Locale code or bare language code (e.g. "pt-BR", "de")
    pub code: &'static str,

    /// English name of the language variant
    pub name: &'static str,

    /// Formality register and regional conventions
    pub instruction: &'static str,
}

const STYLES: &[LocaleStyle] = &[
    LocaleStyle {
        code: "en",
        name: "English",
        instruction: "Use clear, friendly US English.",
    },
    LocaleStyle {
        code: "en-GB",
        name: "British English",
        instruction: "Use British spelling and vocabulary (colour, organise, flat).",
    },
    LocaleStyle {
        code: "es",
        name: "Spanish",
        instruction: "Use neutral international Spanish and address the user informally with \"tú\".",
    },
    LocaleStyle {
        code: "es-MX",
        name: "Mexican Spanish",
        instruction: "Use Mexican Spanish vocabulary and address the user informally with \"tú\".",
    },
    LocaleStyle {
        code: "es-419",
        name: "Latin American Spanish",
        instruction: "Use Latin American Spanish, avoid Spain-only terms, address the user with \"tú\".",
    },
    LocaleStyle {
        code: "fr",
        name: "French",
        instruction: "Use standard French and address the user formally with \"vous\". Use French typographic spacing before : ; ? !",
    },
    LocaleStyle {
        code: "fr-CA",
        name: "Canadian French",
        instruction: "Use Canadian French vocabulary and address the user with \"vous\".",
    },
    LocaleStyle {
        code: "de",
        name: "German",
        instruction: "Use standard German and address the user formally with \"Sie\".",
    },
    LocaleStyle {
        code: "it",
        name: "Italian",
        instruction: "Use standard Italian and address the user informally with \"tu\".",
    },
    LocaleStyle {
        code: "pt",
        name: "European Portuguese",
        instruction: "Use European Portuguese spelling and vocabulary.",
    },
    LocaleStyle {
        code: "pt-BR",
        name: "Brazilian Portuguese",
        instruction: "Use Brazilian Portuguese and address the user with \"você\".",
    },
    LocaleStyle {
        code: "nl",
        name: "Dutch",
        instruction: "Use standard Dutch and address the user informally with \"je\".",
    },
    LocaleStyle {
        code: "pl",
        name: "Polish",
        instruction: "Use standard Polish with a polite but direct tone.",
    },
    LocaleStyle {
        code: "ru",
        name: "Russian",
        instruction: "Use standard Russian and address the user formally with \"вы\".",
    },
    LocaleStyle {
        code: "tr",
        name: "Turkish",
        instruction: "Use standard Turkish and address the user formally with \"siz\".",
    },
    LocaleStyle {
        code: "ja",
        name: "Japanese",
        instruction: "Use polite Japanese (desu/masu form). Do not add spaces between words.",
    },
    LocaleStyle {
        code: "ko",
        name: "Korean",
        instruction: "Use polite Korean (haeyo-che).",
    },
    LocaleStyle {
        code: "zh",
        name: "Simplified Chinese",
        instruction: "Use Simplified Chinese characters as used in mainland China.",
    },
    LocaleStyle {
        code: "zh-TW",
        name: "Traditional Chinese",
        instruction: "Use Traditional Chinese characters and Taiwanese vocabulary.",
    },
    LocaleStyle {
        code: "ar",
        name: "Arabic",
        instruction: "Use Modern Standard Arabic.",
    },
    LocaleStyle {
        code: "hi",
        name: "Hindi",
        instruction: "Use standard Hindi in Devanagari script; keep common English tech terms.",
    },
];

const NEUTRAL_INSTRUCTION: &str =
    "Use the standard written form of the language with a polite, neutral register.";

/// Look up a style by exact code, then by the bare language subtag.
pub fn lookup(code: &str) -> Option<&'static LocaleStyle> {
    STYLES
        .iter()
        .find(|s| s.code.eq_ignore_ascii_case(code))
        .or_else(|| {
            let language = code.split('-').next().unwrap_or(code);
            STYLES.iter().find(|s| s.code.eq_ignore_ascii_case(language))
        })
}

/// English name for a locale, if known.
pub fn language_name(code: &str) -> Option<&'static str> {
    lookup(code).map(|s| s.name)
}

/// Register/variant instruction for a locale, falling back to a neutral one.
pub fn style_instruction(code: &str) -> &'static str {
    lookup(code).map_or(NEUTRAL_INSTRUCTION, |s| s.instruction)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_match_wins_over_language() {
        assert_eq!(language_name("pt-BR"), Some("Brazilian Portuguese"));
        assert_eq!(language_name("pt"), Some("European Portuguese"));
    }

    #[test]
    fn test_falls_back_to_language_subtag() {
        assert_eq!(language_name("de-AT"), Some("German"));
        assert!(style_instruction("de-CH").contains("Sie"));
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(language_name("PT-br"), Some("Brazilian Portuguese"));
    }

    #[test]
    fn test_unknown_locale() {
        assert_eq!(language_name("xx"), None);
        assert_eq!(style_instruction("xx"), NEUTRAL_INSTRUCTION);
    }

    #[test]
    fn test_codes_are_unique() {
        for (i, a) in STYLES.iter().enumerate() {
            for b in &STYLES[i + 1..] {
                assert_ne!(a.code, b.code);
            }
        }
    }
}
