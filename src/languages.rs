//! Supported language table and language-code validation

use serde::Serialize;

/// A language offered to clients.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Language {
    pub code: &'static str,
    pub name: &'static str,
}

/// Languages the UI offers for both input and output.
pub const SUPPORTED_LANGUAGES: &[Language] = &[
    Language { code: "en", name: "English" },
    Language { code: "es", name: "Spanish" },
    Language { code: "fr", name: "French" },
    Language { code: "de", name: "German" },
    Language { code: "zh", name: "Chinese" },
    Language { code: "ar", name: "Arabic" },
    Language { code: "hi", name: "Hindi" },
    Language { code: "it", name: "Italian" },
    Language { code: "pt", name: "Portuguese" },
    Language { code: "ru", name: "Russian" },
    Language { code: "ja", name: "Japanese" },
    Language { code: "ko", name: "Korean" },
    Language { code: "tr", name: "Turkish" },
];

/// Syntactic check for a language code: 2-3 ASCII letters, optionally
/// followed by `-` and a 2-4 character alphanumeric region (`zh-CN`, `pt-BR`).
///
/// Whether the provider actually supports the language is left to the provider.
pub fn is_valid_language_code(code: &str) -> bool {
    let mut parts = code.splitn(2, '-');
    let primary = parts.next().unwrap_or_default();

    let primary_ok =
        (2..=3).contains(&primary.len()) && primary.chars().all(|c| c.is_ascii_alphabetic());

    let region_ok = match parts.next() {
        None => true,
        Some(region) => {
            (2..=4).contains(&region.len()) && region.chars().all(|c| c.is_ascii_alphanumeric())
        }
    };

    primary_ok && region_ok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_codes_are_valid_and_unique() {
        assert_eq!(SUPPORTED_LANGUAGES.len(), 13);
        for (i, lang) in SUPPORTED_LANGUAGES.iter().enumerate() {
            assert!(is_valid_language_code(lang.code), "{}", lang.code);
            assert!(SUPPORTED_LANGUAGES[i + 1..].iter().all(|other| other.code != lang.code));
        }
    }

    #[test]
    fn test_language_code_syntax() {
        assert!(is_valid_language_code("en"));
        assert!(is_valid_language_code("haw"));
        assert!(is_valid_language_code("zh-CN"));
        assert!(is_valid_language_code("es-419"));

        assert!(!is_valid_language_code(""));
        assert!(!is_valid_language_code("e"));
        assert!(!is_valid_language_code("english"));
        assert!(!is_valid_language_code("en-"));
        assert!(!is_valid_language_code("e1"));
        assert!(!is_valid_language_code("en/../x"));
    }
}
