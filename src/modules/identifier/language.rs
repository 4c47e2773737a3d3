//! Free-text language labels from upstream pages mapped onto a stable
//! vocabulary of display name, ISO 639-1 code and dub flag.

use serde::Serialize;

pub const UNKNOWN_LANGUAGE_CODE: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageTag {
    pub name: String,
    pub code: String,
    pub is_dub: bool,
}

impl LanguageTag {
    fn known(name: &str, code: &str, is_dub: bool) -> Self {
        Self {
            name: name.to_string(),
            code: code.to_string(),
            is_dub,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.code == UNKNOWN_LANGUAGE_CODE
    }
}

/// Normalize a language label; never fails, unmapped labels keep their
/// original text and get the `unknown` code
pub fn normalize_language(input: &str) -> LanguageTag {
    let normalized = input.trim().to_lowercase();

    let known = match normalized.as_str() {
        "hindi" | "hin" | "hi" => ("Hindi", "hi", true),
        "tamil" | "tam" | "ta" => ("Tamil", "ta", true),
        "telugu" | "tel" | "te" => ("Telugu", "te", true),
        "malayalam" | "mal" | "ml" => ("Malayalam", "ml", true),
        "bengali" | "bangla" | "ben" | "bn" => ("Bengali", "bn", true),
        "marathi" | "mar" | "mr" => ("Marathi", "mr", true),
        "kannada" | "kan" | "kn" => ("Kannada", "kn", true),
        "english" | "eng" | "en" => ("English", "en", true),
        "japanese" | "jpn" | "ja" | "jp" => ("Japanese", "ja", false),
        "korean" | "kor" | "ko" => ("Korean", "ko", true),
        "chinese" | "chi" | "zho" | "zh" => ("Chinese", "zh", true),
        "und" | "unknown" => ("Unknown", UNKNOWN_LANGUAGE_CODE, false),
        // Every spelling of the original track is mapped above, so anything
        // left is some dub
        _ => {
            return LanguageTag {
                name: input.to_string(),
                code: UNKNOWN_LANGUAGE_CODE.to_string(),
                is_dub: true,
            }
        }
    };

    LanguageTag::known(known.0, known.1, known.2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_languages() {
        assert_eq!(
            normalize_language("Hindi"),
            LanguageTag::known("Hindi", "hi", true)
        );
        assert_eq!(
            normalize_language("  TAMIL "),
            LanguageTag::known("Tamil", "ta", true)
        );
        assert_eq!(normalize_language("eng").code, "en");
    }

    #[test]
    fn test_japanese_is_not_a_dub() {
        let tag = normalize_language("Japanese");
        assert_eq!(tag.code, "ja");
        assert!(!tag.is_dub);
        assert!(!normalize_language("JPN").is_dub);
    }

    #[test]
    fn test_unknown_label_falls_back() {
        let tag = normalize_language("Klingon");
        assert_eq!(tag.name, "Klingon");
        assert_eq!(tag.code, UNKNOWN_LANGUAGE_CODE);
        assert!(tag.is_dub);
        assert!(tag.is_unknown());
    }

    #[test]
    fn test_empty_label_is_still_a_tag() {
        let tag = normalize_language("");
        assert_eq!(tag.name, "");
        assert!(tag.is_unknown());
    }

    #[test]
    fn test_undetermined_marker() {
        let tag = normalize_language("und");
        assert_eq!(tag.name, "Unknown");
        assert!(tag.is_unknown());
        assert!(!tag.is_dub);
    }
}
