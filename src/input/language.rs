//! Supported languages and language detection for dictionary files

use std::path::Path;

/// A catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    /// Code used in file names and requests (`ja`, `zh-TW`)
    pub code: &'static str,
    /// English name, shown to the provider
    pub name: &'static str,
    /// Native label
    pub label: &'static str,
}

/// Languages offered for translation
pub static LANGUAGES: &[Language] = &[
    // East Asian
    Language { code: "zh", name: "Chinese (Simplified)", label: "中文 (简体)" },
    Language { code: "zh-TW", name: "Chinese (Traditional)", label: "中文 (繁體)" },
    Language { code: "ja", name: "Japanese", label: "日本語" },
    Language { code: "ko", name: "Korean", label: "한국어" },
    // Southeast Asian
    Language { code: "th", name: "Thai", label: "ไทย" },
    Language { code: "vi", name: "Vietnamese", label: "Tiếng Việt" },
    Language { code: "id", name: "Indonesian", label: "Bahasa Indonesia" },
    Language { code: "ms", name: "Malay", label: "Bahasa Melayu" },
    Language { code: "tl", name: "Filipino", label: "Tagalog" },
    Language { code: "lo", name: "Lao", label: "ລາວ" },
    Language { code: "my", name: "Burmese", label: "မြန်မာ" },
    Language { code: "km", name: "Khmer", label: "ខ្មែរ" },
    // South Asian
    Language { code: "hi", name: "Hindi", label: "हिन्दी" },
    Language { code: "bn", name: "Bengali", label: "বাংলা" },
    Language { code: "pa", name: "Punjabi", label: "ਪੰਜਾਬੀ" },
    Language { code: "ta", name: "Tamil", label: "தமிழ்" },
    Language { code: "te", name: "Telugu", label: "తెలుగు" },
    Language { code: "kn", name: "Kannada", label: "ಕನ್ನಡ" },
    Language { code: "ml", name: "Malayalam", label: "മലയാളം" },
    Language { code: "ur", name: "Urdu", label: "اردو" },
    // Western European
    Language { code: "en", name: "English", label: "English" },
    Language { code: "fr", name: "French", label: "Français" },
    Language { code: "de", name: "German", label: "Deutsch" },
    Language { code: "es", name: "Spanish", label: "Español" },
    Language { code: "it", name: "Italian", label: "Italiano" },
    Language { code: "pt", name: "Portuguese", label: "Português" },
    Language { code: "pt-BR", name: "Portuguese (Brazil)", label: "Português (Brasil)" },
    Language { code: "nl", name: "Dutch", label: "Nederlands" },
    // Eastern European
    Language { code: "ru", name: "Russian", label: "Русский" },
    Language { code: "uk", name: "Ukrainian", label: "Українська" },
    Language { code: "pl", name: "Polish", label: "Polski" },
    Language { code: "cs", name: "Czech", label: "Čeština" },
    Language { code: "sk", name: "Slovak", label: "Slovenčina" },
    Language { code: "ro", name: "Romanian", label: "Română" },
    Language { code: "hu", name: "Hungarian", label: "Magyar" },
    Language { code: "bg", name: "Bulgarian", label: "Български" },
    Language { code: "hr", name: "Croatian", label: "Hrvatski" },
    Language { code: "sr", name: "Serbian", label: "Српски" },
    // Nordic
    Language { code: "sv", name: "Swedish", label: "Svenska" },
    Language { code: "da", name: "Danish", label: "Dansk" },
    Language { code: "no", name: "Norwegian", label: "Norsk" },
    Language { code: "fi", name: "Finnish", label: "Suomi" },
    // Other European
    Language { code: "el", name: "Greek", label: "Ελληνικά" },
    Language { code: "tr", name: "Turkish", label: "Türkçe" },
    // Middle Eastern and African
    Language { code: "ar", name: "Arabic", label: "العربية" },
    Language { code: "he", name: "Hebrew", label: "עברית" },
    Language { code: "fa", name: "Persian", label: "فارسی" },
    Language { code: "sw", name: "Swahili", label: "Kiswahili" },
    Language { code: "af", name: "Afrikaans", label: "Afrikaans" },
    // Other
    Language { code: "ca", name: "Catalan", label: "Català" },
    Language { code: "eu", name: "Basque", label: "Euskera" },
];

/// Normalizes a language code for comparison (`en_US` -> `en-us`).
#[must_use]
pub fn normalize_language_code(code: &str) -> String {
    code.trim().to_lowercase().replace('_', "-")
}

/// Looks up a catalog entry, ignoring case and `_`/`-` differences.
#[must_use]
pub fn find_language(code: &str) -> Option<&'static Language> {
    let normalized = normalize_language_code(code);
    LANGUAGES.iter().find(|lang| normalize_language_code(lang.code) == normalized)
}

/// English name of `code` for prompts.
///
/// Region variants missing from the catalog fall back to their base language;
/// unknown codes are returned as given.
#[must_use]
pub fn display_name(code: &str) -> String {
    if let Some(lang) = find_language(code) {
        return lang.name.to_string();
    }
    split_region(code)
        .and_then(|(base, _)| find_language(base))
        .map_or_else(|| code.trim().to_string(), |lang| lang.name.to_string())
}

/// Whether two codes name the same language variant.
#[must_use]
pub fn same_language(a: &str, b: &str) -> bool {
    normalize_language_code(a) == normalize_language_code(b)
}

fn split_region(code: &str) -> Option<(&str, &str)> {
    let (base, region) = code.trim().split_once(['-', '_'])?;
    let valid_region = match region.len() {
        2 | 4 => region.chars().all(|c| c.is_ascii_alphabetic()),
        3 => region.chars().all(|c| c.is_ascii_digit()),
        _ => false,
    };
    valid_region.then_some((base, region))
}

fn is_language_code(part: &str) -> bool {
    find_language(part).is_some()
        || split_region(part).is_some_and(|(base, _)| find_language(base).is_some())
}

/// Detects the language of a dictionary file from its path.
///
/// Path components (and the file stem) are searched from the end, so
/// `locales/ja/common.json` and `messages/pt_BR.json` both resolve.
#[must_use]
pub fn detect_language_from_path(file_path: &Path) -> Option<String> {
    let path_str = file_path.to_string_lossy();

    path_str
        .split(['/', '\\', '.'])
        .rev()
        .find(|part| is_language_code(part))
        .map(ToString::to_string)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use googletest::prelude::*;
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn test_catalog_codes_are_unique() {
        let mut codes: Vec<String> = LANGUAGES.iter().map(|l| normalize_language_code(l.code)).collect();
        let total = codes.len();
        codes.sort();
        codes.dedup();

        assert_that!(codes.len(), eq(total));
    }

    #[rstest]
    #[case("ja", "Japanese")]
    #[case("zh-TW", "Chinese (Traditional)")]
    #[case("zh_tw", "Chinese (Traditional)")]
    #[case("en-US", "English")]
    #[case("pt_BR", "Portuguese (Brazil)")]
    #[case("tlh", "tlh")]
    fn test_display_names(#[case] code: &str, #[case] expected: &str) {
        assert_that!(display_name(code), eq(expected));
    }

    #[rstest]
    #[case("locales/en.json", Some("en"))]
    #[case("locales/ja/common.json", Some("ja"))]
    #[case("messages/pt_BR.json", Some("pt_BR"))]
    #[case("public/locales/zh-TW/translation.json", Some("zh-TW"))]
    #[case("src/i18n/de-CH.json", Some("de-CH"))]
    #[case("my-app/locales/common.json", None)]
    #[case("config/settings.json", None)]
    fn test_detects_language_from_path(#[case] path: &str, #[case] expected: Option<&str>) {
        let detected = detect_language_from_path(&PathBuf::from(path));

        assert_that!(detected.as_deref(), eq(expected));
    }

    #[rstest]
    fn test_region_variants_compare_loosely() {
        assert_that!(same_language("pt_BR", "pt-br"), eq(true));
        assert_that!(same_language("pt", "pt-BR"), eq(false));
    }
}
