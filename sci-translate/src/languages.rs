//! Target languages offered by the command line.

/// Languages the translator offers, in display order. The first is the default.
pub const SUPPORTED_LANGUAGES: [&str; 10] = [
    "Spanish",
    "French",
    "German",
    "Japanese",
    "Chinese (Simplified)",
    "Russian",
    "Arabic",
    "Portuguese",
    "Italian",
    "Korean",
];

pub const DEFAULT_LANGUAGE: &str = SUPPORTED_LANGUAGES[0];

/// Match user input against the supported list, ignoring case and surrounding space.
pub fn resolve_language(input: &str) -> Option<&'static str> {
    let input = input.trim();
    SUPPORTED_LANGUAGES
        .iter()
        .copied()
        .find(|lang| lang.eq_ignore_ascii_case(input))
}

/// clap value parser for `--lang`
pub fn parse_language(input: &str) -> Result<String, String> {
    resolve_language(input).map(str::to_string).ok_or_else(|| {
        format!(
            "unsupported language '{}'. Choose one of: {}",
            input,
            SUPPORTED_LANGUAGES.join(", ")
        )
    })
}
