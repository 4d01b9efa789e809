//! Locale membership and display-name translations.
//!
//! Configuration nodes carry a set of locale codes restricting where they
//! apply, and a list of display-name translations keyed by language code.
//! Locale sets have a semicolon-joined text form used by external readers
//! and writers.

use serde::{Deserialize, Serialize};

/// Sentinel locale matching every node.
pub const ALL_LOCALES: &str = "#all#";

/// Fallback locale used when a caller has no better choice.
pub const DEFAULT_LOCALE: &str = "au";

/// One display-name translation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Translation {
    /// Language code, e.g. `"en"` or `"fr"`.
    pub lang: String,
    /// Display text in that language.
    pub text: String,
}

/// Parses a semicolon-joined locale list, trimming whitespace and skipping
/// empty entries.
pub fn parse_locale_list(text: &str) -> Vec<String> {
    text.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Joins a locale list into its semicolon-separated text form.
pub fn join_locale_list(locales: &[String]) -> String {
    locales.join(";")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_trims_and_skips_empties() {
        assert_eq!(parse_locale_list(" au; nz ;;uk"), vec!["au", "nz", "uk"]);
        assert!(parse_locale_list("").is_empty());
    }

    #[test]
    fn text_form_round_trips() {
        let locales = parse_locale_list("au;nz");
        assert_eq!(join_locale_list(&locales), "au;nz");
    }

    #[test]
    fn translation_serializes() {
        let t = Translation {
            lang: "fr".to_string(),
            text: "Trèfle blanc".to_string(),
        };
        let json = serde_json::to_string(&t).unwrap();
        let back: Translation = serde_json::from_str(&json).unwrap();
        assert_eq!(back, t);
    }
}
