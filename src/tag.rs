//! Tag path tokenizing.
//!
//! Parameter tags are dash-delimited, case-insensitive paths such as
//! `kq-1-leaf`. A trailing dash on a request string means the caller is
//! naming a composite group rather than a scalar leaf; the tokenizer treats
//! a single trailing delimiter as a sentinel and does not emit an empty
//! segment for it, so `"kq-"` tokenizes to `["kq"]`.

/// Splits a tag path into lowercase segments.
pub fn tokenize(tag: &str) -> Vec<String> {
    let lowered = tag.to_lowercase();
    if lowered.is_empty() {
        return Vec::new();
    }
    let mut segments: Vec<String> = lowered.split('-').map(str::to_string).collect();
    if segments.last().map_or(false, |s| s.is_empty()) {
        segments.pop();
    }
    segments
}

/// Joins resolved segments back into a canonical tag path.
pub fn join_tags(tags: &[String]) -> String {
    tags.join("-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_and_lowercases() {
        assert_eq!(tokenize("KQ-1-Leaf"), vec!["kq", "1", "leaf"]);
    }

    #[test]
    fn trailing_dash_is_a_sentinel() {
        assert_eq!(tokenize("kq-"), vec!["kq"]);
        // only one trailing delimiter is swallowed
        assert_eq!(tokenize("kq--"), vec!["kq", ""]);
    }

    #[test]
    fn empty_input_yields_no_segments() {
        assert!(tokenize("").is_empty());
    }

    #[test]
    fn interior_empty_segments_are_kept() {
        assert_eq!(tokenize("a--b"), vec!["a", "", "b"]);
    }

    #[test]
    fn joins_back_to_canonical_form() {
        assert_eq!(join_tags(&tokenize("KQ-2-stem")), "kq-2-stem");
    }
}
