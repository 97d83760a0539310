use crate::models::Priority;
use once_cell::sync::Lazy;
use regex::Regex;

pub const HIGH_PRIORITY_KEYWORDS: &[&str] = &[
    "as soon as possible",
    "high priority",
    "top priority",
    "immediately",
    "important",
    "essential",
    "critical",
    "deadline",
    "urgently",
    "crucial",
    "urgent",
    "vital",
    "asap",
    "rush",
];

// Several of these contain a high-priority word ("no rush", "not urgent");
// they are matched first so that word is not counted on its own.
pub const LOW_PRIORITY_KEYWORDS: &[&str] = &[
    "when i get a chance",
    "if there's time",
    "nice to have",
    "low priority",
    "not urgent",
    "eventually",
    "whenever",
    "optional",
    "someday",
    "no rush",
    "later",
];

fn keyword_regex(keywords: &[&str]) -> Regex {
    let alternation = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)).unwrap()
}

static HIGH: Lazy<Regex> = Lazy::new(|| keyword_regex(HIGH_PRIORITY_KEYWORDS));
static LOW: Lazy<Regex> = Lazy::new(|| keyword_regex(LOW_PRIORITY_KEYWORDS));

/// Classify urgency from keywords. High beats low when both appear.
pub fn detect_priority(text: &str) -> Priority {
    let without_low = LOW.replace_all(text, " ");
    if HIGH.is_match(&without_low) {
        Priority::High
    } else if LOW.is_match(text) {
        Priority::Low
    } else {
        Priority::Medium
    }
}

/// Remove every priority keyword from both sets.
pub fn strip_priority_keywords(text: &str) -> String {
    let without_low = LOW.replace_all(text, " ");
    HIGH.replace_all(&without_low, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voice::collapse_whitespace;

    #[test]
    fn test_default_is_medium() {
        assert_eq!(detect_priority("buy milk"), Priority::Medium);
        assert_eq!(detect_priority(""), Priority::Medium);
    }

    #[test]
    fn test_high_keywords() {
        assert_eq!(detect_priority("URGENT: submit report"), Priority::High);
        assert_eq!(detect_priority("fix the server asap"), Priority::High);
        assert_eq!(detect_priority("this is important"), Priority::High);
    }

    #[test]
    fn test_low_keywords() {
        assert_eq!(detect_priority("clean the garage eventually"), Priority::Low);
        assert_eq!(detect_priority("new mousepad, nice to have"), Priority::Low);
        assert_eq!(detect_priority("call the bank, no rush"), Priority::Low);
        assert_eq!(detect_priority("not urgent: sort photos"), Priority::Low);
    }

    #[test]
    fn test_high_wins_over_low() {
        assert_eq!(detect_priority("urgent but optional"), Priority::High);
        assert_eq!(detect_priority("later today, it's critical"), Priority::High);
    }

    #[test]
    fn test_keywords_match_whole_words() {
        // "rushmore" and "latest" are not keywords
        assert_eq!(detect_priority("visit mount rushmore"), Priority::Medium);
        assert_eq!(detect_priority("read the latest news"), Priority::Medium);
    }

    #[test]
    fn test_detect_priority_is_pure() {
        let text = "Important: renew the lease later";
        let first = detect_priority(text);
        for _ in 0..5 {
            assert_eq!(detect_priority(text), first);
        }
    }

    #[test]
    fn test_strip_priority_keywords() {
        let stripped = strip_priority_keywords("urgent submit report, no rush");
        assert_eq!(collapse_whitespace(&stripped), "submit report,");
    }
}
