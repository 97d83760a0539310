//! Natural-language voice command pipeline.
//!
//! A transcript flows through [`intent`] to decide what the user asked for,
//! through [`phrase`], [`datetime`] and [`priority`] when a task is being
//! created, or through [`resolver`] when an existing task is referenced, and
//! finally through [`executor`], which performs the storage call and reports an
//! [`executor::Outcome`].

pub mod datetime;
pub mod executor;
pub mod intent;
pub mod phrase;
pub mod priority;
pub mod resolver;
pub mod similarity;

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

/// How sure a pattern match is. Ordered, so `Confidence::Medium >= Confidence::Low`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Confidence::Low => "low",
            Confidence::Medium => "medium",
            Confidence::High => "high",
        };
        f.write_str(label)
    }
}

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

pub(crate) fn collapse_whitespace(text: &str) -> String {
    WHITESPACE.replace_all(text, " ").trim().to_string()
}

/// Remove every case-insensitive occurrence of `phrase` from `text`.
pub(crate) fn remove_phrase(text: &str, phrase: &str) -> String {
    if phrase.trim().is_empty() {
        return text.to_string();
    }
    match Regex::new(&format!("(?i){}", regex::escape(phrase))) {
        Ok(re) => re.replace_all(text, " ").into_owned(),
        Err(_) => text.to_string(),
    }
}
