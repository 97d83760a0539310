use super::datetime::detect_date_time_from_text_at;
use super::priority::{detect_priority, strip_priority_keywords};
use super::{collapse_whitespace, Confidence};
use crate::models::Priority;
use chrono::{Local, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

/// A task title pulled out of free speech, plus whatever else the speech said about it.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractedTask {
    pub task_name: String,
    pub deadline: Option<NaiveDateTime>,
    pub priority: Priority,
    pub confidence: Confidence,
}

static COMMAND_VERB: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?:please\s+)?(?:remind me to|don'?t forget to|do not forget to|i need to|write down|add|create|new|make|save|schedule|plan|note)\b[\s:,]*",
    )
    .unwrap()
});

static LEADING_NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(?:(?:a|an|new|my)\s+)*(?:task|todo|to-do|item)s?\b[\s:,]*(?:(?:to|called|named)\s+)?")
        .unwrap()
});

static TRAILING_NOISE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)[\s,]*\b(?:(?:to|on) (?:my|the) (?:task |todo |to-do )?list|task|todo|item|by|next|for|o'?clock)$",
    )
    .unwrap()
});

fn trim_punctuation(text: &str) -> &str {
    text.trim_matches(|c: char| {
        c.is_whitespace() || matches!(c, ':' | ',' | ';' | '-' | '.' | '!' | '?' | '"' | '\'')
    })
}

fn strip_once(text: &str) -> String {
    let text = trim_punctuation(text);
    let text = COMMAND_VERB.replace(text, "");
    let text = LEADING_NOISE.replace(&text, "");
    let text = TRAILING_NOISE.replace(&text, "");
    collapse_whitespace(trim_punctuation(&text))
}

/// Strip command verbs and filler until nothing more comes off.
///
/// Titles that themselves start with a listed verb lose it too: "make dinner"
/// ends up as "dinner".
fn tidy(text: &str) -> String {
    let mut current = collapse_whitespace(text);
    loop {
        let next = strip_once(&current);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn without_command_verb(speech: &str) -> String {
    let trimmed = trim_punctuation(speech);
    collapse_whitespace(trim_punctuation(&COMMAND_VERB.replace(trimmed, "")))
}

/// Drop every remaining date or time phrase, not just the one that was used.
fn strip_dates(text: &str, now: NaiveDateTime) -> String {
    let mut current = text.to_string();
    loop {
        let detection = detect_date_time_from_text_at(&current, now);
        if detection.detected_date.is_none() || detection.cleaned_text == current {
            return current;
        }
        current = detection.cleaned_text;
    }
}

/// The title left once dates, priority words and filler are all gone.
fn task_name(cleaned: &str, now: NaiveDateTime) -> String {
    let mut current = cleaned.to_string();
    loop {
        let next = tidy(&strip_priority_keywords(&strip_dates(&current, now)));
        if next == current {
            return next;
        }
        current = next;
    }
}

pub fn extract_task_details(speech: &str) -> ExtractedTask {
    extract_task_details_at(speech, Local::now().naive_local())
}

pub fn extract_task_details_at(speech: &str, now: NaiveDateTime) -> ExtractedTask {
    let detection = detect_date_time_from_text_at(speech, now);
    let priority = detect_priority(speech);
    let name = task_name(&detection.cleaned_text, now);

    if name.chars().count() >= 2 {
        let confidence = if detection.detected_date.is_some() {
            detection.confidence
        } else {
            Confidence::Medium
        };
        return ExtractedTask {
            task_name: name,
            deadline: detection.detected_date,
            priority,
            confidence,
        };
    }

    // Too little survived the cleanup; settle for a lighter one.
    let fallback = without_command_verb(speech);
    let task_name = if fallback.is_empty() {
        collapse_whitespace(speech)
    } else {
        fallback
    };
    ExtractedTask {
        task_name,
        deadline: detection.detected_date,
        priority,
        confidence: Confidence::Low,
    }
}
