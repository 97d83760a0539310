//! Classifying an utterance into a task command.
//!
//! Rule groups are tried in a fixed order (add, delete, complete, uncomplete,
//! update, list, clear completed) and the first group with a matching rule
//! decides the command. What happens when nothing matches is a policy choice,
//! see [`Strictness`].

use super::datetime::detect_date_time_from_text_at;
use super::phrase::extract_task_details_at;
use super::{collapse_whitespace, Confidence};
use chrono::{Local, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fmt;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Strictness {
    /// Anything unrecognized becomes a new task, at low confidence.
    #[default]
    Lenient,
    /// Anything unrecognized is reported as [`Command::Unknown`].
    Strict,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub deadline: Option<NaiveDateTime>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Add {
        task_name: String,
    },
    Delete {
        identifier: Option<String>,
    },
    Complete {
        identifier: Option<String>,
    },
    Uncomplete {
        identifier: Option<String>,
    },
    Update {
        identifier: Option<String>,
        changes: TaskChanges,
    },
    List,
    ClearCompleted,
    Unknown,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Intent {
    Add,
    Delete,
    Complete,
    Uncomplete,
    Update,
    List,
    ClearCompleted,
    Unknown,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Intent::Add => "add",
            Intent::Delete => "delete",
            Intent::Complete => "complete",
            Intent::Uncomplete => "uncomplete",
            Intent::Update => "update",
            Intent::List => "list",
            Intent::ClearCompleted => "clear_completed",
            Intent::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

impl Command {
    pub fn intent(&self) -> Intent {
        match self {
            Command::Add { .. } => Intent::Add,
            Command::Delete { .. } => Intent::Delete,
            Command::Complete { .. } => Intent::Complete,
            Command::Uncomplete { .. } => Intent::Uncomplete,
            Command::Update { .. } => Intent::Update,
            Command::List => Intent::List,
            Command::ClearCompleted => Intent::ClearCompleted,
            Command::Unknown => Intent::Unknown,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ParsedCommand {
    pub command: Command,
    pub confidence: Confidence,
}

struct Rule {
    regex: Regex,
    confidence: Confidence,
}

fn rules(patterns: &[(&str, Confidence)]) -> Vec<Rule> {
    patterns
        .iter()
        .map(|(pattern, confidence)| Rule {
            regex: Regex::new(&format!("(?i){}", pattern)).unwrap(),
            confidence: *confidence,
        })
        .collect()
}

static ADD_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    rules(&[(
        r"^(?:please\s+)?(?:add|create|new|make|save|schedule|plan|note|write down|remind me to|don'?t forget to|i need to)\b",
        Confidence::High,
    )])
});

static DELETE_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    rules(&[(
        r"^(?:please\s+)?(?:delete|remove|erase|cancel|drop|scratch|get rid of)\s+(?:the\s+)?(?:task\s+)?(?P<id>.+)$",
        Confidence::High,
    )])
});

static COMPLETE_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    rules(&[
        (
            r"^(?:please\s+)?(?:mark|set)\s+(?:the\s+)?(?:task\s+)?(?P<id>.+?)\s+as\s+(?:done|complete|completed|finished)$",
            Confidence::High,
        ),
        (
            r"^(?:please\s+)?(?:complete|finish|check off|tick off|cross off)\s+(?:the\s+)?(?:task\s+)?(?P<id>.+)$",
            Confidence::High,
        ),
        (
            r"^i(?:'ve|\s+have)?\s+(?:finished|completed|done)\s+(?:with\s+)?(?:the\s+)?(?:task\s+)?(?P<id>.+)$",
            Confidence::Medium,
        ),
        (
            r"^(?:the\s+)?(?P<id>.+?)\s+is\s+(?:done|complete|completed|finished)$",
            Confidence::Medium,
        ),
    ])
});

static UNCOMPLETE_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    rules(&[
        (
            r"^(?:please\s+)?(?:mark|set)\s+(?:the\s+)?(?:task\s+)?(?P<id>.+?)\s+as\s+(?:not\s+done|undone|not\s+complete|not\s+completed|incomplete|unfinished|pending|open)$",
            Confidence::High,
        ),
        (
            r"^(?:please\s+)?(?:uncomplete|uncheck|unmark|reopen|undo|restore)\s+(?:the\s+)?(?:task\s+)?(?P<id>.+)$",
            Confidence::High,
        ),
        (
            r"^(?:the\s+)?(?P<id>.+?)\s+is\s+not\s+(?:done|complete|completed|finished)(?:\s+yet)?$",
            Confidence::Medium,
        ),
    ])
});

// `deadline` and `rename` are marker groups that pin the kind of change.
static UPDATE_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    rules(&[
        (
            r"^(?:please\s+)?(?:change|set|move|update)\s+(?:the\s+)?(?P<deadline>deadline|due date)\s+(?:of|for)\s+(?:the\s+)?(?:task\s+)?(?P<id>.+?)\s+to\s+(?P<value>.+)$",
            Confidence::High,
        ),
        (
            r"^(?:please\s+)?(?P<rename>rename)\s+(?:the\s+)?(?:task\s+)?(?P<id>.+?)\s+to\s+(?P<value>.+)$",
            Confidence::High,
        ),
        (
            r"^(?:please\s+)?(?:change|update|edit|move|set|reschedule|postpone|push)\s+(?:the\s+)?(?:task\s+)?(?P<id>.+?)\s+to\s+(?P<value>.+)$",
            Confidence::High,
        ),
    ])
});

static LIST_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    rules(&[
        (
            r"^(?:please\s+)?(?:list|show|read|display|tell me|what are|what's|whats|what is)\b.*\b(?:tasks?|todos?|to-dos?|list)$",
            Confidence::High,
        ),
        (r"^how many tasks\b", Confidence::High),
        (r"^(?:list|show)(?:\s+(?:all|everything))?$", Confidence::Medium),
        (r"^what do i (?:have|need) to do\b", Confidence::Medium),
    ])
});

static CLEAR_COMPLETED_RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    rules(&[(
        r"^(?:please\s+)?(?:clear|clean up|purge)\s+(?:all\s+)?(?:of\s+)?(?:the\s+|my\s+)?(?:completed|finished|done)(?:\s+(?:tasks?|items?|todos?))?$",
        Confidence::High,
    )])
});

fn first_match<'t>(rules: &[Rule], text: &'t str) -> Option<(Captures<'t>, Confidence)> {
    rules
        .iter()
        .find_map(|rule| rule.regex.captures(text).map(|caps| (caps, rule.confidence)))
}

const QUOTES: &[char] = &['\'', '"', '‘', '’', '“', '”'];

/// Trim surrounding quotes and punctuation from a spoken task reference.
fn clean_reference(raw: &str) -> Option<String> {
    let cleaned = raw
        .trim()
        .trim_matches(|c: char| QUOTES.contains(&c) || c.is_whitespace() || c == ',');
    let cleaned = collapse_whitespace(cleaned);
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

fn identifier(caps: &Captures<'_>) -> Option<String> {
    caps.name("id").and_then(|m| clean_reference(m.as_str()))
}

pub struct IntentParser {
    strictness: Strictness,
}

impl IntentParser {
    pub fn new(strictness: Strictness) -> Self {
        IntentParser { strictness }
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    pub fn parse(&self, speech: &str) -> ParsedCommand {
        self.parse_at(speech, Local::now().naive_local())
    }

    pub fn parse_at(&self, speech: &str, now: NaiveDateTime) -> ParsedCommand {
        let text = collapse_whitespace(speech.trim().trim_end_matches(['.', '!', '?']));
        let parsed = self.classify(&text, now);
        debug!(
            intent = %parsed.command.intent(),
            confidence = %parsed.confidence,
            %text,
            "voice command classified"
        );
        parsed
    }

    fn classify(&self, text: &str, now: NaiveDateTime) -> ParsedCommand {
        if text.is_empty() {
            return ParsedCommand {
                command: Command::Unknown,
                confidence: Confidence::Low,
            };
        }

        if let Some((_, confidence)) = first_match(&ADD_RULES, text) {
            let extracted = extract_task_details_at(text, now);
            return ParsedCommand {
                command: Command::Add {
                    task_name: extracted.task_name,
                },
                confidence,
            };
        }

        let targeted: [(&[Rule], fn(Option<String>) -> Command); 3] = [
            (DELETE_RULES.as_slice(), |identifier| Command::Delete { identifier }),
            (COMPLETE_RULES.as_slice(), |identifier| Command::Complete { identifier }),
            (UNCOMPLETE_RULES.as_slice(), |identifier| Command::Uncomplete { identifier }),
        ];
        for (rules, build) in targeted {
            if let Some((caps, confidence)) = first_match(rules, text) {
                return ParsedCommand {
                    command: build(identifier(&caps)),
                    confidence,
                };
            }
        }

        if let Some((caps, confidence)) = first_match(&UPDATE_RULES, text) {
            return ParsedCommand {
                command: Command::Update {
                    identifier: identifier(&caps),
                    changes: update_changes(&caps, now),
                },
                confidence,
            };
        }

        if let Some((_, confidence)) = first_match(&LIST_RULES, text) {
            return ParsedCommand {
                command: Command::List,
                confidence,
            };
        }

        if let Some((_, confidence)) = first_match(&CLEAR_COMPLETED_RULES, text) {
            return ParsedCommand {
                command: Command::ClearCompleted,
                confidence,
            };
        }

        match self.strictness {
            Strictness::Lenient => ParsedCommand {
                command: Command::Add {
                    task_name: extract_task_details_at(text, now).task_name,
                },
                confidence: Confidence::Low,
            },
            Strictness::Strict => ParsedCommand {
                command: Command::Unknown,
                confidence: Confidence::Low,
            },
        }
    }
}

impl Default for IntentParser {
    fn default() -> Self {
        IntentParser::new(Strictness::Lenient)
    }
}

/// A new value that reads as a date or time reschedules the task; anything
/// else renames it. An explicit "rename" always renames.
fn update_changes(caps: &Captures<'_>, now: NaiveDateTime) -> TaskChanges {
    let Some(value) = caps.name("value").and_then(|m| clean_reference(m.as_str())) else {
        return TaskChanges::default();
    };
    if caps.name("rename").is_some() {
        return TaskChanges {
            title: Some(value),
            deadline: None,
        };
    }

    let probe = detect_date_time_from_text_at(&value, now);
    match probe.detected_date {
        Some(deadline) if probe.confidence >= Confidence::Medium => TaskChanges {
            title: None,
            deadline: Some(deadline),
        },
        // Asked for a new deadline but said something that isn't one.
        _ if caps.name("deadline").is_some() => TaskChanges::default(),
        _ => TaskChanges {
            title: Some(value),
            deadline: None,
        },
    }
}

/// Classify with the lenient policy.
pub fn parse_voice_command(speech: &str) -> ParsedCommand {
    IntentParser::default().parse(speech)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    // Wednesday
    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 14)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn parse(speech: &str) -> ParsedCommand {
        IntentParser::new(Strictness::Lenient).parse_at(speech, now())
    }

    fn strict(speech: &str) -> ParsedCommand {
        IntentParser::new(Strictness::Strict).parse_at(speech, now())
    }

    fn id(text: &str) -> Option<String> {
        Some(text.to_string())
    }

    #[test]
    fn test_add() {
        let parsed = parse("Add task call John tomorrow at 5 PM");
        assert_eq!(
            parsed.command,
            Command::Add {
                task_name: "call John".to_string()
            }
        );
        assert_eq!(parsed.confidence, Confidence::High);
    }

    #[test]
    fn test_delete_with_quotes() {
        let parsed = parse("Delete 'Old Project'");
        assert_eq!(parsed.command, Command::Delete { identifier: id("Old Project") });
        assert_eq!(parse("remove the task laundry.").command, Command::Delete { identifier: id("laundry") });
    }

    #[test]
    fn test_complete() {
        assert_eq!(
            parse("Mark laundry as done").command,
            Command::Complete { identifier: id("laundry") }
        );
        assert_eq!(
            parse("finish the budget review").command,
            Command::Complete { identifier: id("budget review") }
        );
        assert_eq!(
            parse("I finished the dishes").command,
            Command::Complete { identifier: id("dishes") }
        );
        let parsed = parse("The laundry is done");
        assert_eq!(parsed.command, Command::Complete { identifier: id("laundry") });
        assert_eq!(parsed.confidence, Confidence::Medium);
    }

    #[test]
    fn test_uncomplete() {
        assert_eq!(
            parse("Mark laundry as not done").command,
            Command::Uncomplete { identifier: id("laundry") }
        );
        assert_eq!(
            parse("reopen 'tax return'").command,
            Command::Uncomplete { identifier: id("tax return") }
        );
        assert_eq!(
            parse("laundry is not done yet").command,
            Command::Uncomplete { identifier: id("laundry") }
        );
    }

    #[test]
    fn test_rename() {
        let parsed = parse("Rename 'Lunch' to 'Dinner'");
        assert_eq!(
            parsed.command,
            Command::Update {
                identifier: id("Lunch"),
                changes: TaskChanges {
                    title: Some("Dinner".to_string()),
                    deadline: None,
                },
            }
        );
        assert_eq!(parsed.command.intent(), Intent::Update);
    }

    #[test]
    fn test_rename_keeps_date_like_titles() {
        let parsed = parse("rename standup to Monday standup");
        assert_eq!(
            parsed.command,
            Command::Update {
                identifier: id("standup"),
                changes: TaskChanges {
                    title: Some("Monday standup".to_string()),
                    deadline: None,
                },
            }
        );
    }

    #[test]
    fn test_update_with_date_value_is_a_reschedule() {
        let parsed = parse("Move report to Friday");
        let friday = NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_milli_opt(23, 59, 59, 999);
        assert_eq!(
            parsed.command,
            Command::Update {
                identifier: id("report"),
                changes: TaskChanges {
                    title: None,
                    deadline: friday,
                },
            }
        );

        let parsed = parse("change the deadline of the report to tomorrow at 5 pm");
        let Command::Update { identifier, changes } = parsed.command else {
            panic!("expected update");
        };
        assert_eq!(identifier, id("report"));
        assert_eq!(
            changes.deadline,
            NaiveDate::from_ymd_opt(2026, 10, 15).unwrap().and_hms_opt(17, 0, 0)
        );
    }

    #[test]
    fn test_update_with_plain_value_is_a_rename() {
        assert_eq!(
            parse("change standup to team sync").command,
            Command::Update {
                identifier: id("standup"),
                changes: TaskChanges {
                    title: Some("team sync".to_string()),
                    deadline: None,
                },
            }
        );
    }

    #[test]
    fn test_unparseable_deadline_changes_nothing() {
        let parsed = parse("set the due date for report to whenever");
        assert_eq!(
            parsed.command,
            Command::Update {
                identifier: id("report"),
                changes: TaskChanges::default(),
            }
        );
    }

    #[test]
    fn test_list_and_clear() {
        assert_eq!(parse("show me my tasks").command, Command::List);
        assert_eq!(parse("What's on my list?").command, Command::List);
        assert_eq!(parse("how many tasks do I have").command, Command::List);
        assert_eq!(parse("clear completed").command, Command::ClearCompleted);
        assert_eq!(parse("Clear all the finished tasks").command, Command::ClearCompleted);
    }

    #[test]
    fn test_group_order_decides_ties() {
        // the add group is tried before delete
        assert!(matches!(
            parse("remind me to delete old photos").command,
            Command::Add { .. }
        ));
        // and delete before clear completed
        assert_eq!(
            parse("delete completed tasks").command,
            Command::Delete { identifier: id("completed tasks") }
        );
    }

    #[test]
    fn test_unmatched_speech_becomes_a_low_confidence_add() {
        for speech in ["buy milk", "groceries tomorrow", "hello there", "the quick brown fox"] {
            let parsed = parse(speech);
            assert_eq!(parsed.command.intent(), Intent::Add, "{}", speech);
            assert_eq!(parsed.confidence, Confidence::Low, "{}", speech);
        }
        assert_eq!(
            parse("groceries tomorrow").command,
            Command::Add {
                task_name: "groceries".to_string()
            }
        );
    }

    #[test]
    fn test_strict_reports_unknown() {
        let parsed = strict("hello there");
        assert_eq!(parsed.command, Command::Unknown);
        assert_eq!(parsed.confidence, Confidence::Low);
        assert_eq!(
            strict("Delete 'Old Project'").command,
            Command::Delete { identifier: id("Old Project") }
        );
    }

    #[test]
    fn test_delete_verbs_never_reach_clear_completed() {
        assert_eq!(
            parse("delete all completed tasks").command,
            Command::Delete { identifier: id("all completed tasks") }
        );
        assert_eq!(parse("purge the completed tasks").command, Command::ClearCompleted);
        assert_eq!(parse("clean up finished items").command, Command::ClearCompleted);
    }

    #[test]
    fn test_lenient_entry_point() {
        assert_eq!(IntentParser::default().strictness(), Strictness::Lenient);
        let parsed = parse_voice_command("Delete 'Old Project'");
        assert_eq!(parsed.command, Command::Delete { identifier: id("Old Project") });
        let parsed = parse_voice_command("hello there");
        assert_eq!(parsed.command.intent(), Intent::Add);
        assert_eq!(parsed.confidence, Confidence::Low);
    }

    #[test]
    fn test_empty_speech_is_unknown() {
        assert_eq!(parse("   ").command, Command::Unknown);
    }

    #[test]
    fn test_empty_reference_is_none() {
        assert_eq!(parse("delete ''").command, Command::Delete { identifier: None });
    }
}
