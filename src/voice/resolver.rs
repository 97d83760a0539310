//! Finding the task a spoken identifier refers to.
//!
//! Stages run from strictest to loosest and the first stage with a hit wins.
//! Within a stage the first task in list order wins; candidates are not scored
//! against each other.

use super::similarity::token_overlap;
use crate::models::Task;
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum MatchStrategy {
    /// Exact, then title-contains-identifier, then identifier-contains-title.
    Substring,
    /// `Substring`, then word overlap of at least half the identifier's words.
    #[default]
    Fuzzy,
}

const FUZZY_THRESHOLD: f64 = 0.5;

pub fn find_task_by_identifier<'a>(tasks: &'a [Task], identifier: &str) -> Option<&'a Task> {
    let needle = identifier.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }
    let titles: Vec<String> = tasks.iter().map(|t| t.title.trim().to_lowercase()).collect();

    if let Some(task) = first_where(tasks, &titles, |title| title == needle) {
        debug!(id = task.id, "identifier matched exactly");
        return Some(task);
    }
    if let Some(task) = first_where(tasks, &titles, |title| title.contains(needle.as_str())) {
        debug!(id = task.id, "identifier found inside title");
        return Some(task);
    }
    if let Some(task) = first_where(tasks, &titles, |title| {
        !title.is_empty() && needle.contains(title)
    }) {
        debug!(id = task.id, "title found inside identifier");
        return Some(task);
    }
    None
}

fn first_where<'a>(
    tasks: &'a [Task],
    titles: &[String],
    accept: impl Fn(&str) -> bool,
) -> Option<&'a Task> {
    titles
        .iter()
        .position(|title| accept(title.as_str()))
        .map(|i| &tasks[i])
}

pub fn find_task_fuzzy<'a>(tasks: &'a [Task], identifier: &str) -> Option<&'a Task> {
    if let Some(task) = find_task_by_identifier(tasks, identifier) {
        return Some(task);
    }
    let task = tasks
        .iter()
        .find(|task| token_overlap(identifier, &task.title) >= FUZZY_THRESHOLD)?;
    debug!(id = task.id, identifier, "identifier matched by word overlap");
    Some(task)
}

impl MatchStrategy {
    pub fn find<'a>(&self, tasks: &'a [Task], identifier: &str) -> Option<&'a Task> {
        match self {
            MatchStrategy::Substring => find_task_by_identifier(tasks, identifier),
            MatchStrategy::Fuzzy => find_task_fuzzy(tasks, identifier),
        }
    }
}
