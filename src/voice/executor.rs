use super::intent::{Command, IntentParser, TaskChanges};
use super::phrase::extract_task_details_at;
use super::resolver::MatchStrategy;
use crate::error::StoreError;
use crate::models::{CategoryId, NewTask, Priority, ReminderType, Task, TaskPatch};
use crate::store::TaskStore;
use chrono::{DateTime, Local, NaiveDateTime, NaiveTime, TimeZone, Utc};
use tracing::{debug, error, info, warn};

/// Selections made in the UI alongside the transcript.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AmbientOptions {
    pub category_id: Option<CategoryId>,
    /// Overrides any deadline detected in the speech.
    pub deadline: Option<DateTime<Utc>>,
    pub reminder_enabled: bool,
    pub reminder_type: ReminderType,
    /// "HH:MM", used with [`ReminderType::Manual`].
    pub reminder_time: Option<String>,
}

impl AmbientOptions {
    pub const NO_CATEGORY: &'static str = "none";

    /// Apply a category picker value, where `"none"` clears the category.
    pub fn select_category(&mut self, selection: &str) {
        self.category_id = if selection == Self::NO_CATEGORY {
            None
        } else {
            selection.parse().ok()
        };
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Normal,
    Destructive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutcomeKind {
    Created,
    Deleted,
    Completed,
    Reopened,
    Renamed,
    Rescheduled,
    Listed,
    Cleared,
    NothingToClear,
    NotFound,
    Invalid,
    Unrecognized,
    Failed,
}

/// What a command did, phrased for a notification.
#[derive(Clone, Debug, PartialEq)]
pub struct Outcome {
    pub kind: OutcomeKind,
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Outcome {
    fn success(kind: OutcomeKind, title: &str, description: String) -> Self {
        Outcome {
            kind,
            title: title.to_string(),
            description,
            severity: Severity::Normal,
        }
    }

    fn problem(kind: OutcomeKind, title: &str, description: String) -> Self {
        Outcome {
            kind,
            title: title.to_string(),
            description,
            severity: Severity::Destructive,
        }
    }

    fn invalid(title: &str, description: &str) -> Self {
        Self::problem(OutcomeKind::Invalid, title, description.to_string())
    }

    fn not_found(identifier: &str) -> Self {
        Self::problem(
            OutcomeKind::NotFound,
            "Task not found",
            format!("Couldn't find a task matching \"{}\".", identifier),
        )
    }

    fn failed() -> Self {
        Self::problem(
            OutcomeKind::Failed,
            "Something went wrong",
            "The command could not be completed. Please try again.".to_string(),
        )
    }
}

fn to_utc(local: NaiveDateTime) -> Option<DateTime<Utc>> {
    Local
        .from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

fn describe_due(due: DateTime<Utc>) -> String {
    due.with_timezone(&Local).format("%a %-d %b, %H:%M").to_string()
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

/// Runs transcripts against a task store, one command at a time.
pub struct CommandExecutor<S> {
    store: S,
    parser: IntentParser,
    matching: MatchStrategy,
}

impl<S: TaskStore> CommandExecutor<S> {
    pub fn new(store: S) -> Self {
        CommandExecutor {
            store,
            parser: IntentParser::default(),
            matching: MatchStrategy::default(),
        }
    }

    pub fn with_parser(mut self, parser: IntentParser) -> Self {
        debug!(strictness = ?parser.strictness(), "intent parser configured");
        self.parser = parser;
        self
    }

    pub fn with_matching(mut self, matching: MatchStrategy) -> Self {
        self.matching = matching;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn execute(&self, transcript: &str, tasks: &[Task], options: &AmbientOptions) -> Outcome {
        self.execute_at(transcript, tasks, options, Local::now().naive_local())
            .await
    }

    /// Never fails: storage errors come back as a [`OutcomeKind::Failed`] outcome.
    pub async fn execute_at(
        &self,
        transcript: &str,
        tasks: &[Task],
        options: &AmbientOptions,
        now: NaiveDateTime,
    ) -> Outcome {
        let parsed = self.parser.parse_at(transcript, now);
        match self.run(parsed.command, transcript, tasks, options, now).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(%err, transcript, "voice command failed");
                Outcome::failed()
            }
        }
    }

    async fn run(
        &self,
        command: Command,
        transcript: &str,
        tasks: &[Task],
        options: &AmbientOptions,
        now: NaiveDateTime,
    ) -> Result<Outcome, StoreError> {
        match command {
            Command::Add { .. } => self.add(transcript, options, now).await,
            Command::Delete { identifier } => {
                let task = match self.resolve(tasks, identifier.as_deref(), "delete") {
                    Ok(task) => task,
                    Err(outcome) => return Ok(outcome),
                };
                self.store.delete_task(task.id).await?;
                info!(id = task.id, "task deleted");
                Ok(Outcome::success(
                    OutcomeKind::Deleted,
                    "Task deleted",
                    format!("Deleted \"{}\".", task.title),
                ))
            }
            Command::Complete { identifier } => {
                let task = match self.resolve(tasks, identifier.as_deref(), "complete") {
                    Ok(task) => task,
                    Err(outcome) => return Ok(outcome),
                };
                self.store
                    .update_task(task.id, TaskPatch::completed(true))
                    .await?;
                info!(id = task.id, "task completed");
                Ok(Outcome::success(
                    OutcomeKind::Completed,
                    "Task completed",
                    format!("Marked \"{}\" as done.", task.title),
                ))
            }
            Command::Uncomplete { identifier } => {
                let task = match self.resolve(tasks, identifier.as_deref(), "reopen") {
                    Ok(task) => task,
                    Err(outcome) => return Ok(outcome),
                };
                self.store
                    .update_task(task.id, TaskPatch::completed(false))
                    .await?;
                info!(id = task.id, "task reopened");
                Ok(Outcome::success(
                    OutcomeKind::Reopened,
                    "Task reopened",
                    format!("Marked \"{}\" as not done.", task.title),
                ))
            }
            Command::Update {
                identifier,
                changes,
            } => self.update(tasks, identifier.as_deref(), changes).await,
            Command::List => Ok(Self::list(tasks)),
            Command::ClearCompleted => self.clear_completed(tasks).await,
            Command::Unknown => Ok(Outcome::problem(
                OutcomeKind::Unrecognized,
                "Command not recognized",
                "Try \"add ...\", \"complete ...\", \"delete ...\" or \"rename ... to ...\".".to_string(),
            )),
        }
    }

    fn resolve<'a>(
        &self,
        tasks: &'a [Task],
        identifier: Option<&str>,
        action: &str,
    ) -> Result<&'a Task, Outcome> {
        let Some(identifier) = identifier.filter(|i| !i.trim().is_empty()) else {
            return Err(Outcome::problem(
                OutcomeKind::Invalid,
                "Which task?",
                format!("Say which task to {}.", action),
            ));
        };
        self.matching.find(tasks, identifier).ok_or_else(|| {
            warn!(identifier, "no task matches identifier");
            Outcome::not_found(identifier)
        })
    }

    async fn add(
        &self,
        transcript: &str,
        options: &AmbientOptions,
        now: NaiveDateTime,
    ) -> Result<Outcome, StoreError> {
        let extracted = extract_task_details_at(transcript, now);
        if extracted.task_name.trim().chars().count() < 2 {
            return Ok(Outcome::invalid(
                "Task name too short",
                "Say a little more about the task to add.",
            ));
        }

        let manual_reminder = options.reminder_enabled && options.reminder_type == ReminderType::Manual;
        if manual_reminder {
            let valid = options
                .reminder_time
                .as_deref()
                .map_or(false, |t| NaiveTime::parse_from_str(t, "%H:%M").is_ok());
            if !valid {
                return Ok(Outcome::invalid(
                    "Invalid reminder time",
                    "Manual reminders need a time like 09:30.",
                ));
            }
        }

        let due_date = options
            .deadline
            .or_else(|| extracted.deadline.and_then(to_utc));
        let new_task = NewTask {
            title: extracted.task_name,
            description: None,
            priority: extracted.priority,
            completed: false,
            due_date,
            category_id: options.category_id,
            reminder_enabled: options.reminder_enabled,
            reminder_type: options.reminder_type,
            reminder_time: if manual_reminder {
                options.reminder_time.clone()
            } else {
                None
            },
        };
        let created = self.store.create_task(new_task).await?;
        info!(id = created.id, title = %created.title, "task created");

        let mut description = format!("Added \"{}\"", created.title);
        if let Some(due) = created.due_date {
            description.push_str(&format!(", due {}", describe_due(due)));
        }
        if created.priority != Priority::Medium {
            description.push_str(&format!(" ({} priority)", created.priority));
        }
        description.push('.');
        Ok(Outcome::success(OutcomeKind::Created, "Task added", description))
    }

    async fn update(
        &self,
        tasks: &[Task],
        identifier: Option<&str>,
        changes: TaskChanges,
    ) -> Result<Outcome, StoreError> {
        if identifier.map_or(true, |i| i.trim().is_empty()) {
            return Ok(Outcome::invalid("Which task?", "Say which task to change."));
        }
        let deadline = changes.deadline.and_then(to_utc);
        if changes.title.is_none() && deadline.is_none() {
            return Ok(Outcome::invalid(
                "Missing new value",
                "Say what the task should be renamed or moved to.",
            ));
        }
        let task = match self.resolve(tasks, identifier, "change") {
            Ok(task) => task,
            Err(outcome) => return Ok(outcome),
        };

        let patch = TaskPatch {
            title: changes.title.clone(),
            due_date: deadline,
            ..Default::default()
        };
        let updated = self.store.update_task(task.id, patch).await?;
        info!(id = task.id, "task updated");

        Ok(match (changes.title, updated.due_date) {
            (Some(title), _) => Outcome::success(
                OutcomeKind::Renamed,
                "Task renamed",
                format!("Renamed \"{}\" to \"{}\".", task.title, title),
            ),
            (None, due) => Outcome::success(
                OutcomeKind::Rescheduled,
                "Deadline updated",
                match due.or(deadline) {
                    Some(due) => format!("\"{}\" is now due {}.", task.title, describe_due(due)),
                    None => format!("Updated the deadline of \"{}\".", task.title),
                },
            ),
        })
    }

    fn list(tasks: &[Task]) -> Outcome {
        let completed = tasks.iter().filter(|t| t.completed).count();
        let pending = tasks.len() - completed;
        let description = if tasks.is_empty() {
            "You have no tasks.".to_string()
        } else {
            format!(
                "You have {} pending task{} and {} completed.",
                pending,
                plural(pending),
                completed
            )
        };
        Outcome::success(OutcomeKind::Listed, "Your tasks", description)
    }

    async fn clear_completed(&self, tasks: &[Task]) -> Result<Outcome, StoreError> {
        let completed: Vec<&Task> = tasks.iter().filter(|t| t.completed).collect();
        if completed.is_empty() {
            return Ok(Outcome::success(
                OutcomeKind::NothingToClear,
                "Nothing to clear",
                "There are no completed tasks.".to_string(),
            ));
        }

        for (removed, task) in completed.iter().enumerate() {
            if let Err(err) = self.store.delete_task(task.id).await {
                warn!(removed, total = completed.len(), "clearing completed tasks stopped early");
                return Err(err);
            }
        }
        info!(count = completed.len(), "completed tasks cleared");
        Ok(Outcome::success(
            OutcomeKind::Cleared,
            "Completed tasks cleared",
            format!(
                "Removed {} completed task{}.",
                completed.len(),
                plural(completed.len())
            ),
        ))
    }
}
