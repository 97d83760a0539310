use crate::config::ReminderConfig;
use crate::models::{Category, ReminderType, Task, TaskPatch};
use crate::store::TaskStore;
use crate::voice::executor::{AmbientOptions, CommandExecutor, Outcome, OutcomeKind, Severity};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::widgets::ListState;
use std::io;
use tracing::{error, info};

pub struct App<S> {
    pub tasks: Vec<Task>,
    pub categories: Vec<Category>,
    pub state: ListState,
    pub input_mode: InputMode,
    pub transcript: String,
    pub options: AmbientOptions,
    pub last_outcome: Option<Outcome>,
    pub show_done_tasks: bool,
    manual_reminder_time: Option<String>,
    executor: CommandExecutor<S>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Command,
}

impl<S: TaskStore> App<S> {
    pub fn new(
        executor: CommandExecutor<S>,
        tasks: Vec<Task>,
        categories: Vec<Category>,
        reminders: &ReminderConfig,
    ) -> App<S> {
        let options = AmbientOptions {
            reminder_enabled: reminders.enabled,
            reminder_type: reminders.kind,
            reminder_time: reminders.time.clone(),
            ..Default::default()
        };
        let mut app = App {
            tasks,
            categories,
            state: ListState::default(),
            input_mode: InputMode::Normal,
            transcript: String::new(),
            options,
            last_outcome: None,
            show_done_tasks: false,
            manual_reminder_time: reminders.time.clone(),
            executor,
        };
        app.reset_selection();
        app
    }

    /// Tasks in display order, honouring the done filter.
    pub fn visible_tasks(&self) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|task| self.show_done_tasks || !task.completed)
            .collect()
    }

    pub fn selected_task(&self) -> Option<&Task> {
        let selected = self.state.selected()?;
        self.visible_tasks().get(selected).copied()
    }

    pub fn category_name(&self, id: Option<i64>) -> Option<&str> {
        let id = id?;
        self.categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.as_str())
    }

    fn reset_selection(&mut self) {
        let len = self.visible_tasks().len();
        match self.state.selected() {
            _ if len == 0 => self.state.select(None),
            Some(i) if i < len => {}
            _ => self.state.select(Some(0)),
        }
    }

    pub async fn refresh_tasks(&mut self) {
        match self.executor.store().list_tasks().await {
            Ok(tasks) => self.tasks = tasks,
            Err(err) => {
                error!(%err, "could not load tasks");
                self.last_outcome = Some(Outcome {
                    kind: OutcomeKind::Failed,
                    title: "Refresh failed".to_string(),
                    description: err.to_string(),
                    severity: Severity::Destructive,
                });
            }
        }
        self.reset_selection();
    }

    pub fn next(&mut self) {
        let len = self.visible_tasks().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.visible_tasks().len();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    /// No category, then each known category in turn.
    pub fn cycle_category(&mut self) {
        let next = match self.options.category_id {
            None => self.categories.first(),
            Some(current) => self
                .categories
                .iter()
                .skip_while(|c| c.id != current)
                .nth(1),
        };
        let selection = next
            .map(|c| c.id.to_string())
            .unwrap_or_else(|| AmbientOptions::NO_CATEGORY.to_string());
        self.options.select_category(&selection);
    }

    /// Off, then default, morning and manual reminders.
    pub fn cycle_reminder(&mut self) {
        let (enabled, kind) = match (self.options.reminder_enabled, self.options.reminder_type) {
            (false, _) => (true, ReminderType::Default),
            (true, ReminderType::Default) => (true, ReminderType::Morning),
            (true, ReminderType::Morning) => (true, ReminderType::Manual),
            (true, ReminderType::Manual) => (false, ReminderType::Default),
        };
        self.options.reminder_enabled = enabled;
        self.options.reminder_type = kind;
        self.options.reminder_time = if kind == ReminderType::Manual {
            self.manual_reminder_time.clone()
        } else {
            None
        };
    }

    pub async fn submit_transcript(&mut self) {
        let transcript = std::mem::take(&mut self.transcript);
        if transcript.trim().is_empty() {
            return;
        }
        let outcome = self
            .executor
            .execute(&transcript, &self.tasks, &self.options)
            .await;
        self.last_outcome = Some(outcome);
        self.refresh_tasks().await;
    }

    async fn toggle_selected(&mut self) {
        let Some(task) = self.selected_task().cloned() else {
            return;
        };
        let completed = !task.completed;
        let (kind, verb) = if completed {
            (OutcomeKind::Completed, "done")
        } else {
            (OutcomeKind::Reopened, "not done")
        };
        let result = self
            .executor
            .store()
            .update_task(task.id, TaskPatch::completed(completed))
            .await;
        self.record_manual(result.map(|_| ()), kind, format!("Marked \"{}\" as {}.", task.title, verb));
        self.refresh_tasks().await;
    }

    async fn delete_selected(&mut self) {
        let Some(task) = self.selected_task().cloned() else {
            return;
        };
        let result = self.executor.store().delete_task(task.id).await;
        self.record_manual(result, OutcomeKind::Deleted, format!("Deleted \"{}\".", task.title));
        self.refresh_tasks().await;
    }

    fn record_manual<E: std::fmt::Display>(
        &mut self,
        result: Result<(), E>,
        kind: OutcomeKind,
        description: String,
    ) {
        self.last_outcome = Some(match result {
            Ok(()) => {
                info!(%description, "manual task change");
                Outcome {
                    kind,
                    title: "Task updated".to_string(),
                    description,
                    severity: Severity::Normal,
                }
            }
            Err(err) => {
                error!(%err, "manual task change failed");
                Outcome {
                    kind: OutcomeKind::Failed,
                    title: "Something went wrong".to_string(),
                    description: err.to_string(),
                    severity: Severity::Destructive,
                }
            }
        });
    }

    pub async fn handle_input(&mut self, key: KeyEvent) -> io::Result<bool> {
        match self.input_mode {
            InputMode::Normal => match key.code {
                KeyCode::Char('q') => return Ok(true),
                KeyCode::Char('j') | KeyCode::Down => self.next(),
                KeyCode::Char('k') | KeyCode::Up => self.previous(),
                KeyCode::Char('t') => {
                    self.show_done_tasks = !self.show_done_tasks;
                    self.reset_selection();
                }
                KeyCode::Char(':') | KeyCode::Char('v') | KeyCode::Char('a') => {
                    self.transcript.clear();
                    self.input_mode = InputMode::Command;
                }
                KeyCode::Char('c') => self.cycle_category(),
                KeyCode::Char('r') => self.cycle_reminder(),
                KeyCode::Char('x') => self.toggle_selected().await,
                KeyCode::Char('d') => self.delete_selected().await,
                KeyCode::Char('g') => self.refresh_tasks().await,
                KeyCode::Esc => self.last_outcome = None,
                _ => {}
            },
            InputMode::Command => match key.code {
                KeyCode::Char(c) => self.transcript.push(c),
                KeyCode::Backspace => {
                    self.transcript.pop();
                }
                KeyCode::Enter => {
                    self.input_mode = InputMode::Normal;
                    self.submit_transcript().await;
                }
                KeyCode::Esc => {
                    self.transcript.clear();
                    self.input_mode = InputMode::Normal;
                }
                _ => {}
            },
        }
        Ok(false)
    }
}
