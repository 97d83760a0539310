use crate::error::StoreError;
use crate::models::{NewTask, Task, TaskId, TaskPatch};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;

/// The CRUD operations the voice pipeline needs from the task backend.
///
/// Implementations are handed to the executor explicitly; nothing in the
/// pipeline holds tasks between commands.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError>;
    async fn create_task(&self, task: NewTask) -> Result<Task, StoreError>;
    async fn update_task(&self, id: TaskId, patch: TaskPatch) -> Result<Task, StoreError>;
    async fn delete_task(&self, id: TaskId) -> Result<(), StoreError>;
}

#[derive(Default)]
struct MemoryState {
    tasks: Vec<Task>,
    next_id: TaskId,
    // Number of mutating calls that succeed before every later one fails.
    fail_after: Option<usize>,
    calls: Vec<StoreCall>,
}

/// A record of each mutating call, in order.
#[derive(Clone, Debug, PartialEq)]
pub enum StoreCall {
    Create(NewTask),
    Update(TaskId, TaskPatch),
    Delete(TaskId),
}

/// In-process store used in offline mode and by tests.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Self {
        let next_id = tasks.iter().map(|t| t.id).max().unwrap_or(0);
        MemoryStore {
            state: Mutex::new(MemoryState {
                tasks,
                next_id,
                ..Default::default()
            }),
        }
    }

    /// Make every mutating call after the first `n` fail.
    pub fn fail_after(self, n: usize) -> Self {
        self.lock().fail_after = Some(n);
        self
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.lock().calls.clone()
    }

    pub fn snapshot(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a test panicked mid-call; the data is still usable.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(state: &mut MemoryState, call: StoreCall) -> Result<(), StoreError> {
        if let Some(limit) = state.fail_after {
            if state.calls.len() >= limit {
                return Err(StoreError::Unavailable("injected failure".to_string()));
            }
        }
        state.calls.push(call);
        Ok(())
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        Ok(self.snapshot())
    }

    async fn create_task(&self, task: NewTask) -> Result<Task, StoreError> {
        let mut state = self.lock();
        Self::record(&mut state, StoreCall::Create(task.clone()))?;
        state.next_id += 1;
        let now = Utc::now();
        let created = Task {
            id: state.next_id,
            title: task.title,
            description: task.description,
            priority: task.priority,
            completed: task.completed,
            due_date: task.due_date,
            category_id: task.category_id,
            reminder_enabled: task.reminder_enabled,
            reminder_type: task.reminder_type,
            reminder_time: task.reminder_time,
            created_at: now,
            updated_at: now,
            user_id: "local".to_string(),
        };
        state.tasks.push(created.clone());
        Ok(created)
    }

    async fn update_task(&self, id: TaskId, patch: TaskPatch) -> Result<Task, StoreError> {
        let mut state = self.lock();
        Self::record(&mut state, StoreCall::Update(id, patch.clone()))?;
        let task = state
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or(StoreError::NotFound(id))?;
        if let Some(title) = patch.title {
            task.title = title;
        }
        if let Some(completed) = patch.completed {
            task.completed = completed;
        }
        if let Some(due_date) = patch.due_date {
            task.due_date = Some(due_date);
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        task.updated_at = Utc::now();
        Ok(task.clone())
    }

    async fn delete_task(&self, id: TaskId) -> Result<(), StoreError> {
        let mut state = self.lock();
        Self::record(&mut state, StoreCall::Delete(id))?;
        let before = state.tasks.len();
        state.tasks.retain(|t| t.id != id);
        if state.tasks.len() == before {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }
}
