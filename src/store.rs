// Task store: the owned task collection and its operations

use crate::filter::{FilterMode, filter_tasks};
use crate::kv::KeyValueStore;
use crate::models::{Task, local_now};
use crate::snapshot;
use crate::sort::{SortKey, sort_tasks};
use chrono::{NaiveDate, NaiveDateTime, Utc};
use eyre::Result;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Key the snapshot is stored under
pub const SNAPSHOT_KEY: &str = "taskflow_tasks";

/// Where a snapshot that failed to decode is copied before it can be overwritten
pub const CORRUPT_SNAPSHOT_KEY: &str = "taskflow_tasks_corrupt";

/// Rejected input at the add/edit boundary
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Task title cannot be empty")]
    EmptyTitle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A transient user-visible message about something the caller could not be told
/// through a return value (load and save failures)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Aggregate counts over a task collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub pending: usize,
}

impl Stats {
    pub fn of(tasks: &[Task]) -> Self {
        let total = tasks.len();
        let completed = tasks.iter().filter(|t| t.completed).count();
        Self {
            total,
            completed,
            pending: total - completed,
        }
    }
}

/// Authoritative task collection, persisted to a `KeyValueStore` after every mutation
///
/// Tasks are kept newest-first by insertion. Persistence failures never undo a
/// mutation; they are logged and queued as notices (see `take_notices`).
pub struct TaskStore<S: KeyValueStore> {
    storage: S,
    tasks: Vec<Task>,
    notices: Vec<Notice>,
}

impl<S: KeyValueStore> TaskStore<S> {
    /// Load the snapshot from `storage`
    ///
    /// A missing snapshot yields an empty store. An unreadable or malformed one also
    /// yields an empty store, plus an error notice.
    pub fn open(mut storage: S) -> Self {
        let mut notices = Vec::new();

        let tasks = match storage.get(SNAPSHOT_KEY) {
            Ok(None) => Vec::new(),
            Ok(Some(text)) => match snapshot::decode(&text) {
                Ok(tasks) => tasks,
                Err(e) => {
                    warn!(error = ?e, "Malformed snapshot, starting empty");
                    // Keep the unreadable text around; the next save replaces the snapshot
                    let kept = match storage.set(CORRUPT_SNAPSHOT_KEY, &text) {
                        Ok(()) => format!("the unreadable data was kept under {}", CORRUPT_SNAPSHOT_KEY),
                        Err(save_err) => {
                            warn!(error = ?save_err, "Failed to keep malformed snapshot");
                            "the next change will replace it".to_string()
                        }
                    };
                    notices.push(Notice::error(format!("Error loading tasks: {:#} ({})", e, kept)));
                    Vec::new()
                }
            },
            Err(e) => {
                warn!(error = ?e, "Failed to load tasks, starting empty");
                notices.push(Notice::error(format!("Error loading tasks: {:#}", e)));
                Vec::new()
            }
        };

        info!(count = tasks.len(), "Loaded tasks");

        Self {
            storage,
            tasks,
            notices,
        }
    }

    /// All tasks, newest first
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Tasks whose id starts with `prefix`. A blank prefix matches nothing.
    pub fn find_by_prefix(&self, prefix: &str) -> Vec<&Task> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Vec::new();
        }
        self.tasks.iter().filter(|t| t.id.starts_with(prefix)).collect()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Drain notices queued since the last call
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Create a task at the front of the collection
    ///
    /// Returns `None` without touching anything when the title is blank.
    pub fn add(&mut self, title: &str, description: &str, due_date: Option<NaiveDateTime>) -> Option<Task> {
        if title.trim().is_empty() {
            debug!("add: blank title, ignoring");
            return None;
        }

        let task = Task::new(title, description, due_date);
        debug!(id = %task.id, "add: created task");
        self.tasks.insert(0, task.clone());
        self.persist();

        Some(task)
    }

    /// Flip completion. Returns the new state, or `None` for an unknown id.
    pub fn toggle_completion(&mut self, id: &str) -> Option<bool> {
        let task = self.tasks.iter_mut().find(|t| t.id == id)?;
        let completed = !task.completed;
        task.set_completed(completed, Utc::now());
        debug!(id, completed, "toggle_completion");

        self.persist();
        Some(completed)
    }

    /// Overwrite the content fields of a task
    ///
    /// Returns `Ok(false)` for an unknown id. A blank title is rejected before any
    /// lookup and nothing changes.
    pub fn edit(
        &mut self,
        id: &str,
        title: &str,
        description: &str,
        due_date: Option<NaiveDateTime>,
    ) -> std::result::Result<bool, ValidationError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }

        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            return Ok(false);
        };

        task.title = title.to_string();
        task.description = description.trim().to_string();
        task.due_date = due_date;
        task.updated = Some(Utc::now());
        debug!(id, "edit: updated task");

        self.persist();
        Ok(true)
    }

    /// Remove a task. Returns whether anything was removed.
    pub fn delete(&mut self, id: &str) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);

        if self.tasks.len() == before {
            return false;
        }

        debug!(id, "delete: removed task");
        self.persist();
        true
    }

    /// Remove every task. Irreversible; callers gate this behind a confirmation.
    pub fn clear_all(&mut self) -> usize {
        let removed = self.tasks.len();
        self.tasks.clear();
        info!(removed, "Cleared all tasks");

        self.persist();
        removed
    }

    /// Replace the whole collection with the contents of an import file
    ///
    /// On any error the current collection is left as it was.
    pub fn import_from(&mut self, path: &Path) -> Result<usize> {
        let tasks = snapshot::read_import(path)?;
        let count = tasks.len();

        self.tasks = tasks;
        info!(path = ?path, count, "Imported tasks");

        self.persist();
        Ok(count)
    }

    // ========================================================================
    // Derived views
    // ========================================================================

    /// Counts over the full collection, regardless of any view
    pub fn stats(&self) -> Stats {
        Stats::of(&self.tasks)
    }

    /// Display view: filter first, then sort, evaluated at the current local time
    pub fn view(&self, mode: FilterMode, key: SortKey) -> Vec<Task> {
        self.view_at(mode, key, local_now())
    }

    pub fn view_at(&self, mode: FilterMode, key: SortKey, now: NaiveDateTime) -> Vec<Task> {
        sort_tasks(&filter_tasks(&self.tasks, mode, now), key)
    }

    /// Write the full, unfiltered collection to a dated file in `dir`
    pub fn export_to(&self, dir: &Path, today: NaiveDate) -> Result<PathBuf> {
        snapshot::write_export(dir, &self.tasks, today)
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    fn persist(&mut self) {
        let result = snapshot::encode(&self.tasks).and_then(|json| self.storage.set(SNAPSHOT_KEY, &json));

        if let Err(e) = result {
            warn!(error = ?e, "Failed to save tasks; in-memory state kept");
            self.notices.push(Notice::error(format!("Error saving tasks: {:#}", e)));
        }
    }
}
