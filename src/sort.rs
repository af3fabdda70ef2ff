// View ordering for task lists

use crate::models::Task;
use eyre::eyre;
use std::cmp::Ordering;
use std::str::FromStr;

/// Ordering applied to a view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Newest first
    #[default]
    Created,
    /// Soonest first, undated last
    DueDate,
    /// Case-insensitive A to Z
    Title,
    /// Incomplete before completed
    Status,
}

impl SortKey {
    pub const ALL: [SortKey; 4] = [SortKey::Created, SortKey::DueDate, SortKey::Title, SortKey::Status];

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Created => "created",
            SortKey::DueDate => "dueDate",
            SortKey::Title => "title",
            SortKey::Status => "status",
        }
    }

    pub fn compare(self, a: &Task, b: &Task) -> Ordering {
        match self {
            SortKey::Created => b.created.cmp(&a.created),
            SortKey::DueDate => match (a.due_date, b.due_date) {
                (Some(x), Some(y)) => x.cmp(&y),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortKey::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortKey::Status => a.completed.cmp(&b.completed),
        }
    }
}

impl std::fmt::Display for SortKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace(['-', '_'], "");
        SortKey::ALL
            .into_iter()
            .find(|key| key.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| eyre!("Unknown sort key: {} (expected created, dueDate, title or status)", s))
    }
}

/// Return a copy of `tasks` ordered by `key`
///
/// The sort is stable, so ties keep their incoming order.
pub fn sort_tasks(tasks: &[Task], key: SortKey) -> Vec<Task> {
    let mut sorted = tasks.to_vec();
    sorted.sort_by(|a, b| key.compare(a, b));
    sorted
}
