// View filtering for task lists

use crate::models::Task;
use chrono::NaiveDateTime;
use eyre::eyre;
use std::str::FromStr;

/// Which tasks a view shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    All,
    Completed,
    Pending,
    Overdue, // due date set, not completed, due < now
}

impl FilterMode {
    pub const ALL: [FilterMode; 4] = [
        FilterMode::All,
        FilterMode::Completed,
        FilterMode::Pending,
        FilterMode::Overdue,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterMode::All => "all",
            FilterMode::Completed => "completed",
            FilterMode::Pending => "pending",
            FilterMode::Overdue => "overdue",
        }
    }

    /// Whether a single task passes this filter, evaluated at `now`
    pub fn matches(self, task: &Task, now: NaiveDateTime) -> bool {
        match self {
            FilterMode::All => true,
            FilterMode::Completed => task.completed,
            FilterMode::Pending => !task.completed,
            FilterMode::Overdue => task.is_overdue(now),
        }
    }
}

impl std::fmt::Display for FilterMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FilterMode {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FilterMode::ALL
            .into_iter()
            .find(|mode| mode.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| eyre!("Unknown filter: {} (expected all, completed, pending or overdue)", s))
    }
}

/// Select the tasks matching `mode`, keeping their relative order
///
/// The input is never modified; the result is a fresh sequence.
pub fn filter_tasks(tasks: &[Task], mode: FilterMode, now: NaiveDateTime) -> Vec<Task> {
    tasks.iter().filter(|t| mode.matches(t, now)).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::parse_due_date;
    use chrono::{Duration, Utc};

    fn sample(now: NaiveDateTime) -> Vec<Task> {
        let mut done_late = Task::new("done late", "", Some(now - Duration::days(2)));
        done_late.set_completed(true, Utc::now());

        vec![
            Task::new("undated", "", None),
            Task::new("late", "", Some(now - Duration::hours(1))),
            Task::new("future", "", Some(now + Duration::hours(1))),
            done_late,
            Task::new("exactly now", "", Some(now)),
        ]
    }

    fn titles(tasks: &[Task]) -> Vec<&str> {
        tasks.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn test_filter_all_returns_everything_in_order() {
        let now = parse_due_date("2024-06-01T12:00").unwrap();
        let tasks = sample(now);
        let result = filter_tasks(&tasks, FilterMode::All, now);
        assert_eq!(result, tasks);
    }

    #[test]
    fn test_filter_completed_and_pending() {
        let now = parse_due_date("2024-06-01T12:00").unwrap();
        let tasks = sample(now);

        assert_eq!(titles(&filter_tasks(&tasks, FilterMode::Completed, now)), vec!["done late"]);
        assert_eq!(
            titles(&filter_tasks(&tasks, FilterMode::Pending, now)),
            vec!["undated", "late", "future", "exactly now"]
        );
    }

    #[test]
    fn test_filter_overdue() {
        let now = parse_due_date("2024-06-01T12:00").unwrap();
        let tasks = sample(now);

        let overdue = filter_tasks(&tasks, FilterMode::Overdue, now);
        assert_eq!(titles(&overdue), vec!["late"]);

        // Exactly the tasks satisfying the predicate
        for task in &tasks {
            let expected = task.due_date.is_some_and(|d| d < now) && !task.completed;
            assert_eq!(overdue.contains(task), expected, "task {}", task.title);
        }
    }

    #[test]
    fn test_filter_does_not_mutate_source() {
        let now = parse_due_date("2024-06-01T12:00").unwrap();
        let tasks = sample(now);
        let before = tasks.clone();
        let _ = filter_tasks(&tasks, FilterMode::Completed, now);
        assert_eq!(tasks, before);
    }

    #[test]
    fn test_filter_mode_parse_and_display() {
        assert_eq!("overdue".parse::<FilterMode>().unwrap(), FilterMode::Overdue);
        assert_eq!("Pending".parse::<FilterMode>().unwrap(), FilterMode::Pending);
        assert!("archived".parse::<FilterMode>().is_err());
        assert_eq!(FilterMode::Completed.to_string(), "completed");
        assert_eq!(FilterMode::default(), FilterMode::All);
    }
}
