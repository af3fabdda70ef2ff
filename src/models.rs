// Data models for TaskFlow

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use eyre::{Result, eyre};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// A single to-do item
///
/// Field names on the wire are camelCase (`dueDate`, `completedAt`), matching
/// snapshots written by the browser version of TaskFlow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub description: String,
    #[serde(default, with = "due_date_format")]
    pub due_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub completed: bool,
    pub created: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
}

impl Task {
    /// Build a fresh, incomplete task. Title and description are trimmed.
    pub fn new(title: &str, description: &str, due_date: Option<NaiveDateTime>) -> Self {
        Self {
            id: new_id(),
            title: title.trim().to_string(),
            description: description.trim().to_string(),
            due_date,
            completed: false,
            created: Utc::now(),
            completed_at: None,
            updated: None,
        }
    }

    /// Set completion state, keeping `completed_at` in step with `completed`
    pub fn set_completed(&mut self, completed: bool, at: DateTime<Utc>) {
        self.completed = completed;
        self.completed_at = if completed { Some(at) } else { None };
    }

    /// Incomplete with a due date strictly before `now`
    pub fn is_overdue(&self, now: NaiveDateTime) -> bool {
        match self.due_date {
            Some(due) => !self.completed && due < now,
            None => false,
        }
    }

    /// Restore the completion invariant on records that came from outside.
    pub(crate) fn normalize_completion(&mut self) {
        match (self.completed, self.completed_at) {
            (true, None) => self.completed_at = Some(self.updated.unwrap_or(self.created)),
            (false, Some(_)) => self.completed_at = None,
            _ => {}
        }
    }
}

/// Generate a task id: UUID v7, so a millisecond timestamp prefix plus random bits
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// Current wall-clock time as a naive local date-time (the frame due dates live in)
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Parse a user- or file-supplied due date
///
/// Accepts `YYYY-MM-DDTHH:MM[:SS[.fff]]`, the same with a space separator, a bare
/// `YYYY-MM-DD` (midnight), or RFC 3339 with an offset (converted to local time).
pub fn parse_due_date(input: &str) -> Result<NaiveDateTime> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Local).naive_local());
    }

    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, fmt) {
            return Ok(dt);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN));
    }

    Err(eyre!(
        "Invalid due date: {:?} (expected YYYY-MM-DD or YYYY-MM-DDTHH:MM)",
        input
    ))
}

/// Render a due date in its wire form: minutes precision unless seconds are set
pub fn format_due_date(due: &NaiveDateTime) -> String {
    if due.second() == 0 && due.nanosecond() == 0 {
        due.format("%Y-%m-%dT%H:%M").to_string()
    } else {
        due.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
    }
}

fn nullable_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

mod due_date_format {
    use super::{format_due_date, parse_due_date};
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S>(value: &Option<NaiveDateTime>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(due) => serializer.serialize_str(&format_due_date(due)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(s) if !s.trim().is_empty() => parse_due_date(&s).map(Some).map_err(de::Error::custom),
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn at(s: &str) -> NaiveDateTime {
        parse_due_date(s).unwrap()
    }

    #[test]
    fn test_new_task_defaults() {
        let task = Task::new("  Buy milk ", " two litres ", None);
        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.description, "two litres");
        assert!(!task.completed);
        assert!(task.completed_at.is_none());
        assert!(task.updated.is_none());
        assert!(!task.id.is_empty());
    }

    #[test]
    fn test_new_ids_are_unique() {
        let ids: std::collections::HashSet<String> = (0..1000).map(|_| new_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_set_completed_tracks_timestamp() {
        let mut task = Task::new("Task", "", None);
        let now = Utc::now();

        task.set_completed(true, now);
        assert!(task.completed);
        assert_eq!(task.completed_at, Some(now));

        task.set_completed(false, now);
        assert!(!task.completed);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn test_is_overdue() {
        let now = at("2024-06-01T12:00");
        let mut task = Task::new("Task", "", Some(now - Duration::minutes(1)));
        assert!(task.is_overdue(now));

        task.due_date = Some(now);
        assert!(!task.is_overdue(now), "due exactly now is not overdue");

        task.due_date = Some(now - Duration::days(1));
        task.set_completed(true, Utc::now());
        assert!(!task.is_overdue(now));

        task.due_date = None;
        task.set_completed(false, Utc::now());
        assert!(!task.is_overdue(now));
    }

    #[test]
    fn test_parse_due_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 30, 0)
            .unwrap();
        assert_eq!(at("2024-03-09T14:30"), expected);
        assert_eq!(at("2024-03-09T14:30:00"), expected);
        assert_eq!(at("2024-03-09 14:30"), expected);
        assert_eq!(at("2024-03-09"), expected.date().and_time(NaiveTime::MIN));
        assert!(parse_due_date("tomorrow").is_err());
        assert!(parse_due_date("").is_err());
    }

    #[test]
    fn test_parse_due_date_rfc3339_converts_to_local() {
        let utc = Utc.with_ymd_and_hms(2024, 3, 9, 14, 30, 0).unwrap();
        let parsed = at("2024-03-09T14:30:00Z");
        assert_eq!(parsed, utc.with_timezone(&Local).naive_local());
    }

    #[test]
    fn test_format_due_date() {
        assert_eq!(format_due_date(&at("2024-03-09T14:30")), "2024-03-09T14:30");
        assert_eq!(format_due_date(&at("2024-03-09T14:30:15")), "2024-03-09T14:30:15");
    }

    #[test]
    fn test_task_serialization_field_names() {
        let mut task = Task::new("Call Bob", "", Some(at("2024-03-09T14:30")));
        task.set_completed(true, Utc::now());

        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["dueDate"], "2024-03-09T14:30");
        assert!(json["completedAt"].is_string());
        assert!(json.get("updated").is_none());
        assert!(json.get("due_date").is_none());

        let back: Task = serde_json::from_value(json).unwrap();
        assert_eq!(back, task);
    }

    #[test]
    fn test_task_deserialize_browser_record() {
        let json = r#"{
            "id": "lq2k3j4abc",
            "title": "Buy milk",
            "description": null,
            "dueDate": "",
            "completed": false,
            "created": "2024-01-05T09:15:00.000Z"
        }"#;

        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.id, "lq2k3j4abc");
        assert_eq!(task.description, "");
        assert!(task.due_date.is_none());
        assert!(task.completed_at.is_none());
        assert!(task.updated.is_none());
    }

    #[test]
    fn test_normalize_completion() {
        let mut task = Task::new("Task", "", None);
        task.completed = true;
        task.normalize_completion();
        assert_eq!(task.completed_at, Some(task.created));

        task.completed = false;
        task.normalize_completion();
        assert!(task.completed_at.is_none());
    }
}
