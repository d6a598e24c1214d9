//! Records stored in the backend tables

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::permissions::Role;

/// Label used when a work log has no event or task
pub const GENERAL_LABEL: &str = "General";
/// Label used when a referenced event cannot be found
pub const UNKNOWN_EVENT: &str = "Unknown Event";
/// Label used when a referenced task cannot be found
pub const UNKNOWN_TASK: &str = "Unknown Task";
/// Label used when a work log carries no author name
pub const UNKNOWN_USER: &str = "Unknown User";

/// Calendar dates, accepted either as `YYYY-MM-DD` or as a full timestamp
mod calendar_date {
    use chrono::{DateTime, NaiveDate};
    use serde::{de, Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%Y-%m-%d";

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| de::Error::custom(format!("invalid date: {}", raw)))
    }

    pub fn parse(raw: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(raw, FORMAT)
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|d| d.date_naive()))
    }
}

/// Whether an event lies in the past, the coming week, or further out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Completed,
    Active,
    Upcoming,
}

impl EventStatus {
    /// Classify an event date relative to `today`.
    ///
    /// Negative day difference is completed, up to seven days ahead is
    /// active, anything later is upcoming.
    pub fn classify(date: NaiveDate, today: NaiveDate) -> Self {
        let diff_days = (date - today).num_days();
        if diff_days < 0 {
            EventStatus::Completed
        } else if diff_days <= 7 {
            EventStatus::Active
        } else {
            EventStatus::Upcoming
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Completed => "completed",
            EventStatus::Active => "active",
            EventStatus::Upcoming => "upcoming",
        }
    }
}

/// Top-level organizational unit owning tasks, ideas and work logs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub name: String,
    #[serde(with = "calendar_date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Event {
    pub fn status(&self, today: NaiveDate) -> EventStatus {
        EventStatus::classify(self.date, today)
    }
}

/// Fields accepted when creating an event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewEvent {
    pub name: String,
    #[serde(with = "calendar_date")]
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Partial update of an event; unset fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl EventPatch {
    pub fn date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date.format("%Y-%m-%d").to_string());
        self
    }
}

/// An event with the figures shown on the events grid
#[derive(Debug, Clone, PartialEq)]
pub struct EventSummary {
    pub event: Event,
    pub status: EventStatus,
    pub task_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }

    /// Pending and in-progress tasks count as active
    pub fn is_active(&self) -> bool {
        !matches!(self, TaskStatus::Completed)
    }
}

impl FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(Error::validation(format!("Unknown task status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub event_id: String,
    /// Older schemas call this column `task_name`
    #[serde(alias = "task_name")]
    pub name: String,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub deadline: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// A task together with its assignee's display name
#[derive(Debug, Clone, PartialEq)]
pub struct TaskWithAssignee {
    pub task: Task,
    pub assignee_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NewTask {
    pub event_id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    pub priority: Priority,
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
}

/// Freeform suggestion attached to an event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Idea {
    pub id: String,
    pub event_id: String,
    pub person_name: String,
    pub idea_text: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewIdea {
    pub event_id: String,
    pub person_name: String,
    pub idea_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkLog {
    pub id: String,
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
    /// Author's user id
    #[serde(default)]
    pub person_id: Option<String>,
    /// Author name as typed when the log was written; not kept in sync with profiles
    #[serde(default)]
    pub name: Option<String>,
    pub description: String,
    #[serde(default)]
    pub hours_spent: Option<f64>,
    #[serde(default)]
    pub attachment_path: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl WorkLog {
    pub fn is_authored_by(&self, user_id: &str) -> bool {
        self.person_id.as_deref() == Some(user_id)
    }
}

/// Input of the work log form
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewWorkLog {
    pub event_id: String,
    pub task_id: Option<String>,
    /// Display name of the author
    pub person: String,
    pub description: String,
    pub hours_spent: Option<f64>,
}

/// Row written to `work_logs`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub(crate) struct WorkLogInsert {
    pub event_id: String,
    pub task_id: Option<String>,
    pub person_id: String,
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours_spent: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct WorkLogPatch {
    /// Author display name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours_spent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_path: Option<String>,
}

/// A work log with the names of its event and task resolved
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedWorkLog {
    #[serde(flatten)]
    pub log: WorkLog,
    pub person: String,
    pub event_name: String,
    pub task_name: String,
}

/// Application-side profile of a user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default = "default_role_name")]
    pub role: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_role_name() -> String {
    Role::Member.as_str().to_string()
}

impl Profile {
    /// The stored role, if it is one of the canonical roles
    pub fn role(&self) -> Option<Role> {
        self.role.parse().ok()
    }

    pub fn display_name(&self) -> String {
        self.full_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| self.email.clone())
            .unwrap_or_else(|| UNKNOWN_USER.to_string())
    }
}

/// A profile with its task counters, as listed on the team page
#[derive(Debug, Clone, PartialEq)]
pub struct TeamMember {
    pub profile: Profile,
    pub tasks_assigned: usize,
    pub tasks_completed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn status_boundaries() {
        let today = day("2026-10-19");
        assert_eq!(EventStatus::classify(day("2026-10-18"), today), EventStatus::Completed);
        assert_eq!(EventStatus::classify(day("2026-10-19"), today), EventStatus::Active);
        assert_eq!(EventStatus::classify(day("2026-10-22"), today), EventStatus::Active);
        assert_eq!(EventStatus::classify(day("2026-10-26"), today), EventStatus::Active);
        assert_eq!(EventStatus::classify(day("2026-10-27"), today), EventStatus::Upcoming);
        assert_eq!(EventStatus::classify(day("2026-11-18"), today), EventStatus::Upcoming);
    }

    #[test]
    fn event_date_accepts_timestamps() {
        let event: Event = serde_json::from_value(json!({
            "id": "e1",
            "name": "Hackathon",
            "date": "2026-10-22T00:00:00+00:00"
        }))
        .unwrap();
        assert_eq!(event.date, day("2026-10-22"));

        let row = serde_json::to_value(&event).unwrap();
        assert_eq!(row["date"], "2026-10-22");
    }

    #[test]
    fn task_reads_legacy_column_name() {
        let task: Task = serde_json::from_value(json!({
            "id": "t1",
            "event_id": "e1",
            "task_name": "Book venue",
            "status": "in_progress"
        }))
        .unwrap();
        assert_eq!(task.name, "Book venue");
        assert_eq!(task.status, TaskStatus::InProgress);
        assert_eq!(task.priority, Priority::Medium);
    }

    #[test]
    fn profile_role_outside_canonical_set() {
        let profile: Profile = serde_json::from_value(json!({
            "id": "u1",
            "email": "ada@example.com",
            "role": "viewer"
        }))
        .unwrap();
        assert_eq!(profile.role(), None);
        assert_eq!(profile.display_name(), "ada@example.com");
    }
}
