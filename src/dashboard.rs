//! Figures and activity feed shown on the dashboard

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::data::{tables, DataClient, Query};
use crate::error::Result;
use crate::models::{EnrichedWorkLog, TaskStatus};

/// Number of work logs shown in the activity feed
pub const RECENT_ACTIVITY_LIMIT: usize = 6;
const PREVIEW_CHARS: usize = 40;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_events: usize,
    /// Pending plus in-progress tasks
    pub active_tasks: usize,
    pub completed_tasks: usize,
    pub team_members: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Activity {
    pub user: String,
    pub action: String,
    pub time_ago: String,
}

pub struct Dashboard {
    data: Arc<dyn DataClient>,
}

impl Dashboard {
    pub fn new(data: Arc<dyn DataClient>) -> Self {
        Self { data }
    }

    /// Count events, tasks by status and profiles.
    ///
    /// Tasks without a recognised status are left out of both task figures.
    pub async fn stats(&self) -> Result<DashboardStats> {
        let (events, tasks, profiles) = futures::try_join!(
            self.data.select(Query::table(tables::EVENTS).select("id")),
            self.data.select(Query::table(tables::TASKS).select("status")),
            self.data.select(Query::table(tables::PROFILES).select("id")),
        )?;

        let mut stats = DashboardStats {
            total_events: events.len(),
            team_members: profiles.len(),
            ..Default::default()
        };
        for task in &tasks {
            match task.get("status").and_then(Value::as_str).map(str::parse::<TaskStatus>) {
                Some(Ok(status)) if status.is_active() => stats.active_tasks += 1,
                Some(Ok(_)) => stats.completed_tasks += 1,
                _ => {}
            }
        }
        Ok(stats)
    }

    /// The newest work logs as feed entries.
    ///
    /// `logs` is expected newest first, as stores return them.
    pub fn recent_activity(logs: &[EnrichedWorkLog], now: DateTime<Utc>) -> Vec<Activity> {
        logs.iter()
            .take(RECENT_ACTIVITY_LIMIT)
            .map(|entry| Activity {
                user: entry.person.clone(),
                action: format!("submitted work log: {}", preview(&entry.log.description)),
                time_ago: entry
                    .log
                    .created_at
                    .map(|at| time_ago(at, now))
                    .unwrap_or_default(),
            })
            .collect()
    }
}

fn preview(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(PREVIEW_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

/// Coarse relative time such as `5 minutes ago`
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let elapsed = now.signed_duration_since(then);
    let (count, unit) = if elapsed.num_days() > 0 {
        (elapsed.num_days(), "day")
    } else if elapsed.num_hours() > 0 {
        (elapsed.num_hours(), "hour")
    } else if elapsed.num_minutes() > 0 {
        (elapsed.num_minutes(), "minute")
    } else {
        return "just now".to_string();
    };
    format!("{} {}{} ago", count, unit, if count == 1 { "" } else { "s" })
}
