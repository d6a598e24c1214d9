use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use tracing::{debug, error, warn};

use super::is_blank;
use crate::data::{from_row, from_rows, tables, to_row, DataClient, Filter, Query, Row};
use crate::error::{Error, Result};
use crate::loader::load_labels;
use crate::models::{NewTask, Task, TaskStatus, TaskWithAssignee};

/// Tasks of one event
pub struct TaskStore {
    data: Arc<dyn DataClient>,
    event_id: String,
    tasks: Vec<TaskWithAssignee>,
    loading: bool,
}

impl TaskStore {
    pub fn new(data: Arc<dyn DataClient>, event_id: &str) -> Self {
        Self {
            data,
            event_id: event_id.to_string(),
            tasks: Vec::new(),
            loading: true,
        }
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    pub fn tasks(&self) -> &[TaskWithAssignee] {
        &self.tasks
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Read the event's tasks and resolve assignee names
    pub async fn fetch(&mut self) -> Result<()> {
        let result = self.load().await;
        self.loading = false;
        match result {
            Ok(tasks) => {
                debug!(event_id = %self.event_id, count = tasks.len(), "fetched tasks");
                self.tasks = tasks;
                Ok(())
            }
            Err(e) => {
                error!(event_id = %self.event_id, error = %e, "Error fetching tasks");
                Err(e)
            }
        }
    }

    pub async fn refetch(&mut self) -> Result<()> {
        self.fetch().await
    }

    async fn load(&self) -> Result<Vec<TaskWithAssignee>> {
        let rows = self
            .data
            .select(
                Query::table(tables::TASKS)
                    .eq("event_id", &self.event_id)
                    .order("created_at", false),
            )
            .await?;
        let tasks: Vec<Task> = from_rows(rows)?;

        let assignees = tasks.iter().filter_map(|t| t.assigned_to.as_deref());
        let names = match load_labels(self.data.as_ref(), tables::PROFILES, "full_name", assignees).await {
            Ok(names) => names,
            Err(e) => {
                warn!(event_id = %self.event_id, error = %e, "assignee lookup failed");
                Default::default()
            }
        };

        Ok(tasks
            .into_iter()
            .map(|task| TaskWithAssignee {
                assignee_name: task.assigned_to.as_ref().and_then(|id| names.get(id).cloned()),
                task,
            })
            .collect())
    }

    /// Create a task in this store's event
    pub async fn create_task(&mut self, mut task: NewTask) -> Result<Task> {
        if is_blank(&task.name) {
            return Err(Error::validation("Task name is required"));
        }
        task.event_id = self.event_id.clone();

        let created: Task = from_row(self.data.insert(tables::TASKS, to_row(&task)?).await?)?;
        if let Err(e) = self.fetch().await {
            warn!(error = %e, "task list not refreshed");
        }
        Ok(created)
    }

    /// Move a task to `status`
    pub async fn update_status(&mut self, task_id: &str, status: TaskStatus) -> Result<()> {
        let mut patch = Row::new();
        patch.insert("status".into(), json!(status));
        patch.insert(
            "updated_at".into(),
            Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)),
        );

        let updated = self
            .data
            .update(tables::TASKS, patch, vec![Filter::eq("id", task_id)])
            .await?;
        if updated.is_empty() {
            return Err(Error::not_found("Task not found"));
        }

        if let Some(entry) = self.tasks.iter_mut().find(|t| t.task.id == task_id) {
            entry.task.status = status;
        }
        Ok(())
    }
}
