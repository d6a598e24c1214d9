use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, error, warn};

use super::is_blank;
use crate::auth::{AuthClient, User};
use crate::cascade::Confirm;
use crate::data::{from_row, from_rows, tables, to_row, DataClient, Filter, Query};
use crate::error::{Error, Result};
use crate::loader::load_labels;
use crate::models::{
    EnrichedWorkLog, NewWorkLog, WorkLog, WorkLogInsert, WorkLogPatch, GENERAL_LABEL, UNKNOWN_EVENT,
    UNKNOWN_TASK, UNKNOWN_USER,
};

/// Question put to the user before a work log is deleted
pub const DELETE_PROMPT: &str = "Are you sure you want to delete this work log?";

/// Work logs with their event and task names resolved.
///
/// Lists every log by default, or the logs of one event when built with
/// [`WorkLogStore::for_event`].
pub struct WorkLogStore {
    data: Arc<dyn DataClient>,
    auth: Arc<dyn AuthClient>,
    event_id: Option<String>,
    logs: Vec<EnrichedWorkLog>,
    loading: bool,
}

impl WorkLogStore {
    pub fn new(data: Arc<dyn DataClient>, auth: Arc<dyn AuthClient>) -> Self {
        Self {
            data,
            auth,
            event_id: None,
            logs: Vec::new(),
            loading: true,
        }
    }

    /// A store listing only the logs of `event_id`
    pub fn for_event(data: Arc<dyn DataClient>, auth: Arc<dyn AuthClient>, event_id: &str) -> Self {
        Self {
            event_id: Some(event_id.to_string()),
            ..Self::new(data, auth)
        }
    }

    pub fn work_logs(&self) -> &[EnrichedWorkLog] {
        &self.logs
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Read and enrich the logs. On failure the list is emptied.
    pub async fn fetch(&mut self) -> Result<()> {
        let result = self.load().await;
        self.loading = false;
        match result {
            Ok(logs) => {
                debug!(count = logs.len(), "fetched work logs");
                self.logs = logs;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Error fetching work logs");
                self.logs.clear();
                Err(e)
            }
        }
    }

    pub async fn refetch(&mut self) -> Result<()> {
        self.fetch().await
    }

    async fn load(&self) -> Result<Vec<EnrichedWorkLog>> {
        let mut query = Query::table(tables::WORK_LOGS).order("created_at", false);
        if let Some(event_id) = &self.event_id {
            query = query.eq("event_id", event_id);
        }
        let logs: Vec<WorkLog> = from_rows(self.data.select(query).await?)?;
        Ok(enrich(self.data.as_ref(), logs).await)
    }

    /// Validate, then insert a log authored by the signed-in user
    pub async fn create_work_log(&mut self, log: NewWorkLog) -> Result<WorkLog> {
        let missing: Vec<&str> = [
            ("event_id", log.event_id.as_str()),
            ("description", log.description.as_str()),
            ("person", log.person.as_str()),
        ]
        .into_iter()
        .filter(|(_, value)| is_blank(value))
        .map(|(field, _)| field)
        .collect();
        if !missing.is_empty() {
            return Err(Error::missing_fields(&missing));
        }

        let user = self.current_user().await?;
        let row = WorkLogInsert {
            event_id: log.event_id,
            task_id: log.task_id.filter(|id| !is_blank(id)),
            person_id: user.id,
            name: log.person,
            description: log.description,
            hours_spent: log.hours_spent,
        };

        let inserted = self
            .data
            .insert(tables::WORK_LOGS, to_row(&row)?)
            .await
            .map_err(|e| {
                error!(error = %e, "work log insert failed");
                Error::database(format!("Unable to insert work log. {}", e))
            })?;
        let created: WorkLog = from_row(inserted)?;

        self.refresh_after_write().await;
        Ok(created)
    }

    /// Change a log written by the signed-in user
    ///
    /// Text fields are trimmed; a name or description that would be left
    /// blank is rejected before any request.
    pub async fn update_work_log(&mut self, id: &str, mut patch: WorkLogPatch) -> Result<WorkLog> {
        patch.name = patch.name.map(|name| name.trim().to_string());
        patch.description = patch.description.map(|text| text.trim().to_string());
        let mut missing = Vec::new();
        if patch.description.as_deref().map_or(false, str::is_empty) {
            missing.push("description");
        }
        if patch.name.as_deref().map_or(false, str::is_empty) {
            missing.push("name");
        }
        if !missing.is_empty() {
            return Err(Error::missing_fields(&missing));
        }
        let patch = to_row(&patch)?;
        if patch.is_empty() {
            return Err(Error::validation("Nothing to update"));
        }

        let user = self.current_user().await?;
        self.check_author(id, &user, "You can only edit your own work logs").await?;

        let updated = self
            .data
            .update(
                tables::WORK_LOGS,
                patch,
                vec![Filter::eq("id", id), Filter::eq("person_id", &user.id)],
            )
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found("Work log not found"))?;
        let updated: WorkLog = from_row(updated)?;

        self.refresh_after_write().await;
        Ok(updated)
    }

    /// Delete a log written by the signed-in user.
    ///
    /// Nothing is sent unless `confirm` accepts; a declined prompt yields
    /// `Ok(false)`. The row leaves the local list before the request is sent
    /// and is put back at its position if the delete fails.
    pub async fn delete_work_log(&mut self, id: &str, confirm: &dyn Confirm) -> Result<bool> {
        if !confirm.confirm(DELETE_PROMPT) {
            debug!(work_log_id = id, "work log delete declined");
            return Ok(false);
        }

        let user = self.current_user().await?;
        self.check_author(id, &user, "You can only delete your own work logs").await?;

        let position = self.logs.iter().position(|l| l.log.id == id);
        let removed = position.map(|index| (index, self.logs.remove(index)));

        let result = self
            .data
            .delete(
                tables::WORK_LOGS,
                vec![Filter::eq("id", id), Filter::eq("person_id", &user.id)],
            )
            .await
            .and_then(|deleted| {
                if deleted.is_empty() {
                    Err(Error::not_found("Work log not found"))
                } else {
                    Ok(true)
                }
            });

        if let Err(e) = &result {
            error!(work_log_id = id, error = %e, "work log delete failed");
            if let Some((index, log)) = removed {
                self.logs.insert(index.min(self.logs.len()), log);
            }
        }
        result
    }

    async fn current_user(&self) -> Result<User> {
        match self.auth.get_user().await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => Err(Error::auth("User not authenticated")),
            Err(e) => {
                error!(error = %e, "auth lookup failed");
                Err(Error::auth("Failed to get authenticated user"))
            }
        }
    }

    /// Fail unless `user` wrote the log `id`; the loaded list is consulted first
    async fn check_author(&self, id: &str, user: &User, message: &str) -> Result<()> {
        let authored = match self.logs.iter().find(|l| l.log.id == id) {
            Some(enriched) => enriched.log.is_authored_by(&user.id),
            None => {
                let row = self
                    .data
                    .select_one(Query::table(tables::WORK_LOGS).eq("id", id))
                    .await?
                    .ok_or_else(|| Error::not_found("Work log not found"))?;
                from_row::<WorkLog>(row)?.is_authored_by(&user.id)
            }
        };
        if authored {
            Ok(())
        } else {
            Err(Error::permission_denied(message))
        }
    }

    async fn refresh_after_write(&mut self) {
        if let Err(e) = self.fetch().await {
            warn!(error = %e, "work log list not refreshed");
        }
    }
}

/// Attach event and task names to `logs` with one lookup per table.
///
/// Lookup failures are logged and degrade to the unknown labels.
async fn enrich(data: &dyn DataClient, logs: Vec<WorkLog>) -> Vec<EnrichedWorkLog> {
    let event_ids = logs.iter().filter_map(|l| l.event_id.as_deref());
    let task_ids = logs.iter().filter_map(|l| l.task_id.as_deref());
    let (events, tasks) = futures::join!(
        load_labels(data, tables::EVENTS, "name", event_ids),
        load_labels(data, tables::TASKS, "name", task_ids),
    );
    let events = events.unwrap_or_else(|e| {
        warn!(error = %e, "event name lookup failed");
        HashMap::new()
    });
    let tasks = tasks.unwrap_or_else(|e| {
        warn!(error = %e, "task name lookup failed");
        HashMap::new()
    });

    logs.into_iter()
        .map(|log| EnrichedWorkLog {
            person: log
                .name
                .clone()
                .filter(|n| !is_blank(n))
                .unwrap_or_else(|| UNKNOWN_USER.to_string()),
            event_name: label(log.event_id.as_deref(), &events, UNKNOWN_EVENT),
            task_name: label(log.task_id.as_deref(), &tasks, UNKNOWN_TASK),
            log,
        })
        .collect()
}

fn label(id: Option<&str>, names: &HashMap<String, String>, unknown: &str) -> String {
    match id.filter(|id| !id.is_empty()) {
        None => GENERAL_LABEL.to_string(),
        Some(id) => names.get(id).cloned().unwrap_or_else(|| unknown.to_string()),
    }
}
