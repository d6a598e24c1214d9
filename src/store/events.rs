use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;
use tracing::{debug, error, warn};

use super::{is_blank, require_user};
use crate::auth::AuthClient;
use crate::cascade::{CascadeDelete, Confirm, DeleteOutcome};
use crate::data::{from_row, from_rows, tables, to_row, value_text, DataClient, Filter, Query};
use crate::error::{Error, Result};
use crate::loader::select_in;
use crate::models::{Event, EventPatch, EventSummary, NewEvent};

/// Events, newest first
pub struct EventStore {
    data: Arc<dyn DataClient>,
    auth: Arc<dyn AuthClient>,
    events: Vec<Event>,
    loading: bool,
}

impl EventStore {
    pub fn new(data: Arc<dyn DataClient>, auth: Arc<dyn AuthClient>) -> Self {
        Self {
            data,
            auth,
            events: Vec::new(),
            loading: true,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Read all events. On failure the previous list is kept.
    pub async fn fetch(&mut self) -> Result<()> {
        let result = self
            .data
            .select(Query::table(tables::EVENTS).order("created_at", false))
            .await
            .and_then(from_rows::<Event>);
        self.loading = false;
        match result {
            Ok(events) => {
                debug!(count = events.len(), "fetched events");
                self.events = events;
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Error fetching events");
                Err(e)
            }
        }
    }

    pub async fn refetch(&mut self) -> Result<()> {
        self.fetch().await
    }

    pub async fn get(&self, id: &str) -> Result<Event> {
        let row = self
            .data
            .select_one(Query::table(tables::EVENTS).eq("id", id))
            .await?
            .ok_or_else(|| Error::not_found("Event not found"))?;
        from_row(row)
    }

    /// Create an event owned by the signed-in user
    pub async fn create_event(&mut self, event: NewEvent) -> Result<Event> {
        if is_blank(&event.name) {
            return Err(Error::validation("Event name is required"));
        }
        let user = require_user(self.auth.as_ref()).await?;

        let mut row = to_row(&event)?;
        row.insert("created_by".into(), Value::String(user.id));
        let created: Event = from_row(self.data.insert(tables::EVENTS, row).await?)?;

        self.refresh_after_write().await;
        Ok(created)
    }

    pub async fn update_event(&mut self, id: &str, patch: EventPatch) -> Result<Event> {
        if patch.name.as_deref().map_or(false, is_blank) {
            return Err(Error::validation("Event name is required"));
        }
        let patch = to_row(&patch)?;
        if patch.is_empty() {
            return Err(Error::validation("Nothing to update"));
        }

        let updated = self
            .data
            .update(tables::EVENTS, patch, vec![Filter::eq("id", id)])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found("Event not found"))?;
        let updated: Event = from_row(updated)?;

        self.refresh_after_write().await;
        Ok(updated)
    }

    /// Delete `event` and its dependents, then reload the list
    pub async fn delete_event(
        &mut self,
        cascade: &CascadeDelete,
        confirm: &dyn Confirm,
        event: &Event,
    ) -> Result<DeleteOutcome> {
        let outcome = cascade.delete_event(event, confirm).await?;
        if matches!(outcome, DeleteOutcome::Deleted(_)) {
            self.refresh_after_write().await;
        }
        Ok(outcome)
    }

    /// The loaded events with their status on `today` and task counts.
    ///
    /// Task counts come from one `in` query over all loaded events, split
    /// into chunks for long event lists.
    pub async fn summaries(&self, today: NaiveDate) -> Result<Vec<EventSummary>> {
        let ids: Vec<&str> = self.events.iter().map(|e| e.id.as_str()).collect();
        let mut counts: HashMap<String, usize> = HashMap::new();
        if !ids.is_empty() {
            let query = Query::table(tables::TASKS).select("event_id");
            let rows = select_in(self.data.as_ref(), query, "event_id", &ids).await?;
            for row in rows {
                if let Some(event_id) = row.get("event_id") {
                    *counts.entry(value_text(event_id)).or_default() += 1;
                }
            }
        }

        Ok(self
            .events
            .iter()
            .map(|event| EventSummary {
                status: event.status(today),
                task_count: counts.get(&event.id).copied().unwrap_or(0),
                event: event.clone(),
            })
            .collect())
    }

    async fn refresh_after_write(&mut self) {
        if let Err(e) = self.fetch().await {
            warn!(error = %e, "event list not refreshed");
        }
    }
}
