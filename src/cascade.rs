//! Deleting an event together with everything that hangs off it
//!
//! The backend does not cascade, so the work logs, tasks and ideas of the
//! event are deleted first, concurrently, and the event row last. A failed
//! dependent delete is logged and does not stop the event delete. Nothing is
//! rolled back when the event delete itself fails.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::data::{tables, DataClient, Filter, Row};
use crate::error::{Error, Result};
use crate::models::Event;
use crate::notify::Notifier;

/// Interactive confirmation asked for before anything is deleted
pub trait Confirm: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Where a cascade currently is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeletePhase {
    Pending,
    DeletingDependents,
    DeletingEvent,
    Finished,
    Failed(String),
}

/// Settled result of deleting one dependent table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependentOutcome {
    pub table: &'static str,
    /// Number of deleted rows, or the error message
    pub result: std::result::Result<usize, String>,
}

impl DependentOutcome {
    fn settle(table: &'static str, result: Result<Vec<Row>>) -> Self {
        Self {
            table,
            result: result.map(|rows| rows.len()).map_err(|e| e.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

impl fmt::Display for DependentOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(n) => write!(f, "{}: {} deleted", self.table, n),
            Err(e) => write!(f, "{}: failed ({})", self.table, e),
        }
    }
}

/// Outcomes of the three dependent deletes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CascadeReport {
    pub work_logs: DependentOutcome,
    pub tasks: DependentOutcome,
    pub ideas: DependentOutcome,
}

impl CascadeReport {
    pub fn outcomes(&self) -> [&DependentOutcome; 3] {
        [&self.work_logs, &self.tasks, &self.ideas]
    }

    /// Dependent deletes that did not succeed
    pub fn failures(&self) -> Vec<&DependentOutcome> {
        self.outcomes().into_iter().filter(|o| !o.is_ok()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The user declined; nothing was sent to the backend
    Declined,
    Deleted(CascadeReport),
}

/// A cascade running in the background
pub struct DeleteHandle {
    progress: watch::Receiver<DeletePhase>,
    task: JoinHandle<Result<CascadeReport>>,
}

impl DeleteHandle {
    pub fn phase(&self) -> DeletePhase {
        self.progress.borrow().clone()
    }

    /// Receiver notified on every phase change
    pub fn progress(&self) -> watch::Receiver<DeletePhase> {
        self.progress.clone()
    }

    /// Stop the cascade at its next await point.
    ///
    /// Requests already sent are not recalled; aborting before the event
    /// delete has been issued leaves the event row in place.
    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the cascade to settle
    pub async fn join(self) -> Result<CascadeReport> {
        match self.task.await {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => Err(Error::Cancelled),
            Err(e) => Err(Error::general(format!("delete task failed: {}", e))),
        }
    }
}

#[derive(Clone)]
pub struct CascadeDelete {
    data: Arc<dyn DataClient>,
    notifier: Notifier,
}

impl CascadeDelete {
    pub fn new(data: Arc<dyn DataClient>, notifier: Notifier) -> Self {
        Self { data, notifier }
    }

    /// Question put to the user before deleting `event_name`
    pub fn prompt(event_name: &str) -> String {
        format!(
            "Are you sure you want to delete \"{}\"? This will also delete all associated tasks, ideas, and work logs. This action cannot be undone.",
            event_name
        )
    }

    /// Confirm, then delete `event` and its dependents
    pub async fn delete_event(&self, event: &Event, confirm: &dyn Confirm) -> Result<DeleteOutcome> {
        if !confirm.confirm(&Self::prompt(&event.name)) {
            info!(event_id = %event.id, "event deletion declined");
            return Ok(DeleteOutcome::Declined);
        }
        let (phase, _) = watch::channel(DeletePhase::Pending);
        self.run(event.id.clone(), phase)
            .await
            .map(DeleteOutcome::Deleted)
    }

    /// Confirm, then run the cascade as a background task.
    ///
    /// Returns `None` when the user declines.
    pub fn spawn(&self, event: &Event, confirm: &dyn Confirm) -> Option<DeleteHandle> {
        if !confirm.confirm(&Self::prompt(&event.name)) {
            info!(event_id = %event.id, "event deletion declined");
            return None;
        }
        let (phase, progress) = watch::channel(DeletePhase::Pending);
        let this = self.clone();
        let event_id = event.id.clone();
        let task = tokio::spawn(async move { this.run(event_id, phase).await });
        Some(DeleteHandle { progress, task })
    }

    async fn run(&self, event_id: String, phase: watch::Sender<DeletePhase>) -> Result<CascadeReport> {
        phase.send_replace(DeletePhase::DeletingDependents);

        let by_event = || vec![Filter::eq("event_id", &event_id)];
        let (work_logs, tasks, ideas) = futures::join!(
            self.data.delete(tables::WORK_LOGS, by_event()),
            self.data.delete(tables::TASKS, by_event()),
            self.data.delete(tables::IDEAS, by_event()),
        );
        let report = CascadeReport {
            work_logs: DependentOutcome::settle(tables::WORK_LOGS, work_logs),
            tasks: DependentOutcome::settle(tables::TASKS, tasks),
            ideas: DependentOutcome::settle(tables::IDEAS, ideas),
        };
        for outcome in report.outcomes() {
            match &outcome.result {
                Ok(deleted) => info!(event_id = %event_id, table = outcome.table, deleted, "dependent rows deleted"),
                Err(e) => warn!(event_id = %event_id, table = outcome.table, error = %e, "dependent delete failed"),
            }
        }

        phase.send_replace(DeletePhase::DeletingEvent);
        match self
            .data
            .delete(tables::EVENTS, vec![Filter::eq("id", &event_id)])
            .await
        {
            Ok(_) => {
                info!(event_id = %event_id, "event deleted");
                phase.send_replace(DeletePhase::Finished);
                self.notifier.success("Success", "Event deleted successfully");
                Ok(report)
            }
            Err(e) => {
                error!(event_id = %event_id, error = %e, "event deletion failed");
                phase.send_replace(DeletePhase::Failed(e.to_string()));
                self.notifier
                    .error("Error", &format!("Failed to delete event: {}", e));
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MemoryBackend, Operation};
    use crate::notify::ToastVariant;
    use chrono::NaiveDate;
    use serde_json::json;
    use std::sync::Mutex;
    use std::time::Duration;

    fn event(id: &str, name: &str) -> Event {
        Event {
            id: id.to_string(),
            name: name.to_string(),
            date: NaiveDate::from_ymd_opt(2026, 11, 1).unwrap(),
            description: None,
            created_by: Some("u1".into()),
            created_at: None,
        }
    }

    fn seeded(backend: MemoryBackend) -> MemoryBackend {
        backend.seed("events", vec![json!({ "id": "e1", "name": "Hackathon" }), json!({ "id": "e2", "name": "Open Day" })]);
        backend.seed(
            "tasks",
            vec![
                json!({ "id": "t1", "event_id": "e1", "name": "Book venue" }),
                json!({ "id": "t2", "event_id": "e1", "name": "Order food" }),
                json!({ "id": "t3", "event_id": "e2", "name": "Print flyers" }),
            ],
        );
        backend.seed("ideas", vec![json!({ "id": "i1", "event_id": "e1", "person_name": "Ada", "idea_text": "Robots" })]);
        backend.seed(
            "work_logs",
            vec![
                json!({ "id": "w1", "event_id": "e1", "description": "Called venue" }),
                json!({ "id": "w2", "event_id": "e1", "description": "Drafted menu" }),
                json!({ "id": "w3", "event_id": "e1", "description": "Posted invite" }),
            ],
        );
        backend
    }

    fn cascade(backend: &MemoryBackend) -> (CascadeDelete, Notifier) {
        let notifier = Notifier::default();
        (CascadeDelete::new(Arc::new(backend.clone()), notifier.clone()), notifier)
    }

    fn yes(_: &str) -> bool {
        true
    }

    #[tokio::test]
    async fn deletes_dependents_then_event() {
        let backend = seeded(MemoryBackend::new());
        let (cascade, notifier) = cascade(&backend);

        let outcome = cascade.delete_event(&event("e1", "Hackathon"), &yes).await.unwrap();
        let DeleteOutcome::Deleted(report) = outcome else {
            panic!("expected deletion");
        };
        assert_eq!(report.work_logs.result, Ok(3));
        assert_eq!(report.tasks.result, Ok(2));
        assert_eq!(report.ideas.result, Ok(1));
        assert!(report.failures().is_empty());

        assert_eq!(backend.rows("events").len(), 1);
        assert_eq!(backend.rows("tasks").len(), 1);
        assert!(backend.rows("work_logs").is_empty());

        let last = backend.calls().pop().unwrap();
        assert_eq!((last.operation, last.table.as_str()), (Operation::Delete, "events"));
        assert_eq!(notifier.current()[0].description.as_deref(), Some("Event deleted successfully"));
    }

    #[tokio::test]
    async fn failed_dependent_does_not_block_event_delete() {
        let backend = seeded(MemoryBackend::new());
        backend.fail("tasks", Operation::Delete, "tasks unavailable");
        let (cascade, _) = cascade(&backend);

        let outcome = cascade.delete_event(&event("e1", "Hackathon"), &yes).await.unwrap();
        let DeleteOutcome::Deleted(report) = outcome else {
            panic!("expected deletion");
        };
        assert_eq!(report.tasks.result, Err("tasks unavailable".to_string()));
        assert_eq!(report.failures().len(), 1);

        assert!(backend.rows("ideas").is_empty());
        assert!(backend.rows("work_logs").is_empty());
        assert_eq!(backend.rows("tasks").len(), 3);
        assert!(backend.rows("events").iter().all(|e| e["id"] != "e1"));
    }

    #[tokio::test]
    async fn declined_confirmation_sends_nothing() {
        let backend = seeded(MemoryBackend::new());
        let (cascade, _) = cascade(&backend);
        let prompts = Mutex::new(Vec::new());
        let decline = |prompt: &str| {
            prompts.lock().unwrap().push(prompt.to_string());
            false
        };

        let outcome = cascade.delete_event(&event("e1", "Hackathon"), &decline).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Declined);
        assert!(backend.calls().is_empty());
        assert!(prompts.lock().unwrap()[0].starts_with("Are you sure you want to delete \"Hackathon\"?"));
    }

    #[tokio::test]
    async fn event_delete_failure_is_fatal_without_rollback() {
        let backend = seeded(MemoryBackend::new());
        backend.fail("events", Operation::Delete, "permission denied");
        let (cascade, notifier) = cascade(&backend);

        let err = cascade.delete_event(&event("e1", "Hackathon"), &yes).await.unwrap_err();
        assert_eq!(err.to_string(), "permission denied");

        assert_eq!(backend.rows("events").len(), 2);
        assert!(backend.rows("work_logs").is_empty());
        let toast = &notifier.current()[0];
        assert_eq!(toast.variant, ToastVariant::Destructive);
        assert_eq!(toast.description.as_deref(), Some("Failed to delete event: permission denied"));
    }

    #[tokio::test(start_paused = true)]
    async fn dependents_are_deleted_concurrently() {
        let backend = seeded(MemoryBackend::new().with_latency(Duration::from_millis(100)));
        let (cascade, _) = cascade(&backend);

        let started = tokio::time::Instant::now();
        cascade.delete_event(&event("e1", "Hackathon"), &yes).await.unwrap();

        // one round for the three dependents, one for the event
        assert!(started.elapsed() < Duration::from_millis(250));
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_cascade_reports_progress() {
        let backend = seeded(MemoryBackend::new().with_latency(Duration::from_millis(50)));
        let (cascade, _) = cascade(&backend);

        let handle = cascade.spawn(&event("e1", "Hackathon"), &yes).unwrap();
        let mut progress = handle.progress();
        let mut seen = vec![progress.borrow().clone()];
        while progress.changed().await.is_ok() {
            let phase = progress.borrow().clone();
            let done = matches!(phase, DeletePhase::Finished | DeletePhase::Failed(_));
            seen.push(phase);
            if done {
                break;
            }
        }

        assert_eq!(seen.last(), Some(&DeletePhase::Finished));
        assert!(seen.contains(&DeletePhase::DeletingEvent));
        assert!(handle.join().await.is_ok());
        assert_eq!(backend.rows("events").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn aborted_cascade_keeps_the_event() {
        let backend = seeded(MemoryBackend::new().with_latency(Duration::from_millis(50)));
        let (cascade, notifier) = cascade(&backend);

        let handle = cascade.spawn(&event("e1", "Hackathon"), &yes).unwrap();
        handle.abort();

        assert!(matches!(handle.join().await, Err(Error::Cancelled)));
        assert_eq!(backend.rows("events").len(), 2);
        assert!(notifier.current().is_empty());
    }

    #[test]
    fn declined_spawn_returns_none() {
        let backend = MemoryBackend::new();
        let (cascade, _) = cascade(&backend);
        assert!(cascade.spawn(&event("e1", "Hackathon"), &|_: &str| false).is_none());
    }
}
