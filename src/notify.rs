//! Transient user notifications ("toasts")
//!
//! [`Notifier`] is a cloneable service object. Subscribers receive the full
//! list of visible toasts after every change.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::trace;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ToastVariant {
    #[default]
    Default,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub id: u64,
    pub title: Option<String>,
    pub description: Option<String>,
    pub variant: ToastVariant,
}

struct Inner {
    toasts: Mutex<Vec<Toast>>,
    next_id: AtomicU64,
    sender: broadcast::Sender<Vec<Toast>>,
    remove_delay: Duration,
}

impl Inner {
    fn change<F: FnOnce(&mut Vec<Toast>)>(&self, f: F) {
        let snapshot = match self.toasts.lock() {
            Ok(mut toasts) => {
                f(&mut toasts);
                toasts.clone()
            }
            Err(_) => return,
        };
        // no subscribers is fine
        let _ = self.sender.send(snapshot);
    }
}

#[derive(Clone)]
pub struct Notifier {
    inner: Arc<Inner>,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl Notifier {
    /// Create a notifier whose toasts disappear after `remove_delay`
    pub fn new(remove_delay: Duration) -> Self {
        let (sender, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(Inner {
                toasts: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                sender,
                remove_delay,
            }),
        }
    }

    /// Show a toast and return its id.
    ///
    /// Removal is scheduled on the current tokio runtime; outside a runtime
    /// the toast stays until dismissed.
    pub fn toast(&self, title: &str, description: &str, variant: ToastVariant) -> u64 {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let toast = Toast {
            id,
            title: Some(title.to_string()).filter(|t| !t.is_empty()),
            description: Some(description.to_string()).filter(|d| !d.is_empty()),
            variant,
        };
        trace!(id, ?variant, title, "toast");
        self.inner.change(|toasts| toasts.push(toast));
        self.schedule_removal(id);
        id
    }

    pub fn success(&self, title: &str, description: &str) -> u64 {
        self.toast(title, description, ToastVariant::Default)
    }

    pub fn error(&self, title: &str, description: &str) -> u64 {
        self.toast(title, description, ToastVariant::Destructive)
    }

    /// Replace the text of a visible toast
    pub fn update(&self, id: u64, title: Option<&str>, description: Option<&str>) {
        self.inner.change(|toasts| {
            if let Some(toast) = toasts.iter_mut().find(|t| t.id == id) {
                if let Some(title) = title {
                    toast.title = Some(title.to_string());
                }
                if let Some(description) = description {
                    toast.description = Some(description.to_string());
                }
            }
        });
    }

    pub fn dismiss(&self, id: u64) {
        self.inner.change(|toasts| toasts.retain(|t| t.id != id));
    }

    pub fn dismiss_all(&self) {
        self.inner.change(Vec::clear);
    }

    /// Currently visible toasts, oldest first
    pub fn current(&self) -> Vec<Toast> {
        self.inner
            .toasts
            .lock()
            .map(|t| t.clone())
            .unwrap_or_default()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Vec<Toast>> {
        self.inner.sender.subscribe()
    }

    fn schedule_removal(&self, id: u64) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        let delay = self.inner.remove_delay;
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = inner.upgrade() {
                inner.change(|toasts| toasts.retain(|t| t.id != id));
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toasts_without_runtime_stay_until_dismissed() {
        let notifier = Notifier::default();
        let first = notifier.success("Success", "Task created successfully");
        let second = notifier.error("Error", "Failed to create task");

        let current = notifier.current();
        assert_eq!(current.len(), 2);
        assert_eq!(current[1].variant, ToastVariant::Destructive);
        assert_ne!(first, second);

        notifier.update(first, None, Some("Task updated successfully"));
        assert_eq!(
            notifier.current()[0].description.as_deref(),
            Some("Task updated successfully")
        );

        notifier.dismiss(first);
        assert_eq!(notifier.current().len(), 1);
        notifier.dismiss_all();
        assert!(notifier.current().is_empty());
    }

    #[tokio::test]
    async fn subscribers_see_every_change() {
        let notifier = Notifier::default();
        let mut rx = notifier.subscribe();

        let id = notifier.success("Saved", "");
        let snapshot = rx.recv().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].title.as_deref(), Some("Saved"));
        assert!(snapshot[0].description.is_none());

        notifier.dismiss(id);
        assert!(rx.recv().await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn toasts_expire_after_delay() {
        let notifier = Notifier::new(Duration::from_secs(5));
        notifier.success("Success", "Event deleted successfully");

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(notifier.current().len(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(notifier.current().is_empty());
    }
}
