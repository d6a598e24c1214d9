//! WorkLogs
//!
//! Event, task, idea and work log tracking on top of a Supabase project:
//! role-based permissions, permission-filtered navigation, cascading event
//! deletion, batched enrichment of work logs and a toast notifier.

pub mod auth;
pub mod cascade;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod fetch;
pub mod loader;
pub mod models;
pub mod navigation;
pub mod notify;
pub mod permissions;
pub mod postgrest;
pub mod settings;
pub mod store;

use std::sync::Arc;

use reqwest::Client;

use crate::auth::{Auth, AuthClient};
use crate::cascade::CascadeDelete;
use crate::config::{BackendConfig, ClientOptions};
use crate::dashboard::Dashboard;
use crate::data::DataClient;
use crate::error::Result;
use crate::navigation::Navigation;
use crate::notify::Notifier;
use crate::permissions::PermissionResolver;
use crate::postgrest::RestBackend;
use crate::settings::Settings;
use crate::store::{EventStore, IdeaStore, TaskStore, TeamStore, WorkLogStore};

/// Application context: the backends plus the shared notifier.
///
/// Stores and resolvers handed out by the context are independent; each one
/// keeps its own state and fetches on its own.
#[derive(Clone)]
pub struct WorkLogs {
    data: Arc<dyn DataClient>,
    auth: Arc<dyn AuthClient>,
    notifier: Notifier,
    options: ClientOptions,
}

impl WorkLogs {
    /// Connect to a Supabase project
    ///
    /// # Example
    ///
    /// ```
    /// use worklogs::WorkLogs;
    ///
    /// let app = WorkLogs::new("https://your-project-url.supabase.co", "your-anon-key").unwrap();
    /// let navigation = app.navigation();
    /// ```
    pub fn new(supabase_url: &str, supabase_key: &str) -> Result<Self> {
        Self::new_with_options(supabase_url, supabase_key, ClientOptions::default())
    }

    /// Connect to a Supabase project with custom options
    pub fn new_with_options(supabase_url: &str, supabase_key: &str, options: ClientOptions) -> Result<Self> {
        let config = BackendConfig::new(supabase_url, supabase_key.to_string())?;
        let mut builder = Client::builder();
        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http_client = builder.build()?;

        let url = config.base_url();
        let auth = Auth::new(&url, &config.anon_key, http_client.clone(), options.clone());
        let data = RestBackend::new(
            &url,
            &config.anon_key,
            http_client,
            auth.session_handle(),
            options.clone(),
        );
        let notifier = Notifier::new(options.toast_remove_delay);

        Ok(Self {
            data: Arc::new(data),
            auth: Arc::new(auth),
            notifier,
            options,
        })
    }

    /// Connect using `SUPABASE_URL` and `SUPABASE_ANON_KEY`
    pub fn from_env() -> Result<Self> {
        let config = BackendConfig::from_env()?;
        Self::new(config.url.as_str(), &config.anon_key)
    }

    /// Build a context over existing backends, e.g. the in-memory ones
    pub fn with_backends(data: Arc<dyn DataClient>, auth: Arc<dyn AuthClient>, notifier: Notifier) -> Self {
        Self {
            data,
            auth,
            notifier,
            options: ClientOptions::default(),
        }
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn auth(&self) -> &Arc<dyn AuthClient> {
        &self.auth
    }

    pub fn data(&self) -> &Arc<dyn DataClient> {
        &self.data
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn permissions(&self) -> PermissionResolver {
        PermissionResolver::new(self.data.clone(), self.auth.clone())
    }

    pub fn navigation(&self) -> Navigation {
        Navigation::default()
    }

    pub fn events(&self) -> EventStore {
        EventStore::new(self.data.clone(), self.auth.clone())
    }

    pub fn tasks(&self, event_id: &str) -> TaskStore {
        TaskStore::new(self.data.clone(), event_id)
    }

    pub fn ideas(&self, event_id: &str) -> IdeaStore {
        IdeaStore::new(self.data.clone(), event_id)
    }

    pub fn work_logs(&self) -> WorkLogStore {
        WorkLogStore::new(self.data.clone(), self.auth.clone())
    }

    /// Work logs of a single event
    pub fn event_work_logs(&self, event_id: &str) -> WorkLogStore {
        WorkLogStore::for_event(self.data.clone(), self.auth.clone(), event_id)
    }

    pub fn team(&self) -> TeamStore {
        TeamStore::new(self.data.clone())
    }

    pub fn cascade(&self) -> CascadeDelete {
        CascadeDelete::new(self.data.clone(), self.notifier.clone())
    }

    pub fn dashboard(&self) -> Dashboard {
        Dashboard::new(self.data.clone())
    }

    pub fn settings(&self) -> Settings {
        Settings::default()
    }
}

/// A convenience module for common imports
pub mod prelude {
    pub use crate::cascade::{CascadeDelete, Confirm, DeleteOutcome, DeletePhase};
    pub use crate::config::ClientOptions;
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
    pub use crate::notify::{Notifier, Toast, ToastVariant};
    pub use crate::permissions::{Permission, PermissionSet, Role};
    pub use crate::WorkLogs;
}
