//! Per-entity stores
//!
//! Each store owns the list its page shows, fetches it from the backend and
//! keeps it current after its own mutations.

mod events;
mod ideas;
mod tasks;
mod team;
mod work_logs;

pub use events::EventStore;
pub use ideas::IdeaStore;
pub use tasks::TaskStore;
pub use team::TeamStore;
pub use work_logs::WorkLogStore;

use crate::auth::{AuthClient, User};
use crate::error::{Error, Result};

/// The signed-in user, or an error when nobody is signed in
pub(crate) async fn require_user(auth: &dyn AuthClient) -> Result<User> {
    auth.get_user()
        .await?
        .ok_or_else(|| Error::auth("User not authenticated"))
}

/// Whitespace-only input counts as absent
pub(crate) fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
