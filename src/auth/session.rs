//! The signed-in user's tokens

use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::RwLock;

/// Tokens issued by the password grant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    pub user_id: String,
    /// Unix time (seconds) after which the access token is rejected
    pub expires_at: i64,
}

/// Session shared between the auth client and the REST data backend
pub type SharedSession = Arc<RwLock<Option<Session>>>;

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::from_secs(0))
        .as_secs() as i64
}

impl Session {
    /// A session whose access token lives for `expires_in` seconds from now
    pub fn new(access_token: String, refresh_token: String, user_id: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            user_id,
            expires_at: now_secs() + expires_in,
        }
    }

    pub fn is_expired(&self) -> bool {
        now_secs() >= self.expires_at
    }

    /// The access token, unless it has expired
    pub fn bearer(&self) -> Option<&str> {
        (!self.is_expired()).then_some(self.access_token.as_str())
    }
}

/// Bearer token of the shared session, if one is live
pub(crate) async fn live_token(session: &SharedSession) -> Option<String> {
    session
        .read()
        .await
        .as_ref()
        .and_then(Session::bearer)
        .map(str::to_string)
}
