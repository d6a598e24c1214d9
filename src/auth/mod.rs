//! Authentication against the Supabase auth service

mod memory;
mod session;
mod types;

use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::config::ClientOptions;
use crate::error::{Error, Result};
use crate::fetch::Fetch;

pub use memory::*;
pub use session::*;
pub use types::*;

pub(crate) use session::live_token;

/// Identity operations the application needs
#[async_trait]
pub trait AuthClient: Send + Sync {
    /// The currently signed-in user, or `None` when nobody is signed in
    async fn get_user(&self) -> Result<Option<User>>;

    /// Sign in with email and password
    async fn sign_in(&self, email: &str, password: &str) -> Result<User>;

    /// Sign out the current user
    async fn sign_out(&self) -> Result<()>;
}

/// Client for Supabase Authentication
pub struct Auth {
    /// The base URL for the Supabase project
    url: String,

    /// The anonymous API key for the Supabase project
    key: String,

    /// HTTP client used for requests
    client: Client,

    /// The current session
    session: SharedSession,

    /// Client options
    options: ClientOptions,
}

impl Auth {
    /// Create a new Auth client
    pub(crate) fn new(url: &str, key: &str, client: Client, options: ClientOptions) -> Self {
        Self {
            url: url.to_string(),
            key: key.to_string(),
            client,
            session: Arc::new(RwLock::new(None)),
            options,
        }
    }

    fn get_auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.url, path)
    }

    /// Handle on the session, shared with the REST data backend
    pub fn session_handle(&self) -> SharedSession {
        self.session.clone()
    }

    /// Get the current session
    pub async fn get_session(&self) -> Option<Session> {
        self.session.read().await.clone()
    }

    /// Set the session
    pub async fn set_session(&self, session: Session) {
        *self.session.write().await = Some(session);
    }

    async fn access_token(&self) -> Option<String> {
        live_token(&self.session).await
    }
}

#[async_trait]
impl AuthClient for Auth {
    async fn get_user(&self) -> Result<Option<User>> {
        let token = match self.access_token().await {
            Some(token) => token,
            None => return Ok(None),
        };

        let user = Fetch::get(&self.client, &self.get_auth_url("/user"))
            .header("apikey", &self.key)
            .header("X-Client-Info", &self.options.client_info)
            .bearer_auth(&token)
            .execute::<User>()
            .await?;

        Ok(Some(user))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        let url = self.get_auth_url("/token?grant_type=password");

        let mut body = HashMap::new();
        body.insert("email", email);
        body.insert("password", password);

        let response = Fetch::post(&self.client, &url)
            .header("apikey", &self.key)
            .header("X-Client-Info", &self.options.client_info)
            .json(&body)?
            .execute::<TokenResponse>()
            .await?;

        let session = Session::new(
            response.access_token,
            response.refresh_token,
            response.user.id.clone(),
            response.expires_in,
        );
        self.set_session(session).await;
        info!(user_id = %response.user.id, "signed in");

        Ok(response.user)
    }

    async fn sign_out(&self) -> Result<()> {
        let token = self
            .access_token()
            .await
            .ok_or_else(|| Error::auth("Not logged in"))?;

        Fetch::post(&self.client, &self.get_auth_url("/logout"))
            .header("apikey", &self.key)
            .header("X-Client-Info", &self.options.client_info)
            .bearer_auth(&token)
            .execute_empty()
            .await?;

        *self.session.write().await = None;
        debug!("signed out");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn auth_for(server: &MockServer) -> Auth {
        Auth::new(&server.uri(), "anon-key", Client::new(), ClientOptions::default())
    }

    #[tokio::test]
    async fn get_user_without_session_is_none() {
        let server = MockServer::start().await;
        let auth = auth_for(&server);

        assert!(auth.get_user().await.unwrap().is_none());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn sign_in_stores_session_and_fetches_user() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "jwt-token",
                "refresh_token": "refresh",
                "token_type": "bearer",
                "expires_in": 3600,
                "user": { "id": "u1", "email": "ada@example.com" }
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/auth/v1/user"))
            .and(header("Authorization", "Bearer jwt-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "u1",
                "email": "ada@example.com"
            })))
            .mount(&server)
            .await;

        let auth = auth_for(&server);
        let user = auth.sign_in("ada@example.com", "secret").await.unwrap();
        assert_eq!(user.id, "u1");
        assert_eq!(auth.get_session().await.unwrap().user_id, "u1");

        let current = auth.get_user().await.unwrap().unwrap();
        assert_eq!(current.email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn rejected_credentials_surface_the_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": "invalid_grant",
                "error_description": "Invalid login credentials"
            })))
            .mount(&server)
            .await;

        let auth = auth_for(&server);
        let err = auth.sign_in("ada@example.com", "wrong").await.unwrap_err();
        assert!(err.to_string().contains("Invalid login credentials"));
        assert!(auth.get_session().await.is_none());
    }

    #[tokio::test]
    async fn sign_out_clears_session() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/auth/v1/logout"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let auth = auth_for(&server);
        assert!(matches!(auth.sign_out().await, Err(Error::Auth(_))));

        auth.set_session(Session::new("t".into(), "r".into(), "u1".into(), 60))
            .await;
        auth.sign_out().await.unwrap();
        assert!(auth.get_session().await.is_none());
    }
}
