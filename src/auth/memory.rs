//! In-process implementation of [`AuthClient`]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{AuthClient, User};
use crate::error::{Error, Result};

#[derive(Default)]
struct State {
    current: Option<User>,
    accounts: HashMap<String, (String, User)>,
    unavailable: bool,
}

/// Auth client holding its accounts in memory
#[derive(Clone, Default)]
pub struct MemoryAuth {
    state: Arc<Mutex<State>>,
}

impl MemoryAuth {
    pub fn new() -> Self {
        Self::default()
    }

    /// A client with `user` already signed in
    pub fn signed_in(user: User) -> Self {
        let auth = Self::new();
        auth.set_current(Some(user));
        auth
    }

    /// Register an account that can sign in with `password`
    pub fn register(&self, user: User, password: &str) {
        if let (Ok(mut state), Some(email)) = (self.state.lock(), user.email.clone()) {
            state.accounts.insert(email, (password.to_string(), user));
        }
    }

    /// Replace the signed-in user
    pub fn set_current(&self, user: Option<User>) {
        if let Ok(mut state) = self.state.lock() {
            state.current = user;
        }
    }

    /// Make `get_user` fail, as when the auth service cannot be reached
    pub fn set_unavailable(&self, unavailable: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.unavailable = unavailable;
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| Error::general("memory auth lock poisoned"))
    }
}

#[async_trait]
impl AuthClient for MemoryAuth {
    async fn get_user(&self) -> Result<Option<User>> {
        let state = self.lock()?;
        if state.unavailable {
            return Err(Error::auth("Auth service unavailable"));
        }
        Ok(state.current.clone())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<User> {
        let mut state = self.lock()?;
        let user = match state.accounts.get(email) {
            Some((expected, user)) if expected == password => user.clone(),
            _ => return Err(Error::auth("Invalid login credentials")),
        };
        state.current = Some(user.clone());
        Ok(user)
    }

    async fn sign_out(&self) -> Result<()> {
        let mut state = self.lock()?;
        if state.current.take().is_none() {
            return Err(Error::auth("Not logged in"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_in_round_trip() {
        let auth = MemoryAuth::new();
        auth.register(User::new("u1", "ada@example.com"), "secret");

        assert!(auth.sign_in("ada@example.com", "nope").await.is_err());
        let user = auth.sign_in("ada@example.com", "secret").await.unwrap();
        assert_eq!(auth.get_user().await.unwrap(), Some(user));

        auth.sign_out().await.unwrap();
        assert!(auth.get_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unavailable_service_fails_get_user() {
        let auth = MemoryAuth::signed_in(User::new("u1", "ada@example.com"));
        auth.set_unavailable(true);
        assert!(matches!(auth.get_user().await, Err(Error::Auth(_))));
    }
}
