//! Client-held session: who is signed in, with which bearer token, until when.
//!
//! The store starts in a loading state and leaves it after [`SessionStore::initialize`] has
//! checked the persisted credentials once. Every other component receives a clone of the
//! handle instead of looking the session up globally.

use std::sync::Arc;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use log::{debug, info, warn};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ApiError, Result};
use crate::models::User;
use crate::storage::KeyValueStore;

pub const USER_KEY: &str = "user";
pub const TOKEN_KEY: &str = "token";
pub const EXPIRY_KEY: &str = "expirationdate";

/// Point-in-time copy of the session fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub user: Option<User>,
    pub token: Option<String>,
    pub expiry: Option<i64>,
    pub loading: bool,
}

impl SessionState {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().map_or(false, User::is_admin)
    }
}

struct Inner {
    store: Arc<dyn KeyValueStore>,
    state: RwLock<SessionState>,
}

#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

pub fn now_epoch_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

#[derive(Debug, Deserialize)]
struct Claims {
    exp: i64,
}

/// Reads the `exp` claim of a JWT. The signature is not checked: the server owns the token.
pub fn decode_expiry(token: &str) -> Result<i64> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;

    decode::<Claims>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims.exp)
        .map_err(|e| ApiError::Decode(format!("unreadable session token: {}", e)))
}

impl SessionStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> SessionStore {
        SessionStore {
            inner: Arc::new(Inner {
                store,
                state: RwLock::new(SessionState {
                    loading: true,
                    ..Default::default()
                }),
            }),
        }
    }

    /// One-time restoration of the persisted session. Anything missing, malformed or
    /// expired purges all three keys.
    pub fn initialize(&self) {
        match self.read_persisted() {
            Some((user, token, expiry)) if now_epoch_secs() < expiry => {
                info!("restored session for {}", user.email);
                let mut state = self.inner.state.write();
                state.user = Some(user);
                state.token = Some(token);
                state.expiry = Some(expiry);
            }
            Some(_) => {
                info!("persisted session has expired");
                self.logout();
            }
            None => self.logout(),
        }
        self.inner.state.write().loading = false;
    }

    fn read_key<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.inner.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("failed to read {} from session store: {}", key, e);
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("discarding malformed {} in session store: {}", key, e);
                None
            }
        }
    }

    fn read_persisted(&self) -> Option<(User, String, i64)> {
        let user: User = self.read_key(USER_KEY)?;
        let token: String = self.read_key(TOKEN_KEY)?;
        let expiry: f64 = self.read_key(EXPIRY_KEY)?;
        if !expiry.is_finite() {
            return None;
        }
        Some((user, token, expiry.floor() as i64))
    }

    pub fn login(&self, user: User, token: String, expiry: i64) {
        info!("signed in as {}", user.email);
        if let Err(e) = self.persist(&user, &token, expiry) {
            warn!("session not persisted: {}", e);
        }

        let mut state = self.inner.state.write();
        state.user = Some(user);
        state.token = Some(token);
        state.expiry = Some(expiry);
    }

    fn persist(&self, user: &User, token: &str, expiry: i64) -> anyhow::Result<()> {
        let store = &self.inner.store;
        store.set(USER_KEY, &serde_json::to_string(user)?)?;
        store.set(TOKEN_KEY, &serde_json::to_string(token)?)?;
        store.set(EXPIRY_KEY, &serde_json::to_string(&expiry)?)?;
        Ok(())
    }

    pub fn logout(&self) {
        {
            let mut state = self.inner.state.write();
            if state.is_authenticated() {
                info!("signed out");
            }
            state.user = None;
            state.token = None;
            state.expiry = None;
        }

        for key in [USER_KEY, TOKEN_KEY, EXPIRY_KEY] {
            if let Err(e) = self.inner.store.remove(key) {
                warn!("failed to remove {} from session store: {}", key, e);
            }
        }
    }

    /// Ends the session once the clock has passed its expiry. Returns whether it did.
    pub fn check_expiry(&self) -> bool {
        let expired = {
            let state = self.inner.state.read();
            matches!(state.expiry, Some(expiry) if state.token.is_some() && now_epoch_secs() >= expiry)
        };
        if expired {
            debug!("session token expired");
            self.logout();
        }
        expired
    }

    /// Token to attach to the next request, if the session is still live.
    pub fn token_for_request(&self) -> Option<String> {
        self.check_expiry();
        self.token()
    }

    pub fn snapshot(&self) -> SessionState {
        self.inner.state.read().clone()
    }

    pub fn user(&self) -> Option<User> {
        self.inner.state.read().user.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.inner.state.read().token.clone()
    }

    pub fn expiry(&self) -> Option<i64> {
        self.inner.state.read().expiry
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.read().loading
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.read().is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        self.inner.state.read().is_admin()
    }
}
