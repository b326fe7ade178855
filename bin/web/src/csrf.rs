//! CSRF protection for the PistonPost web interface
//!
//! Every mutating form carries a per-session token that must match the one
//! stored server-side.

use axum::http::StatusCode;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tower_sessions::Session;
use tracing::{debug, error};
use uuid::Uuid;

/// CSRF token store keyed by session id
#[derive(Clone, Debug, Default)]
pub struct CsrfStore {
    tokens: Arc<RwLock<HashMap<String, String>>>,
}

impl CsrfStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session's token, generating one if needed
    fn token_for(&self, session_id: &str) -> String {
        let mut tokens = self.tokens.write().unwrap_or_else(|e| e.into_inner());
        tokens
            .entry(session_id.to_string())
            .or_insert_with(|| {
                debug!("Generating new CSRF token for session {}", session_id);
                Uuid::new_v4().to_string()
            })
            .clone()
    }

    /// Validate a CSRF token for the session
    pub fn validate_token(&self, session_id: &str, token: &str) -> bool {
        let tokens = self.tokens.read().unwrap_or_else(|e| e.into_inner());
        tokens.get(session_id).is_some_and(|stored| stored == token)
    }

    /// Drops the token of a session that ended
    pub fn forget(&self, session_id: &str) {
        let mut tokens = self.tokens.write().unwrap_or_else(|e| e.into_inner());
        tokens.remove(session_id);
    }
}

/// Form data wrapper that includes CSRF token validation
#[derive(Debug, Deserialize)]
pub struct CsrfProtectedForm<T> {
    pub csrf_token: String,
    #[serde(flatten)]
    pub data: T,
}

impl<T> CsrfProtectedForm<T> {
    /// Validate the CSRF token
    pub fn validate(&self, session: &Session, csrf_store: &CsrfStore) -> bool {
        validate_csrf_token(session, csrf_store, &self.csrf_token)
    }
}

/// Form with no fields besides the CSRF token
#[derive(Debug, Default, Deserialize)]
pub struct NoFields {}

/// Get or create a CSRF token for the current session
pub async fn get_csrf_token(
    session: &Session,
    csrf_store: &CsrfStore,
) -> Result<String, StatusCode> {
    let session_id = match session.id() {
        Some(id) => id.to_string(),
        None => {
            debug!("Creating new session for CSRF token");
            session.insert("initialized", true).await.map_err(|e| {
                error!("Failed to initialize session: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?;
            session.save().await.map_err(|e| {
                error!("Failed to save session: {:?}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            })?;
            match session.id() {
                Some(id) => id.to_string(),
                None => {
                    error!("Failed to get session ID after initialization and save");
                    return Err(StatusCode::INTERNAL_SERVER_ERROR);
                }
            }
        }
    };

    Ok(csrf_store.token_for(&session_id))
}

/// Checks a submitted token against the session's token
pub fn validate_csrf_token(session: &Session, csrf_store: &CsrfStore, token: &str) -> bool {
    match session.id() {
        Some(id) => csrf_store.validate_token(&id.to_string(), token),
        None => false,
    }
}
