//! In-flight post submissions, one per browser session.
//!
//! The create handler registers its tracker here while the backend request
//! runs, so the compose page can poll the progress endpoint and so a second
//! submit from the same session is turned away.

use pistonpost::progress::{SharedUploadProgress, SubmissionState};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

#[derive(Clone, Debug, Default)]
pub struct UploadRegistry {
    uploads: Arc<RwLock<HashMap<String, SharedUploadProgress>>>,
}

/// Removes the registration when the submission ends, however it ends.
pub struct UploadGuard {
    registry: UploadRegistry,
    session_id: String,
}

impl Drop for UploadGuard {
    fn drop(&mut self) {
        let mut uploads = self
            .registry
            .uploads
            .write()
            .unwrap_or_else(|e| e.into_inner());
        uploads.remove(&self.session_id);
        debug!("Upload for session {} finished", self.session_id);
    }
}

impl UploadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a submission. Returns `None` if the session already has one
    /// in flight.
    pub fn begin(&self, session_id: &str, progress: SharedUploadProgress) -> Option<UploadGuard> {
        let mut uploads = self.uploads.write().unwrap_or_else(|e| e.into_inner());
        if uploads.contains_key(session_id) {
            return None;
        }
        uploads.insert(session_id.to_string(), progress);
        Some(UploadGuard {
            registry: self.clone(),
            session_id: session_id.to_string(),
        })
    }

    /// Current state of the session's submission, `Idle` if none.
    pub fn state(&self, session_id: &str) -> SubmissionState {
        let uploads = self.uploads.read().unwrap_or_else(|e| e.into_inner());
        uploads
            .get(session_id)
            .map(|progress| progress.state())
            .unwrap_or_default()
    }

    pub fn is_busy(&self, session_id: &str) -> bool {
        let uploads = self.uploads.read().unwrap_or_else(|e| e.into_inner());
        uploads.contains_key(session_id)
    }
}
