//! Session identity and the navigation bar's profile memo.
//!
//! Sessions are issued elsewhere; this crate only sees an opaque token. The
//! profile shown in the navigation bar is fetched once per distinct token
//! and reused on every later render with that token.

use crate::error::Result;
use crate::models::UserSummary;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use tracing::debug;

/// Opaque proof of authentication, forwarded to the backend as a bearer
/// credential.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionIdentity(String);

impl SessionIdentity {
    /// Wraps a token. Blank tokens are not sessions.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            None
        } else {
            Some(Self(token))
        }
    }

    pub fn token(&self) -> &str {
        &self.0
    }

    /// First characters of the token, safe to log.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(8)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Debug for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionIdentity({}…)", self.short())
    }
}

/// Something that can look up the profile behind a session.
pub trait ProfileSource {
    fn fetch_profile(
        &self,
        session: &SessionIdentity,
    ) -> impl Future<Output = Result<UserSummary>> + Send;
}

/// Profile fetched for a specific session identity.
///
/// Serializable so it can live in the session store between requests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileMemo {
    identity: Option<SessionIdentity>,
    profile: Option<UserSummary>,
}

impl ProfileMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached profile, if it belongs to `session`.
    pub fn cached_for(&self, session: &SessionIdentity) -> Option<&UserSummary> {
        match &self.identity {
            Some(identity) if identity == session => self.profile.as_ref(),
            _ => None,
        }
    }

    /// Returns the profile for `session`, fetching only when the session
    /// changed or nothing was cached for it yet.
    ///
    /// Without a session the memo is cleared. A failed fetch leaves nothing
    /// cached, so the next render tries again.
    pub async fn resolve<S>(
        &mut self,
        session: Option<&SessionIdentity>,
        source: &S,
    ) -> Result<Option<UserSummary>>
    where
        S: ProfileSource + ?Sized,
    {
        let Some(session) = session else {
            self.clear();
            return Ok(None);
        };

        if let Some(profile) = self.cached_for(session) {
            return Ok(Some(profile.clone()));
        }

        debug!(session = session.short(), "fetching profile for session");
        self.identity = Some(session.clone());
        self.profile = None;
        let profile = source.fetch_profile(session).await?;
        self.profile = Some(profile.clone());
        Ok(Some(profile))
    }

    pub fn clear(&mut self) {
        self.identity = None;
        self.profile = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PistonError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingSource {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl ProfileSource for CountingSource {
        fn fetch_profile(
            &self,
            session: &SessionIdentity,
        ) -> impl Future<Output = Result<UserSummary>> + Send {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            let fail = self.fail;
            let name = format!("{}-{}", session.token(), n);
            async move {
                if fail {
                    Err(PistonError::backend(500, "down"))
                } else {
                    Ok(UserSummary {
                        name,
                        avatar: "url".to_string(),
                    })
                }
            }
        }
    }

    fn session(token: &str) -> SessionIdentity {
        SessionIdentity::new(token).unwrap()
    }

    #[tokio::test]
    async fn test_fetches_once_per_session() {
        let source = CountingSource::new(false);
        let mut memo = ProfileMemo::new();
        let alice = session("alice");

        let first = memo.resolve(Some(&alice), &source).await.unwrap();
        let second = memo.resolve(Some(&alice), &source).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.unwrap().name, "alice-0");
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refetches_when_session_changes() {
        let source = CountingSource::new(false);
        let mut memo = ProfileMemo::new();

        memo.resolve(Some(&session("a")), &source).await.unwrap();
        let other = memo.resolve(Some(&session("b")), &source).await.unwrap();
        assert_eq!(other.unwrap().name, "b-1");
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_session_clears_and_skips_fetch() {
        let source = CountingSource::new(false);
        let mut memo = ProfileMemo::new();
        let a = session("a");
        memo.resolve(Some(&a), &source).await.unwrap();

        assert_eq!(memo.resolve(None, &source).await.unwrap(), None);
        assert!(memo.cached_for(&a).is_none());
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_fetch_is_retried() {
        let failing = CountingSource::new(true);
        let mut memo = ProfileMemo::new();
        let a = session("a");
        assert!(memo.resolve(Some(&a), &failing).await.is_err());
        assert!(memo.resolve(Some(&a), &failing).await.is_err());
        assert_eq!(failing.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_identity_debug_is_redacted() {
        assert!(SessionIdentity::new("   ").is_none());
        let id = session("0123456789abcdef");
        assert_eq!(id.short(), "01234567");
        assert!(!format!("{:?}", id).contains("89abcdef"));
    }
}
