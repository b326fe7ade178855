//! Session handling for the web interface.
//!
//! Sign-in happens at an external provider, which sends the browser back to
//! `/auth/callback` with an opaque token. The token lives in the
//! tower-session and is forwarded to the backend on every call.

use crate::csrf::{get_csrf_token, CsrfProtectedForm, NoFields};
use crate::templates::NavView;
use crate::AppState;
use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use pistonpost::{ProfileMemo, SessionIdentity};
use reqwest::Url;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{debug, error, info, warn};

/// Session key of the backend token
pub const TOKEN_KEY: &str = "token";
/// Session key of the navigation bar's profile memo
pub const PROFILE_KEY: &str = "profile";

#[derive(Debug, Deserialize)]
pub struct SigninQuery {
    pub next: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub token: Option<String>,
    pub next: Option<String>,
}

/// The signed-in identity, if any.
pub async fn current_session(session: &Session) -> Option<SessionIdentity> {
    match session.get::<SessionIdentity>(TOKEN_KEY).await {
        Ok(identity) => identity,
        Err(e) => {
            error!("Failed to read session token: {:?}", e);
            None
        }
    }
}

/// Returns the signed-in identity or a redirect to sign in and come back.
pub async fn require_session(
    session: &Session,
    return_to: &str,
) -> Result<SessionIdentity, Response> {
    match current_session(session).await {
        Some(identity) => Ok(identity),
        None => {
            debug!("No session for {}, redirecting to sign in", return_to);
            Err(Redirect::to(&signin_path(return_to)).into_response())
        }
    }
}

/// Local sign-in route that returns to `next` afterwards.
pub fn signin_path(next: &str) -> String {
    match Url::parse_with_params("http://localhost/auth/signin", &[("next", next)]) {
        Ok(url) => format!("{}?{}", url.path(), url.query().unwrap_or_default()),
        Err(_) => "/auth/signin".to_string(),
    }
}

/// Accepts only local absolute paths as post-sign-in targets.
pub fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}

/// Navigation bar state for the current request.
///
/// The profile is memoized in the session against the identity it was
/// fetched for, so it is requested once per sign-in rather than per page.
/// A failed fetch renders the signed-out bar and is retried next time.
pub async fn nav_view(app_state: &AppState, session: &Session) -> NavView {
    let identity = current_session(session).await;

    let mut memo: ProfileMemo = match session.get(PROFILE_KEY).await {
        Ok(memo) => memo.unwrap_or_default(),
        Err(e) => {
            warn!("Discarding unreadable profile memo: {:?}", e);
            ProfileMemo::default()
        }
    };
    let before = memo.clone();

    let profile = match memo
        .resolve(identity.as_ref(), app_state.backend.as_ref())
        .await
    {
        Ok(profile) => profile,
        Err(e) => {
            warn!("Failed to fetch profile for navigation: {}", e);
            None
        }
    };

    if memo != before {
        if let Err(e) = session.insert(PROFILE_KEY, &memo).await {
            error!("Failed to store profile memo: {:?}", e);
        }
    }

    let csrf_token = if identity.is_some() {
        get_csrf_token(session, &app_state.csrf_store)
            .await
            .unwrap_or_default()
    } else {
        String::new()
    };

    NavView {
        profile,
        csrf_token,
    }
}

/// Sends the browser to the external sign-in provider
pub async fn signin(
    State(app_state): State<AppState>,
    Query(query): Query<SigninQuery>,
) -> Result<Redirect, StatusCode> {
    let next = safe_next(query.next.as_deref());
    let config = &app_state.config;

    let callback = Url::parse_with_params(
        &format!("{}/auth/callback", config.public_url),
        &[("next", next)],
    )
    .map_err(|e| {
        error!("Invalid public URL {}: {}", config.public_url, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    let target = Url::parse_with_params(&config.signin_url, &[("callbackUrl", callback.as_str())])
        .map_err(|e| {
            error!("Invalid sign-in URL {}: {}", config.signin_url, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Redirect::to(target.as_str()))
}

/// Stores the token handed back by the sign-in provider
pub async fn callback(
    State(app_state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Result<Redirect, StatusCode> {
    let Some(identity) = query.token.and_then(SessionIdentity::new) else {
        warn!("Sign-in callback without a token");
        return Ok(Redirect::to("/"));
    };

    if let Some(old_id) = session.id() {
        app_state.csrf_store.forget(&old_id.to_string());
    }
    session.cycle_id().await.map_err(|e| {
        error!("Failed to cycle session id: {:?}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    session
        .remove::<ProfileMemo>(PROFILE_KEY)
        .await
        .map_err(|e| {
            error!("Failed to clear profile memo: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    session.insert(TOKEN_KEY, &identity).await.map_err(|e| {
        error!("Failed to store session token: {:?}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    info!(session = identity.short(), "Signed in");
    Ok(Redirect::to(safe_next(query.next.as_deref())))
}

/// Ends the session
pub async fn signout(
    State(app_state): State<AppState>,
    session: Session,
    Form(form): Form<CsrfProtectedForm<NoFields>>,
) -> Result<Redirect, StatusCode> {
    if !form.validate(&session, &app_state.csrf_store) {
        warn!("CSRF validation failed for sign out");
        return Err(StatusCode::FORBIDDEN);
    }

    if let Some(id) = session.id() {
        app_state.csrf_store.forget(&id.to_string());
    }
    session.flush().await.map_err(|e| {
        error!("Failed to flush session: {:?}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    info!("Signed out");
    Ok(Redirect::to("/"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next_rejects_foreign_targets() {
        assert_eq!(safe_next(Some("/post/abc/edit")), "/post/abc/edit");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(Some("/\\evil.example")), "/");
        assert_eq!(safe_next(None), "/");
    }

    #[test]
    fn test_signin_path_encodes_return_target() {
        assert_eq!(
            signin_path("/post/a b/edit"),
            "/auth/signin?next=%2Fpost%2Fa+b%2Fedit"
        );
    }
}
