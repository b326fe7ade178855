//! Read-only pages: home feed, tag listing, user pages, account settings
//! and backend health.

use crate::auth::{current_session, nav_view, require_session};
use crate::templates::{
    render, HealthRow, HealthTemplate, HomeTemplate, PostListing, SettingsTemplate, TagTemplate,
    UserTemplate,
};
use crate::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use chrono::Utc;
use pistonpost::FetchState;
use tower_sessions::Session;
use tracing::{instrument, warn};

/// Home feed
#[instrument(skip(app_state, session))]
pub async fn home_page(
    State(app_state): State<AppState>,
    session: Session,
) -> Result<Html<String>, StatusCode> {
    let identity = current_session(&session).await;
    let nav = nav_view(&app_state, &session).await;

    let posts = FetchState::from(app_state.backend.home_posts(identity.as_ref()).await);
    if let Some(message) = posts.error() {
        warn!("Failed to load home feed: {}", message);
    }

    let template = HomeTemplate {
        nav,
        active_page: "home".to_string(),
        listing: PostListing::from_fetch(posts, Utc::now()),
    };
    render(&template, "home")
}

/// Posts carrying one tag, in masonry columns
#[instrument(skip(app_state, session))]
pub async fn tag_page(
    State(app_state): State<AppState>,
    session: Session,
    Path(tag): Path<String>,
) -> Result<Html<String>, StatusCode> {
    let identity = current_session(&session).await;
    let nav = nav_view(&app_state, &session).await;

    let posts = FetchState::from(app_state.backend.tag_posts(&tag, identity.as_ref()).await);
    if let Some(message) = posts.error() {
        warn!("Failed to load posts tagged {}: {}", tag, message);
    }

    let template = TagTemplate {
        nav,
        active_page: "tag".to_string(),
        tag,
        listing: PostListing::from_fetch(posts, Utc::now()),
    };
    render(&template, "tag")
}

/// Public profile with the user's posts
#[instrument(skip(app_state, session))]
pub async fn user_page(
    State(app_state): State<AppState>,
    session: Session,
    Path(user_id): Path<String>,
) -> Result<Html<String>, StatusCode> {
    let identity = current_session(&session).await;
    let nav = nav_view(&app_state, &session).await;

    let template = match app_state
        .backend
        .user_page(&user_id, identity.as_ref())
        .await
    {
        Ok(mut user) => {
            let posts = std::mem::take(&mut user.posts);
            UserTemplate {
                nav,
                active_page: String::new(),
                user: Some(user),
                error: None,
                listing: PostListing::from_fetch(FetchState::Success(posts), Utc::now()),
            }
        }
        Err(e) => {
            warn!("Failed to load user {}: {}", user_id, e);
            UserTemplate {
                nav,
                active_page: String::new(),
                user: None,
                error: Some(e.user_message()),
                listing: PostListing::default(),
            }
        }
    };
    render(&template, "user")
}

/// Signed-in user's account settings
#[instrument(skip(app_state, session))]
pub async fn settings_page(
    State(app_state): State<AppState>,
    session: Session,
) -> Result<Response, StatusCode> {
    let identity = match require_session(&session, "/account/settings").await {
        Ok(identity) => identity,
        Err(redirect) => return Ok(redirect),
    };
    let nav = nav_view(&app_state, &session).await;

    let template = match app_state.backend.account_settings(&identity).await {
        Ok(account) => SettingsTemplate::from_account(nav, account),
        Err(e) => {
            warn!("Failed to load account settings: {}", e);
            SettingsTemplate {
                nav,
                active_page: String::new(),
                account: None,
                profile_rows: Vec::new(),
                error: Some(e.user_message()),
            }
        }
    };
    Ok(render(&template, "settings")?.into_response())
}

/// Backend component health
#[instrument(skip(app_state, session))]
pub async fn health_page(
    State(app_state): State<AppState>,
    session: Session,
) -> Result<Html<String>, StatusCode> {
    let nav = nav_view(&app_state, &session).await;

    let (rows, error) = match app_state.backend.health().await {
        Ok(report) => {
            let mut rows: Vec<HealthRow> = report
                .iter()
                .map(|(component, health)| HealthRow::new(component, health))
                .collect();
            rows.sort_by(|a, b| a.component.cmp(&b.component));
            (rows, None)
        }
        Err(e) => (Vec::new(), Some(e.user_message())),
    };

    let template = HealthTemplate {
        nav,
        active_page: String::new(),
        rows,
        error,
    };
    render(&template, "health")
}
