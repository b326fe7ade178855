//! Post pages: viewing, creating, editing and deleting.

use crate::auth::{current_session, nav_view, require_session};
use crate::csrf::{get_csrf_token, validate_csrf_token, CsrfProtectedForm};
use crate::templates::{render, ComposeTemplate, EditTemplate, PostDisplayInfo, PostTemplate};
use crate::AppState;
use axum::{
    extract::{multipart::Field, Multipart, Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use chrono::Utc;
use pistonpost::models::{post_path, site_path};
use pistonpost::{
    Attachment, DeleteConfirmation, DeleteDecision, PostComposer, PostEditor, PostType,
    ProgressReport, SessionIdentity, SubmissionState, TagList, UploadProgress,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{error, info, instrument, warn};

/// Session key of the post whose delete panel is open
pub const PENDING_DELETE_KEY: &str = "pending_delete";

const COMPOSE_PATH: &str = "/account/post";

fn edit_path(post_id: &str) -> String {
    site_path(&["post", post_id, "edit"])
}

// =============================================================================
// Viewing
// =============================================================================

/// Single post
#[instrument(skip(app_state, session))]
pub async fn post_page(
    State(app_state): State<AppState>,
    session: Session,
    Path(post_id): Path<String>,
) -> Result<Response, StatusCode> {
    let identity = current_session(&session).await;
    let nav = nav_view(&app_state, &session).await;

    let (status, template) = match app_state.backend.post(&post_id, identity.as_ref()).await {
        Ok(post) => (
            StatusCode::OK,
            PostTemplate {
                nav,
                active_page: String::new(),
                post: Some(PostDisplayInfo::from_post(
                    &post,
                    &app_state.config.media_url,
                    Utc::now(),
                )),
                error: None,
                can_edit: identity.is_some(),
            },
        ),
        Err(e) => {
            warn!("Failed to load post {}: {}", post_id, e);
            let status = match e.status() {
                Some(404) => StatusCode::NOT_FOUND,
                _ => StatusCode::BAD_GATEWAY,
            };
            (
                status,
                PostTemplate {
                    nav,
                    active_page: String::new(),
                    post: None,
                    error: Some(e.user_message()),
                    can_edit: false,
                },
            )
        }
    };
    Ok((status, render(&template, "post")?).into_response())
}

// =============================================================================
// Composer
// =============================================================================

/// Copy of the form fields, without attachments, for re-rendering.
fn form_echo(composer: &PostComposer) -> PostComposer {
    let mut echo = PostComposer::new();
    echo.title = composer.title.clone();
    echo.mode = composer.mode;
    echo.content = composer.content.clone();
    echo.tags = composer.tags.clone();
    echo.unlisted = composer.unlisted;
    echo
}

async fn render_compose(
    app_state: &AppState,
    session: &Session,
    composer: &PostComposer,
    previous_images: Vec<String>,
    error: Option<String>,
) -> Result<Response, StatusCode> {
    let nav = nav_view(app_state, session).await;
    let csrf_token = get_csrf_token(session, &app_state.csrf_store).await?;
    let template =
        ComposeTemplate::from_composer(nav, csrf_token, composer, previous_images, error);
    Ok(render(&template, "compose")?.into_response())
}

/// Create post form
pub async fn compose_page(
    State(app_state): State<AppState>,
    session: Session,
) -> Result<Response, StatusCode> {
    if let Err(redirect) = require_session(&session, COMPOSE_PATH).await {
        return Ok(redirect);
    }
    render_compose(&app_state, &session, &PostComposer::new(), Vec::new(), None).await
}

async fn field_text(field: Field<'_>, what: &str) -> Result<String, StatusCode> {
    field.text().await.map_err(|e| {
        error!("Failed to read {}: {:?}", what, e);
        StatusCode::BAD_REQUEST
    })
}

/// Reads a file part. Empty file inputs arrive as a nameless empty part and
/// yield `None`.
async fn field_attachment(field: Field<'_>) -> Result<Option<Attachment>, StatusCode> {
    let file_name = field.file_name().unwrap_or_default().to_string();
    let content_type = field.content_type().map(str::to_string);
    let data = field.bytes().await.map_err(|e| {
        error!("Failed to read file data: {:?}", e);
        StatusCode::BAD_REQUEST
    })?;
    if file_name.is_empty() && data.is_empty() {
        return Ok(None);
    }
    Ok(Some(Attachment::new(file_name, content_type, data)))
}

/// Create post submission
#[instrument(skip_all)]
pub async fn create_post_handler(
    State(app_state): State<AppState>,
    session: Session,
    mut multipart: Multipart,
) -> Result<Response, StatusCode> {
    let identity = match require_session(&session, COMPOSE_PATH).await {
        Ok(identity) => identity,
        Err(redirect) => return Ok(redirect),
    };
    let session_id = session
        .id()
        .map(|id| id.to_string())
        .ok_or(StatusCode::FORBIDDEN)?;
    if app_state.uploads.is_busy(&session_id) {
        warn!("Ignoring submission while another is in flight");
        return Err(StatusCode::CONFLICT);
    }

    let mut csrf_token = String::new();
    let mut composer = PostComposer::new();
    let mut tags_input = String::new();
    let mut images = Vec::new();
    let mut video = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        error!("Failed to read multipart field: {:?}", e);
        StatusCode::BAD_REQUEST
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "csrf_token" => csrf_token = field_text(field, "CSRF token").await?,
            "title" => composer.title = field_text(field, "title").await?,
            "type" => {
                let value = field_text(field, "post type").await?;
                composer.mode = value.parse::<PostType>().map_err(|e| {
                    warn!("Rejected post type {:?}: {}", value, e);
                    StatusCode::BAD_REQUEST
                })?;
            }
            "content" => composer.content = field_text(field, "content").await?,
            "tags" => tags_input = field_text(field, "tags").await?,
            "unlisted" => composer.unlisted = field_text(field, "unlisted").await? == "true",
            "image" => images.extend(field_attachment(field).await?),
            "video" => {
                if let Some(file) = field_attachment(field).await? {
                    video = Some(file);
                }
            }
            _ => continue,
        }
    }

    if !validate_csrf_token(&session, &app_state.csrf_store, &csrf_token) {
        warn!("CSRF validation failed for post creation");
        return Err(StatusCode::FORBIDDEN);
    }

    let (tags, rejected) = TagList::from_comma_separated(&tags_input);
    composer.tags = tags;
    if let Err(e) = composer.select_images(images) {
        return render_compose(&app_state, &session, &composer, Vec::new(), Some(e.to_string()))
            .await;
    }
    composer.select_video(video);
    let picked: Vec<String> = composer
        .image_names()
        .into_iter()
        .map(str::to_string)
        .collect();

    let echo = form_echo(&composer);
    if let Some(e) = rejected.first() {
        return render_compose(&app_state, &session, &echo, picked, Some(e.to_string())).await;
    }
    let payload = match composer.into_payload() {
        Ok(payload) => payload,
        Err(e) => {
            info!("Post rejected before upload: {}", e);
            return render_compose(&app_state, &session, &echo, picked, Some(e.to_string())).await;
        }
    };

    let progress = UploadProgress::new(payload.attachment_bytes());
    let Some(_guard) = app_state.uploads.begin(&session_id, progress.clone()) else {
        warn!("Ignoring submission while another is in flight");
        return Err(StatusCode::CONFLICT);
    };

    match app_state
        .backend
        .create_post(payload, &identity, Some(progress.clone()))
        .await
    {
        Ok(created) => {
            info!(bytes = progress.sent(), "Post {} uploaded", created.post_id);
            Ok(Redirect::to(&post_path(&created.post_id)).into_response())
        }
        Err(e) => {
            error!("Failed to create post: {}", e);
            render_compose(&app_state, &session, &echo, picked, Some(e.user_message())).await
        }
    }
}

/// Backend-upload state of the session's in-flight post, polled by the
/// composer once the browser has finished sending
pub async fn upload_progress(
    State(app_state): State<AppState>,
    session: Session,
) -> Json<ProgressReport> {
    let state = match session.id() {
        Some(id) => app_state.uploads.state(&id.to_string()),
        None => SubmissionState::Idle,
    };
    Json(ProgressReport::from(state))
}

// =============================================================================
// Editor
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct EditQuery {
    pub delete: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EditForm {
    pub title: String,
    pub content: Option<String>,
    #[serde(default)]
    pub tags: String,
    pub unlisted: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    pub decision: String,
}

async fn render_edit(
    app_state: &AppState,
    session: &Session,
    editor: &PostEditor,
    error: Option<String>,
) -> Result<Html<String>, StatusCode> {
    let nav = nav_view(app_state, session).await;
    let csrf_token = get_csrf_token(session, &app_state.csrf_store).await?;
    let template = EditTemplate::from_editor(
        nav,
        csrf_token,
        editor,
        &app_state.config.media_url,
        error,
    );
    render(&template, "edit")
}

/// Loads the post behind an edit route; failures send the user home.
async fn load_editor(
    app_state: &AppState,
    post_id: &str,
    identity: &SessionIdentity,
) -> Result<PostEditor, Response> {
    match app_state.backend.post(post_id, Some(identity)).await {
        Ok(post) => Ok(PostEditor::from_post(&post)),
        Err(e) => {
            warn!("Failed to load post {} for editing: {}", post_id, e);
            Err(Redirect::to("/").into_response())
        }
    }
}

/// Edit form, with the delete panel open when `?delete=open`
#[instrument(skip(app_state, session))]
pub async fn edit_page(
    State(app_state): State<AppState>,
    session: Session,
    Path(post_id): Path<String>,
    Query(query): Query<EditQuery>,
) -> Result<Response, StatusCode> {
    let identity = match require_session(&session, &edit_path(&post_id)).await {
        Ok(identity) => identity,
        Err(redirect) => return Ok(redirect),
    };
    let mut editor = match load_editor(&app_state, &post_id, &identity).await {
        Ok(editor) => editor,
        Err(redirect) => return Ok(redirect),
    };

    let stored = if query.delete.as_deref() == Some("open") {
        editor.delete.open();
        session.insert(PENDING_DELETE_KEY, &post_id).await
    } else {
        session.remove::<String>(PENDING_DELETE_KEY).await.map(|_| ())
    };
    stored.map_err(|e| {
        error!("Failed to update delete panel state: {:?}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(render_edit(&app_state, &session, &editor, None)
        .await?
        .into_response())
}

/// Edit submission
#[instrument(skip(app_state, session, form))]
pub async fn edit_post_handler(
    State(app_state): State<AppState>,
    session: Session,
    Path(post_id): Path<String>,
    Form(form): Form<CsrfProtectedForm<EditForm>>,
) -> Result<Response, StatusCode> {
    if !form.validate(&session, &app_state.csrf_store) {
        warn!("CSRF validation failed for post edit");
        return Err(StatusCode::FORBIDDEN);
    }
    let identity = match require_session(&session, &edit_path(&post_id)).await {
        Ok(identity) => identity,
        Err(redirect) => return Ok(redirect),
    };
    let mut editor = match load_editor(&app_state, &post_id, &identity).await {
        Ok(editor) => editor,
        Err(redirect) => return Ok(redirect),
    };

    let EditForm {
        title,
        content,
        tags,
        unlisted,
    } = form.data;
    editor.title = title;
    if editor.content.is_some() {
        editor.content = Some(content.unwrap_or_default());
    }
    editor.unlisted = unlisted.as_deref() == Some("true");
    let (tags, rejected) = TagList::from_comma_separated(&tags);
    editor.tags = tags;
    if let Some(e) = rejected.first() {
        let page = render_edit(&app_state, &session, &editor, Some(e.to_string())).await?;
        return Ok(page.into_response());
    }

    let payload = match editor.to_payload() {
        Ok(payload) => payload,
        Err(e) => {
            let page = render_edit(&app_state, &session, &editor, Some(e.to_string())).await?;
            return Ok(page.into_response());
        }
    };

    match app_state
        .backend
        .edit_post(&post_id, payload, &identity)
        .await
    {
        Ok(()) => Ok(Redirect::to(&post_path(&post_id)).into_response()),
        Err(e) => {
            error!("Failed to edit post {}: {}", post_id, e);
            let page = render_edit(&app_state, &session, &editor, Some(e.user_message())).await?;
            Ok(page.into_response())
        }
    }
}

/// Answer from the delete panel
#[instrument(skip(app_state, session, form))]
pub async fn delete_post_handler(
    State(app_state): State<AppState>,
    session: Session,
    Path(post_id): Path<String>,
    Form(form): Form<CsrfProtectedForm<DeleteForm>>,
) -> Result<Redirect, StatusCode> {
    if !form.validate(&session, &app_state.csrf_store) {
        warn!("CSRF validation failed for post delete");
        return Err(StatusCode::FORBIDDEN);
    }
    let Some(identity) = current_session(&session).await else {
        return Ok(Redirect::to("/"));
    };

    let pending = session
        .remove::<String>(PENDING_DELETE_KEY)
        .await
        .map_err(|e| {
            error!("Failed to read delete panel state: {:?}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
    let mut confirmation = if pending.as_deref() == Some(post_id.as_str()) {
        DeleteConfirmation::opened()
    } else {
        DeleteConfirmation::default()
    };

    let decision = match form.data.decision.as_str() {
        "confirm" => DeleteDecision::Confirm,
        _ => DeleteDecision::Dismiss,
    };
    if !confirmation.decide(decision) {
        return Ok(Redirect::to(&edit_path(&post_id)));
    }

    if let Err(e) = app_state.backend.delete_post(&post_id, &identity).await {
        warn!("Delete of post {} failed: {}", post_id, e);
    }
    Ok(Redirect::to("/"))
}
