//! Askama templates for the PistonPost web interface

use askama::Template;
use axum::{http::StatusCode, response::Html};
use chrono::{DateTime, Utc};
use pistonpost::composer::{PostComposer, PostEditor};
use pistonpost::constants::{
    ACCEPTED_VIDEO_TYPES, MAX_CONTENT_LENGTH, MAX_IMAGES, MAX_TAGS, MAX_TAG_LENGTH,
    MAX_TITLE_LENGTH,
};
use pistonpost::display::{masonry_columns, paragraphs, time_ago, BREAKPOINT_COLUMNS};
use pistonpost::models::{
    AccountSettings, ComponentHealth, Post, PostBody, PostType, UserPage, UserSummary,
};
use pistonpost::progress::{SubmissionState, UPLOADING_LABEL};
use pistonpost::{FetchState, ListView};
use tracing::error;

/// Renders a page, logging template failures as internal errors
pub fn render<T: Template>(template: &T, name: &str) -> Result<Html<String>, StatusCode> {
    template.render().map(Html).map_err(|e| {
        error!("Failed to render {} template: {:?}", name, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

// ============================================================================
// Shared Pieces
// ============================================================================

/// Navigation bar state
#[derive(Debug, Clone, Default)]
pub struct NavView {
    /// Profile of the signed-in user, once fetched
    pub profile: Option<UserSummary>,
    /// Token for the sign-out form
    pub csrf_token: String,
}

/// Post card shown in feeds
#[derive(Debug, Clone)]
pub struct PostCardInfo {
    pub post_id: String,
    pub title: String,
    pub author_name: String,
    pub time_ago: String,
    pub tags: Vec<String>,
    /// Content type badge ("Text", "Images", "Video")
    pub kind: String,
    pub unlisted: bool,
}

impl PostCardInfo {
    pub fn from_post(post: &Post, now: DateTime<Utc>) -> Self {
        Self {
            post_id: post.post_id.clone(),
            title: post.title.clone(),
            author_name: post.author_data.name.clone(),
            time_ago: time_ago(post.timestamp, now),
            tags: post.tags.clone(),
            kind: post.post_type.label(),
            unlisted: post.unlisted,
        }
    }
}

/// A post listing in one of its fetch states
#[derive(Debug, Clone, Default)]
pub struct PostListing {
    pub is_loading: bool,
    pub is_empty: bool,
    pub error: Option<String>,
    pub cards: Vec<PostCardInfo>,
}

impl PostListing {
    pub fn from_fetch(state: FetchState<Vec<Post>>, now: DateTime<Utc>) -> Self {
        let view = state.list_view();
        match state {
            FetchState::Loading => Self {
                is_loading: true,
                ..Self::default()
            },
            FetchState::Error(message) => Self {
                error: Some(message),
                ..Self::default()
            },
            FetchState::Success(posts) => Self {
                is_empty: view == ListView::Empty,
                cards: posts
                    .iter()
                    .map(|post| PostCardInfo::from_post(post, now))
                    .collect(),
                ..Self::default()
            },
        }
    }

    /// One masonry grid per breakpoint column count. The stylesheet shows
    /// only the grid matching the viewport width.
    pub fn layouts(&self) -> Vec<MasonryLayout> {
        BREAKPOINT_COLUMNS
            .column_counts()
            .into_iter()
            .map(|columns| MasonryLayout {
                columns,
                grid: masonry_columns(&self.cards, columns),
            })
            .collect()
    }
}

/// Cards split round-robin into `columns` columns
#[derive(Debug, Clone)]
pub struct MasonryLayout {
    pub columns: usize,
    pub grid: Vec<Vec<PostCardInfo>>,
}

/// Content-mode option in the composer's select box
#[derive(Debug, Clone)]
pub struct ModeOption {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

fn mode_options(selected: PostType) -> Vec<ModeOption> {
    PostType::ALL
        .iter()
        .map(|mode| ModeOption {
            value: mode.as_str().to_string(),
            label: mode.label(),
            selected: *mode == selected,
        })
        .collect()
}

/// Link to a stored media file
#[derive(Debug, Clone)]
pub struct MediaLink {
    pub name: String,
    pub url: String,
}

// ============================================================================
// Feed Templates
// ============================================================================

/// Home feed template
#[derive(Template)]
#[template(path = "index.html")]
pub struct HomeTemplate {
    pub nav: NavView,
    pub active_page: String,
    pub listing: PostListing,
}

/// Tag listing template
#[derive(Template)]
#[template(path = "tag.html")]
pub struct TagTemplate {
    pub nav: NavView,
    pub active_page: String,
    pub tag: String,
    pub listing: PostListing,
}

/// Public user page template
#[derive(Template)]
#[template(path = "user.html")]
pub struct UserTemplate {
    pub nav: NavView,
    pub active_page: String,
    pub user: Option<UserPage>,
    pub error: Option<String>,
    pub listing: PostListing,
}

// ============================================================================
// Post Templates
// ============================================================================

/// Everything the post page shows about one post
#[derive(Debug, Clone)]
pub struct PostDisplayInfo {
    pub post_id: String,
    pub title: String,
    pub author_name: String,
    pub author_avatar: String,
    pub author_id: String,
    pub time_ago: String,
    pub tags: Vec<String>,
    pub unlisted: bool,
    pub paragraphs: Vec<String>,
    pub images: Vec<MediaLink>,
    pub video: Option<MediaLink>,
    pub missing_content: bool,
}

impl PostDisplayInfo {
    pub fn from_post(post: &Post, media_url: &str, now: DateTime<Utc>) -> Self {
        let mut info = Self {
            post_id: post.post_id.clone(),
            title: post.title.clone(),
            author_name: post.author_data.name.clone(),
            author_avatar: post.author_data.avatar.clone(),
            author_id: post.author_data.id.clone(),
            time_ago: time_ago(post.timestamp, now),
            tags: post.tags.clone(),
            unlisted: post.unlisted,
            paragraphs: Vec::new(),
            images: Vec::new(),
            video: None,
            missing_content: false,
        };
        match post.body() {
            PostBody::Text(text) => {
                info.paragraphs = paragraphs(text).into_iter().map(str::to_string).collect()
            }
            PostBody::Images(images) => {
                info.images = images
                    .iter()
                    .map(|image| MediaLink {
                        name: image.file_name(),
                        url: image.url(media_url),
                    })
                    .collect()
            }
            PostBody::Video(video) => {
                info.video = Some(MediaLink {
                    name: video.file_name(),
                    url: video.url(media_url),
                })
            }
            PostBody::Missing => info.missing_content = true,
        }
        info
    }
}

/// Single post template
#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate {
    pub nav: NavView,
    pub active_page: String,
    pub post: Option<PostDisplayInfo>,
    pub error: Option<String>,
    pub can_edit: bool,
}

/// Create post template
#[derive(Template)]
#[template(path = "compose.html")]
pub struct ComposeTemplate {
    pub nav: NavView,
    pub active_page: String,
    pub csrf_token: String,
    pub error: Option<String>,
    pub title: String,
    pub content: String,
    pub tags: String,
    pub unlisted: bool,
    pub modes: Vec<ModeOption>,
    pub image_limit: usize,
    pub video_types: String,
    pub max_title: usize,
    pub max_content: usize,
    pub max_tags: usize,
    pub max_tag_length: usize,
    /// Names of images picked before a rejected submission
    pub previous_images: Vec<String>,
    pub submit_label: String,
    pub uploading_label: String,
    pub processing_label: String,
}

impl ComposeTemplate {
    /// Re-renders the form from composer state. Selected files are not
    /// echoed back since browsers cannot pre-fill file inputs; their names
    /// are listed instead.
    pub fn from_composer(
        nav: NavView,
        csrf_token: String,
        composer: &PostComposer,
        previous_images: Vec<String>,
        error: Option<String>,
    ) -> Self {
        Self {
            nav,
            active_page: "post".to_string(),
            csrf_token,
            error,
            title: composer.title.clone(),
            content: composer.content.clone(),
            tags: composer.tags.joined(),
            unlisted: composer.unlisted,
            modes: mode_options(composer.mode),
            image_limit: MAX_IMAGES,
            video_types: ACCEPTED_VIDEO_TYPES.join(","),
            max_title: MAX_TITLE_LENGTH,
            max_content: MAX_CONTENT_LENGTH,
            max_tags: MAX_TAGS,
            max_tag_length: MAX_TAG_LENGTH,
            previous_images,
            submit_label: SubmissionState::Idle.label(),
            uploading_label: UPLOADING_LABEL.to_string(),
            processing_label: SubmissionState::Processing.label(),
        }
    }
}

/// Edit post template
#[derive(Template)]
#[template(path = "edit.html")]
pub struct EditTemplate {
    pub nav: NavView,
    pub active_page: String,
    pub csrf_token: String,
    pub error: Option<String>,
    pub post_id: String,
    pub title: String,
    pub kind: String,
    pub has_content: bool,
    pub content: String,
    pub images: Vec<MediaLink>,
    pub video: Option<MediaLink>,
    pub tags: String,
    pub unlisted: bool,
    pub delete_open: bool,
    pub max_title: usize,
    pub max_content: usize,
    pub max_tags: usize,
}

impl EditTemplate {
    pub fn from_editor(
        nav: NavView,
        csrf_token: String,
        editor: &PostEditor,
        media_url: &str,
        error: Option<String>,
    ) -> Self {
        Self {
            nav,
            active_page: "post".to_string(),
            csrf_token,
            error,
            post_id: editor.post_id().to_string(),
            title: editor.title.clone(),
            kind: editor.mode().label(),
            has_content: editor.content.is_some(),
            content: editor.content.clone().unwrap_or_default(),
            images: editor
                .images()
                .iter()
                .map(|image| MediaLink {
                    name: image.file_name(),
                    url: image.url(media_url),
                })
                .collect(),
            video: editor.video().map(|video| MediaLink {
                name: video.file_name(),
                url: video.url(media_url),
            }),
            tags: editor.tags.joined(),
            unlisted: editor.unlisted,
            delete_open: editor.delete.is_open(),
            max_title: MAX_TITLE_LENGTH,
            max_content: MAX_CONTENT_LENGTH,
            max_tags: MAX_TAGS,
        }
    }
}

/// One label/value row of the settings table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsRow {
    pub label: String,
    pub value: String,
}

impl SettingsRow {
    fn new(label: &str, value: &str) -> Self {
        Self {
            label: label.to_string(),
            value: value.to_string(),
        }
    }
}

/// Read-only account settings template
#[derive(Template)]
#[template(path = "settings.html")]
pub struct SettingsTemplate {
    pub nav: NavView,
    pub active_page: String,
    pub account: Option<AccountSettings>,
    /// Optional profile settings that are set
    pub profile_rows: Vec<SettingsRow>,
    pub error: Option<String>,
}

impl SettingsTemplate {
    pub fn from_account(nav: NavView, account: AccountSettings) -> Self {
        let mut profile_rows = Vec::new();
        if let Some(settings) = &account.settings {
            let text_rows = [
                ("Bio", &settings.bio),
                ("Website", &settings.website),
                ("Location", &settings.location),
                ("Theme", &settings.theme),
            ];
            for (label, value) in text_rows {
                if let Some(value) = value.as_ref().filter(|v| !v.is_empty()) {
                    profile_rows.push(SettingsRow::new(label, value));
                }
            }
            if let Some(enabled) = settings.email_notifications {
                let value = if enabled { "On" } else { "Off" };
                profile_rows.push(SettingsRow::new("Email notifications", value));
            }
        }
        Self {
            nav,
            active_page: String::new(),
            account: Some(account),
            profile_rows,
            error: None,
        }
    }
}

// ============================================================================
// System Templates
// ============================================================================

/// One row of the health table
#[derive(Debug, Clone)]
pub struct HealthRow {
    pub component: String,
    pub healthy: bool,
    pub message: String,
    pub duration: String,
    pub timestamp: String,
}

impl HealthRow {
    pub fn new(component: &str, health: &ComponentHealth) -> Self {
        Self {
            component: component.to_string(),
            healthy: health.healthy,
            message: health.message.clone(),
            duration: format!("{:.1}ms", health.duration),
            timestamp: health.timestamp.clone(),
        }
    }
}

/// Backend health template
#[derive(Template)]
#[template(path = "health.html")]
pub struct HealthTemplate {
    pub nav: NavView,
    pub active_page: String,
    pub rows: Vec<HealthRow>,
    pub error: Option<String>,
}
