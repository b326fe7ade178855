//! Records exchanged with the PistonPost backend.
//!
//! Field names follow the backend's camelCase JSON. None of these types are
//! owned by this crate; they are deserialized, displayed and occasionally
//! copied into form state.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Content mode of a post. Exactly one mode's data is present on a post.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PostType {
    #[default]
    Text,
    Images,
    Video,
}

impl PostType {
    /// All modes, in the order the composer offers them.
    pub const ALL: [PostType; 3] = [PostType::Text, PostType::Images, PostType::Video];

    /// Wire value used in the multipart `type` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            PostType::Text => "TEXT",
            PostType::Images => "IMAGES",
            PostType::Video => "VIDEO",
        }
    }

    /// Human label for select boxes ("Text", "Images", "Video").
    pub fn label(&self) -> String {
        crate::display::capitalize_first_letter(&self.as_str().to_lowercase())
    }
}

impl fmt::Display for PostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PostType {
    type Err = crate::PistonError;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TEXT" => Ok(PostType::Text),
            "IMAGES" => Ok(PostType::Images),
            "VIDEO" => Ok(PostType::Video),
            other => Err(crate::PistonError::validation(format!(
                "Unknown post type: {}",
                other
            ))),
        }
    }
}

/// A stored image belonging to an image post.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub id: String,
    pub extension: String,
}

impl ImageRef {
    /// File name as served by the backend's static directory.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.id, self.extension)
    }

    /// Public URL of the image below `media_base`.
    pub fn url(&self, media_base: &str) -> String {
        format!(
            "{}/static/images/{}",
            media_base.trim_end_matches('/'),
            self.file_name()
        )
    }
}

/// A stored video belonging to a video post.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRef {
    pub id: String,
    pub extension: String,
}

impl VideoRef {
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.id, self.extension)
    }

    pub fn url(&self, media_base: &str) -> String {
        format!(
            "{}/static/videos/{}",
            media_base.trim_end_matches('/'),
            self.file_name()
        )
    }
}

/// Public identity of a user as embedded in posts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserData {
    pub id: String,
    pub name: String,
    pub avatar: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// The subset of `/userdata` the navigation bar needs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub name: String,
    pub avatar: String,
}

/// A post as returned by `/home`, `/tag/{tag}` and `/post/{id}`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub post_id: String,
    pub title: String,
    #[serde(rename = "type", default)]
    pub post_type: PostType,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<ImageRef>>,
    #[serde(default)]
    pub video: Option<VideoRef>,
    pub author_data: UserData,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default)]
    pub unlisted: bool,
}

/// Borrowed view of whichever content a post carries.
#[derive(Debug, PartialEq)]
pub enum PostBody<'a> {
    Text(&'a str),
    Images(&'a [ImageRef]),
    Video(&'a VideoRef),
    /// The type tag names a mode whose data is missing.
    Missing,
}

impl Post {
    /// Returns the content matching the post's type tag.
    pub fn body(&self) -> PostBody<'_> {
        match self.post_type {
            PostType::Text => self
                .content
                .as_deref()
                .map(PostBody::Text)
                .unwrap_or(PostBody::Missing),
            PostType::Images => self
                .images
                .as_deref()
                .map(PostBody::Images)
                .unwrap_or(PostBody::Missing),
            PostType::Video => self
                .video
                .as_ref()
                .map(PostBody::Video)
                .unwrap_or(PostBody::Missing),
        }
    }

    /// Site-relative path of the post page.
    pub fn path(&self) -> String {
        post_path(&self.post_id)
    }
}

/// Site-relative path of a post page.
pub fn post_path(post_id: &str) -> String {
    site_path(&["post", post_id])
}

/// Site-relative path of a tag listing.
pub fn tag_path(tag: &str) -> String {
    site_path(&["tag", tag])
}

/// Joins percent-encoded path segments into a site-relative path.
pub fn site_path(segments: &[&str]) -> String {
    let Ok(mut url) = Url::parse("http://localhost/") else {
        return format!("/{}", segments.join("/"));
    };
    if let Ok(mut path) = url.path_segments_mut() {
        path.clear().extend(segments);
    }
    url.path().to_string()
}

/// Response of a successful create.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedPost {
    pub post_id: String,
}

/// Optional profile settings of an account.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSettings {
    pub email_notifications: Option<bool>,
    pub bio: Option<String>,
    pub website: Option<String>,
    pub location: Option<String>,
    pub theme: Option<String>,
}

/// Account details of the signed-in user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSettings {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub settings: Option<ProfileSettings>,
}

/// A public user page with that user's posts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserPage {
    pub id: String,
    pub name: String,
    pub avatar: String,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub posts: Vec<Post>,
}

/// Health of one backend component.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub healthy: bool,
    pub message: String,
    pub duration: f64,
    pub timestamp: String,
}

/// Backend health report keyed by component name.
pub type HealthReport = HashMap<String, ComponentHealth>;
