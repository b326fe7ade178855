//! Form state for creating and editing posts.
//!
//! [`PostComposer`] backs the create page: a title, one of three mutually
//! exclusive content modes, tags and the unlisted flag. [`PostEditor`] backs
//! the edit page and never re-uploads media. Both produce a [`PostPayload`],
//! the ordered list of multipart fields the backend expects.
//!
//! Checks here are advisory. They keep obviously invalid submissions off the
//! wire; the backend does the authoritative validation.

use crate::constants::{
    ACCEPTED_VIDEO_TYPES, MAX_BODY_LENGTH, MAX_CONTENT_LENGTH, MAX_IMAGES, MAX_IMAGE_SIZE,
    MAX_TITLE_LENGTH, MAX_VIDEO_SIZE,
};
use crate::models::{ImageRef, Post, PostType, VideoRef};
use crate::tags::TagList;
use bytes::Bytes;
use std::fmt;
use thiserror::Error;

/// Reasons a form is not submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    #[error("A title is required")]
    MissingTitle,

    #[error("Titles are limited to {} characters", MAX_TITLE_LENGTH)]
    TitleTooLong,

    #[error("Text posts need some content")]
    MissingContent,

    #[error("Content is limited to {} characters", MAX_CONTENT_LENGTH)]
    ContentTooLong,

    #[error("Select at least one image")]
    MissingImages,

    #[error("You can only upload {} images", MAX_IMAGES)]
    TooManyImages,

    #[error("Image \"{0}\" is larger than 5MB")]
    ImageTooLarge(String),

    #[error("Select a video")]
    MissingVideo,

    #[error("Video \"{0}\" is larger than 50MB")]
    VideoTooLarge(String),

    #[error("Video \"{0}\" is not a supported format")]
    UnsupportedVideoType(String),

    #[error("The upload is too large")]
    BodyTooLarge,
}

/// A file picked in the form.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl Attachment {
    pub fn new(
        file_name: impl Into<String>,
        content_type: Option<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type,
            data: data.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// One multipart field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadField {
    Text(String),
    File(Attachment),
}

/// Ordered multipart fields keyed by name. Names may repeat (`image`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostPayload {
    fields: Vec<(String, PayloadField)>,
}

impl PostPayload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a text field, replacing an existing one of the same name.
    pub fn set_text(&mut self, name: &str, value: impl Into<String>) {
        let value = PayloadField::Text(value.into());
        match self
            .fields
            .iter_mut()
            .find(|(n, f)| n == name && matches!(f, PayloadField::Text(_)))
        {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((name.to_string(), value)),
        }
    }

    /// Appends a file field. Repeated names produce repeated parts.
    pub fn append_file(&mut self, name: &str, file: Attachment) {
        self.fields
            .push((name.to_string(), PayloadField::File(file)));
    }

    /// Value of the text field `name`, if present.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.iter().find_map(|(n, f)| match f {
            PayloadField::Text(v) if n == name => Some(v.as_str()),
            _ => None,
        })
    }

    /// All files sent under `name`, in order.
    pub fn files(&self, name: &str) -> Vec<&Attachment> {
        self.fields
            .iter()
            .filter_map(|(n, f)| match f {
                PayloadField::File(a) if n == name => Some(a),
                _ => None,
            })
            .collect()
    }

    /// Field names in order, repeated names included.
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|(n, _)| n.as_str()).collect()
    }

    /// Bytes carried by file parts. Upload progress is measured against this.
    pub fn attachment_bytes(&self) -> u64 {
        self.fields
            .iter()
            .map(|(_, f)| match f {
                PayloadField::File(a) => a.len() as u64,
                PayloadField::Text(_) => 0,
            })
            .sum()
    }

    /// Approximate body size, text and files together.
    pub fn approximate_len(&self) -> usize {
        self.fields
            .iter()
            .map(|(n, f)| {
                n.len()
                    + match f {
                        PayloadField::Text(v) => v.len(),
                        PayloadField::File(a) => a.len() + a.file_name.len(),
                    }
            })
            .sum()
    }

    pub fn into_fields(self) -> Vec<(String, PayloadField)> {
        self.fields
    }
}

fn validate_title(title: &str) -> Result<(), ComposeError> {
    if title.trim().is_empty() {
        return Err(ComposeError::MissingTitle);
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ComposeError::TitleTooLong);
    }
    Ok(())
}

fn validate_content(content: &str) -> Result<(), ComposeError> {
    if content.is_empty() {
        return Err(ComposeError::MissingContent);
    }
    if content.chars().count() > MAX_CONTENT_LENGTH {
        return Err(ComposeError::ContentTooLong);
    }
    Ok(())
}

fn push_common_fields(payload: &mut PostPayload, tags: &TagList, unlisted: bool) {
    payload.set_text("tags", tags.joined());
    payload.set_text("unlisted", if unlisted { "true" } else { "false" });
}

// =============================================================================
// Composer
// =============================================================================

/// State of the create-post form.
#[derive(Debug, Clone, Default)]
pub struct PostComposer {
    pub title: String,
    pub mode: PostType,
    pub content: String,
    pub tags: TagList,
    pub unlisted: bool,
    images: Vec<Attachment>,
    video: Option<Attachment>,
}

impl PostComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the image selection.
    ///
    /// Selections over the limit are refused and the previous selection is
    /// kept, matching how a file picker change is handled on the page.
    pub fn select_images(&mut self, files: Vec<Attachment>) -> Result<(), ComposeError> {
        if files.len() > MAX_IMAGES {
            return Err(ComposeError::TooManyImages);
        }
        self.images = files;
        Ok(())
    }

    /// Replaces the video selection. `None` clears it.
    pub fn select_video(&mut self, file: Option<Attachment>) {
        self.video = file;
    }

    pub fn images(&self) -> &[Attachment] {
        &self.images
    }

    pub fn video(&self) -> Option<&Attachment> {
        self.video.as_ref()
    }

    /// Names of the selected images, listed under the picker.
    pub fn image_names(&self) -> Vec<&str> {
        self.images.iter().map(|a| a.file_name.as_str()).collect()
    }

    /// Checks the active mode's required field and the advisory limits.
    pub fn validate(&self) -> Result<(), ComposeError> {
        validate_title(&self.title)?;
        match self.mode {
            PostType::Text => validate_content(&self.content)?,
            PostType::Images => {
                if self.images.is_empty() {
                    return Err(ComposeError::MissingImages);
                }
                if self.images.len() > MAX_IMAGES {
                    return Err(ComposeError::TooManyImages);
                }
                if let Some(big) = self.images.iter().find(|a| a.len() > MAX_IMAGE_SIZE) {
                    return Err(ComposeError::ImageTooLarge(big.file_name.clone()));
                }
            }
            PostType::Video => {
                let video = self.video.as_ref().ok_or(ComposeError::MissingVideo)?;
                if video.is_empty() {
                    return Err(ComposeError::MissingVideo);
                }
                if video.len() > MAX_VIDEO_SIZE {
                    return Err(ComposeError::VideoTooLarge(video.file_name.clone()));
                }
                if let Some(ct) = video.content_type.as_deref() {
                    if !ACCEPTED_VIDEO_TYPES.contains(&ct) {
                        return Err(ComposeError::UnsupportedVideoType(
                            video.file_name.clone(),
                        ));
                    }
                }
            }
        }
        Ok(())
    }

    /// Validates and assembles the create request.
    ///
    /// Only the active mode's data is included; the other modes' selections
    /// are dropped.
    pub fn into_payload(self) -> Result<PostPayload, ComposeError> {
        self.validate()?;

        let mut payload = PostPayload::new();
        payload.set_text("title", self.title);
        match self.mode {
            PostType::Text => payload.set_text("content", self.content),
            PostType::Images => {
                for image in self.images {
                    payload.append_file("image", image);
                }
            }
            PostType::Video => {
                if let Some(video) = self.video {
                    payload.append_file("video", video);
                }
            }
        }
        payload.set_text("type", self.mode.as_str());
        push_common_fields(&mut payload, &self.tags, self.unlisted);

        if payload.approximate_len() > MAX_BODY_LENGTH {
            return Err(ComposeError::BodyTooLarge);
        }
        Ok(payload)
    }
}

// =============================================================================
// Editor
// =============================================================================

/// Two-step delete confirmation: the panel must be opened before a delete
/// can be confirmed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteConfirmation {
    open: bool,
}

/// Answer given in the confirmation panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteDecision {
    Confirm,
    Dismiss,
}

impl DeleteConfirmation {
    /// A panel restored in the open state.
    pub fn opened() -> Self {
        Self { open: true }
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Closes the panel. Returns true only when an open panel was confirmed,
    /// i.e. when exactly one delete request should be issued.
    pub fn decide(&mut self, decision: DeleteDecision) -> bool {
        let was_open = std::mem::take(&mut self.open);
        was_open && decision == DeleteDecision::Confirm
    }
}

/// State of the edit-post form, pre-filled from an existing post.
#[derive(Debug, Clone)]
pub struct PostEditor {
    post_id: String,
    mode: PostType,
    pub title: String,
    /// Set only for text posts stored with content; posts without it are
    /// edited without a content field.
    pub content: Option<String>,
    pub tags: TagList,
    pub unlisted: bool,
    images: Vec<ImageRef>,
    video: Option<VideoRef>,
    pub delete: DeleteConfirmation,
}

impl PostEditor {
    /// Pre-fills the form from whichever content mode the post carries.
    pub fn from_post(post: &Post) -> Self {
        let (content, images, video) = match post.post_type {
            PostType::Text => (post.content.clone(), Vec::new(), None),
            PostType::Images => (None, post.images.clone().unwrap_or_default(), None),
            PostType::Video => (None, Vec::new(), post.video.clone()),
        };
        Self {
            post_id: post.post_id.clone(),
            mode: post.post_type,
            title: post.title.clone(),
            content,
            tags: TagList::from(post.tags.as_slice()),
            unlisted: post.unlisted,
            images,
            video,
            delete: DeleteConfirmation::default(),
        }
    }

    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    pub fn mode(&self) -> PostType {
        self.mode
    }

    /// Stored images, shown read-only.
    pub fn images(&self) -> &[ImageRef] {
        &self.images
    }

    /// Stored video, shown read-only.
    pub fn video(&self) -> Option<&VideoRef> {
        self.video.as_ref()
    }

    pub fn validate(&self) -> Result<(), ComposeError> {
        validate_title(&self.title)?;
        if let Some(content) = &self.content {
            validate_content(content)?;
        }
        Ok(())
    }

    /// Validates and assembles the edit request. Media are never resent.
    pub fn to_payload(&self) -> Result<PostPayload, ComposeError> {
        self.validate()?;

        let mut payload = PostPayload::new();
        payload.set_text("title", self.title.clone());
        if let Some(content) = &self.content {
            payload.set_text("content", content.clone());
        }
        push_common_fields(&mut payload, &self.tags, self.unlisted);
        Ok(payload)
    }
}
