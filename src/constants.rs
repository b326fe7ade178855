//! Shared limits for post submission.
//!
//! These mirror the backend's own limits so the forms can reject obviously
//! invalid input before anything is uploaded. The backend stays authoritative.

// =============================================================================
// Text Limits
// =============================================================================

/// Maximum post title length in characters.
pub const MAX_TITLE_LENGTH: usize = 100;

/// Maximum text post body length in characters.
pub const MAX_CONTENT_LENGTH: usize = 1000;

// =============================================================================
// Tag Limits
// =============================================================================

/// Maximum number of tags on a post.
pub const MAX_TAGS: usize = 5;

/// Maximum length of a single tag in characters.
pub const MAX_TAG_LENGTH: usize = 20;

// =============================================================================
// Attachment Limits
// =============================================================================

/// Maximum number of images in an image post.
pub const MAX_IMAGES: usize = 150;

/// Maximum size of one image (5MB).
pub const MAX_IMAGE_SIZE: usize = 5 * 1024 * 1024;

/// Maximum size of a video (50MB).
pub const MAX_VIDEO_SIZE: usize = 50 * 1024 * 1024;

/// Maximum size of a whole create request body.
pub const MAX_BODY_LENGTH: usize = 104_857_780;

/// Video container types the backend accepts.
pub const ACCEPTED_VIDEO_TYPES: &[&str] = &[
    "video/mp4",
    "video/mov",
    "video/webm",
    "video/mpeg",
    "video/mpg",
    "video/avi",
];

/// Chunk size used when streaming attachments to the backend (64KB).
pub const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;
