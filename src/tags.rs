//! Tag list editing for the post forms.
//!
//! A post carries at most [`MAX_TAGS`] tags and no two tags may differ only
//! by case. Rejected additions leave the list untouched.

use crate::constants::{MAX_TAGS, MAX_TAG_LENGTH};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why a tag was not added.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("Tags cannot be empty")]
    Empty,

    #[error("Tag \"{0}\" is longer than {} characters", MAX_TAG_LENGTH)]
    TooLong(String),

    #[error("A post can have at most {} tags", MAX_TAGS)]
    TooMany,

    #[error("Tag \"{0}\" was already added")]
    Duplicate(String),
}

/// Ordered, case-insensitively unique list of tags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagList {
    tags: Vec<String>,
}

impl TagList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tag after trimming surrounding whitespace.
    pub fn add(&mut self, raw: &str) -> Result<(), TagError> {
        let value = raw.trim();
        if value.is_empty() {
            return Err(TagError::Empty);
        }
        if value.chars().count() > MAX_TAG_LENGTH {
            return Err(TagError::TooLong(value.to_string()));
        }
        if self.tags.len() >= MAX_TAGS {
            return Err(TagError::TooMany);
        }
        let lowered = value.to_lowercase();
        if self.tags.iter().any(|tag| tag.to_lowercase() == lowered) {
            return Err(TagError::Duplicate(value.to_string()));
        }
        self.tags.push(value.to_string());
        Ok(())
    }

    /// Builds a list from comma-separated input, adding entries in order.
    ///
    /// Entries that would be rejected by [`TagList::add`] are skipped and
    /// returned alongside the list so the form can report them. Blank
    /// entries (e.g. a trailing comma) are dropped silently.
    pub fn from_comma_separated(input: &str) -> (Self, Vec<TagError>) {
        let mut list = Self::new();
        let mut rejected = Vec::new();
        for part in input.split(',') {
            match list.add(part) {
                Ok(()) | Err(TagError::Empty) => {}
                Err(e) => rejected.push(e),
            }
        }
        (list, rejected)
    }

    /// Comma-joined wire form used in the multipart `tags` field.
    pub fn joined(&self) -> String {
        self.tags.join(",")
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tags
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}

impl From<&[String]> for TagList {
    /// Loads tags already stored on a post. The backend's list is trusted
    /// but still deduplicated and capped.
    fn from(tags: &[String]) -> Self {
        let mut list = Self::new();
        for tag in tags {
            let _ = list.add(tag);
        }
        list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sixth_unique_tag_is_rejected() {
        let mut tags = TagList::new();
        for tag in ["a", "b", "c", "d", "e"] {
            tags.add(tag).unwrap();
        }
        assert_eq!(tags.add("f"), Err(TagError::TooMany));
        assert_eq!(tags.len(), 5);
    }

    #[test]
    fn test_case_insensitive_duplicate_is_rejected() {
        let mut tags = TagList::new();
        tags.add("Comedy").unwrap();
        assert_eq!(
            tags.add("comedy"),
            Err(TagError::Duplicate("comedy".to_string()))
        );
        assert_eq!(
            tags.add("  COMEDY "),
            Err(TagError::Duplicate("COMEDY".to_string()))
        );
        assert_eq!(tags.as_slice(), &["Comedy".to_string()]);
    }

    #[test]
    fn test_add_trims_and_rejects_blank_and_long() {
        let mut tags = TagList::new();
        tags.add("  rust ").unwrap();
        assert_eq!(tags.as_slice(), &["rust".to_string()]);
        assert_eq!(tags.add("   "), Err(TagError::Empty));
        let long = "x".repeat(MAX_TAG_LENGTH + 1);
        assert_eq!(tags.add(&long), Err(TagError::TooLong(long.clone())));
    }

    #[test]
    fn test_from_comma_separated_reports_rejections() {
        let (tags, rejected) = TagList::from_comma_separated("a, B,b,,c,d,e,f");
        assert_eq!(tags.joined(), "a,B,c,d,e");
        assert_eq!(
            rejected,
            vec![TagError::Duplicate("b".to_string()), TagError::TooMany]
        );
    }

    #[test]
    fn test_from_stored_tags_caps_and_dedups() {
        let stored: Vec<String> = ["x", "X", "y"].iter().map(|s| s.to_string()).collect();
        let tags = TagList::from(stored.as_slice());
        assert_eq!(tags.joined(), "x,y");
    }
}
