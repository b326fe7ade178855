//! Per-fetch state shared by every page that loads backend data.

use crate::error::PistonError;

/// Where a page's data currently stands.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchState<T> {
    Loading,
    Success(T),
    Error(String),
}

impl<T> Default for FetchState<T> {
    fn default() -> Self {
        FetchState::Loading
    }
}

impl<T> FetchState<T> {
    pub fn error(&self) -> Option<&str> {
        match self {
            FetchState::Error(message) => Some(message),
            _ => None,
        }
    }
}

impl<T> From<Result<T, PistonError>> for FetchState<T> {
    fn from(result: Result<T, PistonError>) -> Self {
        match result {
            Ok(value) => FetchState::Success(value),
            Err(e) => FetchState::Error(e.user_message()),
        }
    }
}

/// A fetched collection, distinguishing an empty result from a populated one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListView {
    Loading,
    Empty,
    Populated,
    Failed,
}

impl<T> FetchState<Vec<T>> {
    /// How a list page should render this state.
    pub fn list_view(&self) -> ListView {
        match self {
            FetchState::Loading => ListView::Loading,
            FetchState::Success(items) if items.is_empty() => ListView::Empty,
            FetchState::Success(_) => ListView::Populated,
            FetchState::Error(_) => ListView::Failed,
        }
    }
}
