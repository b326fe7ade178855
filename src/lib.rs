//! # PistonPost
//!
//! Client-side building blocks of the PistonPost web front end. The backend
//! owns every post, user and session; this crate holds what the pages need
//! in between:
//!
//! - **Models**: the JSON records the backend returns
//! - **Forms**: tag lists, the create-post composer and the edit-post form,
//!   with advisory validation and multipart payload assembly
//! - **Progress**: upload tracking (`idle -> uploading -> processing`)
//! - **Fetching**: per-page `loading / success / error` state and the
//!   fetch-once profile memo behind the navigation bar
//! - **Client**: a typed reqwest client for the backend API
//!
//! ## Example
//!
//! ```rust,no_run
//! use pistonpost::{BackendClient, PostComposer, PostType, SessionIdentity};
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = BackendClient::with_url("http://127.0.0.1:8080")?;
//! let session = SessionIdentity::new("token").expect("non-empty token");
//!
//! let mut composer = PostComposer::new();
//! composer.title = "Hello".to_string();
//! composer.mode = PostType::Text;
//! composer.content = "First post".to_string();
//! composer.tags.add("intro")?;
//!
//! let created = client
//!     .create_post(composer.into_payload()?, &session, None)
//!     .await?;
//! println!("created {}", pistonpost::models::post_path(&created.post_id));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod composer;
pub mod constants;
pub mod display;
pub mod error;
pub mod fetch;
pub mod models;
pub mod progress;
pub mod session;
pub mod tags;

pub use client::BackendClient;
pub use composer::{
    Attachment, ComposeError, DeleteConfirmation, DeleteDecision, PostComposer, PostEditor,
    PostPayload,
};
pub use error::{PistonError, Result};
pub use fetch::{FetchState, ListView};
pub use models::{Post, PostType, UserData, UserSummary};
pub use progress::{ProgressReport, SubmissionState, UploadProgress};
pub use session::{ProfileMemo, ProfileSource, SessionIdentity};
pub use tags::{TagError, TagList};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
