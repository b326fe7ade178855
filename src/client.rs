//! Client for the PistonPost backend API.
//!
//! Every page's data comes through here: plain JSON GETs for feeds, posts
//! and profiles, multipart PUTs for creating and editing posts, and a DELETE
//! for removing them. Failed requests are turned into [`PistonError::Backend`]
//! carrying the backend's `message` field, or the raw body when it has none.

use crate::composer::{PayloadField, PostPayload};
use crate::constants::UPLOAD_CHUNK_SIZE;
use crate::error::{PistonError, Result};
use crate::models::{AccountSettings, CreatedPost, HealthReport, Post, UserPage, UserSummary};
use crate::progress::SharedUploadProgress;
use crate::session::{ProfileSource, SessionIdentity};
use bytes::Bytes;
use futures_util::{stream, StreamExt};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Default backend URL
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8080";

/// Client for the backend REST API.
#[derive(Debug, Clone)]
pub struct BackendClient {
    /// HTTP client
    client: Client,
    /// Base URL of the backend, without trailing slash
    base_url: Url,
}

impl BackendClient {
    /// Creates a client for the backend at `url`.
    pub fn with_url(url: &str) -> Result<Self> {
        let base_url = Url::parse(url.trim_end_matches('/'))
            .map_err(|e| PistonError::config(format!("Invalid backend URL {}: {}", url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(PistonError::config(format!(
                "Backend URL {} cannot be used as a base",
                url
            )));
        }
        Ok(Self {
            client: Client::new(),
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds an endpoint URL, percent-encoding each path segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| PistonError::config("Backend URL cannot be used as a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(
        &self,
        method: Method,
        segments: &[&str],
        session: Option<&SessionIdentity>,
    ) -> Result<RequestBuilder> {
        let url = self.endpoint(segments)?;
        let mut builder = self.client.request(method, url);
        if let Some(session) = session {
            builder = builder.bearer_auth(session.token());
        }
        Ok(builder)
    }

    /// Sends a request and decodes a JSON body.
    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = check_status(builder.send().await?).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| PistonError::invalid_response(format!("Failed to parse body: {}", e)))
    }

    /// Sends a request whose body, if any, is not needed.
    async fn send_empty(&self, builder: RequestBuilder) -> Result<()> {
        check_status(builder.send().await?).await?;
        Ok(())
    }

    /// Fetches the most recent posts for the home feed.
    #[instrument(skip(self, session))]
    pub async fn home_posts(&self, session: Option<&SessionIdentity>) -> Result<Vec<Post>> {
        let posts: Vec<Post> = self
            .send_json(self.request(Method::GET, &["home"], session)?)
            .await?;
        info!("Fetched {} posts for home feed", posts.len());
        Ok(posts)
    }

    /// Fetches posts carrying `tag`.
    #[instrument(skip(self, session))]
    pub async fn tag_posts(
        &self,
        tag: &str,
        session: Option<&SessionIdentity>,
    ) -> Result<Vec<Post>> {
        let posts: Vec<Post> = self
            .send_json(self.request(Method::GET, &["tag", tag], session)?)
            .await?;
        info!("Fetched {} posts tagged {}", posts.len(), tag);
        Ok(posts)
    }

    /// Fetches one post.
    #[instrument(skip(self, session))]
    pub async fn post(&self, post_id: &str, session: Option<&SessionIdentity>) -> Result<Post> {
        self.send_json(self.request(Method::GET, &["post", post_id], session)?)
            .await
    }

    /// Creates a post from an assembled payload.
    ///
    /// When `progress` is given, attachment bytes are streamed in chunks and
    /// each chunk handed to the transport is recorded. The tracker is reset
    /// to idle once the backend answers.
    #[instrument(skip(self, payload, session, progress))]
    pub async fn create_post(
        &self,
        payload: PostPayload,
        session: &SessionIdentity,
        progress: Option<SharedUploadProgress>,
    ) -> Result<CreatedPost> {
        let post_type = payload.text("type").unwrap_or_default().to_string();
        if let Some(progress) = &progress {
            progress.begin();
        }
        let result = async {
            let form = build_form(payload, progress.as_ref())?;
            let builder = self
                .request(Method::PUT, &["post"], Some(session))?
                .multipart(form);
            self.send_json::<CreatedPost>(builder).await
        }
        .await;
        if let Some(progress) = &progress {
            progress.finish();
        }

        match &result {
            Ok(created) => info!("Created {} post {}", post_type, created.post_id),
            Err(e) => warn!("Failed to create {} post: {}", post_type, e),
        }
        result
    }

    /// Updates title, text content, tags and visibility of a post.
    #[instrument(skip(self, payload, session))]
    pub async fn edit_post(
        &self,
        post_id: &str,
        payload: PostPayload,
        session: &SessionIdentity,
    ) -> Result<()> {
        let form = build_form(payload, None)?;
        let builder = self
            .request(Method::PUT, &["post", post_id], Some(session))?
            .multipart(form);
        self.send_empty(builder).await?;
        info!("Edited post {}", post_id);
        Ok(())
    }

    /// Deletes a post.
    #[instrument(skip(self, session))]
    pub async fn delete_post(&self, post_id: &str, session: &SessionIdentity) -> Result<()> {
        self.send_empty(self.request(Method::DELETE, &["post", post_id], Some(session))?)
            .await?;
        info!("Deleted post {}", post_id);
        Ok(())
    }

    /// Fetches the display name and avatar of the session's user.
    #[instrument(skip(self, session))]
    pub async fn user_data(&self, session: &SessionIdentity) -> Result<UserSummary> {
        self.send_json(self.request(Method::GET, &["userdata"], Some(session))?)
            .await
    }

    /// Fetches the account settings of the session's user.
    #[instrument(skip(self, session))]
    pub async fn account_settings(&self, session: &SessionIdentity) -> Result<AccountSettings> {
        self.send_json(self.request(Method::GET, &["account", "settings"], Some(session))?)
            .await
    }

    /// Fetches a public user page.
    #[instrument(skip(self, session))]
    pub async fn user_page(
        &self,
        user_id: &str,
        session: Option<&SessionIdentity>,
    ) -> Result<UserPage> {
        self.send_json(self.request(Method::GET, &["user", user_id], session)?)
            .await
    }

    /// Fetches the backend's health report.
    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<HealthReport> {
        match self
            .send_json::<HealthReport>(self.request(Method::GET, &["health"], None)?)
            .await
        {
            Ok(report) => Ok(report),
            Err(e) => {
                error!("Backend health check failed: {}", e);
                Err(e)
            }
        }
    }
}

impl ProfileSource for BackendClient {
    fn fetch_profile(
        &self,
        session: &SessionIdentity,
    ) -> impl Future<Output = Result<UserSummary>> + Send {
        self.user_data(session)
    }
}

/// Passes successful responses through and converts the rest into errors.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = error_message(&body)
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| status.to_string());
    debug!(status = status.as_u16(), "backend returned error: {}", message);
    Err(PistonError::backend(status.as_u16(), message))
}

/// Extracts the user-facing message from an error body.
///
/// Prefers a JSON `message` string; otherwise returns the raw body. Returns
/// `None` for an empty body.
pub fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        if let Some(Value::String(message)) = map.get("message") {
            return Some(message.clone());
        }
    }
    Some(trimmed.to_string())
}

/// Converts a payload into a reqwest multipart form.
fn build_form(payload: PostPayload, progress: Option<&SharedUploadProgress>) -> Result<Form> {
    let mut form = Form::new();
    for (name, field) in payload.into_fields() {
        form = match field {
            PayloadField::Text(value) => form.text(name, value),
            PayloadField::File(file) => {
                let len = file.data.len() as u64;
                let body = match progress {
                    Some(progress) => progress_body(file.data, Arc::clone(progress)),
                    None => Body::from(file.data),
                };
                let mut part = Part::stream_with_length(body, len).file_name(file.file_name);
                if let Some(content_type) = file.content_type.as_deref() {
                    part = part.mime_str(content_type)?;
                }
                form.part(name, part)
            }
        };
    }
    Ok(form)
}

/// Streams `data` as slices of the shared buffer, recording each chunk as
/// it is pulled.
fn progress_body(data: Bytes, progress: SharedUploadProgress) -> Body {
    Body::wrap_stream(chunk_stream(data, progress))
}

fn chunk_stream(
    data: Bytes,
    progress: SharedUploadProgress,
) -> impl futures_util::Stream<Item = std::result::Result<Bytes, std::io::Error>> {
    let len = data.len();
    stream::iter((0..len).step_by(UPLOAD_CHUNK_SIZE)).map(move |start| {
        let chunk = data.slice(start..(start + UPLOAD_CHUNK_SIZE).min(len));
        progress.record(chunk.len() as u64);
        Ok(chunk)
    })
}
