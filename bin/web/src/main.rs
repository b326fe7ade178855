//! Web server binary for PistonPost - renders the site's pages and forwards
//! every data operation to the PistonPost backend.

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue};
use axum::{
    routing::{get, post},
    Router,
};
use pistonpost::constants::MAX_BODY_LENGTH;
use pistonpost::BackendClient;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_sessions::{MemoryStore, SessionManagerLayer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod auth;
mod config;
mod csrf;
mod feed_handlers;
mod post_handlers;
mod templates;
mod uploads;

use config::WebConfig;
use csrf::CsrfStore;
use uploads::UploadRegistry;

/// Directory served under `/static`
const STATIC_DIR: &str = "bin/web/static";

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Client for the backend API, fixed at startup
    pub backend: Arc<BackendClient>,
    pub csrf_store: CsrfStore,
    /// Post submissions currently uploading, by session
    pub uploads: UploadRegistry,
    pub config: Arc<WebConfig>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("backend", &self.backend.base_url().as_str())
            .field("csrf_store", &"CsrfStore { ... }")
            .field("uploads", &"UploadRegistry { ... }")
            .field("config", &self.config)
            .finish()
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            "pistonpost=info,pistonpost_web=info,tower_http=debug".into()
        }))
        .init();

    let config = WebConfig::load()?;
    let backend = BackendClient::with_url(&config.backend_url)?;
    info!("Using backend at: {}", backend.base_url());

    if config.secure_cookies {
        info!("Secure cookies enabled - cookies will only be sent over HTTPS");
    } else {
        warn!("Secure cookies disabled - set PISTONPOST_SECURE_COOKIES=true for production");
    }

    let bind_addr = config.bind_addr;
    let app_state = AppState {
        backend: Arc::new(backend),
        csrf_store: CsrfStore::new(),
        uploads: UploadRegistry::new(),
        config: Arc::new(config),
    };
    let app = build_router(app_state);

    let listener = TcpListener::bind(bind_addr).await?;
    info!("PistonPost web interface running on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Builds the application with its routes, sessions and security headers
fn build_router(app_state: AppState) -> Router {
    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(app_state.config.secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_name("pistonpost-session")
        .with_http_only(true);

    Router::new()
        .route("/", get(feed_handlers::home_page))
        .route("/tag/:tag", get(feed_handlers::tag_page))
        .route("/user/:user_id", get(feed_handlers::user_page))
        .route("/health", get(feed_handlers::health_page))
        .route("/account/settings", get(feed_handlers::settings_page))
        .route(
            "/account/post",
            get(post_handlers::compose_page).post(post_handlers::create_post_handler),
        )
        .route(
            "/account/post/progress",
            get(post_handlers::upload_progress),
        )
        .route("/post/:post_id", get(post_handlers::post_page))
        .route(
            "/post/:post_id/edit",
            get(post_handlers::edit_page).post(post_handlers::edit_post_handler),
        )
        .route(
            "/post/:post_id/delete",
            post(post_handlers::delete_post_handler),
        )
        .route("/auth/signin", get(auth::signin))
        .route("/auth/callback", get(auth::callback))
        .route("/auth/signout", post(auth::signout))
        .nest_service("/static", ServeDir::new(STATIC_DIR))
        .layer(DefaultBodyLimit::max(MAX_BODY_LENGTH))
        .layer(session_layer)
        // Security headers to prevent common attacks
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::X_XSS_PROTECTION,
            HeaderValue::from_static("1; mode=block"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::REFERRER_POLICY,
            HeaderValue::from_static("strict-origin-when-cross-origin"),
        ))
        .with_state(app_state)
}
