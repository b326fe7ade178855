//! Startup configuration read from the environment.

use pistonpost::client::DEFAULT_BACKEND_URL;
use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use tracing::{info, warn};

/// Default listen address of the web interface
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3000";

/// Default base for media links served by the backend
pub const DEFAULT_MEDIA_URL: &str = "/backend";

/// Settings fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Backend API base URL
    pub backend_url: String,
    /// Base URL for `static/images` and `static/videos` links
    pub media_url: String,
    /// External sign-in page
    pub signin_url: String,
    /// Public URL of this web interface, used to build the sign-in callback
    pub public_url: String,
    /// Listen address
    pub bind_addr: SocketAddr,
    /// Send the session cookie over HTTPS only
    pub secure_cookies: bool,
}

impl WebConfig {
    /// Loads configuration from `PISTONPOST_*` variables and `--bind`.
    pub fn load() -> Result<Self, String> {
        Self::from_lookup(|key| env::var(key).ok(), env::args().collect())
    }

    /// Loads configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F, args: Vec<String>) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let backend_url = string_or(&lookup, "PISTONPOST_BACKEND_URL", DEFAULT_BACKEND_URL)
            .trim_end_matches('/')
            .to_string();
        let media_url = string_or(&lookup, "PISTONPOST_MEDIA_URL", DEFAULT_MEDIA_URL);
        let signin_default = format!("{}/auth/signin", backend_url);
        let signin_url = string_or(&lookup, "PISTONPOST_SIGNIN_URL", &signin_default);

        let bind_arg = args
            .iter()
            .position(|arg| arg == "--bind")
            .and_then(|i| args.get(i + 1))
            .cloned();
        let bind_addr: SocketAddr = match bind_arg {
            Some(addr) => parse_value("--bind", &addr)?,
            None => parse_or(&lookup, "PISTONPOST_BIND", DEFAULT_BIND_ADDR)?,
        };

        let public_default = format!("http://{}", bind_addr);
        let public_url = string_or(&lookup, "PISTONPOST_PUBLIC_URL", &public_default)
            .trim_end_matches('/')
            .to_string();

        let secure_cookies = lookup("PISTONPOST_SECURE_COOKIES")
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);

        Ok(Self {
            backend_url,
            media_url,
            signin_url,
            public_url,
            bind_addr,
            secure_cookies,
        })
    }
}

fn string_or<F>(lookup: &F, key: &str, default: &str) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.trim().is_empty() => {
            info!("{key} = {value}");
            value
        }
        _ => {
            info!("{key} not set, using default: {default}");
            default.to_string()
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: &str) -> Result<T, String>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    parse_value(key, &string_or(lookup, key, default))
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    value.parse().map_err(|e| {
        warn!("Invalid {key} value: {e}");
        format!("Invalid {key} value {value:?}: {e}")
    })
}
