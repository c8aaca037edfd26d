//! Environment-derived provider configuration
//!
//! Each provider reads its credentials from `CROSSCAST_*` environment
//! variables. `from_env` trims every value and fails with a single
//! [`ConfigError::MissingEnv`] naming every required variable that is absent
//! or blank, so the user sees the complete list at once.

use crate::error::{ConfigError, Result};

pub const ENV_TWITTER_CONSUMER_KEY: &str = "CROSSCAST_TWITTER_CONSUMER_KEY";
pub const ENV_TWITTER_CONSUMER_SECRET: &str = "CROSSCAST_TWITTER_CONSUMER_SECRET";
pub const ENV_TWITTER_ACCESS_TOKEN: &str = "CROSSCAST_TWITTER_ACCESS_TOKEN";
pub const ENV_TWITTER_ACCESS_TOKEN_SECRET: &str = "CROSSCAST_TWITTER_ACCESS_TOKEN_SECRET";

pub const ENV_MASTODON_SERVER: &str = "CROSSCAST_MASTODON_SERVER";
pub const ENV_MASTODON_ACCESS_TOKEN: &str = "CROSSCAST_MASTODON_ACCESS_TOKEN";
pub const ENV_MASTODON_CLIENT_ID: &str = "CROSSCAST_MASTODON_CLIENT_ID";
pub const ENV_MASTODON_CLIENT_SECRET: &str = "CROSSCAST_MASTODON_CLIENT_SECRET";

pub const ENV_BLUESKY_HANDLE: &str = "CROSSCAST_BLUESKY_HANDLE";
pub const ENV_BLUESKY_APP_PASSWORD: &str = "CROSSCAST_BLUESKY_APP_PASSWORD";
pub const ENV_BLUESKY_PDS_URL: &str = "CROSSCAST_BLUESKY_PDS_URL";

pub const DEFAULT_BLUESKY_PDS_URL: &str = "https://bsky.social";

fn env_trimmed(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// OAuth 1.0a credentials for Twitter/X.
#[derive(Debug, Clone)]
pub struct TwitterConfig {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub access_token: String,
    pub access_token_secret: String,
}

impl TwitterConfig {
    pub fn from_env() -> Result<Self> {
        let consumer_key = env_trimmed(ENV_TWITTER_CONSUMER_KEY);
        let consumer_secret = env_trimmed(ENV_TWITTER_CONSUMER_SECRET);
        let access_token = env_trimmed(ENV_TWITTER_ACCESS_TOKEN);
        let access_token_secret = env_trimmed(ENV_TWITTER_ACCESS_TOKEN_SECRET);

        let mut missing = Vec::new();
        if consumer_key.is_none() {
            missing.push(ENV_TWITTER_CONSUMER_KEY.to_string());
        }
        if consumer_secret.is_none() {
            missing.push(ENV_TWITTER_CONSUMER_SECRET.to_string());
        }
        if access_token.is_none() {
            missing.push(ENV_TWITTER_ACCESS_TOKEN.to_string());
        }
        if access_token_secret.is_none() {
            missing.push(ENV_TWITTER_ACCESS_TOKEN_SECRET.to_string());
        }
        if let (
            Some(consumer_key),
            Some(consumer_secret),
            Some(access_token),
            Some(access_token_secret),
        ) = (consumer_key, consumer_secret, access_token, access_token_secret)
        {
            return Ok(Self {
                consumer_key,
                consumer_secret,
                access_token,
                access_token_secret,
            });
        }

        Err(ConfigError::MissingEnv {
            provider: "twitter",
            variables: missing,
        }
        .into())
    }
}

/// Settings needed to reach a Mastodon (or compatible Fediverse) server.
#[derive(Debug, Clone)]
pub struct MastodonConfig {
    pub server: String,
    pub access_token: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl MastodonConfig {
    pub fn from_env() -> Result<Self> {
        let server = env_trimmed(ENV_MASTODON_SERVER);
        let access_token = env_trimmed(ENV_MASTODON_ACCESS_TOKEN);

        let mut missing = Vec::new();
        if server.is_none() {
            missing.push(ENV_MASTODON_SERVER.to_string());
        }
        if access_token.is_none() {
            missing.push(ENV_MASTODON_ACCESS_TOKEN.to_string());
        }
        if let (Some(server), Some(access_token)) = (server, access_token) {
            return Ok(Self {
                server,
                access_token,
                client_id: env_trimmed(ENV_MASTODON_CLIENT_ID),
                client_secret: env_trimmed(ENV_MASTODON_CLIENT_SECRET),
            });
        }

        Err(ConfigError::MissingEnv {
            provider: "mastodon",
            variables: missing,
        }
        .into())
    }

    /// Server URL with an `https://` prefix added when no scheme was given.
    pub fn server_url(&self) -> String {
        if self.server.starts_with("http://") || self.server.starts_with("https://") {
            self.server.clone()
        } else {
            format!("https://{}", self.server)
        }
    }
}

/// Bluesky handle and app password, with an optional PDS override.
#[derive(Debug, Clone)]
pub struct BlueskyConfig {
    pub handle: String,
    pub app_password: String,
    pub pds_url: String,
}

impl BlueskyConfig {
    pub fn from_env() -> Result<Self> {
        let handle = env_trimmed(ENV_BLUESKY_HANDLE);
        let app_password = env_trimmed(ENV_BLUESKY_APP_PASSWORD);

        let mut missing = Vec::new();
        if handle.is_none() {
            missing.push(ENV_BLUESKY_HANDLE.to_string());
        }
        if app_password.is_none() {
            missing.push(ENV_BLUESKY_APP_PASSWORD.to_string());
        }
        if let (Some(handle), Some(app_password)) = (handle, app_password) {
            return Ok(Self {
                handle,
                app_password,
                pds_url: env_trimmed(ENV_BLUESKY_PDS_URL)
                    .unwrap_or_else(|| DEFAULT_BLUESKY_PDS_URL.to_string()),
            });
        }

        Err(ConfigError::MissingEnv {
            provider: "bluesky",
            variables: missing,
        }
        .into())
    }
}
