//! Mastodon provider
//!
//! Talks to Mastodon (and compatible Fediverse servers) through the
//! megalodon library. Media upload is a single call here; the server
//! returns an attachment id that is referenced when the status is created.

use async_trait::async_trait;
use megalodon::megalodon::{PostStatusInputOptions, PostStatusOutput, UploadMediaInputOptions};
use megalodon::{Megalodon, SNS};
use tokio_util::sync::CancellationToken;

use crate::config::MastodonConfig;
use crate::error::{PlatformError, Result};
use crate::media::{classify_image, with_cancel};
use crate::platforms::Poster;
use crate::types::Request;

pub struct MastodonClient {
    client: Box<dyn Megalodon + Send + Sync>,
}

impl MastodonClient {
    /// Build a client and verify the access token against the server.
    pub async fn connect(config: &MastodonConfig) -> Result<Self> {
        let client = megalodon::generator(
            SNS::Mastodon,
            config.server_url(),
            Some(config.access_token.clone()),
            None,
        )
        .map_err(|e| {
            PlatformError::Authentication(format!("failed to create Mastodon client: {}", e))
        })?;

        client
            .verify_account_credentials()
            .await
            .map_err(|e| map_megalodon_error(e, "verify credentials"))?;

        Ok(Self { client })
    }

    async fn upload_media(&self, path: &std::path::Path, alt: Option<&str>) -> Result<String> {
        // Classified locally first so unsupported files fail the same way
        // on every provider.
        classify_image(path)?;

        let options = UploadMediaInputOptions {
            description: alt.map(str::to_string),
            ..Default::default()
        };
        let response = self
            .client
            .upload_media(path.to_string_lossy().into_owned(), Some(&options))
            .await
            .map_err(|e| map_megalodon_error(e, "upload media"))?;

        let media_id = match response.json {
            megalodon::entities::UploadMedia::Attachment(attachment) => attachment.id,
            megalodon::entities::UploadMedia::AsyncAttachment(attachment) => attachment.id,
        };
        Ok(media_id)
    }
}

#[async_trait]
impl Poster for MastodonClient {
    fn name(&self) -> &str {
        "mastodon"
    }

    async fn post(&self, request: &Request, cancel: &CancellationToken) -> Result<()> {
        let mut media_ids = None;
        if let Some(path) = request.image_path() {
            let media_id = with_cancel(
                cancel,
                "upload media",
                self.upload_media(path, request.trimmed_alt()),
            )
            .await?;
            media_ids = Some(vec![media_id]);
        }

        let options = PostStatusInputOptions {
            media_ids,
            ..Default::default()
        };
        let response = with_cancel(cancel, "post status", async {
            self.client
                .post_status(request.body(), Some(&options))
                .await
                .map_err(|e| map_megalodon_error(e, "post status").into())
        })
        .await?;

        let status_id = match response.json {
            PostStatusOutput::Status(status) => status.id,
            PostStatusOutput::ScheduledStatus(scheduled) => scheduled.id,
        };
        tracing::debug!("created status {}", status_id);
        Ok(())
    }
}

/// Classify a megalodon error by HTTP status where one is reported.
fn map_megalodon_error(error: megalodon::error::Error, context: &str) -> PlatformError {
    let message = error.to_string();

    match extract_http_status(&message) {
        Some(401) | Some(403) => {
            PlatformError::Authentication(format!("{}: {}", context, message))
        }
        Some(422) => PlatformError::Validation(format!("{}: {}", context, message)),
        Some(_) => PlatformError::Remote(format!("{}: {}", context, message)),
        None => {
            let lower = message.to_lowercase();
            if lower.contains("unauthorized") || lower.contains("token") {
                PlatformError::Authentication(format!("{}: {}", context, message))
            } else {
                PlatformError::Network(format!("{}: {}", context, message))
            }
        }
    }
}

/// Find a standalone 3-digit HTTP status code in an error message.
fn extract_http_status(message: &str) -> Option<u16> {
    let bytes = message.as_bytes();
    for (i, window) in bytes.windows(3).enumerate() {
        if !window.iter().all(u8::is_ascii_digit) {
            continue;
        }
        let before_ok = i == 0 || !bytes[i - 1].is_ascii_digit();
        let after_ok = i + 3 == bytes.len() || !bytes[i + 3].is_ascii_digit();
        if !before_ok || !after_ok {
            continue;
        }
        let code: u16 = std::str::from_utf8(window).ok()?.parse().ok()?;
        if (100..=599).contains(&code) {
            return Some(code);
        }
    }
    None
}
