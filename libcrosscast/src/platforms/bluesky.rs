//! Bluesky provider
//!
//! Uses the AT Protocol via bsky-sdk. An attached image is uploaded as a
//! blob and embedded in the post record; the post itself is one
//! `app.bsky.feed.post` record created against the configured PDS.

use async_trait::async_trait;
use bsky_sdk::agent::config::Config;
use bsky_sdk::api::app::bsky::embed::images::{ImageData, MainData};
use bsky_sdk::api::app::bsky::feed::post::{RecordData, RecordEmbedRefs};
use bsky_sdk::api::types::string::Datetime;
use bsky_sdk::api::types::Union;
use bsky_sdk::BskyAgent;
use tokio_util::sync::CancellationToken;

use crate::config::BlueskyConfig;
use crate::error::{PlatformError, Result};
use crate::media::{classify_image, with_cancel};
use crate::platforms::Poster;
use crate::types::Request;

pub struct BlueskyClient {
    agent: BskyAgent,
}

impl BlueskyClient {
    /// Build an agent against the configured PDS and create a session.
    pub async fn connect(config: &BlueskyConfig) -> Result<Self> {
        let agent = BskyAgent::builder()
            .config(Config {
                endpoint: config.pds_url.clone(),
                ..Default::default()
            })
            .build()
            .await
            .map_err(|e| {
                PlatformError::Network(format!("failed to reach Bluesky PDS: {}", e))
            })?;

        agent
            .login(&config.handle, &config.app_password)
            .await
            .map_err(|e| {
                PlatformError::Authentication(format!("Bluesky login failed: {}", e))
            })?;

        Ok(Self { agent })
    }

    async fn upload_image(
        &self,
        path: &std::path::Path,
        alt: Option<&str>,
    ) -> Result<Union<RecordEmbedRefs>> {
        classify_image(path)?;
        let bytes = tokio::fs::read(path).await?;

        let output = self
            .agent
            .api
            .com
            .atproto
            .repo
            .upload_blob(bytes)
            .await
            .map_err(|e| map_bsky_error("upload blob", e))?;

        let image = ImageData {
            alt: alt.unwrap_or_default().to_string(),
            aspect_ratio: None,
            image: output.data.blob,
        };
        Ok(Union::Refs(RecordEmbedRefs::AppBskyEmbedImagesMain(
            Box::new(
                MainData {
                    images: vec![image.into()],
                }
                .into(),
            ),
        )))
    }
}

#[async_trait]
impl Poster for BlueskyClient {
    fn name(&self) -> &str {
        "bluesky"
    }

    async fn post(&self, request: &Request, cancel: &CancellationToken) -> Result<()> {
        let mut embed = None;
        if let Some(path) = request.image_path() {
            let images = with_cancel(
                cancel,
                "upload blob",
                self.upload_image(path, request.trimmed_alt()),
            )
            .await?;
            embed = Some(images);
        }

        let record = with_cancel(cancel, "create record", async {
            self.agent
                .create_record(RecordData {
                    created_at: Datetime::now(),
                    embed,
                    entities: None,
                    facets: None,
                    labels: None,
                    langs: None,
                    reply: None,
                    tags: None,
                    text: request.body(),
                })
                .await
                .map_err(|e| map_bsky_error("create record", e).into())
        })
        .await?;

        tracing::debug!("created record {}", record.uri);
        Ok(())
    }
}

fn map_bsky_error(context: &str, error: impl std::fmt::Display) -> PlatformError {
    let message = error.to_string();
    let lower = message.to_lowercase();
    if lower.contains("unauthorized")
        || lower.contains("authentication")
        || lower.contains("expired token")
    {
        PlatformError::Authentication(format!("{}: {}", context, message))
    } else {
        PlatformError::Remote(format!("{}: {}", context, message))
    }
}
