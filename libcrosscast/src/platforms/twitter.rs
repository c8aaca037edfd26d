//! Twitter/X provider
//!
//! Posts are created through the v2 tweet endpoint; images go through the
//! v1.1 chunked media upload protocol first (INIT, APPEND, FINALIZE, then
//! STATUS polling while the server processes the media). Requests are signed
//! with OAuth 1.0a user context. Parameters carried in a multipart or JSON
//! body are excluded from the signature base string, so those requests sign
//! the bare URL.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use crate::config::TwitterConfig;
use crate::error::{PlatformError, Result};
use crate::media::{
    classify_image, with_cancel, ImageMimeType, MediaCategory, MediaTransport, MediaUploadSession,
    ProcessingInfo,
};
use crate::platforms::Poster;
use crate::types::Request;

const MEDIA_UPLOAD_URL: &str = "https://upload.twitter.com/1.1/media/upload.json";
const MEDIA_METADATA_URL: &str = "https://upload.twitter.com/1.1/media/metadata/create.json";
const CREATE_TWEET_URL: &str = "https://api.twitter.com/2/tweets";

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Twitter client holding the signing credentials and a pooled HTTP client.
pub struct TwitterClient {
    http: reqwest::Client,
    token: oauth1_request::Token,
}

impl TwitterClient {
    pub fn new(config: TwitterConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| {
                PlatformError::Network(format!("failed to build Twitter HTTP client: {}", e))
            })?;

        let token = oauth1_request::Token::from_parts(
            config.consumer_key,
            config.consumer_secret,
            config.access_token,
            config.access_token_secret,
        );

        Ok(Self { http, token })
    }

    /// Authorization header for a POST whose parameters live in the body.
    fn sign_post(&self, url: &str) -> String {
        oauth1_request::post(url, &(), &self.token, oauth1_request::HMAC_SHA1)
    }

    async fn post_upload_command(
        &self,
        context: &str,
        form: reqwest::multipart::Form,
    ) -> Result<reqwest::Response> {
        let response = self
            .http
            .post(MEDIA_UPLOAD_URL)
            .header(AUTHORIZATION, self.sign_post(MEDIA_UPLOAD_URL))
            .multipart(form)
            .send()
            .await
            .map_err(|e| map_transport_error(context, e))?;
        check_status(context, response).await
    }
}

#[async_trait]
impl MediaTransport for TwitterClient {
    async fn initialize(
        &self,
        total_bytes: u64,
        mime: ImageMimeType,
        category: MediaCategory,
    ) -> Result<String> {
        let form = reqwest::multipart::Form::new()
            .text("command", "INIT")
            .text("total_bytes", total_bytes.to_string())
            .text("media_type", mime.as_str())
            .text("media_category", category.as_str());

        let response = self.post_upload_command("media INIT", form).await?;
        let upload: MediaUploadResponse = response
            .json()
            .await
            .map_err(|e| map_transport_error("media INIT", e))?;
        Ok(upload.media_id_string)
    }

    async fn append(&self, media_id: &str, segment_index: u64, chunk: Vec<u8>) -> Result<()> {
        let form = reqwest::multipart::Form::new()
            .text("command", "APPEND")
            .text("media_id", media_id.to_string())
            .text("segment_index", segment_index.to_string())
            .part(
                "media",
                reqwest::multipart::Part::bytes(chunk).file_name("media"),
            );

        self.post_upload_command("media APPEND", form).await?;
        Ok(())
    }

    async fn finalize(&self, media_id: &str) -> Result<ProcessingInfo> {
        let form = reqwest::multipart::Form::new()
            .text("command", "FINALIZE")
            .text("media_id", media_id.to_string());

        let response = self.post_upload_command("media FINALIZE", form).await?;
        let upload: MediaUploadResponse = response
            .json()
            .await
            .map_err(|e| map_transport_error("media FINALIZE", e))?;
        Ok(upload.processing_info())
    }

    async fn status(&self, media_id: &str) -> Result<ProcessingInfo> {
        // Query parameters are part of the signature base string.
        let params = oauth1_request::ParameterList::new([
            ("command", "STATUS"),
            ("media_id", media_id),
        ]);
        let authorization = oauth1_request::get(
            MEDIA_UPLOAD_URL,
            &params,
            &self.token,
            oauth1_request::HMAC_SHA1,
        );

        let response = self
            .http
            .get(MEDIA_UPLOAD_URL)
            .header(AUTHORIZATION, authorization)
            .query(&[("command", "STATUS"), ("media_id", media_id)])
            .send()
            .await
            .map_err(|e| map_transport_error("media STATUS", e))?;
        let response = check_status("media STATUS", response).await?;
        let upload: MediaUploadResponse = response
            .json()
            .await
            .map_err(|e| map_transport_error("media STATUS", e))?;
        Ok(upload.processing_info())
    }
}

impl TwitterClient {
    async fn set_alt_text(&self, media_id: &str, alt: &str) -> Result<()> {
        let body = serde_json::json!({
            "media_id": media_id,
            "alt_text": { "text": alt },
        });

        let response = self
            .http
            .post(MEDIA_METADATA_URL)
            .header(AUTHORIZATION, self.sign_post(MEDIA_METADATA_URL))
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error("media metadata", e))?;
        check_status("media metadata", response).await?;
        Ok(())
    }

    async fn create_tweet(&self, text: &str, media_id: Option<&str>) -> Result<()> {
        let mut body = serde_json::json!({ "text": text });
        if let Some(media_id) = media_id {
            body["media"] = serde_json::json!({ "media_ids": [media_id] });
        }

        let response = self
            .http
            .post(CREATE_TWEET_URL)
            .header(AUTHORIZATION, self.sign_post(CREATE_TWEET_URL))
            .json(&body)
            .send()
            .await
            .map_err(|e| map_transport_error("create tweet", e))?;
        let response = check_status("create tweet", response).await?;

        if let Ok(created) = response.json::<CreateTweetResponse>().await {
            tracing::debug!("created tweet {}", created.data.id);
        }
        Ok(())
    }
}

#[async_trait]
impl Poster for TwitterClient {
    fn name(&self) -> &str {
        "twitter"
    }

    async fn post(&self, request: &Request, cancel: &CancellationToken) -> Result<()> {
        let mut media_id = None;

        if let Some(path) = request.image_path() {
            let mime = classify_image(path)?;
            tracing::debug!("uploading {} as {}", path.display(), mime);

            let mut session = MediaUploadSession::new(path, mime);
            let id = session.run(self, cancel).await?;

            if let Some(alt) = request.trimmed_alt() {
                with_cancel(cancel, "media metadata", self.set_alt_text(&id, alt)).await?;
            }
            media_id = Some(id);
        }

        with_cancel(
            cancel,
            "create tweet",
            self.create_tweet(&request.body(), media_id.as_deref()),
        )
        .await
    }
}

#[derive(Debug, Deserialize)]
struct MediaUploadResponse {
    media_id_string: String,
    processing_info: Option<RawProcessingInfo>,
}

impl MediaUploadResponse {
    fn processing_info(self) -> ProcessingInfo {
        match self.processing_info {
            Some(raw) => ProcessingInfo {
                state: Some(raw.state),
                check_after_secs: raw.check_after_secs,
            },
            None => ProcessingInfo::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawProcessingInfo {
    state: String,
    check_after_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct CreateTweetResponse {
    data: CreatedTweet,
}

#[derive(Debug, Deserialize)]
struct CreatedTweet {
    id: String,
}

/// Map a failed HTTP status to a provider error, preserving the body.
async fn check_status(context: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = format!("{}: status {}: {}", context, status.as_u16(), body.trim());

    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        Err(PlatformError::Authentication(message).into())
    } else {
        Err(PlatformError::Remote(message).into())
    }
}

fn map_transport_error(context: &str, error: reqwest::Error) -> PlatformError {
    if error.is_decode() {
        PlatformError::Remote(format!("{}: unexpected response: {}", context, error))
    } else {
        PlatformError::Network(format!("{}: {}", context, error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> TwitterClient {
        TwitterClient::new(TwitterConfig {
            consumer_key: "ck".to_string(),
            consumer_secret: "cs".to_string(),
            access_token: "at".to_string(),
            access_token_secret: "ats".to_string(),
        })
        .expect("client should build")
    }

    #[test]
    fn test_client_name() {
        assert_eq!(test_client().name(), "twitter");
    }

    #[test]
    fn test_sign_post_produces_oauth_header() {
        let header = test_client().sign_post(CREATE_TWEET_URL);
        assert!(header.starts_with("OAuth "));
        assert!(header.contains("oauth_consumer_key=\"ck\""));
        assert!(header.contains("oauth_signature="));
    }

    #[test]
    fn test_upload_response_with_processing_info() {
        let json = r#"{
            "media_id": 710511363345354753,
            "media_id_string": "710511363345354753",
            "expires_after_secs": 86400,
            "processing_info": { "state": "pending", "check_after_secs": 5 }
        }"#;
        let response: MediaUploadResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.media_id_string, "710511363345354753");

        let info = response.processing_info();
        assert_eq!(info.state.as_deref(), Some("pending"));
        assert_eq!(info.check_after_secs, Some(5));
    }

    #[test]
    fn test_upload_response_without_processing_info() {
        let json = r#"{ "media_id_string": "42", "media_id": 42 }"#;
        let response: MediaUploadResponse = serde_json::from_str(json).unwrap();

        let info = response.processing_info();
        assert_eq!(info.state, None);
        assert_eq!(info.check_after_secs, None);
    }

    #[test]
    fn test_upload_response_state_without_check_after() {
        let json = r#"{
            "media_id_string": "42",
            "processing_info": { "state": "succeeded", "progress_percent": 100 }
        }"#;
        let response: MediaUploadResponse = serde_json::from_str(json).unwrap();

        let info = response.processing_info();
        assert_eq!(info.state.as_deref(), Some("succeeded"));
        assert_eq!(info.check_after_secs, None);
    }

    #[test]
    fn test_create_tweet_response_parsing() {
        let json = r#"{ "data": { "id": "1445880548472328192", "text": "hello" } }"#;
        let response: CreateTweetResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.data.id, "1445880548472328192");
    }
}
