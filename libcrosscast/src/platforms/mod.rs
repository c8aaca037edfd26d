//! Provider abstraction and implementations
//!
//! Each provider implements the [`Poster`] trait: given one [`Request`], it
//! performs whatever media upload and post creation its API requires. A
//! poster is constructed from environment credentials (see `crate::config`)
//! and stays independent of the others; a failure in one never stops the
//! dispatch loop from trying the rest.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::types::Request;

pub mod bluesky;
pub mod mastodon;
pub mod twitter;

// Mock poster is available for all builds to support integration tests
pub mod mock;

/// Unified posting interface over the supported providers.
#[async_trait]
pub trait Poster: Send + Sync {
    /// Lowercase identifier for the provider (e.g., "twitter", "bluesky").
    fn name(&self) -> &str;

    /// Publish the request as one post, uploading the attached image first
    /// when one is set. Observes `cancel` at every network suspension point
    /// and returns `PlatformError::Cancelled` when it fires.
    async fn post(&self, request: &Request, cancel: &CancellationToken) -> Result<()>;
}
