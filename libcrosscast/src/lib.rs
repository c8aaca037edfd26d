//! Crosscast - post one message to several social networks at once
//!
//! This library provides the core functionality for publishing a single
//! message, with an optional image attachment, to Twitter/X, Mastodon, and
//! Bluesky in one invocation.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod logging;
pub mod media;
pub mod platforms;
pub mod types;

// Re-export commonly used types
pub use dispatch::{build_posters, dispatch, normalize_targets, simulate, SUPPORTED_TARGETS};
pub use error::{AggregateError, CrosscastError, Result};
pub use platforms::Poster;
pub use types::Request;
