//! Error types for Crosscast

use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CrosscastError>;

#[derive(Error, Debug)]
pub enum CrosscastError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("{0}")]
    Aggregate(#[from] AggregateError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CrosscastError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CrosscastError::InvalidInput(_) => 3,
            CrosscastError::Platform(PlatformError::Authentication(_)) => 2,
            CrosscastError::Platform(_) => 1,
            CrosscastError::Config(_) => 1,
            CrosscastError::Aggregate(aggregate) => aggregate.exit_code(),
            CrosscastError::Io(_) => 1,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required credential variables are absent or blank after trimming.
    #[error("{provider} credentials not configured (missing {})", .variables.join(", "))]
    MissingEnv {
        provider: &'static str,
        variables: Vec<String>,
    },
}

#[derive(Error, Debug, Clone)]
pub enum PlatformError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Remote API error: {0}")]
    Remote(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),
}

/// Ordered collection of per-provider failures from one dispatch or one
/// poster-construction pass. Empty means full success.
#[derive(Debug, Default)]
pub struct AggregateError {
    failures: Vec<(String, CrosscastError)>,
}

impl AggregateError {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, provider: impl Into<String>, error: CrosscastError) {
        self.failures.push((provider.into(), error));
    }

    pub fn extend(&mut self, other: AggregateError) {
        self.failures.extend(other.failures);
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, CrosscastError)> {
        self.failures.iter()
    }

    /// A lone failure keeps its specific exit code; mixed failures
    /// collapse to the generic one.
    pub fn exit_code(&self) -> i32 {
        match self.failures.as_slice() {
            [(_, error)] => error.exit_code(),
            _ => 1,
        }
    }

    /// Ok when no failures were recorded, otherwise the aggregate itself.
    pub fn into_result(self) -> Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self.into())
        }
    }
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (provider, error) in &self.failures {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", provider, error)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}
