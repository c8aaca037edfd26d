//! Mock poster for testing dispatch behavior without network access.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{PlatformError, Result};
use crate::platforms::Poster;
use crate::types::Request;

/// A poster that records every request it receives and succeeds or fails
/// on command.
pub struct MockPoster {
    name: String,
    failure: Option<PlatformError>,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl MockPoster {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            failure: None,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make every `post` call fail with the given error.
    pub fn failing(name: impl Into<String>, failure: PlatformError) -> Self {
        Self {
            failure: Some(failure),
            ..Self::new(name)
        }
    }

    /// Handle to the recorded requests, valid after the poster is consumed.
    pub fn requests(&self) -> Arc<Mutex<Vec<Request>>> {
        Arc::clone(&self.requests)
    }
}

#[async_trait]
impl Poster for MockPoster {
    fn name(&self) -> &str {
        &self.name
    }

    async fn post(&self, request: &Request, cancel: &CancellationToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(PlatformError::Cancelled(format!("{} post", self.name)).into());
        }

        self.requests.lock().unwrap().push(request.clone());

        match &self.failure {
            Some(error) => Err(error.clone().into()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_records_requests() {
        let poster = MockPoster::new("mock");
        let requests = poster.requests();
        let cancel = CancellationToken::new();

        poster
            .post(&Request::new("hello"), &cancel)
            .await
            .unwrap();

        let recorded = requests.lock().unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].message, "hello");
    }

    #[tokio::test]
    async fn test_mock_failure_is_returned() {
        let poster = MockPoster::failing("mock", PlatformError::Remote("boom".to_string()));
        let cancel = CancellationToken::new();

        let result = poster.post(&Request::new("hello"), &cancel).await;
        assert!(result.is_err());
        // The request is still recorded so tests can assert it was attempted.
        assert_eq!(poster.requests().lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_mock_observes_cancellation() {
        let poster = MockPoster::new("mock");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = poster.post(&Request::new("hello"), &cancel).await;
        assert!(result.is_err());
        assert!(poster.requests().lock().unwrap().is_empty());
    }
}
