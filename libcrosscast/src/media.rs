//! Media classification and the chunked upload session
//!
//! Attachments are classified locally (extension table first, then content
//! sniffing) before any network call, so unsupported files never start an
//! upload. Providers with a segmented upload protocol drive the transfer
//! through [`MediaUploadSession`], which talks to the wire via the
//! [`MediaTransport`] trait: initialize with total size and category, append
//! zero-indexed byte segments, finalize, then poll the provider-reported
//! processing state until the media is ready.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{PlatformError, Result};

/// Bytes per APPEND segment. Still images fit in one segment; larger media
/// is split into ordered segments under the provider's 5MB chunk ceiling.
const APPEND_SEGMENT_BYTES: usize = 4 * 1024 * 1024;

/// Maximum number of STATUS re-queries after finalize reports pending.
const MAX_STATUS_POLLS: u32 = 5;

/// Wait between polls when the provider suggests no interval.
const DEFAULT_CHECK_AFTER_SECS: u64 = 2;

/// Race a suspension point against the caller's cancellation signal.
pub(crate) async fn with_cancel<F, T>(
    cancel: &CancellationToken,
    what: &str,
    fut: F,
) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            Err(PlatformError::Cancelled(format!("{} interrupted", what)).into())
        }
        result = fut => result,
    }
}

/// Supported image MIME types for attachments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMimeType {
    Jpeg,
    Png,
    Gif,
    WebP,
}

impl ImageMimeType {
    /// Detect MIME type from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "gif" => Some(Self::Gif),
            "webp" => Some(Self::WebP),
            _ => None,
        }
    }

    /// Detect MIME type from the leading bytes of the file
    pub fn sniff(head: &[u8]) -> Option<Self> {
        if head.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if head.starts_with(&[0x89, b'P', b'N', b'G']) {
            Some(Self::Png)
        } else if head.starts_with(b"GIF8") {
            Some(Self::Gif)
        } else if head.len() >= 12 && head.starts_with(b"RIFF") && &head[8..12] == b"WEBP" {
            Some(Self::WebP)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Gif => "image/gif",
            Self::WebP => "image/webp",
        }
    }

    /// Upload category the provider uses to pick a processing pipeline.
    pub fn category(&self) -> MediaCategory {
        match self {
            Self::Gif => MediaCategory::AnimatedGif,
            _ => MediaCategory::Image,
        }
    }
}

impl std::fmt::Display for ImageMimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaCategory {
    Image,
    AnimatedGif,
}

impl MediaCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "tweet_image",
            Self::AnimatedGif => "tweet_gif",
        }
    }
}

/// Classify an image file without opening it for upload.
///
/// Extension lookup runs first; when the extension is absent or unrecognized
/// the first bytes of the file are sniffed. A missing file and an
/// unsupported type are both validation failures naming the path, raised
/// before any upload starts.
pub fn classify_image(path: &Path) -> Result<ImageMimeType> {
    match std::fs::metadata(path) {
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(PlatformError::Validation(format!(
                "image \"{}\" not found",
                path.display()
            ))
            .into());
        }
        Err(e) => return Err(e.into()),
        Ok(_) => {}
    }

    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        if let Some(mime) = ImageMimeType::from_extension(ext) {
            return Ok(mime);
        }
    }

    let head = read_head(path)?;
    ImageMimeType::sniff(&head).ok_or_else(|| {
        PlatformError::Validation(format!(
            "unsupported image type: \"{}\" (expected jpeg, png, gif, or webp)",
            path.display()
        ))
        .into()
    })
}

fn read_head(path: &Path) -> Result<Vec<u8>> {
    use std::io::Read;

    let mut file = std::fs::File::open(path)?;
    let mut head = [0u8; 16];
    let n = file.read(&mut head)?;
    Ok(head[..n].to_vec())
}

/// Provider-reported readiness of an uploaded attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingState {
    None,
    Pending,
    InProgress,
    Succeeded,
    Failed,
}

impl ProcessingState {
    /// Interpret a reported state string. An absent state means the media
    /// was ready synchronously. Unknown strings are returned as-is so the
    /// caller can fail with the provider's own wording.
    fn from_report(state: Option<&str>) -> std::result::Result<Self, String> {
        match state {
            None | Some("succeeded") => Ok(Self::Succeeded),
            Some("pending") => Ok(Self::Pending),
            Some("in_progress") => Ok(Self::InProgress),
            Some("failed") => Ok(Self::Failed),
            Some(other) => Err(other.to_string()),
        }
    }
}

/// Finalize/status response subset the session cares about.
#[derive(Debug, Clone, Default)]
pub struct ProcessingInfo {
    pub state: Option<String>,
    pub check_after_secs: Option<u64>,
}

/// Wire operations of a segmented media upload.
///
/// The production implementation signs HTTP requests against the provider's
/// upload endpoint; tests substitute a scripted fake.
#[async_trait]
pub trait MediaTransport: Send + Sync {
    /// Declare total size and category, returning the assigned media id.
    async fn initialize(
        &self,
        total_bytes: u64,
        mime: ImageMimeType,
        category: MediaCategory,
    ) -> Result<String>;

    /// Transmit one zero-indexed byte segment.
    async fn append(&self, media_id: &str, segment_index: u64, chunk: Vec<u8>) -> Result<()>;

    /// Signal completion; may report an asynchronous processing state.
    async fn finalize(&self, media_id: &str) -> Result<ProcessingInfo>;

    /// Re-query the processing state of a finalized upload.
    async fn status(&self, media_id: &str) -> Result<ProcessingInfo>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Created,
    Initialized,
    AppendedSegment,
    Finalizing,
    WaitingForProcessing,
    Succeeded,
    Failed,
}

/// One upload of one image. Created at the start of media handling and
/// discarded after the post is created or the call fails.
pub struct MediaUploadSession {
    path: PathBuf,
    mime: ImageMimeType,
    media_id: Option<String>,
    state: SessionState,
}

impl MediaUploadSession {
    pub fn new(path: &Path, mime: ImageMimeType) -> Self {
        Self {
            path: path.to_path_buf(),
            mime,
            media_id: None,
            state: SessionState::Created,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn media_id(&self) -> Option<&str> {
        self.media_id.as_deref()
    }

    /// Drive the upload to completion, returning the remote media id.
    ///
    /// Every suspension point observes `cancel`; on any failure the session
    /// ends in `Failed` and is not reusable.
    pub async fn run<T>(&mut self, transport: &T, cancel: &CancellationToken) -> Result<String>
    where
        T: MediaTransport + ?Sized,
    {
        match self.drive(transport, cancel).await {
            Ok(media_id) => {
                self.state = SessionState::Succeeded;
                Ok(media_id)
            }
            Err(e) => {
                self.state = SessionState::Failed;
                Err(e)
            }
        }
    }

    async fn drive<T>(&mut self, transport: &T, cancel: &CancellationToken) -> Result<String>
    where
        T: MediaTransport + ?Sized,
    {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PlatformError::Validation(format!(
                    "image \"{}\" not found",
                    self.path.display()
                ))
                .into());
            }
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(
            "initializing media upload: {} bytes, {}",
            bytes.len(),
            self.mime
        );
        let media_id = with_cancel(
            cancel,
            "media initialize",
            transport.initialize(bytes.len() as u64, self.mime, self.mime.category()),
        )
        .await?;
        self.media_id = Some(media_id.clone());
        self.state = SessionState::Initialized;

        for (index, chunk) in bytes.chunks(APPEND_SEGMENT_BYTES).enumerate() {
            with_cancel(
                cancel,
                "media append",
                transport.append(&media_id, index as u64, chunk.to_vec()),
            )
            .await?;
            self.state = SessionState::AppendedSegment;
        }

        self.state = SessionState::Finalizing;
        let info = with_cancel(cancel, "media finalize", transport.finalize(&media_id)).await?;

        self.await_processing(transport, cancel, &media_id, info)
            .await?;

        Ok(media_id)
    }

    /// Poll the reported processing state until the media is usable.
    async fn await_processing<T>(
        &mut self,
        transport: &T,
        cancel: &CancellationToken,
        media_id: &str,
        finalize_info: ProcessingInfo,
    ) -> Result<()>
    where
        T: MediaTransport + ?Sized,
    {
        let mut info = finalize_info;
        let mut polls = 0u32;

        loop {
            let state = ProcessingState::from_report(info.state.as_deref()).map_err(|other| {
                PlatformError::Remote(format!("media processing reported state \"{}\"", other))
            })?;

            match state {
                ProcessingState::None | ProcessingState::Succeeded => return Ok(()),
                ProcessingState::Failed => {
                    return Err(PlatformError::Remote(
                        "media processing failed (state \"failed\")".to_string(),
                    )
                    .into());
                }
                ProcessingState::Pending | ProcessingState::InProgress => {
                    if polls >= MAX_STATUS_POLLS {
                        return Err(PlatformError::Remote(format!(
                            "media still processing after {} status checks",
                            MAX_STATUS_POLLS
                        ))
                        .into());
                    }

                    self.state = SessionState::WaitingForProcessing;
                    let wait = info.check_after_secs.unwrap_or(DEFAULT_CHECK_AFTER_SECS);
                    tracing::debug!("media processing {:?}, waiting {}s", state, wait);
                    with_cancel(cancel, "media processing wait", async {
                        tokio::time::sleep(Duration::from_secs(wait)).await;
                        Ok(())
                    })
                    .await?;

                    info = with_cancel(cancel, "media status", transport.status(media_id)).await?;
                    polls += 1;
                }
            }
        }
    }
}
