//! Core types for Crosscast

use std::path::{Path, PathBuf};

/// One publish request, shared across all providers.
///
/// Immutable for the duration of a dispatch. The caller is responsible for
/// trimming the message and for defaulting `image_alt` when an image is set
/// (see the `cross-post` binary).
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// Message text, non-empty after trimming.
    pub message: String,
    /// Optional image to attach before the post is created.
    pub image_path: Option<PathBuf>,
    /// Alt text for the image; ignored when `image_path` is unset.
    pub image_alt: Option<String>,
    /// Optional URL appended to the message on its own line.
    pub link: Option<String>,
}

impl Request {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Self::default()
        }
    }

    pub fn with_image(mut self, path: impl Into<PathBuf>, alt: impl Into<String>) -> Self {
        self.image_path = Some(path.into());
        self.image_alt = Some(alt.into());
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    /// Textual body for the post: the message, with the optional link
    /// appended on its own blank-separated line.
    pub fn body(&self) -> String {
        match self.link.as_deref().map(str::trim) {
            Some(link) if !link.is_empty() => format!("{}\n\n{}", self.message, link),
            _ => self.message.clone(),
        }
    }

    pub fn image_path(&self) -> Option<&Path> {
        self.image_path.as_deref()
    }

    /// Alt text after trimming, if an image is set and the text is non-blank.
    pub fn trimmed_alt(&self) -> Option<&str> {
        self.image_path.as_ref()?;
        self.image_alt
            .as_deref()
            .map(str::trim)
            .filter(|alt| !alt.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_without_link() {
        let req = Request::new("hello world");
        assert_eq!(req.body(), "hello world");
    }

    #[test]
    fn test_body_appends_link_on_blank_separated_line() {
        let req = Request::new("release shipped").with_link("https://example.com/notes");
        assert_eq!(req.body(), "release shipped\n\nhttps://example.com/notes");
    }

    #[test]
    fn test_body_ignores_blank_link() {
        let req = Request::new("hello").with_link("   ");
        assert_eq!(req.body(), "hello");
    }

    #[test]
    fn test_trimmed_alt_requires_image() {
        let mut req = Request::new("hello");
        req.image_alt = Some("a cat".to_string());
        assert_eq!(req.trimmed_alt(), None);

        let req = Request::new("hello").with_image("cat.png", "  a cat  ");
        assert_eq!(req.trimmed_alt(), Some("a cat"));
    }

    #[test]
    fn test_trimmed_alt_blank_is_none() {
        let req = Request::new("hello").with_image("cat.png", "   ");
        assert_eq!(req.trimmed_alt(), None);
    }
}
