//! Target resolution and fan-out to providers
//!
//! Target lists from the CLI are normalized (trimmed, lowercased,
//! deduplicated, `all` expanded) into a sorted set of provider names.
//! Dispatch then runs each poster in turn: one provider failing never
//! prevents the rest from being attempted, and every failure is collected
//! into a single [`AggregateError`] so a partial success still reports what
//! went wrong where.

use std::io::Write;

use tokio_util::sync::CancellationToken;

use crate::config::{BlueskyConfig, MastodonConfig, TwitterConfig};
use crate::error::{AggregateError, CrosscastError, Result};
use crate::platforms::bluesky::BlueskyClient;
use crate::platforms::mastodon::MastodonClient;
use crate::platforms::twitter::TwitterClient;
use crate::platforms::Poster;
use crate::types::Request;

/// Recognized provider names, in dispatch order.
pub const SUPPORTED_TARGETS: &[&str] = &["bluesky", "mastodon", "twitter"];

/// Name that expands to every supported provider.
pub const TARGET_ALL: &str = "all";

/// Resolve a raw target list into a sorted, deduplicated set of provider
/// names. Unknown names and an empty result are both input errors.
pub fn normalize_targets(raw: &[String]) -> Result<Vec<String>> {
    let mut targets = Vec::new();

    for entry in raw {
        let name = entry.trim().to_lowercase();
        if name.is_empty() {
            continue;
        }
        if name == TARGET_ALL {
            for supported in SUPPORTED_TARGETS {
                push_unique(&mut targets, supported.to_string());
            }
            continue;
        }
        if !SUPPORTED_TARGETS.contains(&name.as_str()) {
            return Err(CrosscastError::InvalidInput(format!(
                "unsupported target \"{}\" (supported: {}, or {})",
                name,
                SUPPORTED_TARGETS.join(", "),
                TARGET_ALL
            )));
        }
        push_unique(&mut targets, name);
    }

    if targets.is_empty() {
        return Err(CrosscastError::InvalidInput(
            "no targets specified".to_string(),
        ));
    }

    targets.sort();
    Ok(targets)
}

fn push_unique(targets: &mut Vec<String>, name: String) {
    if !targets.contains(&name) {
        targets.push(name);
    }
}

/// Construct a poster for every target, reading credentials from the
/// environment. Returns the usable posters alongside the construction
/// failures; a provider with missing credentials or a failed login is
/// reported without blocking the others.
pub async fn build_posters(targets: &[String]) -> (Vec<Box<dyn Poster>>, AggregateError) {
    let mut posters: Vec<Box<dyn Poster>> = Vec::new();
    let mut failures = AggregateError::new();

    for target in targets {
        match build_poster(target).await {
            Ok(poster) => posters.push(poster),
            Err(e) => failures.push(target.clone(), e),
        }
    }

    (posters, failures)
}

async fn build_poster(target: &str) -> Result<Box<dyn Poster>> {
    match target {
        "twitter" => {
            let config = TwitterConfig::from_env()?;
            Ok(Box::new(TwitterClient::new(config)?))
        }
        "mastodon" => {
            let config = MastodonConfig::from_env()?;
            Ok(Box::new(MastodonClient::connect(&config).await?))
        }
        "bluesky" => {
            let config = BlueskyConfig::from_env()?;
            Ok(Box::new(BlueskyClient::connect(&config).await?))
        }
        other => Err(CrosscastError::InvalidInput(format!(
            "unsupported target \"{}\"",
            other
        ))),
    }
}

/// Post the request to each poster in turn, reporting progress to `out`.
/// Failures are collected; the returned aggregate is empty on full success.
pub async fn dispatch(
    posters: &[Box<dyn Poster>],
    request: &Request,
    cancel: &CancellationToken,
    out: &mut dyn Write,
) -> Result<AggregateError> {
    let mut failures = AggregateError::new();

    for poster in posters {
        let name = poster.name();
        writeln!(out, "Posting to {}...", name)?;

        match poster.post(request, cancel).await {
            Ok(()) => {
                tracing::info!(provider = name, "posted");
                writeln!(out, "Posted to {}", name)?;
            }
            Err(e) => {
                tracing::warn!(provider = name, error = %e, "post failed");
                writeln!(out, "error: {}: {}", name, e)?;
                failures.push(name, e);
            }
        }
    }

    Ok(failures)
}

/// Describe what a live run would do, without constructing any client or
/// touching the network.
pub fn simulate(targets: &[String], request: &Request, out: &mut dyn Write) -> Result<()> {
    for target in targets {
        writeln!(
            out,
            "[dry-run] would post to {}: \"{}\"",
            target,
            request.body()
        )?;
    }
    if let Some(path) = request.image_path() {
        writeln!(
            out,
            "[dry-run] image: {} (alt: \"{}\")",
            path.display(),
            request.trimmed_alt().unwrap_or_default()
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config;
    use crate::error::{ConfigError, PlatformError};
    use crate::platforms::mock::MockPoster;
    use serial_test::serial;

    fn raw(targets: &[&str]) -> Vec<String> {
        targets.iter().map(|s| s.to_string()).collect()
    }

    fn clear_credential_env() {
        for name in [
            config::ENV_TWITTER_CONSUMER_KEY,
            config::ENV_TWITTER_CONSUMER_SECRET,
            config::ENV_TWITTER_ACCESS_TOKEN,
            config::ENV_TWITTER_ACCESS_TOKEN_SECRET,
            config::ENV_MASTODON_SERVER,
            config::ENV_MASTODON_ACCESS_TOKEN,
            config::ENV_BLUESKY_HANDLE,
            config::ENV_BLUESKY_APP_PASSWORD,
        ] {
            std::env::remove_var(name);
        }
    }

    #[tokio::test]
    #[serial]
    async fn test_build_posters_collects_every_unconfigured_target() {
        clear_credential_env();

        let targets = raw(&["bluesky", "mastodon", "twitter"]);
        let (posters, failures) = build_posters(&targets).await;

        assert!(posters.is_empty());
        assert_eq!(failures.len(), 3);

        // One failure per target, in dispatch order, each a MissingEnv.
        let providers: Vec<&str> = failures.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(providers, vec!["bluesky", "mastodon", "twitter"]);
        for (provider, error) in failures.iter() {
            match error {
                CrosscastError::Config(ConfigError::MissingEnv {
                    provider: from_env, ..
                }) => assert_eq!(provider, from_env),
                other => panic!("expected MissingEnv for {}, got {:?}", provider, other),
            }
        }

        assert!(failures.into_result().is_err());
    }

    #[test]
    fn test_normalize_sorts_and_dedupes() {
        let targets = normalize_targets(&raw(&["twitter", "Bluesky", "twitter"])).unwrap();
        assert_eq!(targets, vec!["bluesky", "twitter"]);
    }

    #[test]
    fn test_normalize_expands_all() {
        let targets = normalize_targets(&raw(&["all"])).unwrap();
        assert_eq!(targets, vec!["bluesky", "mastodon", "twitter"]);
    }

    #[test]
    fn test_normalize_all_mixed_with_names() {
        let targets = normalize_targets(&raw(&["mastodon", "ALL"])).unwrap();
        assert_eq!(targets, vec!["bluesky", "mastodon", "twitter"]);
    }

    #[test]
    fn test_normalize_trims_whitespace() {
        let targets = normalize_targets(&raw(&["  Twitter  "])).unwrap();
        assert_eq!(targets, vec!["twitter"]);
    }

    #[test]
    fn test_normalize_rejects_unknown_target() {
        let result = normalize_targets(&raw(&["twitter", "myspace"]));
        match result {
            Err(CrosscastError::InvalidInput(msg)) => {
                assert!(msg.contains("myspace"));
                assert!(msg.contains("twitter"));
            }
            other => panic!("expected invalid input, got {:?}", other),
        }
    }

    #[test]
    fn test_normalize_rejects_empty_list() {
        assert!(matches!(
            normalize_targets(&[]),
            Err(CrosscastError::InvalidInput(_))
        ));
        assert!(matches!(
            normalize_targets(&raw(&["  ", ""])),
            Err(CrosscastError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_dispatch_posts_to_each_in_order() {
        let posters: Vec<Box<dyn Poster>> = vec![
            Box::new(MockPoster::new("bluesky")),
            Box::new(MockPoster::new("twitter")),
        ];
        let cancel = CancellationToken::new();
        let mut out = Vec::new();

        let failures = dispatch(&posters, &Request::new("hi"), &cancel, &mut out)
            .await
            .unwrap();
        assert!(failures.is_empty());

        let output = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Posting to bluesky...",
                "Posted to bluesky",
                "Posting to twitter...",
                "Posted to twitter",
            ]
        );
    }

    #[tokio::test]
    async fn test_dispatch_continues_after_failure() {
        let recorder = MockPoster::new("twitter");
        let requests = recorder.requests();
        let posters: Vec<Box<dyn Poster>> = vec![
            Box::new(MockPoster::failing(
                "mastodon",
                PlatformError::Remote("status 500".to_string()),
            )),
            Box::new(recorder),
        ];
        let cancel = CancellationToken::new();
        let mut out = Vec::new();

        let failures = dispatch(&posters, &Request::new("hi"), &cancel, &mut out)
            .await
            .unwrap();

        // The later provider still ran.
        assert_eq!(requests.lock().unwrap().len(), 1);
        assert_eq!(failures.len(), 1);
        let providers: Vec<&str> = failures.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(providers, vec!["mastodon"]);

        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("error: mastodon: "));
        assert!(output.contains("Posted to twitter"));
    }

    #[tokio::test]
    async fn test_dispatch_collects_every_failure() {
        let posters: Vec<Box<dyn Poster>> = vec![
            Box::new(MockPoster::failing(
                "bluesky",
                PlatformError::Network("timeout".to_string()),
            )),
            Box::new(MockPoster::failing(
                "twitter",
                PlatformError::Remote("status 400".to_string()),
            )),
        ];
        let cancel = CancellationToken::new();
        let mut out = Vec::new();

        let failures = dispatch(&posters, &Request::new("hi"), &cancel, &mut out)
            .await
            .unwrap();
        assert_eq!(failures.len(), 2);
        assert!(failures.into_result().is_err());
    }

    #[test]
    fn test_simulate_lists_each_target() {
        let targets = raw(&["bluesky", "twitter"]);
        let request = Request::new("release shipped").with_link("https://example.com");
        let mut out = Vec::new();

        simulate(&targets, &request, &mut out).unwrap();

        let output = String::from_utf8(out).unwrap();
        assert!(output
            .contains("[dry-run] would post to bluesky: \"release shipped\n\nhttps://example.com\""));
        assert!(output.contains("[dry-run] would post to twitter"));
        assert!(!output.contains("image:"));
    }

    #[test]
    fn test_simulate_reports_image() {
        let targets = raw(&["twitter"]);
        let request = Request::new("look").with_image("/tmp/cat.png", "a cat");
        let mut out = Vec::new();

        simulate(&targets, &request, &mut out).unwrap();

        let output = String::from_utf8(out).unwrap();
        assert!(output.contains("[dry-run] image: /tmp/cat.png (alt: \"a cat\")"));
    }
}
