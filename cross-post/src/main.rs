//! cross-post - Post one message to several social networks at once

use std::io::Read;
use std::path::PathBuf;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use libcrosscast::dispatch::{build_posters, dispatch, normalize_targets, simulate};
use libcrosscast::{CrosscastError, Request, Result};

/// Alt text applied when an image is attached without one.
const DEFAULT_IMAGE_ALT: &str = "Image attached via cross-post";

#[derive(Parser, Debug)]
#[command(name = "cross-post")]
#[command(about = "Post one message to several social networks at once", long_about = None)]
struct Cli {
    /// Message to post (reads from stdin if not provided)
    message: Option<String>,

    /// Message to post (alternative to the positional argument)
    #[arg(short = 'm', long = "message", value_name = "TEXT")]
    message_flag: Option<String>,

    /// Image file to attach (jpeg, png, gif, or webp)
    #[arg(long, value_name = "PATH")]
    image: Option<PathBuf>,

    /// Alt text for the attached image
    #[arg(long, value_name = "TEXT")]
    alt_text: Option<String>,

    /// URL appended to the message on its own line
    #[arg(long, value_name = "URL")]
    link: Option<String>,

    /// Target network(s); repeatable, "all" expands to every network
    #[arg(short, long, value_name = "NAME", default_value = "all")]
    target: Vec<String>,

    /// Show what would be posted without performing any network call
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    libcrosscast::logging::init_default(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let message = resolve_message(&cli)?;
    let targets = normalize_targets(&cli.target)?;

    let mut request = Request::new(message);
    if let Some(path) = &cli.image {
        let alt = cli
            .alt_text
            .as_deref()
            .map(str::trim)
            .filter(|alt| !alt.is_empty())
            .unwrap_or(DEFAULT_IMAGE_ALT);
        request = request.with_image(path, alt);
    }
    if let Some(link) = &cli.link {
        request = request.with_link(link);
    }

    let mut stdout = std::io::stdout();

    if cli.dry_run {
        return simulate(&targets, &request, &mut stdout);
    }

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, cancelling");
            ctrl_c.cancel();
        }
    });

    let (posters, mut failures) = build_posters(&targets).await;
    for (provider, error) in failures.iter() {
        eprintln!("error: {}: {}", provider, error);
    }
    if posters.is_empty() {
        return failures.into_result();
    }

    let dispatch_failures = dispatch(&posters, &request, &cancel, &mut stdout).await?;
    failures.extend(dispatch_failures);
    failures.into_result()
}

/// Resolve the message from the positional argument, `--message`, or stdin,
/// and require it to be non-blank.
fn resolve_message(cli: &Cli) -> Result<String> {
    let message = match (&cli.message, &cli.message_flag) {
        (Some(_), Some(_)) => {
            return Err(CrosscastError::InvalidInput(
                "message given both as an argument and with --message".to_string(),
            ));
        }
        (Some(message), None) | (None, Some(message)) => message.clone(),
        (None, None) => {
            if atty::is(atty::Stream::Stdin) {
                return Err(CrosscastError::InvalidInput(
                    "message is required (pass MESSAGE, --message, or pipe stdin)".to_string(),
                ));
            }
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };

    let message = message.trim().to_string();
    if message.is_empty() {
        return Err(CrosscastError::InvalidInput(
            "message must not be empty".to_string(),
        ));
    }
    Ok(message)
}
