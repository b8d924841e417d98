use clap::Parser;
use eyre::Context;
use oauth2::basic::BasicTokenResponse;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tubelist::batch::RunSummary;
use tubelist::oauth::ClientSecrets;
use tubelist::video_url::VideoId;
use tubelist::youtube_api::insert_playlist_item;
use tubelist::{run_from_file, setup_youtube_client};

/// Append YouTube videos from a URL list file to one of your playlists.
///
/// The input file has one URL per line; blank lines and lines starting with
/// `#` are ignored. The first run opens your browser to authorize access;
/// later runs reuse the cached token.
#[derive(Debug, Parser)]
#[command(name = "tubelist", version)]
struct Cli {
    /// Path to the file containing YouTube video URLs (one per line).
    #[arg(short, long)]
    file: PathBuf,

    /// The ID of the playlist to add videos to.
    #[arg(short, long)]
    playlist_id: String,

    /// Path to the OAuth client secrets file from the Google Cloud console.
    #[arg(long, default_value = "client_secrets.json")]
    secrets: PathBuf,

    /// Path of the cached OAuth token.
    #[arg(long, default_value = "tokens.json")]
    tokens: PathBuf,
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(std::io::stdout().is_terminal())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // run_from_file reads the input before invoking this closure, so a bad
    // path fails the run without a browser round-trip or network traffic.
    let mut authorized_client = None;
    let summary = run_from_file(&cli.file, async || {
        let secrets = ClientSecrets::load(&cli.secrets).await?;
        let stored_token = load_cached_token(&cli.tokens).await;
        let client = setup_youtube_client(stored_token, secrets).await?;
        authorized_client = Some(client.clone());
        let playlist_id = cli.playlist_id.clone();
        Ok(async move |video_id: &VideoId| {
            insert_playlist_item(&client, &playlist_id, video_id).await
        })
    })
    .await?;

    // Persist the (possibly refreshed) token for the next run. Losing it is
    // an inconvenience, not a failed run.
    if let Some(client) = authorized_client {
        let token = client.token().await;
        if let Err(e) = save_cached_token(&cli.tokens, &token).await {
            tracing::warn!(path = %cli.tokens.display(), "could not save token cache: {e:#}");
        }
    }

    render_summary(&summary);
    Ok(())
}

/// Loads the cached OAuth token, if any.
///
/// A missing or corrupt cache just means the browser flow runs again.
async fn load_cached_token(path: &Path) -> Option<BasicTokenResponse> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(_) => return None,
    };
    match serde_json::from_str(&raw) {
        Ok(token) => Some(token),
        Err(e) => {
            tracing::warn!(path = %path.display(), "could not parse token cache, re-authorizing: {e}");
            None
        }
    }
}

async fn save_cached_token(path: &Path, token: &BasicTokenResponse) -> eyre::Result<()> {
    let json = serde_json::to_string(token).context("serialize OAuth token")?;
    tokio::fs::write(path, &json)
        .await
        .with_context(|| format!("write token cache {}", path.display()))?;
    Ok(())
}

fn render_summary(summary: &RunSummary) {
    let c = &summary.counts;
    println!("\n--- Summary ---");
    println!("Added:               {}", c.added);
    println!("Already in playlist: {}", c.already_present);
    println!("Not found:           {}", c.not_found);
    println!("Forbidden:           {}", c.forbidden);
    println!("Quota exceeded:      {}", c.quota_exceeded);
    println!("Transient errors:    {}", c.transient_error);
    println!("Unknown errors:      {}", c.unknown_error);

    let failures: Vec<_> = summary
        .outcomes
        .iter()
        .filter(|o| !o.kind.is_success())
        .collect();
    if !failures.is_empty() {
        println!("\nVideos that were not added:");
        for outcome in failures {
            match &outcome.detail {
                Some(detail) => println!("  {} ({}): {}", outcome.video_id, outcome.kind, detail),
                None => println!("  {} ({})", outcome.video_id, outcome.kind),
            }
        }
    }

    if !summary.unparsable.is_empty() {
        println!("\nLines that did not parse as video URLs:");
        for line in &summary.unparsable {
            println!("  {line}");
        }
    }

    if !summary.outcomes.is_empty() && !summary.any_success() {
        println!(
            "\nHint: no video made it into the playlist. Check the playlist ID, \
             your account's permissions, and the diagnostics above."
        );
    }
}
