//! tubelist: append YouTube videos from a URL list file to a playlist.
//!
//! The pipeline is strictly sequential: the input file becomes an ordered,
//! deduplicated list of video IDs ([`input`]), each ID becomes exactly one
//! `playlistItems.insert` attempt ([`youtube_api`]), and every attempt's
//! classification is folded into the final [`batch::RunSummary`].

use crate::batch::{InsertionOutcome, RunSummary, run_batch};
use crate::input::VideoList;
use crate::oauth::{ClientSecrets, OAuthManager};
use crate::video_url::VideoId;
use crate::youtube_api::client::{TimeBoundAccessToken, YouTubeClient};
use eyre::Context;
use oauth2::basic::BasicTokenResponse;
use std::path::Path;

pub mod batch;
pub mod input;
pub mod oauth;
pub mod video_url;
pub mod youtube_api;

/// The whole run: load and parse the input file, authorize, insert each
/// video in sequence, and report.
///
/// `authorize` is only invoked once the input file has been read
/// successfully and there is at least one video to insert, so a bad path
/// never triggers a browser round-trip or network traffic. It returns the
/// per-video inserter, which lets tests drive the pipeline with stubs for
/// both capabilities.
pub async fn run_from_file<Auth, Ins>(path: &Path, authorize: Auth) -> eyre::Result<RunSummary>
where
    Auth: AsyncFnOnce() -> eyre::Result<Ins>,
    Ins: AsyncFnMut(&VideoId) -> InsertionOutcome,
{
    let list = VideoList::load(path).await?;

    if list.videos.is_empty() {
        tracing::info!("no videos to insert");
        return Ok(RunSummary::new(list.unparsable));
    }

    let insert = authorize().await.context("obtain authorized client")?;
    Ok(run_batch(&list.videos, list.unparsable, insert).await)
}

/// Produces an authorized API client, reusing a cached token when possible.
///
/// With a stored token, the token is proactively refreshed so the run starts
/// with maximum lifetime; if the refresh is rejected (revoked or expired
/// grant), the full browser flow runs again. Without a stored token, the
/// browser flow runs outright. Any failure here is fatal for the run and
/// happens before the first insertion attempt.
///
/// Persist the client's [`YouTubeClient::token`] after the run so the next
/// invocation skips the browser.
pub async fn setup_youtube_client(
    stored_token: Option<BasicTokenResponse>,
    secrets: ClientSecrets,
) -> eyre::Result<YouTubeClient> {
    let oauth_manager = OAuthManager::new(secrets);

    let token = match stored_token {
        Some(stored) => {
            tracing::info!("proactively refreshing cached token");
            let mut token = TimeBoundAccessToken::expired(stored);

            if token
                .refresh(&oauth_manager)
                .await
                .context("refresh cached token")?
            {
                tracing::debug!("successfully refreshed cached token");
                token
            } else {
                tracing::warn!("token refresh rejected, re-authorizing via browser");
                let raw_token = oauth_manager
                    .authenticate()
                    .await
                    .context("authorize user to YouTube")?;
                TimeBoundAccessToken::new(raw_token)
            }
        }
        None => {
            tracing::info!("no cached token, starting browser authorization");
            let raw_token = oauth_manager
                .authenticate()
                .await
                .context("authorize user to YouTube")?;
            TimeBoundAccessToken::new(raw_token)
        }
    };

    Ok(YouTubeClient::new(token, oauth_manager))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::OutcomeKind;

    fn stub_inserter(
        kind: OutcomeKind,
    ) -> impl AsyncFnMut(&VideoId) -> InsertionOutcome {
        async move |video_id: &VideoId| InsertionOutcome {
            video_id: video_id.clone(),
            kind,
            detail: None,
        }
    }

    #[tokio::test]
    async fn unreadable_input_fails_before_authorization() {
        let mut auth_calls = 0;
        let result = run_from_file(Path::new("/no/such/input.txt"), async || {
            auth_calls += 1;
            Ok(stub_inserter(OutcomeKind::Added))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(auth_calls, 0, "authorization must not be attempted");
    }

    #[tokio::test]
    async fn empty_input_reports_without_authorizing() {
        let path = std::env::temp_dir().join("tubelist-empty-input-test.txt");
        tokio::fs::write(&path, "# only a comment\n\nnot a url\n")
            .await
            .unwrap();

        let mut auth_calls = 0;
        let summary = run_from_file(&path, async || {
            auth_calls += 1;
            Ok(stub_inserter(OutcomeKind::Added))
        })
        .await
        .unwrap();

        assert_eq!(auth_calls, 0);
        assert!(summary.outcomes.is_empty());
        assert_eq!(summary.unparsable, ["not a url"]);
        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn full_run_over_a_real_file() {
        let path = std::env::temp_dir().join("tubelist-run-input-test.txt");
        tokio::fs::write(
            &path,
            "# playlist backlog\n\
             https://www.youtube.com/watch?v=dQw4w9WgXcQ\n\
             https://youtu.be/dQw4w9WgXcQ\n\
             https://youtu.be/aaaaaaaaaaa\n\
             total garbage\n",
        )
        .await
        .unwrap();

        let mut auth_calls = 0;
        let summary = run_from_file(&path, async || {
            auth_calls += 1;
            Ok(stub_inserter(OutcomeKind::Added))
        })
        .await
        .unwrap();

        assert_eq!(auth_calls, 1);
        // The duplicate URL forms collapse to one ID.
        assert_eq!(summary.counts.added, 2);
        assert_eq!(summary.counts.total(), 2);
        assert_eq!(summary.unparsable, ["total garbage"]);
        let _ = tokio::fs::remove_file(&path).await;
    }
}
