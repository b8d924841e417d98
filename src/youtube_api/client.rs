//! Core API client functionality and access-token management.

use crate::oauth::OAuthManager;
use eyre::Context;
use http::Method;
use oauth2::TokenResponse;
use oauth2::basic::BasicTokenResponse;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::Mutex;
use tracing::instrument;

/// How long each API request may take before it is abandoned.
///
/// A timed-out insertion is classified as a transient outcome by the caller
/// and the run proceeds to the next video.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// An OAuth2 token paired with the time at which it should be considered
/// expired.
#[derive(Debug, Clone)]
pub struct TimeBoundAccessToken {
    token: BasicTokenResponse,
    /// When the current access token expires (with safety buffer).
    expires_at: SystemTime,
}

impl TimeBoundAccessToken {
    /// Wraps a token loaded from storage as already expired, forcing a
    /// refresh before first use.
    pub fn expired(token: BasicTokenResponse) -> Self {
        Self {
            expires_at: SystemTime::UNIX_EPOCH,
            token,
        }
    }

    /// Wraps a freshly issued token, computing its expiry from the
    /// `expires_in` field minus a 5-minute safety buffer.
    pub fn new(token: BasicTokenResponse) -> Self {
        Self {
            expires_at: Self::calculate_token_expiry(&token),
            token,
        }
    }

    pub fn raw_token(&self) -> &BasicTokenResponse {
        &self.token
    }

    /// Refreshes this token in place, preserving the refresh token when the
    /// server's response omits one.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - token was refreshed
    /// * `Ok(false)` - refresh rejected (invalid grant, no refresh token);
    ///   the token is unusable and a full re-authorization is needed
    /// * `Err(_)` - network or other error occurred
    pub async fn refresh(&mut self, oauth_manager: &OAuthManager) -> eyre::Result<bool> {
        tracing::trace!("refreshing token");
        match oauth_manager
            .refresh_token(self.token.clone())
            .await
            .context("refresh OAuth token")?
        {
            Some(new_token) => {
                let old_token = std::mem::replace(&mut self.token, new_token);

                // Google often omits the refresh token on refresh responses.
                if self.token.refresh_token().is_none() {
                    tracing::trace!("new token lacks refresh token, preserving original");
                    self.token
                        .set_refresh_token(old_token.refresh_token().cloned());
                }

                self.expires_at = Self::calculate_token_expiry(&self.token);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Expiry is `now + expires_in - 5 minutes`; without an `expires_in`
    /// field, a conservative 55-minute lifetime is assumed.
    fn calculate_token_expiry(token: &BasicTokenResponse) -> SystemTime {
        let now = SystemTime::now();
        if let Some(expires_in) = token.expires_in() {
            now + expires_in.saturating_sub(Duration::from_secs(300))
        } else {
            now + Duration::from_secs(3300)
        }
    }
}

/// Client for the YouTube Data API v3.
///
/// Wraps an OAuth2 token (mutex-guarded so refreshes do not race) and a
/// shared HTTP client. Every request first ensures the access token is
/// fresh, refreshing it through the stored [`OAuthManager`] when needed.
#[derive(Debug, Clone)]
pub struct YouTubeClient {
    token: Arc<Mutex<TimeBoundAccessToken>>,
    oauth_manager: Arc<OAuthManager>,
    client: reqwest::Client,
}

impl YouTubeClient {
    /// Creates a client from an already-obtained token and the OAuth manager
    /// used to refresh it.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built, which only happens when
    /// the TLS backend is unavailable.
    pub fn new(token: TimeBoundAccessToken, oauth_manager: OAuthManager) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("building reqwest client should not fail");
        Self {
            token: Arc::new(Mutex::new(token)),
            oauth_manager: Arc::new(oauth_manager),
            client,
        }
    }

    /// Returns a clone of the underlying OAuth2 token, for persisting to the
    /// token cache after a run.
    pub async fn token(&self) -> BasicTokenResponse {
        self.token.lock().await.token.clone()
    }

    /// Gets a guaranteed-fresh access token, refreshing first if the current
    /// one has passed its expiry buffer.
    #[instrument(skip(self))]
    pub(crate) async fn fresh_access_token(&self) -> eyre::Result<String> {
        let mut token = self.token.lock().await;

        if SystemTime::now() >= token.expires_at {
            tracing::debug!("access token expired, attempting refresh");
            if token.refresh(&self.oauth_manager).await? {
                tracing::debug!("access token successfully refreshed");
            } else {
                tracing::error!("access token refresh failed, client is unusable");
                return Err(eyre::eyre!("Unable to refresh expired access token"));
            }
        }

        Ok(token.token.access_token().secret().to_string())
    }

    /// Makes an authenticated request to the YouTube API.
    ///
    /// Handles the shared mechanics of every call: token freshness, the
    /// `Authorization` header, query parameters, and an optional JSON body.
    ///
    /// Unlike a plain `error_for_status` client, this returns the response
    /// even for non-success statuses; callers classify failures from the
    /// status code and the structured error body rather than aborting.
    /// `Err` here means the request could not be performed at all (token
    /// refresh failure, connection error, timeout).
    #[instrument(skip(self, json_body), level = tracing::Level::TRACE)]
    pub(crate) async fn send_authenticated(
        &self,
        method: Method,
        url: &str,
        query_params: Option<&[(&str, &str)]>,
        json_body: Option<&impl Serialize>,
    ) -> eyre::Result<reqwest::Response> {
        let access_token = self.fresh_access_token().await?;

        let mut request = self
            .client
            .request(method.clone(), url)
            .header("Authorization", format!("Bearer {}", access_token));

        if let Some(params) = query_params {
            request = request.query(params);
        }

        if let Some(body) = json_body {
            request = request
                .header("Content-Type", "application/json")
                .json(body);
        }

        request
            .send()
            .await
            .with_context(|| format!("send {} request to YouTube API: {}", method, url))
    }
}
