//! OAuth 2.0 management for YouTube API authorization.
//!
//! Covers the installed-application authorization-code flow (browser consent
//! plus a one-shot localhost redirect listener), token refresh, and loading
//! the client credentials from a `client_secrets.json` file in Google's
//! installed-app format.

use eyre::Context;
use http_body_util::Full;
use hyper::body::Bytes;
use hyper::service::service_fn;
use hyper::{Request, Response, body};
use oauth2::basic::{BasicClient, BasicTokenResponse};
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge, RedirectUrl,
    Scope, TokenResponse, TokenUrl, reqwest,
};
use serde::Deserialize;
use std::future::Future;
use std::path::Path;

/// Google OAuth2 token endpoint, used for both the initial exchange and
/// refresh.
const TOKEN_URL: &str = "https://www.googleapis.com/oauth2/v3/token";

/// Google OAuth2 authorization endpoint the user's browser is sent to.
const AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Read/write access to the user's playlists.
const SCOPE: &str = "https://www.googleapis.com/auth/youtube";

/// Page shown in the user's browser once the redirect has been captured.
const OAUTH_DONE_HTML: &str = "<!DOCTYPE html>\
<html><head><title>tubelist</title></head>\
<body><p>Authorization complete. You can close this tab and return to the terminal.</p></body></html>";

/// OAuth client credentials in Google's `client_secrets.json` layout.
///
/// For an installed desktop application the "secret" is embedded in the
/// distributed file and is not actually confidential; see
/// <https://developers.google.com/identity/protocols/oauth2#installed>.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: ClientSecrets,
}

impl ClientSecrets {
    /// Loads credentials from a `client_secrets.json` file as downloaded
    /// from the Google Cloud console (`{"installed": {...}}`).
    pub async fn load(path: &Path) -> eyre::Result<Self> {
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("read client secrets file {}", path.display()))?;
        let file: ClientSecretsFile =
            serde_json::from_str(&raw).context("parse client secrets file")?;
        Ok(file.installed)
    }
}

/// Manages OAuth 2.0 flows for YouTube API access.
///
/// One manager instance is shared between the initial interactive
/// authorization and later non-interactive token refreshes, so both use the
/// same client configuration.
#[derive(Debug, Clone)]
pub struct OAuthManager {
    secrets: ClientSecrets,
}

impl OAuthManager {
    pub fn new(secrets: ClientSecrets) -> Self {
        Self { secrets }
    }

    /// Performs the complete interactive authorization flow:
    /// opens the user's browser for consent, receives the callback on a
    /// local HTTP server, and exchanges the authorization code for a token.
    ///
    /// # Panics
    ///
    /// Panics if the hardcoded endpoint URLs are malformed, which cannot
    /// happen for the static values used here.
    pub async fn authenticate(&self) -> eyre::Result<BasicTokenResponse> {
        let csrf = CsrfToken::new_random();
        let (redirect_url, eventually_authorization_code) = self
            .setup_redirect(csrf.clone())
            .await
            .context("set up redirect endpoint")?;

        let auth_url =
            AuthUrl::new(AUTH_URL.to_string()).expect("Invalid authorization endpoint URL");
        let token_url = TokenUrl::new(TOKEN_URL.to_string()).expect("Invalid token endpoint URL");
        let client = BasicClient::new(ClientId::new(self.secrets.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.secrets.client_secret.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url);

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, _csrf_token) = client
            // We never re-use the CSRF since we only go through the flow exactly once.
            .authorize_url(move || csrf.clone())
            .add_scope(Scope::new(SCOPE.to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        tracing::info!(url = %auth_url, "asking user to follow OAuth flow");
        webbrowser::open(auth_url.as_ref()).context("open user's browser")?;
        let authorization_code = eventually_authorization_code
            .await
            .context("await user authorization code")?;

        let http_client = reqwest::ClientBuilder::new()
            // SSRF no thank you.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("building reqwest client should not fail");
        let token_result = client
            .exchange_code(authorization_code)
            .set_pkce_verifier(pkce_verifier)
            .request_async(&http_client)
            .await
            .context("exchange authorization code with access token")?;

        Ok(token_result)
    }

    /// Attempts to refresh an existing token without user interaction.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(new_token))` - refresh succeeded
    /// * `Ok(None)` - no refresh token, or the server rejected the grant;
    ///   the caller should fall back to [`Self::authenticate`]
    /// * `Err(_)` - network or other error during the refresh attempt
    pub async fn refresh_token(
        &self,
        token: BasicTokenResponse,
    ) -> eyre::Result<Option<BasicTokenResponse>> {
        let Some(refresh_token) = token.refresh_token() else {
            tracing::warn!("no refresh token available, cannot refresh");
            return Ok(None);
        };

        tracing::debug!("attempting to refresh OAuth token");

        // A minimal OAuth client suffices for refresh (no redirect URL needed).
        let client = BasicClient::new(ClientId::new(self.secrets.client_id.clone()))
            .set_client_secret(ClientSecret::new(self.secrets.client_secret.clone()))
            .set_token_uri(
                TokenUrl::new(TOKEN_URL.to_string()).expect("Invalid token endpoint URL"),
            );

        let http_client = reqwest::ClientBuilder::new()
            // SSRF no thank you.
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("building reqwest client should not fail");

        match client
            .exchange_refresh_token(refresh_token)
            .request_async(&http_client)
            .await
        {
            Ok(new_token) => {
                tracing::debug!("successfully refreshed OAuth token");
                Ok(Some(new_token))
            }
            Err(ref e @ oauth2::RequestTokenError::ServerResponse(ref sr))
                if matches!(
                    sr.error(),
                    oauth2::basic::BasicErrorResponseType::InvalidGrant
                ) =>
            {
                tracing::warn!("OAuth refresh token considered invalid grant: {}", e);
                Ok(None)
            }
            Err(e) => Err(e).context("exchange refresh token"),
        }
    }

    /// Sets up a one-shot local HTTP server to receive the OAuth redirect.
    ///
    /// The server binds an ephemeral port on localhost, validates the CSRF
    /// `state` parameter, and hands back the authorization code through the
    /// returned future.
    async fn setup_redirect(
        &self,
        csrf: CsrfToken,
    ) -> eyre::Result<(
        RedirectUrl,
        impl Future<Output = eyre::Result<AuthorizationCode>>,
    )> {
        let socket = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind to localhost")?;
        let addr = socket.local_addr().context("get local address")?;
        let url = RedirectUrl::new(format!("http://{}:{}", addr.ip(), addr.port()))
            .context("construct redirect url")?;
        let (tx, rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            let r = async move {
                let (conn, _) = socket.accept().await.context("accept")?;
                let conn = hyper_util::rt::TokioIo::new(conn);
                let (got, mut gotten) = tokio::sync::mpsc::channel(1);
                let service = service_fn(move |req: Request<body::Incoming>| {
                    let csrf = csrf.clone();
                    let got = got.clone();
                    async move {
                        let mut presented_state = None;
                        let mut presented_code = None;
                        for (k, v) in
                            form_urlencoded::parse(req.uri().query().unwrap_or("").as_bytes())
                        {
                            match &*k {
                                "state" => presented_state = Some(v),
                                "code" => presented_code = Some(v),
                                _ => {}
                            }
                        }
                        if presented_state.as_deref() != Some(csrf.secret().as_str()) {
                            return Err("invalid csrf token");
                        }
                        let Some(code) = presented_code else {
                            return Err("no authorization code found");
                        };
                        let code = AuthorizationCode::new(code.into_owned());
                        got.send(code)
                            .await
                            .expect("channel won't be closed until server exit");
                        Ok(Response::new(Full::<Bytes>::from(OAUTH_DONE_HTML)))
                    }
                });
                let mut serve = std::pin::pin!(
                    hyper::server::conn::http1::Builder::new().serve_connection(conn, service)
                );

                tokio::select! {
                    exit = &mut serve => {
                        if let Err(e) = exit {
                            Err(e).context("redirect server got bad request")
                        } else {
                            eyre::bail!("redirect server exit prematurely");
                        }
                    }
                    code = gotten.recv() => {
                        serve.graceful_shutdown();
                        let code = code.expect("channel won't be closed until service_fn is dropped");
                        Ok(code)
                    }
                }
            };
            let _ = tx.send(r.await);
        });
        Ok((url, async move {
            rx.await.context("redirect future dropped prematurely")?
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_installed_app_secrets_format() {
        let raw = r#"{
            "installed": {
                "client_id": "abc.apps.googleusercontent.com",
                "client_secret": "GOCSPX-xyz",
                "auth_uri": "https://accounts.google.com/o/oauth2/auth",
                "token_uri": "https://oauth2.googleapis.com/token",
                "redirect_uris": ["http://localhost"]
            }
        }"#;
        let file: ClientSecretsFile = serde_json::from_str(raw).unwrap();
        assert_eq!(file.installed.client_id, "abc.apps.googleusercontent.com");
        assert_eq!(file.installed.client_secret, "GOCSPX-xyz");
    }
}
