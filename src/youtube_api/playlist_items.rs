//! The `playlistItems.insert` call and its outcome classification.
//!
//! Each call makes exactly one remote mutation attempt and converts whatever
//! comes back into an [`InsertionOutcome`]; nothing here raises per-video
//! errors. Classification follows the documented YouTube API error taxonomy:
//! <https://developers.google.com/youtube/v3/docs/playlistItems/insert#errors>

use crate::batch::{InsertionOutcome, OutcomeKind};
use crate::video_url::VideoId;
use crate::youtube_api::client::YouTubeClient;
use http::Method;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

const PLAYLIST_ITEMS_URL: &str = "https://www.googleapis.com/youtube/v3/playlistItems";

/// Request body for `playlistItems.insert` with `part=snippet`.
///
/// See: <https://developers.google.com/youtube/v3/docs/playlistItems#resource>
#[derive(Debug, Serialize)]
struct PlaylistItemInsertRequest {
    snippet: PlaylistItemSnippet,
}

#[derive(Debug, Serialize)]
struct PlaylistItemSnippet {
    #[serde(rename = "playlistId")]
    playlist_id: String,
    #[serde(rename = "resourceId")]
    resource_id: ResourceId,
}

#[derive(Debug, Serialize)]
struct ResourceId {
    /// Always `youtube#video` for video insertions.
    kind: &'static str,
    #[serde(rename = "videoId")]
    video_id: VideoId,
}

/// The structured error envelope Google APIs return on failure.
///
/// ```json
/// {"error": {"code": 403, "message": "...", "errors": [{"reason": "quotaExceeded", ...}]}}
/// ```
#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
    #[serde(default)]
    errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    reason: Option<String>,
}

/// Attempts to insert one video into the playlist and classifies the result.
///
/// No retries are performed: `QuotaExceeded` and `TransientError` are
/// conceptually retriable but are surfaced as-is for the user to act on.
pub async fn insert_playlist_item(
    client: &YouTubeClient,
    playlist_id: &str,
    video_id: &VideoId,
) -> InsertionOutcome {
    let body = PlaylistItemInsertRequest {
        snippet: PlaylistItemSnippet {
            playlist_id: playlist_id.to_string(),
            resource_id: ResourceId {
                kind: "youtube#video",
                video_id: video_id.clone(),
            },
        },
    };
    let query_params = [("part", "snippet")];

    let response = match client
        .send_authenticated(
            Method::POST,
            PLAYLIST_ITEMS_URL,
            Some(&query_params),
            Some(&body),
        )
        .await
    {
        Ok(response) => response,
        Err(e) => {
            let (kind, detail) = classify_send_error(&e);
            return InsertionOutcome {
                video_id: video_id.clone(),
                kind,
                detail,
            };
        }
    };

    let status = response.status();
    if status.is_success() {
        tracing::debug!(video_id = %video_id, playlist_id, "inserted playlist item");
        return InsertionOutcome {
            video_id: video_id.clone(),
            kind: OutcomeKind::Added,
            detail: None,
        };
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    let (kind, detail) = classify_failure(status, &error_text);
    InsertionOutcome {
        video_id: video_id.clone(),
        kind,
        detail,
    }
}

/// Classifies a request that never produced a response.
///
/// Timeouts and connection failures are transient conditions; anything else
/// (including a failed mid-run token refresh) is unknown and carries the
/// error text.
fn classify_send_error(e: &eyre::Report) -> (OutcomeKind, Option<String>) {
    let transient = e
        .chain()
        .filter_map(|cause| cause.downcast_ref::<reqwest::Error>())
        .any(|cause| cause.is_timeout() || cause.is_connect());
    let kind = if transient {
        OutcomeKind::TransientError
    } else {
        OutcomeKind::UnknownError
    };
    (kind, Some(format!("{e:#}")))
}

/// Classifies a non-success API response from its status code and error
/// body.
///
/// Pure function so the status/reason mapping can be tested from fixtures.
fn classify_failure(status: StatusCode, body: &str) -> (OutcomeKind, Option<String>) {
    let parsed: Option<ApiErrorEnvelope> = serde_json::from_str(body).ok();
    let reasons: Vec<&str> = parsed
        .as_ref()
        .map(|e| {
            e.error
                .errors
                .iter()
                .filter_map(|d| d.reason.as_deref())
                .collect()
        })
        .unwrap_or_default();
    let detail = parsed
        .as_ref()
        .and_then(|e| e.error.message.clone())
        .unwrap_or_else(|| body.to_string());
    let detail = (!detail.is_empty()).then_some(detail);
    let has = |reason: &str| reasons.iter().any(|r| *r == reason);

    let kind = if status == StatusCode::CONFLICT
        || has("videoAlreadyInPlaylist")
        || has("duplicate")
    {
        OutcomeKind::AlreadyPresent
    } else if status == StatusCode::NOT_FOUND {
        OutcomeKind::NotFound
    } else if status == StatusCode::FORBIDDEN {
        if has("quotaExceeded")
            || has("dailyLimitExceeded")
            || has("rateLimitExceeded")
            || has("userRateLimitExceeded")
        {
            OutcomeKind::QuotaExceeded
        } else {
            OutcomeKind::Forbidden
        }
    } else if status.is_server_error() {
        OutcomeKind::TransientError
    } else {
        OutcomeKind::UnknownError
    };

    (kind, detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error_body(code: u16, reason: &str, message: &str) -> String {
        serde_json::json!({
            "error": {
                "code": code,
                "message": message,
                "errors": [{"reason": reason, "domain": "youtube.playlistItem", "message": message}]
            }
        })
        .to_string()
    }

    #[test]
    fn quota_reasons_on_403_are_quota_exceeded() {
        for reason in [
            "quotaExceeded",
            "dailyLimitExceeded",
            "rateLimitExceeded",
            "userRateLimitExceeded",
        ] {
            let body = error_body(403, reason, "quota exhausted");
            let (kind, detail) = classify_failure(StatusCode::FORBIDDEN, &body);
            assert_eq!(kind, OutcomeKind::QuotaExceeded, "reason: {reason}");
            assert_eq!(detail.as_deref(), Some("quota exhausted"));
        }
    }

    #[test]
    fn other_403_is_forbidden() {
        let body = error_body(403, "playlistItemsNotAccessible", "not your playlist");
        let (kind, _) = classify_failure(StatusCode::FORBIDDEN, &body);
        assert_eq!(kind, OutcomeKind::Forbidden);
    }

    #[test]
    fn missing_video_is_not_found() {
        let body = error_body(404, "videoNotFound", "Video not found.");
        let (kind, detail) = classify_failure(StatusCode::NOT_FOUND, &body);
        assert_eq!(kind, OutcomeKind::NotFound);
        assert_eq!(detail.as_deref(), Some("Video not found."));
    }

    #[test]
    fn missing_playlist_is_not_found_not_fatal() {
        let body = error_body(404, "playlistNotFound", "Playlist not found.");
        let (kind, _) = classify_failure(StatusCode::NOT_FOUND, &body);
        assert_eq!(kind, OutcomeKind::NotFound);
    }

    #[test]
    fn conflict_means_already_present() {
        let (kind, _) = classify_failure(StatusCode::CONFLICT, "");
        assert_eq!(kind, OutcomeKind::AlreadyPresent);

        // Some deployments report the duplicate via a reason code instead.
        let body = error_body(400, "videoAlreadyInPlaylist", "dup");
        let (kind, _) = classify_failure(StatusCode::BAD_REQUEST, &body);
        assert_eq!(kind, OutcomeKind::AlreadyPresent);
    }

    #[test]
    fn server_errors_are_transient() {
        for status in [
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::GATEWAY_TIMEOUT,
        ] {
            let (kind, _) = classify_failure(status, "backend error");
            assert_eq!(kind, OutcomeKind::TransientError, "status: {status}");
        }
    }

    #[test]
    fn unparsable_body_falls_back_to_unknown_with_raw_text() {
        let (kind, detail) = classify_failure(StatusCode::IM_A_TEAPOT, "<html>nope</html>");
        assert_eq!(kind, OutcomeKind::UnknownError);
        assert_eq!(detail.as_deref(), Some("<html>nope</html>"));
    }

    #[test]
    fn insert_body_serializes_to_api_shape() {
        let video_id = crate::video_url::extract_video_id("https://youtu.be/dQw4w9WgXcQ").unwrap();
        let body = PlaylistItemInsertRequest {
            snippet: PlaylistItemSnippet {
                playlist_id: "PL123".to_string(),
                resource_id: ResourceId {
                    kind: "youtube#video",
                    video_id,
                },
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "snippet": {
                    "playlistId": "PL123",
                    "resourceId": {"kind": "youtube#video", "videoId": "dQw4w9WgXcQ"}
                }
            })
        );
    }
}
