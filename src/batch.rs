//! Batch insertion driver and run summary.
//!
//! Processes the deduplicated ID sequence strictly in order, one insertion
//! attempt per video, and folds every outcome into a [`RunSummary`]. A
//! failed insertion is data, not an error: the run keeps going, and partial
//! success is the expected common case.

use crate::video_url::VideoId;
use std::fmt;

/// How a single insertion attempt was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    /// The video was added to the playlist.
    Added,
    /// The remote reports the video is already in the playlist.
    AlreadyPresent,
    /// The video (or the playlist) does not exist or is not visible.
    NotFound,
    /// The authorized account may not modify the playlist, or the video is
    /// restricted in a way that blocks insertion.
    Forbidden,
    /// The API quota for the current period is exhausted.
    QuotaExceeded,
    /// A retriable server-side or network condition (5xx, timeout). Not
    /// retried in this version; surfaced so the user can re-run later.
    TransientError,
    /// Anything not classified above; the diagnostic carries the raw text.
    UnknownError,
}

impl OutcomeKind {
    /// Whether this outcome means the video ended up in the playlist.
    pub fn is_success(self) -> bool {
        matches!(self, OutcomeKind::Added | OutcomeKind::AlreadyPresent)
    }
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutcomeKind::Added => "added",
            OutcomeKind::AlreadyPresent => "already in playlist",
            OutcomeKind::NotFound => "not found",
            OutcomeKind::Forbidden => "forbidden",
            OutcomeKind::QuotaExceeded => "quota exceeded",
            OutcomeKind::TransientError => "transient error",
            OutcomeKind::UnknownError => "unknown error",
        })
    }
}

/// The result of one attempt to add a video to the playlist.
#[derive(Debug, Clone)]
pub struct InsertionOutcome {
    pub video_id: VideoId,
    pub kind: OutcomeKind,
    /// Raw diagnostic text from the remote, when there is any.
    pub detail: Option<String>,
}

/// Per-kind outcome tallies, maintained as outcomes are recorded.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OutcomeCounts {
    pub added: usize,
    pub already_present: usize,
    pub not_found: usize,
    pub forbidden: usize,
    pub quota_exceeded: usize,
    pub transient_error: usize,
    pub unknown_error: usize,
}

impl OutcomeCounts {
    fn bump(&mut self, kind: OutcomeKind) {
        *self.slot(kind) += 1;
    }

    fn slot(&mut self, kind: OutcomeKind) -> &mut usize {
        match kind {
            OutcomeKind::Added => &mut self.added,
            OutcomeKind::AlreadyPresent => &mut self.already_present,
            OutcomeKind::NotFound => &mut self.not_found,
            OutcomeKind::Forbidden => &mut self.forbidden,
            OutcomeKind::QuotaExceeded => &mut self.quota_exceeded,
            OutcomeKind::TransientError => &mut self.transient_error,
            OutcomeKind::UnknownError => &mut self.unknown_error,
        }
    }

    pub fn total(&self) -> usize {
        self.added
            + self.already_present
            + self.not_found
            + self.forbidden
            + self.quota_exceeded
            + self.transient_error
            + self.unknown_error
    }
}

/// Aggregate report for one run: every outcome in input order, per-kind
/// counts, and the input lines that never parsed.
///
/// The counts always agree with the outcome list, including mid-run; they
/// are updated in the same [`RunSummary::record`] call that stores the
/// outcome.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub outcomes: Vec<InsertionOutcome>,
    pub counts: OutcomeCounts,
    pub unparsable: Vec<String>,
}

impl RunSummary {
    pub fn new(unparsable: Vec<String>) -> Self {
        Self {
            unparsable,
            ..Self::default()
        }
    }

    pub fn record(&mut self, outcome: InsertionOutcome) {
        self.counts.bump(outcome.kind);
        self.outcomes.push(outcome);
    }

    /// Whether any attempt actually succeeded.
    pub fn any_success(&self) -> bool {
        self.counts.added + self.counts.already_present > 0
    }
}

/// Runs the insertion pipeline over `videos`, invoking `insert` once per ID,
/// strictly in sequence.
///
/// The inserter is injected as an async closure so the runner can be
/// exercised with a stub that never touches the network. No outcome halts
/// the run; fatal conditions (unreadable input, failed authorization) are
/// the caller's to raise before this function is ever reached.
pub async fn run_batch<F>(videos: &[VideoId], unparsable: Vec<String>, mut insert: F) -> RunSummary
where
    F: AsyncFnMut(&VideoId) -> InsertionOutcome,
{
    let mut summary = RunSummary::new(unparsable);
    for video_id in videos {
        tracing::info!(video_id = %video_id, "attempting insertion");
        let outcome = insert(video_id).await;
        match outcome.kind {
            OutcomeKind::Added => {
                tracing::info!(video_id = %video_id, "video added to playlist");
            }
            kind => {
                tracing::warn!(
                    video_id = %video_id,
                    outcome = %kind,
                    detail = outcome.detail.as_deref(),
                    "insertion did not add the video"
                );
            }
        }
        summary.record(outcome);
    }
    summary
}
