//! Core data models for local vs. MusicBrainz reconciliation.
//!
//! Everything here is built once per run and never mutated afterwards.

use std::fmt;

/// Base URL for human-facing MusicBrainz entity pages.
pub const MUSICBRAINZ_WEB: &str = "https://musicbrainz.org";

// ============================================================================
// Local Models
// ============================================================================

/// One audio file found under the album root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalTrack {
    pub track_number: u32,
    pub title: String,
    pub artist: String,
    pub filename: String,
    /// Directory relative to the album root ("" for top level, e.g. "Bonus Tracks")
    pub subdir: String,
}

impl LocalTrack {
    /// File name prefixed with its subdirectory, as shown in the diff.
    pub fn display_path(&self) -> String {
        if self.subdir.is_empty() {
            self.filename.clone()
        } else {
            format!("{}/{}", self.subdir, self.filename)
        }
    }
}

/// The local album: guessed release-level metadata plus its tracks.
#[derive(Clone, Debug, Default)]
pub struct LocalAlbum {
    pub artist: Option<String>,
    pub album: String,
    pub tracks: Vec<LocalTrack>,
}

impl LocalAlbum {
    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }
}

// ============================================================================
// Remote Models
// ============================================================================

/// URL relationship attached to a release (e.g. "discogs", "purchase for download").
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReleaseLink {
    pub kind: String,
    pub target: String,
}

/// Track on a MusicBrainz release. Numbers run continuously across media.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteTrack {
    pub track_number: u32,
    pub title: String,
    pub artist: String,
    pub recording_uri: Option<String>,
}

/// A MusicBrainz release.
///
/// Search results leave `recordings`, `annotation` and `links` empty; a full
/// lookup by MBID fills them in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RemoteRelease {
    pub mbid: String,
    pub title: String,
    pub artist: String,
    pub track_count: u32,
    pub uri: String,
    pub annotation: Option<String>,
    pub links: Vec<ReleaseLink>,
    pub recordings: Vec<RemoteTrack>,
}

impl RemoteRelease {
    pub fn release_uri(mbid: &str) -> String {
        format!("{}/release/{}", MUSICBRAINZ_WEB, mbid)
    }

    pub fn recording_uri(mbid: &str) -> String {
        format!("{}/recording/{}", MUSICBRAINZ_WEB, mbid)
    }
}

// ============================================================================
// Matching Models
// ============================================================================

/// A release candidate annotated with how well it fits the local album.
///
/// `track_count_delta` is the ranking signal; the similarities are shown to
/// the user but never reorder candidates.
#[derive(Clone, Debug)]
pub struct CandidateScore {
    pub release: RemoteRelease,
    pub track_count_delta: u32,
    pub title_similarity: f64,
    pub artist_similarity: f64,
}

/// Result of reading one line at the candidate prompt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    /// Zero-based index into the presented candidates
    Chosen(usize),
    Cancel,
    Invalid(String),
}

/// How an interactive session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionOutcome {
    Rendered,
    NoMatches,
    Cancelled,
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionOutcome::Rendered => "rendered",
            SessionOutcome::NoMatches => "no matches",
            SessionOutcome::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}
