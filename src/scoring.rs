//! Candidate scoring for MusicBrainz release search results.
//!
//! The ranking signal is the track-count delta alone. Title and artist
//! similarity are computed for display so the user can tell near-identical
//! candidates apart, but they never change which candidates are offered or
//! their order.

use rustc_hash::FxHashSet;

use crate::models::{CandidateScore, LocalAlbum, RemoteRelease};
use crate::normalize::{normalize_artist, normalize_title};

// ============================================================================
// Track Count
// ============================================================================

/// |local track count − release track count|
pub fn track_count_delta(local_count: usize, release: &RemoteRelease) -> u32 {
    let local = u32::try_from(local_count).unwrap_or(u32::MAX);
    local.abs_diff(release.track_count)
}

// ============================================================================
// Similarity
// ============================================================================

/// Similarity between two normalized release titles (0.0 to 1.0).
pub fn compute_title_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    strsim::normalized_levenshtein(a, b)
}

/// Similarity between two normalized artist names (0.0 to 1.0).
/// Uses Jaccard similarity on word tokens.
pub fn compute_artist_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }

    let tokens_a: FxHashSet<&str> = a.split_whitespace().collect();
    let tokens_b: FxHashSet<&str> = b.split_whitespace().collect();

    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();

    intersection as f64 / union as f64
}

/// Score a single release against the local album.
pub fn score_candidate(album: &LocalAlbum, release: &RemoteRelease) -> CandidateScore {
    let title_similarity =
        compute_title_similarity(&normalize_title(&album.album), &normalize_title(&release.title));

    // Unknown local artist: nothing to compare against
    let artist_similarity = match album.artist.as_deref() {
        Some(local) => {
            compute_artist_similarity(&normalize_artist(local), &normalize_artist(&release.artist))
        }
        None => 0.0,
    };

    CandidateScore {
        release: release.clone(),
        track_count_delta: track_count_delta(album.track_count(), release),
        title_similarity,
        artist_similarity,
    }
}

// ============================================================================
// Ranking
// ============================================================================

/// Keep exactly the candidates sharing the minimal track-count delta, in the
/// order the catalog returned them.
pub fn rank_candidates(album: &LocalAlbum, releases: &[RemoteRelease]) -> Vec<CandidateScore> {
    let scored: Vec<CandidateScore> = releases
        .iter()
        .map(|release| score_candidate(album, release))
        .collect();

    let Some(best) = scored.iter().map(|c| c.track_count_delta).min() else {
        return Vec::new();
    };

    scored
        .into_iter()
        .filter(|c| c.track_count_delta == best)
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
