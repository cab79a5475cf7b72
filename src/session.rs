//! One interactive run: search, rank, pick, look up, render.

use std::io::{BufRead, Write};
use std::time::Instant;

use anyhow::{Context, Result};

use crate::diff::{render_diff, DiffOptions};
use crate::models::{LocalAlbum, Selection, SessionOutcome};
use crate::musicbrainz::{Catalog, ReleaseQuery, DEFAULT_SEARCH_LIMIT};
use crate::progress::{catalog_spinner, format_duration};
use crate::prompt::{confirm, prompt_selection, write_menu};
use crate::scoring::rank_candidates;
use crate::submit::{submission_url, Browser};

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub search_limit: u32,
    pub diff: DiffOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            search_limit: DEFAULT_SEARCH_LIMIT,
            diff: DiffOptions::default(),
        }
    }
}

/// Run the candidate matcher and diff renderer against `catalog`.
///
/// Menu, prompts and the diff go to `out`; answers are read from `input`.
/// Cancelling at the prompt performs no further catalog calls.
pub fn run_session<C, B, R, W>(
    config: &SessionConfig,
    album: &LocalAlbum,
    catalog: &C,
    browser: &B,
    input: &mut R,
    out: &mut W,
) -> Result<SessionOutcome>
where
    C: Catalog + ?Sized,
    B: Browser + ?Sized,
    R: BufRead,
    W: Write,
{
    let query = ReleaseQuery {
        album: album.album.clone(),
        artist: album.artist.clone(),
        limit: config.search_limit,
    };

    let started = Instant::now();
    let spinner = catalog_spinner(&format!("Searching MusicBrainz for '{}'", album.album));
    let found = catalog.search_releases(&query);
    spinner.finish_and_clear();
    let releases =
        found.with_context(|| format!("MusicBrainz search for '{}' failed", album.album))?;
    tracing::info!(
        results = releases.len(),
        elapsed = %format_duration(started.elapsed()),
        "search finished"
    );

    let candidates = rank_candidates(album, &releases);
    if candidates.is_empty() {
        writeln!(out, "No matches for '{}' on MusicBrainz.", album.album)?;
        offer_submission(album, browser, input, out)?;
        return Ok(SessionOutcome::NoMatches);
    }

    tracing::info!(
        offered = candidates.len(),
        delta = candidates[0].track_count_delta,
        local_tracks = album.track_count(),
        "ranked candidates"
    );

    write_menu(out, &candidates)?;
    let chosen = match prompt_selection(input, out, candidates.len())? {
        Selection::Chosen(idx) => &candidates[idx],
        Selection::Cancel | Selection::Invalid(_) => {
            writeln!(out, "Cancelled; nothing looked up.")?;
            return Ok(SessionOutcome::Cancelled);
        }
    };

    let mbid = chosen.release.mbid.as_str();
    let spinner = catalog_spinner(&format!("Fetching release {}", mbid));
    let looked_up = catalog.lookup_release(mbid);
    spinner.finish_and_clear();
    let release =
        looked_up.with_context(|| format!("MusicBrainz lookup of release {} failed", mbid))?;

    writeln!(out, "{}", render_diff(album, &release, config.diff))?;
    out.flush()?;
    Ok(SessionOutcome::Rendered)
}

fn offer_submission<B, R, W>(
    album: &LocalAlbum,
    browser: &B,
    input: &mut R,
    out: &mut W,
) -> Result<()>
where
    B: Browser + ?Sized,
    R: BufRead,
    W: Write,
{
    if album.tracks.is_empty() {
        return Ok(());
    }
    let question = "Open the MusicBrainz release editor pre-filled with the local tracks?";
    if confirm(input, out, question)? {
        let url = submission_url(album).context("Failed to build release editor URL")?;
        writeln!(out, "Opening {}", url)?;
        browser.open(&url);
    }
    Ok(())
}
