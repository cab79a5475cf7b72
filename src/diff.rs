//! Side-by-side comparison of a local album against a MusicBrainz release.
//!
//! Left column is local, right column is MusicBrainz. A line that is
//! identical on both sides is printed once with a `==` marker; anything else
//! is printed as `left | right`. Comparison is literal on NFC-composed text,
//! so punctuation variants like `'` vs `’` show up as differences.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashSet;

use crate::models::{LocalAlbum, LocalTrack, RemoteRelease, RemoteTrack};
use crate::normalize::compose;

pub const DEFAULT_COLUMN_WIDTH: usize = 60;

const UNKNOWN_LOCAL_ARTIST: &str = "Unknown Local Artist";
const UNKNOWN_LOCAL_ALBUM: &str = "Unknown Local Album";
const NO_LOCAL_TRACK: &str = "(No local track)";
const NO_REMOTE_TRACK: &str = "(No MB track)";
const NO_RECORDING_URI: &str = "(no MB URI)";
const MATCH_MARKER: &str = "          == ";

static URL: Lazy<Regex> = Lazy::new(|| Regex::new(r#"https?://[^\s<>"\]\)]+"#).unwrap());

#[derive(Debug, Clone, Copy)]
pub struct DiffOptions {
    pub column_width: usize,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            column_width: DEFAULT_COLUMN_WIDTH,
        }
    }
}

impl DiffOptions {
    fn rule_width(&self) -> usize {
        self.column_width * 2
    }
}

/// One aligned row of the track comparison.
#[derive(Debug, Clone, Copy)]
pub struct TrackRow<'a> {
    pub track_number: u32,
    pub local: Option<&'a LocalTrack>,
    pub remote: Option<&'a RemoteTrack>,
}

impl TrackRow<'_> {
    /// Both sides present and title or artist differ.
    pub fn has_differences(&self) -> bool {
        match (self.local, self.remote) {
            (Some(l), Some(r)) => {
                !same_text(&l.title, &r.title) || !same_text(&l.artist, &r.artist)
            }
            _ => false,
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiffSummary {
    pub aligned: usize,
    pub with_differences: usize,
    pub local_only: usize,
    pub remote_only: usize,
}

fn same_text(a: &str, b: &str) -> bool {
    compose(a) == compose(b)
}

// ============================================================================
// Alignment
// ============================================================================

/// Pair local and remote tracks by track number.
///
/// A local track whose number was already taken by an earlier local track
/// becomes a local-only row; same for remote duplicates. Rows are ordered by
/// track number, local files keeping their scan order within a number.
pub fn align_tracks<'a>(local: &'a [LocalTrack], remote: &'a [RemoteTrack]) -> Vec<TrackRow<'a>> {
    let mut by_number: BTreeMap<u32, Vec<TrackRow<'a>>> = BTreeMap::new();

    for track in local {
        let rows = by_number.entry(track.track_number).or_default();
        rows.push(TrackRow {
            track_number: track.track_number,
            local: Some(track),
            remote: None,
        });
    }

    for track in remote {
        let rows = by_number.entry(track.track_number).or_default();
        // Only the first local track with this number gets a partner
        match rows.first_mut() {
            Some(row) if row.local.is_some() && row.remote.is_none() => row.remote = Some(track),
            _ => rows.push(TrackRow {
                track_number: track.track_number,
                local: None,
                remote: Some(track),
            }),
        }
    }

    by_number.into_values().flatten().collect()
}

pub fn summarize(rows: &[TrackRow<'_>]) -> DiffSummary {
    let mut summary = DiffSummary::default();
    for row in rows {
        match (row.local, row.remote) {
            (Some(_), Some(_)) => {
                summary.aligned += 1;
                if row.has_differences() {
                    summary.with_differences += 1;
                }
            }
            (Some(_), None) => summary.local_only += 1,
            (None, Some(_)) => summary.remote_only += 1,
            (None, None) => {}
        }
    }
    summary
}

// ============================================================================
// Annotation Links
// ============================================================================

/// URLs from the release annotation that look like download links: either
/// the URL itself mentions "download" or it sits on a line that does.
pub fn download_links(annotation: &str) -> Vec<String> {
    let mut seen = FxHashSet::default();
    let mut links = Vec::new();
    for line in annotation.lines() {
        let line_mentions = line.to_lowercase().contains("download");
        for m in URL.find_iter(line) {
            let url = m.as_str().trim_end_matches(['.', ',', ';', ':']);
            if (line_mentions || url.to_lowercase().contains("download"))
                && seen.insert(url.to_string())
            {
                links.push(url.to_string());
            }
        }
    }
    links
}

// ============================================================================
// Rendering
// ============================================================================

/// Merge two columns line by line. Non-blank identical lines collapse into a
/// single `==` line.
pub fn side_by_side(left: &[String], right: &[String], width: usize) -> Vec<String> {
    let max_len = left.len().max(right.len());
    let mut output = Vec::with_capacity(max_len);

    for i in 0..max_len {
        let l = left.get(i).map(String::as_str).unwrap_or("");
        let r = right.get(i).map(String::as_str).unwrap_or("");

        if !l.trim().is_empty() && same_text(l, r) {
            output.push(format!("{}{}", MATCH_MARKER, l));
        } else {
            output.push(format!("{:<width$} | {}", l, r, width = width));
        }
    }

    output
}

fn release_lines(album: &LocalAlbum, release: &RemoteRelease) -> (Vec<String>, Vec<String>) {
    let local_artist = album.artist.as_deref().unwrap_or(UNKNOWN_LOCAL_ARTIST);
    let local_album = if album.album.is_empty() {
        UNKNOWN_LOCAL_ALBUM
    } else {
        album.album.as_str()
    };
    let left = vec![
        format!("Artist: {}", local_artist),
        format!("Album:  {}", local_album),
        format!("Tracks: {}", album.track_count()),
    ];

    let mut right = vec![
        format!("Artist: {}", release.artist),
        format!("Album:  {}", release.title),
        format!("Tracks: {}", release.track_count),
        format!("MB Release URI: {}", release.uri),
    ];
    for link in &release.links {
        right.push(format!(" - {}: {}", link.kind, link.target));
    }
    if let Some(annotation) = release.annotation.as_deref() {
        for url in download_links(annotation) {
            right.push(format!(" - download (annotation): {}", url));
        }
    }

    (left, right)
}

fn local_lines(track: Option<&LocalTrack>) -> Vec<String> {
    match track {
        Some(t) => vec![
            format!("File:    {}", t.display_path()),
            format!("Track#:  {}", t.track_number),
            format!("Title:   {}", t.title),
            format!("Artist:  {}", t.artist),
        ],
        None => vec![NO_LOCAL_TRACK.to_string(), String::new(), String::new(), String::new()],
    }
}

fn remote_lines(track: Option<&RemoteTrack>) -> Vec<String> {
    match track {
        Some(t) => vec![
            format!("URI:     {}", t.recording_uri.as_deref().unwrap_or(NO_RECORDING_URI)),
            format!("Track#:  {}", t.track_number),
            format!("Title:   {}", t.title),
            format!("Artist:  {}", t.artist),
        ],
        None => vec![NO_REMOTE_TRACK.to_string(), String::new(), String::new(), String::new()],
    }
}

/// Render the full comparison. Pure: same inputs, same output.
pub fn render_diff(album: &LocalAlbum, release: &RemoteRelease, opts: DiffOptions) -> String {
    let width = opts.column_width;
    let heavy = "=".repeat(opts.rule_width());
    let light = "-".repeat(opts.rule_width());

    let mut output = vec![heavy.clone(), "RELEASE-LEVEL COMPARISON".to_string(), heavy.clone()];
    let (left, right) = release_lines(album, release);
    output.extend(side_by_side(&left, &right, width));

    output.push(String::new());
    output.push(heavy.clone());
    output.push("TRACK-BY-TRACK COMPARISON".to_string());
    output.push(heavy.clone());

    let rows = align_tracks(&album.tracks, &release.recordings);
    for row in &rows {
        let chunk = side_by_side(&local_lines(row.local), &remote_lines(row.remote), width);
        output.extend(chunk);
        output.push(light.clone());
    }

    let summary = summarize(&rows);
    output.push(format!(
        "Summary: {} aligned, {} with differences, {} local-only, {} remote-only",
        summary.aligned, summary.with_differences, summary.local_only, summary.remote_only
    ));

    output.join("\n")
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReleaseLink;
    use crate::scan::{assign_track_numbers, ScannedFile};

    fn local(n: u32, title: &str, artist: &str) -> LocalTrack {
        LocalTrack {
            track_number: n,
            title: title.to_string(),
            artist: artist.to_string(),
            filename: format!("{:02} - {}.mp3", n, title),
            subdir: String::new(),
        }
    }

    fn remote(n: u32, title: &str, artist: &str) -> RemoteTrack {
        RemoteTrack {
            track_number: n,
            title: title.to_string(),
            artist: artist.to_string(),
            recording_uri: Some(RemoteRelease::recording_uri(&format!("rec-{}", n))),
        }
    }

    fn release(recordings: Vec<RemoteTrack>) -> RemoteRelease {
        RemoteRelease {
            mbid: "rel-1".to_string(),
            title: "Album".to_string(),
            artist: "Artist".to_string(),
            track_count: recordings.len() as u32,
            uri: RemoteRelease::release_uri("rel-1"),
            annotation: None,
            links: Vec::new(),
            recordings,
        }
    }

    fn album(tracks: Vec<LocalTrack>) -> LocalAlbum {
        LocalAlbum {
            artist: Some("Artist".to_string()),
            album: "Album".to_string(),
            tracks,
        }
    }

    #[test]
    fn test_identical_fields_render_once() {
        let a = album(vec![local(1, "Song", "Artist")]);
        let r = release(vec![remote(1, "Song", "Artist")]);
        let text = render_diff(&a, &r, DiffOptions::default());
        assert!(text.contains("          == Title:   Song"));
        assert!(text.contains("          == Artist:  Artist"));
        assert_eq!(text.matches("Title:   Song").count(), 1);
    }

    #[test]
    fn test_curly_apostrophe_is_a_difference() {
        let a = album(vec![local(1, "Don't Stop", "Artist")]);
        let r = release(vec![remote(1, "Don\u{2019}t Stop", "Artist")]);
        let text = render_diff(&a, &r, DiffOptions::default());
        assert!(text.contains("Title:   Don't Stop"));
        assert!(text.contains("Title:   Don\u{2019}t Stop"));
        assert!(!text.contains("== Title:"));
        assert!(text.contains("1 with differences"));
    }

    #[test]
    fn test_case_difference_is_a_difference() {
        let a = album(vec![local(1, "song", "Artist")]);
        let r = release(vec![remote(1, "Song", "Artist")]);
        let rows = align_tracks(&a.tracks, &r.recordings);
        assert!(rows[0].has_differences());
    }

    #[test]
    fn test_canonically_equivalent_text_matches() {
        let a = album(vec![local(1, "Cafe\u{0301}", "Artist")]);
        let r = release(vec![remote(1, "Caf\u{00E9}", "Artist")]);
        let text = render_diff(&a, &r, DiffOptions::default());
        assert!(text.contains("== Title:"));
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let a = album(vec![local(1, "One", "X"), local(3, "Three", "Y")]);
        let r = release(vec![remote(1, "One!", "X"), remote(2, "Two", "X")]);
        let first = render_diff(&a, &r, DiffOptions::default());
        let second = render_diff(&a, &r, DiffOptions::default());
        assert_eq!(first, second);
    }

    #[test]
    fn test_alignment_by_number_with_gaps() {
        let a = album(vec![local(1, "One", "X"), local(3, "Three", "X")]);
        let r = release(vec![
            remote(1, "One", "X"),
            remote(2, "Two", "X"),
            remote(3, "Three", "X"),
        ]);
        let rows = align_tracks(&a.tracks, &r.recordings);
        assert_eq!(rows.len(), 3);
        assert!(rows[1].local.is_none());
        assert_eq!(rows[1].remote.map(|t| t.title.as_str()), Some("Two"));
        assert_eq!(rows[2].local.map(|t| t.title.as_str()), Some("Three"));
        assert_eq!(rows[2].remote.map(|t| t.title.as_str()), Some("Three"));

        let summary = summarize(&rows);
        assert_eq!(
            summary,
            DiffSummary {
                aligned: 2,
                with_differences: 0,
                local_only: 0,
                remote_only: 1,
            }
        );
    }

    #[test]
    fn test_placeholders_for_unmatched_tracks() {
        let a = album(vec![local(5, "Bonus", "X")]);
        let r = release(vec![remote(1, "One", "X")]);
        let text = render_diff(&a, &r, DiffOptions::default());
        assert!(text.contains(NO_LOCAL_TRACK));
        assert!(text.contains(NO_REMOTE_TRACK));
    }

    #[test]
    fn test_duplicate_local_numbers_become_local_only() {
        let a = album(vec![local(1, "One", "X"), local(1, "One (Bonus)", "X")]);
        let r = release(vec![remote(1, "One", "X")]);
        let rows = align_tracks(&a.tracks, &r.recordings);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].remote.is_some());
        assert!(rows[1].remote.is_none());
        assert_eq!(rows[1].local.map(|t| t.title.as_str()), Some("One (Bonus)"));
    }

    #[test]
    fn test_bonus_folder_aligns_with_continuous_remote_numbers() {
        let scanned = |subdir: &str, n: u32, title: &str| ScannedFile {
            number: Some(n),
            title: title.to_string(),
            artist: "Artist".to_string(),
            filename: format!("{:02} - {}.mp3", n, title),
            subdir: subdir.to_string(),
        };
        let tracks = assign_track_numbers(vec![
            scanned("", 1, "One"),
            scanned("", 2, "Two"),
            scanned("", 3, "Three"),
            scanned("Bonus Tracks", 1, "Four"),
            scanned("Bonus Tracks", 2, "Five"),
        ]);
        let r = release(
            ["One", "Two", "Three", "Four", "Five"]
                .iter()
                .zip(1..)
                .map(|(title, n)| remote(n, title, "Artist"))
                .collect(),
        );

        let text = render_diff(&album(tracks), &r, DiffOptions::default());
        assert!(text
            .contains("Summary: 5 aligned, 0 with differences, 0 local-only, 0 remote-only"));
        assert!(text.contains("File:    Bonus Tracks/01 - Four.mp3"));
    }

    #[test]
    fn test_release_header() {
        let a = LocalAlbum {
            artist: None,
            album: "Album".to_string(),
            tracks: Vec::new(),
        };
        let mut r = release(Vec::new());
        r.links.push(ReleaseLink {
            kind: "discogs".to_string(),
            target: "https://www.discogs.com/release/1".to_string(),
        });
        r.annotation = Some(
            "Free download: https://example.org/get.zip.\nOther: https://example.org/info"
                .to_string(),
        );
        let text = render_diff(&a, &r, DiffOptions::default());
        assert!(text.contains("Artist: Unknown Local Artist"));
        assert!(text.contains("== Album:  Album"));
        assert!(text.contains("MB Release URI: https://musicbrainz.org/release/rel-1"));
        assert!(text.contains(" - discogs: https://www.discogs.com/release/1"));
        assert!(text.contains(" - download (annotation): https://example.org/get.zip"));
        assert!(!text.contains("https://example.org/info"));
    }

    #[test]
    fn test_download_links() {
        let links = download_links(concat!(
            "See https://example.org/downloads/album for files\n",
            "https://example.org/plain\n",
            "Download at https://a.example/x, or https://a.example/x",
        ));
        assert_eq!(
            links,
            vec![
                "https://example.org/downloads/album".to_string(),
                "https://a.example/x".to_string(),
            ]
        );
    }

    #[test]
    fn test_side_by_side_pads_left_column() {
        let out = side_by_side(&["a".to_string()], &["b".to_string()], 5);
        assert_eq!(out, vec!["a     | b".to_string()]);
    }

    #[test]
    fn test_blank_lines_never_collapse() {
        let out = side_by_side(&[String::new()], &[String::new()], 3);
        assert_eq!(out, vec!["    | ".to_string()]);
    }

    #[test]
    fn test_rule_width_follows_column_width() {
        let a = album(vec![local(1, "One", "X")]);
        let r = release(vec![remote(1, "One", "X")]);
        let text = render_diff(&a, &r, DiffOptions { column_width: 10 });
        assert!(text.lines().any(|l| l == "=".repeat(20)));
        assert!(text.lines().any(|l| l == "-".repeat(20)));
    }
}
