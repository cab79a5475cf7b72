//! Local album scanning: find audio files, read their tags, fill gaps from
//! file names.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use lofty::error::LoftyError;
use lofty::prelude::{ItemKey, TaggedFileExt};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

use crate::models::LocalTrack;
use crate::normalize::{leading_track_number, title_from_stem};
use crate::progress::tag_progress;

pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "wav", "m4a", "ogg"];

#[derive(Debug, Error)]
pub enum TagError {
    #[error(transparent)]
    Lofty(#[from] LoftyError),
    #[error("{0}")]
    Unreadable(String),
}

/// Tag fields the scanner cares about. Any of them may be missing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TagData {
    pub track_number: Option<u32>,
    pub title: Option<String>,
    pub artist: Option<String>,
}

/// Reads embedded tags from one file. An `Err` means the file is unusable.
pub trait TagReader {
    fn read(&self, path: &Path) -> Result<TagData, TagError>;
}

/// Tag reader backed by `lofty` (ID3v2, Vorbis comments, MP4 atoms, ...).
#[derive(Debug, Default, Clone, Copy)]
pub struct LoftyTagReader;

impl TagReader for LoftyTagReader {
    fn read(&self, path: &Path) -> Result<TagData, TagError> {
        let tagged_file = lofty::read_from_path(path)?;
        let mut data = TagData::default();

        if let Some(tag) = tagged_file.primary_tag().or_else(|| tagged_file.first_tag()) {
            data.title = tag.get_string(&ItemKey::TrackTitle).and_then(non_blank);
            let track_artist = tag.get_string(&ItemKey::TrackArtist).and_then(non_blank);
            let album_artist = tag.get_string(&ItemKey::AlbumArtist).and_then(non_blank);
            data.artist = track_artist.or(album_artist);
            data.track_number = tag.get_string(&ItemKey::TrackNumber).and_then(parse_track_number);
        }

        Ok(data)
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// "7/12" → 7, " 03 " → 3. Zero is not a track number.
pub fn parse_track_number(text: &str) -> Option<u32> {
    let head = text.split('/').next().unwrap_or(text).trim();
    head.parse().ok().filter(|n| *n > 0)
}

// ============================================================================
// Directory Walk
// ============================================================================

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.as_str()))
}

/// All audio files under `root`, recursively, hidden entries skipped,
/// sorted by name within each directory.
pub fn find_audio_files(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_hidden(entry))
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!(error = %err, "skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_audio_file(entry.path()))
        .map(DirEntry::into_path)
        .collect()
}

// ============================================================================
// Scanning
// ============================================================================

/// A file the scanner had to leave out, with the reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default, Clone)]
pub struct ScanReport {
    pub tracks: Vec<LocalTrack>,
    pub skipped: Vec<SkippedFile>,
}

/// A readable file before album-wide numbering. `number` is the tagged or
/// file-name track number, when there is one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub number: Option<u32>,
    pub title: String,
    pub artist: String,
    pub filename: String,
    pub subdir: String,
}

/// Build a `LocalTrack` per audio file under `root`.
///
/// `fallback_artist` fills in files without an artist tag. Only files whose
/// tags cannot be read are skipped; see `assign_track_numbers` for files
/// without a number.
pub fn scan_directory<R: TagReader + ?Sized>(
    root: &Path,
    fallback_artist: Option<&str>,
    reader: &R,
) -> ScanReport {
    let mut report = ScanReport::default();
    let files = find_audio_files(root);
    let pb = tag_progress(files.len() as u64);

    let mut scanned = Vec::with_capacity(files.len());
    for path in files {
        match scan_file(root, &path, fallback_artist, reader) {
            Ok(file) => scanned.push(file),
            Err(reason) => {
                pb.suspend(|| tracing::warn!(path = %path.display(), %reason, "skipping file"));
                report.skipped.push(SkippedFile { path, reason });
            }
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    report.tracks = assign_track_numbers(scanned);
    report
}

/// Give every file its album-wide track number, ordered by `(subdir, number)`.
///
/// Folders are numbered in path order, top level first. Within a folder,
/// files without a number follow the highest number in that folder, in scan
/// order. A folder whose numbers restart (a "Bonus Tracks" folder starting
/// at 1) is shifted to continue after the highest number already used, so
/// the album counts straight through like a multi-disc release.
pub fn assign_track_numbers(files: Vec<ScannedFile>) -> Vec<LocalTrack> {
    let mut by_subdir: BTreeMap<String, Vec<ScannedFile>> = BTreeMap::new();
    for file in files {
        by_subdir.entry(file.subdir.clone()).or_default().push(file);
    }

    let mut tracks = Vec::new();
    let mut highest = 0u32;

    for (subdir, files) in by_subdir {
        let mut next = files.iter().filter_map(|f| f.number).max().unwrap_or(0);
        let mut group: Vec<(u32, ScannedFile)> = files
            .into_iter()
            .map(|file| match file.number {
                Some(n) => (n, file),
                None => {
                    next += 1;
                    tracing::debug!(file = %file.filename, number = next, "no track number");
                    (next, file)
                }
            })
            .collect();
        // Stable, so equal numbers keep scan order
        group.sort_by_key(|(n, _)| *n);

        let lowest = group.first().map_or(1, |(n, _)| *n);
        let offset = if lowest <= highest { highest - lowest + 1 } else { 0 };
        if offset > 0 {
            tracing::debug!(subdir = %subdir, offset, "folder restarts numbering, continuing");
        }

        for (number, file) in group {
            let track_number = number.saturating_add(offset);
            highest = highest.max(track_number);
            tracks.push(LocalTrack {
                track_number,
                title: file.title,
                artist: file.artist,
                filename: file.filename,
                subdir: file.subdir,
            });
        }
    }

    tracks
}

fn scan_file<R: TagReader + ?Sized>(
    root: &Path,
    path: &Path,
    fallback_artist: Option<&str>,
    reader: &R,
) -> Result<ScannedFile, String> {
    let tags = reader.read(path).map_err(|e| format!("unreadable tags: {}", e))?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let number = tags.track_number.or_else(|| leading_track_number(&stem));
    let title = tags.title.unwrap_or_else(|| title_from_stem(&stem));
    let artist = tags
        .artist
        .or_else(|| fallback_artist.map(str::to_string))
        .unwrap_or_default();

    let subdir = path
        .parent()
        .and_then(|parent| parent.strip_prefix(root).ok())
        .map(|rel| rel.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(ScannedFile {
        number,
        title,
        artist,
        filename,
        subdir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    /// Reader answering from a table keyed by file name; unknown files fail.
    struct FakeReader(HashMap<String, TagData>);

    impl TagReader for FakeReader {
        fn read(&self, path: &Path) -> Result<TagData, TagError> {
            let name = path.file_name().unwrap().to_string_lossy().into_owned();
            self.0
                .get(&name)
                .cloned()
                .ok_or_else(|| TagError::Unreadable(format!("no fixture for {}", name)))
        }
    }

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    fn tags(n: Option<u32>, title: Option<&str>, artist: Option<&str>) -> TagData {
        TagData {
            track_number: n,
            title: title.map(str::to_string),
            artist: artist.map(str::to_string),
        }
    }

    #[test]
    fn test_parse_track_number() {
        assert_eq!(parse_track_number("7/12"), Some(7));
        assert_eq!(parse_track_number(" 03 "), Some(3));
        assert_eq!(parse_track_number("0"), None);
        assert_eq!(parse_track_number("A1"), None);
    }

    #[test]
    fn test_is_audio_file() {
        assert!(is_audio_file(Path::new("a/01 - x.MP3")));
        assert!(is_audio_file(Path::new("x.flac")));
        assert!(!is_audio_file(Path::new("cover.jpg")));
        assert!(!is_audio_file(Path::new("noext")));
    }

    #[test]
    fn test_find_audio_files_skips_hidden_and_non_audio() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("02 - b.mp3"));
        touch(&root.join("01 - a.flac"));
        touch(&root.join("cover.jpg"));
        touch(&root.join(".hidden.mp3"));
        touch(&root.join(".cache/03 - c.mp3"));
        touch(&root.join("Bonus Tracks/01 - bonus.ogg"));

        let files: Vec<String> = find_audio_files(root)
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(files.len(), 3);
        assert!(files.contains(&"01 - a.flac".to_string()));
        assert!(files.contains(&"02 - b.mp3".to_string()));
        assert!(files.iter().any(|f| f.ends_with("01 - bonus.ogg")));
    }

    #[test]
    fn test_scan_directory_uses_tags_and_fallbacks() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("01 - Intro.mp3"));
        touch(&root.join("02 - Second Song.mp3"));
        touch(&root.join("Broken.mp3"));
        touch(&root.join("no number.mp3"));

        let mut table = HashMap::new();
        table.insert(
            "01 - Intro.mp3".to_string(),
            tags(Some(1), Some("Intro (Tagged)"), Some("Tag Artist")),
        );
        table.insert("02 - Second Song.mp3".to_string(), tags(None, None, None));
        table.insert("no number.mp3".to_string(), tags(None, Some("Orphan"), None));
        let reader = FakeReader(table);

        let report = scan_directory(root, Some("Dir Artist"), &reader);

        assert_eq!(report.tracks.len(), 3);
        assert_eq!(report.tracks[0].track_number, 1);
        assert_eq!(report.tracks[0].title, "Intro (Tagged)");
        assert_eq!(report.tracks[0].artist, "Tag Artist");
        assert_eq!(report.tracks[1].track_number, 2);
        assert_eq!(report.tracks[1].title, "Second Song");
        assert_eq!(report.tracks[1].artist, "Dir Artist");
        assert_eq!(report.tracks[2].track_number, 3);
        assert_eq!(report.tracks[2].title, "Orphan");

        assert_eq!(report.skipped.len(), 1);
        assert!(report.skipped[0].reason.starts_with("unreadable tags"));
        assert!(report.skipped[0].path.ends_with("Broken.mp3"));
    }

    #[test]
    fn test_scan_directory_keeps_files_without_any_number() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        let mut table = HashMap::new();
        for title in ["Alpha", "Beta", "Gamma"] {
            touch(&root.join(format!("{}.mp3", title)));
            table.insert(format!("{}.mp3", title), tags(None, Some(title), None));
        }

        let report = scan_directory(root, None, &FakeReader(table));

        assert!(report.skipped.is_empty());
        let numbered: Vec<(u32, &str)> = report
            .tracks
            .iter()
            .map(|t| (t.track_number, t.title.as_str()))
            .collect();
        assert_eq!(numbered, vec![(1, "Alpha"), (2, "Beta"), (3, "Gamma")]);
    }

    #[test]
    fn test_scan_directory_records_subdir_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(&root.join("Bonus Tracks/01 - Extra.mp3"));
        touch(&root.join("10 - Ten.mp3"));
        touch(&root.join("09 - Nine.mp3"));

        let mut table = HashMap::new();
        for name in ["01 - Extra.mp3", "10 - Ten.mp3", "09 - Nine.mp3"] {
            table.insert(name.to_string(), TagData::default());
        }
        let report = scan_directory(root, None, &FakeReader(table));

        let order: Vec<(String, u32)> = report
            .tracks
            .iter()
            .map(|t| (t.subdir.clone(), t.track_number))
            .collect();
        assert_eq!(
            order,
            vec![
                (String::new(), 9),
                (String::new(), 10),
                ("Bonus Tracks".to_string(), 11),
            ]
        );
        assert_eq!(report.tracks[2].display_path(), "Bonus Tracks/01 - Extra.mp3");
        assert_eq!(report.tracks[0].artist, "");
    }

    fn scanned(subdir: &str, number: Option<u32>, title: &str) -> ScannedFile {
        ScannedFile {
            number,
            title: title.to_string(),
            artist: String::new(),
            filename: format!("{}.mp3", title),
            subdir: subdir.to_string(),
        }
    }

    #[test]
    fn test_assign_track_numbers_continues_restarted_folders() {
        let tracks = assign_track_numbers(vec![
            scanned("Bonus Tracks", Some(2), "Bonus B"),
            scanned("", Some(1), "One"),
            scanned("Bonus Tracks", Some(1), "Bonus A"),
            scanned("", Some(3), "Three"),
            scanned("", Some(2), "Two"),
        ]);
        let numbered: Vec<(u32, &str)> = tracks
            .iter()
            .map(|t| (t.track_number, t.title.as_str()))
            .collect();
        assert_eq!(
            numbered,
            vec![(1, "One"), (2, "Two"), (3, "Three"), (4, "Bonus A"), (5, "Bonus B")]
        );
        assert_eq!(tracks[3].subdir, "Bonus Tracks");
    }

    #[test]
    fn test_assign_track_numbers_keeps_continuing_folders() {
        let tracks = assign_track_numbers(vec![
            scanned("CD1", Some(1), "A"),
            scanned("CD1", Some(2), "B"),
            scanned("CD2", Some(3), "C"),
            scanned("CD2", None, "D"),
        ]);
        let numbers: Vec<u32> = tracks.iter().map(|t| t.track_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_assign_track_numbers_unnumbered_follow_numbered() {
        let tracks = assign_track_numbers(vec![
            scanned("", None, "Loose"),
            scanned("", Some(2), "Two"),
            scanned("", Some(1), "One"),
        ]);
        let numbered: Vec<(u32, &str)> = tracks
            .iter()
            .map(|t| (t.track_number, t.title.as_str()))
            .collect();
        assert_eq!(numbered, vec![(1, "One"), (2, "Two"), (3, "Loose")]);
    }

    #[test]
    fn test_lofty_reader_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("01 - fake.mp3");
        fs::write(&path, b"definitely not audio").unwrap();
        assert!(LoftyTagReader.read(&path).is_err());
    }
}
