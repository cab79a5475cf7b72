//! Text normalization shared by the scanner, the matcher and the renderer.
//!
//! Two distinct flavours live here:
//! - fuzzy folding (`normalize_title`, `normalize_artist`) used only to score
//!   candidate similarity, which is allowed to throw information away;
//! - `compose`, the NFC composition used by the diff renderer. It never
//!   touches punctuation, so `'` and `’` remain different.

use any_ascii::any_ascii;
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

// ============================================================================
// REGEX PATTERNS
// ============================================================================

/// Release title cleanup patterns (applied in order).
pub static TITLE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        // Remaster variants: "- Remastered 2021", "(2021 Remaster)"
        Regex::new(r"(?i)\s*[-–—/]\s*(?:remaster(?:ed)?(?:\s+\d{4})?|(?:\d{4}\s+)?remaster(?:ed)?)").unwrap(),
        Regex::new(r"(?i)\s*[\(\[](?:remaster(?:ed)?(?:\s+\d{4})?|(?:\d{4}\s+)?remaster(?:ed)?)[\)\]]").unwrap(),
        // Edition variants: "(Deluxe Edition)", "[Super Deluxe]"
        Regex::new(r"(?i)\s*[\(\[](?:deluxe|super\s+deluxe|expanded|anniversary|bonus\s+track(?:s)?|special|collector'?s?)(?:\s+edition)?[\)\]]").unwrap(),
        // Disc/CD markers: "(Disc 1)", "[CD 2]"
        Regex::new(r"(?i)\s*[\(\[](?:disc|cd)\s*\d+[\)\]]").unwrap(),
        // Format tags that end up in folder names: "[FLAC]", "(320 kbps)", "[WEB]"
        Regex::new(r"(?i)\s*[\(\[](?:flac|mp3|web|cd|vinyl|\d{2,4}\s*kbps|24\s*bit[^)\]]*)[\)\]]").unwrap(),
        // Year suffix: "(1997)", "[2004]"
        Regex::new(r"\s*[\(\[]\d{4}[\)\]]\s*$").unwrap(),
    ]
});

/// Matches track number prefixes like "03 - ", "Track 5 - ", "01. ", etc.
pub static TRACK_NUMBER_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:track\s*)?(\d{1,4})\s*[-–—._]\s*").unwrap());

/// Matches track number prefix without separator: "16 Eleanor Rigby".
/// Only 1-2 digit numbers followed by an uppercase letter, to avoid
/// "1970 Somethin'".
pub static TRACK_NUMBER_SPACE_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(0[1-9]|[1-9]\d?)\s+([A-Z])").unwrap());

/// Matches track number in brackets: "[01] Song"
pub static TRACK_NUMBER_BRACKET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[(\d{1,2})\]\s*").unwrap());

/// "Artist - Album" directory names
pub static ARTIST_ALBUM_DIR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*?)\s*-\s*(.*)$").unwrap());

/// Artist cleanup patterns
pub static ARTIST_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"(?i)\s+(?:feat\.?|ft\.?|featuring)\s+.*").unwrap(),
    ]
});

/// Regex to collapse multiple whitespace into single space
pub static MULTI_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s{2,}").unwrap());

// ============================================================================
// HELPER FUNCTIONS
// ============================================================================

/// Check if a character is a Unicode combining mark (diacritical mark).
pub fn is_combining_mark(c: char) -> bool {
    matches!(c as u32, 0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0xFE20..=0xFE2F)
}

/// Fold Unicode text to lowercase ASCII by applying NFKD decomposition and
/// removing combining marks. e.g., "Beyoncé" → "beyonce"
pub fn fold_to_ascii(s: &str) -> String {
    let stripped: String = s.nfkd().filter(|c| !is_combining_mark(*c)).collect();
    any_ascii(&stripped).to_lowercase()
}

/// Straighten curly quotes and spell out "&". Fuzzy scoring only.
pub fn normalize_punctuation(s: &str) -> String {
    let result = s
        .replace(['\u{2018}', '\u{2019}'], "'")
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{00B4}', '\u{0060}'], "'")
        .replace(" & ", " and ");
    MULTI_SPACE.replace_all(&result, " ").to_string()
}

/// Canonical composition (NFC) for literal comparison.
///
/// "é" written as one code point and as "e" + U+0301 compose to the same
/// string. Punctuation is left exactly as it was.
pub fn compose(s: &str) -> String {
    s.nfc().collect()
}

// ============================================================================
// NORMALIZATION FUNCTIONS
// ============================================================================

/// Normalize a release title for similarity scoring.
pub fn normalize_title(title: &str) -> String {
    let mut result = normalize_punctuation(title);
    for pattern in TITLE_PATTERNS.iter() {
        result = pattern.replace_all(&result, "").to_string();
    }
    fold_to_ascii(&result).trim().to_string()
}

/// Normalize an artist name for similarity scoring.
/// Strips featured artists and handles "The" prefix/suffix.
pub fn normalize_artist(artist: &str) -> String {
    let mut result = normalize_punctuation(artist);
    for pattern in ARTIST_PATTERNS.iter() {
        result = pattern.replace_all(&result, "").to_string();
    }

    let mut normalized = fold_to_ascii(&result).trim().to_string();

    if let Some(rest) = normalized.strip_prefix("the ") {
        normalized = rest.to_string();
    }
    // "Scorpions, The" → "scorpions"
    if let Some(rest) = normalized.strip_suffix(", the") {
        normalized = rest.to_string();
    }

    normalized
}

// ============================================================================
// FILENAME PARSING
// ============================================================================

/// Leading track number of a file stem: "03 - Song" → 3, "[12] Song" → 12,
/// "16 Eleanor Rigby" → 16.
pub fn leading_track_number(stem: &str) -> Option<u32> {
    let stem = stem.trim();
    TRACK_NUMBER_BRACKET
        .captures(stem)
        .or_else(|| TRACK_NUMBER_PREFIX.captures(stem))
        .or_else(|| TRACK_NUMBER_SPACE_PREFIX.captures(stem))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
        .filter(|n| *n > 0)
}

/// Title derived from a file stem when the file carries no title tag.
/// Strips the track number prefix, keeps everything else verbatim.
pub fn title_from_stem(stem: &str) -> String {
    let mut result = stem.trim().to_string();
    result = TRACK_NUMBER_BRACKET.replace(&result, "").to_string();
    result = TRACK_NUMBER_PREFIX.replace(&result, "").to_string();
    // Keep the captured capital letter: "16 E" → "E"
    result = TRACK_NUMBER_SPACE_PREFIX.replace(&result, "$2").to_string();
    let trimmed = result.trim();
    if trimmed.is_empty() {
        stem.trim().to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parse "Artist - Album" out of a directory name.
/// Without a dash the whole name is the album and the artist is unknown.
pub fn guess_artist_and_album(dir_name: &str) -> (Option<String>, String) {
    if let Some(caps) = ARTIST_ALBUM_DIR.captures(dir_name) {
        let artist = caps.get(1).map_or("", |m| m.as_str()).trim();
        let album = caps.get(2).map_or("", |m| m.as_str()).trim();
        if !artist.is_empty() && !album.is_empty() {
            return (Some(artist.to_string()), album.to_string());
        }
    }
    (None, dir_name.trim().to_string())
}

// ============================================================================
// TESTS
// ============================================================================
