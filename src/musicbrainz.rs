//! MusicBrainz release search and lookup over the JSON web service.

use std::cell::Cell;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

use crate::models::{ReleaseLink, RemoteRelease, RemoteTrack};

pub const DEFAULT_BASE_URL: &str = "https://musicbrainz.org/ws/2";
pub const DEFAULT_USER_AGENT: &str = concat!("mbdiff/", env!("CARGO_PKG_VERSION"));
pub const DEFAULT_SEARCH_LIMIT: u32 = 25;
const RATE_LIMIT: Duration = Duration::from_millis(1000);
const LOOKUP_INCLUDES: &str = "recordings+artist-credits+url-rels+annotation";
const UNKNOWN_ARTIST: &str = "Unknown MB Artist";
const BODY_LIMIT: u64 = 5_000_000;

static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[\(\[\{][^\)\]\}]*[\)\]\}]").unwrap());

/// Failures a catalog call can end in. An empty search result is not one of
/// them.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("musicbrainz request failed (transport) url={url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },
    #[error("musicbrainz request failed (status {status}) url={url}: {body}")]
    Status { url: String, status: u16, body: String },
    #[error("musicbrainz response parse failed url={url}: {source}")]
    Parse {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// What to search the catalog for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseQuery {
    pub album: String,
    pub artist: Option<String>,
    pub limit: u32,
}

/// Remote catalog of releases.
pub trait Catalog {
    /// Search releases; results carry track counts but no recordings.
    fn search_releases(&self, query: &ReleaseQuery) -> Result<Vec<RemoteRelease>, CatalogError>;

    /// Fetch one release with its recordings, URL relations and annotation.
    fn lookup_release(&self, mbid: &str) -> Result<RemoteRelease, CatalogError>;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

pub struct MusicBrainzClient {
    base_url: String,
    last_request: Cell<Option<Instant>>,
    agent: ureq::Agent,
}

impl MusicBrainzClient {
    pub fn new(cfg: &ClientConfig) -> Self {
        let base_url = cfg.base_url.trim_end_matches('/').to_string();
        let config = ureq::Agent::config_builder()
            .user_agent(cfg.user_agent.as_str())
            .build();
        Self {
            base_url,
            last_request: Cell::new(None),
            agent: ureq::Agent::new_with_config(config),
        }
    }

    fn wait_rate_limit(&self) {
        if let Some(last) = self.last_request.get() {
            let elapsed = last.elapsed();
            if elapsed < RATE_LIMIT {
                std::thread::sleep(RATE_LIMIT - elapsed);
            }
        }
        self.last_request.set(Some(Instant::now()));
    }

    fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<T, CatalogError> {
        self.wait_rate_limit();
        tracing::debug!(url, ?params, "musicbrainz request");

        let mut request = self.agent.get(url).query("fmt", "json");
        for (key, value) in params {
            request = request.query(*key, *value);
        }

        let transport = |source: ureq::Error| CatalogError::Transport {
            url: url.to_string(),
            source: Box::new(source),
        };

        let resp = request
            .config()
            .http_status_as_error(false)
            .build()
            .call()
            .map_err(transport)?;

        let status = resp.status().as_u16();
        let body = resp
            .into_body()
            .with_config()
            .limit(BODY_LIMIT)
            .read_to_string()
            .map_err(transport)?;

        if status >= 400 {
            let snippet: String = body.trim().chars().take(300).collect();
            return Err(CatalogError::Status {
                url: url.to_string(),
                status,
                body: snippet,
            });
        }

        serde_json::from_str(&body).map_err(|source| CatalogError::Parse {
            url: url.to_string(),
            source,
        })
    }

    fn search_once(&self, query: &ReleaseQuery) -> Result<Vec<RemoteRelease>, CatalogError> {
        let url = format!("{}/release", self.base_url);
        let lucene = build_release_query(&query.album, query.artist.as_deref());
        let limit = query.limit.to_string();
        let body: ReleaseSearchResponse =
            self.get_json(&url, &[("query", lucene.as_str()), ("limit", limit.as_str())])?;
        Ok(body.releases.into_iter().map(MbRelease::into_remote).collect())
    }
}

impl Catalog for MusicBrainzClient {
    fn search_releases(&self, query: &ReleaseQuery) -> Result<Vec<RemoteRelease>, CatalogError> {
        let results = self.search_once(query)?;
        if !results.is_empty() {
            return Ok(results);
        }

        // "Album (Deluxe) [FLAC]" often only exists as "Album"
        match fallback_album(&query.album) {
            Some(album) => {
                tracing::info!(
                    original = %query.album,
                    fallback = %album,
                    "no releases, retrying without brackets"
                );
                self.search_once(&ReleaseQuery {
                    album,
                    ..query.clone()
                })
            }
            None => Ok(results),
        }
    }

    fn lookup_release(&self, mbid: &str) -> Result<RemoteRelease, CatalogError> {
        let url = format!("{}/release/{}", self.base_url, mbid);
        let body: MbRelease = self.get_json(&url, &[("inc", LOOKUP_INCLUDES)])?;
        Ok(body.into_remote())
    }
}

// ============================================================================
// Query Building
// ============================================================================

pub fn build_release_query(album: &str, artist: Option<&str>) -> String {
    let mut parts = vec![format!("release:\"{}\"", escape_query(album))];
    if let Some(artist) = artist.map(str::trim).filter(|a| !a.is_empty()) {
        parts.push(format!("artist:\"{}\"", escape_query(artist)));
    }
    parts.join(" AND ")
}

fn escape_query(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Album title with bracketed groups removed, if that changes anything.
pub fn fallback_album(album: &str) -> Option<String> {
    let stripped = BRACKETED.replace_all(album, "");
    let cleaned = stripped.trim();
    if cleaned.is_empty() || cleaned == album.trim() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

// ============================================================================
// Serde response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ReleaseSearchResponse {
    #[serde(default)]
    releases: Vec<MbRelease>,
}

/// Release as returned by both search and lookup; search omits tracks.
#[derive(Debug, Deserialize)]
struct MbRelease {
    id: String,
    title: String,
    #[serde(rename = "track-count")]
    track_count: Option<u32>,
    annotation: Option<String>,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<MbArtistCredit>,
    #[serde(default)]
    media: Vec<MbMedium>,
    #[serde(default)]
    relations: Vec<MbRelation>,
}

#[derive(Debug, Deserialize)]
struct MbArtistCredit {
    name: Option<String>,
    #[serde(default)]
    joinphrase: String,
    artist: Option<MbArtistRef>,
}

#[derive(Debug, Deserialize)]
struct MbArtistRef {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MbMedium {
    #[serde(rename = "track-count")]
    track_count: Option<u32>,
    #[serde(default)]
    tracks: Vec<MbTrack>,
}

#[derive(Debug, Deserialize)]
struct MbTrack {
    title: Option<String>,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<MbArtistCredit>,
    recording: Option<MbRecording>,
}

#[derive(Debug, Deserialize)]
struct MbRecording {
    id: Option<String>,
    title: Option<String>,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<MbArtistCredit>,
}

#[derive(Debug, Deserialize)]
struct MbRelation {
    #[serde(rename = "type")]
    kind: Option<String>,
    url: Option<MbUrlResource>,
}

#[derive(Debug, Deserialize)]
struct MbUrlResource {
    resource: Option<String>,
}

/// "Artist A feat. Artist B", built from credited names and join phrases.
fn credit_phrase(credits: &[MbArtistCredit]) -> Option<String> {
    let phrase: String = credits
        .iter()
        .map(|credit| {
            let name = credit
                .name
                .as_deref()
                .or_else(|| credit.artist.as_ref().and_then(|a| a.name.as_deref()))
                .unwrap_or("");
            format!("{}{}", name, credit.joinphrase)
        })
        .collect();
    let trimmed = phrase.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl MbRelease {
    fn into_remote(self) -> RemoteRelease {
        let artist =
            credit_phrase(&self.artist_credit).unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

        let mut recordings = Vec::new();
        for track in self.media.iter().flat_map(|m| m.tracks.iter()) {
            let recording = track.recording.as_ref();
            let title = track
                .title
                .clone()
                .or_else(|| recording.and_then(|r| r.title.clone()))
                .unwrap_or_default();
            let track_artist = credit_phrase(&track.artist_credit)
                .or_else(|| recording.and_then(|r| credit_phrase(&r.artist_credit)))
                .unwrap_or_else(|| artist.clone());
            recordings.push(RemoteTrack {
                track_number: recordings.len() as u32 + 1,
                title,
                artist: track_artist,
                recording_uri: recording
                    .and_then(|r| r.id.as_deref())
                    .map(RemoteRelease::recording_uri),
            });
        }

        let media_count: u32 = self.media.iter().filter_map(|m| m.track_count).sum();
        let track_count = self
            .track_count
            .filter(|n| *n > 0)
            .or(Some(media_count).filter(|n| *n > 0))
            .unwrap_or(recordings.len() as u32);

        let links = self
            .relations
            .iter()
            .filter_map(|rel| {
                let target = rel.url.as_ref()?.resource.clone()?;
                Some(ReleaseLink {
                    kind: rel.kind.clone().unwrap_or_else(|| "url".to_string()),
                    target,
                })
            })
            .collect();

        RemoteRelease {
            uri: RemoteRelease::release_uri(&self.id),
            mbid: self.id,
            title: self.title,
            artist,
            track_count,
            annotation: self.annotation.filter(|a| !a.trim().is_empty()),
            links,
            recordings,
        }
    }
}
