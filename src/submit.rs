//! Seeding the MusicBrainz "add release" form and opening it in a browser.

use std::io;
use std::process::{Command, Stdio};

use url::Url;

use crate::models::{LocalAlbum, MUSICBRAINZ_WEB};

/// Build the release-editor URL pre-filled with the local album.
///
/// Tracks go on one medium in scan order; each keeps its own track number.
pub fn submission_url(album: &LocalAlbum) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(MUSICBRAINZ_WEB)?.join("release/add")?;

    {
        let mut query = url.query_pairs_mut();
        query.append_pair("name", &album.album);
        if let Some(artist) = album.artist.as_deref() {
            query.append_pair("artist_credit.names.0.name", artist);
        }
        for (idx, track) in album.tracks.iter().enumerate() {
            let prefix = format!("mediums.0.track.{}", idx);
            query.append_pair(&format!("{}.name", prefix), &track.title);
            query.append_pair(&format!("{}.number", prefix), &track.track_number.to_string());
            if !track.artist.is_empty() {
                query.append_pair(&format!("{}.artist_credit.names.0.name", prefix), &track.artist);
            }
        }
    }

    Ok(url)
}

/// Opens URLs for the user. Fire-and-forget.
pub trait Browser {
    fn open(&self, url: &Url);
}

/// Hands the URL to the platform's default opener.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl SystemBrowser {
    fn command(url: &str) -> Command {
        if cfg!(target_os = "macos") {
            let mut cmd = Command::new("open");
            cmd.arg(url);
            cmd
        } else if cfg!(target_os = "windows") {
            // Empty title argument, otherwise `start` treats a quoted URL as one
            let mut cmd = Command::new("cmd");
            cmd.args(["/C", "start", "", url]);
            cmd
        } else {
            let mut cmd = Command::new("xdg-open");
            cmd.arg(url);
            cmd
        }
    }

    fn spawn(url: &str) -> io::Result<()> {
        Self::command(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map(|_| ())
    }
}

impl Browser for SystemBrowser {
    fn open(&self, url: &Url) {
        match Self::spawn(url.as_str()) {
            Ok(()) => tracing::info!(url = %url, "opened browser"),
            Err(err) => tracing::warn!(url = %url, error = %err, "could not launch browser"),
        }
    }
}
