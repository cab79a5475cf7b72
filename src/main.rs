use anyhow::{bail, Result};
use clap::Parser;
use std::io;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

use mbdiff::diff::{DiffOptions, DEFAULT_COLUMN_WIDTH};
use mbdiff::models::LocalAlbum;
use mbdiff::musicbrainz::{
    ClientConfig, MusicBrainzClient, DEFAULT_BASE_URL, DEFAULT_SEARCH_LIMIT, DEFAULT_USER_AGENT,
};
use mbdiff::normalize::guess_artist_and_album;
use mbdiff::progress::{format_duration, set_quiet};
use mbdiff::scan::{scan_directory, LoftyTagReader};
use mbdiff::session::{run_session, SessionConfig};
use mbdiff::submit::SystemBrowser;
use mbdiff::validate::{directory_name, validate_root_directory};

#[derive(Parser, Debug)]
#[command(name = "mbdiff")]
#[command(about = "Compare a local album directory against MusicBrainz releases")]
struct Args {
    /// Album directory ("Artist - Album" names are split into both)
    root_directory: PathBuf,

    /// Override the artist guessed from the directory name
    #[arg(long)]
    artist: Option<String>,

    /// Override the album guessed from the directory name
    #[arg(long)]
    album: Option<String>,

    #[arg(long, default_value_t = DEFAULT_SEARCH_LIMIT)]
    limit: u32,

    /// Width of the local (left) column of the diff
    #[arg(long, default_value_t = DEFAULT_COLUMN_WIDTH)]
    width: usize,

    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    #[arg(long, default_value = DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Hide spinners and progress bars
    #[arg(long)]
    quiet: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,mbdiff=info")),
        )
        .init();
    set_quiet(args.quiet);

    let start = Instant::now();
    let root = validate_root_directory(&args.root_directory)?;

    let guess = directory_name(&root).map(|name| guess_artist_and_album(&name));
    let (guessed_artist, guessed_album) = match (args.album.is_some(), guess) {
        (_, Ok(guess)) => guess,
        (true, Err(_)) => (None, String::new()),
        (false, Err(err)) => return Err(err),
    };
    let artist = args.artist.clone().or(guessed_artist);
    let album_title = args.album.clone().unwrap_or(guessed_album);
    tracing::info!(artist = ?artist, album = %album_title, root = %root.display(), "scanning");

    let report = scan_directory(&root, artist.as_deref(), &LoftyTagReader);
    if report.tracks.is_empty() {
        bail!(
            "No usable audio files under '{}' ({} skipped)",
            root.display(),
            report.skipped.len()
        );
    }
    tracing::info!(
        tracks = report.tracks.len(),
        skipped = report.skipped.len(),
        elapsed = %format_duration(start.elapsed()),
        "scan finished"
    );

    let album = LocalAlbum {
        artist,
        album: album_title,
        tracks: report.tracks,
    };

    let client = MusicBrainzClient::new(&ClientConfig {
        base_url: args.base_url,
        user_agent: args.user_agent,
    });
    let config = SessionConfig {
        search_limit: args.limit,
        diff: DiffOptions {
            column_width: args.width,
        },
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    let outcome = run_session(
        &config,
        &album,
        &client,
        &SystemBrowser,
        &mut stdin.lock(),
        &mut stdout.lock(),
    )?;

    tracing::info!(%outcome, elapsed = %format_duration(start.elapsed()), "done");
    Ok(())
}
