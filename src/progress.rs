//! Terminal feedback for the slow steps: reading tags and waiting on
//! MusicBrainz. Drawn on stderr; `--quiet` turns it off.

use indicatif::style::TemplateError;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

static QUIET: AtomicBool = AtomicBool::new(false);

pub fn set_quiet(value: bool) {
    QUIET.store(value, Ordering::Relaxed);
}

pub fn is_quiet() -> bool {
    QUIET.load(Ordering::Relaxed)
}

/// "850ms", "4.2s", "1m 05s"
pub fn format_duration(d: Duration) -> String {
    let millis = d.as_millis();
    if millis < 1_000 {
        format!("{}ms", millis)
    } else if millis < 60_000 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        let secs = d.as_secs();
        format!("{}m {:02}s", secs / 60, secs % 60)
    }
}

fn styled(pb: ProgressBar, style: Result<ProgressStyle, TemplateError>) -> ProgressBar {
    if is_quiet() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    } else if let Ok(style) = style {
        pb.set_style(style);
    }
    pb
}

/// Bar over the audio files of one album directory.
pub fn tag_progress(files: u64) -> ProgressBar {
    let style = ProgressStyle::with_template("Reading tags [{bar:30.cyan/blue}] {pos}/{len}")
        .map(|s| s.progress_chars("=> "));
    styled(ProgressBar::new(files), style)
}

/// Spinner shown while a catalog request (and its rate-limit wait) runs.
pub fn catalog_spinner(msg: &str) -> ProgressBar {
    let pb = styled(
        ProgressBar::new_spinner(),
        ProgressStyle::with_template("{spinner} {msg} [{elapsed}]"),
    );
    if !is_quiet() {
        pb.enable_steady_tick(Duration::from_millis(120));
    }
    pb.set_message(msg.to_string());
    pb
}
