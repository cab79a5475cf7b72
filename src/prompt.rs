//! Interactive numbered-menu selection.
//!
//! Reading and writing go through `BufRead`/`Write` so the session can be
//! driven from tests exactly like from a terminal.

use std::io::{self, BufRead, Write};

use crate::models::{CandidateScore, Selection};

/// Invalid answers tolerated before the prompt gives up and cancels.
pub const MAX_ATTEMPTS: usize = 3;

/// Interpret one line typed at a menu of `count` entries numbered from 1.
pub fn parse_selection(input: &str, count: usize) -> Selection {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Selection::Cancel;
    }
    match trimmed.parse::<usize>() {
        Ok(n) if (1..=count).contains(&n) => Selection::Chosen(n - 1),
        Ok(n) => Selection::Invalid(format!("{} is out of range 1-{}", n, count)),
        Err(_) => Selection::Invalid(format!("'{}' is not a number", trimmed)),
    }
}

/// Write the candidate menu, numbered 1..N in the given order.
pub fn write_menu<W: Write>(out: &mut W, candidates: &[CandidateScore]) -> io::Result<()> {
    writeln!(out, "Candidate releases:")?;
    for (idx, c) in candidates.iter().enumerate() {
        writeln!(
            out,
            "  {:>2}) {} - {} [{} tracks, delta {}]",
            idx + 1,
            c.release.artist,
            c.release.title,
            c.release.track_count,
            c.track_count_delta
        )?;
        writeln!(
            out,
            "      title {:.0}% / artist {:.0}%  {}",
            c.title_similarity * 100.0,
            c.artist_similarity * 100.0,
            c.release.uri
        )?;
    }
    Ok(())
}

/// Ask until a valid entry is picked, the user cancels, input ends, or
/// `MAX_ATTEMPTS` invalid answers were given.
pub fn prompt_selection<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    count: usize,
) -> io::Result<Selection> {
    for _ in 0..MAX_ATTEMPTS {
        write!(out, "Select a release [1-{}] (blank to cancel): ", count)?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(Selection::Cancel);
        }

        match parse_selection(&line, count) {
            Selection::Invalid(reason) => {
                writeln!(out, "Invalid selection: {}", reason)?;
            }
            other => return Ok(other),
        }
    }
    writeln!(out, "Too many invalid answers.")?;
    Ok(Selection::Cancel)
}

/// Yes/no question; anything but "y"/"yes" (case-insensitive) is no.
pub fn confirm<R: BufRead, W: Write>(
    input: &mut R,
    out: &mut W,
    question: &str,
) -> io::Result<bool> {
    write!(out, "{} [y/N]: ", question)?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(false);
    }
    let answer = line.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}
