//! mbdiff - compare a local album directory with MusicBrainz releases.

pub mod diff;
pub mod models;
pub mod musicbrainz;
pub mod normalize;
pub mod progress;
pub mod prompt;
pub mod scan;
pub mod scoring;
pub mod session;
pub mod submit;
pub mod validate;
