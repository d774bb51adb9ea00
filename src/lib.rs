//! The song chart parser for karaoke and rhythm games.
//!
//! Five chart dialects are read into one [`model::Song`]:
//!
//! - UltraStar `.txt`, pitched vocals and duets.
//! - Frets on Fire `song.ini` with its `notes.mid`, vocals and harmonies from MIDI.
//! - StepMania `.sm`, dance charts.
//! - SingStar `.xml`, pitched vocals and duets.
//! - Aegisub `.ass` karaoke with Karaoke Mugen metadata, unpitched vocals.
//!
//! Loading happens in two phases. The header phase detects the dialect from the content,
//! reads metadata and guesses missing media files from the song directory. The full phase
//! reads the notes, then repairs and merges the vocal tracks. See [`parse`] for the entry
//! points.
//!
//! In detail, our policies are:
//!
//! - Decode any input into UTF-8, falling back to Windows-1252.
//! - Report recoverable anomalies as warnings returned alongside the result, never abort on them.
//! - Keep all times in absolute seconds once parsed.
//! - Do not write charts back.

pub mod config;
pub mod cursor;
pub mod detect;
#[cfg(feature = "diagnostics")]
pub mod diagnostics;
pub mod error;
pub mod finalize;
pub mod mixin;
pub mod model;
pub mod parse;
pub mod prelude;
pub mod resolve;
pub mod tempo;
pub mod text;
pub mod timeline;
pub mod util;

pub use self::{
    config::{ParseConfig, default_config},
    error::{ChartError, LoadError},
    parse::{LoadOutput, LoadWarning, SongParser, load_song},
};
