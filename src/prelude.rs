//! Prelude module for the crate.
//!
//! You can use `use songchart::prelude::*;` to import the loading entry points and the song
//! model at once.

#[cfg(feature = "diagnostics")]
pub use crate::diagnostics::{SimpleSource, ToAriadne, emit_load_warnings};

pub use crate::{
    config::{ParseConfig, default_config},
    detect::detect,
    error::{ChartError, FormatError, LoadError, StatusError, TimingError},
    finalize::{BeatSpan, FinalizeWarning, finalize},
    mixin::{Located, LocatedExt},
    model::{
        DanceDifficulty, DanceNote, DanceNoteKind, DanceTrack, Dialect, LoadStatus, Note,
        NoteType, PitchRange, Song, StemRole, VocalTrack, track_name,
    },
    parse::{
        ChartWarning, LoadOutput, LoadWarning, SongParser, SourceWarning, load_song,
    },
    resolve::{FileRole, ResolveWarning, guess_files},
    tempo::Bpm,
    text::EncodingWarning,
    timeline::{BpmEvent, Timeline},
};
