//! The unified song model every dialect parses into.
//!
//! All times are absolute seconds from the start of the audio.

pub mod note;
pub mod song;
pub mod track;

pub use self::{
    note::{Note, NoteType},
    song::{Dialect, LoadStatus, Song, StemRole},
    track::{
        DanceDifficulty, DanceNote, DanceNoteKind, DanceTrack, PitchRange, VocalTrack, track_name,
    },
};
