//! The song aggregate.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use super::track::{DanceDifficulty, DanceTrack, VocalTrack};
use crate::{error::StatusError, timeline::Timeline};

/// Chart file dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Dialect {
    /// UltraStar `.txt`.
    Txt,
    /// Frets on Fire `song.ini` with `notes.mid`.
    Ini,
    /// StepMania `.sm`.
    Sm,
    /// SingStar `.xml`.
    Xml,
    /// Aegisub `.ass` karaoke subtitles with Karaoke Mugen metadata.
    Ass,
}

/// Role of an audio stem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum StemRole {
    /// The full mix or the backing track.
    Background,
    /// A short excerpt for song selection.
    Preview,
    /// Lead guitar.
    Guitar,
    /// Bass or rhythm guitar.
    Bass,
    /// Drums, or the kick when split.
    Drums,
    /// Split snare.
    DrumsSnare,
    /// Split cymbals.
    DrumsCymbals,
    /// Split toms.
    DrumsToms,
    /// Keyboard.
    Keyboard,
    /// Co-op guitar.
    GuitarCoop,
    /// Rhythm guitar.
    GuitarRhythm,
    /// Lead vocals.
    VocalLead,
    /// Backing vocals.
    VocalBacking,
}

/// How far a song has been loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum LoadStatus {
    /// Nothing read yet.
    #[default]
    Unloaded,
    /// Metadata and media paths are known.
    Header,
    /// Notes are parsed and finalized.
    Full,
    /// The song cannot be played. Terminal.
    Error,
}

impl LoadStatus {
    /// Whether the lifecycle allows going from `self` to `to`.
    #[must_use]
    pub const fn can_transition(self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Unloaded, Self::Header)
                | (Self::Header | Self::Full, Self::Full | Self::Error)
        )
    }

    /// Moves to `to` if the lifecycle allows it.
    ///
    /// # Errors
    ///
    /// [`StatusError::Failed`] once in [`LoadStatus::Error`], otherwise
    /// [`StatusError::InvalidTransition`] for anything outside the lifecycle.
    pub fn transition(&mut self, to: Self) -> Result<(), StatusError> {
        if *self == Self::Error {
            return Err(StatusError::Failed);
        }
        if !self.can_transition(to) {
            return Err(StatusError::InvalidTransition { from: *self, to });
        }
        *self = to;
        Ok(())
    }
}

/// A song and everything known about it.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Song {
    /// Directory holding the chart.
    pub path: PathBuf,
    /// The chart file.
    pub filename: PathBuf,
    /// Dialect of the chart, detected once during the header phase.
    pub dialect: Option<Dialect>,
    /// Song title.
    pub title: String,
    /// Performing artist.
    pub artist: String,
    /// Release or game edition the chart belongs to.
    pub edition: String,
    /// Genre.
    pub genre: String,
    /// Language of the lyrics.
    pub language: String,
    /// Who made the chart.
    pub creator: String,
    /// Free-form tags.
    pub tags: String,
    /// Release year.
    pub year: Option<u32>,
    /// Where the chart came from.
    pub provided_by: String,
    /// Audio stems.
    pub music: BTreeMap<StemRole, PathBuf>,
    /// Music video.
    pub video: Option<PathBuf>,
    /// Cover art.
    pub cover: Option<PathBuf>,
    /// Background image.
    pub background: Option<PathBuf>,
    /// MIDI note data, for Frets on Fire charts.
    pub midi_file: Option<PathBuf>,
    /// Seconds to skip into the video.
    pub video_gap: f64,
    /// Seconds into the song where playback starts.
    pub start: f64,
    /// Seconds into the song where the preview starts.
    pub preview_start: Option<f64>,
    /// Tempo changes and start offset.
    pub timeline: Timeline,
    /// Vocal parts by track name.
    pub vocal_tracks: BTreeMap<String, VocalTrack>,
    /// Dance charts by style and difficulty.
    pub dance_tracks: BTreeMap<(String, DanceDifficulty), DanceTrack>,
    /// Names of instrument tracks found in the MIDI file.
    pub instrument_tracks: Vec<String>,
    /// Beat markers in seconds.
    pub beats: Vec<f64>,
    /// How far the song has been loaded.
    pub load_status: LoadStatus,
}

impl Song {
    /// An unloaded song for the chart file at `filename`.
    #[must_use]
    pub fn new(filename: impl Into<PathBuf>) -> Self {
        let filename = filename.into();
        let path = filename.parent().map(Path::to_path_buf).unwrap_or_default();
        Self {
            path,
            filename,
            ..Self::default()
        }
    }

    /// Inserts an empty vocal track unless one with the same name exists.
    pub fn insert_vocal_track(&mut self, name: &str) -> &mut VocalTrack {
        self.vocal_tracks
            .entry(name.to_string())
            .or_insert_with(|| VocalTrack::new(name))
    }

    /// Resolves `relative` against the chart directory.
    #[must_use]
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.path.join(relative.trim())
    }
}
