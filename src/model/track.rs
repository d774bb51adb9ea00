//! Vocal tracks and dance charts.

use super::note::Note;

/// Well-known vocal track names.
pub mod track_name {
    /// The lead singer.
    pub const LEAD: &str = "Vocals";
    /// The second singer of a duet.
    pub const DUET_SECOND: &str = "Duet singer";
    /// Both duet parts merged into one singable line.
    pub const TOGETHER: &str = "Together";

    /// Name of the `n`th harmony part, starting with 1.
    #[must_use]
    pub fn harmonic(n: usize) -> String {
        format!("Harmonic {n}")
    }
}

/// Lowest and highest pitch sung in a track.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct PitchRange {
    /// Lowest pitch.
    pub min: f64,
    /// Highest pitch.
    pub max: f64,
}

impl PitchRange {
    /// A range holding a single pitch.
    #[must_use]
    pub const fn single(pitch: f64) -> Self {
        Self {
            min: pitch,
            max: pitch,
        }
    }

    /// The range widened to contain `pitch`.
    #[must_use]
    pub fn including(self, pitch: f64) -> Self {
        Self {
            min: self.min.min(pitch),
            max: self.max.max(pitch),
        }
    }

    /// The smallest range containing both.
    #[must_use]
    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// One singer's part.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct VocalTrack {
    /// The track name, see [`track_name`].
    pub name: String,
    /// Who sings this part, when the chart says so.
    pub singer: Option<String>,
    /// Time-ordered notes.
    pub notes: Vec<Note>,
    /// Pitch range of the sung notes.
    pub pitch: Option<PitchRange>,
    /// Start of the first note, in seconds.
    pub begin_time: f64,
    /// End of the last note, in seconds.
    pub end_time: f64,
    /// `1 / Σ max score`, unset when nothing can be scored.
    pub score_factor: Option<f64>,
}

impl VocalTrack {
    /// An empty track named `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Appends `note`, widening the pitch range when it is sung for some time.
    pub fn push(&mut self, note: Note) {
        if !note.is_sleep() && note.end > note.begin {
            self.extend_range(note.note);
        }
        self.notes.push(note);
    }

    /// Widens the pitch range to contain `pitch`.
    pub fn extend_range(&mut self, pitch: f64) {
        self.pitch = Some(match self.pitch {
            Some(range) => range.including(pitch),
            None => PitchRange::single(pitch),
        });
    }

    /// Whether any note of this track intersects `[begin, end)`.
    #[must_use]
    pub fn overlaps(&self, begin: f64, end: f64) -> bool {
        self.notes
            .iter()
            .any(|note| begin < note.end && end > note.begin)
    }

    /// Whether the last note is a rest.
    #[must_use]
    pub fn ends_with_sleep(&self) -> bool {
        self.notes.last().is_some_and(Note::is_sleep)
    }
}

/// Dance chart difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum DanceDifficulty {
    /// Beginner.
    Beginner,
    /// Easy, also called Basic.
    Easy,
    /// Medium, also called Another or Trick.
    Medium,
    /// Hard, also called Maniac or SSR.
    Hard,
    /// Challenge, also called Smaniac.
    Challenge,
    /// Edit, a user-made chart.
    Edit,
}

impl DanceDifficulty {
    /// Decodes the difficulty names StepMania accepts.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.trim().to_ascii_lowercase().as_str() {
            "beginner" => Self::Beginner,
            "easy" | "basic" | "light" => Self::Easy,
            "medium" | "another" | "trick" | "standard" => Self::Medium,
            "hard" | "maniac" | "ssr" | "heavy" => Self::Hard,
            "challenge" | "smaniac" | "expert" | "oni" => Self::Challenge,
            "edit" => Self::Edit,
            _ => return None,
        })
    }
}

/// What a dance arrow asks of the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum DanceNoteKind {
    /// Step once.
    Tap,
    /// Step and hold until the tail.
    Hold,
    /// Step repeatedly until the tail.
    Roll,
    /// Do not step.
    Mine,
    /// Release on time.
    Lift,
    /// Decoration, never judged.
    Fake,
}

/// An arrow in a dance chart.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct DanceNote {
    /// Start time in seconds.
    pub begin: f64,
    /// End time in seconds; equals `begin` unless held.
    pub end: f64,
    /// Column, 0 being the leftmost panel.
    pub column: usize,
    /// What is asked of the player.
    pub kind: DanceNoteKind,
}

/// One `#NOTES` block of a StepMania chart.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct DanceTrack {
    /// Game type, such as `dance-single`.
    pub style: String,
    /// Difficulty slot.
    pub difficulty: DanceDifficulty,
    /// Free text, often the charter.
    pub description: String,
    /// Numeric rating.
    pub meter: u32,
    /// Time-ordered arrows.
    pub notes: Vec<DanceNote>,
}
