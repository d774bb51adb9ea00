//! Vocal notes.

/// How a note is sung and scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum NoteType {
    /// An ordinary pitched syllable.
    #[default]
    Normal,
    /// Scores double.
    Golden,
    /// Not scored, any pitch goes.
    Freestyle,
    /// Spoken, only timing is scored.
    Rap,
    /// Spoken and scores double.
    GoldenRap,
    /// Glides from the previous note's pitch.
    Slide,
    /// A rest between phrases. Carries no syllable.
    Sleep,
}

impl NoteType {
    /// Weight of one second of this note in the maximum score.
    #[must_use]
    pub const fn score_multiplier(self) -> f64 {
        match self {
            Self::Normal | Self::Rap | Self::Slide => 1.0,
            Self::Golden | Self::GoldenRap => 2.0,
            Self::Freestyle | Self::Sleep => 0.0,
        }
    }

    /// The UltraStar note-line marker, if this type has one.
    #[must_use]
    pub const fn from_txt_marker(marker: char) -> Option<Self> {
        Some(match marker {
            ':' => Self::Normal,
            '*' => Self::Golden,
            'F' => Self::Freestyle,
            'R' => Self::Rap,
            'G' => Self::GoldenRap,
            '-' => Self::Sleep,
            _ => return None,
        })
    }
}

/// A syllable or a rest, in absolute seconds.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Note {
    /// Start time in seconds.
    pub begin: f64,
    /// End time in seconds.
    pub end: f64,
    /// Pitch in semitones.
    pub note: f64,
    /// Pitch the note slides from.
    pub note_prev: f64,
    /// The sung text.
    pub syllable: String,
    /// How the note is sung and scored.
    pub note_type: NoteType,
}

impl Note {
    /// A sung note.
    #[must_use]
    pub fn new(begin: f64, end: f64, note: f64, syllable: impl Into<String>, note_type: NoteType) -> Self {
        Self {
            begin,
            end,
            note,
            note_prev: note,
            syllable: syllable.into(),
            note_type,
        }
    }

    /// A zero-length rest at `at`.
    #[must_use]
    pub fn sleep(at: f64) -> Self {
        Self {
            begin: at,
            end: at,
            note_type: NoteType::Sleep,
            ..Self::default()
        }
    }

    /// Whether this note is a rest.
    #[must_use]
    pub fn is_sleep(&self) -> bool {
        self.note_type == NoteType::Sleep
    }

    /// Duration in seconds.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.end - self.begin
    }

    /// The best score attainable on this note.
    #[must_use]
    pub fn max_score(&self) -> f64 {
        self.note_type.score_multiplier() * self.duration().max(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn score_weights() {
        let golden = Note::new(1.0, 2.5, 60.0, "la", NoteType::Golden);
        assert!((golden.max_score() - 3.0).abs() < 1e-12);
        assert!(Note::new(1.0, 2.0, 60.0, "~", NoteType::Freestyle).max_score().abs() < 1e-12);
        assert!(Note::sleep(4.0).max_score().abs() < 1e-12);
    }

    #[test]
    fn markers() {
        assert_eq!(NoteType::from_txt_marker('G'), Some(NoteType::GoldenRap));
        assert_eq!(NoteType::from_txt_marker('x'), None);
    }
}
