//! Validated tempo value.

use thiserror::Error;

/// Beats per minute, finite and within `[1, 1e12)`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[repr(transparent)]
pub struct Bpm(f64);

impl Eq for Bpm {}
impl PartialOrd for Bpm {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Bpm {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

/// Error type for `Bpm::try_from`.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("tempo must be within [1, 1e12): {0}")]
pub struct TryFromTempoError(pub f64);

impl TryFrom<f64> for Bpm {
    type Error = TryFromTempoError;
    fn try_from(value: f64) -> Result<Self, Self::Error> {
        (Self::MIN <= value && value < Self::MAX)
            .then_some(Self(value))
            .ok_or(TryFromTempoError(value))
    }
}

impl From<Bpm> for f64 {
    fn from(value: Bpm) -> Self {
        value.as_f64()
    }
}

impl Bpm {
    /// Smallest accepted tempo.
    pub const MIN: f64 = 1.0;
    /// Accepted tempos are strictly below this.
    pub const MAX: f64 = 1e12;

    /// Creates a new `Bpm` if `value` is in range, otherwise returns `None`.
    #[inline]
    #[must_use]
    pub fn new(value: f64) -> Option<Self> {
        Self::try_from(value).ok()
    }

    /// Gets the internal value.
    #[inline]
    #[must_use]
    pub const fn as_f64(self) -> f64 {
        self.0
    }

    /// Seconds per beat timestamp unit, a sixteenth of the declared beat.
    #[inline]
    #[must_use]
    pub fn step(self) -> f64 {
        0.25 * 60.0 / self.0
    }

    /// Inverse of [`Self::step`].
    #[must_use]
    pub fn from_step(step: f64) -> Option<Self> {
        Self::new(15.0 / step)
    }
}
