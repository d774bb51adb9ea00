//! Read-only settings for loading songs.

/// Settings shared by every [`crate::parse::SongParser`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct ParseConfig {
    /// Start offset in seconds used when a chart declares none.
    pub default_gap: f64,
    /// Beat-marker stride in beat timestamps, overriding the dialect's own.
    pub beat_stride: Option<u32>,
    /// Smallest chart file accepted, in bytes.
    pub min_file_size: usize,
    /// Largest chart file accepted, in bytes.
    pub max_file_size: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            default_gap: 0.0,
            beat_stride: None,
            min_file_size: 10,
            max_file_size: 100_000,
        }
    }
}

impl ParseConfig {
    /// Sets [`Self::default_gap`].
    #[must_use]
    pub const fn with_default_gap(mut self, seconds: f64) -> Self {
        self.default_gap = seconds;
        self
    }

    /// Sets [`Self::beat_stride`].
    #[must_use]
    pub const fn with_beat_stride(mut self, stride: u32) -> Self {
        self.beat_stride = Some(stride);
        self
    }

    /// Whether a chart file of `size` bytes is within the accepted range.
    #[must_use]
    pub const fn accepts_size(&self, size: usize) -> bool {
        self.min_file_size <= size && size <= self.max_file_size
    }
}

/// Returns the default [`ParseConfig`].
#[must_use]
pub fn default_config() -> ParseConfig {
    ParseConfig::default()
}
