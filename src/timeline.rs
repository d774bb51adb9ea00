//! Conversion between beat timestamps and absolute seconds.
//!
//! A song declares its tempo as a list of changes, each taking effect at a beat timestamp.
//! Every dialect maps its own beat unit onto the same convention: one timestamp unit lasts
//! a sixteenth of a declared beat, so a tempo of `bpm` advances `15 / bpm` seconds per unit.

use crate::{error::TimingError, tempo::Bpm};

/// A tempo change.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct BpmEvent {
    /// Absolute time in seconds where the change takes effect.
    pub begin: f64,
    /// Beat timestamp where the change takes effect.
    pub ts: f64,
    /// Seconds per beat timestamp unit.
    pub step: f64,
}

impl BpmEvent {
    /// The declared tempo of this event.
    #[must_use]
    pub fn bpm(&self) -> f64 {
        15.0 / self.step
    }
}

/// Ordered tempo changes plus the start offset of the song.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Timeline {
    events: Vec<BpmEvent>,
    gap: f64,
}

impl Timeline {
    /// Creates an empty timeline starting `gap` seconds into the audio.
    #[must_use]
    pub const fn new(gap: f64) -> Self {
        Self {
            events: Vec::new(),
            gap,
        }
    }

    /// The start offset in seconds.
    #[must_use]
    pub const fn gap(&self) -> f64 {
        self.gap
    }

    /// Replaces the start offset. Only meaningful before any event is added.
    pub const fn set_gap(&mut self, gap: f64) {
        self.gap = gap;
    }

    /// The tempo events in timestamp order.
    #[must_use]
    pub fn events(&self) -> &[BpmEvent] {
        &self.events
    }

    /// Whether no tempo has been declared yet.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Appends a tempo change of `bpm` at beat timestamp `ts`.
    ///
    /// An event at the same timestamp as the last one replaces it.
    ///
    /// # Errors
    ///
    /// - [`TimingError::InvalidTempo`] if `bpm` is outside of `[1, 1e12)`.
    /// - [`TimingError::TempoOrder`] if `ts` is before the last event.
    pub fn add_bpm(&mut self, ts: f64, bpm: f64) -> Result<(), TimingError> {
        let bpm = Bpm::new(bpm).ok_or(TimingError::InvalidTempo(bpm))?;
        if let Some(last) = self.events.last() {
            if ts < last.ts {
                return Err(TimingError::TempoOrder { ts, last: last.ts });
            }
            if ts == last.ts {
                self.events.pop();
            }
        }
        let begin = self.ts_time(ts)?;
        self.events.push(BpmEvent {
            begin,
            ts,
            step: bpm.step(),
        });
        Ok(())
    }

    /// Converts a beat timestamp into seconds.
    ///
    /// # Errors
    ///
    /// - [`TimingError::MissingTempo`] if no tempo is declared and `ts` is not zero.
    /// - [`TimingError::BeforeFirstTempo`] if `ts` precedes the first event.
    pub fn ts_time(&self, ts: f64) -> Result<f64, TimingError> {
        let Some(first) = self.events.first() else {
            return if ts == 0.0 {
                Ok(self.gap)
            } else {
                Err(TimingError::MissingTempo(ts))
            };
        };
        self.events
            .iter()
            .rev()
            .find(|event| event.ts <= ts)
            .map(|event| event.begin + (ts - event.ts) * event.step)
            .ok_or(TimingError::BeforeFirstTempo {
                ts,
                first: first.ts,
            })
    }

    /// The most recent event in effect at `seconds`, or the first one before it starts.
    #[must_use]
    pub fn event_at_time(&self, seconds: f64) -> Option<&BpmEvent> {
        self.events
            .iter()
            .rev()
            .find(|event| event.begin <= seconds)
            .or_else(|| self.events.first())
    }

    /// Drops every event but the first, keeping the tempo declared by the header.
    pub fn retain_initial(&mut self) {
        self.events.truncate(1);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn empty_timeline_only_knows_zero() {
        let timeline = Timeline::new(1.5);
        assert_eq!(timeline.ts_time(0.0), Ok(1.5));
        assert_eq!(timeline.ts_time(4.0), Err(TimingError::MissingTempo(4.0)));
    }

    #[test]
    fn piecewise_linear() {
        let mut timeline = Timeline::new(0.5);
        timeline.add_bpm(0.0, 120.0).unwrap();
        timeline.add_bpm(16.0, 240.0).unwrap();
        // 16 units at 0.125 s, then 0.0625 s per unit
        assert!(approx(timeline.ts_time(8.0).unwrap(), 1.5));
        assert!(approx(timeline.ts_time(16.0).unwrap(), 2.5));
        assert!(approx(timeline.ts_time(32.0).unwrap(), 3.5));
        assert!(approx(timeline.events()[1].bpm(), 240.0));
    }

    #[test]
    fn equal_timestamp_replaces() {
        let mut timeline = Timeline::new(0.0);
        timeline.add_bpm(0.0, 120.0).unwrap();
        timeline.add_bpm(8.0, 60.0).unwrap();
        timeline.add_bpm(8.0, 240.0).unwrap();
        assert_eq!(timeline.events().len(), 2);
        assert!(approx(timeline.events()[1].bpm(), 240.0));
        assert!(approx(timeline.events()[1].begin, 1.0));
    }

    #[test]
    fn out_of_order_fails() {
        let mut timeline = Timeline::new(0.0);
        timeline.add_bpm(0.0, 120.0).unwrap();
        timeline.add_bpm(8.0, 120.0).unwrap();
        assert_eq!(
            timeline.add_bpm(4.0, 120.0),
            Err(TimingError::TempoOrder { ts: 4.0, last: 8.0 })
        );
    }

    #[test]
    fn tempo_range() {
        let mut timeline = Timeline::new(0.0);
        assert_eq!(
            timeline.add_bpm(0.0, 0.5),
            Err(TimingError::InvalidTempo(0.5))
        );
        assert_eq!(
            timeline.add_bpm(0.0, 1e12),
            Err(TimingError::InvalidTempo(1e12))
        );
        assert!(timeline.add_bpm(0.0, 1.0).is_ok());
    }

    #[test]
    fn monotonic_over_changes() {
        let mut timeline = Timeline::new(0.0);
        for (ts, bpm) in [(0.0, 90.0), (10.0, 300.0), (10.0, 45.0), (33.0, 1.0), (40.0, 9999.0)] {
            timeline.add_bpm(ts, bpm).unwrap();
        }
        let times: Vec<f64> = (0..60)
            .map(|ts| timeline.ts_time(f64::from(ts)).unwrap())
            .collect();
        assert!(times.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn event_lookup_by_time() {
        let mut timeline = Timeline::new(0.0);
        timeline.add_bpm(0.0, 120.0).unwrap();
        timeline.add_bpm(16.0, 60.0).unwrap();
        assert!(approx(timeline.event_at_time(1.0).unwrap().step, 0.125));
        assert!(approx(timeline.event_at_time(2.0).unwrap().step, 0.25));
        assert!(approx(timeline.event_at_time(-1.0).unwrap().step, 0.125));
        timeline.retain_initial();
        assert_eq!(timeline.events().len(), 1);
    }
}
