//! Repairs and derived values computed once all notes are parsed.

use std::collections::BTreeMap;

use itertools::Itertools;
use thiserror::Error;

use crate::{
    error::Result,
    model::{Note, PitchRange, Song, VocalTrack, track_name},
    timeline::Timeline,
};

/// Where beat markers are placed, in beat timestamps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BeatSpan {
    /// Distance between markers.
    pub stride: f64,
    /// Markers are placed strictly before this timestamp.
    pub end: f64,
}

/// A repair applied to the notes.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Error)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum FinalizeWarning {
    /// Two overlapping notes were too short to separate and became one.
    #[error("{track}: overlapping notes combined into `{syllable}` at {at:.3}s")]
    NotesCombined {
        /// Track name.
        track: String,
        /// The combined syllable.
        syllable: String,
        /// Start of the combined note in seconds.
        at: f64,
    },
    /// Pitches were raised to make every pitch positive.
    #[error("{track}: pitches raised by {shift} semitones")]
    PitchShifted {
        /// Track name.
        track: String,
        /// Semitones added to every note.
        shift: f64,
    },
}

/// Runs every finalization step on a fully parsed song.
///
/// # Errors
///
/// A [`crate::error::TimingError`] if beat markers cannot be placed on the timeline.
pub fn finalize(song: &mut Song, beats: Option<BeatSpan>) -> Result<Vec<FinalizeWarning>> {
    let mut warnings = Vec::new();
    vocals_together(&mut song.vocal_tracks);
    for track in song.vocal_tracks.values_mut() {
        warnings.extend(repair_overlaps(track, &song.timeline));
        collapse_sleeps(track);
        warnings.extend(normalize_pitch(track));
        compute_bounds(track);
    }
    song.beats = match beats {
        Some(span) => beat_markers(&song.timeline, span)?,
        None => Vec::new(),
    };
    Ok(warnings)
}

/// Fills an empty [`track_name::TOGETHER`] track with a merge of every other track.
///
/// The earliest pending note of any track is taken next, and every note of every track that
/// begins before it ends is dropped, so overlapping parts yield a single singable line.
pub fn vocals_together(tracks: &mut BTreeMap<String, VocalTrack>) {
    if !tracks
        .get(track_name::TOGETHER)
        .is_some_and(|together| together.notes.is_empty())
    {
        return;
    }
    let sources: Vec<&VocalTrack> = tracks
        .iter()
        .filter(|(name, _)| name.as_str() != track_name::TOGETHER)
        .map(|(_, track)| track)
        .collect();
    let mut heads = vec![0_usize; sources.len()];
    let mut merged = Vec::new();
    loop {
        let earliest = sources
            .iter()
            .zip(&heads)
            .enumerate()
            .filter_map(|(i, (track, &head))| track.notes.get(head).map(|note| (i, note)))
            .min_by(|(_, a), (_, b)| a.begin.total_cmp(&b.begin));
        let Some((picked, note)) = earliest else {
            break;
        };
        if let Some(head) = heads.get_mut(picked) {
            *head += 1;
        }
        for (track, head) in sources.iter().zip(heads.iter_mut()) {
            while track.notes.get(*head).is_some_and(|n| n.begin < note.end) {
                *head += 1;
            }
        }
        merged.push(note.clone());
    }
    let pitch = sources
        .iter()
        .filter_map(|track| track.pitch)
        .reduce(PitchRange::union);

    if let Some(together) = tracks.get_mut(track_name::TOGETHER) {
        together.notes = merged;
        together.pitch = pitch;
    }
}

/// Separates overlapping notes of one track.
///
/// A note overlapping the next is shortened to end one beat unit before it when at least one
/// beat unit remains; otherwise it absorbs the next note, or squeezes the next rest to the
/// junction. Rests are zero-length.
pub fn repair_overlaps(track: &mut VocalTrack, timeline: &Timeline) -> Vec<FinalizeWarning> {
    let mut warnings = Vec::new();
    for note in track.notes.iter_mut().filter(|n| n.is_sleep()) {
        note.end = note.begin;
    }
    let notes = &mut track.notes;
    let mut i = 0;
    while let Some(next_begin) = notes.get(i + 1).map(|n| n.begin) {
        let Some(cur) = notes.get(i) else {
            break;
        };
        if cur.end <= next_begin {
            i += 1;
            continue;
        }
        if cur.is_sleep() {
            notes.remove(i);
            i = i.saturating_sub(1);
            continue;
        }
        let beat = timeline.event_at_time(cur.begin).map_or(0.0, |event| event.step);
        let new_end = next_begin - beat;
        let next_is_sleep = notes.get(i + 1).is_some_and(Note::is_sleep);
        if new_end - cur.begin >= beat {
            if let Some(cur) = notes.get_mut(i) {
                cur.end = new_end;
            }
        } else if !next_is_sleep {
            let next = notes.remove(i + 1);
            if let Some(cur) = notes.get_mut(i) {
                cur.syllable = format!("{}-{}", cur.syllable, next.syllable);
                cur.end = next.end;
                warnings.push(FinalizeWarning::NotesCombined {
                    track: track.name.clone(),
                    syllable: cur.syllable.clone(),
                    at: cur.begin,
                });
            }
            continue;
        } else {
            let junction = cur.end;
            if let Some(next) = notes.get_mut(i + 1) {
                next.begin = junction;
                next.end = junction;
            }
        }
        i += 1;
    }
    warnings
}

/// Keeps only the first of consecutive rests.
pub fn collapse_sleeps(track: &mut VocalTrack) {
    track.notes = std::mem::take(&mut track.notes)
        .into_iter()
        .coalesce(|a, b| {
            if a.is_sleep() && b.is_sleep() {
                Ok(a)
            } else {
                Err((a, b))
            }
        })
        .collect();
}

/// Raises every pitch by the smallest multiple of 12 that makes the lowest one positive.
pub fn normalize_pitch(track: &mut VocalTrack) -> Option<FinalizeWarning> {
    let range = track.pitch?;
    if range.min > 0.0 {
        return None;
    }
    let shift = 12.0 * ((-range.min / 12.0).floor() + 1.0);
    for note in &mut track.notes {
        note.note += shift;
        note.note_prev += shift;
    }
    track.pitch = Some(PitchRange {
        min: range.min + shift,
        max: range.max + shift,
    });
    Some(FinalizeWarning::PitchShifted {
        track: track.name.clone(),
        shift,
    })
}

/// Sets the time bounds and score factor of a track.
pub fn compute_bounds(track: &mut VocalTrack) {
    track.begin_time = track.notes.first().map_or(0.0, |n| n.begin);
    track.end_time = track.notes.last().map_or(0.0, |n| n.end);
    let max_score: f64 = track.notes.iter().map(Note::max_score).sum();
    track.score_factor = (max_score > 0.0).then(|| 1.0 / max_score);
}

/// Absolute times of every `span.stride` beat timestamps before `span.end`.
///
/// # Errors
///
/// A [`crate::error::TimingError`] if a timestamp cannot be resolved.
pub fn beat_markers(timeline: &Timeline, span: BeatSpan) -> Result<Vec<f64>> {
    let mut beats = Vec::new();
    if span.stride <= 0.0 {
        return Ok(beats);
    }
    let mut ts = 0.0;
    while ts < span.end {
        beats.push(timeline.ts_time(ts)?);
        ts += span.stride;
    }
    Ok(beats)
}
