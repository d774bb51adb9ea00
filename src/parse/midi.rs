//! Rock Band style MIDI note data of Frets on Fire songs.
//!
//! MIDI ticks are used as beat timestamps directly, so a tempo of `us` microseconds per
//! quarter note becomes `15 · division · 1e6 / us` on the timeline.

use std::{collections::BTreeMap, ops::RangeInclusive};

use midly::{MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};

use crate::{
    error::{FormatError, Result},
    model::{Note, NoteType, Song, track_name},
    timeline::Timeline,
};

use super::{ChartWarning, ParseContext};

/// Microseconds per quarter note until the first tempo event.
const DEFAULT_TEMPO: u32 = 500_000;
/// Keys of sung notes.
const PITCHED_KEYS: RangeInclusive<u8> = 36..=84;
/// Keys marking a lyric phrase.
const PHRASE_KEYS: [u8; 2] = [105, 106];

/// Reads the tempo map and lists the tracks of a MIDI file.
///
/// # Errors
///
/// - [`crate::error::ChartError::Midi`] if the bytes are not a MIDI file.
/// - [`FormatError::Malformed`] if the file counts time in frames instead of beats.
/// - [`crate::error::ChartError::Timing`] if a tempo is out of range.
pub fn parse_header(song: &mut Song, bytes: &[u8]) -> Result<()> {
    let smf = Smf::parse(bytes)?;
    let division = division(&smf)?;
    apply_tempo_map(&mut song.timeline, &smf, division)?;
    let names: Vec<String> = smf.tracks.iter().filter_map(|t| track_title(t)).collect();
    let has_vocals = names.iter().any(|name| vocal_track(name).is_some());
    song.instrument_tracks = names
        .into_iter()
        .filter(|name| vocal_track(name).is_none())
        .collect();
    if has_vocals {
        song.insert_vocal_track(track_name::LEAD);
    }
    Ok(())
}

/// Reads the vocal parts of a MIDI file into `song`.
///
/// # Errors
///
/// See [`parse_header`].
pub(crate) fn parse_notes(song: &mut Song, bytes: &[u8], ctx: &mut ParseContext<'_>) -> Result<()> {
    let smf = Smf::parse(bytes)?;
    let division = division(&smf)?;
    apply_tempo_map(&mut song.timeline, &smf, division)?;
    ctx.beat_stride = Some(f64::from(division));
    for track in &smf.tracks {
        if let Some((tick, _)) = absolute(track).last() {
            ctx.reach(tick as f64);
        }
        let Some(name) = track_title(track).as_deref().and_then(vocal_track) else {
            continue;
        };
        let notes = read_vocals(&song.timeline, track, ctx)?;
        log::debug!("MIDI vocal track {name}: {} notes", notes.len());
        let vocal = song.insert_vocal_track(&name);
        for note in notes {
            vocal.push(note);
        }
    }
    Ok(())
}

fn division(smf: &Smf<'_>) -> Result<u16> {
    match smf.header.timing {
        Timing::Metrical(ticks) if ticks.as_int() > 0 => Ok(ticks.as_int()),
        Timing::Metrical(_) => Err(FormatError::invalid_value("MIDI division", "0").into()),
        Timing::Timecode(..) => {
            Err(FormatError::malformed("MIDI timecode timing is not supported").into())
        }
    }
}

/// Events of `track` with their absolute tick.
fn absolute<'t, 'a>(
    track: &'t [TrackEvent<'a>],
) -> impl Iterator<Item = (u64, &'t TrackEventKind<'a>)> {
    track.iter().scan(0_u64, |tick, event| {
        *tick += u64::from(event.delta.as_int());
        Some((*tick, &event.kind))
    })
}

fn track_title(track: &[TrackEvent<'_>]) -> Option<String> {
    absolute(track).find_map(|(_, kind)| match kind {
        TrackEventKind::Meta(MetaMessage::TrackName(name)) => {
            Some(String::from_utf8_lossy(name).trim().to_string())
        }
        _ => None,
    })
}

/// The vocal track a MIDI track name stands for.
fn vocal_track(name: &str) -> Option<String> {
    if name == "PART VOCALS" {
        return Some(track_name::LEAD.to_string());
    }
    let part = name.strip_prefix("PART ").unwrap_or(name);
    match part.strip_prefix("HARM")?.parse::<usize>() {
        Ok(n @ 1..=3) => Some(track_name::harmonic(n)),
        _ => None,
    }
}

fn apply_tempo_map(timeline: &mut Timeline, smf: &Smf<'_>, division: u16) -> Result<()> {
    let mut tempos: Vec<(u64, u32)> = smf
        .tracks
        .iter()
        .flat_map(|track| absolute(track))
        .filter_map(|(tick, kind)| match kind {
            TrackEventKind::Meta(MetaMessage::Tempo(us)) => Some((tick, us.as_int())),
            _ => None,
        })
        .collect();
    tempos.sort_by_key(|&(tick, _)| tick);
    if tempos.first().is_none_or(|&(tick, _)| tick > 0) {
        tempos.insert(0, (0, DEFAULT_TEMPO));
    }
    for (tick, us) in tempos {
        if us == 0 {
            return Err(FormatError::invalid_value("MIDI tempo", "0").into());
        }
        let bpm = 15.0 * f64::from(division) * 1e6 / f64::from(us);
        timeline.add_bpm(tick as f64, bpm)?;
    }
    Ok(())
}

/// Notes and phrase ends of one track, in tick order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum VocalEvent {
    PhraseEnd { tick: u64 },
    Sung { begin: u64, end: u64, key: u8 },
}

impl VocalEvent {
    const fn tick(self) -> u64 {
        match self {
            Self::PhraseEnd { tick } => tick,
            Self::Sung { begin, .. } => begin,
        }
    }
}

fn read_vocals(
    timeline: &Timeline,
    track: &[TrackEvent<'_>],
    ctx: &mut ParseContext<'_>,
) -> Result<Vec<Note>> {
    let mut lyrics: BTreeMap<u64, String> = BTreeMap::new();
    let mut events = Vec::new();
    let mut open: [Option<u64>; 128] = [None; 128];
    for (tick, kind) in absolute(track) {
        let (key, on) = match kind {
            TrackEventKind::Meta(MetaMessage::Lyric(text) | MetaMessage::Text(text)) => {
                let text = String::from_utf8_lossy(text);
                // Bracketed text events are animation cues.
                if !text.starts_with('[') {
                    lyrics.entry(tick).or_insert_with(|| text.into_owned());
                }
                continue;
            }
            TrackEventKind::Midi {
                message: MidiMessage::NoteOn { key, vel },
                ..
            } => (key.as_int(), vel.as_int() > 0),
            TrackEventKind::Midi {
                message: MidiMessage::NoteOff { key, .. },
                ..
            } => (key.as_int(), false),
            _ => continue,
        };
        let Some(slot) = open.get_mut(usize::from(key)) else {
            continue;
        };
        if on {
            *slot = Some(tick);
            continue;
        }
        let Some(begin) = slot.take() else {
            continue;
        };
        if PITCHED_KEYS.contains(&key) {
            events.push(VocalEvent::Sung {
                begin,
                end: tick,
                key,
            });
        } else if PHRASE_KEYS.contains(&key) {
            events.push(VocalEvent::PhraseEnd { tick });
        }
    }
    events.sort_by_key(|event| (event.tick(), *event));

    let mut notes: Vec<Note> = Vec::new();
    for event in events {
        match event {
            VocalEvent::PhraseEnd { tick } => {
                if notes.last().is_some_and(|note| !note.is_sleep()) {
                    notes.push(Note::sleep(timeline.ts_time(tick as f64)?));
                }
            }
            VocalEvent::Sung { begin, end, key } => {
                let Some(lyric) = lyrics.get(&begin) else {
                    ctx.warn(ChartWarning::NoteWithoutLyric(begin));
                    continue;
                };
                let (syllable, note_type) = decode_lyric(lyric);
                let pitch = f64::from(key);
                let mut note = Note::new(
                    timeline.ts_time(begin as f64)?,
                    timeline.ts_time(end as f64)?,
                    pitch,
                    syllable,
                    note_type,
                );
                if note_type == NoteType::Slide {
                    note.note_prev = notes
                        .iter()
                        .rev()
                        .find(|prev| !prev.is_sleep())
                        .map_or(pitch, |prev| prev.note);
                }
                notes.push(note);
            }
        }
    }
    Ok(notes)
}

/// Splits the markers off a lyric event.
fn decode_lyric(raw: &str) -> (String, NoteType) {
    let text = raw.trim();
    if text == "+" {
        return ("~".to_string(), NoteType::Slide);
    }
    let (text, note_type) = match text.strip_suffix(['#', '^']) {
        Some(stripped) => (stripped, NoteType::Freestyle),
        None => (text, NoteType::Normal),
    };
    let text = text.strip_suffix('-').unwrap_or(text);
    (text.replace('=', "-"), note_type)
}

#[cfg(test)]
mod tests {
    use midly::{
        Format, Header,
        num::{u4, u7, u15, u24, u28},
    };
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::ParseConfig;

    fn meta(delta: u32, message: MetaMessage<'static>) -> TrackEvent<'static> {
        TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Meta(message),
        }
    }

    fn key(delta: u32, key: u8, on: bool) -> TrackEvent<'static> {
        let message = if on {
            MidiMessage::NoteOn {
                key: u7::new(key),
                vel: u7::new(100),
            }
        } else {
            MidiMessage::NoteOff {
                key: u7::new(key),
                vel: u7::new(0),
            }
        };
        TrackEvent {
            delta: u28::new(delta),
            kind: TrackEventKind::Midi {
                channel: u4::new(0),
                message,
            },
        }
    }

    fn write(tracks: Vec<Vec<TrackEvent<'static>>>) -> Vec<u8> {
        let mut smf = Smf::new(Header::new(Format::Parallel, Timing::Metrical(u15::new(480))));
        smf.tracks = tracks;
        let mut bytes = Vec::new();
        smf.write_std(&mut bytes).unwrap();
        bytes
    }

    fn sample() -> Vec<u8> {
        let conductor = vec![
            meta(0, MetaMessage::Tempo(u24::new(500_000))),
            meta(0, MetaMessage::EndOfTrack),
        ];
        let guitar = vec![
            meta(0, MetaMessage::TrackName(b"PART GUITAR")),
            meta(0, MetaMessage::EndOfTrack),
        ];
        let vocals = vec![
            meta(0, MetaMessage::TrackName(b"PART VOCALS")),
            key(0, 105, true),
            meta(0, MetaMessage::Lyric(b"Hel-")),
            key(0, 60, true),
            key(240, 60, false),
            meta(0, MetaMessage::Lyric(b"+")),
            key(0, 62, true),
            key(240, 62, false),
            key(0, 105, false),
            meta(480, MetaMessage::Lyric(b"yeah#")),
            key(0, 64, true),
            key(480, 64, false),
            key(0, 70, true),
            key(240, 70, false),
            meta(0, MetaMessage::EndOfTrack),
        ];
        write(vec![conductor, guitar, vocals])
    }

    #[test]
    fn header_lists_tracks() {
        let mut song = Song::new("song.ini");
        parse_header(&mut song, &sample()).unwrap();
        assert_eq!(song.instrument_tracks, vec!["PART GUITAR".to_string()]);
        assert!(song.vocal_tracks.contains_key(track_name::LEAD));
        let event = &song.timeline.events()[0];
        assert!((event.bpm() - 14400.0).abs() < 1e-6);
    }

    #[test]
    fn vocals_with_phrases_and_markers() {
        let config = ParseConfig::default();
        let mut ctx = ParseContext::new(&config);
        let mut song = Song::new("song.ini");
        parse_notes(&mut song, &sample(), &mut ctx).unwrap();
        let notes = &song.vocal_tracks[track_name::LEAD].notes;
        let summary: Vec<_> = notes
            .iter()
            .map(|n| (n.syllable.as_str(), n.note_type))
            .collect();
        assert_eq!(
            summary,
            vec![
                ("Hel", NoteType::Normal),
                ("~", NoteType::Slide),
                ("", NoteType::Sleep),
                ("yeah", NoteType::Freestyle),
            ]
        );
        assert!((notes[0].begin - 0.0).abs() < 1e-9);
        assert!((notes[0].end - 0.25).abs() < 1e-9);
        assert!((notes[1].note_prev - 60.0).abs() < 1e-9);
        assert!((notes[2].begin - 0.5).abs() < 1e-9);
        assert!((notes[3].begin - 1.0).abs() < 1e-9);
        assert_eq!(ctx.warnings.len(), 1);
        assert_eq!(ctx.beat_stride, Some(480.0));
    }

    #[test]
    fn harmony_names() {
        assert_eq!(vocal_track("HARM2"), Some(track_name::harmonic(2)));
        assert_eq!(vocal_track("PART HARM3"), Some(track_name::harmonic(3)));
        assert_eq!(vocal_track("HARM4"), None);
        assert_eq!(vocal_track("PART DRUMS"), None);
    }

    #[test]
    fn lyric_markers() {
        assert_eq!(decode_lyric("a="), ("a-".to_string(), NoteType::Normal));
        assert_eq!(decode_lyric("la^"), ("la".to_string(), NoteType::Freestyle));
    }
}
