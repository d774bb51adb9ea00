//! UltraStar `.txt` charts.
//!
//! ```text
//! #TITLE:Song
//! #ARTIST:Someone
//! #BPM:300
//! #GAP:1200
//! : 0 4 59 Hel
//! * 4 4 61 lo
//! - 10
//! E
//! ```
//!
//! Note timestamps are sixteenths of the `#BPM` beat. `P1`, `P2` and `P3` lines switch
//! between the parts of a duet, `P3` addressing both singers.

use crate::{
    cursor::{Line, LineCursor},
    error::{ChartError, FormatError, Result},
    model::{Note, NoteType, Song, StemRole, VocalTrack, track_name},
    util::parse_field,
};

use super::{DialectParser, ParseContext, SourceWarning};

/// Parser of one UltraStar chart text.
#[derive(Debug)]
pub struct TxtParser<'a> {
    source: &'a str,
}

impl<'a> TxtParser<'a> {
    /// A parser over decoded chart text.
    #[must_use]
    pub const fn new(source: &'a str) -> Self {
        Self { source }
    }
}

/// Walks the `#KEY:VALUE` lines at the top of the file, leaving `cursor` at the first note.
fn read_header<'a>(
    cursor: &mut LineCursor<'a>,
    ctx: &mut ParseContext<'_>,
    mut on_field: impl FnMut(&Line<'a>, &str, &'a str, &mut ParseContext<'_>) -> Result<()>,
) -> Result<()> {
    while let Some(line) = cursor.peek_line() {
        let text = line.text.trim();
        if !text.is_empty() && !text.starts_with('#') {
            break;
        }
        cursor.next_line();
        ctx.line = line.number;
        let Some(field) = text.strip_prefix('#') else {
            continue;
        };
        let Some((key, value)) = field.split_once(':') else {
            ctx.warn_line(&line, SourceWarning::UnexpectedLine);
            continue;
        };
        let value = value.trim();
        if key.trim().is_empty() || value.is_empty() {
            continue;
        }
        on_field(&line, &key.trim().to_ascii_uppercase(), value, ctx)?;
    }
    Ok(())
}

impl DialectParser for TxtParser<'_> {
    fn parse_header(&mut self, song: &mut Song, ctx: &mut ParseContext<'_>) -> Result<()> {
        let mut cursor = LineCursor::new(self.source);
        let mut bpm = None;
        let mut gap = None;
        read_header(&mut cursor, ctx, |line, key, value, ctx| {
            match key {
                "TITLE" => song.title = value.to_string(),
                "ARTIST" => song.artist = value.to_string(),
                "EDITION" => song.edition = value.to_string(),
                "GENRE" => song.genre = value.to_string(),
                "CREATOR" | "AUTHOR" => song.creator = value.to_string(),
                "LANGUAGE" => song.language = value.to_string(),
                "TAGS" => song.tags = value.to_string(),
                "PROVIDEDBY" => song.provided_by = value.to_string(),
                "YEAR" => song.year = Some(parse_field(key, value)?),
                "COVER" => song.cover = Some(song.resolve(value)),
                "BACKGROUND" => song.background = Some(song.resolve(value)),
                "VIDEO" => song.video = Some(song.resolve(value)),
                "MP3" | "AUDIO" => {
                    let path = song.resolve(value);
                    song.music.insert(StemRole::Background, path);
                }
                "VOCALS" => {
                    let path = song.resolve(value);
                    song.music.insert(StemRole::VocalLead, path);
                }
                "VIDEOGAP" => song.video_gap = parse_field(key, value)?,
                "START" => song.start = parse_field(key, value)?,
                "PREVIEWSTART" => song.preview_start = Some(parse_field(key, value)?),
                "GAP" => gap = Some(parse_field::<f64>(key, value)? / 1000.0),
                "BPM" => bpm = Some(parse_field::<f64>(key, value)?),
                "RELATIVE" => {
                    parse_field::<bool>(key, value)?;
                }
                "P1" | "DUETSINGERP1" => {
                    song.insert_vocal_track(track_name::LEAD).singer = Some(value.to_string());
                }
                "P2" | "DUETSINGERP2" => {
                    song.insert_vocal_track(track_name::DUET_SECOND).singer =
                        Some(value.to_string());
                }
                "ENCODING" | "VERSION" | "RESOLUTION" | "NOTESGAP" | "INSTRUMENTAL"
                | "MEDLEYSTARTBEAT" | "MEDLEYENDBEAT" | "CALCMEDLEY" | "COMMENT" => {}
                _ => ctx.warn_line(line, SourceWarning::UnknownHeader(key.to_string())),
            }
            Ok(())
        })?;

        if song.title.trim().is_empty() {
            return Err(ChartError::MissingField("TITLE"));
        }
        if song.artist.trim().is_empty() {
            return Err(ChartError::MissingField("ARTIST"));
        }
        let bpm = bpm.ok_or(ChartError::MissingField("BPM"))?;
        if let Some(gap) = gap {
            song.timeline.set_gap(gap);
        }
        song.timeline.add_bpm(0.0, bpm)?;
        song.insert_vocal_track(track_name::LEAD);
        Ok(())
    }

    fn parse_notes(&mut self, song: &mut Song, ctx: &mut ParseContext<'_>) -> Result<()> {
        let mut cursor = LineCursor::new(self.source);
        let mut relative = false;
        let mut singers = [None, None];
        read_header(&mut cursor, ctx, |_, key, value, _| {
            match key {
                "RELATIVE" => relative = parse_field(key, value)?,
                "P1" | "DUETSINGERP1" => singers[0] = Some(value.to_string()),
                "P2" | "DUETSINGERP2" => singers[1] = Some(value.to_string()),
                _ => {}
            }
            Ok(())
        })?;

        song.insert_vocal_track(track_name::LEAD).singer = singers[0].take();
        let mut notes = NoteReader {
            relative,
            part: Part::First,
            second_singer: singers[1].take(),
            relative_shift: 0,
            prev_time: [0.0; 2],
        };
        for line in cursor {
            ctx.line = line.number;
            if line.text.trim().is_empty() {
                continue;
            }
            if !notes.read_line(song, &line, ctx)? {
                break;
            }
        }

        if song.vocal_tracks.contains_key(track_name::DUET_SECOND) {
            song.insert_vocal_track(track_name::TOGETHER);
        }
        Ok(())
    }
}

/// Which duet part note lines go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    First,
    Second,
    Both,
}

impl Part {
    fn tracks(self) -> &'static [(usize, &'static str)] {
        match self {
            Self::First => &[(0, track_name::LEAD)],
            Self::Second => &[(1, track_name::DUET_SECOND)],
            Self::Both => &[(0, track_name::LEAD), (1, track_name::DUET_SECOND)],
        }
    }
}

struct NoteReader {
    relative: bool,
    part: Part,
    second_singer: Option<String>,
    relative_shift: i64,
    /// End of the last accepted note per part.
    prev_time: [f64; 2],
}

impl NoteReader {
    /// Handles one non-empty note line. Returns `false` at the end marker.
    fn read_line(
        &mut self,
        song: &mut Song,
        line: &Line<'_>,
        ctx: &mut ParseContext<'_>,
    ) -> Result<bool> {
        let text = line.text.trim_start();
        let mut chars = text.chars();
        let Some(marker) = chars.next() else {
            return Ok(true);
        };
        let rest = chars.as_str();
        match marker {
            '#' => Err(FormatError::malformed("Key found in the middle of notes").into()),
            'E' => Ok(false),
            'B' => {
                let mut fields = rest.split_whitespace();
                let (Some(ts), Some(bpm)) = (fields.next(), fields.next()) else {
                    return Err(FormatError::malformed("Invalid BPM line format").into());
                };
                let ts = parse_field::<i64>("BPM change timestamp", ts)?;
                let bpm = parse_field::<f64>("BPM change", bpm)?;
                song.timeline.add_bpm(ts as f64, bpm)?;
                Ok(true)
            }
            'P' => {
                self.part = match parse_field::<u32>("duet part", rest)? {
                    1 => Part::First,
                    2 => Part::Second,
                    3 => Part::Both,
                    _ => return Err(FormatError::malformed("Invalid duet part").into()),
                };
                if self.part != Part::First {
                    let singer = self.second_singer.clone();
                    let track = song.insert_vocal_track(track_name::DUET_SECOND);
                    if track.singer.is_none() {
                        track.singer = singer;
                    }
                }
                self.relative_shift = 0;
                self.prev_time = [0.0; 2];
                Ok(true)
            }
            _ => {
                let note_type = NoteType::from_txt_marker(marker)
                    .ok_or_else(|| FormatError::malformed("Unknown note type"))?;
                let note = self.read_note(song, note_type, rest, ctx)?;
                for &(slot, name) in self.part.tracks() {
                    let track = song.insert_vocal_track(name);
                    push_note(track, &mut self.prev_time[slot], note.clone(), line, ctx)?;
                }
                Ok(true)
            }
        }
    }

    fn read_note(
        &mut self,
        song: &Song,
        note_type: NoteType,
        rest: &str,
        ctx: &mut ParseContext<'_>,
    ) -> Result<Note> {
        let mut fields = NoteFields(rest);
        let mut note = Note {
            note_type,
            ..Note::default()
        };
        let mut ts = fields.int().ok_or_else(invalid_note)?;
        let end = if note_type == NoteType::Sleep {
            let mut end = fields.int().unwrap_or(ts);
            if self.relative {
                ts = shifted(ts, self.relative_shift)?;
                end = shifted(end, self.relative_shift)?;
                self.relative_shift = end;
            }
            end
        } else {
            let length = fields.int().ok_or_else(invalid_note)?;
            note.note = fields.int().ok_or_else(invalid_note)? as f64;
            note.note_prev = note.note;
            note.syllable = fields.syllable().to_string();
            if self.relative {
                ts = shifted(ts, self.relative_shift)?;
            }
            shifted(ts, length)?
        };
        note.begin = song.timeline.ts_time(ts as f64)?;
        note.end = song.timeline.ts_time(end as f64)?;
        ctx.reach(end as f64);
        Ok(note)
    }
}

fn invalid_note() -> ChartError {
    FormatError::malformed("Invalid note line format").into()
}

fn shifted(ts: i64, by: i64) -> Result<i64> {
    ts.checked_add(by).ok_or_else(invalid_note)
}

/// Applies the overlap workarounds and appends `note` to `track`.
fn push_note(
    track: &mut VocalTrack,
    prev_time: &mut f64,
    mut note: Note,
    line: &Line<'_>,
    ctx: &mut ParseContext<'_>,
) -> Result<()> {
    if note.begin < *prev_time {
        let before_last_end = track
            .notes
            .len()
            .checked_sub(2)
            .and_then(|i| track.notes.get(i))
            .map(|n| n.end);
        let Some(prev) = track.notes.last_mut() else {
            return Err(FormatError::malformed("The first note has negative timestamp").into());
        };
        // Songs often place sleeps at semi-random timestamps.
        if prev.is_sleep() {
            prev.end = prev.begin;
            if before_last_end.is_some_and(|end| end < note.begin) {
                prev.begin = note.begin;
                prev.end = note.begin;
            }
        }
        if prev.begin <= note.begin {
            prev.end = note.begin;
            if !prev.is_sleep() {
                ctx.warn_line(line, SourceWarning::PreviousNoteShortened);
            }
        } else {
            ctx.warn_line(line, SourceWarning::OverlappingNoteSkipped);
            return Ok(());
        }
    }
    let prev_end = std::mem::replace(prev_time, note.end);
    if note.is_sleep() {
        if track.notes.is_empty() {
            return Ok(());
        }
        note.begin = prev_end;
        note.end = prev_end;
    }
    track.push(note);
    Ok(())
}

/// Whitespace-separated integers followed by a syllable.
struct NoteFields<'a>(&'a str);

impl<'a> NoteFields<'a> {
    fn int(&mut self) -> Option<i64> {
        let rest = self.0.trim_start();
        let end = rest
            .char_indices()
            .find(|&(i, c)| !(c.is_ascii_digit() || (i == 0 && c == '-')))
            .map_or(rest.len(), |(i, _)| i);
        let value = rest.get(..end)?.parse().ok()?;
        self.0 = rest.get(end..)?;
        Some(value)
    }

    /// Everything after the single separating space, which keeps word-boundary spaces intact.
    fn syllable(&self) -> &'a str {
        self.0.strip_prefix(' ').unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn note_fields_keep_syllable_spaces() {
        let mut fields = NoteFields(" 12 4 -3  lo ");
        assert_eq!(fields.int(), Some(12));
        assert_eq!(fields.int(), Some(4));
        assert_eq!(fields.int(), Some(-3));
        assert_eq!(fields.syllable(), " lo ");
    }

    #[test]
    fn note_fields_missing_numbers() {
        let mut fields = NoteFields(" 12");
        assert_eq!(fields.int(), Some(12));
        assert_eq!(fields.int(), None);
        assert_eq!(fields.syllable(), "");
    }
}
