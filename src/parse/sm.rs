//! StepMania `.sm` charts.
//!
//! Fields are `#NAME:value;` and may span lines. Each `#NOTES` field holds one dance chart:
//! `style:description:difficulty:meter:radar:data`, where data is a list of measures
//! separated by `,`, each measure a list of equally spaced rows with one character per panel.

use crate::{
    cursor::{Line, LineCursor},
    error::{ChartError, FormatError, Result},
    model::{DanceDifficulty, DanceNote, DanceNoteKind, DanceTrack, Song, StemRole},
    util::parse_field,
};

use super::{DialectParser, ParseContext, SourceWarning};

/// Beat timestamps per StepMania beat.
const TS_PER_BEAT: f64 = 4.0;

/// Parser of one StepMania chart text.
#[derive(Debug)]
pub struct SmParser<'a> {
    source: &'a str,
}

impl<'a> SmParser<'a> {
    /// A parser over decoded chart text.
    #[must_use]
    pub const fn new(source: &'a str) -> Self {
        Self { source }
    }
}

/// A `#NAME:value;` field.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Field<'a> {
    /// Upper-cased name.
    name: String,
    value: String,
    /// Line the field starts on.
    line: Line<'a>,
}

/// Splits the source into fields, dropping `//` comments.
fn fields(source: &str) -> Vec<Field<'_>> {
    let mut fields: Vec<Field<'_>> = Vec::new();
    let mut open = false;
    for line in LineCursor::new(source) {
        let text = line.text.split("//").next().unwrap_or_default();
        let mut rest = text;
        // A `#` opens a new field even when the previous one lacks its `;`.
        if let Some(start) = text.trim_start().strip_prefix('#') {
            let (name, value) = start.split_once(':').unwrap_or((start, ""));
            fields.push(Field {
                name: name.trim().to_ascii_uppercase(),
                value: String::new(),
                line,
            });
            open = true;
            rest = value;
        } else if !open {
            continue;
        }
        let Some(field) = fields.last_mut() else {
            continue;
        };
        let (value, closed) = match rest.split_once(';') {
            Some((value, _)) => (value, true),
            None => (rest, false),
        };
        if !field.value.is_empty() {
            field.value.push('\n');
        }
        field.value.push_str(value);
        if closed {
            open = false;
        }
    }
    fields
}

impl DialectParser for SmParser<'_> {
    fn parse_header(&mut self, song: &mut Song, ctx: &mut ParseContext<'_>) -> Result<()> {
        let mut subtitle = String::new();
        let mut bpms = None;
        for field in fields(self.source) {
            ctx.line = field.line.number;
            let value = field.value.trim();
            match field.name.as_str() {
                "TITLE" => song.title = value.to_string(),
                "SUBTITLE" => subtitle = value.to_string(),
                "ARTIST" => song.artist = value.to_string(),
                "GENRE" => song.genre = value.to_string(),
                "CREDIT" => song.creator = value.to_string(),
                "BANNER" if !value.is_empty() => song.cover = Some(song.resolve(value)),
                "BACKGROUND" if !value.is_empty() => song.background = Some(song.resolve(value)),
                "MUSIC" if !value.is_empty() => {
                    let path = song.resolve(value);
                    song.music.insert(StemRole::Background, path);
                }
                "OFFSET" if !value.is_empty() => {
                    let offset: f64 = parse_field("OFFSET", value)?;
                    song.timeline.set_gap(-offset);
                }
                "SAMPLESTART" if !value.is_empty() => {
                    song.preview_start = Some(parse_field("SAMPLESTART", value)?);
                }
                "BPMS" => bpms = Some(value.to_string()),
                "STOPS" | "FREEZES" if !value.is_empty() => {
                    ctx.warn_line(&field.line, SourceWarning::Unsupported(field.name.clone()));
                }
                "NOTES" | "STOPS" | "FREEZES" | "BANNER" | "BACKGROUND" | "MUSIC" | "OFFSET"
                | "SAMPLESTART" | "SAMPLELENGTH" | "TITLETRANSLIT" | "SUBTITLETRANSLIT"
                | "ARTISTTRANSLIT" | "CDTITLE" | "LYRICSPATH" | "SELECTABLE" | "DISPLAYBPM"
                | "BGCHANGES" | "FGCHANGES" | "KEYSOUNDS" | "ATTACKS" | "MUSICLENGTH" => {}
                name => ctx.warn_line(&field.line, SourceWarning::UnknownHeader(name.to_string())),
            }
        }
        if !subtitle.is_empty() {
            song.title = format!("{} ({subtitle})", song.title);
        }
        if song.title.trim().is_empty() {
            return Err(ChartError::MissingField("TITLE"));
        }
        if song.artist.trim().is_empty() {
            return Err(ChartError::MissingField("ARTIST"));
        }
        let bpms = bpms
            .filter(|bpms| !bpms.trim().is_empty())
            .ok_or(ChartError::MissingField("BPMS"))?;
        add_bpms(song, &bpms)
    }

    fn parse_notes(&mut self, song: &mut Song, ctx: &mut ParseContext<'_>) -> Result<()> {
        ctx.beat_stride = Some(TS_PER_BEAT);
        let fields = fields(self.source);
        // Only the first tempo survives between phases.
        if let Some(bpms) = fields.iter().find(|field| field.name == "BPMS") {
            ctx.line = bpms.line.number;
            add_bpms(song, &bpms.value)?;
        }
        for field in fields {
            if field.name != "NOTES" {
                continue;
            }
            ctx.line = field.line.number;
            let parts: Vec<&str> = field.value.splitn(6, ':').map(str::trim).collect();
            let [style, description, difficulty, meter, _radar, data] = parts.as_slice() else {
                return Err(FormatError::malformed("#NOTES needs six `:` separated parts").into());
            };
            let Some(difficulty) = DanceDifficulty::from_name(difficulty) else {
                ctx.warn_line(
                    &field.line,
                    SourceWarning::Unsupported(format!("difficulty {difficulty}")),
                );
                continue;
            };
            let meter = parse_field::<u32>("meter", meter).unwrap_or_else(|_| {
                ctx.warn_line(
                    &field.line,
                    SourceWarning::InvalidValue {
                        field: "meter".to_string(),
                        value: (*meter).to_string(),
                    },
                );
                0
            });
            let notes = read_steps(song, data, ctx)?;
            song.dance_tracks.insert(
                (style.to_string(), difficulty),
                DanceTrack {
                    style: style.to_string(),
                    difficulty,
                    description: description.to_string(),
                    meter,
                    notes,
                },
            );
        }
        Ok(())
    }
}

/// Adds the `beat=bpm` pairs of `#BPMS` to the timeline.
fn add_bpms(song: &mut Song, bpms: &str) -> Result<()> {
    for entry in bpms.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (beat, bpm) = entry
            .split_once('=')
            .ok_or_else(|| FormatError::invalid_value("BPMS", entry))?;
        let beat: f64 = parse_field("BPMS beat", beat)?;
        let bpm: f64 = parse_field("BPMS tempo", bpm)?;
        song.timeline.add_bpm(beat * TS_PER_BEAT, bpm)?;
    }
    Ok(())
}

/// Decodes the measure data of one chart.
fn read_steps(song: &Song, data: &str, ctx: &mut ParseContext<'_>) -> Result<Vec<DanceNote>> {
    let mut notes: Vec<DanceNote> = Vec::new();
    // Index of the hold or roll awaiting its tail, per column.
    let mut pending: Vec<Option<usize>> = Vec::new();
    for (measure, rows) in data.split(',').enumerate() {
        let rows: Vec<&str> = rows
            .lines()
            .map(str::trim)
            .filter(|row| !row.is_empty())
            .collect();
        let count = rows.len() as f64;
        for (i, row) in rows.iter().enumerate() {
            let ts = (measure as f64 + i as f64 / count) * 4.0 * TS_PER_BEAT;
            let time = song.timeline.ts_time(ts)?;
            if pending.len() < row.len() {
                pending.resize(row.len(), None);
            }
            for (column, step) in row.chars().enumerate() {
                let kind = match step {
                    '1' => DanceNoteKind::Tap,
                    '2' => DanceNoteKind::Hold,
                    '4' => DanceNoteKind::Roll,
                    'M' => DanceNoteKind::Mine,
                    'L' => DanceNoteKind::Lift,
                    'F' => DanceNoteKind::Fake,
                    '3' => {
                        let head = pending.get_mut(column).and_then(Option::take);
                        if let Some(note) = head.and_then(|index| notes.get_mut(index)) {
                            note.end = time;
                        }
                        ctx.reach(ts);
                        continue;
                    }
                    _ => continue,
                };
                if matches!(kind, DanceNoteKind::Hold | DanceNoteKind::Roll) {
                    if let Some(slot) = pending.get_mut(column) {
                        *slot = Some(notes.len());
                    }
                }
                notes.push(DanceNote {
                    begin: time,
                    end: time,
                    column,
                    kind,
                });
                ctx.reach(ts);
            }
        }
    }
    Ok(notes)
}
