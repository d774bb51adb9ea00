//! Aegisub `.ass` karaoke subtitles with Karaoke Mugen metadata.
//!
//! A karaoke base keeps each song in several sibling directories:
//!
//! ```text
//! base/
//! ├── lyrics/<id>.ass
//! ├── karaokes/<id>.kara.json
//! ├── medias/<video>
//! ├── tags/<name>.<tag id>.tag.json
//! ├── language-tags/…
//! └── system-tags/…
//! ```
//!
//! The subtitle only carries timing. Title, artist and the media file come from the
//! `.kara.json` sidecar, whose tags refer to tag files by identifier.

use std::{
    collections::HashMap,
    ffi::OsStr,
    path::{Path, PathBuf},
};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{
    cursor::LineCursor,
    error::{ChartError, FormatError, Result},
    model::{Note, NoteType, Song, StemRole, track_name},
    util::parse_field,
};

use super::{ChartWarning, DialectParser, ParseContext, SourceWarning};

/// Karaoke durations count in centiseconds.
const BEATS_PER_SECOND: f64 = 100.0;
/// Karaoke lines carry no pitch.
const PITCH: f64 = 30.0;
/// Directories under the base holding tag files.
const TAG_DIRECTORIES: [&str; 3] = ["tags", "language-tags", "system-tags"];

static DIALOGUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^Dialogue:\s*(?P<layer>[^,]*),(?P<start>[0-9:.]+),(?P<end>[0-9:.]+),(?P<style>[^,]*),(?P<name>[^,]*),(?P<margin_l>[^,]*),(?P<margin_r>[^,]*),(?P<margin_v>[^,]*),(?P<effect>[^,]*),(?P<text>.*)$",
    )
    .expect("dialogue pattern is valid")
});

static K_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[^}]*\\k[fko]?(\d+)[^}]*\}").expect("karaoke tag pattern is valid"));

/// Sidecar `<id>.kara.json`.
#[derive(Debug, Clone, Deserialize)]
struct KaraDocument {
    #[serde(default)]
    medias: Vec<Media>,
    data: KaraData,
}

#[derive(Debug, Clone, Deserialize)]
struct Media {
    filename: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct KaraData {
    #[serde(default)]
    titles: Map<String, Value>,
    #[serde(default)]
    titles_default_language: Option<String>,
    #[serde(default)]
    tags: KaraTags,
    #[serde(default)]
    year: Option<i64>,
}

/// Tag identifiers by category.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct KaraTags {
    versions: Vec<String>,
    singergroups: Vec<String>,
    singers: Vec<String>,
    franchises: Vec<String>,
    series: Vec<String>,
    langs: Vec<String>,
    authors: Vec<String>,
}

/// A `.tag.json` file.
#[derive(Debug, Clone, Deserialize)]
struct TagFile {
    tag: TagInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct TagInfo {
    #[serde(default)]
    name: String,
    #[serde(default)]
    i18n: Map<String, Value>,
}

impl TagInfo {
    /// The name in `language`, else the plain name, else any translation.
    fn display_name(&self, language: Option<&str>) -> Option<String> {
        let localized = language
            .and_then(|language| self.i18n.get(language))
            .and_then(Value::as_str);
        [
            localized,
            Some(self.name.as_str()),
            self.i18n.values().find_map(Value::as_str),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|name| !name.is_empty())
        .map(str::to_string)
    }

    fn plain_name(&self) -> Option<String> {
        Some(self.name.trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)?;
    let de = &mut serde_json::Deserializer::from_str(&text);
    serde_path_to_error::deserialize(de).map_err(|source| ChartError::Metadata {
        path: path.to_path_buf(),
        source,
    })
}

/// Tag identifiers are matched by their first eight characters.
fn id_prefix(id: &str) -> String {
    id.trim().chars().take(8).collect()
}

/// Index key of a tag file name: eight characters after the first `.`, or the first eight.
fn file_key(name: &str) -> String {
    let rest = name.split_once('.').map_or(name, |(_, rest)| rest);
    rest.chars().take(8).collect()
}

/// Tag files of a karaoke base by identifier prefix, with the files read so far.
#[derive(Debug, Clone, Default)]
pub struct TagIndex {
    paths: HashMap<String, PathBuf>,
    parsed: HashMap<String, Option<TagInfo>>,
}

impl TagIndex {
    /// Lists the tag directories under `base`. Missing directories are skipped, and the
    /// first file claiming a prefix keeps it.
    #[must_use]
    pub fn build(base: &Path) -> Self {
        let mut paths = HashMap::new();
        for directory in TAG_DIRECTORIES {
            let Ok(entries) = std::fs::read_dir(base.join(directory)) else {
                continue;
            };
            let mut files: Vec<PathBuf> = entries
                .filter_map(core::result::Result::ok)
                .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
                .map(|entry| entry.path())
                .collect();
            files.sort();
            for path in files {
                let Some(name) = path.file_name().and_then(OsStr::to_str) else {
                    continue;
                };
                paths.entry(file_key(name)).or_insert(path);
            }
        }
        log::debug!("indexed {} tag files under {}", paths.len(), base.display());
        Self {
            paths,
            parsed: HashMap::new(),
        }
    }

    /// Number of indexed tag files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Whether no tag file was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// The tag file for the identifier `id`.
    #[must_use]
    pub fn path(&self, id: &str) -> Option<&Path> {
        self.paths.get(&id_prefix(id)).map(PathBuf::as_path)
    }

    fn tag(&mut self, id: &str) -> Option<&TagInfo> {
        let paths = &self.paths;
        let key = id_prefix(id);
        self.parsed
            .entry(key)
            .or_insert_with_key(|key| {
                let path = paths.get(key)?;
                read_json::<TagFile>(path)
                    .inspect_err(|e| log::debug!("unreadable tag file: {e}"))
                    .ok()
                    .map(|file| file.tag)
            })
            .as_ref()
    }

    /// The readable tags among `ids`, warning about the others.
    fn resolve_all(&mut self, ids: &[String], ctx: &mut ParseContext<'_>) -> Vec<TagInfo> {
        let mut tags = Vec::new();
        for id in ids {
            match self.tag(id) {
                Some(tag) => tags.push(tag.clone()),
                None => ctx.warn(ChartWarning::TagNotFound(id.clone())),
            }
        }
        tags
    }
}

/// Parser of one karaoke subtitle.
#[derive(Debug)]
pub struct AssParser<'a> {
    source: &'a str,
    tags: &'a mut Option<TagIndex>,
}

impl<'a> AssParser<'a> {
    /// A parser over decoded subtitle text, sharing the tag index of its song parser.
    pub const fn new(source: &'a str, tags: &'a mut Option<TagIndex>) -> Self {
        Self { source, tags }
    }
}

impl DialectParser for AssParser<'_> {
    fn parse_header(&mut self, song: &mut Song, ctx: &mut ParseContext<'_>) -> Result<()> {
        let base = song.path.parent().map(Path::to_path_buf).unwrap_or_default();
        let id = song
            .filename
            .file_stem()
            .and_then(OsStr::to_str)
            .unwrap_or_default()
            .to_string();
        let metadata = base.join("karaokes").join(format!("{id}.kara.json"));
        let document: KaraDocument = read_json(&metadata)?;
        let data = &document.data;
        let language = data.titles_default_language.as_deref();
        let tags = self.tags.get_or_insert_with(|| TagIndex::build(&base));

        let title = [language, Some("eng")]
            .into_iter()
            .flatten()
            .filter_map(|key| data.titles.get(key))
            .chain(data.titles.values())
            .filter_map(Value::as_str)
            .map(str::trim)
            .find(|title| !title.is_empty())
            .ok_or(ChartError::MissingField("title"))?;
        song.title = title.to_string();

        let series = tags.resolve_all(&data.tags.series, ctx);
        let artist = [
            &data.tags.singers,
            &data.tags.singergroups,
            &data.tags.franchises,
        ]
        .into_iter()
        .find_map(|ids| {
            tags.resolve_all(ids, ctx)
                .iter()
                .find_map(|tag| tag.display_name(language))
        })
        .or_else(|| series.iter().find_map(|tag| tag.display_name(language)))
        .ok_or(ChartError::MissingField("artist"))?;
        song.artist = artist;

        song.language = tags
            .resolve_all(&data.tags.langs, ctx)
            .iter()
            .filter_map(|tag| tag.i18n.get("eng").and_then(Value::as_str))
            .map(str::trim)
            .find(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_default();
        song.creator = tags
            .resolve_all(&data.tags.authors, ctx)
            .iter()
            .find_map(TagInfo::plain_name)
            .unwrap_or_default();
        song.tags = series
            .iter()
            .find_map(TagInfo::plain_name)
            .unwrap_or_default();

        let versions: Vec<String> = tags
            .resolve_all(&data.tags.versions, ctx)
            .iter()
            .filter_map(TagInfo::plain_name)
            .collect();
        let has = |name: &str| versions.iter().any(|version| version == name);
        if has("Full") {
            song.title.push_str(" (Full Size)");
        }
        if has("Off Vocal") {
            song.title.push_str(" (Instrumental)");
        }
        for extra in ["Alternative", "Creditless"] {
            if has(extra) {
                if !song.tags.is_empty() {
                    song.tags.push_str(", ");
                }
                song.tags.push_str(extra);
            }
        }

        song.year = data
            .year
            .and_then(|year| u32::try_from(year).ok())
            .filter(|&year| year != 0);
        song.provided_by = "Kara.Moe".to_string();

        match document.medias.first() {
            Some(media) => {
                let path = base.join("medias").join(&media.filename);
                song.music.insert(StemRole::Background, path.clone());
                song.video = Some(path.clone());
                if !path.is_file() {
                    ctx.missing_resource(path);
                }
            }
            None => ctx.missing_resource(base.join("medias")),
        }

        song.timeline.add_bpm(0.0, BEATS_PER_SECOND * 15.0)?;
        song.insert_vocal_track(track_name::LEAD);
        Ok(())
    }

    fn parse_notes(&mut self, song: &mut Song, ctx: &mut ParseContext<'_>) -> Result<()> {
        song.timeline.add_bpm(0.0, BEATS_PER_SECOND * 15.0)?;
        song.insert_vocal_track(track_name::LEAD);
        let mut styles = StyleMap::default();
        let mut in_events = false;
        for line in LineCursor::new(self.source) {
            ctx.line = line.number;
            if line.text.contains("[Events]") {
                in_events = true;
                continue;
            }
            if !in_events {
                continue;
            }
            let Some(caps) = DIALOGUE.captures(line.text.trim_end()) else {
                continue;
            };
            let start = parse_time(group(&caps, "start"))?;
            let end = parse_time(group(&caps, "end"))?;
            let style = group(&caps, "style").trim();
            let span = (song.timeline.ts_time(start)?, song.timeline.ts_time(end)?);
            let Some(name) = styles.assign(song, style, span) else {
                ctx.warn_line(&line, SourceWarning::DuetLineDiscarded(style.to_string()));
                continue;
            };
            read_syllables(song, name, start, group(&caps, "text"), ctx)?;
        }
        if song.vocal_tracks.contains_key(track_name::DUET_SECOND) {
            song.insert_vocal_track(track_name::TOGETHER);
        }
        Ok(())
    }
}

fn group<'t>(caps: &Captures<'t>, name: &str) -> &'t str {
    caps.name(name).map_or("", |m| m.as_str())
}

/// `h:mm:ss.cc` in centiseconds.
fn parse_time(text: &str) -> Result<f64> {
    let field = |value: &str| parse_field::<u32>("time", value).map(f64::from);
    let mut parts = text.trim().splitn(3, ':');
    let (Some(hours), Some(minutes), Some(seconds)) = (parts.next(), parts.next(), parts.next())
    else {
        return Err(FormatError::invalid_value("time", text).into());
    };
    let (seconds, centis) = seconds.split_once('.').unwrap_or((seconds, "0"));
    Ok(((field(hours)? * 60.0 + field(minutes)?) * 60.0 + field(seconds)?) * BEATS_PER_SECOND
        + field(centis)?)
}

/// Which vocal track each subtitle style sings on.
#[derive(Debug, Default)]
struct StyleMap {
    assigned: HashMap<String, &'static str>,
    detected: usize,
}

impl StyleMap {
    /// The track for a line of `style` spanning `span` seconds, or `None` when the style is
    /// new and overlaps both tracks.
    fn assign(&mut self, song: &mut Song, style: &str, span: (f64, f64)) -> Option<&'static str> {
        if let Some(&name) = self.assigned.get(style) {
            return Some(name);
        }
        let name = if self.detected < 2 {
            let name = if self.detected == 0 {
                track_name::LEAD
            } else {
                track_name::DUET_SECOND
            };
            self.detected += 1;
            song.insert_vocal_track(name).singer = Some(style.to_string());
            name
        } else {
            [track_name::LEAD, track_name::DUET_SECOND]
                .into_iter()
                .find(|name| {
                    song.vocal_tracks
                        .get(*name)
                        .is_some_and(|track| !track.overlaps(span.0, span.1))
                })?
        };
        self.assigned.insert(style.to_string(), name);
        Some(name)
    }
}

/// Turns the `\k` tags of one line into notes on track `name`, starting at `start`
/// centiseconds.
fn read_syllables(
    song: &mut Song,
    name: &str,
    start: f64,
    text: &str,
    ctx: &mut ParseContext<'_>,
) -> Result<()> {
    let mut cursor = start;
    let mut notes = Vec::new();
    for caps in K_TAG.captures_iter(text) {
        let (Some(tag), Some(duration)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let duration = f64::from(parse_field::<u32>("karaoke duration", duration.as_str())?);
        let rest = text.get(tag.end()..).unwrap_or_default();
        let syllable = rest
            .find(['\\', '{'])
            .and_then(|end| rest.get(..end))
            .unwrap_or(rest);
        let length = if duration > 1.0 { duration - 1.0 } else { duration };
        if !syllable.is_empty() {
            notes.push(Note::new(
                song.timeline.ts_time(cursor)?,
                song.timeline.ts_time(cursor + length)?,
                PITCH,
                syllable,
                NoteType::Normal,
            ));
        }
        cursor += duration;
    }
    ctx.reach(cursor);
    let rest = song.timeline.ts_time(cursor)?;
    let track = song.insert_vocal_track(name);
    for note in notes {
        track.push(note);
    }
    if !track.notes.is_empty() && !track.ends_with_sleep() {
        track.push(Note::sleep(rest));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::ParseConfig;

    fn notes_song() -> Song {
        let mut song = Song::new("base/lyrics/abc.ass");
        song.timeline.add_bpm(0.0, 1500.0).unwrap();
        song
    }

    #[test]
    fn times_in_centiseconds() {
        assert!((parse_time("0:00:01.00").unwrap() - 100.0).abs() < 1e-9);
        assert!((parse_time("1:02:03.45").unwrap() - 372_345.0).abs() < 1e-9);
        assert!(parse_time("12.5").is_err());
    }

    #[test]
    fn syllables_leave_a_gap() {
        let config = ParseConfig::default();
        let mut ctx = ParseContext::new(&config);
        let mut song = notes_song();
        read_syllables(&mut song, track_name::LEAD, 0.0, r"{\k50}Hel{\k50}lo", &mut ctx).unwrap();
        let spans: Vec<_> = song.vocal_tracks[track_name::LEAD]
            .notes
            .iter()
            .map(|n| (n.begin, n.end, n.syllable.as_str(), n.note_type))
            .collect();
        assert_eq!(spans.len(), 3);
        assert!((spans[0].0 - 0.0).abs() < 1e-9 && (spans[0].1 - 0.49).abs() < 1e-9);
        assert_eq!(spans[0].2, "Hel");
        assert!((spans[1].0 - 0.5).abs() < 1e-9 && (spans[1].1 - 0.99).abs() < 1e-9);
        assert_eq!(spans[1].2, "lo");
        assert_eq!(spans[2].3, NoteType::Sleep);
        assert!((spans[2].0 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_syllable_only_advances() {
        let config = ParseConfig::default();
        let mut ctx = ParseContext::new(&config);
        let mut song = notes_song();
        read_syllables(&mut song, track_name::LEAD, 100.0, r"{\k20}{\kf30}la", &mut ctx).unwrap();
        let first = &song.vocal_tracks[track_name::LEAD].notes[0];
        assert!((first.begin - 1.2).abs() < 1e-9);
        assert!((first.end - 1.49).abs() < 1e-9);
    }

    #[test]
    fn third_style_joins_a_free_track() {
        let mut song = notes_song();
        let mut styles = StyleMap::default();
        assert_eq!(styles.assign(&mut song, "A", (0.0, 1.0)), Some(track_name::LEAD));
        assert_eq!(styles.assign(&mut song, "B", (0.0, 1.0)), Some(track_name::DUET_SECOND));
        song.insert_vocal_track(track_name::LEAD)
            .push(Note::new(0.0, 1.0, PITCH, "a", NoteType::Normal));
        song.insert_vocal_track(track_name::DUET_SECOND)
            .push(Note::new(0.5, 1.5, PITCH, "b", NoteType::Normal));
        assert_eq!(styles.assign(&mut song, "C", (0.5, 1.2)), None);
        assert_eq!(styles.assign(&mut song, "C", (1.0, 1.4)), Some(track_name::LEAD));
        assert_eq!(styles.assign(&mut song, "C", (0.0, 9.0)), Some(track_name::LEAD));
        assert_eq!(
            song.vocal_tracks[track_name::DUET_SECOND].singer.as_deref(),
            Some("B")
        );
    }

    #[test]
    fn tag_file_keys() {
        assert_eq!(file_key("Aimer.c9af8c9a-1234.tag.json"), "c9af8c9a");
        assert_eq!(file_key("0123456789"), "01234567");
        assert_eq!(id_prefix("c9af8c9a-1234-5678"), "c9af8c9a");
    }
}
