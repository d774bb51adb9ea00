//! SingStar `.xml` charts.
//!
//! ```xml
//! <!-- Artist: Someone -->
//! <!-- Title: Song -->
//! <MELODY Tempo="120" Resolution="Semiquaver" Genre="Pop" Year="2008">
//!   <SENTENCE>
//!     <NOTE MidiNote="60" Duration="4" Lyric="Hel"/>
//!     <NOTE MidiNote="0" Duration="2" Lyric=""/>
//!     <NOTE MidiNote="62" Duration="4" Lyric="lo" Bonus="Yes"/>
//!   </SENTENCE>
//! </MELODY>
//! ```
//!
//! Durations count in the `Resolution` unit. Duets either wrap sentences in one `TRACK` per
//! singer or tag each sentence with a `Singer` attribute.

use roxmltree::{Document, Node};

use crate::{
    error::{ChartError, FormatError, Result},
    model::{Note, NoteType, Song, track_name},
    util::parse_field,
};

use super::{ChartWarning, DialectParser, ParseContext};

/// Beat timestamps per beat at semiquaver resolution.
const TS_PER_BEAT: f64 = 4.0;

/// Parser of one SingStar chart text.
#[derive(Debug)]
pub struct XmlParser<'a> {
    source: &'a str,
}

impl<'a> XmlParser<'a> {
    /// A parser over decoded chart text.
    #[must_use]
    pub const fn new(source: &'a str) -> Self {
        Self { source }
    }
}

fn melody<'a, 'input>(doc: &'a Document<'input>) -> Result<Node<'a, 'input>> {
    let root = doc.root_element();
    if root.tag_name().name() == "MELODY" {
        Ok(root)
    } else {
        Err(FormatError::malformed(format!("root element <{}> is not <MELODY>", root.tag_name().name())).into())
    }
}

/// Timestamps per semiquaver of the `Resolution` attribute.
fn resolution_factor(melody: Node<'_, '_>) -> Result<f64> {
    match melody.attribute("Resolution").map(str::trim) {
        None | Some("Semiquaver") => Ok(1.0),
        Some("Demisemiquaver") => Ok(2.0),
        Some(other) => Err(FormatError::invalid_value("Resolution", other).into()),
    }
}

/// A `Title:` or `Artist:` comment anywhere in the document.
fn comment_field(doc: &Document<'_>, key: &str) -> Option<String> {
    doc.descendants()
        .filter(Node::is_comment)
        .filter_map(|node| node.text())
        .find_map(|text| {
            let (name, value) = text.trim().split_once(':')?;
            (name.trim().eq_ignore_ascii_case(key) && !value.trim().is_empty())
                .then(|| value.trim().to_string())
        })
}

fn non_empty_attribute(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.attribute(name)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

impl DialectParser for XmlParser<'_> {
    fn parse_header(&mut self, song: &mut Song, _ctx: &mut ParseContext<'_>) -> Result<()> {
        let doc = Document::parse(self.source)?;
        let melody = melody(&doc)?;

        let folder = song
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.split_once(" - "))
            .map(|(artist, title)| (artist.trim().to_string(), title.trim().to_string()));
        song.title = comment_field(&doc, "Title")
            .or_else(|| non_empty_attribute(melody, "Title"))
            .or_else(|| folder.as_ref().map(|(_, title)| title.clone()))
            .filter(|title| !title.is_empty())
            .ok_or(ChartError::MissingField("Title"))?;
        song.artist = comment_field(&doc, "Artist")
            .or_else(|| non_empty_attribute(melody, "Artist"))
            .or_else(|| folder.map(|(artist, _)| artist))
            .filter(|artist| !artist.is_empty())
            .ok_or(ChartError::MissingField("Artist"))?;
        if let Some(genre) = non_empty_attribute(melody, "Genre") {
            song.genre = genre;
        }
        if let Some(year) = non_empty_attribute(melody, "Year") {
            song.year = Some(parse_field("Year", &year)?);
        }

        let tempo: f64 = parse_field(
            "Tempo",
            melody
                .attribute("Tempo")
                .ok_or(ChartError::MissingField("Tempo"))?,
        )?;
        song.timeline.add_bpm(0.0, tempo * resolution_factor(melody)?)?;
        Ok(())
    }

    fn parse_notes(&mut self, song: &mut Song, ctx: &mut ParseContext<'_>) -> Result<()> {
        let doc = Document::parse(self.source)?;
        let melody = melody(&doc)?;
        ctx.beat_stride = Some(TS_PER_BEAT * resolution_factor(melody)?);

        let mut shared = SentenceReader::default();
        let mut track_index = 0;
        for child in melody.children().filter(Node::is_element) {
            ctx.line = doc.text_pos_at(child.range().start).row as usize;
            match child.tag_name().name() {
                "SENTENCE" => {
                    let targets = singer_targets(child.attribute("Singer"));
                    shared.read(song, child, targets, ctx)?;
                }
                "TRACK" => {
                    let name = match track_index {
                        0 => track_name::LEAD,
                        1 => track_name::DUET_SECOND,
                        _ => {
                            ctx.warn(ChartWarning::UnexpectedElement("TRACK".to_string()));
                            continue;
                        }
                    };
                    track_index += 1;
                    let singer = non_empty_attribute(child, "Artist");
                    let track = song.insert_vocal_track(name);
                    if singer.is_some() {
                        track.singer = singer;
                    }
                    let mut own = SentenceReader::default();
                    for sentence in child.children().filter(Node::is_element) {
                        ctx.line = doc.text_pos_at(sentence.range().start).row as usize;
                        if sentence.tag_name().name() == "SENTENCE" {
                            own.read(song, sentence, &[name], ctx)?;
                        } else {
                            ctx.warn(ChartWarning::UnexpectedElement(
                                sentence.tag_name().name().to_string(),
                            ));
                        }
                    }
                }
                other => ctx.warn(ChartWarning::UnexpectedElement(other.to_string())),
            }
        }
        if song.vocal_tracks.contains_key(track_name::DUET_SECOND) {
            song.insert_vocal_track(track_name::TOGETHER);
        }
        Ok(())
    }
}

/// Tracks addressed by a top-level sentence.
fn singer_targets(singer: Option<&str>) -> &'static [&'static str] {
    match singer.map(str::trim) {
        Some("Solo 2") => &[track_name::DUET_SECOND],
        Some("Group") => &[track_name::LEAD, track_name::DUET_SECOND],
        _ => &[track_name::LEAD],
    }
}

/// Running timestamp of a stream of sentences.
#[derive(Debug, Default)]
struct SentenceReader {
    ts: f64,
}

impl SentenceReader {
    fn read(
        &mut self,
        song: &mut Song,
        sentence: Node<'_, '_>,
        targets: &[&str],
        ctx: &mut ParseContext<'_>,
    ) -> Result<()> {
        let mut notes = Vec::new();
        for node in sentence.children().filter(Node::is_element) {
            if node.tag_name().name() != "NOTE" {
                ctx.warn(ChartWarning::UnexpectedElement(
                    node.tag_name().name().to_string(),
                ));
                continue;
            }
            let pitch: u32 = parse_field("MidiNote", node.attribute("MidiNote").unwrap_or("0"))?;
            let duration: u32 = parse_field(
                "Duration",
                node.attribute("Duration")
                    .ok_or(ChartError::MissingField("Duration"))?,
            )?;
            let begin = self.ts;
            self.ts += f64::from(duration);
            if pitch == 0 {
                continue;
            }
            let flag = |name: &str| -> Result<bool> {
                node.attribute(name)
                    .map_or(Ok(false), |value| Ok(parse_field(name, value)?))
            };
            let note_type = if flag("FreeStyle")? {
                NoteType::Freestyle
            } else if flag("Bonus")? {
                NoteType::Golden
            } else {
                NoteType::Normal
            };
            notes.push(Note::new(
                song.timeline.ts_time(begin)?,
                song.timeline.ts_time(self.ts)?,
                f64::from(pitch),
                node.attribute("Lyric").unwrap_or_default(),
                note_type,
            ));
            ctx.reach(self.ts);
        }
        let rest = song.timeline.ts_time(self.ts)?;
        for &name in targets {
            let track = song.insert_vocal_track(name);
            for note in &notes {
                track.push(note.clone());
            }
            if !track.notes.is_empty() && !track.ends_with_sleep() {
                track.push(Note::sleep(rest));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::ParseConfig;

    const DUET: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<MELODY xmlns="http://www.singstargame.com" Tempo="120" Resolution="Demisemiquaver">
  <SENTENCE Singer="Solo 1">
    <NOTE MidiNote="60" Duration="8" Lyric="One"/>
  </SENTENCE>
  <SENTENCE Singer="Solo 2">
    <NOTE MidiNote="0" Duration="8" Lyric=""/>
    <NOTE MidiNote="62" Duration="8" Lyric="Two" Bonus="Yes"/>
  </SENTENCE>
  <SENTENCE Singer="Group">
    <NOTE MidiNote="64" Duration="8" Lyric="All" FreeStyle="Yes"/>
  </SENTENCE>
</MELODY>"#;

    #[test]
    fn title_from_directory() {
        let config = ParseConfig::default();
        let mut ctx = ParseContext::new(&config);
        let mut song = Song::new("songs/Band - Tune/notes.xml");
        XmlParser::new(DUET).parse_header(&mut song, &mut ctx).unwrap();
        assert_eq!(song.artist, "Band");
        assert_eq!(song.title, "Tune");
        assert!((song.timeline.events()[0].bpm() - 240.0).abs() < 1e-9);
    }

    #[test]
    fn singer_routing() {
        let config = ParseConfig::default();
        let mut ctx = ParseContext::new(&config);
        let mut song = Song::new("songs/Band - Tune/notes.xml");
        let mut parser = XmlParser::new(DUET);
        parser.parse_header(&mut song, &mut ctx).unwrap();
        parser.parse_notes(&mut song, &mut ctx).unwrap();

        let lead: Vec<_> = song.vocal_tracks[track_name::LEAD]
            .notes
            .iter()
            .map(|n| (n.syllable.as_str(), n.note_type))
            .collect();
        assert_eq!(
            lead,
            vec![
                ("One", NoteType::Normal),
                ("", NoteType::Sleep),
                ("All", NoteType::Freestyle),
                ("", NoteType::Sleep),
            ]
        );
        let second = &song.vocal_tracks[track_name::DUET_SECOND].notes;
        assert_eq!(second[0].syllable, "Two");
        assert_eq!(second[0].note_type, NoteType::Golden);
        // 240 bpm is 1/16 s per timestamp; the rest shifts "Two" by 8.
        assert!((second[0].begin - 1.0).abs() < 1e-9);
        assert!(song.vocal_tracks.contains_key(track_name::TOGETHER));
        assert_eq!(ctx.beat_stride, Some(8.0));
    }
}
