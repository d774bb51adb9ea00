//! Frets on Fire `song.ini` charts.
//!
//! The `[song]` section carries the metadata; notes and tempo live in the MIDI file found
//! next to it, see [`super::midi`].

use crate::{
    cursor::LineCursor,
    error::{ChartError, Result},
    model::Song,
    util::parse_field,
};

use super::{DialectParser, ParseContext, SourceWarning, midi};

/// Keys written by common editors that carry nothing a singer needs.
const IGNORED_KEYS: &[&str] = &[
    "album",
    "album_track",
    "cassettecolor",
    "count",
    "eighthnote_hopo",
    "hopo_frequency",
    "icon",
    "loading_phrase",
    "modchart",
    "playlist",
    "playlist_track",
    "pro_drums",
    "five_lane_drums",
    "song_length",
    "sub_genre",
    "track",
    "unlock_id",
    "unlock_require",
    "unlock_text",
    "version",
];

/// Parser of one `song.ini` text.
#[derive(Debug)]
pub struct IniParser<'a> {
    source: &'a str,
}

impl<'a> IniParser<'a> {
    /// A parser over decoded `song.ini` text.
    #[must_use]
    pub const fn new(source: &'a str) -> Self {
        Self { source }
    }
}

impl DialectParser for IniParser<'_> {
    fn parse_header(&mut self, song: &mut Song, ctx: &mut ParseContext<'_>) -> Result<()> {
        let mut in_song = false;
        for line in LineCursor::new(self.source) {
            ctx.line = line.number;
            let text = line.text.trim();
            if text.is_empty() || text.starts_with(';') || text.starts_with('#') {
                continue;
            }
            if let Some(section) = text.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
                in_song = section.trim().eq_ignore_ascii_case("song");
                continue;
            }
            if !in_song {
                continue;
            }
            let Some((key, value)) = text.split_once('=') else {
                ctx.warn_line(&line, SourceWarning::UnexpectedLine);
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            match key.as_str() {
                "name" => song.title = value.to_string(),
                "artist" => song.artist = value.to_string(),
                "genre" => song.genre = value.to_string(),
                "year" => song.year = Some(parse_field("year", value)?),
                "charter" | "frets" => song.creator = value.to_string(),
                "delay" => {
                    let delay: f64 = parse_field("delay", value)?;
                    song.timeline.set_gap(-delay / 1000.0);
                }
                "video" => song.video = Some(song.resolve(value)),
                "preview_start_time" => {
                    let ms: f64 = parse_field("preview_start_time", value)?;
                    song.preview_start = Some(ms / 1000.0);
                }
                "tags" => song.tags = value.to_string(),
                "language" => song.language = value.to_string(),
                other if other.starts_with("diff_") || IGNORED_KEYS.contains(&other) => {}
                other => ctx.warn_line(&line, SourceWarning::UnknownHeader(other.to_string())),
            }
        }
        if song.title.trim().is_empty() {
            return Err(ChartError::MissingField("name"));
        }
        if song.artist.trim().is_empty() {
            return Err(ChartError::MissingField("artist"));
        }
        Ok(())
    }

    fn parse_notes(&mut self, song: &mut Song, ctx: &mut ParseContext<'_>) -> Result<()> {
        let path = song
            .midi_file
            .clone()
            .ok_or_else(|| ChartError::Internal("notes requested without a MIDI file".into()))?;
        let bytes = std::fs::read(&path)?;
        midi::parse_notes(song, &bytes, ctx)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::ParseConfig;

    #[test]
    fn reads_song_section_only() {
        const SOURCE: &str = "[other]\nname = Wrong\n\n[Song]\nName = Right\nartist = Band\ndelay = 250\npreview_start_time = 12000\ndiff_band = 3\nfoo = bar\n";
        let config = ParseConfig::default();
        let mut ctx = ParseContext::new(&config);
        let mut song = Song::new("songs/x/song.ini");
        IniParser::new(SOURCE)
            .parse_header(&mut song, &mut ctx)
            .unwrap();
        assert_eq!(song.title, "Right");
        assert_eq!(song.artist, "Band");
        assert_eq!(song.timeline.gap(), -0.25);
        assert_eq!(song.preview_start, Some(12.0));
        assert_eq!(ctx.warnings.len(), 1);
    }

    #[test]
    fn name_is_required() {
        let config = ParseConfig::default();
        let mut ctx = ParseContext::new(&config);
        let mut song = Song::new("song.ini");
        let err = IniParser::new("[song]\nartist = Band\n")
            .parse_header(&mut song, &mut ctx)
            .unwrap_err();
        assert!(matches!(err, ChartError::MissingField("name")));
    }
}
