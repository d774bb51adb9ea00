//! Loading songs in two phases.
//!
//! Song browsers need titles, artists and cover art for thousands of songs, but notes only
//! for the one being played. [`SongParser::load_header`] therefore reads metadata and media
//! paths only, and [`SongParser::load_full`] later parses and finalizes the notes of the
//! same song, reusing the dialect detected in the first phase.
//!
//! ```no_run
//! use songchart::prelude::*;
//!
//! let mut parser = SongParser::new("songs/Artist - Title/song.txt", default_config());
//! let warnings = parser.load_header()?;
//! println!("{} by {}", parser.song().title, parser.song().artist);
//! parser.load_full()?;
//! # Ok::<(), LoadError>(())
//! ```

pub mod ass;
pub mod ini;
pub mod midi;
pub mod sm;
pub mod txt;
pub mod xml;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::{
    config::ParseConfig,
    cursor::Line,
    detect::detect,
    error::{ChartError, LoadError, Result, StatusError},
    finalize::{BeatSpan, FinalizeWarning, finalize},
    mixin::{Located, LocatedExt},
    model::{Dialect, LoadStatus, Song},
    resolve::{ResolveWarning, guess_files},
    text::{self, EncodingWarning},
    timeline::Timeline,
};

use self::ass::TagIndex;

/// A recoverable anomaly in a chart line.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum SourceWarning {
    /// A header key the dialect does not know.
    #[error("unknown header `{0}` ignored")]
    UnknownHeader(String),
    /// A note began inside the previous note and could not be fixed.
    #[error("skipping overlapping note")]
    OverlappingNoteSkipped,
    /// The previous note was cut short to make room for this one.
    #[error("previous note shortened to avoid overlap")]
    PreviousNoteShortened,
    /// A feature of the dialect that is not supported.
    #[error("unsupported `{0}` ignored")]
    Unsupported(String),
    /// A karaoke line overlapping both duet tracks.
    #[error("line of style `{0}` overlaps both vocal tracks, discarded")]
    DuetLineDiscarded(String),
    /// A line with no meaning in this position.
    #[error("unexpected line ignored")]
    UnexpectedLine,
    /// An optional field whose value could not be decoded.
    #[error("invalid value `{value}` for {field} ignored")]
    InvalidValue {
        /// Name of the field.
        field: String,
        /// The raw text.
        value: String,
    },
}

/// A recoverable anomaly outside of line-oriented chart text.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ChartWarning {
    /// A media file the song needs does not exist. The song cannot be played.
    #[error("required file {0} not found")]
    ResourceMissing(PathBuf),
    /// A MIDI vocal note without a lyric event.
    #[error("vocal note at tick {0} has no lyric, ignored")]
    NoteWithoutLyric(u64),
    /// A metadata tag referenced by the sidecar could not be read.
    #[error("tag {0} not found")]
    TagNotFound(String),
    /// An XML element with no meaning in this position.
    #[error("unexpected element <{0}> ignored")]
    UnexpectedElement(String),
}

/// Every warning a load can produce.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadWarning {
    /// From decoding the chart bytes.
    #[error("Warn: encoding: {0}")]
    Encoding(#[from] EncodingWarning),
    /// From a chart line.
    #[error("Warn: parse: {0}")]
    Source(#[from] Located<SourceWarning>),
    /// From chart data without line positions.
    #[error("Warn: chart: {0}")]
    Chart(#[from] ChartWarning),
    /// From guessing media files.
    #[error("Warn: files: {0}")]
    Files(#[from] ResolveWarning),
    /// From repairing the notes.
    #[error("Warn: finalize: {0}")]
    Finalize(#[from] FinalizeWarning),
}

impl LoadWarning {
    /// The log level this warning is reported with.
    #[must_use]
    pub fn level(&self) -> log::Level {
        match self {
            Self::Chart(ChartWarning::ResourceMissing(_)) => log::Level::Error,
            Self::Files(ResolveWarning::Autodetected(_)) => log::Level::Debug,
            Self::Files(_) | Self::Finalize(_) => log::Level::Info,
            _ => log::Level::Warn,
        }
    }
}

/// Output of [`load_song`].
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct LoadOutput {
    /// The fully loaded song.
    pub song: Song,
    /// Warnings of both phases.
    pub warnings: Vec<LoadWarning>,
}

/// State shared by a dialect parser and the controller during one phase.
#[derive(Debug)]
pub(crate) struct ParseContext<'c> {
    pub(crate) config: &'c ParseConfig,
    /// Line being read, 0 when not reading lines.
    pub(crate) line: usize,
    pub(crate) warnings: Vec<LoadWarning>,
    /// Beat-marker stride of the dialect, in beat timestamps.
    pub(crate) beat_stride: Option<f64>,
    /// Furthest beat timestamp reached by any note.
    pub(crate) ts_end: f64,
    /// Set when a required media file is missing.
    pub(crate) resource_missing: bool,
}

impl<'c> ParseContext<'c> {
    pub(crate) const fn new(config: &'c ParseConfig) -> Self {
        Self {
            config,
            line: 0,
            warnings: Vec::new(),
            beat_stride: None,
            ts_end: 0.0,
            resource_missing: false,
        }
    }

    pub(crate) fn warn(&mut self, warning: impl Into<LoadWarning>) {
        let warning = warning.into();
        log::log!(warning.level(), "{warning}");
        self.warnings.push(warning);
    }

    pub(crate) fn warn_line(&mut self, line: &Line<'_>, warning: SourceWarning) {
        self.warn(warning.at_line(line.number, line.span()));
    }

    pub(crate) fn missing_resource(&mut self, path: impl Into<PathBuf>) {
        self.resource_missing = true;
        self.warn(ChartWarning::ResourceMissing(path.into()));
    }

    /// Records that notes extend to beat timestamp `ts`.
    pub(crate) fn reach(&mut self, ts: f64) {
        self.ts_end = self.ts_end.max(ts);
    }

    /// Where beat markers go; the configured stride wins over the dialect's.
    pub(crate) fn beat_span(&self) -> Option<BeatSpan> {
        let stride = self
            .config
            .beat_stride
            .map(f64::from)
            .or(self.beat_stride)
            .filter(|&stride| stride > 0.0)?;
        Some(BeatSpan {
            stride,
            end: self.ts_end,
        })
    }
}

/// The two phases every dialect implements.
pub(crate) trait DialectParser {
    /// Reads metadata, media paths and the initial tempo.
    fn parse_header(&mut self, song: &mut Song, ctx: &mut ParseContext<'_>) -> Result<()>;

    /// Reads notes into a song that went through [`Self::parse_header`].
    fn parse_notes(&mut self, song: &mut Song, ctx: &mut ParseContext<'_>) -> Result<()>;
}

/// Loads one song, header first and notes on demand.
///
/// The parser owns the song and any caches needed while loading it, such as the karaoke tag
/// index, so nothing is shared between songs except the read-only [`ParseConfig`].
#[derive(Debug)]
pub struct SongParser {
    config: ParseConfig,
    song: Song,
    tags: Option<TagIndex>,
}

impl SongParser {
    /// A parser for the chart file at `filename`.
    #[must_use]
    pub fn new(filename: impl Into<PathBuf>, config: ParseConfig) -> Self {
        Self::with_song(Song::new(filename), config)
    }

    /// A parser continuing with an existing song, such as one whose header was loaded earlier.
    #[must_use]
    pub const fn with_song(song: Song, config: ParseConfig) -> Self {
        Self {
            config,
            song,
            tags: None,
        }
    }

    /// The song being loaded.
    #[must_use]
    pub const fn song(&self) -> &Song {
        &self.song
    }

    /// Takes the song out of the parser.
    #[must_use]
    pub fn into_song(self) -> Song {
        self.song
    }

    /// Reads the chart file and runs the header phase.
    ///
    /// # Errors
    ///
    /// Any fatal [`ChartError`], located at the chart file. The song stays
    /// [`LoadStatus::Unloaded`] in that case.
    pub fn load_header(&mut self) -> core::result::Result<Vec<LoadWarning>, LoadError> {
        let bytes = self.read_chart()?;
        let mut ctx = ParseContext::new(&self.config);
        let result = decode_into(&bytes, &mut ctx).and_then(|text| {
            Self::header_phase(&mut self.song, &mut self.tags, &text, &mut ctx)
        });
        let line = ctx.line;
        let warnings = ctx.warnings;
        result.map(|()| warnings).map_err(|e| self.locate(e, line))
    }

    /// Runs the header phase on already decoded chart text.
    ///
    /// # Errors
    ///
    /// Any fatal [`ChartError`], located at the chart file.
    pub fn load_header_from_text(
        &mut self,
        text: &str,
    ) -> core::result::Result<Vec<LoadWarning>, LoadError> {
        let mut ctx = ParseContext::new(&self.config);
        let result = Self::header_phase(&mut self.song, &mut self.tags, text, &mut ctx);
        let line = ctx.line;
        let warnings = ctx.warnings;
        result.map(|()| warnings).map_err(|e| self.locate(e, line))
    }

    /// Reads the chart file and runs the full phase, running the header phase first when the
    /// song is still unloaded.
    ///
    /// # Errors
    ///
    /// Any fatal [`ChartError`], located at the chart file. A failed full phase leaves the
    /// song in [`LoadStatus::Error`]; a song already in that state is rejected with
    /// [`StatusError::Failed`].
    pub fn load_full(&mut self) -> core::result::Result<Vec<LoadWarning>, LoadError> {
        if self.song.load_status == LoadStatus::Error {
            return Err(self.locate(StatusError::Failed.into(), 0));
        }
        let bytes = self.read_chart()?;
        let mut ctx = ParseContext::new(&self.config);
        let result = decode_into(&bytes, &mut ctx)
            .and_then(|text| Self::both_phases(&mut self.song, &mut self.tags, &text, &mut ctx));
        let line = ctx.line;
        let warnings = ctx.warnings;
        result.map(|()| warnings).map_err(|e| self.locate(e, line))
    }

    /// Runs the full phase on already decoded chart text.
    ///
    /// # Errors
    ///
    /// See [`Self::load_full`].
    pub fn load_full_from_text(
        &mut self,
        text: &str,
    ) -> core::result::Result<Vec<LoadWarning>, LoadError> {
        let mut ctx = ParseContext::new(&self.config);
        let result = Self::both_phases(&mut self.song, &mut self.tags, text, &mut ctx);
        let line = ctx.line;
        let warnings = ctx.warnings;
        result.map(|()| warnings).map_err(|e| self.locate(e, line))
    }

    fn read_chart(&self) -> core::result::Result<Vec<u8>, LoadError> {
        std::fs::read(&self.song.filename).map_err(|e| self.locate(e.into(), 0))
    }

    fn locate(&self, kind: ChartError, line: usize) -> LoadError {
        kind.at(&self.song.filename, (line > 0).then_some(line))
    }

    fn both_phases(
        song: &mut Song,
        tags: &mut Option<TagIndex>,
        text: &str,
        ctx: &mut ParseContext<'_>,
    ) -> Result<()> {
        match song.load_status {
            LoadStatus::Error => return Err(StatusError::Failed.into()),
            LoadStatus::Unloaded => {
                Self::header_phase(song, tags, text, ctx)?;
                if song.load_status == LoadStatus::Error {
                    return Err(StatusError::Failed.into());
                }
            }
            LoadStatus::Header | LoadStatus::Full => {}
        }
        let result = Self::full_phase(song, tags, text, ctx);
        if result.is_err() {
            song.load_status = LoadStatus::Error;
        }
        result
    }

    fn header_phase(
        song: &mut Song,
        tags: &mut Option<TagIndex>,
        text: &str,
        ctx: &mut ParseContext<'_>,
    ) -> Result<()> {
        if song.load_status != LoadStatus::Unloaded {
            return Err(StatusError::InvalidTransition {
                from: song.load_status,
                to: LoadStatus::Header,
            }
            .into());
        }
        let dialect = detect(text)?;
        log::debug!("{}: detected {dialect:?}", song.filename.display());
        song.dialect = Some(dialect);
        song.timeline = Timeline::new(ctx.config.default_gap);
        song.vocal_tracks.clear();
        song.dance_tracks.clear();
        song.instrument_tracks.clear();

        dialect_parser(dialect, text, tags).parse_header(song, ctx)?;
        ctx.line = 0;
        for warning in guess_files(song) {
            ctx.warn(warning);
        }
        if dialect == Dialect::Ini {
            match song.midi_file.clone() {
                Some(midi) => midi::parse_header(song, &std::fs::read(midi)?)?,
                None => ctx.missing_resource(song.path.join("notes.mid")),
            }
        }

        song.load_status.transition(LoadStatus::Header)?;
        if ctx.resource_missing {
            song.load_status.transition(LoadStatus::Error)?;
        }
        Ok(())
    }

    fn full_phase(
        song: &mut Song,
        tags: &mut Option<TagIndex>,
        text: &str,
        ctx: &mut ParseContext<'_>,
    ) -> Result<()> {
        let dialect = song
            .dialect
            .ok_or_else(|| ChartError::Internal("header loaded without a dialect".into()))?;
        song.vocal_tracks.clear();
        song.dance_tracks.clear();
        song.beats.clear();
        song.timeline.retain_initial();

        dialect_parser(dialect, text, tags).parse_notes(song, ctx)?;
        ctx.line = 0;
        for warning in finalize(song, ctx.beat_span())? {
            ctx.warn(warning);
        }
        song.load_status.transition(LoadStatus::Full)?;
        Ok(())
    }
}

fn decode_into<'b>(bytes: &'b [u8], ctx: &mut ParseContext<'_>) -> Result<std::borrow::Cow<'b, str>> {
    let decoded = text::decode(bytes, ctx.config)?;
    for warning in decoded.warnings {
        ctx.warn(warning);
    }
    Ok(decoded.text)
}

fn dialect_parser<'a>(
    dialect: Dialect,
    text: &'a str,
    tags: &'a mut Option<TagIndex>,
) -> Box<dyn DialectParser + 'a> {
    match dialect {
        Dialect::Txt => Box::new(txt::TxtParser::new(text)),
        Dialect::Ini => Box::new(ini::IniParser::new(text)),
        Dialect::Sm => Box::new(sm::SmParser::new(text)),
        Dialect::Xml => Box::new(xml::XmlParser::new(text)),
        Dialect::Ass => Box::new(ass::AssParser::new(text, tags)),
    }
}

/// Loads both phases of the song at `path`.
///
/// # Errors
///
/// See [`SongParser::load_full`].
pub fn load_song(
    path: impl AsRef<Path>,
    config: ParseConfig,
) -> core::result::Result<LoadOutput, LoadError> {
    let mut parser = SongParser::new(path.as_ref(), config);
    let mut warnings = parser.load_header()?;
    if parser.song().load_status == LoadStatus::Error {
        return Ok(LoadOutput {
            song: parser.into_song(),
            warnings,
        });
    }
    warnings.extend(parser.load_full()?);
    Ok(LoadOutput {
        song: parser.into_song(),
        warnings,
    })
}
