//! Fancy diagnostics support using `ariadne`.
//!
//! Line-oriented warnings carry the byte span of their line through [`crate::mixin::Located`],
//! so ariadne can point at the offending line. Warnings without a position, such as files
//! that were not found, are reported against the start of the chart.
//!
//! # Usage Example
//!
//! ```rust
//! # #[cfg(feature = "diagnostics")]
//! # {
//! use songchart::{diagnostics::emit_load_warnings, prelude::*};
//!
//! let source = "#TITLE:Song\n#ARTIST:Someone\n#BPM:300\n#FOO:bar\n: 0 4 60 la\nE\n";
//! let mut parser = SongParser::new("Someone - Song/song.txt", default_config());
//! let warnings = parser.load_header_from_text(source).unwrap();
//!
//! emit_load_warnings("song.txt", source, &warnings);
//! # }
//! ```

use std::ops::Range;

use ariadne::{Color, Label, Report, ReportKind, Source};

use crate::{
    mixin::Located,
    parse::{ChartWarning, LoadWarning, SourceWarning},
};

/// Simple source container that holds the filename and source text.
/// Ariadne will automatically handle row/column calculations from byte offsets.
///
/// ```rust
/// use songchart::diagnostics::SimpleSource;
///
/// let source = SimpleSource::new("song.txt", "#TITLE:Song\n");
/// assert_eq!(source.text(), "#TITLE:Song\n");
/// ```
#[derive(Debug, Clone, Copy)]
pub struct SimpleSource<'a> {
    /// Name of the source file.
    name: &'a str,
    /// Source text content.
    text: &'a str,
}

impl<'a> SimpleSource<'a> {
    /// Create a new source container instance.
    #[must_use]
    pub const fn new(name: &'a str, text: &'a str) -> Self {
        Self { name, text }
    }

    /// Get source text content.
    #[must_use]
    pub const fn text(&self) -> &'a str {
        self.text
    }

    /// Get source file name.
    #[must_use]
    pub const fn name(&self) -> &'a str {
        self.name
    }
}

/// Trait for converting warnings to `ariadne::Report`.
pub trait ToAriadne {
    /// Convert the warning to an ariadne Report against `src`.
    fn to_report<'a>(&self, src: &SimpleSource<'a>) -> Report<'a, (String, Range<usize>)>;
}

/// Helper to build a styled ariadne `Report` consistently.
#[must_use]
pub fn build_report<'a>(
    src: &SimpleSource<'a>,
    kind: ReportKind<'a>,
    range: Range<usize>,
    title: &str,
    label_message: impl ToString,
    color: Color,
) -> Report<'a, (String, Range<usize>)> {
    let filename = src.name().to_string();
    Report::build(kind, (filename.clone(), range.clone()))
        .with_message(title)
        .with_label(
            Label::new((filename, range))
                .with_message(label_message.to_string())
                .with_color(color),
        )
        .finish()
}

impl ToAriadne for Located<SourceWarning> {
    fn to_report<'a>(&self, src: &SimpleSource<'a>) -> Report<'a, (String, Range<usize>)> {
        let span = self.span();
        let end = span.end.min(src.text().len());
        build_report(
            src,
            ReportKind::Warning,
            span.start.min(end)..end,
            "Chart line",
            self.content(),
            Color::Yellow,
        )
    }
}

impl ToAriadne for LoadWarning {
    fn to_report<'a>(&self, src: &SimpleSource<'a>) -> Report<'a, (String, Range<usize>)> {
        match self {
            Self::Source(located) => located.to_report(src),
            Self::Chart(warning @ ChartWarning::ResourceMissing(_)) => {
                build_report(src, ReportKind::Error, 0..0, "Song", warning, Color::Red)
            }
            other => build_report(
                src,
                ReportKind::Advice,
                0..0,
                "Song",
                other,
                Color::Blue,
            ),
        }
    }
}

/// Convenience method: batch render a list of [`LoadWarning`]s to stderr.
pub fn emit_load_warnings<'a>(
    name: &'a str,
    source: &'a str,
    warnings: impl IntoIterator<Item = &'a LoadWarning>,
) {
    let simple = SimpleSource::new(name, source);
    let ariadne_source = Source::from(source);
    for warning in warnings {
        let report = warning.to_report(&simple);
        let _ = report.eprint((name.to_string(), ariadne_source.clone()));
    }
}

/// Collect `ariadne::Report` instances for a list of [`LoadWarning`]s without printing.
#[must_use]
pub fn collect_load_reports<'a>(
    name: &'a str,
    source: &'a str,
    warnings: impl IntoIterator<Item = &'a LoadWarning>,
) -> Vec<Report<'a, (String, Range<usize>)>> {
    let simple = SimpleSource::new(name, source);
    warnings.into_iter().map(|w| w.to_report(&simple)).collect()
}
