//! Mixin types for attaching source locations.
//!
//! - [`Located`] wraps a value with the line number and byte span it came from.
//! - [`LocatedExt`] provides `.at_line(..)` on any value to build a [`Located`].

use std::ops::Range;

/// A generic wrapper that attaches a line number and byte span to a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Located<T> {
    content: T,
    /// Line number in the chart text, starts with 1.
    line: usize,
    /// Byte index of the line start (inclusive).
    start: usize,
    /// Byte index of the line end (exclusive).
    end: usize,
}

impl<T> Located<T> {
    /// Instances a new `Located`.
    pub const fn new(content: T, line: usize, span: Range<usize>) -> Self {
        Self {
            content,
            line,
            start: span.start,
            end: span.end,
        }
    }

    /// Returns the wrapped content.
    pub const fn content(&self) -> &T {
        &self.content
    }

    /// Leans the content out of the wrapper.
    pub fn into_content(self) -> T {
        self.content
    }

    /// Returns the line number, starts with 1.
    pub const fn line(&self) -> usize {
        self.line
    }

    /// Returns the byte span in the decoded source text.
    pub const fn span(&self) -> Range<usize> {
        self.start..self.end
    }

    /// Maps the content of the wrapper.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Located<U> {
        Located::new(f(self.content), self.line, self.start..self.end)
    }
}

impl<T: std::fmt::Display> std::fmt::Display for Located<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at line {}", self.content, self.line)
    }
}

impl<T: std::error::Error + 'static> std::error::Error for Located<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.content)
    }
}

/// Extension methods for building [`Located`] values.
pub trait LocatedExt {
    /// Wraps `self` with the given line number and byte span.
    fn at_line(self, line: usize, span: Range<usize>) -> Located<Self>
    where
        Self: Sized,
    {
        Located::new(self, line, span)
    }
}

impl<T> LocatedExt for T {}
