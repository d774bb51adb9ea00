//! Line-oriented cursor over decoded chart text.

use std::ops::Range;

/// A single line of the source, without its terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Line<'a> {
    /// The line position, starts with 1.
    pub number: usize,
    /// Byte index of the first character.
    pub start: usize,
    /// The line content, `\r\n` and `\n` excluded.
    pub text: &'a str,
}

impl Line<'_> {
    /// Byte span of the line content in the source.
    pub const fn span(&self) -> Range<usize> {
        self.start..self.start + self.text.len()
    }
}

/// Walks the source line by line, tracking line numbers and byte offsets.
#[derive(Debug, Clone)]
pub struct LineCursor<'a> {
    /// The line position of the next line, starts with 1.
    line: usize,
    /// The index position.
    index: usize,
    source: &'a str,
}

impl<'a> LineCursor<'a> {
    /// Creates a cursor at the beginning of `source`.
    pub const fn new(source: &'a str) -> Self {
        Self {
            line: 1,
            index: 0,
            source,
        }
    }

    /// Whether every line has been consumed.
    pub const fn is_end(&self) -> bool {
        self.index >= self.source.len()
    }

    /// Line number of the most recently returned line, 0 before the first.
    pub const fn line(&self) -> usize {
        self.line - 1
    }

    /// Returns the next line without consuming it.
    pub fn peek_line(&self) -> Option<Line<'a>> {
        self.clone().next_line()
    }

    /// Moves through and returns the next line.
    ///
    /// A CRLF pair terminates a line the same way a bare LF does.
    pub fn next_line(&mut self) -> Option<Line<'a>> {
        if self.is_end() {
            return None;
        }
        let rest = self.source.get(self.index..)?;
        let (content_len, consumed) = match rest.find('\n') {
            Some(lf) => (lf, lf + 1),
            None => (rest.len(), rest.len()),
        };
        let text = rest.get(..content_len)?;
        let text = text.strip_suffix('\r').unwrap_or(text);
        let line = Line {
            number: self.line,
            start: self.index,
            text,
        };
        self.index += consumed;
        self.line += 1;
        Some(line)
    }
}

impl<'a> Iterator for LineCursor<'a> {
    type Item = Line<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crlf_and_lf_lines() {
        const SOURCE: &str = "#TITLE:Hello\r\n#ARTIST:Foo\nLAST";
        let mut cursor = LineCursor::new(SOURCE);
        assert_eq!(cursor.line(), 0);

        let first = cursor.next_line().unwrap();
        assert_eq!(first.text, "#TITLE:Hello");
        assert_eq!(first.number, 1);
        assert_eq!(&SOURCE[first.span()], "#TITLE:Hello");

        assert_eq!(cursor.peek_line().map(|l| l.text), Some("#ARTIST:Foo"));
        assert_eq!(cursor.next_line().map(|l| l.text), Some("#ARTIST:Foo"));
        let last = cursor.next_line().unwrap();
        assert_eq!(last.text, "LAST");
        assert_eq!(last.number, 3);
        assert_eq!(cursor.line(), 3);
        assert!(cursor.next_line().is_none());
    }

    #[test]
    fn empty_lines_are_kept() {
        let lines: Vec<_> = LineCursor::new("a\n\nb\n").map(|l| l.text).collect();
        assert_eq!(lines, vec!["a", "", "b"]);
    }
}
