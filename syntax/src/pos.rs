use std::fmt;
use std::sync::Arc;

use proc_macro2::Span;

/// Byte range of a node in the original source. Used for splicing and for
/// printing expressions verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteSpan {
    pub start: usize,
    pub end: usize,
}

impl ByteSpan {
    pub fn of(span: Span) -> Self {
        let range = span.byte_range();
        Self {
            start: range.start,
            end: range.end,
        }
    }

    /// The source text this span covers.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// Source position attached to every IR node a diagnostic may mention.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosInfo {
    pub file: Arc<str>,
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl PosInfo {
    pub fn of(file: &Arc<str>, span: Span) -> Self {
        let start = span.start();
        Self {
            file: Arc::clone(file),
            line: start.line,
            // proc-macro2 columns are zero-based; diagnostics are one-based.
            column: start.column + 1,
            offset: span.byte_range().start,
        }
    }
}

impl fmt::Display for PosInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}
