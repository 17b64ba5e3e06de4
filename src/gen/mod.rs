//! The generator: splices generated text into the original source.
//!
//! The file is emitted byte-for-byte except at a small set of edits: DSL
//! call sites are replaced by their expansion, the DSL import is removed,
//! new imports are inserted stable-sorted, and the `#![cfg(cff)]` tag is
//! inverted so the generated file builds exactly when the DSL file does
//! not. Everything outside the edits, comments and formatting included,
//! survives untouched.

use anyhow::Result;
use flow::{DirectiveIr, FileIr};
use syntax::ByteSpan;
use traverse::Schedule;

use crate::args::GenMode;

/// Base-mode expansions for flows and parallels.
mod base;

/// Import reconciliation for generated code.
mod imports;

/// Modifier-mode rewrites.
mod modifier;

/// The template surface: buffer, types, expressions, imports.
mod writer;
use writer::CodeWriter;

pub struct Generator {
    mode: GenMode,
}

impl Generator {
    pub fn new(mode: GenMode) -> Self {
        Self { mode }
    }

    /// Produce the output buffer for a compiled file. `schedules` runs
    /// parallel to `ir.directives` (flows have schedules, parallels don't).
    pub fn generate(&self, ir: &FileIr, schedules: &[Option<Schedule>]) -> Result<String> {
        let edits = match self.mode {
            GenMode::Base | GenMode::SourceMap => self.base_edits(ir, schedules),
            GenMode::Modifier => modifier::rewrites(ir),
        };
        Ok(splice(&ir.file.text, edits))
    }

    fn base_edits(&self, ir: &FileIr, schedules: &[Option<Schedule>]) -> Vec<(ByteSpan, String)> {
        let mut edits = Vec::new();
        let mut w = CodeWriter::new(ir);

        for (directive, schedule) in ir.directives.iter().zip(schedules) {
            match directive {
                DirectiveIr::Flow(f) => {
                    let schedule = schedule.as_ref().expect("flow without a schedule");
                    base::flow_expansion(&mut w, f, schedule);
                }
                DirectiveIr::Parallel(p) => base::parallel_expansion(&mut w, p),
            }
            let mut text = w.take();
            // expansions end with a newline from the line writer; the
            // splice is an expression, so trim it.
            if text.ends_with('\n') {
                text.pop();
            }
            if self.mode == GenMode::SourceMap {
                let pos = match directive {
                    DirectiveIr::Flow(f) => &f.pos,
                    DirectiveIr::Parallel(p) => &p.pos,
                };
                text = format!("// cff:source {pos}\n{text}");
            }
            edits.push((directive.span(), text));
        }

        // invert the build tag.
        if let Some(tag) = ir.file.cfg_tag {
            edits.push((tag, "#![cfg(not(cff))]".to_owned()));
        }

        // the DSL import is unused once the calls are gone.
        let mut removals: Vec<ByteSpan> = ir
            .file
            .dsl_uses
            .iter()
            .map(|&span| with_trailing_newline(&ir.file.text, span))
            .collect();

        // imports the expansions asked for. If the insertion point falls on
        // a removed DSL import, the new imports take its place.
        let imports = w.into_imports();
        if !imports.is_empty() {
            let at = ir
                .file
                .import_insertion
                .or(ir.file.cfg_tag.map(|t| t.end))
                .unwrap_or(0);
            match removals.iter().position(|s| at >= s.start && at <= s.end) {
                Some(i) => edits.push((removals.remove(i), imports.render())),
                None => {
                    let insertion = ByteSpan { start: at, end: at };
                    let text = if at == 0 {
                        imports.render()
                    } else {
                        format!("\n{}", imports.render().trim_end())
                    };
                    edits.push((insertion, text));
                }
            }
        }
        for span in removals {
            edits.push((span, String::new()));
        }

        edits
    }
}

fn with_trailing_newline(text: &str, span: ByteSpan) -> ByteSpan {
    if text.as_bytes().get(span.end) == Some(&b'\n') {
        ByteSpan {
            start: span.start,
            end: span.end + 1,
        }
    } else {
        span
    }
}

/// Apply non-overlapping edits to the source, copying everything between
/// them verbatim.
fn splice(text: &str, mut edits: Vec<(ByteSpan, String)>) -> String {
    edits.sort_by_key(|(span, _)| (span.start, span.end));
    let mut out = String::with_capacity(text.len() + edits.iter().map(|(_, t)| t.len()).sum::<usize>());
    let mut last = 0;
    for (span, replacement) in edits {
        debug_assert!(span.start >= last, "overlapping edits");
        out.push_str(&text[last..span.start]);
        out.push_str(&replacement);
        last = span.end;
    }
    out.push_str(&text[last..]);
    out
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_splice_preserves_gaps() {
        let text = "aaa BBB ccc DDD eee";
        let edits = vec![
            (ByteSpan { start: 4, end: 7 }, "x".to_owned()),
            (ByteSpan { start: 12, end: 15 }, "yy".to_owned()),
        ];
        assert_eq!("aaa x ccc yy eee", splice(text, edits));
    }

    #[test]
    fn test_splice_insertion() {
        let text = "head tail";
        let edits = vec![(ByteSpan { start: 4, end: 4 }, " mid".to_owned())];
        assert_eq!("head mid tail", splice(text, edits));
    }

    #[test]
    fn test_splice_no_edits() {
        assert_eq!("same", splice("same", Vec::new()));
    }
}
