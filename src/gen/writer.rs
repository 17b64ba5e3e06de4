use flow::{FileIr, TypeId};
use syntax::ByteSpan;
use util::HashSet;

use super::imports::ImportSet;

/// Writes generated code into a buffer, one indented line at a time, the
/// way the templates want to talk about the file: types by their source
/// spelling, type hashes for unique identifiers, expressions verbatim, and
/// imports on demand.
pub struct CodeWriter<'a> {
    ir: &'a FileIr,
    buf: String,
    indent: usize,
    imports: ImportSet,
}

const INDENT: &str = "    ";

impl<'a> CodeWriter<'a> {
    pub fn new(ir: &'a FileIr) -> Self {
        let mut taken: HashSet<String> = HashSet::default();
        for name in ir.file.scope.uses.keys() {
            taken.insert(name.clone());
        }
        for name in ir.file.scope.fns.keys() {
            taken.insert(name.clone());
        }
        for name in ir.file.scope.local_types.iter() {
            taken.insert(name.clone());
        }
        Self {
            ir,
            buf: String::with_capacity(4096),
            indent: 0,
            imports: ImportSet::new(taken),
        }
    }

    /// Print `ty` the way the source file spells it.
    pub fn ty(&self, id: TypeId) -> &'a str {
        self.ir.file.snippet(self.ir.types.spelling(id))
    }

    /// Stable unique int for a type, minted into generated identifiers.
    pub fn type_hash(&self, id: TypeId) -> u32 {
        u32::from(id)
    }

    /// Print an expression node verbatim.
    pub fn expr(&self, span: ByteSpan) -> &'a str {
        self.ir.file.snippet(span)
    }

    /// Ensure `path` is imported; returns the token to reference it by.
    pub fn import(&mut self, path: &str) -> String {
        self.imports.request(path)
    }

    pub fn line(&mut self, text: &str) {
        for _ in 0..self.indent {
            self.buf.push_str(INDENT);
        }
        self.buf.push_str(text);
        self.buf.push('\n');
    }

    /// Write a line and indent what follows.
    pub fn open(&mut self, text: &str) {
        self.line(text);
        self.indent += 1;
    }

    /// Dedent, then write a line.
    pub fn close(&mut self, text: &str) {
        self.indent -= 1;
        self.line(text);
    }

    /// Drain the buffer: one directive's expansion. Imports keep
    /// accumulating across directives.
    pub fn take(&mut self) -> String {
        debug_assert_eq!(0, self.indent, "unbalanced open/close");
        std::mem::take(&mut self.buf)
    }

    pub fn into_imports(self) -> ImportSet {
        self.imports
    }
}
