//! Loads a Rust source file for cff processing.
//!
//! The loader parses the file with `syn` and extracts everything the
//! compiler downstream needs: source positions for every node it will
//! mention in a diagnostic, the file's scope (imports, function signatures,
//! annotated locals), and the list of top-level DSL macro call sites.
//! Nothing here understands flow semantics; it only answers syntactic and
//! type-spelling questions.

/// Positions and byte spans.
mod pos;
pub use pos::{ByteSpan, PosInfo};

/// The loaded-file model: scope, declarations, DSL sites.
pub mod ast;
pub use ast::{DslCall, DslSite, FnDecl, FnSig, Scope, SourceFile};

/// Walks the syn AST and builds the [`SourceFile`] model.
mod parse;

/// Type spelling: canonicalization and printing.
mod types;
pub use types::{flatten_outputs, render_type, result_ok_type, slice_elem_type};

type HashMap<K, V> =
    std::collections::HashMap<K, V, std::hash::BuildHasherDefault<rustc_hash::FxHasher>>;
type HashSet<T> = std::collections::HashSet<T, std::hash::BuildHasherDefault<rustc_hash::FxHasher>>;

/// Path of the DSL crate; call sites are recognized by resolving their
/// macro path against this.
pub const DSL_CRATE: &str = "cff";

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("parse error at line {line}: {msg}")]
    Parse { line: usize, msg: String },
}

/// Parse `text` into a [`SourceFile`]. `name` is the display path used in
/// positions and diagnostics.
pub fn parse(name: &str, text: &str) -> Result<SourceFile, Error> {
    let file = syn::parse_file(text).map_err(|e| Error::Parse {
        line: e.span().start().line,
        msg: e.to_string(),
    })?;
    parse::lower(name, text, &file)
}
