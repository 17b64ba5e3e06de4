//! Typed IR for cff directives.
//!
//! The compiler here turns the DSL call sites a [`syntax::SourceFile`]
//! exposes into [`Flow`] and [`Parallel`] IR, running every semantic check
//! that doesn't need the dependency graph (the `traverse` crate owns those).
//! All problems become positioned diagnostics; compilation never stops at
//! the first error.

/// Ids for use in typed collections.
mod id;
pub use id::{Serial, TypeId};

/// Positioned diagnostics, accumulated across a whole file.
mod diagnostics;
pub use diagnostics::{AggregatedErrors, Diagnostic, Diagnostics};

/// Canonical type identities.
mod types;
pub use types::TypeTable;

/// Compiled function expressions.
mod func;
pub use func::CompiledFunc;

/// The IR: flows, parallels, tasks, slice tasks.
mod ir;
pub use ir::{
    DirectiveIr, FileIr, Flow, Instrument, Output, Parallel, ParallelTask, Param, SliceTask, Task,
};

/// AST -> IR compilation.
mod compiler;
pub use compiler::{Compiler, CompilerOpts};
