use syntax::{ByteSpan, PosInfo, SourceFile};

use crate::{CompiledFunc, Serial, TypeId, TypeTable};

/// Everything compiled out of one source file, in source order.
#[derive(Debug)]
pub struct FileIr {
    pub file: SourceFile,
    pub directives: Vec<DirectiveIr>,
    pub types: TypeTable,
}

impl FileIr {
    pub fn is_empty(&self) -> bool {
        self.directives.is_empty()
    }
}

/// A compiled top-level DSL call site.
#[derive(Debug)]
pub enum DirectiveIr {
    Flow(Flow),
    Parallel(Parallel),
}

impl DirectiveIr {
    /// Byte range of the original call site, for splicing.
    pub fn span(&self) -> ByteSpan {
        match self {
            Self::Flow(f) => f.span,
            Self::Parallel(p) => p.span,
        }
    }
}

/// Instrumentation request on a task, flow, or parallel.
#[derive(Debug)]
pub struct Instrument {
    /// The user's name expression, spliced verbatim. `None` when the name
    /// was inferred (`--instrument-all-tasks`).
    pub name_expr: Option<ByteSpan>,
    /// Fallback name inferred from the function.
    pub inferred: String,
}

/// A value fed into a flow via `params!`; tasks may consume it by type.
#[derive(Debug)]
pub struct Param {
    pub ty: TypeId,
    pub expr: ByteSpan,
    pub pos: PosInfo,
}

/// A declared flow output: where a produced value lands on success.
#[derive(Debug)]
pub struct Output {
    pub ty: TypeId,
    pub dest: ByteSpan,
    pub pos: PosInfo,
}

/// A task inside a flow.
#[derive(Debug)]
pub struct Task {
    pub func: CompiledFunc,
    pub predicate: Option<CompiledFunc>,
    /// Serial of the predicate's job, when one exists.
    pub predicate_serial: Option<Serial>,
    pub instrument: Option<Instrument>,
    pub fallback: Option<CompiledFunc>,
    pub invoke: bool,
    pub serial: Serial,
    pub pos: PosInfo,
}

/// A compiled `flow!` call site.
#[derive(Debug)]
pub struct Flow {
    /// Name used in info records; the enclosing function by default.
    pub name: String,
    pub ctx: ByteSpan,
    pub emitters: Vec<ByteSpan>,
    pub params: Vec<Param>,
    pub results: Vec<Output>,
    pub concurrency: Option<ByteSpan>,
    pub instrument: Option<Instrument>,
    pub tasks: Vec<Task>,
    pub pos: PosInfo,
    pub span: ByteSpan,
}

/// A task inside a parallel: context-only input, error-only output.
#[derive(Debug)]
pub struct ParallelTask {
    pub func: CompiledFunc,
    pub instrument: Option<Instrument>,
    pub serial: Serial,
    pub pos: PosInfo,
}

/// One job per element of a slice expression.
#[derive(Debug)]
pub struct SliceTask {
    pub func: CompiledFunc,
    pub slice: ByteSpan,
    pub serial: Serial,
    pub pos: PosInfo,
}

/// A compiled `parallel!` call site.
#[derive(Debug)]
pub struct Parallel {
    pub name: String,
    pub ctx: ByteSpan,
    pub emitters: Vec<ByteSpan>,
    pub concurrency: Option<ByteSpan>,
    pub continue_on_error: Option<ByteSpan>,
    pub instrument: Option<Instrument>,
    pub tasks: Vec<ParallelTask>,
    pub slices: Vec<SliceTask>,
    pub pos: PosInfo,
    pub span: ByteSpan,
}
