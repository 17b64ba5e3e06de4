//! Runtime support for cff-generated code.
//!
//! User code written against the sentinel DSL macros ([`flow!`], [`parallel!`]
//! and friends) is rewritten by the `cff` code generator into concrete code
//! that drives the [`Scheduler`] and reports lifecycle events to an
//! [`Emitter`]. Nothing in this crate interprets flows at runtime; the macros
//! only exist so that DSL files still compile under `--cfg cff`.

/// Ambient context threaded through every generated job.
mod context;
pub use context::{Canceller, Context};

/// Once-set value slots and run flags used by generated code.
mod cell;
pub use cell::{Cell, Flag};

/// Runtime error type shared by generated flows and parallels.
mod error;
pub use error::{BoxError, Error};

/// Lifecycle event sinks and their info records.
mod emitter;
pub use emitter::{
    Directive, DirectiveInfo, Emitter, FlowEmitter, FlowInfo, ParallelEmitter, ParallelInfo,
    SchedulerEmitter, SchedulerInfo, SchedulerState, TaskEmitter, TaskInfo,
};

/// The no-op emitter used when no emitter is configured.
mod nop;
pub use nop::{nop_task_emitter, NopEmitter};

/// Fan-out composition of multiple emitters.
mod stack;
pub use stack::EmitterStack;

/// An emitter that reports through the `log` crate.
mod log_emitter;
pub use log_emitter::LogEmitter;

/// Dependency-aware job scheduler backing generated flows.
mod scheduler;
pub use scheduler::{Job, JobId, Scheduler, DEFAULT_CONCURRENCY};

/// Sentinel DSL macros.
mod dsl;

pub type Result<T = ()> = std::result::Result<T, Error>;

/// All sentinel macros expand to this. It only runs when a DSL file is
/// compiled with `--cfg cff` *and* executed without being generated first.
pub fn __dsl_call<T>() -> T {
    panic!("cff: this DSL call site was not processed by the cff code generator")
}
