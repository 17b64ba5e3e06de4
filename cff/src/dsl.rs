//! Sentinel macros forming the cff DSL surface.
//!
//! These exist so DSL files still parse and type-check under `--cfg cff`.
//! The code generator replaces every `flow!`/`parallel!` call site; the
//! option macros (`task!`, `results!`, ...) only ever appear inside one and
//! are never expanded on their own by generated builds.

/// Declares a flow: a DAG of typed tasks executed concurrently.
///
/// First argument is the ambient [`Context`](crate::Context) expression;
/// remaining arguments are option calls: [`task!`](crate::task),
/// [`tasks!`](crate::tasks), [`params!`](crate::params),
/// [`results!`](crate::results), [`with_emitter!`](crate::with_emitter),
/// [`instrument_flow!`](crate::instrument_flow),
/// [`concurrency!`](crate::concurrency).
///
/// Evaluates to `cff::Result<()>`.
#[macro_export]
macro_rules! flow {
    ($($args:tt)*) => {
        $crate::__dsl_call::<$crate::Result<()>>()
    };
}

/// Declares a parallel: independent units of work with no data flow.
///
/// Accepts [`task!`](crate::task), [`tasks!`](crate::tasks),
/// [`slice!`](crate::slice), [`concurrency!`](crate::concurrency),
/// [`continue_on_error!`](crate::continue_on_error),
/// [`with_emitter!`](crate::with_emitter),
/// [`instrument_parallel!`](crate::instrument_parallel).
///
/// Evaluates to `cff::Result<()>`.
#[macro_export]
macro_rules! parallel {
    ($($args:tt)*) => {
        $crate::__dsl_call::<$crate::Result<()>>()
    };
}

/// A single task: a function plus task options ([`predicate!`](crate::predicate),
/// [`fallback_with!`](crate::fallback_with), [`instrument!`](crate::instrument),
/// [`invoke!`](crate::invoke)).
#[macro_export]
macro_rules! task {
    ($($args:tt)*) => {
        $crate::__dsl_call::<()>()
    };
}

/// Several tasks with no options, in one call.
#[macro_export]
macro_rules! tasks {
    ($($args:tt)*) => {
        $crate::__dsl_call::<()>()
    };
}

/// Declares values fed into the flow; tasks may consume them by type.
#[macro_export]
macro_rules! params {
    ($($args:tt)*) => {
        $crate::__dsl_call::<()>()
    };
}

/// Declares where flow outputs land: `results!(&mut a, &mut b)`.
#[macro_export]
macro_rules! results {
    ($($args:tt)*) => {
        $crate::__dsl_call::<()>()
    };
}

/// Gates a task behind a boolean-valued function.
#[macro_export]
macro_rules! predicate {
    ($($args:tt)*) => {
        $crate::__dsl_call::<()>()
    };
}

/// Opts a task into instrumentation under the given name.
#[macro_export]
macro_rules! instrument {
    ($($args:tt)*) => {
        $crate::__dsl_call::<()>()
    };
}

/// Opts the whole flow into instrumentation under the given name.
#[macro_export]
macro_rules! instrument_flow {
    ($($args:tt)*) => {
        $crate::__dsl_call::<()>()
    };
}

/// Opts the whole parallel into instrumentation under the given name.
#[macro_export]
macro_rules! instrument_parallel {
    ($($args:tt)*) => {
        $crate::__dsl_call::<()>()
    };
}

/// Recovers a task error with fallback outputs.
#[macro_export]
macro_rules! fallback_with {
    ($($args:tt)*) => {
        $crate::__dsl_call::<()>()
    };
}

/// Marks a task as running purely for side effects (no outputs).
#[macro_export]
macro_rules! invoke {
    ($($args:tt)*) => {
        $crate::__dsl_call::<()>()
    };
}

/// Adds an emitter; repeatable, forming an emitter stack.
#[macro_export]
macro_rules! with_emitter {
    ($($args:tt)*) => {
        $crate::__dsl_call::<()>()
    };
}

/// Caps scheduler workers for this directive.
#[macro_export]
macro_rules! concurrency {
    ($($args:tt)*) => {
        $crate::__dsl_call::<()>()
    };
}

/// Keep dispatching parallel work after the first error.
#[macro_export]
macro_rules! continue_on_error {
    ($($args:tt)*) => {
        $crate::__dsl_call::<()>()
    };
}

/// One job per element of a slice: `slice!(func, expr)` where
/// `func: (usize, T) -> Result<()>` and `expr` is iterable over `T`.
#[macro_export]
macro_rules! slice {
    ($($args:tt)*) => {
        $crate::__dsl_call::<()>()
    };
}
