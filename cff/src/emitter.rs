use std::fmt;
use std::time::Duration;

use crate::{Context, Error};

/// Which kind of directive a scheduler or task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Flow,
    Parallel,
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Flow => f.write_str("flow"),
            Self::Parallel => f.write_str("parallel"),
        }
    }
}

/// Identifies a flow call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowInfo {
    pub name: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
}

/// Identifies a parallel call site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelInfo {
    pub name: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
}

/// Identifies a task within a directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    pub name: String,
    pub file: String,
    pub line: usize,
    pub column: usize,
}

/// Identifies the directive a task belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectiveInfo {
    pub name: String,
    pub directive: Directive,
    pub file: String,
    pub line: usize,
    pub column: usize,
}

/// Identifies the scheduler driving a directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerInfo {
    pub name: String,
    pub directive: Directive,
    pub file: String,
    pub line: usize,
    pub column: usize,
}

/// Snapshot of scheduler progress, reported after every state transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerState {
    pub pending: usize,
    pub ready: usize,
    pub running: usize,
    pub done: usize,
}

/// Factory for the lifecycle event sinks consumed by generated code.
///
/// Generated code calls the `*_init` methods once per directive invocation and
/// then reports every lifecycle event to the returned sinks.
pub trait Emitter: Send + Sync {
    fn flow_init(&self, info: &FlowInfo) -> Box<dyn FlowEmitter>;
    fn parallel_init(&self, info: &ParallelInfo) -> Box<dyn ParallelEmitter>;
    fn scheduler_init(&self, info: &SchedulerInfo) -> Box<dyn SchedulerEmitter>;
    fn task_init(&self, info: &TaskInfo, directive: &DirectiveInfo) -> Box<dyn TaskEmitter>;
}

/// Sink for flow-level events.
pub trait FlowEmitter: Send + Sync {
    fn flow_success(&self, ctx: &Context);
    fn flow_error(&self, ctx: &Context, err: &Error);
    fn flow_skipped(&self, ctx: &Context, err: &Error);
    fn flow_done(&self, ctx: &Context, elapsed: Duration);

    /// Reports the task that failed the flow. Returns the emitter to use for
    /// all subsequent flow signals.
    fn flow_failed_task(&self, ctx: &Context, task: &str, err: &Error) -> Box<dyn FlowEmitter>;
}

/// Sink for parallel-level events.
pub trait ParallelEmitter: Send + Sync {
    fn parallel_success(&self, ctx: &Context);
    fn parallel_error(&self, ctx: &Context, err: &Error);
    fn parallel_skipped(&self, ctx: &Context, err: &Error);
    fn parallel_done(&self, ctx: &Context, elapsed: Duration);
}

/// Sink for per-task events.
pub trait TaskEmitter: Send + Sync {
    fn task_success(&self, ctx: &Context);
    fn task_error(&self, ctx: &Context, err: &Error);
    fn task_error_recovered(&self, ctx: &Context, err: &Error);
    fn task_skipped(&self, ctx: &Context, err: Option<&Error>);
    fn task_panic(&self, ctx: &Context, err: &Error);
    fn task_panic_recovered(&self, ctx: &Context, err: &Error);
    fn task_done(&self, ctx: &Context, elapsed: Duration);
}

/// Sink for scheduler progress snapshots.
pub trait SchedulerEmitter: Send + Sync {
    fn emit(&self, state: &SchedulerState);
}
