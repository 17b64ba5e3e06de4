use std::time::Duration;

use crate::{
    Context, DirectiveInfo, Emitter, Error, FlowEmitter, FlowInfo, ParallelEmitter, ParallelInfo,
    SchedulerEmitter, SchedulerInfo, SchedulerState, TaskEmitter, TaskInfo,
};

/// Emitter that ignores every event. Used whenever no emitter is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct NopEmitter;

/// Task emitter for uninstrumented tasks.
pub fn nop_task_emitter() -> Box<dyn TaskEmitter> {
    Box::new(NopEmitter)
}

impl Emitter for NopEmitter {
    fn flow_init(&self, _info: &FlowInfo) -> Box<dyn FlowEmitter> {
        Box::new(NopEmitter)
    }

    fn parallel_init(&self, _info: &ParallelInfo) -> Box<dyn ParallelEmitter> {
        Box::new(NopEmitter)
    }

    fn scheduler_init(&self, _info: &SchedulerInfo) -> Box<dyn SchedulerEmitter> {
        Box::new(NopEmitter)
    }

    fn task_init(&self, _info: &TaskInfo, _directive: &DirectiveInfo) -> Box<dyn TaskEmitter> {
        Box::new(NopEmitter)
    }
}

impl FlowEmitter for NopEmitter {
    fn flow_success(&self, _ctx: &Context) {}
    fn flow_error(&self, _ctx: &Context, _err: &Error) {}
    fn flow_skipped(&self, _ctx: &Context, _err: &Error) {}
    fn flow_done(&self, _ctx: &Context, _elapsed: Duration) {}

    fn flow_failed_task(&self, _ctx: &Context, _task: &str, _err: &Error) -> Box<dyn FlowEmitter> {
        Box::new(NopEmitter)
    }
}

impl ParallelEmitter for NopEmitter {
    fn parallel_success(&self, _ctx: &Context) {}
    fn parallel_error(&self, _ctx: &Context, _err: &Error) {}
    fn parallel_skipped(&self, _ctx: &Context, _err: &Error) {}
    fn parallel_done(&self, _ctx: &Context, _elapsed: Duration) {}
}

impl TaskEmitter for NopEmitter {
    fn task_success(&self, _ctx: &Context) {}
    fn task_error(&self, _ctx: &Context, _err: &Error) {}
    fn task_error_recovered(&self, _ctx: &Context, _err: &Error) {}
    fn task_skipped(&self, _ctx: &Context, _err: Option<&Error>) {}
    fn task_panic(&self, _ctx: &Context, _err: &Error) {}
    fn task_panic_recovered(&self, _ctx: &Context, _err: &Error) {}
    fn task_done(&self, _ctx: &Context, _elapsed: Duration) {}
}

impl SchedulerEmitter for NopEmitter {
    fn emit(&self, _state: &SchedulerState) {}
}
