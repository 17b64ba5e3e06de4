use std::time::Duration;

use crate::{
    Context, DirectiveInfo, Emitter, Error, FlowEmitter, FlowInfo, ParallelEmitter, ParallelInfo,
    SchedulerEmitter, SchedulerInfo, SchedulerState, TaskEmitter, TaskInfo,
};

/// Emitter that reports lifecycle events through the `log` crate at debug
/// level. Scheduler snapshots go out at trace level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogEmitter;

impl Emitter for LogEmitter {
    fn flow_init(&self, info: &FlowInfo) -> Box<dyn FlowEmitter> {
        Box::new(FlowLogger { flow: info.name.clone() })
    }

    fn parallel_init(&self, info: &ParallelInfo) -> Box<dyn ParallelEmitter> {
        Box::new(ParallelLogger { parallel: info.name.clone() })
    }

    fn scheduler_init(&self, info: &SchedulerInfo) -> Box<dyn SchedulerEmitter> {
        Box::new(SchedulerLogger { name: info.name.clone() })
    }

    fn task_init(&self, info: &TaskInfo, directive: &DirectiveInfo) -> Box<dyn TaskEmitter> {
        Box::new(TaskLogger {
            flow: directive.name.clone(),
            task: info.name.clone(),
        })
    }
}

struct FlowLogger {
    flow: String,
}

impl FlowEmitter for FlowLogger {
    fn flow_success(&self, _ctx: &Context) {
        log::debug!("flow success [flow={}]", self.flow);
    }

    fn flow_error(&self, _ctx: &Context, err: &Error) {
        log::debug!("flow error [flow={}]: {err}", self.flow);
    }

    fn flow_skipped(&self, _ctx: &Context, err: &Error) {
        log::debug!("flow skipped [flow={}]: {err}", self.flow);
    }

    fn flow_done(&self, _ctx: &Context, elapsed: Duration) {
        log::debug!("flow done [flow={}] in {elapsed:?}", self.flow);
    }

    fn flow_failed_task(&self, _ctx: &Context, task: &str, err: &Error) -> Box<dyn FlowEmitter> {
        log::debug!("flow failed task [flow={} task={task}]: {err}", self.flow);
        Box::new(FlowLogger { flow: self.flow.clone() })
    }
}

struct ParallelLogger {
    parallel: String,
}

impl ParallelEmitter for ParallelLogger {
    fn parallel_success(&self, _ctx: &Context) {
        log::debug!("parallel success [parallel={}]", self.parallel);
    }

    fn parallel_error(&self, _ctx: &Context, err: &Error) {
        log::debug!("parallel error [parallel={}]: {err}", self.parallel);
    }

    fn parallel_skipped(&self, _ctx: &Context, err: &Error) {
        log::debug!("parallel skipped [parallel={}]: {err}", self.parallel);
    }

    fn parallel_done(&self, _ctx: &Context, elapsed: Duration) {
        log::debug!("parallel done [parallel={}] in {elapsed:?}", self.parallel);
    }
}

struct TaskLogger {
    flow: String,
    task: String,
}

impl TaskLogger {
    fn log(&self, event: &str) {
        log::debug!("{event} [flow={} task={}]", self.flow, self.task);
    }
}

impl TaskEmitter for TaskLogger {
    fn task_success(&self, _ctx: &Context) {
        self.log("task success");
    }

    fn task_error(&self, _ctx: &Context, err: &Error) {
        log::debug!("task error [flow={} task={}]: {err}", self.flow, self.task);
    }

    fn task_error_recovered(&self, _ctx: &Context, err: &Error) {
        log::debug!(
            "task error recovered [flow={} task={}]: {err}",
            self.flow,
            self.task
        );
    }

    fn task_skipped(&self, _ctx: &Context, _err: Option<&Error>) {
        self.log("task skipped");
    }

    fn task_panic(&self, _ctx: &Context, err: &Error) {
        log::debug!("task panic [flow={} task={}]: {err}", self.flow, self.task);
    }

    fn task_panic_recovered(&self, _ctx: &Context, err: &Error) {
        log::debug!(
            "task panic recovered [flow={} task={}]: {err}",
            self.flow,
            self.task
        );
    }

    fn task_done(&self, _ctx: &Context, elapsed: Duration) {
        log::debug!(
            "task done [flow={} task={}] in {elapsed:?}",
            self.flow,
            self.task
        );
    }
}

struct SchedulerLogger {
    name: String,
}

impl SchedulerEmitter for SchedulerLogger {
    fn emit(&self, state: &SchedulerState) {
        log::trace!(
            "scheduler [{}] pending={} ready={} running={} done={}",
            self.name,
            state.pending,
            state.ready,
            state.running,
            state.done
        );
    }
}
