use std::time::Duration;

use crate::{
    Context, DirectiveInfo, Emitter, Error, FlowEmitter, FlowInfo, ParallelEmitter, ParallelInfo,
    SchedulerEmitter, SchedulerInfo, SchedulerState, TaskEmitter, TaskInfo,
};

/// Composes several emitters into one.
///
/// Every event fans out to each member in order; the factory methods return
/// stacks of the members' returns, so the composition holds at every level.
pub struct EmitterStack {
    emitters: Vec<Box<dyn Emitter>>,
}

impl EmitterStack {
    pub fn new(emitters: Vec<Box<dyn Emitter>>) -> Self {
        Self { emitters }
    }
}

impl Emitter for EmitterStack {
    fn flow_init(&self, info: &FlowInfo) -> Box<dyn FlowEmitter> {
        Box::new(FlowStack {
            emitters: self.emitters.iter().map(|e| e.flow_init(info)).collect(),
        })
    }

    fn parallel_init(&self, info: &ParallelInfo) -> Box<dyn ParallelEmitter> {
        Box::new(ParallelStack {
            emitters: self
                .emitters
                .iter()
                .map(|e| e.parallel_init(info))
                .collect(),
        })
    }

    fn scheduler_init(&self, info: &SchedulerInfo) -> Box<dyn SchedulerEmitter> {
        Box::new(SchedulerStack {
            emitters: self
                .emitters
                .iter()
                .map(|e| e.scheduler_init(info))
                .collect(),
        })
    }

    fn task_init(&self, info: &TaskInfo, directive: &DirectiveInfo) -> Box<dyn TaskEmitter> {
        Box::new(TaskStack {
            emitters: self
                .emitters
                .iter()
                .map(|e| e.task_init(info, directive))
                .collect(),
        })
    }
}

struct FlowStack {
    emitters: Vec<Box<dyn FlowEmitter>>,
}

impl FlowEmitter for FlowStack {
    fn flow_success(&self, ctx: &Context) {
        for e in &self.emitters {
            e.flow_success(ctx);
        }
    }

    fn flow_error(&self, ctx: &Context, err: &Error) {
        for e in &self.emitters {
            e.flow_error(ctx, err);
        }
    }

    fn flow_skipped(&self, ctx: &Context, err: &Error) {
        for e in &self.emitters {
            e.flow_skipped(ctx, err);
        }
    }

    fn flow_done(&self, ctx: &Context, elapsed: Duration) {
        for e in &self.emitters {
            e.flow_done(ctx, elapsed);
        }
    }

    fn flow_failed_task(&self, ctx: &Context, task: &str, err: &Error) -> Box<dyn FlowEmitter> {
        Box::new(FlowStack {
            emitters: self
                .emitters
                .iter()
                .map(|e| e.flow_failed_task(ctx, task, err))
                .collect(),
        })
    }
}

struct ParallelStack {
    emitters: Vec<Box<dyn ParallelEmitter>>,
}

impl ParallelEmitter for ParallelStack {
    fn parallel_success(&self, ctx: &Context) {
        for e in &self.emitters {
            e.parallel_success(ctx);
        }
    }

    fn parallel_error(&self, ctx: &Context, err: &Error) {
        for e in &self.emitters {
            e.parallel_error(ctx, err);
        }
    }

    fn parallel_skipped(&self, ctx: &Context, err: &Error) {
        for e in &self.emitters {
            e.parallel_skipped(ctx, err);
        }
    }

    fn parallel_done(&self, ctx: &Context, elapsed: Duration) {
        for e in &self.emitters {
            e.parallel_done(ctx, elapsed);
        }
    }
}

struct TaskStack {
    emitters: Vec<Box<dyn TaskEmitter>>,
}

impl TaskEmitter for TaskStack {
    fn task_success(&self, ctx: &Context) {
        for e in &self.emitters {
            e.task_success(ctx);
        }
    }

    fn task_error(&self, ctx: &Context, err: &Error) {
        for e in &self.emitters {
            e.task_error(ctx, err);
        }
    }

    fn task_error_recovered(&self, ctx: &Context, err: &Error) {
        for e in &self.emitters {
            e.task_error_recovered(ctx, err);
        }
    }

    fn task_skipped(&self, ctx: &Context, err: Option<&Error>) {
        for e in &self.emitters {
            e.task_skipped(ctx, err);
        }
    }

    fn task_panic(&self, ctx: &Context, err: &Error) {
        for e in &self.emitters {
            e.task_panic(ctx, err);
        }
    }

    fn task_panic_recovered(&self, ctx: &Context, err: &Error) {
        for e in &self.emitters {
            e.task_panic_recovered(ctx, err);
        }
    }

    fn task_done(&self, ctx: &Context, elapsed: Duration) {
        for e in &self.emitters {
            e.task_done(ctx, elapsed);
        }
    }
}

struct SchedulerStack {
    emitters: Vec<Box<dyn SchedulerEmitter>>,
}

impl SchedulerEmitter for SchedulerStack {
    fn emit(&self, state: &SchedulerState) {
        for e in &self.emitters {
            e.emit(state);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::Directive;
    use std::sync::{Arc, Mutex};

    /// Records every event it sees, tagged with the member's label.
    struct Recorder {
        label: &'static str,
        events: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn log(&self, event: &str) {
            self.events.lock().unwrap().push(format!("{}:{event}", self.label));
        }
    }

    impl Emitter for Recorder {
        fn flow_init(&self, info: &FlowInfo) -> Box<dyn FlowEmitter> {
            self.log(&format!("flow_init({})", info.name));
            Box::new(Recorder {
                label: self.label,
                events: Arc::clone(&self.events),
            })
        }

        fn parallel_init(&self, _info: &ParallelInfo) -> Box<dyn ParallelEmitter> {
            Box::new(crate::NopEmitter)
        }

        fn scheduler_init(&self, _info: &SchedulerInfo) -> Box<dyn SchedulerEmitter> {
            Box::new(crate::NopEmitter)
        }

        fn task_init(&self, info: &TaskInfo, _directive: &DirectiveInfo) -> Box<dyn TaskEmitter> {
            self.log(&format!("task_init({})", info.name));
            Box::new(Recorder {
                label: self.label,
                events: Arc::clone(&self.events),
            })
        }
    }

    impl FlowEmitter for Recorder {
        fn flow_success(&self, _ctx: &Context) {
            self.log("flow_success");
        }

        fn flow_error(&self, _ctx: &Context, _err: &Error) {
            self.log("flow_error");
        }

        fn flow_skipped(&self, _ctx: &Context, _err: &Error) {
            self.log("flow_skipped");
        }

        fn flow_done(&self, _ctx: &Context, _elapsed: Duration) {
            self.log("flow_done");
        }

        fn flow_failed_task(
            &self,
            _ctx: &Context,
            task: &str,
            _err: &Error,
        ) -> Box<dyn FlowEmitter> {
            self.log(&format!("flow_failed_task({task})"));
            Box::new(Recorder {
                label: self.label,
                events: Arc::clone(&self.events),
            })
        }
    }

    impl TaskEmitter for Recorder {
        fn task_success(&self, _ctx: &Context) {
            self.log("task_success");
        }

        fn task_error(&self, _ctx: &Context, _err: &Error) {
            self.log("task_error");
        }

        fn task_error_recovered(&self, _ctx: &Context, _err: &Error) {
            self.log("task_error_recovered");
        }

        fn task_skipped(&self, _ctx: &Context, _err: Option<&Error>) {
            self.log("task_skipped");
        }

        fn task_panic(&self, _ctx: &Context, _err: &Error) {
            self.log("task_panic");
        }

        fn task_panic_recovered(&self, _ctx: &Context, _err: &Error) {
            self.log("task_panic_recovered");
        }

        fn task_done(&self, _ctx: &Context, _elapsed: Duration) {
            self.log("task_done");
        }
    }

    fn stack_of_two() -> (EmitterStack, Arc<Mutex<Vec<String>>>) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let stack = EmitterStack::new(vec![
            Box::new(Recorder {
                label: "a",
                events: Arc::clone(&events),
            }),
            Box::new(Recorder {
                label: "b",
                events: Arc::clone(&events),
            }),
        ]);
        (stack, events)
    }

    fn flow_info() -> FlowInfo {
        FlowInfo {
            name: "f".to_owned(),
            file: "f.rs".to_owned(),
            line: 1,
            column: 1,
        }
    }

    #[test]
    fn test_flow_events_fan_out_in_order() {
        let (stack, events) = stack_of_two();
        let ctx = Context::background();

        let fe = stack.flow_init(&flow_info());
        fe.flow_success(&ctx);
        fe.flow_done(&ctx, Duration::from_millis(1));

        let got = events.lock().unwrap().clone();
        assert_eq!(
            vec![
                "a:flow_init(f)",
                "b:flow_init(f)",
                "a:flow_success",
                "b:flow_success",
                "a:flow_done",
                "b:flow_done",
            ],
            got
        );
    }

    #[test]
    fn test_failed_task_returns_replacement_stack() {
        let (stack, events) = stack_of_two();
        let ctx = Context::background();
        let err = Error::task("t", std::io::Error::new(std::io::ErrorKind::Other, "x"));

        let fe = stack.flow_init(&flow_info());
        let replaced = fe.flow_failed_task(&ctx, "t", &err);
        events.lock().unwrap().clear();

        // subsequent signals must go to the replacements of both members.
        replaced.flow_error(&ctx, &err);
        let got = events.lock().unwrap().clone();
        assert_eq!(vec!["a:flow_error", "b:flow_error"], got);
    }

    #[test]
    fn test_task_events_fan_out() {
        let (stack, events) = stack_of_two();
        let ctx = Context::background();

        let te = stack.task_init(
            &TaskInfo {
                name: "t".to_owned(),
                file: "f.rs".to_owned(),
                line: 2,
                column: 5,
            },
            &DirectiveInfo {
                name: "f".to_owned(),
                directive: Directive::Flow,
                file: "f.rs".to_owned(),
                line: 1,
                column: 1,
            },
        );
        te.task_skipped(&ctx, None);

        let got = events.lock().unwrap().clone();
        assert_eq!(
            vec!["a:task_init(t)", "b:task_init(t)", "a:task_skipped", "b:task_skipped"],
            got
        );
    }
}
