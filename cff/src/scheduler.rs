use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};

use crate::{Context, Error, SchedulerEmitter, SchedulerState};

/// Worker count used when the DSL does not specify `concurrency`.
/// A fixed default keeps generated output deterministic across machines.
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Handle to an enqueued job, used to declare dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobId(usize);

type RunFn<'env> = Box<dyn FnOnce(&Context) -> crate::Result<()> + Send + 'env>;

/// A unit of work plus the jobs that must complete before it starts.
pub struct Job<'env> {
    run: RunFn<'env>,
    deps: Vec<JobId>,
}

impl<'env> Job<'env> {
    pub fn new(run: impl FnOnce(&Context) -> crate::Result<()> + Send + 'env) -> Self {
        Self {
            run: Box::new(run),
            deps: Vec::new(),
        }
    }

    /// Declare that this job must not start before `deps` have completed.
    pub fn after(mut self, deps: &[JobId]) -> Self {
        self.deps.extend_from_slice(deps);
        self
    }
}

/// Runs jobs on a bounded worker pool, honoring dependency edges.
///
/// Jobs are recorded by [`enqueue`](Self::enqueue) and executed by
/// [`run`](Self::run), which blocks until everything reachable has finished.
/// Dependency completion happens-before dependent start. On the first error,
/// dispatch stops (in-flight jobs finish) unless `continue_on_error` is set;
/// either way `run` returns the first error observed.
pub struct Scheduler<'env> {
    jobs: Vec<Job<'env>>,
    concurrency: usize,
    emitter: Box<dyn SchedulerEmitter>,
    continue_on_error: bool,
}

impl<'env> Scheduler<'env> {
    pub fn new(concurrency: usize, emitter: Box<dyn SchedulerEmitter>) -> Self {
        Self {
            jobs: Vec::new(),
            concurrency: concurrency.max(1),
            emitter,
            continue_on_error: false,
        }
    }

    /// Keep dispatching after an error. Used by parallels; flows always halt.
    pub fn continue_on_error(mut self, yes: bool) -> Self {
        self.continue_on_error = yes;
        self
    }

    /// Record a job. Dependencies must refer to already-enqueued jobs.
    pub fn enqueue(&mut self, job: Job<'env>) -> JobId {
        let id = JobId(self.jobs.len());
        debug_assert!(job.deps.iter().all(|d| d.0 < id.0));
        self.jobs.push(job);
        id
    }

    /// Execute all enqueued jobs and return the first error, if any.
    pub fn run(self, ctx: &Context) -> crate::Result<()> {
        let Scheduler {
            jobs,
            concurrency,
            emitter,
            continue_on_error,
        } = self;
        let total = jobs.len();
        if total == 0 {
            return Ok(());
        }

        let mut runs: Vec<Option<RunFn<'env>>> = Vec::with_capacity(total);
        let mut dep_counts = vec![0usize; total];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); total];
        for (i, job) in jobs.into_iter().enumerate() {
            dep_counts[i] = job.deps.len();
            for JobId(d) in job.deps {
                dependents[d].push(i);
            }
            runs.push(Some(job.run));
        }
        let ready: VecDeque<usize> = (0..total).filter(|&i| dep_counts[i] == 0).collect();

        let state = Mutex::new(State {
            runs,
            dep_counts,
            ready,
            running: 0,
            done: 0,
            first_err: None,
        });
        let cv = Condvar::new();
        let workers = concurrency.min(total);

        std::thread::scope(|s| {
            for _ in 0..workers {
                s.spawn(|| {
                    work(
                        &state,
                        &cv,
                        ctx,
                        &*emitter,
                        &dependents,
                        continue_on_error,
                        total,
                    )
                });
            }
        });

        match state.into_inner().unwrap().first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

struct State<'env> {
    runs: Vec<Option<RunFn<'env>>>,
    dep_counts: Vec<usize>,
    ready: VecDeque<usize>,
    running: usize,
    done: usize,
    first_err: Option<Error>,
}

impl State<'_> {
    fn snapshot(&self, total: usize) -> SchedulerState {
        SchedulerState {
            pending: total - self.done - self.running - self.ready.len(),
            ready: self.ready.len(),
            running: self.running,
            done: self.done,
        }
    }
}

/// Worker loop: pop a ready job, run it outside the lock, propagate
/// completion to dependents. Exits once nothing is ready and nothing is
/// running; undispatched jobs at that point were skipped.
fn work<'env>(
    state: &Mutex<State<'env>>,
    cv: &Condvar,
    ctx: &Context,
    emitter: &dyn SchedulerEmitter,
    dependents: &[Vec<usize>],
    continue_on_error: bool,
    total: usize,
) {
    let mut st = state.lock().unwrap();
    loop {
        if let Some(i) = st.ready.pop_front() {
            if ctx.is_cancelled() {
                if st.first_err.is_none() {
                    st.first_err = Some(Error::Cancelled);
                }
                st.ready.clear();
                cv.notify_all();
                continue;
            }

            let run = st.runs[i].take().expect("job dispatched twice");
            st.running += 1;
            emitter.emit(&st.snapshot(total));
            drop(st);

            let result = run(ctx);

            st = state.lock().unwrap();
            st.running -= 1;
            st.done += 1;
            match result {
                Ok(()) => release_dependents(&mut st, &dependents[i]),
                Err(err) => {
                    if st.first_err.is_none() {
                        st.first_err = Some(err);
                    }
                    if continue_on_error {
                        release_dependents(&mut st, &dependents[i]);
                    } else {
                        st.ready.clear();
                    }
                }
            }
            emitter.emit(&st.snapshot(total));
            cv.notify_all();
            continue;
        }

        if st.running == 0 {
            cv.notify_all();
            return;
        }
        st = cv.wait(st).unwrap();
    }
}

fn release_dependents(st: &mut State<'_>, dependents: &[usize]) {
    for &d in dependents {
        st.dep_counts[d] -= 1;
        if st.dep_counts[d] == 0 {
            st.ready.push_back(d);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Cell, NopEmitter};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Barrier, Mutex as StdMutex};

    fn nop() -> Box<dyn SchedulerEmitter> {
        Box::new(NopEmitter)
    }

    #[test]
    fn test_dependency_order() {
        let order = StdMutex::new(Vec::new());
        let cell = Cell::new();

        let mut sched = Scheduler::new(4, nop());
        let j1 = sched.enqueue(Job::new(|_| {
            order.lock().unwrap().push("produce");
            cell.set(21u32);
            Ok(())
        }));
        sched.enqueue(
            Job::new(|_| {
                order.lock().unwrap().push("consume");
                assert_eq!(21, cell.get_cloned());
                Ok(())
            })
            .after(&[j1]),
        );

        sched.run(&Context::background()).unwrap();
        assert_eq!(vec!["produce", "consume"], *order.lock().unwrap());
    }

    #[test]
    fn test_jobs_run_concurrently() {
        // both jobs block until the other arrives; only passes if the
        // scheduler actually runs them on two workers.
        let barrier = Barrier::new(2);
        let mut sched = Scheduler::new(2, nop());
        for _ in 0..2 {
            sched.enqueue(Job::new(|_| {
                barrier.wait();
                Ok(())
            }));
        }
        sched.run(&Context::background()).unwrap();
    }

    #[test]
    fn test_first_error_halts_dispatch() {
        let ran = AtomicUsize::new(0);
        let mut sched = Scheduler::new(1, nop());
        let failing = sched.enqueue(Job::new(|_| {
            Err(Error::task(
                "boom",
                std::io::Error::new(std::io::ErrorKind::Other, "bad"),
            ))
        }));
        sched.enqueue(
            Job::new(|_| {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .after(&[failing]),
        );
        sched.enqueue(Job::new(|_| {
            ran.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        let err = sched.run(&Context::background()).unwrap_err();
        assert_eq!(Some("boom"), err.task_name());
        assert_eq!(0, ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_continue_on_error_runs_everything() {
        let ran = AtomicUsize::new(0);
        let mut sched = Scheduler::new(2, nop()).continue_on_error(true);
        sched.enqueue(Job::new(|_| {
            Err(Error::task(
                "first",
                std::io::Error::new(std::io::ErrorKind::Other, "bad"),
            ))
        }));
        for _ in 0..3 {
            sched.enqueue(Job::new(|_| {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }));
        }

        let err = sched.run(&Context::background()).unwrap_err();
        assert_eq!(Some("first"), err.task_name());
        assert_eq!(3, ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_cancelled_context_skips_jobs() {
        let ran = AtomicUsize::new(0);
        let (ctx, cancel) = Context::background().with_cancel();
        cancel.cancel();

        let mut sched = Scheduler::new(2, nop());
        sched.enqueue(Job::new(|_| {
            ran.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }));

        let err = sched.run(&ctx).unwrap_err();
        assert!(matches!(err, Error::Cancelled));
        assert_eq!(0, ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_empty_scheduler() {
        let sched = Scheduler::new(4, nop());
        sched.run(&Context::background()).unwrap();
    }
}
