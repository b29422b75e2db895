//! A single dedicated background thread draining named, fire-and-forget
//! tasks. Teardown flows hand their deferred work to the worker so cleanup
//! happens serialized and off the caller's thread.

use std::sync::{Arc, Condvar, Mutex};
use std::thread;

use crate::settings::WorkerSettings;
use crate::utils::{FastHashMap, HashValue};

use super::unwind::halt_unwinding;

type Job = Box<dyn FnOnce() + Send + 'static>;

struct Task {
    name: String,
    job: Job,
}

struct State {
    pending: FastHashMap<HashValue<str>, Task>,
    current: Option<String>,
    suspended: bool,
}

struct Inner {
    name: String,
    state: Mutex<State>,
    // Worker wakeups (new task or resume), end of the in-flight task, and
    // full drainage are three distinct events with distinct waiters.
    work_available: Condvar,
    task_finished: Condvar,
    drained: Condvar,
}

/// A background worker owning one thread that runs submitted tasks one at a
/// time, in no particular order, until the process ends.
///
/// Tasks are identified by name: submitting a name that is already pending
/// is skipped, which makes repeated teardown requests for the same target
/// idempotent. Task failures are logged and never stop the loop; submission
/// is fire-and-forget and no failure surfaces to the submitting thread.
#[derive(Clone)]
pub struct AsyncWorker {
    inner: Arc<Inner>,
}

impl AsyncWorker {
    /// Creates a worker with a named thread and the default stack size.
    pub fn new<T: Into<String>>(name: T) -> Self {
        Self::spawn(name.into(), None)
    }

    pub fn from_settings(settings: &WorkerSettings) -> Self {
        Self::spawn(settings.name.clone(), settings.stack_size)
    }

    fn spawn(name: String, stack_size: Option<usize>) -> Self {
        let inner = Arc::new(Inner {
            name: name.clone(),
            state: Mutex::new(State {
                pending: FastHashMap::default(),
                current: None,
                suspended: false,
            }),
            work_available: Condvar::new(),
            task_finished: Condvar::new(),
            drained: Condvar::new(),
        });

        let mut builder = thread::Builder::new().name(name);
        if let Some(stack_size) = stack_size {
            builder = builder.stack_size(stack_size);
        }

        let thread_inner = inner.clone();
        builder
            .spawn(move || Inner::run(&thread_inner))
            .expect("Could not spawn the async worker thread.");

        AsyncWorker { inner }
    }

    /// Submits a task. Returns false when a task with the same name is
    /// already pending, in which case the new one is discarded.
    pub fn submit<T, F>(&self, name: T, job: F) -> bool
    where
        T: Into<String>,
        F: FnOnce() + Send + 'static,
    {
        let name = name.into();
        let key = HashValue::from(name.as_str());

        let mut state = self.inner.state.lock().unwrap();
        if state.pending.contains_key(&key) {
            trace!("Task {} is already pending on worker {}; skipped.", name, self.inner.name);
            return false;
        }

        state.pending.insert(
            key,
            Task {
                name,
                job: Box::new(job),
            },
        );
        self.inner.work_available.notify_all();
        true
    }

    /// Blocks until every pending task has finished and nothing is in
    /// flight. There is no timeout; a task that never returns blocks this
    /// call forever.
    pub fn wait_for_executables_ending(&self) {
        let mut state = self.inner.state.lock().unwrap();
        while !state.pending.is_empty() || state.current.is_some() {
            state = self.inner.drained.wait(state).unwrap();
        }
    }

    /// Stops the worker from taking further tasks and blocks until any task
    /// already in flight has finished. Once this returns, no task is
    /// executing until `resume` is called.
    pub fn suspend(&self) {
        let mut state = self.inner.state.lock().unwrap();
        state.suspended = true;
        while state.current.is_some() {
            state = self.inner.task_finished.wait(state).unwrap();
        }
    }

    pub fn resume(&self) {
        let mut state = self.inner.state.lock().unwrap();
        state.suspended = false;
        self.inner.work_available.notify_all();
    }

    /// The number of tasks waiting to run, not counting one in flight.
    pub fn pending_count(&self) -> usize {
        self.inner.state.lock().unwrap().pending.len()
    }

    pub fn is_suspended(&self) -> bool {
        self.inner.state.lock().unwrap().suspended
    }

    /// The name of the task currently executing, if any.
    pub fn current_task(&self) -> Option<String> {
        self.inner.state.lock().unwrap().current.clone()
    }
}

impl Inner {
    fn run(inner: &Arc<Inner>) {
        loop {
            let task = {
                let mut state = inner.state.lock().unwrap();
                loop {
                    if state.suspended {
                        state = inner.work_available.wait(state).unwrap();
                        continue;
                    }

                    let key = state.pending.keys().next().cloned();
                    if let Some(key) = key {
                        // Removed from pending before execution; the
                        // in-flight marker covers the gap so drain and
                        // suspend barriers stay accurate.
                        let task = state.pending.remove(&key).unwrap();
                        state.current = Some(task.name.clone());
                        break task;
                    }

                    state = inner.work_available.wait(state).unwrap();
                }
            };

            if halt_unwinding(task.job).is_err() {
                warn!("Task {} panicked on worker {}.", task.name, inner.name);
            }

            let mut state = inner.state.lock().unwrap();
            state.current = None;
            inner.task_finished.notify_all();
            if state.pending.is_empty() {
                inner.drained.notify_all();
            }
        }
    }
}
