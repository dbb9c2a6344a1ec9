//! Completion contexts: where a request's outcome is delivered.
//!
//! Work always runs on the background runtime. Once a request settles, the
//! observer call is handed to a [`CompletionContext`], which decides which
//! thread runs it.

use parking_lot::Mutex;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::{self, JoinHandle, ThreadId};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// A unit of delivery work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs delivery jobs on a chosen thread.
#[cfg_attr(test, mockall::automock)]
pub trait CompletionContext: Send + Sync {
    /// Schedules a job. Jobs dispatched from one thread run in dispatch order.
    fn dispatch(&self, job: Job);
}

/// Runs jobs on the dispatching thread, which is the background runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inline;

impl CompletionContext for Inline {
    fn dispatch(&self, job: Job) {
        job();
    }
}

/// Runs jobs as tasks on a tokio runtime.
#[derive(Debug, Clone)]
pub struct RuntimeContext {
    handle: Handle,
}

impl RuntimeContext {
    /// Delivers onto the given runtime.
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Delivers onto the runtime this is called from.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    #[must_use]
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl CompletionContext for RuntimeContext {
    fn dispatch(&self, job: Job) {
        self.handle.spawn(async move { job() });
    }
}

/// A dedicated thread draining a job queue in FIFO order.
///
/// This is the "main thread" of an application that wants every outcome
/// delivered on one known thread.
///
/// Once the loop is shut down, dispatched jobs are dropped with a warning.
/// A request whose outcome arrives after that is never delivered: its
/// [`Subscription`](super::Subscription) reports neither delivered nor
/// cancelled. Keep the loop alive until pending requests finish.
pub struct EventLoop {
    name: String,
    thread_id: ThreadId,
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl EventLoop {
    /// Starts a loop on a new named thread.
    pub fn spawn(name: impl Into<String>) -> std::io::Result<Self> {
        let name = name.into();
        let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();
        let loop_name = name.clone();

        let worker = thread::Builder::new().name(name.clone()).spawn(move || {
            while let Some(job) = receiver.blocking_recv() {
                if catch_unwind(AssertUnwindSafe(job)).is_err() {
                    warn!(event_loop = %loop_name, "Delivery job panicked");
                }
            }
            debug!(event_loop = %loop_name, "Event loop stopped");
        })?;

        Ok(Self {
            name,
            thread_id: worker.thread().id(),
            sender: Mutex::new(Some(sender)),
            worker: Mutex::new(Some(worker)),
        })
    }

    /// Loop thread name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier of the loop thread.
    #[must_use]
    pub fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Returns true if called from the loop thread.
    #[must_use]
    pub fn is_current(&self) -> bool {
        thread::current().id() == self.thread_id
    }

    /// Returns true once the loop stopped accepting jobs.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.sender.lock().is_none()
    }

    /// Stops accepting jobs, drains the queue and joins the thread.
    ///
    /// Called from the loop thread itself, this only closes the queue.
    pub fn shutdown(&self) {
        self.sender.lock().take();
        if self.is_current() {
            return;
        }
        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if worker.join().is_err() {
                warn!(event_loop = %self.name, "Event loop thread panicked");
            }
        }
    }
}

impl CompletionContext for EventLoop {
    fn dispatch(&self, job: Job) {
        let guard = self.sender.lock();
        let Some(sender) = guard.as_ref() else {
            warn!(event_loop = %self.name, "Dropping delivery, event loop is shut down");
            return;
        };
        if sender.send(job).is_err() {
            warn!(event_loop = %self.name, "Dropping delivery, event loop thread exited");
        }
    }
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        self.sender.get_mut().take();
    }
}

impl fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventLoop")
            .field("name", &self.name)
            .field("thread_id", &self.thread_id)
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}
