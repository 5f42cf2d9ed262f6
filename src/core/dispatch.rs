//! Posting work to the UI thread.
//!
//! Everything that mutates windows runs on one thread. Other threads hold a
//! [`UiHandle`] and post [`UiTask`]s; the run loop drains them in arrival
//! order. A channel keeps each sender's tasks in FIFO order; there is no
//! ordering between different senders.
//!
//! A task aimed at a particular window carries a [`LivenessToken`]. If the
//! window is gone by the time the task is drained, the task is dropped
//! instead of run.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Weak};
use std::thread::{self, ThreadId};

use tracing::debug;

/// Owned by an object that tasks may target; dropping it kills every token
#[derive(Debug, Default)]
pub struct Liveness(Arc<()>);

impl Liveness {
    pub fn new() -> Self {
        Self(Arc::new(()))
    }

    pub fn token(&self) -> LivenessToken {
        LivenessToken(Arc::downgrade(&self.0))
    }
}

/// Weak observer of a [`Liveness`]
#[derive(Debug, Clone)]
pub struct LivenessToken(Weak<()>);

impl LivenessToken {
    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

/// A unit of work for the UI thread
pub struct UiTask<T> {
    label: &'static str,
    guard: Option<LivenessToken>,
    run: Box<dyn FnOnce(&mut T) + Send>,
}

impl<T> UiTask<T> {
    /// Task that always runs
    pub fn new(label: &'static str, run: impl FnOnce(&mut T) + Send + 'static) -> Self {
        Self {
            label,
            guard: None,
            run: Box::new(run),
        }
    }

    /// Task that runs only while `token` is alive
    pub fn guarded(
        label: &'static str,
        token: LivenessToken,
        run: impl FnOnce(&mut T) + Send + 'static,
    ) -> Self {
        Self {
            label,
            guard: Some(token),
            run: Box::new(run),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Run against `target`. Returns false when the guard had expired.
    pub fn run(self, target: &mut T) -> bool {
        if let Some(guard) = &self.guard {
            if !guard.is_alive() {
                debug!(task = self.label, "skipping task for a destroyed window");
                return false;
            }
        }
        (self.run)(target);
        true
    }
}

/// Cloneable, `Send` entry point for posting tasks
pub struct UiHandle<T> {
    tx: Sender<UiTask<T>>,
}

impl<T> Clone for UiHandle<T> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone() }
    }
}

impl<T> UiHandle<T> {
    /// Queue a task. Returns false once the UI thread has shut down.
    pub fn post(&self, task: UiTask<T>) -> bool {
        self.tx.send(task).is_ok()
    }
}

/// Receiving side, owned by the UI thread
pub struct UiDispatcher<T> {
    tx: Sender<UiTask<T>>,
    rx: Receiver<UiTask<T>>,
    ui_thread: ThreadId,
}

impl<T> UiDispatcher<T> {
    /// Create a dispatcher bound to the calling thread
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            tx,
            rx,
            ui_thread: thread::current().id(),
        }
    }

    pub fn handle(&self) -> UiHandle<T> {
        UiHandle { tx: self.tx.clone() }
    }

    /// True on the thread that created the dispatcher
    pub fn is_ui_thread(&self) -> bool {
        thread::current().id() == self.ui_thread
    }

    /// Take every task queued so far. Tasks posted while these run wait for
    /// the next call.
    pub fn take_pending(&self) -> Vec<UiTask<T>> {
        debug_assert!(self.is_ui_thread(), "UI tasks drained off the UI thread");
        self.rx.try_iter().collect()
    }
}

impl<T> Default for UiDispatcher<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_per_sender() {
        let dispatcher: UiDispatcher<Vec<u32>> = UiDispatcher::new();
        let handle = dispatcher.handle();

        let worker = thread::spawn(move || {
            for i in 0..5 {
                handle.post(UiTask::new("push", move |log: &mut Vec<u32>| log.push(i)));
            }
        });
        worker.join().unwrap();

        let mut log = Vec::new();
        for task in dispatcher.take_pending() {
            task.run(&mut log);
        }
        assert_eq!(log, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_guarded_task_skipped_after_drop() {
        let dispatcher: UiDispatcher<u32> = UiDispatcher::new();
        let liveness = Liveness::new();
        let token = liveness.token();

        dispatcher
            .handle()
            .post(UiTask::guarded("bump", token.clone(), |n: &mut u32| *n += 1));
        drop(liveness);

        let mut counter = 0;
        let ran: Vec<bool> = dispatcher
            .take_pending()
            .into_iter()
            .map(|task| task.run(&mut counter))
            .collect();
        assert_eq!(ran, vec![false]);
        assert_eq!(counter, 0);
        assert!(!token.is_alive());
    }
}
