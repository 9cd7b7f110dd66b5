//! Per-request render jobs.
//!
//! [`JobHandle`] replaces a shared "generating" flag: every submission gets
//! its own handle whose state moves Pending → Rendering → Succeeded/Failed.

use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

use crossbeam_channel::Receiver;

use crate::pipeline::GenerationResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Rendering,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_finished(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

/// Shared state cell written by the job's worker.
#[derive(Debug, Clone)]
pub(crate) struct JobTracker {
    state: Arc<Mutex<JobState>>,
}

impl JobTracker {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(JobState::Pending)),
        }
    }

    pub(crate) fn set(&self, next: JobState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }

    fn get(&self) -> JobState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to one submitted generation request.
#[derive(Debug)]
pub struct JobHandle {
    tracker: JobTracker,
    done: Receiver<GenerationResponse>,
}

impl JobHandle {
    /// Run `work` on its own thread, tracking its state.
    pub(crate) fn spawn<F>(work: F) -> Self
    where
        F: FnOnce(&JobTracker) -> GenerationResponse + Send + 'static,
    {
        let tracker = JobTracker::new();
        let (tx, rx) = crossbeam_channel::bounded(1);
        let worker = tracker.clone();
        let spawned = thread::Builder::new()
            .name("mforge-job".to_string())
            .spawn(move || {
                let response = work(&worker);
                worker.set(if response.success {
                    JobState::Succeeded
                } else {
                    JobState::Failed
                });
                let _ = tx.send(response);
            });
        if let Err(e) = spawned {
            log::error!("failed to spawn job thread: {e}");
            tracker.set(JobState::Failed);
            let (tx, rx) = crossbeam_channel::bounded(1);
            let _ = tx.send(GenerationResponse::failure(format!(
                "failed to start job: {e}"
            )));
            return Self { tracker, done: rx };
        }
        Self { tracker, done: rx }
    }

    pub fn state(&self) -> JobState {
        self.tracker.get()
    }

    /// Block until the job finishes.
    pub fn wait(self) -> GenerationResponse {
        self.done.recv().unwrap_or_else(|_| {
            self.tracker.set(JobState::Failed);
            GenerationResponse::failure("job worker exited without a response")
        })
    }
}
