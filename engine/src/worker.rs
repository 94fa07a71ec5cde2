//! A single blocking worker driven by acknowledged control messages.
//!
//! Each control message carries a sequence number. The worker applies messages in order
//! and publishes its state together with the last sequence number it applied, so the
//! handle can wait for exactly its own message to take effect. While paused or finished
//! the worker blocks on the control channel.

use std::error::Error;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tokio::task::{self, JoinHandle};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Resume,
    Pause,
    Stop,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Paused,
    Running,
    /// The job ran to completion; a resume starts it again.
    Finished,
    /// The job returned an error; a resume starts it again.
    Failed,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerStatus {
    pub state: WorkerState,
    /// Sequence number of the last control message applied.
    pub acked: u64,
    /// Message of the error that moved the worker to [`WorkerState::Failed`].
    pub error: Option<String>,
}

impl WorkerStatus {
    const INITIAL: WorkerStatus = WorkerStatus {
        state: WorkerState::Paused,
        acked: 0,
        error: None,
    };

    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.state != WorkerState::Running
    }
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker is no longer running")]
    Gone,
    #[error("worker thread panicked: {0}")]
    Panicked(String),
}

/// Whether a job has more work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStep {
    Continue,
    Finished,
}

/// Work that a worker runs one attempt at a time.
///
/// Control messages are only looked at between attempts, so an attempt is never cut
/// short.
pub trait Job: Send + 'static {
    type Error: Error + Send + Sync + 'static;

    fn attempt(&mut self) -> Result<JobStep, Self::Error>;

    /// Called when the worker moves to running from any other state.
    fn on_resume(&mut self) {}

    /// Called when a running worker is paused.
    fn on_pause(&mut self) {}

    /// Called once before the worker exits.
    fn on_stop(&mut self) {}
}

#[derive(Debug, Clone, Copy)]
struct Command {
    seq: u64,
    control: Control,
}

pub struct WorkerHandle {
    control: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<WorkerStatus>,
    next_seq: u64,
    join: Option<JoinHandle<()>>,
    name: &'static str,
}

/// Start `job` on a dedicated blocking thread, initially paused.
///
/// Must be called from within a tokio runtime.
pub fn spawn_worker<J: Job>(name: &'static str, job: J) -> WorkerHandle {
    let (control_tx, control_rx) = mpsc::unbounded_channel();
    let (status_tx, status_rx) = watch::channel(WorkerStatus::INITIAL);
    let join = task::spawn_blocking(move || worker_loop(name, job, control_rx, status_tx));
    debug!(worker = name, "worker spawned");
    WorkerHandle {
        control: control_tx,
        status: status_rx,
        next_seq: 0,
        join: Some(join),
        name,
    }
}

impl WorkerHandle {
    #[must_use]
    pub fn status(&self) -> WorkerStatus {
        self.status.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WorkerStatus> {
        self.status.clone()
    }

    /// Resolves once the worker is running (or has already finished again).
    pub async fn resume(&mut self) -> Result<WorkerStatus, WorkerError> {
        self.send(Control::Resume).await
    }

    /// Resolves once the worker has finished its current attempt and is blocked.
    pub async fn pause(&mut self) -> Result<WorkerStatus, WorkerError> {
        self.send(Control::Pause).await
    }

    /// Stop the worker and wait for its thread to exit.
    pub async fn stop(mut self) -> Result<WorkerStatus, WorkerError> {
        let status = self.send(Control::Stop).await?;
        if let Some(join) = self.join.take() {
            join.await
                .map_err(|err| WorkerError::Panicked(err.to_string()))?;
        }
        Ok(status)
    }

    /// Wait until the worker leaves the running state on its own or is paused.
    pub async fn wait_until_idle(&mut self) -> Result<WorkerStatus, WorkerError> {
        let status = self
            .status
            .wait_for(WorkerStatus::is_idle)
            .await
            .map_err(|_| WorkerError::Gone)?;
        Ok(status.clone())
    }

    async fn send(&mut self, control: Control) -> Result<WorkerStatus, WorkerError> {
        self.next_seq += 1;
        let seq = self.next_seq;
        self.control
            .send(Command { seq, control })
            .map_err(|_| WorkerError::Gone)?;
        let status = self
            .status
            .wait_for(|status| status.acked >= seq)
            .await
            .map_err(|_| WorkerError::Gone)?;
        debug!(worker = self.name, ?control, state = ?status.state, "control acknowledged");
        Ok(status.clone())
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        // Best-effort stop if the owner exits early; do not block in Drop.
        if self.join.is_some() {
            self.next_seq += 1;
            let _ = self.control.send(Command {
                seq: self.next_seq,
                control: Control::Stop,
            });
        }
    }
}

fn worker_loop<J: Job>(
    name: &'static str,
    mut job: J,
    mut control: mpsc::UnboundedReceiver<Command>,
    status: watch::Sender<WorkerStatus>,
) {
    let mut state = WorkerState::Paused;
    let mut acked = 0;
    let mut error: Option<String> = None;

    loop {
        let command = if state == WorkerState::Running {
            match control.try_recv() {
                Ok(command) => Some(command),
                Err(mpsc::error::TryRecvError::Empty) => None,
                Err(mpsc::error::TryRecvError::Disconnected) => Some(Command {
                    seq: acked,
                    control: Control::Stop,
                }),
            }
        } else {
            Some(control.blocking_recv().unwrap_or(Command {
                seq: acked,
                control: Control::Stop,
            }))
        };

        if let Some(Command { seq, control }) = command {
            acked = seq;
            match control {
                Control::Resume => {
                    if state != WorkerState::Running {
                        error = None;
                        job.on_resume();
                        state = WorkerState::Running;
                    }
                }
                Control::Pause => {
                    if state == WorkerState::Running {
                        job.on_pause();
                        state = WorkerState::Paused;
                    }
                }
                Control::Stop => {
                    job.on_stop();
                    publish(&status, WorkerState::Stopped, acked, None);
                    debug!(worker = name, "worker stopped");
                    return;
                }
            }
            publish(&status, state, acked, error.clone());
            continue;
        }

        match job.attempt() {
            Ok(JobStep::Continue) => {}
            Ok(JobStep::Finished) => {
                state = WorkerState::Finished;
                debug!(worker = name, "job finished");
                publish(&status, state, acked, None);
            }
            Err(err) => {
                warn!(worker = name, "job failed: {err}");
                state = WorkerState::Failed;
                error = Some(err.to_string());
                publish(&status, state, acked, error.clone());
            }
        }
    }
}

fn publish(
    status: &watch::Sender<WorkerStatus>,
    state: WorkerState,
    acked: u64,
    error: Option<String>,
) {
    status.send_replace(WorkerStatus {
        state,
        acked,
        error,
    });
}

/// Lock a mutex shared with a worker, recovering the data if a holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
