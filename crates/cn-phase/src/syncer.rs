//! # Phase Syncer
//!
//! Wraps exactly one job. The syncer owns two one-directional channels:
//! an outbound control channel shared with the controller (`StepDone`,
//! `JobDone`, `JobFailed`) and a private inbound wake channel the
//! controller uses to resume (`Ready`) or abort (`Abort`) the job.
//!
//! The wrapped job is started eagerly at construction, not lazily. A job
//! that never awaits `phase()` again after its last meaningful step simply
//! runs to completion on its own schedule; legal and expected for the
//! final phase.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use cn_core::{JobError, ProtocolError, RequestContext};
use tokio::sync::{mpsc, Mutex};

use crate::{BatchJob, JobResult};

/// Syncer → controller progress events.
#[derive(Debug)]
pub(crate) enum CtrlEvent {
    StepDone { id: String, step: u32 },
    JobDone { id: String },
    JobFailed { id: String },
}

/// Controller → syncer wake signals.
#[derive(Debug)]
pub(crate) enum WakeSignal {
    Ready,
    Abort(ProtocolError),
}

/// The per-job synchronization handle passed to every job function.
pub struct PhaseSyncer {
    id: String,
    phase_cntr: AtomicU32,
    ctrl_tx: mpsc::UnboundedSender<CtrlEvent>,
    wake_rx: Mutex<mpsc::UnboundedReceiver<WakeSignal>>,
}

impl PhaseSyncer {
    /// Process-unique id, stable for the lifetime of the batch.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Number of `phase()` calls so far. Only ever increases.
    pub fn phases_entered(&self) -> u32 {
        self.phase_cntr.load(Ordering::SeqCst)
    }

    /// Suspend until the controller admits this job into the next phase.
    ///
    /// Every call after the first reports `StepDone` with the 1-based call
    /// number before suspending. An `Abort` signal converts the suspension
    /// into a typed error, which the job is expected to propagate with `?`.
    pub async fn phase(&self) -> Result<(), JobError> {
        let step = self.phase_cntr.fetch_add(1, Ordering::SeqCst) + 1;
        if step > 1 {
            self.ctrl_tx
                .send(CtrlEvent::StepDone {
                    id: self.id.clone(),
                    step,
                })
                .map_err(|_| JobError::Internal("phase controller is gone".into()))?;
        }
        tracing::trace!(job = %self.id, step, "waiting at phase barrier");

        match self.wake_rx.lock().await.recv().await {
            Some(WakeSignal::Ready) => Ok(()),
            Some(WakeSignal::Abort(err)) => Err(JobError::Protocol(err)),
            None => Err(JobError::Internal(
                "phase controller channel closed".into(),
            )),
        }
    }
}

/// Controller-side record of one spawned job.
pub(crate) struct SyncerHandle {
    pub id: String,
    pub request: Arc<RequestContext>,
    pub wake_tx: mpsc::UnboundedSender<WakeSignal>,
    pub task: tokio::task::JoinHandle<JobResult>,
}

/// Spawn a job under a fresh syncer. Exactly one of `JobDone`/`JobFailed`
/// is emitted when the job settles, and the owning request is flagged as
/// ended in both cases.
pub(crate) fn spawn_job(
    job: BatchJob,
    ctrl_tx: &mpsc::UnboundedSender<CtrlEvent>,
) -> SyncerHandle {
    let id = format!("job-{}", uuid::Uuid::new_v4().as_simple());
    let (wake_tx, wake_rx) = mpsc::unbounded_channel();
    let syncer = Arc::new(PhaseSyncer {
        id: id.clone(),
        phase_cntr: AtomicU32::new(0),
        ctrl_tx: ctrl_tx.clone(),
        wake_rx: Mutex::new(wake_rx),
    });

    let request = job.request.clone();
    let ctrl = ctrl_tx.clone();
    let job_id = id.clone();
    let task = tokio::spawn(async move {
        let result = (job.run)(syncer).await;
        request.mark_ended();
        let event = match &result {
            Ok(_) => CtrlEvent::JobDone { id: job_id },
            Err(_) => CtrlEvent::JobFailed { id: job_id },
        };
        // The controller may already be gone when the batch was aborted.
        let _ = ctrl.send(event);
        result
    });

    SyncerHandle {
        id,
        request: job.request,
        wake_tx,
        task,
    }
}
