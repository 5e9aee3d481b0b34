//! # Phase Controller
//!
//! Owns the syncers of one batch and runs the synchronization state
//! machine. Three controller-owned sets drive it:
//!
//! - `pending` — jobs that have neither returned nor thrown; drained
//!   monotonically, drives batch completion.
//! - `phase_pending` — jobs that have not yet reached the barrier of the
//!   *current* phase; reset to the full pending set at every phase start
//!   (queued jobs must reach the barrier too before the phase can close).
//! - `queued` — pending jobs not yet woken this phase because the
//!   concurrency bound was reached; drained FIFO as active jobs report.
//!
//! All sets are mutated only by this module's event handlers, never
//! concurrently — the controller is the sole consumer of the control
//! channel.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use cn_core::{JobError, ProtocolError, RequestContext, Settled};
use tokio::sync::mpsc;

use crate::syncer::{spawn_job, CtrlEvent, SyncerHandle, WakeSignal};
use crate::{BatchJob, JobOutput, JobResult};

/// How many jobs of the current phase to wake: the concurrency bound
/// (floored at 1; zero would deadlock the batch) capped by what is
/// actually pending.
pub fn wake_count(pending: usize, concurrency: usize) -> usize {
    pending.min(concurrency.max(1))
}

/// Context handed to every before-phase hook.
pub struct PhaseHookCtx {
    /// Job id → request, for every job of the batch.
    pub requests: Arc<HashMap<String, Arc<RequestContext>>>,
    /// The full job registry, in submission order.
    pub jobs: Arc<Vec<String>>,
    /// Ids still pending at the start of this phase.
    pub pending: Vec<String>,
}

/// Global hook invoked before each phase, once at least one job is about
/// to be woken for it. Hooks run sequentially; the first error short-
/// circuits the phase. Hooks may mutate request state but never resize
/// the pending set — they act as part of the phase transition.
#[async_trait]
pub trait BeforePhaseHook: Send + Sync {
    async fn before_phase(&self, ctx: &PhaseHookCtx) -> Result<(), JobError>;
}

/// Caller-supplied predicate marking requests whose jobs must be skipped
/// by the failure broadcast because a more specific error will reach them
/// by other means (typically routed out of a before-phase hook). An
/// exempted job that is left suspended with no such error cannot settle.
pub type CancelExempt = Arc<dyn Fn(&RequestContext) -> bool + Send + Sync>;

/// Options for one controller invocation.
pub struct SettleOptions {
    /// Maximum number of simultaneously active (un-phase-blocked) jobs.
    /// Zero is invalid and treated as 1, i.e. strictly sequential.
    pub concurrency: usize,
    pub before_phase_hooks: Vec<Arc<dyn BeforePhaseHook>>,
    pub cancel_exempt: Option<CancelExempt>,
}

impl Default for SettleOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            before_phase_hooks: Vec::new(),
            cancel_exempt: None,
        }
    }
}

struct JobRecord {
    request: Arc<RequestContext>,
    wake_tx: mpsc::UnboundedSender<WakeSignal>,
}

struct Controller {
    concurrency: usize,
    hooks: Vec<Arc<dyn BeforePhaseHook>>,
    cancel_exempt: Option<CancelExempt>,
    order: Arc<Vec<String>>,
    jobs: HashMap<String, JobRecord>,
    requests: Arc<HashMap<String, Arc<RequestContext>>>,
    /// Request id → job id, so an error raised for a specific sub-request
    /// reaches the right syncer even when another job reported first.
    by_request_id: HashMap<String, String>,
    pending: Vec<String>,
    queued: VecDeque<String>,
    phase_pending: HashSet<String>,
    failure_broadcast: bool,
    aborted: bool,
}

/// Run `jobs` phase-synchronized and settle every one of them.
///
/// Returns one record per job, in submission order. This never rejects:
/// job failures, cooperative cancellation and even controller-level
/// failures all surface as `Settled::Failed` slots.
pub async fn phase_synced_settle(
    jobs: Vec<BatchJob>,
    options: SettleOptions,
) -> Vec<Settled<JobOutput>> {
    let (ctrl_tx, mut ctrl_rx) = mpsc::unbounded_channel();

    let mut order = Vec::with_capacity(jobs.len());
    let mut records = HashMap::with_capacity(jobs.len());
    let mut requests = HashMap::with_capacity(jobs.len());
    let mut by_request_id = HashMap::with_capacity(jobs.len());
    let mut tasks = Vec::with_capacity(jobs.len());

    for job in jobs {
        let SyncerHandle {
            id,
            request,
            wake_tx,
            task,
        } = spawn_job(job, &ctrl_tx);
        order.push(id.clone());
        requests.insert(id.clone(), request.clone());
        by_request_id.insert(request.id().to_string(), id.clone());
        records.insert(id, JobRecord { request, wake_tx });
        tasks.push(task);
    }
    // Only the job tasks hold senders now; the channel closes when the
    // last job settles.
    drop(ctrl_tx);

    let pending = order.clone();
    let mut controller = Controller {
        concurrency: options.concurrency,
        hooks: options.before_phase_hooks,
        cancel_exempt: options.cancel_exempt,
        order: Arc::new(order),
        pending,
        jobs: records,
        requests: Arc::new(requests),
        by_request_id,
        queued: VecDeque::new(),
        phase_pending: HashSet::new(),
        failure_broadcast: false,
        aborted: false,
    };

    match controller.run(&mut ctrl_rx).await {
        Ok(()) => {
            let mut results = Vec::with_capacity(tasks.len());
            for task in tasks {
                results.push(settle_task(task).await);
            }
            results
        }
        Err(err) => {
            tracing::warn!(error = %err, "phase-synced settle failed; aborting batch");
            controller.broadcast_abort(ProtocolError::cancelled(), false);
            for task in &mut tasks {
                let _ = task.await;
            }
            let uniform = err.into_protocol();
            (0..tasks.len())
                .map(|_| Settled::Failed(uniform.clone()))
                .collect()
        }
    }
}

async fn settle_task(task: tokio::task::JoinHandle<JobResult>) -> Settled<JobOutput> {
    match task.await {
        Ok(Ok(value)) => Settled::Fulfilled(value),
        Ok(Err(err)) => Settled::Failed(err.into_protocol()),
        Err(join_err) => {
            Settled::Failed(ProtocolError::internal(&format!("job task aborted: {}", join_err)))
        }
    }
}

impl Controller {
    async fn run(
        &mut self,
        ctrl_rx: &mut mpsc::UnboundedReceiver<CtrlEvent>,
    ) -> Result<(), JobError> {
        // Errors out of the very first phase start (hook failures included)
        // escape to the caller: that is the top-level failure path.
        self.start_new_phase().await?;

        while !self.pending.is_empty() {
            let event = ctrl_rx.recv().await.ok_or_else(|| {
                JobError::Internal("control channel closed with jobs pending".into())
            })?;
            match event {
                CtrlEvent::StepDone { id, step } => {
                    tracing::debug!(job = %id, step, "step done");
                    self.phase_pending.remove(&id);
                    if self.aborted {
                        continue;
                    }
                    // The one and only cancellation check per phase
                    // transition: on receipt of the step report.
                    if self.root_of(&id).map_or(false, |r| r.is_cancelled()) {
                        tracing::debug!("root request cancelled; aborting batch");
                        self.broadcast_abort(ProtocolError::cancelled_by_client(), false);
                    } else {
                        self.advance(Some(id.as_str())).await;
                    }
                }
                CtrlEvent::JobDone { id } => {
                    tracing::debug!(job = %id, "job done");
                    self.remove_everywhere(&id);
                    self.advance(Some(id.as_str())).await;
                }
                CtrlEvent::JobFailed { id } => {
                    tracing::debug!(job = %id, "job failed");
                    self.remove_everywhere(&id);
                    let read_only = self.root_of(&id).map_or(false, |r| r.read_only());
                    if read_only {
                        // A failed read does not abort sibling reads.
                        self.advance(Some(id.as_str())).await;
                    } else if !self.failure_broadcast {
                        self.broadcast_abort(ProtocolError::cancelled(), true);
                    }
                }
            }
        }
        Ok(())
    }

    /// Split the pending set into "wake now" and "queue", run the hooks,
    /// and admit the wake list. The phase-pending set is the *whole*
    /// pending set: queued jobs must reach the barrier too.
    async fn start_new_phase(&mut self) -> Result<(), JobError> {
        let wake_n = wake_count(self.pending.len(), self.concurrency);
        let wake: Vec<String> = self.pending.iter().take(wake_n).cloned().collect();
        self.queued = self.pending.iter().skip(wake_n).cloned().collect();
        self.phase_pending = self.pending.iter().cloned().collect();

        if !wake.is_empty() {
            let ctx = PhaseHookCtx {
                requests: self.requests.clone(),
                jobs: self.order.clone(),
                pending: self.pending.clone(),
            };
            for hook in &self.hooks {
                hook.before_phase(&ctx).await?;
            }
        }
        for id in wake {
            self.send_wake(&id, WakeSignal::Ready);
        }
        Ok(())
    }

    /// Close the phase if everyone reported, otherwise hand the freed
    /// concurrency slot to the next queued job.
    async fn advance(&mut self, reporting: Option<&str>) {
        if self.aborted || self.pending.is_empty() {
            return;
        }
        if self.phase_pending.is_empty() {
            if let Err(err) = self.start_new_phase().await {
                self.route_error(err, reporting);
            }
        } else if let Some(id) = self.queued.pop_front() {
            self.send_wake(&id, WakeSignal::Ready);
        }
    }

    /// Push an abort into every still-pending syncer's wake channel.
    /// `respect_exempt` is set for the first-failure broadcast only;
    /// client cancellation and top-level failure spare nobody.
    fn broadcast_abort(&mut self, err: ProtocolError, respect_exempt: bool) {
        self.failure_broadcast = true;
        if !respect_exempt {
            self.aborted = true;
        }
        for id in self.pending.clone() {
            if respect_exempt {
                if let (Some(exempt), Some(record)) = (&self.cancel_exempt, self.jobs.get(&id)) {
                    if exempt(&record.request) {
                        tracing::debug!(job = %id, "failure broadcast skips exempted job");
                        continue;
                    }
                }
            }
            self.send_wake(&id, WakeSignal::Abort(err.clone()));
        }
    }

    /// Route a hook/dispatch error to the syncer it belongs to: by the
    /// sub-request id it carries, else to the reporting job, else log and
    /// swallow — a single misrouted error must not crash the controller.
    fn route_error(&mut self, err: JobError, reporting: Option<&str>) {
        let protocol = err.into_protocol();
        let target = protocol
            .request_id
            .as_ref()
            .and_then(|rid| self.by_request_id.get(rid))
            .cloned()
            .or_else(|| {
                reporting
                    .filter(|id| self.jobs.contains_key(*id))
                    .map(str::to_string)
            });
        match target {
            Some(id) => self.send_wake(&id, WakeSignal::Abort(protocol)),
            None => {
                tracing::warn!(error = %protocol, "unroutable error in phase controller; dropped")
            }
        }
    }

    fn remove_everywhere(&mut self, id: &str) {
        self.pending.retain(|p| p != id);
        self.queued.retain(|p| p != id);
        self.phase_pending.remove(id);
    }

    fn root_of(&self, id: &str) -> Option<Arc<RequestContext>> {
        self.jobs.get(id).map(|record| record.request.root())
    }

    fn send_wake(&self, id: &str, signal: WakeSignal) {
        if let Some(record) = self.jobs.get(id) {
            if record.wake_tx.send(signal).is_err() {
                tracing::trace!(job = %id, "wake signal dropped; job already settled");
            }
        }
    }
}
