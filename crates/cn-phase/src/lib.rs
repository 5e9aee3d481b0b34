//! # cn-phase — The "Pulse" of CANON
//!
//! Lets N independently-running batch jobs (typically sharing one database
//! transaction) advance in lockstep through named phases: all before-hooks
//! done, then all database writes done, then all after-hooks done.
//!
//! Each job wraps its handler in a [`PhaseSyncer`] and awaits
//! [`PhaseSyncer::phase`] between logical steps; the controller
//! ([`phase_synced_settle`]) owns the barrier state machine, bounds how
//! many jobs are simultaneously active, runs before-phase hooks, and
//! propagates failure or cancellation to the siblings.
//!
//! The contract at the boundary is *settle, never reject*: the controller
//! always resolves with one outcome per job, in submission order, even
//! when jobs fail, the client cancels, or the machinery itself breaks.
//!
//! Scheduling is cooperative: "concurrency" bounds how many jobs are
//! un-phase-blocked at once (in-flight statements on the shared
//! transaction), not CPU parallelism.
//!
//! Convention: a job's first action is awaiting `phase()`, the
//! report-for-duty barrier the controller uses to admit the job into the
//! running phase.

pub mod controller;
pub mod syncer;

pub use controller::{
    phase_synced_settle, wake_count, BeforePhaseHook, CancelExempt, PhaseHookCtx, SettleOptions,
};
pub use syncer::PhaseSyncer;

use std::future::Future;
use std::sync::Arc;

use cn_core::{JobError, RequestContext};
use futures_util::future::BoxFuture;

/// Jobs produce opaque JSON values; heterogeneous batch parts settle into
/// one uniformly-typed result array.
pub type JobOutput = serde_json::Value;

/// What a job's future resolves to.
pub type JobResult = Result<JobOutput, JobError>;

/// A boxed job future.
pub type JobFuture = BoxFuture<'static, JobResult>;

/// A job function: receives its own syncer, captures everything else
/// (transaction handle, request context, resource mapping) in the closure.
pub type JobFn = Box<dyn FnOnce(Arc<PhaseSyncer>) -> JobFuture + Send>;

/// One unit of batch work: the job function plus the request it serves.
/// The request travels separately so the controller can build its
/// id-to-request lookup maps.
pub struct BatchJob {
    pub run: JobFn,
    pub request: Arc<RequestContext>,
}

impl BatchJob {
    pub fn new<F, Fut>(request: Arc<RequestContext>, job: F) -> Self
    where
        F: FnOnce(Arc<PhaseSyncer>) -> Fut + Send + 'static,
        Fut: Future<Output = JobResult> + Send + 'static,
    {
        Self {
            run: Box::new(move |syncer| Box::pin(job(syncer))),
            request,
        }
    }
}
