//! # cn-core — The "Contract" of CANON
//!
//! Defines the atoms every other crate agrees on: the request lifecycle
//! context, the typed protocol error, and the settled outcome of a job.
//!
//! Nothing in here does I/O. These are value types plus a handful of
//! atomic flags that travel across task boundaries inside an [`Arc`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Error code used for both client-initiated and cooperative cancellation.
pub const CODE_CANCELLED: &str = "cancelled";

/// Error code synthesized when the batch machinery itself fails.
pub const CODE_SETTLE_FAILED: &str = "phase.synced.settle.failed";

// =============================================================================
// Typed protocol errors
// =============================================================================

/// One entry in a protocol error's code list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEntry {
    pub code: String,
    pub message: String,
}

/// The typed protocol error.
///
/// Carries an HTTP-ish numeric status, a list of `{code, message}` entries,
/// and optionally the id of the sub-request it originated from. Status `0`
/// is reserved for client-initiated cancellation, `202` for cooperative
/// cancellation of sibling jobs, `500` for unexpected internal failures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("status {status}: [{}]", .errors.iter().map(|e| e.code.as_str()).collect::<Vec<_>>().join(", "))]
pub struct ProtocolError {
    pub status: u16,
    pub errors: Vec<ErrorEntry>,
    pub request_id: Option<String>,
}

impl ProtocolError {
    pub fn new(status: u16, code: &str, message: &str) -> Self {
        Self {
            status,
            errors: vec![ErrorEntry {
                code: code.to_string(),
                message: message.to_string(),
            }],
            request_id: None,
        }
    }

    /// Status-0 error raised when the client abandoned the root request.
    pub fn cancelled_by_client() -> Self {
        Self::new(0, CODE_CANCELLED, "Request cancelled by the client")
    }

    /// Status-202 error injected into sibling jobs when one job of a
    /// non-read-only batch fails.
    pub fn cancelled() -> Self {
        Self::new(202, CODE_CANCELLED, "Cancelled due to failure of another job in the batch")
    }

    /// Status-500 error synthesized for anything that was not already typed.
    pub fn internal(message: &str) -> Self {
        Self::new(500, CODE_SETTLE_FAILED, message)
    }

    /// Attach the id of the sub-request this error belongs to.
    pub fn with_request_id(mut self, request_id: &str) -> Self {
        self.request_id = Some(request_id.to_string());
        self
    }

    /// `true` if any entry carries the given code.
    pub fn has_code(&self, code: &str) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }
}

/// Outcome type of a single job: either already-typed, or an internal
/// failure that still has to be synthesized into a [`ProtocolError`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("internal job failure: {0}")]
    Internal(String),
}

impl JobError {
    /// Collapse into a typed protocol error; internal failures become the
    /// synthesized status-500 error so a batch always settles typed.
    pub fn into_protocol(self) -> ProtocolError {
        match self {
            Self::Protocol(e) => e,
            Self::Internal(msg) => ProtocolError::internal(&msg),
        }
    }
}

// =============================================================================
// Request lifecycle context
// =============================================================================

/// Request-scoped state shared between a job, its siblings and the batch
/// controller.
///
/// Batch sub-requests link to their parent; batch-wide flags (cancellation,
/// read-only policy) always live on the *root* of the chain. The flags are
/// atomics because jobs and the controller touch them from separate tasks.
#[derive(Debug)]
pub struct RequestContext {
    id: String,
    parent: Option<Arc<RequestContext>>,
    read_only: bool,
    cancelled: AtomicBool,
    ended: AtomicBool,
}

impl RequestContext {
    /// Create a top-level request.
    pub fn root_request(read_only: bool) -> Arc<Self> {
        Arc::new(Self {
            id: format!("req-{}", uuid::Uuid::new_v4().as_simple()),
            parent: None,
            read_only,
            cancelled: AtomicBool::new(false),
            ended: AtomicBool::new(false),
        })
    }

    /// Create a sub-request hanging off `parent`. The read-only policy is
    /// inherited; batch-wide decisions are taken on the root anyway.
    pub fn sub_request(parent: &Arc<Self>) -> Arc<Self> {
        Arc::new(Self {
            id: format!("req-{}", uuid::Uuid::new_v4().as_simple()),
            parent: Some(parent.clone()),
            read_only: parent.read_only,
            cancelled: AtomicBool::new(false),
            ended: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn read_only(&self) -> bool {
        self.read_only
    }

    /// Walk the parent chain up to the top-most request.
    pub fn root(self: &Arc<Self>) -> Arc<Self> {
        let mut current = self.clone();
        while let Some(parent) = current.parent.clone() {
            current = parent;
        }
        current
    }

    /// Flag this request as cancelled. Only meaningful on the root.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Set once the wrapped job has returned or thrown.
    pub fn mark_ended(&self) {
        self.ended.store(true, Ordering::SeqCst);
    }

    pub fn has_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Settled outcomes
// =============================================================================

/// The settled outcome of one job: fulfilled with a value or failed with a
/// typed error, never left pending. One entry per job, in submission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Settled<T> {
    Fulfilled(T),
    Failed(ProtocolError),
}

impl<T> Settled<T> {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Self::Fulfilled(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Fulfilled(v) => Some(v),
            Self::Failed(_) => None,
        }
    }

    pub fn reason(&self) -> Option<&ProtocolError> {
        match self {
            Self::Fulfilled(_) => None,
            Self::Failed(e) => Some(e),
        }
    }
}
