use serde::{Deserialize, Serialize};

/// Per-item status within the queue.
///
/// Lifecycle: Pending -> Processing -> Completed/Error. Transitions are
/// driven by the processor only; external code can append, remove, and
/// retry items but never set a status directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ItemStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Processing => "processing",
            ItemStatus::Completed => "completed",
            ItemStatus::Error => "error",
        }
    }
}

/// Reference to the underlying asset a work item describes.
///
/// Either the raw bytes of an image (vision analysis path) or a bare
/// file name (text-only analysis path, used for formats the model
/// cannot inspect visually such as EPS or PSD). Raw bytes are excluded
/// from serialization; event payloads and snapshots carry only the
/// name and mime type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SourceRef {
    #[serde(rename_all = "camelCase")]
    Asset {
        name: String,
        mime: String,
        #[serde(skip)]
        bytes: Vec<u8>,
    },
    #[serde(rename_all = "camelCase")]
    Filename { name: String },
}

impl SourceRef {
    /// An in-memory asset with a mime type, analyzed visually.
    pub fn asset(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        SourceRef::Asset {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// A bare file name, analyzed from the name alone.
    pub fn filename(name: impl Into<String>) -> Self {
        SourceRef::Filename { name: name.into() }
    }

    /// The display/export name of the underlying asset.
    pub fn name(&self) -> &str {
        match self {
            SourceRef::Asset { name, .. } => name,
            SourceRef::Filename { name } => name,
        }
    }
}

/// Generated metadata for a single asset.
///
/// Keywords are ordered by relevance and may contain duplicates; the
/// pipeline never deduplicates or reorders them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemMetadata {
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
}

/// Coarse category of a per-item failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    AuthenticationFailure,
    RateLimited,
    MalformedRequest,
    TransientNetworkFailure,
    EmptyOrInvalidResponse,
}

/// Display budget for error messages attached to items.
const DISPLAY_MESSAGE_LIMIT: usize = 60;

/// Failure details attached to an item in `Error` status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDetail {
    pub kind: ErrorKind,
    /// Human-readable message, truncated for inline display.
    pub message: String,
}

impl ErrorDetail {
    /// Build a detail record, truncating the raw message to the
    /// display budget.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message: String = message.into();
        let message = if message.chars().count() > DISPLAY_MESSAGE_LIMIT {
            let mut truncated: String = message.chars().take(DISPLAY_MESSAGE_LIMIT).collect();
            truncated.push_str("...");
            truncated
        } else {
            message
        };
        Self { kind, message }
    }
}

/// A single unit of batch work.
///
/// Invariant: `metadata` is set iff `status == Completed`, `error` is
/// set iff `status == Error`; both are absent while the item is
/// `Pending` or `Processing`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkItem {
    /// Unique identifier, assigned at enqueue and stable for life.
    pub id: String,
    /// The underlying asset reference.
    pub source: SourceRef,
    /// Current processing status.
    pub status: ItemStatus,
    /// Generated metadata, present only when completed.
    pub metadata: Option<ItemMetadata>,
    /// Failure details, present only when errored.
    pub error: Option<ErrorDetail>,
    /// Processing duration in milliseconds, set once the item settles.
    pub duration_ms: Option<u64>,
    /// ISO 8601 timestamp when the item was enqueued.
    pub created_at: String,
}

/// Summary of a completed processor run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Items dispatched to the completion service during this run.
    pub processed: usize,
    pub completed: usize,
    pub failed: usize,
    /// Items that failed with an authentication error.
    pub auth_failures: usize,
    /// Items that failed with a rate-limit/quota error.
    pub rate_limited: usize,
    pub total_duration_ms: u64,
    pub avg_duration_ms: u64,
    /// ISO 8601 timestamp when the run drained.
    pub finished_at: String,
}
