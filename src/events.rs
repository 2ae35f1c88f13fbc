use serde::{Deserialize, Serialize};

use crate::types::{ErrorDetail, ErrorKind, ItemStatus, RunSummary};

/// Emitted when an item is dispatched to the completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemStartedEvent {
    pub item_id: String,
    pub name: String,
}

/// Emitted when an item settles as completed or errored.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFinishedEvent {
    pub item_id: String,
    pub status: ItemStatus,
    pub error: Option<ErrorDetail>,
    pub duration_ms: u64,
    /// Items processed so far in this run.
    pub processed: usize,
    /// Pending items left in the queue at emission time.
    pub remaining: usize,
}

/// Run-level warning: emitted once for the first authentication
/// failure (remaining items will likely fail too) and for every
/// rate-limit hit (the shell should keep these visible longer).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunWarningEvent {
    pub kind: ErrorKind,
    pub message: String,
}

/// Emitted when a run drains.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunCompletedEvent {
    pub summary: RunSummary,
}

/// Progress events delivered to the run callback, in emission order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RunEvent {
    ItemStarted(ItemStartedEvent),
    ItemFinished(ItemFinishedEvent),
    Warning(RunWarningEvent),
    RunCompleted(RunCompletedEvent),
}
