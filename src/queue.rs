use std::sync::{Mutex, MutexGuard};

use crate::error::QueueError;
use crate::types::{ErrorDetail, ItemMetadata, ItemStatus, SourceRef, WorkItem};

/// In-memory FIFO store of batch work items.
///
/// Items are processed strictly in insertion order. The store holds no
/// durable state: it lives for the session and is not written to disk.
/// Status and result fields are mutated only through the crate-internal
/// methods reserved for the processor; external callers append, remove,
/// retry, and read snapshots.
pub struct MetadataQueue {
    items: Mutex<Vec<WorkItem>>,
}

impl Default for MetadataQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl MetadataQueue {
    /// Create a new empty queue.
    pub fn new() -> Self {
        Self {
            items: Mutex::new(Vec::new()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<WorkItem>>, QueueError> {
        self.items.lock().map_err(|e| QueueError::Other(e.to_string()))
    }

    /// Append a new pending item. Returns the assigned item ID.
    ///
    /// Duplicate source references are permitted and produce
    /// independent items.
    pub fn enqueue(&self, source: SourceRef) -> Result<String, QueueError> {
        let mut items = self.lock()?;
        let item = Self::new_item(source);
        let id = item.id.clone();
        items.push(item);
        Ok(id)
    }

    /// Append several pending items at once, preserving iteration
    /// order. Returns the assigned IDs in the same order.
    pub fn enqueue_all(
        &self,
        sources: impl IntoIterator<Item = SourceRef>,
    ) -> Result<Vec<String>, QueueError> {
        let mut items = self.lock()?;
        let mut ids = Vec::new();
        for source in sources {
            let item = Self::new_item(source);
            ids.push(item.id.clone());
            items.push(item);
        }
        Ok(ids)
    }

    fn new_item(source: SourceRef) -> WorkItem {
        WorkItem {
            id: uuid::Uuid::new_v4().to_string(),
            source,
            status: ItemStatus::Pending,
            metadata: None,
            error: None,
            duration_ms: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Delete an item. Rejected while the item is mid-processing so the
    /// in-flight call is never orphaned silently.
    pub fn remove(&self, id: &str) -> Result<(), QueueError> {
        let mut items = self.lock()?;
        let idx = items
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
        if items[idx].status == ItemStatus::Processing {
            return Err(QueueError::ItemProcessing(id.to_string()));
        }
        items.remove(idx);
        Ok(())
    }

    /// Remove every item. Rejected while any item is mid-processing.
    /// Returns the number of items removed.
    pub fn clear_all(&self) -> Result<usize, QueueError> {
        let mut items = self.lock()?;
        if let Some(active) = items.iter().find(|i| i.status == ItemStatus::Processing) {
            return Err(QueueError::ItemProcessing(active.id.clone()));
        }
        let count = items.len();
        items.clear();
        Ok(count)
    }

    /// Reset an errored item to pending so the next run picks it up.
    /// Rejected for items in any other status.
    pub fn retry(&self, id: &str) -> Result<(), QueueError> {
        let mut items = self.lock()?;
        let item = items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
        if item.status != ItemStatus::Error {
            return Err(QueueError::NotRetryable(id.to_string()));
        }
        item.status = ItemStatus::Pending;
        item.error = None;
        item.duration_ms = None;
        Ok(())
    }

    /// Reset all errored items to pending. Returns how many were
    /// reset.
    pub fn retry_all_failed(&self) -> Result<usize, QueueError> {
        let mut items = self.lock()?;
        let mut count = 0;
        for item in items.iter_mut() {
            if item.status == ItemStatus::Error {
                item.status = ItemStatus::Pending;
                item.error = None;
                item.duration_ms = None;
                count += 1;
            }
        }
        Ok(count)
    }

    /// Cloned read-only view of all items in queue order, current at
    /// call time.
    pub fn snapshot(&self) -> Vec<WorkItem> {
        self.items.lock().map(|i| i.clone()).unwrap_or_default()
    }

    /// Look up a single item by ID.
    pub fn get(&self, id: &str) -> Option<WorkItem> {
        self.items
            .lock()
            .ok()?
            .iter()
            .find(|i| i.id == id)
            .cloned()
    }

    /// The first pending item in queue order, if any.
    pub fn next_pending(&self) -> Option<WorkItem> {
        self.items
            .lock()
            .ok()?
            .iter()
            .find(|i| i.status == ItemStatus::Pending)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.items.lock().map(|i| i.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn pending_count(&self) -> usize {
        self.count_status(ItemStatus::Pending)
    }

    pub fn completed_count(&self) -> usize {
        self.count_status(ItemStatus::Completed)
    }

    pub fn error_count(&self) -> usize {
        self.count_status(ItemStatus::Error)
    }

    /// Whether any item is currently mid-processing.
    pub fn has_processing_item(&self) -> bool {
        self.count_status(ItemStatus::Processing) > 0
    }

    fn count_status(&self, status: ItemStatus) -> usize {
        self.items
            .lock()
            .map(|items| items.iter().filter(|i| i.status == status).count())
            .unwrap_or(0)
    }

    /// Mark an item as mid-processing. Reserved for the processor;
    /// called before the service call is dispatched so readers see the
    /// transition immediately.
    pub(crate) fn mark_processing(&self, id: &str) -> Result<(), QueueError> {
        let mut items = self.lock()?;
        let item = items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
        item.status = ItemStatus::Processing;
        Ok(())
    }

    /// Settle an item as completed with its generated metadata.
    /// Reserved for the processor.
    pub(crate) fn complete_item(
        &self,
        id: &str,
        metadata: ItemMetadata,
        duration_ms: u64,
    ) -> Result<(), QueueError> {
        let mut items = self.lock()?;
        let item = items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
        item.status = ItemStatus::Completed;
        item.metadata = Some(metadata);
        item.error = None;
        item.duration_ms = Some(duration_ms);
        Ok(())
    }

    /// Settle an item as errored. Reserved for the processor.
    pub(crate) fn fail_item(
        &self,
        id: &str,
        error: ErrorDetail,
        duration_ms: u64,
    ) -> Result<(), QueueError> {
        let mut items = self.lock()?;
        let item = items
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| QueueError::NotFound(id.to_string()))?;
        item.status = ItemStatus::Error;
        item.error = Some(error);
        item.metadata = None;
        item.duration_ms = Some(duration_ms);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;

    fn meta(title: &str) -> ItemMetadata {
        ItemMetadata {
            title: title.to_string(),
            description: format!("{} description", title),
            keywords: vec!["one".to_string(), "two".to_string()],
        }
    }

    #[test]
    fn test_enqueue_assigns_id_and_pending() {
        let queue = MetadataQueue::new();
        let id = queue.enqueue(SourceRef::filename("a.jpg")).unwrap();
        assert!(!id.is_empty());

        let item = queue.get(&id).unwrap();
        assert_eq!(item.status, ItemStatus::Pending);
        assert!(item.metadata.is_none());
        assert!(item.error.is_none());
        assert!(!item.created_at.is_empty());
    }

    #[test]
    fn test_enqueue_all_preserves_order() {
        let queue = MetadataQueue::new();
        let ids = queue
            .enqueue_all(vec![
                SourceRef::filename("a.jpg"),
                SourceRef::filename("b.jpg"),
                SourceRef::filename("c.jpg"),
            ])
            .unwrap();
        assert_eq!(ids.len(), 3);

        let names: Vec<String> = queue
            .snapshot()
            .iter()
            .map(|i| i.source.name().to_string())
            .collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg", "c.jpg"]);
    }

    #[test]
    fn test_duplicate_sources_are_independent() {
        let queue = MetadataQueue::new();
        let id1 = queue.enqueue(SourceRef::filename("same.jpg")).unwrap();
        let id2 = queue.enqueue(SourceRef::filename("same.jpg")).unwrap();
        assert_ne!(id1, id2);
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_next_pending_is_fifo() {
        let queue = MetadataQueue::new();
        let first = queue.enqueue(SourceRef::filename("a.jpg")).unwrap();
        queue.enqueue(SourceRef::filename("b.jpg")).unwrap();

        assert_eq!(queue.next_pending().unwrap().id, first);

        queue.complete_item(&first, meta("a"), 10).unwrap();
        assert_eq!(queue.next_pending().unwrap().source.name(), "b.jpg");
    }

    #[test]
    fn test_remove_pending() {
        let queue = MetadataQueue::new();
        let id = queue.enqueue(SourceRef::filename("a.jpg")).unwrap();
        queue.remove(&id).unwrap();
        assert!(queue.is_empty());
    }

    #[test]
    fn test_remove_processing_rejected() {
        let queue = MetadataQueue::new();
        let id = queue.enqueue(SourceRef::filename("a.jpg")).unwrap();
        queue.mark_processing(&id).unwrap();

        let err = queue.remove(&id).unwrap_err();
        assert!(matches!(err, QueueError::ItemProcessing(_)));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_remove_missing_rejected() {
        let queue = MetadataQueue::new();
        assert!(matches!(
            queue.remove("nope").unwrap_err(),
            QueueError::NotFound(_)
        ));
    }

    #[test]
    fn test_clear_all_blocked_while_processing() {
        let queue = MetadataQueue::new();
        let id = queue.enqueue(SourceRef::filename("a.jpg")).unwrap();
        queue.enqueue(SourceRef::filename("b.jpg")).unwrap();
        queue.mark_processing(&id).unwrap();

        assert!(queue.clear_all().is_err());
        assert_eq!(queue.len(), 2);

        queue.complete_item(&id, meta("a"), 5).unwrap();
        assert_eq!(queue.clear_all().unwrap(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_complete_sets_metadata_exclusively() {
        let queue = MetadataQueue::new();
        let id = queue.enqueue(SourceRef::filename("a.jpg")).unwrap();
        queue.mark_processing(&id).unwrap();
        queue.complete_item(&id, meta("a"), 120).unwrap();

        let item = queue.get(&id).unwrap();
        assert_eq!(item.status, ItemStatus::Completed);
        assert!(item.metadata.is_some());
        assert!(item.error.is_none());
        assert_eq!(item.duration_ms, Some(120));
    }

    #[test]
    fn test_fail_sets_error_exclusively() {
        let queue = MetadataQueue::new();
        let id = queue.enqueue(SourceRef::filename("a.jpg")).unwrap();
        queue.mark_processing(&id).unwrap();
        queue
            .fail_item(
                &id,
                ErrorDetail::new(ErrorKind::RateLimited, "quota exceeded"),
                80,
            )
            .unwrap();

        let item = queue.get(&id).unwrap();
        assert_eq!(item.status, ItemStatus::Error);
        assert!(item.metadata.is_none());
        assert_eq!(item.error.unwrap().kind, ErrorKind::RateLimited);
    }

    #[test]
    fn test_retry_resets_errored_item() {
        let queue = MetadataQueue::new();
        let id = queue.enqueue(SourceRef::filename("a.jpg")).unwrap();
        queue.mark_processing(&id).unwrap();
        queue
            .fail_item(&id, ErrorDetail::new(ErrorKind::TransientNetworkFailure, "x"), 5)
            .unwrap();

        queue.retry(&id).unwrap();
        let item = queue.get(&id).unwrap();
        assert_eq!(item.status, ItemStatus::Pending);
        assert!(item.error.is_none());
        assert!(item.duration_ms.is_none());
    }

    #[test]
    fn test_retry_rejected_for_non_errored() {
        let queue = MetadataQueue::new();
        let id = queue.enqueue(SourceRef::filename("a.jpg")).unwrap();
        assert!(matches!(
            queue.retry(&id).unwrap_err(),
            QueueError::NotRetryable(_)
        ));
    }

    #[test]
    fn test_retry_all_failed() {
        let queue = MetadataQueue::new();
        let a = queue.enqueue(SourceRef::filename("a.jpg")).unwrap();
        let b = queue.enqueue(SourceRef::filename("b.jpg")).unwrap();
        queue.complete_item(&a, meta("a"), 5).unwrap();
        queue
            .fail_item(&b, ErrorDetail::new(ErrorKind::RateLimited, "limit"), 5)
            .unwrap();

        assert_eq!(queue.retry_all_failed().unwrap(), 1);
        assert_eq!(queue.get(&a).unwrap().status, ItemStatus::Completed);
        assert_eq!(queue.get(&b).unwrap().status, ItemStatus::Pending);
    }

    #[test]
    fn test_counts() {
        let queue = MetadataQueue::new();
        assert_eq!(queue.pending_count(), 0);
        assert!(!queue.has_processing_item());

        let a = queue.enqueue(SourceRef::filename("a.jpg")).unwrap();
        queue.enqueue(SourceRef::filename("b.jpg")).unwrap();
        assert_eq!(queue.pending_count(), 2);

        queue.mark_processing(&a).unwrap();
        assert_eq!(queue.pending_count(), 1);
        assert!(queue.has_processing_item());

        queue.complete_item(&a, meta("a"), 5).unwrap();
        assert_eq!(queue.completed_count(), 1);
        assert!(!queue.has_processing_item());
    }

    #[test]
    fn test_snapshot_reflects_latest_state() {
        let queue = MetadataQueue::new();
        let id = queue.enqueue(SourceRef::filename("a.jpg")).unwrap();

        let before = queue.snapshot();
        assert_eq!(before[0].status, ItemStatus::Pending);

        queue.mark_processing(&id).unwrap();
        let after = queue.snapshot();
        assert_eq!(after[0].status, ItemStatus::Processing);
    }
}
