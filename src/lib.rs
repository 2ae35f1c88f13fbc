//! # Stock Metadata Queue
//!
//! Sequential batch metadata generation queue for microstock assets.
//!
//! ## Key Features
//!
//! - **FIFO work queue** — items are processed strictly in insertion
//!   order, one at a time, with item-level status tracking
//! - **Partial-failure containment** — a failed item settles as
//!   errored and the run continues; nothing aborts a batch
//! - **Categorized failures** — auth, rate-limit, malformed-request,
//!   network, and empty-response errors are surfaced distinctly so the
//!   shell can warn appropriately
//! - **Per-run configuration snapshots** — budgets, platform profile,
//!   affixes, and denylists are captured once per run
//! - **Configurable throttle** — a fixed inter-item delay keeps batch
//!   runs under provider rate limits
//! - **Credential rotation** — an immutable key pool with a pluggable
//!   per-call selection strategy
//! - **CSV export** — completed items serialize to a
//!   quote-escaped `Filename,Title,Description,Keywords` artifact
//!
//! ## Quick Start
//!
//! 1. Create a [`MetadataQueue`] and enqueue [`SourceRef`]s
//! 2. Build a [`HttpCompletionService`] (or implement
//!    [`CompletionService`] yourself)
//! 3. Run a [`Processor`] over the queue with a [`BatchConfig`]
//! 4. Export completed items with [`export_csv`]
//!
//! ```ignore
//! use stock_metadata_queue::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let queue = MetadataQueue::new();
//!     queue.enqueue(SourceRef::asset("photo.jpg", "image/jpeg", bytes))?;
//!     queue.enqueue(SourceRef::filename("drawing.eps"))?;
//!
//!     let keys = KeyPool::from_blob("gsk_key_one,gsk_key_two")?;
//!     let service = HttpCompletionService::new(CompletionConfig::default(), keys);
//!     let config = BatchConfig::default().with_keyword_target(30);
//!
//!     let processor = Processor::new(service);
//!     let summary = processor.run(&queue, &config).await?;
//!     println!("{} completed, {} failed", summary.completed, summary.failed);
//!
//!     if let Some(csv) = export_csv(&queue.snapshot(), &config) {
//!         std::fs::write("metadata.csv", csv)?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod export;
pub mod keys;
pub mod processor;
pub mod queue;
pub mod service;
pub mod types;

pub use config::{Affix, BatchConfig, ImageType, PlatformProfile};
pub use error::{QueueError, ServiceError};
pub use events::{
    ItemFinishedEvent, ItemStartedEvent, RunCompletedEvent, RunEvent, RunWarningEvent,
};
pub use export::{export_csv, export_filename, CSV_HEADER};
pub use keys::{KeyPool, KeySelector, RoundRobin, UniformRandom};
pub use processor::Processor;
pub use queue::MetadataQueue;
pub use service::{CompletionConfig, HttpCompletionService};
pub use types::{
    ErrorDetail, ErrorKind, ItemMetadata, ItemStatus, RunSummary, SourceRef, WorkItem,
};

/// The external completion boundary: turns one asset reference plus
/// the run configuration into generated metadata, or fails with a
/// categorized error.
///
/// The crate ships [`HttpCompletionService`] for OpenAI-compatible
/// chat endpoints; implement this trait to plug in another provider or
/// a mock.
///
/// # Example
///
/// ```ignore
/// use stock_metadata_queue::*;
///
/// struct FixedService;
///
/// impl CompletionService for FixedService {
///     async fn generate(
///         &self,
///         source: &SourceRef,
///         _config: &BatchConfig,
///     ) -> Result<ItemMetadata, ServiceError> {
///         Ok(ItemMetadata {
///             title: format!("Title for {}", source.name()),
///             description: "A description".to_string(),
///             keywords: vec!["stock".to_string()],
///         })
///     }
/// }
/// ```
pub trait CompletionService: Send + Sync {
    /// Generate metadata for a single asset.
    ///
    /// # Arguments
    /// * `source` — the asset reference (bytes or file name)
    /// * `config` — the run's configuration snapshot, carrying
    ///   generation constraints
    fn generate(
        &self,
        source: &SourceRef,
        config: &BatchConfig,
    ) -> impl std::future::Future<Output = Result<ItemMetadata, ServiceError>> + Send;
}
