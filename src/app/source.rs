//! Work source interface
//!
//! The work source owns the paginated rendering of exportable items. The
//! engine only ever addresses items by their position in source order and
//! never retains anything about an item past its own iteration step.

use async_trait::async_trait;

use crate::errors::ExtractionError;

/// Display fields read from one work item
///
/// Date fields are kept as the strings the source renders; they are assumed
/// numeric and are inserted into filenames without sanitization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentFields {
    /// Two-digit day of the document date
    pub day: String,
    /// Two-digit month of the document date
    pub month: String,
    /// Four-digit year of the document date
    pub year: String,
    /// Document category (e.g. account statement type)
    pub category: String,
    /// Document subject line
    pub subject: String,
}

/// Ordered source of exportable work items
///
/// `toggle_detail` is the same idempotent toggle for reveal and collapse:
/// invoked once it exposes the item's download locator, invoked again it
/// hides it.
#[async_trait]
pub trait WorkSource: Send + Sync {
    /// Number of items currently rendered, in source order
    async fn count(&self) -> Result<usize, ExtractionError>;

    /// Read the display fields of the item at `index`
    async fn read_fields(&self, index: usize) -> Result<DocumentFields, ExtractionError>;

    /// Toggle the expanded detail view of the item at `index`
    async fn toggle_detail(&self, index: usize) -> Result<(), ExtractionError>;
}

/// Resolves a revealed item to a concrete fetchable URL
///
/// Consumed exclusively through [`wait_for`](crate::app::wait::wait_for)
/// probes: resolution is expected to become available asynchronously after
/// the item has been revealed.
#[async_trait]
pub trait ResourceResolver: Send + Sync {
    /// Attempt to resolve the item at `index`; `None` while not yet available
    async fn try_resolve(&self, index: usize) -> Option<url::Url>;
}
