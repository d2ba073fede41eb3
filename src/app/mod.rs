//! Core engine of the postbox exporter
//!
//! This module contains the engine components: the sequential batch
//! controller, the polling wait primitive, the resilient transfer wrapper,
//! the filename template, the preference layer and the collaborator traits
//! (work source, resolver, transport, presentation) implemented by the
//! embedding.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use postbox_exporter::app::{
//!     BatchConfig, BatchController, FilePreferenceStore, PreferenceController,
//! };
//! # use postbox_exporter::app::{Presentation, ResourceResolver, Transport, WorkSource};
//!
//! # async fn example(
//! #     source: Arc<dyn WorkSource>,
//! #     resolver: Arc<dyn ResourceResolver>,
//! #     transport: Arc<dyn Transport>,
//! #     presentation: Arc<dyn Presentation>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(FilePreferenceStore::default_location()?);
//! let prefs = PreferenceController::load(store, presentation.clone()).await;
//!
//! let controller = BatchController::new(
//!     source,
//!     resolver,
//!     transport,
//!     presentation,
//!     prefs.template_handle(),
//!     BatchConfig::default(),
//! );
//!
//! // Wired to the export trigger by the embedding
//! controller.activate().await?;
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod prefs;
pub mod presentation;
pub mod source;
pub mod template;
pub mod transfer;
pub mod transport;
pub mod wait;

// Re-export main public API
pub use batch::{BatchConfig, BatchController, BatchSummary, CancelHandle};
pub use prefs::{FilePreferenceStore, PreferenceController, PreferenceStore};
pub use presentation::Presentation;
pub use source::{DocumentFields, ResourceResolver, WorkSource};
pub use template::FilenameTemplate;
pub use transfer::{ResilientTransfer, TransferConfig};
pub use transport::{HttpConfig, HttpTransport, TransferRequest, Transport, TransportSignal};
pub use wait::{wait_for, WaitConfig};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_structure() {
        // Ensure public API is accessible
        let config = BatchConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(FilenameTemplate::default().as_str(), "DD.MM.YYYY_ART_BETREFF");
    }
}
