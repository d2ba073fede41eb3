//! Presentation layer interface
//!
//! The engine drives a minimal rendering surface: one trigger control whose
//! label doubles as the progress display, operator notifications, and a text
//! prompt for editing the filename template. Control registration is owned by
//! the embedding UI, which wires its own activation events to
//! [`BatchController::activate`](crate::app::batch::BatchController::activate)
//! and [`PreferenceController::edit`](crate::app::prefs::PreferenceController::edit).
//! The export trigger starts out labelled
//! [`messages::IDLE_LABEL`](crate::constants::messages::IDLE_LABEL); the
//! template-edit control takes
//! [`messages::EDIT_TEMPLATE_LABEL`](crate::constants::messages::EDIT_TEMPLATE_LABEL).
//! Label updates are fire-and-forget from the engine's perspective.

use async_trait::async_trait;

/// Rendering surface consumed by the engine
#[async_trait]
pub trait Presentation: Send + Sync {
    /// Update the displayed label of the export trigger control
    async fn set_trigger_label(&self, label: &str);

    /// Show an operator-facing notification
    async fn notify(&self, message: &str);

    /// Prompt for a replacement value; `None` means the prompt was cancelled
    async fn prompt(&self, message: &str, current: &str) -> Option<String>;
}
