//! Application constants for the postbox exporter
//!
//! This module centralizes all constants used throughout the crate,
//! organized by functional domain.

use std::time::Duration;

/// Filename template tokens and defaults
pub mod templates {
    /// Token replaced with the two-digit day of the document date
    pub const TOKEN_DAY: &str = "DD";

    /// Token replaced with the two-digit month of the document date
    pub const TOKEN_MONTH: &str = "MM";

    /// Token replaced with the four-digit year of the document date
    pub const TOKEN_YEAR: &str = "YYYY";

    /// Token replaced with the sanitized document category
    pub const TOKEN_CATEGORY: &str = "ART";

    /// Token replaced with the sanitized document subject
    pub const TOKEN_SUBJECT: &str = "BETREFF";

    /// All tokens a valid template must contain, in replacement scan order
    pub const REQUIRED_TOKENS: [&str; 5] = [
        TOKEN_DAY,
        TOKEN_MONTH,
        TOKEN_YEAR,
        TOKEN_CATEGORY,
        TOKEN_SUBJECT,
    ];

    /// Template used when no preference has been stored yet
    pub const DEFAULT_TEMPLATE: &str = "DD.MM.YYYY_ART_BETREFF";

    /// Extension appended to every generated filename
    pub const FILE_EXTENSION: &str = ".pdf";
}

/// Polling-based wait configuration
pub mod wait {
    use super::Duration;

    /// Interval between probe evaluations
    pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

    /// Maximum time to wait for a resolved download locator
    pub const RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);
}

/// Transfer retry configuration
pub mod transfer {
    use super::Duration;

    /// Maximum transport attempts per logical transfer
    pub const MAX_ATTEMPTS: u32 = 3;

    /// Fixed delay between transport attempts
    pub const RETRY_DELAY: Duration = Duration::from_millis(1000);

    /// Grace delay after a completed attempt, letting the transport flush
    pub const GRACE_DELAY: Duration = Duration::from_millis(200);
}

/// Batch iteration configuration
pub mod batch {
    use super::Duration;

    /// Delay after collapsing an item, so collapse and the next reveal
    /// do not race against the same UI region
    pub const SETTLE_DELAY: Duration = Duration::from_millis(500);
}

/// HTTP transport configuration
pub mod http {
    use super::Duration;

    /// Default user agent for artifact downloads
    pub const USER_AGENT: &str = "postbox-exporter/0.1.0";

    /// Per-request timeout for a single download attempt
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

    /// Connection establishment timeout
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Temporary file suffix for atomic writes
    pub const TEMP_FILE_SUFFIX: &str = ".part";
}

/// Preference storage keys and locations
pub mod prefs {
    /// Key under which the filename template is persisted
    pub const FILENAME_TEMPLATE_KEY: &str = "FILENAME_TEMPLATE";

    /// Directory name under the user config directory
    pub const CONFIG_DIR_NAME: &str = "postbox-exporter";

    /// File name of the preference store
    pub const PREFERENCES_FILE_NAME: &str = "preferences.toml";
}

/// Operator-facing strings (German, treated as a localizable set)
pub mod messages {
    /// Idle label of the export trigger control
    pub const IDLE_LABEL: &str = "Alle herunterladen";

    /// Label of the template edit control
    pub const EDIT_TEMPLATE_LABEL: &str = "Dateinamen ändern";

    /// Prompt shown when editing the filename template
    pub const TEMPLATE_PROMPT: &str = "Bitte gib ein Dateiname-Template ein:";

    /// Hint shown when a template is missing required tokens
    pub const TEMPLATE_HINT: &str =
        "Bitte gib ein Template nach folgendem Muster ein: DD.MM.YYYY_ART_BETREFF";

    /// Notification for a run that finished without errors
    pub const ALL_SUCCESSFUL: &str = "Alle Downloads erfolgreich abgeschlossen!";

    /// Progress label shown while a batch is running
    pub fn progress_label(processed: usize, total: usize) -> String {
        format!("{processed} / {total} verarbeitet (erneut klicken um abzubrechen)")
    }

    /// Aggregate entry for a single failed document (1-based index)
    pub fn item_error(index: usize, message: &str) -> String {
        format!("Fehler bei Dokument {index}: {message}")
    }

    /// Notification for a run that finished with recorded errors
    pub fn completed_with_errors(count: usize) -> String {
        format!("Downloads abgeschlossen mit {count} Fehlern. Details im Protokoll.")
    }

    /// Notification for a run aborted outside the per-item guard
    pub fn unexpected_error(message: &str) -> String {
        format!("Ein unerwarteter Fehler ist aufgetreten: {message}")
    }
}
