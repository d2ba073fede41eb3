//! Preference storage and template editing
//!
//! The only preference that survives across runs is the filename template.
//! [`PreferenceController`] owns the in-memory template handle read by each
//! batch run and mediates edits: prompt, validate, persist. The bundled
//! [`FilePreferenceStore`] keeps preferences in a TOML file under the user
//! config directory.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::app::presentation::Presentation;
use crate::app::template::FilenameTemplate;
use crate::constants::{messages, prefs};
use crate::errors::PreferenceError;

/// Persistent key/value store for operator preferences
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Read a stored value; `None` when the key was never set
    async fn get(&self, key: &str) -> Option<String>;

    /// Persist a value under a key
    async fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError>;
}

/// TOML-file-backed preference store
///
/// The whole map is rewritten on every `set`; with a single stored
/// preference that is the simplest durable representation.
#[derive(Debug)]
pub struct FilePreferenceStore {
    path: PathBuf,
}

impl FilePreferenceStore {
    /// Create a store backed by the given file path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Create a store at the default location under the user config directory
    pub fn default_location() -> Result<Self, PreferenceError> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            PreferenceError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "user config directory not available",
            ))
        })?;
        Ok(Self::new(
            config_dir
                .join(prefs::CONFIG_DIR_NAME)
                .join(prefs::PREFERENCES_FILE_NAME),
        ))
    }

    /// Backing file path
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    async fn read_map(&self) -> Result<BTreeMap<String, String>, PreferenceError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), PreferenceError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = toml::to_string_pretty(map)?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl PreferenceStore for FilePreferenceStore {
    async fn get(&self, key: &str) -> Option<String> {
        match self.read_map().await {
            Ok(map) => map.get(key).cloned(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "preference read failed");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let mut map = self.read_map().await.unwrap_or_default();
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map).await?;
        debug!(path = %self.path.display(), key, "preference persisted");
        Ok(())
    }
}

/// Mediates filename template reads and edits
pub struct PreferenceController {
    store: Arc<dyn PreferenceStore>,
    presentation: Arc<dyn Presentation>,
    template: Arc<RwLock<FilenameTemplate>>,
}

impl PreferenceController {
    /// Load the stored template (falling back to the default on a missing or
    /// invalid stored value) and build the controller around it
    pub async fn load(
        store: Arc<dyn PreferenceStore>,
        presentation: Arc<dyn Presentation>,
    ) -> Self {
        let template = match store.get(prefs::FILENAME_TEMPLATE_KEY).await {
            Some(raw) => match FilenameTemplate::parse(raw) {
                Ok(template) => template,
                Err(e) => {
                    warn!(error = %e, "stored template invalid, using default");
                    FilenameTemplate::default_template()
                }
            },
            None => FilenameTemplate::default_template(),
        };

        info!(template = %template, "filename template loaded");
        Self {
            store,
            presentation,
            template: Arc::new(RwLock::new(template)),
        }
    }

    /// Shared handle to the in-memory template, read at the start of each run
    pub fn template_handle(&self) -> Arc<RwLock<FilenameTemplate>> {
        self.template.clone()
    }

    /// Current in-memory template
    pub async fn current(&self) -> FilenameTemplate {
        self.template.read().await.clone()
    }

    /// Prompt for a replacement template and apply it if valid
    ///
    /// A cancelled prompt leaves everything unchanged. An input missing any
    /// required token triggers the format-hint notification and is discarded
    /// without persisting or touching the in-memory value. A valid input is
    /// persisted and becomes the template used by subsequent runs.
    ///
    /// Returns the newly applied template, or `None` when nothing changed.
    pub async fn edit(&self) -> Result<Option<FilenameTemplate>, PreferenceError> {
        let current = self.current().await;
        let input = self
            .presentation
            .prompt(messages::TEMPLATE_PROMPT, current.as_str())
            .await;

        let raw = match input {
            Some(raw) => raw,
            None => {
                debug!("template edit cancelled");
                return Ok(None);
            }
        };

        let template = match FilenameTemplate::parse(raw) {
            Ok(template) => template,
            Err(e) => {
                info!(error = %e, "rejected template edit");
                self.presentation.notify(messages::TEMPLATE_HINT).await;
                return Ok(None);
            }
        };

        self.store
            .set(prefs::FILENAME_TEMPLATE_KEY, template.as_str())
            .await?;
        *self.template.write().await = template.clone();
        info!(template = %template, "filename template updated");
        Ok(Some(template))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use tempfile::TempDir;

    /// In-memory store for controller tests
    #[derive(Default)]
    struct MemoryStore {
        values: Mutex<BTreeMap<String, String>>,
    }

    #[async_trait]
    impl PreferenceStore for MemoryStore {
        async fn get(&self, key: &str) -> Option<String> {
            self.values.lock().unwrap().get(key).cloned()
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
            self.values
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }
    }

    /// Presentation stub returning a scripted prompt answer and recording
    /// notifications
    struct ScriptedPresentation {
        prompt_answer: Option<String>,
        notifications: Mutex<Vec<String>>,
    }

    impl ScriptedPresentation {
        fn new(prompt_answer: Option<&str>) -> Self {
            Self {
                prompt_answer: prompt_answer.map(str::to_string),
                notifications: Mutex::new(Vec::new()),
            }
        }

        fn notifications(&self) -> Vec<String> {
            self.notifications.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Presentation for ScriptedPresentation {
        async fn set_trigger_label(&self, _label: &str) {}

        async fn notify(&self, message: &str) {
            self.notifications.lock().unwrap().push(message.to_string());
        }

        async fn prompt(&self, _message: &str, _current: &str) -> Option<String> {
            self.prompt_answer.clone()
        }
    }

    /// A cancelled prompt changes nothing, in memory or in the store.
    #[tokio::test]
    async fn test_cancelled_edit_leaves_template_unchanged() {
        let store = Arc::new(MemoryStore::default());
        let presentation = Arc::new(ScriptedPresentation::new(None));
        let controller = PreferenceController::load(store.clone(), presentation).await;

        let result = controller.edit().await.unwrap();

        assert!(result.is_none());
        assert_eq!(controller.current().await, FilenameTemplate::default());
        assert!(store.get(prefs::FILENAME_TEMPLATE_KEY).await.is_none());
    }

    /// An invalid input shows the format hint and is discarded.
    #[tokio::test]
    async fn test_invalid_edit_shows_hint_and_is_discarded() {
        let store = Arc::new(MemoryStore::default());
        let presentation = Arc::new(ScriptedPresentation::new(Some("DD.MM.YYYY")));
        let controller = PreferenceController::load(store.clone(), presentation.clone()).await;

        let result = controller.edit().await.unwrap();

        assert!(result.is_none());
        assert_eq!(presentation.notifications(), vec![messages::TEMPLATE_HINT]);
        assert_eq!(controller.current().await, FilenameTemplate::default());
        assert!(store.get(prefs::FILENAME_TEMPLATE_KEY).await.is_none());
    }

    /// A valid input is persisted and replaces the in-memory template.
    #[tokio::test]
    async fn test_valid_edit_is_persisted_and_applied() {
        let store = Arc::new(MemoryStore::default());
        let presentation = Arc::new(ScriptedPresentation::new(Some("ART-BETREFF-YYYY-MM-DD")));
        let controller = PreferenceController::load(store.clone(), presentation.clone()).await;

        let result = controller.edit().await.unwrap();

        assert_eq!(
            result.map(|t| t.as_str().to_string()),
            Some("ART-BETREFF-YYYY-MM-DD".to_string())
        );
        assert_eq!(
            controller.current().await.as_str(),
            "ART-BETREFF-YYYY-MM-DD"
        );
        assert_eq!(
            store.get(prefs::FILENAME_TEMPLATE_KEY).await.as_deref(),
            Some("ART-BETREFF-YYYY-MM-DD")
        );
        assert!(presentation.notifications().is_empty());
    }

    /// An invalid stored value falls back to the default template on load.
    #[tokio::test]
    async fn test_invalid_stored_template_falls_back_to_default() {
        let store = Arc::new(MemoryStore::default());
        store
            .set(prefs::FILENAME_TEMPLATE_KEY, "no tokens here")
            .await
            .unwrap();
        let presentation = Arc::new(ScriptedPresentation::new(None));

        let controller = PreferenceController::load(store, presentation).await;
        assert_eq!(controller.current().await, FilenameTemplate::default());
    }

    /// File store round-trip: values survive a fresh store over the same path.
    #[tokio::test]
    async fn test_file_store_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("preferences.toml");

        let store = FilePreferenceStore::new(&path);
        assert!(store.get("FILENAME_TEMPLATE").await.is_none());
        store
            .set("FILENAME_TEMPLATE", "YYYY-MM-DD ART BETREFF")
            .await
            .unwrap();

        let reopened = FilePreferenceStore::new(&path);
        assert_eq!(
            reopened.get("FILENAME_TEMPLATE").await.as_deref(),
            Some("YYYY-MM-DD ART BETREFF")
        );
    }
}
