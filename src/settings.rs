//! Settings snapshot and the settings collaborator seam
//!
//! Settings are owned by an external store; the core holds a read-only
//! cached copy refreshed on a push notification. A failed fetch falls
//! back to the last good snapshot, or to the disabled defaults if no
//! snapshot has ever loaded; classification is never blocked on the
//! collaborator.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio::task::JoinHandle;

/// Overall detection sensitivity preference.
///
/// Stored and round-tripped with the settings; reserved for tuning the
/// rule sets. The pipeline itself keys off the per-category toggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensitivityLevel {
    Low,
    #[default]
    Medium,
    High,
}

/// The user-facing configuration snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Master switch; when off, no analysis and no alerts
    pub enabled: bool,

    /// Detection sensitivity preference
    pub sensitivity_level: SensitivityLevel,

    /// Per-category detection toggles, keyed by the names the settings
    /// surface exposes. A category with no entry is disabled.
    pub detection_toggles: HashMap<String, bool>,

    /// Domains exempt from analysis
    pub whitelist: HashSet<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            enabled: true,
            sensitivity_level: SensitivityLevel::Medium,
            detection_toggles: default_detection_toggles(),
            whitelist: HashSet::new(),
        }
    }
}

impl Settings {
    /// The snapshot used before any successful load: everything off.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Whether a detection category is enabled.
    ///
    /// Strict lookup: a category the toggle map does not know is
    /// disabled, matching the inherited configuration surface.
    pub fn category_enabled(&self, category: &str) -> bool {
        self.detection_toggles.get(category).copied().unwrap_or(false)
    }

    /// Whether a host domain is whitelisted.
    pub fn is_whitelisted(&self, host: &str) -> bool {
        self.whitelist.contains(host)
    }
}

/// The toggle names the settings surface exposes, all enabled.
///
/// Note these are the surface's own names; they do not align one-to-one
/// with the detection rule categories (see `RuleSet::unreachable_categories`).
pub fn default_detection_toggles() -> HashMap<String, bool> {
    ["phone", "email", "address", "financial", "password", "personal"]
        .into_iter()
        .map(|name| (name.to_string(), true))
        .collect()
}

/// The external settings collaborator.
#[async_trait::async_trait]
pub trait SettingsStore: Send + Sync {
    /// Fetch the current settings.
    async fn load(&self) -> Result<Settings>;

    /// Persist new settings.
    async fn save(&self, settings: &Settings) -> Result<()>;

    /// Subscribe to change notifications. Each notification means the
    /// core should re-fetch and apply.
    fn watch(&self) -> broadcast::Receiver<()>;
}

/// In-memory settings store for single-process use and tests.
pub struct MemorySettingsStore {
    settings: RwLock<Settings>,
    changed: broadcast::Sender<()>,
    unavailable: AtomicBool,
}

impl MemorySettingsStore {
    /// Create a store with the given initial settings.
    pub fn new(settings: Settings) -> Self {
        let (changed, _rx) = broadcast::channel(16);
        Self {
            settings: RwLock::new(settings),
            changed,
            unavailable: AtomicBool::new(false),
        }
    }

    /// Simulate a collaborator outage: loads fail until cleared.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::Release);
    }
}

impl Default for MemorySettingsStore {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

#[async_trait::async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn load(&self) -> Result<Settings> {
        if self.unavailable.load(Ordering::Acquire) {
            return Err(Error::Settings("settings store unavailable".to_string()));
        }
        Ok(self.settings.read().await.clone())
    }

    async fn save(&self, settings: &Settings) -> Result<()> {
        if self.unavailable.load(Ordering::Acquire) {
            return Err(Error::Settings("settings store unavailable".to_string()));
        }
        *self.settings.write().await = settings.clone();
        // No receiver just means nobody is watching yet.
        let _ = self.changed.send(());
        Ok(())
    }

    fn watch(&self) -> broadcast::Receiver<()> {
        self.changed.subscribe()
    }
}

/// Cached read-only view of the collaborator-owned settings.
pub struct SettingsHandle {
    current: RwLock<Settings>,
    store: Arc<dyn SettingsStore>,
    loaded_once: AtomicBool,
}

impl SettingsHandle {
    /// Create a handle starting from the disabled defaults.
    pub fn new(store: Arc<dyn SettingsStore>) -> Arc<Self> {
        Arc::new(Self {
            current: RwLock::new(Settings::disabled()),
            store,
            loaded_once: AtomicBool::new(false),
        })
    }

    /// Current cached snapshot.
    pub async fn current(&self) -> Settings {
        self.current.read().await.clone()
    }

    /// Re-fetch from the store and apply.
    ///
    /// On failure the last good snapshot stays in place (or the
    /// disabled defaults if nothing has ever loaded).
    pub async fn refresh(&self) {
        match self.store.load().await {
            Ok(settings) => {
                *self.current.write().await = settings;
                self.loaded_once.store(true, Ordering::Release);
            }
            Err(e) => {
                if self.loaded_once.load(Ordering::Acquire) {
                    tracing::warn!(error = %e, "Settings refresh failed, keeping last good snapshot");
                } else {
                    tracing::warn!(error = %e, "Initial settings load failed, staying disabled");
                }
            }
        }
    }

    /// Spawn a background task that refreshes the cache on every change
    /// notification from the store.
    pub fn spawn_watcher(self: &Arc<Self>) -> JoinHandle<()> {
        let handle = Arc::clone(self);
        let mut rx = handle.store.watch();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(()) => handle.refresh().await,
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(skipped = n, "Settings watcher lagged, refreshing");
                        handle.refresh().await;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert!(settings.enabled);
        assert_eq!(settings.sensitivity_level, SensitivityLevel::Medium);
        assert!(settings.category_enabled("phone"));
        assert!(settings.category_enabled("financial"));
        assert!(settings.whitelist.is_empty());
    }

    #[test]
    fn test_unknown_category_disabled() {
        let settings = Settings::default();
        assert!(!settings.category_enabled("ssn"));
        assert!(!settings.category_enabled("credit_card"));
        assert!(!settings.category_enabled("no_such_category"));
    }

    #[test]
    fn test_settings_serialization() {
        let settings = Settings::default();
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("\"sensitivityLevel\":\"medium\""));
        assert!(json.contains("\"detectionToggles\""));
        let parsed: Settings = serde_json::from_str(&json).unwrap();
        assert!(parsed.enabled);
        assert!(parsed.category_enabled("email"));
    }

    #[test]
    fn test_disabled_snapshot() {
        let settings = Settings::disabled();
        assert!(!settings.enabled);
    }

    #[tokio::test]
    async fn test_handle_starts_disabled_until_refresh() {
        let store = Arc::new(MemorySettingsStore::default());
        let handle = SettingsHandle::new(store);
        assert!(!handle.current().await.enabled);

        handle.refresh().await;
        assert!(handle.current().await.enabled);
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_last_good() {
        let store = Arc::new(MemorySettingsStore::default());
        let handle = SettingsHandle::new(Arc::clone(&store) as Arc<dyn SettingsStore>);
        handle.refresh().await;
        assert!(handle.current().await.enabled);

        store.set_unavailable(true);
        handle.refresh().await;
        // Last good snapshot survives the outage.
        assert!(handle.current().await.enabled);
    }

    #[tokio::test]
    async fn test_initial_failure_stays_disabled() {
        let store = Arc::new(MemorySettingsStore::default());
        store.set_unavailable(true);
        let handle = SettingsHandle::new(Arc::clone(&store) as Arc<dyn SettingsStore>);
        handle.refresh().await;
        assert!(!handle.current().await.enabled);
    }

    #[tokio::test]
    async fn test_watcher_applies_pushed_changes() {
        let store = Arc::new(MemorySettingsStore::default());
        let handle = SettingsHandle::new(Arc::clone(&store) as Arc<dyn SettingsStore>);
        handle.refresh().await;
        let _watcher = handle.spawn_watcher();
        tokio::task::yield_now().await;

        let mut updated = Settings::default();
        updated.detection_toggles.insert("phone".to_string(), false);
        store.save(&updated).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!handle.current().await.category_enabled("phone"));
    }
}
