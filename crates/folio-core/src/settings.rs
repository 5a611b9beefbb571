//! Application-level settings passed through context.
//!
//! [`SettingsHandle`] is created once at startup with [`SettingsHandle::init`]
//! and cloned into every consumer. Writes go through the handle, which
//! persists to its [`SettingsStore`] before updating the in-memory value.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ffi::OsString;
use std::fmt::{self, Debug};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};

use crate::error::{DataError, Result};

/// Colour scheme of the site.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Theme {
    /// Light scheme.
    #[default]
    Light,
    /// Dark scheme.
    Dark,
}

impl Theme {
    /// Returns the other theme.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Light => Self::Dark,
            Self::Dark => Self::Light,
        }
    }

    /// Returns true for the dark scheme.
    #[must_use]
    pub const fn is_dark(self) -> bool {
        matches!(self, Self::Dark)
    }

    /// Persisted representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Anything other than "dark" reads back as light.
impl From<String> for Theme {
    fn from(value: String) -> Self {
        if value == "dark" { Self::Dark } else { Self::Light }
    }
}

/// User-facing settings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Selected colour scheme.
    #[serde(default)]
    pub theme: Theme,
}

/// Persistence backend for [`Settings`].
#[async_trait]
pub trait SettingsStore: Send + Sync + Debug {
    /// Loads the stored settings, `Ok(None)` if nothing has been stored yet.
    async fn load(&self) -> Result<Option<Settings>>;

    /// Stores the settings, replacing any previous value.
    async fn save(&self, settings: &Settings) -> Result<()>;
}

/// Key/value store kept in memory, shaped like browser local storage.
#[derive(Debug, Default)]
pub struct InMemorySettingsStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemorySettingsStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with a theme entry already present.
    #[must_use]
    pub fn with_theme(theme: &str) -> Self {
        let mut entries = HashMap::new();
        entries.insert("theme".to_string(), theme.to_string());
        Self {
            entries: RwLock::new(entries),
        }
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn load(&self) -> Result<Option<Settings>> {
        let entries = self.entries.read().await;
        Ok(entries.get("theme").map(|theme| Settings {
            theme: Theme::from(theme.clone()),
        }))
    }

    async fn save(&self, settings: &Settings) -> Result<()> {
        self.entries
            .write()
            .await
            .insert("theme".to_string(), settings.theme.as_str().to_string());
        Ok(())
    }
}

/// Settings persisted as a small JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileSettingsStore {
    path: PathBuf,
}

impl JsonFileSettingsStore {
    /// Create a store backed by `path`. The file is created on first save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Sibling file a save is written to before it replaces the target.
    fn staging_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(OsString::from).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SettingsStore for JsonFileSettingsStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn load(&self) -> Result<Option<Settings>> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No settings file yet");
                return Ok(None);
            }
            Err(e) => return Err(DataError::Settings(e.to_string())),
        };

        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| DataError::Settings(format!("{}: {e}", self.path.display())))
    }

    #[instrument(skip(self, settings), fields(path = %self.path.display()))]
    async fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DataError::Settings(e.to_string()))?;
        }

        let text = serde_json::to_string_pretty(settings)
            .map_err(|e| DataError::Settings(e.to_string()))?;
        // Staged beside the target and renamed over it; the target is never
        // partially written.
        let staging = self.staging_path();
        tokio::fs::write(&staging, text)
            .await
            .map_err(|e| DataError::Settings(e.to_string()))?;
        tokio::fs::rename(&staging, &self.path)
            .await
            .map_err(|e| DataError::Settings(e.to_string()))?;
        debug!(theme = %settings.theme, "Saved settings");
        Ok(())
    }
}

/// Shared handle to the current settings and their store.
///
/// Cloning is cheap; all clones observe the same value.
#[derive(Clone)]
pub struct SettingsHandle {
    current: Arc<RwLock<Settings>>,
    store: Arc<dyn SettingsStore>,
}

impl Debug for SettingsHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsHandle")
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl SettingsHandle {
    /// Loads settings from `store` at startup.
    ///
    /// A missing or unreadable value falls back to the defaults; the store
    /// is not written until the first [`write`](Self::write).
    pub async fn init(store: Arc<dyn SettingsStore>) -> Self {
        let settings = match store.load().await {
            Ok(Some(settings)) => settings,
            Ok(None) => Settings::default(),
            Err(e) => {
                warn!(error = %e, "Failed to load settings, using defaults");
                Settings::default()
            }
        };
        debug!(theme = %settings.theme, "Initialized settings");

        Self {
            current: Arc::new(RwLock::new(settings)),
            store,
        }
    }

    /// Returns the current settings.
    pub async fn read(&self) -> Settings {
        *self.current.read().await
    }

    /// Persists and applies new settings.
    ///
    /// The in-memory value is only replaced once the store accepted it.
    pub async fn write(&self, settings: Settings) -> Result<()> {
        let mut current = self.current.write().await;
        self.store.save(&settings).await?;
        *current = settings;
        Ok(())
    }

    /// Flips the theme and persists it, returning the new theme.
    pub async fn toggle_theme(&self) -> Result<Theme> {
        let mut current = self.current.write().await;
        let next = Settings {
            theme: current.theme.toggled(),
        };
        self.store.save(&next).await?;
        *current = next;
        Ok(next.theme)
    }
}
