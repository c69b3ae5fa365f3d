//! Connection settings and their persistence

use crate::error::Result;
use parking_lot::Mutex;
use saidebar_ai::{ApiProvider, Endpoint};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::fs::PermissionsExt;

/// User configuration for reaching the API
#[derive(Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub api_key: String,
    pub api_provider: ApiProvider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_api_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl Settings {
    /// Effective base URL for the configured provider
    pub fn base_url(&self) -> String {
        self.api_provider
            .resolve_base_url(self.custom_api_url.as_deref())
    }

    /// Base URL plus key
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.base_url(), self.api_key.trim())
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// The key with all but its last four characters hidden
    pub fn masked_api_key(&self) -> String {
        let key = self.api_key.trim();
        if key.is_empty() {
            return "(not set)".to_string();
        }
        let chars: Vec<char> = key.chars().collect();
        let visible = chars.len().min(4);
        let tail: String = chars[chars.len() - visible..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - visible), tail)
    }

    /// Build settings from a parsed TOML table.
    ///
    /// Every key is read on its own; a missing or mistyped key falls back to
    /// its default without affecting the others.
    pub fn from_table(table: &toml::Table) -> Self {
        let string = |key: &str| -> Option<String> {
            match table.get(key) {
                Some(toml::Value::String(s)) => Some(s.clone()),
                Some(other) => {
                    tracing::warn!(
                        "Ignoring settings key '{}' with unexpected value {}",
                        key,
                        other
                    );
                    None
                }
                None => None,
            }
        };

        Self {
            api_key: string("apiKey").unwrap_or_default(),
            api_provider: string("apiProvider")
                .map(ApiProvider::from)
                .unwrap_or_default(),
            custom_api_url: string("customApiUrl"),
            model: string("model"),
            system_prompt: string("systemPrompt"),
        }
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_key", &self.masked_api_key())
            .field("api_provider", &self.api_provider)
            .field("custom_api_url", &self.custom_api_url)
            .field("model", &self.model)
            .field("system_prompt", &self.system_prompt)
            .finish()
    }
}

/// Durable storage for [`Settings`]
pub trait SettingsStore: Send + Sync {
    /// Persisted settings, or defaults when nothing usable is stored
    fn load(&self) -> Settings;

    /// Persist all fields together
    fn save(&self, settings: &Settings) -> Result<()>;
}

/// TOML file store
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at [`FileSettingsStore::default_path`]
    pub fn open_default() -> Self {
        Self::new(Self::default_path())
    }

    /// `$SAIDEBAR_CONFIG_PATH`, else `<config dir>/saidebar/settings.toml`
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var("SAIDEBAR_CONFIG_PATH") {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("saidebar")
            .join("settings.toml")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Settings {
        if !self.path.exists() {
            return Settings::default();
        }

        match fs::read_to_string(&self.path) {
            Ok(content) => match toml::from_str::<toml::Table>(&content) {
                Ok(table) => Settings::from_table(&table),
                Err(e) => {
                    tracing::warn!("Failed to parse settings file {}: {}", self.path.display(), e);
                    Settings::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read settings file {}: {}", self.path.display(), e);
                Settings::default()
            }
        }
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }

        let content = toml::to_string_pretty(settings)?;

        // Write beside the target and rename so readers never see half a file
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, content)?;

        // The file holds an API key
        #[cfg(unix)]
        fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;

        fs::rename(&tmp, &self.path)?;
        tracing::debug!("Saved settings to {}", self.path.display());
        Ok(())
    }
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    saved: Mutex<Option<Settings>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> Settings {
        self.saved.lock().clone().unwrap_or_default()
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        *self.saved.lock() = Some(settings.clone());
        Ok(())
    }
}
