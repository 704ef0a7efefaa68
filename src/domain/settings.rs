use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Where log output goes. `RUST_LOG` overrides `level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_true")]
    pub console: bool,
    /// Directory for rolling log files, none to disable file logging
    #[serde(default = "default_log_dir")]
    pub log_dir: Option<PathBuf>,
    #[serde(default = "default_rotation")]
    pub rotation: String, // "daily", "hourly", "minutely", "never"
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            console: default_true(),
            log_dir: default_log_dir(),
            rotation: default_rotation(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_log_dir() -> Option<PathBuf> {
    Some(PathBuf::from("logs"))
}
fn default_rotation() -> String {
    "daily".to_string()
}

/// Location subscription policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchSettings {
    #[serde(default = "default_true")]
    pub high_accuracy: bool,
    /// Oldest cached fix the provider may hand back (0 = always a fresh fix)
    #[serde(default)]
    pub max_cache_age_ms: u64,
    /// How long the provider may take per fix before reporting a timeout
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Resubscribe when nothing has been heard from the provider for this long.
    /// Disabled when unset.
    #[serde(default)]
    pub stall_timeout_ms: Option<u64>,
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            max_cache_age_ms: 0,
            timeout_ms: default_timeout_ms(),
            stall_timeout_ms: None,
        }
    }
}

fn default_timeout_ms() -> u64 {
    50
}

/// Track replay source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationSettings {
    /// JSON-lines file of recorded fixes
    #[serde(default)]
    pub replay_path: Option<PathBuf>,
    #[serde(default = "default_replay_interval_ms")]
    pub replay_interval_ms: u64,
    /// Start over at the end of the track instead of going quiet
    #[serde(default = "default_false")]
    pub replay_loop: bool,
}

impl Default for LocationSettings {
    fn default() -> Self {
        Self {
            replay_path: None,
            replay_interval_ms: default_replay_interval_ms(),
            replay_loop: false,
        }
    }
}

fn default_replay_interval_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportSettings {
    #[serde(default = "default_socket_name")]
    pub socket_name: String,
}

impl Default for TransportSettings {
    fn default() -> Self {
        Self {
            socket_name: default_socket_name(),
        }
    }
}

fn default_socket_name() -> String {
    "pacer_bridge.sock".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeSettings {
    /// Send one synthetic fix when the peer channel comes up
    #[serde(default = "default_false")]
    pub send_sample_on_ready: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub log_settings: LogSettings,
    #[serde(default)]
    pub watch: WatchSettings,
    #[serde(default)]
    pub location: LocationSettings,
    #[serde(default)]
    pub transport: TransportSettings,
    #[serde(default)]
    pub bridge: BridgeSettings,
}

pub struct SettingsService {
    settings: Settings,
    settings_path: PathBuf,
}

impl SettingsService {
    pub fn new() -> anyhow::Result<Self> {
        let settings_path = Self::get_settings_path()?;
        Ok(Self::from_path(settings_path))
    }

    /// Load from `path`, falling back to defaults when it is missing or unreadable.
    pub fn from_path(settings_path: PathBuf) -> Self {
        let settings = Self::load_from_file(&settings_path).unwrap_or_default();
        Self {
            settings,
            settings_path,
        }
    }

    fn get_settings_path() -> anyhow::Result<PathBuf> {
        let mut path = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        path.push("PacerBridge");
        fs::create_dir_all(&path)?;
        path.push("settings.json");
        Ok(path)
    }

    fn load_from_file(path: &Path) -> anyhow::Result<Settings> {
        let contents = fs::read_to_string(path)?;
        let settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(&self.settings)?;
        fs::write(&self.settings_path, json)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.settings_path
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    pub fn get_mut(&mut self) -> &mut Settings {
        &mut self.settings
    }
}
