//! Configuration loading and root folder resolution

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use crate::storage::DEFAULT_HISTORY_CAP;
use crate::time::millis_to_duration;

/// Environment variables naming the root folder, checked in order
pub const ROOT_ENV_VARS: &[&str] = &["UHAN_ROOT_FOLDER", "UHAN_ROOT"];

/// File name of the database inside the root folder
pub const DATABASE_FILE: &str = "uhan.db";

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5780;
pub const DEFAULT_DEBOUNCE_MS: u64 = 400;
pub const DEFAULT_REMOTE_TIMEOUT_MS: u64 = 3000;
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 1800;

/// Contents of `config.toml`; every section and key is optional
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub root_folder: Option<PathBuf>,
    pub logging: LoggingConfig,
    pub server: ServerConfig,
    pub forms: FormsConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing directive when `RUST_LOG` is unset
    pub level: String,
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FormsConfig {
    pub debounce_ms: u64,
    pub history_cap: usize,
    /// Time allowed for a remote storage call before falling back to local
    pub remote_timeout_ms: u64,
    /// Open sessions unused for this long are closed
    pub session_idle_secs: u64,
}

impl Default for FormsConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            history_cap: DEFAULT_HISTORY_CAP,
            remote_timeout_ms: DEFAULT_REMOTE_TIMEOUT_MS,
            session_idle_secs: DEFAULT_SESSION_IDLE_SECS,
        }
    }
}

impl FormsConfig {
    pub fn debounce(&self) -> Duration {
        millis_to_duration(self.debounce_ms)
    }

    pub fn remote_timeout(&self) -> Duration {
        millis_to_duration(self.remote_timeout_ms)
    }

    pub fn session_idle(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs.max(1))
    }
}

/// Outcome of reading the configuration, held until logging is set up
#[derive(Debug)]
pub struct ConfigLoad {
    pub config: TomlConfig,
    /// File the configuration came from
    pub source: Option<PathBuf>,
    /// Why a file that was found or named could not be used
    pub error: Option<Error>,
}

impl ConfigLoad {
    /// Report where the configuration came from
    pub fn log(&self) {
        match (&self.source, &self.error) {
            (Some(path), None) => info!("Loaded configuration from {}", path.display()),
            (Some(path), Some(e)) => {
                warn!("Ignoring config file {}: {}; using defaults", path.display(), e)
            }
            (None, _) => info!("No config file found, using default configuration"),
        }
    }
}

impl TomlConfig {
    /// Parse a config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Read `explicit`, or the platform config file when none is given
    ///
    /// Never logs: call [`ConfigLoad::log`] once tracing is initialized. A
    /// file that exists but cannot be read or parsed yields the defaults plus
    /// the error.
    pub fn read(explicit: Option<&Path>) -> ConfigLoad {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match find_config_file() {
                Ok(path) => path,
                Err(_) => {
                    return ConfigLoad {
                        config: Self::default(),
                        source: None,
                        error: None,
                    }
                }
            },
        };

        match Self::from_file(&path) {
            Ok(config) => ConfigLoad {
                config,
                source: Some(path),
                error: None,
            },
            Err(e) => ConfigLoad {
                config: Self::default(),
                source: Some(path),
                error: Some(e),
            },
        }
    }
}

/// Root folder resolution, highest priority first:
/// 1. Command-line argument
/// 2. Environment variables in `env_var_names` order
/// 3. `root_folder` from the TOML config
/// 4. OS-dependent compiled default
pub fn resolve_root_folder(
    cli_arg: Option<&str>,
    env_var_names: &[&str],
    config: &TomlConfig,
) -> PathBuf {
    if let Some(path) = cli_arg {
        return PathBuf::from(path);
    }

    for name in env_var_names {
        if let Ok(path) = std::env::var(name) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }
    }

    if let Some(root) = &config.root_folder {
        return root.clone();
    }

    get_default_root_folder()
}

/// `<root>/uhan.db`
pub fn database_path(root: &Path) -> PathBuf {
    root.join(DATABASE_FILE)
}

/// Locate the configuration file for the platform
fn find_config_file() -> Result<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("uhan").join("config.toml"));

    if let Some(path) = &user_config {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/uhan/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
    }

    match user_config {
        Some(path) => Err(Error::Config(format!("Config file not found: {:?}", path))),
        None => Err(Error::Config("Could not determine config directory".to_string())),
    }
}

/// Get OS-dependent default root folder path
fn get_default_root_folder() -> PathBuf {
    if cfg!(target_os = "linux") {
        // ~/.local/share/uhan
        dirs::data_local_dir()
            .map(|d| d.join("uhan"))
            .unwrap_or_else(|| PathBuf::from("/var/lib/uhan"))
    } else if cfg!(target_os = "macos") {
        dirs::data_dir()
            .map(|d| d.join("uhan"))
            .unwrap_or_else(|| PathBuf::from("/Library/Application Support/uhan"))
    } else if cfg!(target_os = "windows") {
        // %LOCALAPPDATA%\uhan
        dirs::data_local_dir()
            .map(|d| d.join("uhan"))
            .unwrap_or_else(|| PathBuf::from("C:\\ProgramData\\uhan"))
    } else {
        PathBuf::from("./uhan_data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    fn clear_env() {
        for name in ROOT_ENV_VARS {
            std::env::remove_var(name);
        }
    }

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.server.address(), "127.0.0.1:5780");
        assert_eq!(config.forms.debounce(), Duration::from_millis(400));
        assert_eq!(config.forms.history_cap, 50);
        assert_eq!(config.forms.session_idle(), Duration::from_secs(1800));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let file = write_config(
            r#"
root_folder = "/srv/uhan"

[server]
port = 8080

[forms]
debounce_ms = 250
"#,
        );
        let config = TomlConfig::from_file(file.path()).unwrap();
        assert_eq!(config.root_folder, Some(PathBuf::from("/srv/uhan")));
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.bind, DEFAULT_BIND);
        assert_eq!(config.forms.debounce_ms, 250);
        assert_eq!(config.forms.history_cap, DEFAULT_HISTORY_CAP);
    }

    #[test]
    fn test_broken_file_falls_back_to_defaults() {
        let file = write_config("[server\nport = ");
        assert!(matches!(TomlConfig::from_file(file.path()), Err(Error::Config(_))));

        let loaded = TomlConfig::read(Some(file.path()));
        assert_eq!(loaded.config, TomlConfig::default());
        assert_eq!(loaded.source.as_deref(), Some(file.path()));
        assert!(matches!(loaded.error, Some(Error::Config(_))));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let loaded = TomlConfig::read(Some(Path::new("/nonexistent/uhan/config.toml")));
        assert_eq!(loaded.config, TomlConfig::default());
        assert!(matches!(loaded.error, Some(Error::Io(_))));
    }

    #[test]
    fn test_read_keeps_good_file() {
        let file = write_config("[forms]\nsession_idle_secs = 90\n");
        let loaded = TomlConfig::read(Some(file.path()));
        assert!(loaded.error.is_none());
        assert_eq!(loaded.config.forms.session_idle(), Duration::from_secs(90));
    }

    #[test]
    #[serial]
    fn test_cli_arg_wins() {
        clear_env();
        std::env::set_var("UHAN_ROOT_FOLDER", "/from/env");
        let root = resolve_root_folder(Some("/from/cli"), ROOT_ENV_VARS, &TomlConfig::default());
        assert_eq!(root, PathBuf::from("/from/cli"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_var_order() {
        clear_env();
        std::env::set_var("UHAN_ROOT", "/from/alias");
        let config = TomlConfig {
            root_folder: Some(PathBuf::from("/from/toml")),
            ..TomlConfig::default()
        };
        assert_eq!(resolve_root_folder(None, ROOT_ENV_VARS, &config), PathBuf::from("/from/alias"));

        std::env::set_var("UHAN_ROOT_FOLDER", "/from/env");
        assert_eq!(resolve_root_folder(None, ROOT_ENV_VARS, &config), PathBuf::from("/from/env"));
        clear_env();
    }

    #[test]
    #[serial]
    fn test_toml_then_default() {
        clear_env();
        let config = TomlConfig {
            root_folder: Some(PathBuf::from("/from/toml")),
            ..TomlConfig::default()
        };
        assert_eq!(resolve_root_folder(None, ROOT_ENV_VARS, &config), PathBuf::from("/from/toml"));

        let fallback = resolve_root_folder(None, ROOT_ENV_VARS, &TomlConfig::default());
        assert!(fallback.ends_with("uhan") || fallback.ends_with("uhan_data"));
    }

    #[test]
    fn test_database_path() {
        assert_eq!(database_path(Path::new("/srv/uhan")), PathBuf::from("/srv/uhan/uhan.db"));
    }
}
