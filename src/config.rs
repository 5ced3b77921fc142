// Configuration loading and parsing (client.toml).

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// client.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire client.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ClientFile {
    server: ServerSection,
    #[serde(default)]
    session: SessionSection,
}

#[derive(Debug, Clone, Deserialize)]
struct ServerSection {
    /// HTTP base of the game server, e.g. `http://localhost:8000`. The
    /// WebSocket URL is derived from it.
    base_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SessionSection {
    /// Where the session database lives. Defaults to the platform data
    /// directory when omitted.
    db_path: Option<String>,
}

/// The assembled client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_url: String,
    pub session_db_path: PathBuf,
}

impl Config {
    /// Derive the push-channel URL for a (game code, player id) pair:
    /// `http(s)` becomes `ws(s)` and the path is `/ws/{code}/{player_id}`.
    pub fn ws_url(&self, game_code: &str, player_id: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let ws_base = if let Some(rest) = base.strip_prefix("https://") {
            format!("wss://{rest}")
        } else if let Some(rest) = base.strip_prefix("http://") {
            format!("ws://{rest}")
        } else {
            // validate() guarantees one of the two prefixes.
            base.to_string()
        };
        format!("{ws_base}/ws/{game_code}/{player_id}")
    }

    /// REST base for game actions: `{base_url}/api`.
    pub fn api_base(&self) -> String {
        format!("{}/api", self.base_url.trim_end_matches('/'))
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/client.toml` relative to
/// the given `base_dir`.
///
/// This is the lower-level loading primitive that does not auto-copy
/// defaults. Prefer `load_config()` which handles default initialization
/// automatically.
pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let client_path = base_dir.join("config").join("client.toml");
    let client_text = read_file(&client_path)?;
    let client_file: ClientFile =
        toml::from_str(&client_text).map_err(|e| ConfigError::ParseError {
            path: client_path.clone(),
            source: e,
        })?;

    let session_db_path = match client_file.session.db_path {
        Some(path) => PathBuf::from(path),
        None => default_session_db_path(),
    };

    let config = Config {
        base_url: client_file.server.base_url,
        session_db_path,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure config/client.toml exists by copying it from `defaults/` when
/// missing. Returns the list of files that were copied.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or ensure defaults/ is present",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();

        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        if file_name.to_str().is_some_and(|n| n.ends_with(".example")) {
            continue;
        }
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                // Already customized, leave it alone.
            }
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Convenience wrapper: loads config relative to the current working
/// directory, copying defaults first when needed.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn default_session_db_path() -> PathBuf {
    match ProjectDirs::from("", "", "gavel") {
        Some(dirs) => dirs.data_dir().join("sessions.db"),
        None => PathBuf::from("gavel-sessions.db"),
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let url = &config.base_url;
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::ValidationError {
            field: "server.base_url".into(),
            message: format!("must start with http:// or https://, got `{url}`"),
        });
    }
    if url.trim_end_matches('/').len() <= "https://".len() {
        return Err(ConfigError::ValidationError {
            field: "server.base_url".into(),
            message: "must include a host".into(),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
