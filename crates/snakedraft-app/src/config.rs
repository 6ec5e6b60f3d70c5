// Configuration loading and parsing (draft.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use directories::ProjectDirs;
use snakedraft_core::Person;

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
// Assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// CSV file holding the candidate pool.
    pub pool_path: String,
    pub db_path: String,
    /// Where board exports are written.
    pub export_dir: String,
    /// Seat order for a fresh draft.
    pub selectors: Vec<Person>,
}

// ---------------------------------------------------------------------------
// draft.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
struct DraftFile {
    pool: PoolSection,
    #[serde(default)]
    database: DatabaseSection,
    #[serde(default)]
    export: ExportSection,
    #[serde(default)]
    selectors: Vec<SelectorSection>,
}

#[derive(Debug, Clone, Deserialize)]
struct PoolSection {
    path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct DatabaseSection {
    path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ExportSection {
    directory: String,
}

impl Default for ExportSection {
    fn default() -> Self {
        ExportSection {
            directory: "exports".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct SelectorSection {
    name: String,
    color: String,
    #[serde(default = "default_contrast")]
    contrast: String,
}

fn default_contrast() -> String {
    "#ffffff".into()
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate `config/draft.toml` relative to `base_dir`.
///
/// Does not copy defaults; `load_config()` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join("draft.toml");
    let text = read_file(&path)?;
    let file: DraftFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let config = Config {
        pool_path: file.pool.path,
        db_path: file.database.path.unwrap_or_else(default_db_path),
        export_dir: file.export.directory,
        selectors: file
            .selectors
            .into_iter()
            .map(|s| Person::new(s.name.trim(), s.color.trim(), s.contrast.trim()))
            .collect(),
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Skips `.example` files.
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

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
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
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Load config relative to the current working directory, copying default
/// files first.
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

/// `snakedraft.db` in the platform data directory, or the working directory
/// when the platform has none.
fn default_db_path() -> String {
    ProjectDirs::from("", "", "snakedraft")
        .and_then(|dirs| {
            std::fs::create_dir_all(dirs.data_dir()).ok()?;
            Some(dirs.data_dir().join("snakedraft.db"))
        })
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "snakedraft.db".into())
}

/// `#rrggbb`, the only form the console can paint.
pub fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.pool_path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "pool.path".into(),
            message: "must not be empty".into(),
        });
    }

    if config.export_dir.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "export.directory".into(),
            message: "must not be empty".into(),
        });
    }

    for (idx, person) in config.selectors.iter().enumerate() {
        if person.name.is_empty() {
            return Err(ConfigError::ValidationError {
                field: format!("selectors[{idx}].name"),
                message: "must not be empty".into(),
            });
        }
        for (field, value) in [("color", &person.color), ("contrast", &person.contrast)] {
            if !is_hex_color(value) {
                return Err(ConfigError::ValidationError {
                    field: format!("selectors[{idx}].{field}"),
                    message: format!("must be a #rrggbb color, got '{value}'"),
                });
            }
        }
        let duplicate = config.selectors[..idx]
            .iter()
            .any(|other| other.color.eq_ignore_ascii_case(&person.color));
        if duplicate {
            return Err(ConfigError::ValidationError {
                field: format!("selectors[{idx}].color"),
                message: format!("color {} is already used by another selector", person.color),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
