//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::schema::MockConfig;
use crate::config::validation::{validate_config, ValidationError};

/// File names tried when the config path is a directory.
const DIR_CANDIDATES: [&str; 2] = ["mock.toml", "mock.json"];

/// Extensions tried when the config path does not exist as given.
const EXT_CANDIDATES: [&str; 2] = ["toml", "json"];

/// Error type for configuration loading.
#[derive(Debug)]
pub enum LoadError {
    NotFound(PathBuf),
    UnsupportedFormat(PathBuf),
    Io(std::io::Error),
    Toml(toml::de::Error),
    Json(serde_json::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::NotFound(path) => write!(f, "config file not found: {}", path.display()),
            LoadError::UnsupportedFormat(path) => {
                write!(f, "unsupported config format (expect .toml or .json): {}", path.display())
            }
            LoadError::Io(e) => write!(f, "IO error: {}", e),
            LoadError::Toml(e) => write!(f, "Parse error: {}", e),
            LoadError::Json(e) => write!(f, "Parse error: {}", e),
            LoadError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LoadError::Io(e) => Some(e),
            LoadError::Toml(e) => Some(e),
            LoadError::Json(e) => Some(e),
            _ => None,
        }
    }
}

/// Config file syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "toml" => Some(ConfigFormat::Toml),
            "json" => Some(ConfigFormat::Json),
            _ => None,
        }
    }
}

/// Find the config file `path` refers to.
///
/// A directory resolves to `mock.toml` or `mock.json` inside it; a missing
/// file is retried with a `.toml` then `.json` extension.
pub fn resolve_config_path(path: &Path) -> Result<PathBuf, LoadError> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }

    if path.is_dir() {
        return DIR_CANDIDATES
            .iter()
            .map(|name| path.join(name))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| LoadError::NotFound(path.join(DIR_CANDIDATES[0])));
    }

    EXT_CANDIDATES
        .iter()
        .map(|ext| {
            let mut name = path.as_os_str().to_owned();
            name.push(".");
            name.push(ext);
            PathBuf::from(name)
        })
        .find(|candidate| candidate.is_file())
        .ok_or_else(|| LoadError::NotFound(path.to_path_buf()))
}

/// Deserialize config text; no validation, directories left as written.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<MockConfig, LoadError> {
    match format {
        ConfigFormat::Toml => toml::from_str(content).map_err(LoadError::Toml),
        ConfigFormat::Json => serde_json::from_str(content).map_err(LoadError::Json),
    }
}

/// Load and validate configuration from a TOML or JSON file.
///
/// Relative `data_dir` and `static_dir` are resolved against the config
/// file's directory.
pub fn load_config(path: &Path) -> Result<MockConfig, LoadError> {
    let path = resolve_config_path(path)?;
    let format =
        ConfigFormat::from_path(&path).ok_or_else(|| LoadError::UnsupportedFormat(path.clone()))?;

    let content = fs::read_to_string(&path).map_err(LoadError::Io)?;
    let mut config = parse_config(&content, format)?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    config.data_dir = anchor(base, &config.data_dir);
    config.static_dir = config.static_dir.as_deref().map(|dir| anchor(base, dir));

    validate_config(&config).map_err(LoadError::Validation)?;

    tracing::debug!(
        path = %path.display(),
        rules = config.api.len(),
        "Configuration loaded"
    );
    Ok(config)
}

fn anchor(base: &Path, dir: &Path) -> PathBuf {
    if dir.is_absolute() {
        dir.to_path_buf()
    } else {
        base.join(dir)
    }
}
