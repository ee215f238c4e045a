//! Configuration system
//!
//! Documents are read and written as TOML or RON, chosen by file extension.

pub use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        load_document(path)
    }

    /// Save configuration to file
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        save_document(self, path)
    }
}

/// Supported document formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// `.toml`
    Toml,
    /// `.ron`
    Ron,
}

impl DocumentFormat {
    /// Pick a format from the file extension
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("ron") => Ok(Self::Ron),
            _ => Err(ConfigError::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Parse a document from a string in the given format
pub fn parse_document<T>(contents: &str, format: DocumentFormat) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    match format {
        DocumentFormat::Toml => toml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
        DocumentFormat::Ron => ron::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string())),
    }
}

/// Load any deserializable document from a `.toml` or `.ron` file
pub fn load_document<T>(path: impl AsRef<Path>) -> Result<T, ConfigError>
where
    T: for<'de> Deserialize<'de>,
{
    let path = path.as_ref();
    let format = DocumentFormat::from_path(path)?;
    let contents = std::fs::read_to_string(path)?;
    log::debug!("Loading {:?} document from {}", format, path.display());
    parse_document(&contents, format)
}

/// Save any serializable document to a `.toml` or `.ron` file
pub fn save_document<T: Serialize>(value: &T, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let contents = match DocumentFormat::from_path(path)? {
        DocumentFormat::Toml => {
            toml::to_string_pretty(value).map_err(|e| ConfigError::Serialize(e.to_string()))?
        }
        DocumentFormat::Ron => ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Serialize(e.to_string()))?,
    };

    std::fs::write(path, contents).map_err(ConfigError::Io)
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value parsed but does not make sense
    #[error("Invalid value: {0}")]
    Invalid(String),
}
