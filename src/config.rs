//! Pipeline configuration: where the source data lives and how the warehouse
//! reaches it.
//!
//! Values come from a TOML file and may be overridden per key from the command
//! line or environment. The resolved [`DwhConfig`] is passed explicitly to
//! everything that builds statements.

use directories::ProjectDirs;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default config file name
pub const CONFIG_FILE_NAME: &str = "dwh.toml";

/// Errors raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required key has no value; no statement can be formatted without it
    #[error("missing configuration key [{section}] {key}")]
    MissingKey {
        section: &'static str,
        key: &'static str,
    },

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Object-storage locations of the two sources
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Event log files
    pub log_data: String,
    /// JSONPaths document mapping event fields to staging columns
    pub log_jsonpath: String,
    /// Song catalog files
    pub song_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessConfig {
    /// Role the warehouse assumes to read the sources
    pub iam_role: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Region the sources are read from
    pub region: String,
}

/// Fully resolved configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DwhConfig {
    pub storage: StorageConfig,
    pub access: AccessConfig,
    pub cluster: ClusterConfig,
}

/// Config file contents before validation.
///
/// Section and key names of the legacy `dwh.cfg` layout (`[S3] LOG_DATA`,
/// `[IAM_ROLE] ARN`, `[CLUSTER] REGION`) are accepted as aliases.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ConfigFile {
    #[serde(default, alias = "S3")]
    pub storage: RawStorage,
    #[serde(default, alias = "IAM_ROLE")]
    pub access: RawAccess,
    #[serde(default, alias = "CLUSTER")]
    pub cluster: RawCluster,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawStorage {
    #[serde(alias = "LOG_DATA")]
    pub log_data: Option<String>,
    #[serde(alias = "LOG_JSONPATH")]
    pub log_jsonpath: Option<String>,
    #[serde(alias = "SONG_DATA")]
    pub song_data: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawAccess {
    #[serde(alias = "ARN")]
    pub iam_role: Option<String>,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct RawCluster {
    #[serde(alias = "REGION")]
    pub region: Option<String>,
}

/// Per-key values that take precedence over the file
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub log_data: Option<String>,
    pub log_jsonpath: Option<String>,
    pub song_data: Option<String>,
    pub iam_role: Option<String>,
    pub region: Option<String>,
}

impl ConfigFile {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn apply(mut self, overrides: &ConfigOverrides) -> Self {
        fn set(slot: &mut Option<String>, value: &Option<String>) {
            if value.is_some() {
                *slot = value.clone();
            }
        }

        set(&mut self.storage.log_data, &overrides.log_data);
        set(&mut self.storage.log_jsonpath, &overrides.log_jsonpath);
        set(&mut self.storage.song_data, &overrides.song_data);
        set(&mut self.access.iam_role, &overrides.iam_role);
        set(&mut self.cluster.region, &overrides.region);
        self
    }

    /// Check every key is present and well formed
    pub fn validate(self) -> Result<DwhConfig, ConfigError> {
        let region = required(self.cluster.region, "cluster", "region")?;
        if let Some(c) = region
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
        {
            return Err(ConfigError::Invalid {
                key: "region",
                reason: format!("unexpected character {:?}", c),
            });
        }

        Ok(DwhConfig {
            storage: StorageConfig {
                log_data: required(self.storage.log_data, "storage", "log_data")?,
                log_jsonpath: required(self.storage.log_jsonpath, "storage", "log_jsonpath")?,
                song_data: required(self.storage.song_data, "storage", "song_data")?,
            },
            access: AccessConfig {
                iam_role: required(self.access.iam_role, "access", "iam_role")?,
            },
            cluster: ClusterConfig { region },
        })
    }
}

fn required(
    value: Option<String>,
    section: &'static str,
    key: &'static str,
) -> Result<String, ConfigError> {
    match value.map(|v| v.trim().to_string()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(ConfigError::MissingKey { section, key }),
    }
}

/// Find the config file to read.
///
/// An explicit path must exist. Otherwise `./dwh.toml` is tried, then the
/// platform config directory. `None` means only overrides supply values.
pub fn resolve_config_path(explicit: Option<PathBuf>) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = explicit {
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        return Ok(Some(path));
    }

    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Ok(Some(local));
    }

    Ok(ProjectDirs::from("", "", "songplay-dwh")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
        .filter(|path| path.exists()))
}

/// Resolve, read, override and validate in one step
pub fn load_config(
    explicit: Option<PathBuf>,
    overrides: &ConfigOverrides,
) -> Result<DwhConfig, ConfigError> {
    let file = match resolve_config_path(explicit)? {
        Some(path) => {
            tracing::debug!(path = %path.display(), "reading config file");
            ConfigFile::from_file(&path)?
        }
        None => {
            tracing::debug!("no config file found, using overrides only");
            ConfigFile::default()
        }
    };

    file.apply(overrides).validate()
}
