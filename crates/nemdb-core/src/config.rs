use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Deserialize;
use tracing::info;

use crate::error::{NemdbError, Result};

/// Storage backend the datasets are written to. Only a local filesystem is
/// supported; the variant exists so configs can name their backend explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filesystem {
    #[default]
    Local,
}

impl FromStr for Filesystem {
    type Err = NemdbError;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "local" => Ok(Filesystem::Local),
            other => Err(NemdbError::Config(format!(
                "unsupported filesystem backend '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Filesystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filesystem::Local => write!(f, "local"),
        }
    }
}

/// Where datasets and downloaded artefacts live.
#[derive(Debug, Clone)]
pub struct Config {
    pub cache_dir: PathBuf,
    pub filesystem: Filesystem,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    cache_dir: Option<PathBuf>,
    filesystem: Option<Filesystem>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cache_dir: home_dir().join(".nemweb_cache"),
            filesystem: Filesystem::Local,
        }
    }
}

impl Config {
    pub fn new(cache_dir: impl Into<PathBuf>, filesystem: Filesystem) -> Self {
        Config {
            cache_dir: cache_dir.into(),
            filesystem,
        }
    }

    /// Parses a `nemdb.toml`; unset keys fall back to the defaults.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let parsed: RawConfig = toml::from_str(raw)
            .map_err(|err| NemdbError::Config(format!("invalid config file: {err}")))?;
        let defaults = Config::default();
        Ok(Config {
            cache_dir: parsed.cache_dir.unwrap_or(defaults.cache_dir),
            filesystem: parsed.filesystem.unwrap_or(defaults.filesystem),
        })
    }

    /// Loads `path` when given, otherwise `./nemdb.toml` when present,
    /// otherwise the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let candidate = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("nemdb.toml"));
        if candidate.exists() {
            info!(path = %candidate.display(), "loading configuration");
            Config::from_toml_str(&fs::read_to_string(candidate)?)
        } else {
            Ok(Config::default())
        }
    }

    pub fn ensure_cache_dir(&self) -> Result<()> {
        if !self.cache_dir.exists() {
            info!(path = %self.cache_dir.display(), "creating cache directory");
            fs::create_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }

    /// Root directory of one partitioned dataset.
    pub fn table_dir(&self, table: &str) -> PathBuf {
        self.cache_dir.join(table)
    }
}

fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}
