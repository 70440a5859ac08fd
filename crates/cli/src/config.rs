//! Service configuration
//!
//! Defaults, then an optional TOML file, then command line overrides.
//! The result is validated once before the daemon is built.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 2020;
pub const DEFAULT_SKIP_LIST: &str = ".git,.hg";
pub const DEFAULT_HIST_FILE: &str = ".zhistfile";
pub const DEFAULT_MONITOR_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_DIR_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Daemon configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    /// Port the service listens on (0 picks a free port)
    pub port: u16,

    /// Filesystem root to index
    pub root: Option<PathBuf>,

    /// Base names or full paths excluded from indexing
    pub skip_list: Vec<String>,

    /// Shell history file to watch
    pub hist_file: PathBuf,

    /// Substituted for a leading `~` in history paths
    pub home: PathBuf,

    /// History polling interval
    #[serde(with = "duration_secs")]
    pub monitor_interval: Duration,

    /// Interval between full re-index passes
    #[serde(with = "duration_secs")]
    pub dir_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
        Self {
            port: DEFAULT_PORT,
            root: None,
            skip_list: split_list(DEFAULT_SKIP_LIST),
            hist_file: home.join(DEFAULT_HIST_FILE),
            home,
            monitor_interval: DEFAULT_MONITOR_INTERVAL,
            dir_interval: DEFAULT_DIR_INTERVAL,
        }
    }
}

/// Command line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub root: Option<PathBuf>,
    pub skip_list: Option<String>,
    pub hist_file: Option<PathBuf>,
    pub home: Option<PathBuf>,
    pub monitor_interval_secs: Option<u64>,
    pub dir_interval_secs: Option<u64>,
}

impl Config {
    /// Load from `path`, or from the default location when it exists
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match config_file_path() {
                Some(path) if path.exists() => path,
                _ => return Ok(Self::default()),
            },
        };

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(root) = overrides.root {
            self.root = Some(root);
        }
        if let Some(list) = overrides.skip_list {
            self.skip_list = split_list(&list);
        }
        if let Some(hist_file) = overrides.hist_file {
            self.hist_file = hist_file;
        }
        if let Some(home) = overrides.home {
            self.home = home;
        }
        if let Some(secs) = overrides.monitor_interval_secs {
            self.monitor_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = overrides.dir_interval_secs {
            self.dir_interval = Duration::from_secs(secs);
        }
    }

    /// Reject configurations the daemon cannot run with
    pub fn validate(&self) -> Result<()> {
        match &self.root {
            None => anyhow::bail!("You must supply a root path to index"),
            Some(root) if root.as_os_str().is_empty() => {
                anyhow::bail!("You must supply a root path to index")
            }
            Some(_) => {}
        }
        if self.monitor_interval.is_zero() {
            anyhow::bail!("monitor-interval must be greater than zero");
        }
        if self.dir_interval.is_zero() {
            anyhow::bail!("dir-interval must be greater than zero");
        }
        Ok(())
    }

    /// Root path; only meaningful after [`Config::validate`]
    pub fn root(&self) -> &Path {
        self.root.as_deref().unwrap_or_else(|| Path::new(""))
    }
}

/// Split a comma-separated list, dropping empty items
pub fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// `<config dir>/dirdex/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("dirdex").join("config.toml"))
}

/// Directory for lock and log files
pub fn state_dir() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::cache_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join("dirdex")
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
