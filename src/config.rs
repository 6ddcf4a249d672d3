use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::import::ImportError;

/// 20 MiB upload ceiling
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 20 * 1024 * 1024;
/// Rows beyond this count trigger a warning, not a rejection
pub const DEFAULT_SOFT_ROW_LIMIT: usize = 1000;
pub const DEFAULT_MIN_MATCH_SCORE: u32 = 50;
/// Numbers above this are read as spreadsheet serial dates
pub const DEFAULT_SERIAL_DATE_THRESHOLD: f64 = 20000.0;

const CONFIG_DIR_NAME: &str = "libris-import";
const CONFIG_FILE_NAME: &str = "config.json";

/// How ambiguous numeric dates such as 01/02/2024 are read
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DateOrder {
    #[default]
    DayFirst,
    MonthFirst,
}

/// How headers are assigned to descriptors
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Each descriptor takes its best header; a header may serve several descriptors
    #[default]
    Greedy,
    /// One header per descriptor, highest scores claimed first
    Exclusive,
}

/// Tunables for one import session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ImportConfig {
    #[serde(default = "default_max_file_size_bytes")]
    pub max_file_size_bytes: u64,
    #[serde(default = "default_soft_row_limit")]
    pub soft_row_limit: usize,
    #[serde(default = "default_min_match_score")]
    pub min_match_score: u32,
    #[serde(default)]
    pub match_strategy: MatchStrategy,
    #[serde(default)]
    pub date_order: DateOrder,
    #[serde(default = "default_serial_date_threshold")]
    pub serial_date_threshold: f64,
}

fn default_max_file_size_bytes() -> u64 {
    DEFAULT_MAX_FILE_SIZE_BYTES
}

fn default_soft_row_limit() -> usize {
    DEFAULT_SOFT_ROW_LIMIT
}

fn default_min_match_score() -> u32 {
    DEFAULT_MIN_MATCH_SCORE
}

fn default_serial_date_threshold() -> f64 {
    DEFAULT_SERIAL_DATE_THRESHOLD
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            soft_row_limit: DEFAULT_SOFT_ROW_LIMIT,
            min_match_score: DEFAULT_MIN_MATCH_SCORE,
            match_strategy: MatchStrategy::default(),
            date_order: DateOrder::default(),
            serial_date_threshold: DEFAULT_SERIAL_DATE_THRESHOLD,
        }
    }
}

impl ImportConfig {
    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ImportError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ImportError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, ImportError> {
        serde_json::from_str(contents)
            .map_err(|e| ImportError::config(format!("Invalid config: {}", e)))
    }

    /// Load from the user config directory, falling back to defaults when absent
    pub fn load_or_default() -> Result<Self, ImportError> {
        match default_config_path() {
            Some(path) if path.exists() => {
                tracing::debug!("import config: loading {}", path.display());
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }
}

/// `<config_dir>/libris-import/config.json`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Where the HTTP submitter sends rows
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmitConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    pub endpoint: String,
    #[serde(default)]
    pub refresh_endpoint: Option<String>,
}

fn default_base_url() -> String {
    "http://localhost:5000".to_string()
}

impl SubmitConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            base_url: default_base_url(),
            endpoint: endpoint.into(),
            refresh_endpoint: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_refresh(mut self, endpoint: impl Into<String>) -> Self {
        self.refresh_endpoint = Some(endpoint.into());
        self
    }

    pub fn submit_url(&self) -> String {
        join_url(&self.base_url, &self.endpoint)
    }

    pub fn refresh_url(&self) -> Option<String> {
        self.refresh_endpoint
            .as_ref()
            .map(|endpoint| join_url(&self.base_url, endpoint))
    }
}

fn join_url(base: &str, endpoint: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        endpoint.trim_start_matches('/')
    )
}
