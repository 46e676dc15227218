// Runtime configuration for ACAI Resources
// Read once at startup from the environment, with defaults for everything

use std::path::PathBuf;

pub const DEFAULT_GRAPHQL_ENDPOINT: &str =
    "https://acai-resources-preview---symphony-api-svc-prod-25c5xl4maa-uk.a.run.app/graphql/";

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

const ENV_ENDPOINT: &str = "ACAI_GRAPHQL_ENDPOINT";
const ENV_TIMEOUT: &str = "ACAI_REQUEST_TIMEOUT_SECS";
const ENV_DATA_DIR: &str = "ACAI_DATA_DIR";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub graphql_endpoint: String,
    pub request_timeout_secs: u64,
    /// Directory holding the SQLite state database
    pub data_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            graphql_endpoint: DEFAULT_GRAPHQL_ENDPOINT.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            data_dir: default_data_dir(),
        }
    }
}

impl AppConfig {
    /// Build from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(endpoint) = lookup(ENV_ENDPOINT).filter(|v| !v.trim().is_empty()) {
            config.graphql_endpoint = endpoint.trim().to_string();
        }

        if let Some(raw) = lookup(ENV_TIMEOUT) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout_secs = secs,
                _ => log::warn!(
                    "Ignoring invalid {}={:?}, using {}s",
                    ENV_TIMEOUT,
                    raw,
                    DEFAULT_REQUEST_TIMEOUT_SECS
                ),
            }
        }

        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }

        config
    }

    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("acai_resources.db")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("acai-resources")
}
