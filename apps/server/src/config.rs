// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Server configuration loaded from environment variables.

use buildview_loader::{IfcParserSettings, LoaderConfig};
use std::time::Duration;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Port to listen on.
    pub port: u16,
    /// Maximum upload size in MB.
    pub max_file_size_mb: usize,
    /// Request timeout in seconds.
    pub request_timeout_secs: u64,
    /// Longest a snapshot request waits for a load to settle, in seconds.
    pub load_wait_secs: u64,
    /// Base URL for relative model URLs.
    pub model_base_url: Option<String>,
    /// IFC geometry worker threads (0 = one per core).
    pub ifc_worker_threads: usize,
    /// Timeout for fetching a model, in seconds.
    pub fetch_timeout_secs: u64,
    /// Allowed CORS origins (comma-separated, or "*" for all).
    pub cors_origins: Vec<String>,
    /// Emit JSON log lines instead of human-readable ones.
    pub json_logs: bool,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            max_file_size_mb: std::env::var("MAX_FILE_SIZE_MB")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_file_size_mb),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.request_timeout_secs),
            load_wait_secs: std::env::var("LOAD_WAIT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.load_wait_secs),
            model_base_url: std::env::var("MODEL_BASE_URL")
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty()),
            ifc_worker_threads: std::env::var("IFC_WORKER_THREADS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.ifc_worker_threads),
            fetch_timeout_secs: std::env::var("FETCH_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.fetch_timeout_secs),
            cors_origins: std::env::var("CORS_ORIGINS")
                .map(|v| parse_origins(&v))
                .unwrap_or(defaults.cors_origins),
            json_logs: std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json")),
        }
    }

    /// Effective IFC worker count, for logging
    pub fn effective_worker_threads(&self) -> usize {
        match self.ifc_worker_threads {
            0 => num_cpus::get(),
            n => n,
        }
    }

    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_mb * 1024 * 1024
    }

    /// Settings for the shared scene loader
    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            base_url: self.model_base_url.clone(),
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            parser: IfcParserSettings {
                worker_threads: self.ifc_worker_threads,
                ..IfcParserSettings::default()
            },
        }
    }
}

fn parse_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            max_file_size_mb: 500,
            request_timeout_secs: 300,
            load_wait_secs: 60,
            model_base_url: None,
            ifc_worker_threads: 0,
            fetch_timeout_secs: 120,
            // Common development origins
            cors_origins: parse_origins("http://localhost:3000,http://localhost:5173,http://127.0.0.1:3000,http://127.0.0.1:5173"),
            json_logs: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loader_config() {
        let config = Config {
            model_base_url: Some("https://models.example.com/".to_string()),
            ifc_worker_threads: 3,
            fetch_timeout_secs: 30,
            ..Config::default()
        };
        let loader = config.loader_config();
        assert_eq!(loader.base_url.as_deref(), Some("https://models.example.com/"));
        assert_eq!(loader.fetch_timeout, Duration::from_secs(30));
        assert_eq!(loader.parser.worker_threads, 3);
        assert_eq!(loader.parser.schemas, IfcParserSettings::default().schemas);
    }

    #[test]
    fn test_parse_origins() {
        assert_eq!(parse_origins(" https://a.example , ,*"), vec!["https://a.example", "*"]);
    }
}
