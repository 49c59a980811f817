//! Configuration loading and run input validation.
//!
//! Settings come from four layers, lowest precedence first: TOML config
//! files, the JSON input document, `TOMBA_*` / `TF_*` environment variables
//! and finally CLI flags. This module owns the first three and the validation
//! that turns a merged `RunInput` into a `RunConfig`.

use crate::error::TechFinderError;
use crate::types::{OutputFormat, RunConfig, RunInput, DEFAULT_MAX_RESULTS};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

impl RunConfig {
    /// Validate raw input and build the run configuration.
    ///
    /// # Errors
    ///
    /// Returns `TechFinderError::ConfigError` if:
    /// - no input was supplied at all
    /// - the API key or secret is missing or empty
    /// - the domain list is missing or empty
    /// - `maxResults` is not a positive integer
    pub fn from_input(input: Option<RunInput>) -> Result<Self, TechFinderError> {
        let input = input.ok_or_else(|| TechFinderError::config("Input is required"))?;

        let api_key = input.tomba_api_key.unwrap_or_default();
        let api_secret = input.tomba_api_secret.unwrap_or_default();
        if api_key.trim().is_empty() || api_secret.trim().is_empty() {
            return Err(TechFinderError::config(
                "Tomba API key and secret are required",
            ));
        }

        let domains = input.domains.unwrap_or_default();
        if domains.is_empty() {
            return Err(TechFinderError::config("At least one domain is required"));
        }

        let max_results = match input.max_results {
            None => DEFAULT_MAX_RESULTS,
            Some(n) if n > 0 => usize::try_from(n).unwrap_or(usize::MAX),
            Some(n) => {
                return Err(TechFinderError::config(format!(
                    "maxResults must be a positive integer, got {}",
                    n
                )))
            }
        };

        Ok(RunConfig {
            api_key,
            api_secret,
            domains,
            max_results,
        })
    }
}

/// Read a JSON input document.
///
/// The document uses the field names `tombaApiKey`, `tombaApiSecret`,
/// `domains` and `maxResults`.
pub fn load_input_file<P: AsRef<Path>>(path: P) -> Result<RunInput, TechFinderError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        TechFinderError::file_error(
            path.to_string_lossy(),
            format!("Failed to read input file: {}", e),
        )
    })?;

    serde_json::from_str(&content).map_err(|e| {
        TechFinderError::config(format!(
            "Invalid input file '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Configuration loaded from TOML files.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FileConfig {
    /// Run defaults
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultsConfig>,

    /// Lookup API settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api: Option<ApiConfig>,

    /// Throttle settings
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<RateConfig>,

    /// Output formatting preferences
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<OutputConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct DefaultsConfig {
    /// Default cap on emitted records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ApiConfig {
    /// API root, e.g. "https://api.tomba.io/v1"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Request timeout (as string, e.g., "30s", "2m")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct RateConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requests_per_minute: Option<u32>,

    /// Delay after each domain, in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pacing_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct OutputConfig {
    /// "jsonl" or "csv"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Configuration discovery and loading functionality.
#[derive(Debug, Default)]
pub struct ConfigManager;

impl ConfigManager {
    pub fn new() -> Self {
        Self
    }

    /// Load configuration from a specific file.
    pub fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<FileConfig, TechFinderError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(TechFinderError::file_error(
                path.to_string_lossy(),
                "Configuration file not found",
            ));
        }

        let content = fs::read_to_string(path).map_err(|e| {
            TechFinderError::file_error(
                path.to_string_lossy(),
                format!("Failed to read configuration file: {}", e),
            )
        })?;

        let config: FileConfig = toml::from_str(&content).map_err(|e| {
            TechFinderError::config(format!("Failed to parse TOML configuration: {}", e))
        })?;

        self.validate_config(&config)?;

        Ok(config)
    }

    /// Discover and load configuration files in precedence order.
    ///
    /// XDG config is lowest, then the home directory file, then the file in
    /// the current directory. Files that fail to load are skipped with a
    /// warning.
    pub fn discover_and_load(&self) -> Result<FileConfig, TechFinderError> {
        let mut merged_config = FileConfig::default();
        let mut loaded_files = Vec::new();

        let candidates = [
            self.get_xdg_config_path(),
            self.get_global_config_path(),
            self.get_local_config_path(),
        ];

        for path in candidates.into_iter().flatten() {
            match self.load_file(&path) {
                Ok(config) => {
                    merged_config = self.merge_configs(merged_config, config);
                    loaded_files.push(path);
                }
                Err(e) => tracing::warn!("Ignoring config file {}: {}", path.display(), e),
            }
        }

        if loaded_files.len() > 1 {
            tracing::debug!(
                files = ?loaded_files,
                "multiple config files merged, later files take precedence"
            );
        }

        Ok(merged_config)
    }

    fn get_local_config_path(&self) -> Option<PathBuf> {
        ["./tech-finder.toml", "./.tech-finder.toml"]
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(Path::to_path_buf)
    }

    fn get_global_config_path(&self) -> Option<PathBuf> {
        let home = env::var_os("HOME")?;
        [".tech-finder.toml", "tech-finder.toml"]
            .iter()
            .map(|candidate| Path::new(&home).join(candidate))
            .find(|path| path.exists())
    }

    fn get_xdg_config_path(&self) -> Option<PathBuf> {
        let config_dir = env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| env::var_os("HOME").map(|home| Path::new(&home).join(".config")))?;

        let path = config_dir.join("tech-finder").join("config.toml");
        path.exists().then_some(path)
    }

    /// Merge two configurations. Values from `higher` win field by field.
    pub fn merge_configs(&self, lower: FileConfig, higher: FileConfig) -> FileConfig {
        FileConfig {
            defaults: match (lower.defaults, higher.defaults) {
                (Some(mut l), Some(h)) => {
                    if h.max_results.is_some() {
                        l.max_results = h.max_results;
                    }
                    Some(l)
                }
                (l, h) => h.or(l),
            },
            api: match (lower.api, higher.api) {
                (Some(mut l), Some(h)) => {
                    if h.base_url.is_some() {
                        l.base_url = h.base_url;
                    }
                    if h.timeout.is_some() {
                        l.timeout = h.timeout;
                    }
                    Some(l)
                }
                (l, h) => h.or(l),
            },
            rate: match (lower.rate, higher.rate) {
                (Some(mut l), Some(h)) => {
                    if h.requests_per_minute.is_some() {
                        l.requests_per_minute = h.requests_per_minute;
                    }
                    if h.pacing_ms.is_some() {
                        l.pacing_ms = h.pacing_ms;
                    }
                    Some(l)
                }
                (l, h) => h.or(l),
            },
            output: higher.output.or(lower.output),
        }
    }

    /// Validate a configuration for common issues.
    fn validate_config(&self, config: &FileConfig) -> Result<(), TechFinderError> {
        if let Some(defaults) = &config.defaults {
            if defaults.max_results == Some(0) {
                return Err(TechFinderError::config(
                    "max_results must be greater than 0",
                ));
            }
        }

        if let Some(api) = &config.api {
            if let Some(timeout_str) = &api.timeout {
                if parse_timeout_string(timeout_str).is_none() {
                    return Err(TechFinderError::config(format!(
                        "Invalid timeout format '{}'. Use format like '5s', '30s', '2m'",
                        timeout_str
                    )));
                }
            }
            if let Some(base_url) = &api.base_url {
                if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                    return Err(TechFinderError::config(format!(
                        "Invalid base_url '{}': must start with http:// or https://",
                        base_url
                    )));
                }
            }
        }

        if let Some(rate) = &config.rate {
            if rate.requests_per_minute == Some(0) {
                return Err(TechFinderError::config(
                    "requests_per_minute must be greater than 0",
                ));
            }
        }

        if let Some(output) = &config.output {
            if let Some(format) = &output.format {
                format
                    .parse::<OutputFormat>()
                    .map_err(TechFinderError::config)?;
            }
        }

        Ok(())
    }
}

/// Settings taken from environment variables.
///
/// Credentials use the `TOMBA_API_KEY` / `TOMBA_API_SECRET` names; the rest
/// use a `TF_` prefix.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvConfig {
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub max_results: Option<usize>,
    pub requests_per_minute: Option<u32>,
    pub pacing_ms: Option<u64>,
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

impl EnvConfig {
    /// The credential part of the environment as a run input layer.
    pub fn as_run_input(&self) -> RunInput {
        RunInput {
            tomba_api_key: self.api_key.clone(),
            tomba_api_secret: self.api_secret.clone(),
            domains: None,
            max_results: self.max_results.map(|n| n as i64),
        }
    }
}

/// Load configuration from the process environment.
pub fn load_env_config() -> EnvConfig {
    load_env_config_from(|name| env::var(name).ok())
}

/// Load configuration through an arbitrary variable lookup.
///
/// Invalid values are logged as warnings and ignored.
pub fn load_env_config_from<F>(lookup: F) -> EnvConfig
where
    F: Fn(&str) -> Option<String>,
{
    let mut env_config = EnvConfig::default();

    let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    env_config.api_key = non_empty("TOMBA_API_KEY");
    env_config.api_secret = non_empty("TOMBA_API_SECRET");

    if let Some(val) = non_empty("TF_MAX_RESULTS") {
        match val.trim().parse::<usize>() {
            Ok(n) if n > 0 => {
                env_config.max_results = Some(n);
                tracing::debug!("Using TF_MAX_RESULTS={}", n);
            }
            _ => tracing::warn!("Invalid TF_MAX_RESULTS='{}', must be a positive integer", val),
        }
    }

    if let Some(val) = non_empty("TF_REQUESTS_PER_MINUTE") {
        match val.trim().parse::<u32>() {
            Ok(n) if n > 0 => {
                env_config.requests_per_minute = Some(n);
                tracing::debug!("Using TF_REQUESTS_PER_MINUTE={}", n);
            }
            _ => tracing::warn!(
                "Invalid TF_REQUESTS_PER_MINUTE='{}', must be a positive integer",
                val
            ),
        }
    }

    if let Some(val) = non_empty("TF_PACING_MS") {
        match val.trim().parse::<u64>() {
            Ok(n) => {
                env_config.pacing_ms = Some(n);
                tracing::debug!("Using TF_PACING_MS={}", n);
            }
            Err(_) => tracing::warn!("Invalid TF_PACING_MS='{}', must be milliseconds", val),
        }
    }

    if let Some(val) = non_empty("TF_BASE_URL") {
        tracing::debug!("Using TF_BASE_URL={}", val);
        env_config.base_url = Some(val);
    }

    if let Some(val) = non_empty("TF_TIMEOUT") {
        if parse_timeout_string(&val).is_some() {
            tracing::debug!("Using TF_TIMEOUT={}", val);
            env_config.timeout = Some(val);
        } else {
            tracing::warn!(
                "Invalid TF_TIMEOUT='{}', use format like '5s', '30s', '2m'",
                val
            );
        }
    }

    env_config
}

/// Parse a timeout string like "5s", "30s", "2m" into seconds.
///
/// A bare number is taken as seconds.
pub fn parse_timeout_string(timeout_str: &str) -> Option<u64> {
    let timeout_str = timeout_str.trim().to_lowercase();

    if let Some(secs) = timeout_str.strip_suffix('s') {
        secs.parse::<u64>().ok()
    } else if let Some(mins) = timeout_str.strip_suffix('m') {
        mins.parse::<u64>().ok().map(|m| m * 60)
    } else {
        timeout_str.parse::<u64>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn input(key: &str, secret: &str, domains: &[&str]) -> RunInput {
        RunInput {
            tomba_api_key: Some(key.to_string()),
            tomba_api_secret: Some(secret.to_string()),
            domains: Some(domains.iter().map(|d| d.to_string()).collect()),
            max_results: None,
        }
    }

    #[test]
    fn test_missing_input() {
        let err = RunConfig::from_input(None).unwrap_err();
        assert_eq!(err.message(), "Input is required");
    }

    #[test]
    fn test_missing_credentials() {
        let err = RunConfig::from_input(Some(input("", "s", &["a.com"]))).unwrap_err();
        assert_eq!(err.message(), "Tomba API key and secret are required");

        let mut no_secret = input("k", "s", &["a.com"]);
        no_secret.tomba_api_secret = None;
        assert!(RunConfig::from_input(Some(no_secret)).is_err());
    }

    #[test]
    fn test_empty_domains() {
        let err = RunConfig::from_input(Some(input("k", "s", &[]))).unwrap_err();
        assert_eq!(err.message(), "At least one domain is required");
        assert!(matches!(err, TechFinderError::ConfigError { .. }));

        let mut missing = input("k", "s", &[]);
        missing.domains = None;
        assert!(RunConfig::from_input(Some(missing)).is_err());
    }

    #[test]
    fn test_max_results_default_and_validation() {
        let config = RunConfig::from_input(Some(input("k", "s", &["a.com"]))).unwrap();
        assert_eq!(config.max_results, 50);
        assert_eq!(config.domains, vec!["a.com".to_string()]);

        let mut capped = input("k", "s", &["a.com"]);
        capped.max_results = Some(3);
        assert_eq!(RunConfig::from_input(Some(capped)).unwrap().max_results, 3);

        let mut zero = input("k", "s", &["a.com"]);
        zero.max_results = Some(0);
        assert!(RunConfig::from_input(Some(zero)).is_err());

        let mut negative = input("k", "s", &["a.com"]);
        negative.max_results = Some(-4);
        assert!(RunConfig::from_input(Some(negative)).is_err());
    }

    #[test]
    fn test_load_input_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(
                br#"{"tombaApiKey":"ta_1","tombaApiSecret":"ts_1","domains":["a.com","b.com"],"maxResults":10}"#,
            )
            .unwrap();
        temp_file.flush().unwrap();

        let input = load_input_file(temp_file.path()).unwrap();
        let config = RunConfig::from_input(Some(input)).unwrap();
        assert_eq!(config.api_key, "ta_1");
        assert_eq!(config.domains.len(), 2);
        assert_eq!(config.max_results, 10);
    }

    #[test]
    fn test_load_input_file_rejects_bad_json() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(br#"{"domains": "a.com"}"#).unwrap();
        temp_file.flush().unwrap();

        let err = load_input_file(temp_file.path()).unwrap_err();
        assert!(matches!(err, TechFinderError::ConfigError { .. }));

        let err = load_input_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, TechFinderError::FileError { .. }));
    }

    #[test]
    fn test_parse_timeout_string() {
        assert_eq!(parse_timeout_string("5s"), Some(5));
        assert_eq!(parse_timeout_string("30s"), Some(30));
        assert_eq!(parse_timeout_string("2m"), Some(120));
        assert_eq!(parse_timeout_string("5"), Some(5));
        assert_eq!(parse_timeout_string("invalid"), None);
    }

    #[test]
    fn test_load_valid_config() {
        let config_content = r#"
[defaults]
max_results = 25

[api]
base_url = "https://api.tomba.io/v1"
timeout = "10s"

[rate]
requests_per_minute = 60
pacing_ms = 250

[output]
format = "csv"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(config_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = ConfigManager::new().load_file(temp_file.path()).unwrap();
        assert_eq!(config.defaults.unwrap().max_results, Some(25));
        let api = config.api.unwrap();
        assert_eq!(api.timeout.as_deref(), Some("10s"));
        let rate = config.rate.unwrap();
        assert_eq!(rate.requests_per_minute, Some(60));
        assert_eq!(rate.pacing_ms, Some(250));
        assert_eq!(config.output.unwrap().format.as_deref(), Some("csv"));
    }

    #[test]
    fn test_invalid_config_values() {
        for content in [
            "[rate]\nrequests_per_minute = 0\n",
            "[defaults]\nmax_results = 0\n",
            "[api]\ntimeout = \"soon\"\n",
            "[api]\nbase_url = \"ftp://example.com\"\n",
            "[output]\nformat = \"xml\"\n",
        ] {
            let mut temp_file = NamedTempFile::new().unwrap();
            temp_file.write_all(content.as_bytes()).unwrap();
            temp_file.flush().unwrap();

            let result = ConfigManager::new().load_file(temp_file.path());
            assert!(result.is_err(), "expected rejection of: {}", content);
        }
    }

    #[test]
    fn test_missing_config_file() {
        let err = ConfigManager::new()
            .load_file("/no/such/tech-finder.toml")
            .unwrap_err();
        assert!(matches!(err, TechFinderError::FileError { .. }));
    }

    #[test]
    fn test_merge_configs() {
        let manager = ConfigManager::new();

        let lower = FileConfig {
            defaults: Some(DefaultsConfig {
                max_results: Some(10),
            }),
            rate: Some(RateConfig {
                requests_per_minute: Some(100),
                pacing_ms: Some(50),
            }),
            ..Default::default()
        };

        let higher = FileConfig {
            rate: Some(RateConfig {
                requests_per_minute: Some(30),
                pacing_ms: None,
            }),
            output: Some(OutputConfig {
                format: Some("csv".to_string()),
            }),
            ..Default::default()
        };

        let merged = manager.merge_configs(lower, higher);
        assert_eq!(merged.defaults.unwrap().max_results, Some(10));
        let rate = merged.rate.unwrap();
        assert_eq!(rate.requests_per_minute, Some(30)); // Higher wins
        assert_eq!(rate.pacing_ms, Some(50)); // Lower preserved
        assert_eq!(merged.output.unwrap().format.as_deref(), Some("csv"));
    }

    #[test]
    fn test_env_config() {
        let vars: HashMap<&str, &str> = [
            ("TOMBA_API_KEY", "ta_env"),
            ("TOMBA_API_SECRET", "ts_env"),
            ("TF_MAX_RESULTS", "7"),
            ("TF_REQUESTS_PER_MINUTE", "0"),
            ("TF_PACING_MS", "250"),
            ("TF_TIMEOUT", "nope"),
            ("TF_BASE_URL", "  "),
        ]
        .into_iter()
        .collect();

        let env_config = load_env_config_from(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(env_config.api_key.as_deref(), Some("ta_env"));
        assert_eq!(env_config.api_secret.as_deref(), Some("ts_env"));
        assert_eq!(env_config.max_results, Some(7));
        // Invalid values are ignored
        assert_eq!(env_config.requests_per_minute, None);
        assert_eq!(env_config.timeout, None);
        assert_eq!(env_config.base_url, None);
        assert_eq!(env_config.pacing_ms, Some(250));

        let layer = env_config.as_run_input();
        assert_eq!(layer.tomba_api_key.as_deref(), Some("ta_env"));
        assert_eq!(layer.max_results, Some(7));
        assert!(layer.domains.is_none());
    }
}
