//! Configuration management for the burst driver
//!
//! Loads an optional TOML file with environment variable substitution. With no
//! file present the built-in defaults describe the standard smoke run: 16
//! self transfers against `http://localhost:8545`, five in flight at a time.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

const CONFIG_ENV: &str = "NONCE_BURST_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub rpc: RpcConfig,
    pub batch: BatchConfig,
    pub receipt: ReceiptConfig,
    pub logging: LoggingConfig,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    pub url: String,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8545".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Nonces `start..=start + count` are sent, so `count + 1` transactions
    pub count: u64,
    pub concurrency: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            count: 15,
            concurrency: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReceiptConfig {
    pub max_attempts: u32,
    pub indexing_wait_ms: u64,
    pub pending_wait_ms: u64,
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            indexing_wait_ms: 1_000,
            pending_wait_ms: 100,
        }
    }
}

impl ReceiptConfig {
    pub fn indexing_wait(&self) -> Duration {
        Duration::from_millis(self.indexing_wait_ms)
    }

    pub fn pending_wait(&self) -> Duration {
        Duration::from_millis(self.pending_wait_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub json: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub dump_on_exit: bool,
}

impl Settings {
    /// Load settings from `NONCE_BURST_CONFIG` or `config/default.toml`
    ///
    /// A missing default file is not an error; an explicitly named one is.
    pub fn load() -> Result<Self> {
        match env::var(CONFIG_ENV) {
            Ok(path) => Self::load_from(PathBuf::from(path)),
            Err(_) => {
                let path = PathBuf::from(DEFAULT_CONFIG_PATH);
                if path.exists() {
                    Self::load_from(path)
                } else {
                    let settings = Settings::default();
                    settings.validate()?;
                    Ok(settings)
                }
            }
        }
    }

    /// Load settings from a specific file
    pub fn load_from(config_path: PathBuf) -> Result<Self> {
        let config_str = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::parse(&config_str)
    }

    fn parse(config_str: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(config_str)?;

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.rpc.url.trim().is_empty() {
            anyhow::bail!("rpc.url must not be empty");
        }
        if self.batch.concurrency == 0 {
            anyhow::bail!("batch.concurrency must be at least 1");
        }
        if self.receipt.max_attempts == 0 {
            anyhow::bail!("receipt.max_attempts must be at least 1");
        }

        Ok(())
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> Result<String> {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")?;

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_env_var_substitution() {
        env::set_var("NONCE_BURST_TEST_HOST", "node-1");
        let input = "url = \"http://${NONCE_BURST_TEST_HOST}:8545\"";
        let result = substitute_env_vars(input).unwrap();
        assert_eq!(result, "url = \"http://node-1:8545\"");
    }

    #[test]
    fn test_defaults_describe_standard_run() {
        let settings = Settings::default();
        assert_eq!(settings.rpc.url, "http://localhost:8545");
        assert_eq!(settings.batch.count, 15);
        assert_eq!(settings.batch.concurrency, 5);
        assert_eq!(settings.receipt.max_attempts, 10);
        assert_eq!(settings.receipt.indexing_wait(), Duration::from_secs(1));
        assert_eq!(settings.receipt.pending_wait(), Duration::from_millis(100));
        assert!(!settings.logging.json);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let settings = Settings::parse(
            r#"
            [batch]
            count = 3

            [receipt]
            pending_wait_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(settings.batch.count, 3);
        assert_eq!(settings.batch.concurrency, 5);
        assert_eq!(settings.receipt.pending_wait_ms, 250);
        assert_eq!(settings.receipt.indexing_wait_ms, 1_000);
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert_err!(Settings::parse("[batch]\nconcurrency = 0\n"));
        assert_err!(Settings::parse("[receipt]\nmax_attempts = 0\n"));
        assert_err!(Settings::parse("[rpc]\nurl = \"\"\n"));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[rpc]\nurl = \"http://127.0.0.1:9545\"\n\n[logging]\njson = true").unwrap();

        let settings = assert_ok!(Settings::load_from(file.path().to_path_buf()));
        assert_eq!(settings.rpc.url, "http://127.0.0.1:9545");
        assert!(settings.logging.json);
    }

    #[test]
    fn test_missing_named_file_is_error() {
        assert_err!(Settings::load_from(PathBuf::from("/nonexistent/nonce-burst.toml")));
    }
}
