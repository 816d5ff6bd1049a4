//! Application configuration for Icebreaker.
//!
//! User config lives at `~/.icebreaker/icebreaker.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{IcebreakerError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "icebreaker.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".icebreaker";

/// Desktop Chrome identity. Plenty of small-business sites serve an empty
/// shell or a 403 to anything that looks like a bot.
const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

// ---------------------------------------------------------------------------
// Config structs (matching icebreaker.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Batch-level defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Website fetching.
    #[serde(default)]
    pub fetch: FetchSection,

    /// Language-model endpoint and models.
    #[serde(default)]
    pub llm: LlmConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Maximum number of leads processed at the same time.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Fetch and summarize a lead's sub-pages concurrently.
    #[serde(default)]
    pub parallel_subpages: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            parallel_subpages: false,
        }
    }
}

fn default_concurrency() -> usize {
    4
}

/// `[fetch]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSection {
    /// Per-request timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_secs: u64,

    /// Maximum redirect hops to follow.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,

    /// User-Agent header sent with every page request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Allow fetching loopback/private hosts (local testing only).
    #[serde(default)]
    pub allow_private_hosts: bool,
}

impl Default for FetchSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout(),
            max_redirects: default_max_redirects(),
            user_agent: default_user_agent(),
            allow_private_hosts: false,
        }
    }
}

fn default_fetch_timeout() -> u64 {
    25
}
fn default_max_redirects() -> usize {
    5
}
fn default_user_agent() -> String {
    BROWSER_USER_AGENT.into()
}

/// `[llm]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Name of the env var holding the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Base URL of an OpenAI-compatible chat completions API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model used to summarize individual pages.
    #[serde(default = "default_summary_model")]
    pub summary_model: String,

    /// Model used to write the icebreaker.
    #[serde(default = "default_icebreaker_model")]
    pub icebreaker_model: String,

    #[serde(default = "default_summary_temperature")]
    pub summary_temperature: f32,

    #[serde(default = "default_icebreaker_temperature")]
    pub icebreaker_temperature: f32,

    /// Client-side timeout for a single model call, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            base_url: default_base_url(),
            summary_model: default_summary_model(),
            icebreaker_model: default_icebreaker_model(),
            summary_temperature: default_summary_temperature(),
            icebreaker_temperature: default_icebreaker_temperature(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".into()
}
fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".into()
}
fn default_summary_model() -> String {
    "openai/gpt-4o-mini".into()
}
fn default_icebreaker_model() -> String {
    "openai/gpt-4o".into()
}
fn default_summary_temperature() -> f32 {
    0.5
}
fn default_icebreaker_temperature() -> f32 {
    0.5
}
fn default_request_timeout() -> u64 {
    90
}

// ---------------------------------------------------------------------------
// Fetch config (runtime, merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime fetch configuration used to build the HTTP page fetcher.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Per-request timeout.
    pub timeout: Duration,
    /// Maximum redirect hops.
    pub max_redirects: usize,
    /// User-Agent header value.
    pub user_agent: String,
    /// Whether loopback/private hosts may be fetched.
    pub allow_private_hosts: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for FetchConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            timeout: Duration::from_secs(config.fetch.timeout_secs),
            max_redirects: config.fetch.max_redirects,
            user_agent: config.fetch.user_agent.clone(),
            allow_private_hosts: config.fetch.allow_private_hosts,
        }
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.icebreaker/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| IcebreakerError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.icebreaker/icebreaker.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| IcebreakerError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        IcebreakerError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| IcebreakerError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| IcebreakerError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| IcebreakerError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the model API key from the env var named in the config.
pub fn read_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.llm.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(IcebreakerError::config(format!(
            "model API key not found. Set the {var_name} environment variable."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("summary_model"));
        assert!(toml_str.contains("OPENROUTER_API_KEY"));
        assert!(toml_str.contains("Mozilla/5.0"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.concurrency, 4);
        assert_eq!(parsed.fetch.max_redirects, 5);
        assert_eq!(parsed.llm.api_key_env, "OPENROUTER_API_KEY");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[fetch]
timeout_secs = 10

[llm]
icebreaker_model = "anthropic/claude-sonnet-4"
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.fetch.timeout_secs, 10);
        assert_eq!(config.fetch.max_redirects, 5);
        assert_eq!(config.llm.icebreaker_model, "anthropic/claude-sonnet-4");
        assert_eq!(config.llm.summary_model, "openai/gpt-4o-mini");
        assert!(!config.defaults.parallel_subpages);
    }

    #[test]
    fn fetch_config_from_app_config() {
        let app = AppConfig::default();
        let fetch = FetchConfig::from(&app);
        assert_eq!(fetch.timeout, Duration::from_secs(25));
        assert_eq!(fetch.max_redirects, 5);
        assert!(fetch.user_agent.contains("Chrome"));
        assert!(!fetch.allow_private_hosts);
    }

    #[test]
    fn missing_api_key_is_config_error() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.llm.api_key_env = "IB_TEST_NONEXISTENT_KEY_12345".into();
        let result = read_api_key(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("API key not found"));
    }

    #[test]
    fn load_config_from_missing_file_is_io_error() {
        let err = load_config_from(Path::new("/definitely/not/here/icebreaker.toml"))
            .unwrap_err();
        assert!(matches!(err, IcebreakerError::Io { .. }));
    }
}
