//! Application configuration for Shearwater.
//!
//! User config lives at `~/.shearwater/shearwater.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShearwaterError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "shearwater.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".shearwater";

// ---------------------------------------------------------------------------
// Config structs (matching shearwater.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Blog platform connection.
    #[serde(default)]
    pub platform: PlatformConfig,

    /// Answer pipeline tuning.
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Moderation policy.
    #[serde(default)]
    pub moderation: ModerationConfig,

    /// Inference worker invocation.
    #[serde(default)]
    pub worker: WorkerConfig,
}

/// `[platform]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// API root, e.g. `https://api.tumblr.com`.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Blog identifier whose asks are answered.
    #[serde(default)]
    pub blog: String,

    /// Name of the env var holding the API token (never store the token itself).
    #[serde(default = "default_api_token_env")]
    pub api_token_env: String,

    /// Page size for draft pagination.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            blog: String::new(),
            api_token_env: default_api_token_env(),
            page_size: default_page_size(),
        }
    }
}

fn default_base_url() -> String {
    "https://api.tumblr.com".into()
}
fn default_api_token_env() -> String {
    "SHEARWATER_API_TOKEN".into()
}
fn default_page_size() -> u32 {
    50
}

/// `[pipeline]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Extractive QA model identifier handed to the worker.
    #[serde(default = "default_model_id")]
    pub model_id: String,

    /// Path to the knowledge corpus (plain UTF-8 text).
    #[serde(default = "default_corpus_path")]
    pub corpus_path: String,

    /// Maximum corpus window length in characters; 0 means unbounded.
    #[serde(default = "default_max_window_len")]
    pub max_window_len: usize,

    /// Maximum inference attempts before giving up on a question.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Minimum accepted answer length in words; 0 disables the check.
    #[serde(default)]
    pub min_answer_words: usize,

    /// Accept submissions that carry non-text content blocks.
    #[serde(default)]
    pub include_media: bool,

    /// Case-insensitive substring a question must contain; empty disables.
    #[serde(default)]
    pub required_keyword: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_id: default_model_id(),
            corpus_path: default_corpus_path(),
            max_window_len: default_max_window_len(),
            max_attempts: default_max_attempts(),
            min_answer_words: 0,
            include_media: false,
            required_keyword: String::new(),
        }
    }
}

fn default_model_id() -> String {
    "distilbert-base-cased-distilled-squad".into()
}
fn default_corpus_path() -> String {
    "corpus.txt".into()
}
fn default_max_window_len() -> usize {
    10_000
}
fn default_max_attempts() -> u32 {
    5
}

/// `[moderation]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    /// Strategy: "denylist" or "service".
    #[serde(default = "default_moderation_mode")]
    pub mode: String,

    /// Banned terms for the denylist strategy (case-insensitive).
    #[serde(default)]
    pub banned_terms: Vec<String>,

    /// Endpoint for the external moderation service strategy.
    #[serde(default)]
    pub service_url: String,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            mode: default_moderation_mode(),
            banned_terms: Vec::new(),
            service_url: String::new(),
        }
    }
}

fn default_moderation_mode() -> String {
    "denylist".into()
}

/// `[worker]` section — how the isolated inference worker is invoked.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Worker command (e.g., "node").
    #[serde(default = "default_worker_cmd")]
    pub cmd: String,

    /// Worker script path passed as the first argument; empty for none.
    #[serde(default = "default_worker_script")]
    pub script: String,

    /// Working directory for the worker subprocess.
    #[serde(default = "default_worker_dir")]
    pub working_dir: String,

    /// Per-invocation timeout in seconds.
    #[serde(default = "default_worker_timeout")]
    pub timeout_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            cmd: default_worker_cmd(),
            script: default_worker_script(),
            working_dir: default_worker_dir(),
            timeout_secs: default_worker_timeout(),
        }
    }
}

fn default_worker_cmd() -> String {
    "node".into()
}
fn default_worker_script() -> String {
    "worker/answer.js".into()
}
fn default_worker_dir() -> String {
    ".".into()
}
fn default_worker_timeout() -> u64 {
    300
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.shearwater/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| ShearwaterError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.shearwater/shearwater.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| ShearwaterError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| ShearwaterError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| ShearwaterError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| ShearwaterError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ShearwaterError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Resolve the platform API token from the configured env var.
pub fn resolve_api_token(config: &AppConfig) -> Result<String> {
    let var_name = &config.platform.api_token_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(val),
        _ => Err(ShearwaterError::config(format!(
            "platform API token not found. Set the {var_name} environment variable."
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
        assert!(toml_str.contains("base_url"));
        assert!(toml_str.contains("SHEARWATER_API_TOKEN"));
        assert!(toml_str.contains("max_window_len"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.pipeline.max_window_len, 10_000);
        assert_eq!(parsed.pipeline.max_attempts, 5);
        assert_eq!(parsed.moderation.mode, "denylist");
        assert_eq!(parsed.platform.page_size, 50);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[platform]
blog = "tide-answers"

[moderation]
banned_terms = ["mildew", "rust"]
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.platform.blog, "tide-answers");
        assert_eq!(config.platform.base_url, "https://api.tumblr.com");
        assert_eq!(config.moderation.banned_terms.len(), 2);
        assert_eq!(config.pipeline.max_attempts, 5);
        assert_eq!(config.worker.timeout_secs, 300);
    }

    #[test]
    fn api_token_resolution() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.platform.api_token_env = "SHEARWATER_TEST_NONEXISTENT_TOKEN_9921".into();
        let result = resolve_api_token(&config);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("token not found"));
    }
}
