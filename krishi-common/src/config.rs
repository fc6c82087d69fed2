//! Bootstrap configuration and root folder resolution
//!
//! Configuration is read once at startup and never reloaded. Sources, highest
//! priority first:
//! 1. Command-line arguments (`--config`, `--root-folder`)
//! 2. Environment variables (`KRISHI_CONFIG`, `KRISHI_ROOT_FOLDER`, provider secrets)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)
//!
//! A missing TOML file is not an error: the service logs a warning and starts
//! with defaults.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Environment variable naming an explicit TOML config file
pub const CONFIG_ENV_VAR: &str = "KRISHI_CONFIG";

/// Environment variable overriding the root (data) folder
pub const ROOT_FOLDER_ENV_VAR: &str = "KRISHI_ROOT_FOLDER";

/// Environment variable holding the Hugging Face access token
pub const HF_TOKEN_ENV_VAR: &str = "KRISHI_HF_TOKEN";

/// Environment variable holding the Gemini API key
pub const GEMINI_KEY_ENV_VAR: &str = "KRISHI_GEMINI_API_KEY";

/// Database file name inside the root folder
pub const DATABASE_FILE_NAME: &str = "krishi.db";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Socket address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Data folder holding the scan history database
    #[serde(default)]
    pub root_folder: Option<PathBuf>,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Inference provider configuration
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            root_folder: None,
            logging: LoggingConfig::default(),
            providers: ProvidersConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stdout if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// Provider selection and shared attempt policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvidersConfig {
    /// Provider identifiers in the order they are tried
    #[serde(default = "default_priority")]
    pub priority: Vec<String>,

    /// Delay before the single retry allowed for a warming-up provider
    #[serde(default = "default_warmup_retry_delay_ms")]
    pub warmup_retry_delay_ms: u64,

    /// Upper bound on a single provider attempt, including its retry
    #[serde(default = "default_attempt_timeout_ms")]
    pub attempt_timeout_ms: u64,

    #[serde(default)]
    pub local: LocalModelConfig,

    #[serde(default)]
    pub huggingface: HuggingFaceConfig,

    #[serde(default)]
    pub gemini: GeminiConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            priority: default_priority(),
            warmup_retry_delay_ms: default_warmup_retry_delay_ms(),
            attempt_timeout_ms: default_attempt_timeout_ms(),
            local: LocalModelConfig::default(),
            huggingface: HuggingFaceConfig::default(),
            gemini: GeminiConfig::default(),
        }
    }
}

/// Local ONNX model artifacts
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LocalModelConfig {
    /// Path to the `.onnx` classifier
    #[serde(default)]
    pub model_path: Option<PathBuf>,

    /// Path to the labels file (one label per line, output index order)
    #[serde(default)]
    pub labels_path: Option<PathBuf>,
}

impl LocalModelConfig {
    /// Both artifacts configured and present on disk
    pub fn artifacts_present(&self) -> bool {
        match (&self.model_path, &self.labels_path) {
            (Some(model), Some(labels)) => model.is_file() && labels.is_file(),
            _ => false,
        }
    }
}

/// Hugging Face Inference API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HuggingFaceConfig {
    /// Access token (`KRISHI_HF_TOKEN` takes precedence)
    #[serde(default)]
    pub token: Option<String>,

    #[serde(default = "default_hf_model")]
    pub model: String,

    #[serde(default = "default_hf_base_url")]
    pub base_url: String,

    #[serde(default = "default_remote_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for HuggingFaceConfig {
    fn default() -> Self {
        Self {
            token: None,
            model: default_hf_model(),
            base_url: default_hf_base_url(),
            timeout_ms: default_remote_timeout_ms(),
        }
    }
}

/// Gemini `generateContent` settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// API key (`KRISHI_GEMINI_API_KEY` takes precedence)
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_gemini_model")]
    pub model: String,

    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,

    #[serde(default = "default_remote_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_gemini_model(),
            base_url: default_gemini_base_url(),
            timeout_ms: default_remote_timeout_ms(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1:8000".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_priority() -> Vec<String> {
    vec![
        "local".to_string(),
        "huggingface".to_string(),
        "gemini".to_string(),
    ]
}

fn default_warmup_retry_delay_ms() -> u64 {
    2000
}

fn default_attempt_timeout_ms() -> u64 {
    30_000
}

fn default_remote_timeout_ms() -> u64 {
    15_000
}

fn default_hf_model() -> String {
    "linkanjarad/mobilenet_v2_1.0_224-plant-disease-identification".to_string()
}

fn default_hf_base_url() -> String {
    "https://api-inference.huggingface.co/models".to_string()
}

fn default_gemini_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

impl TomlConfig {
    /// Load configuration following CLI → ENV → platform path priority
    ///
    /// An explicitly named file (CLI or `KRISHI_CONFIG`) must exist and parse.
    /// When only the platform default location is consulted, a missing file
    /// yields built-in defaults.
    pub fn load(cli_path: Option<&Path>) -> Result<Self> {
        Self::load_from(config_path(cli_path).as_deref())
    }

    /// Load `path`, or built-in defaults when there is none
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => load_toml_config(path),
            None => Ok(Self::default()),
        }
    }

    /// Hugging Face token after ENV → TOML resolution
    pub fn huggingface_token(&self) -> Option<String> {
        resolve_secret(HF_TOKEN_ENV_VAR, self.providers.huggingface.token.as_deref())
    }

    /// Gemini API key after ENV → TOML resolution
    pub fn gemini_api_key(&self) -> Option<String> {
        resolve_secret(GEMINI_KEY_ENV_VAR, self.providers.gemini.api_key.as_deref())
    }
}

/// Configuration file to read, following CLI → ENV → platform path priority
///
/// Explicit paths are returned whether or not they exist. `None` means no
/// file was named and none was found at the platform locations.
pub fn config_path(cli_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_path {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path()
}

/// Read and parse a TOML configuration file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
    Ok(config)
}

/// First existing platform config file, if any
fn default_config_path() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("krishi").join("krishi.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(unix) {
        let system_config = PathBuf::from("/etc/krishi/krishi.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Resolve a secret from an environment variable, then a TOML value
///
/// Blank or whitespace-only values count as absent.
pub fn resolve_secret(env_var: &str, toml_value: Option<&str>) -> Option<String> {
    if let Ok(value) = std::env::var(env_var) {
        if is_valid_key(&value) {
            return Some(value.trim().to_string());
        }
    }

    toml_value
        .filter(|v| is_valid_key(v))
        .map(|v| v.trim().to_string())
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Root folder resolution: CLI → `KRISHI_ROOT_FOLDER` → TOML → OS default
pub struct RootFolderResolver<'a> {
    cli_arg: Option<&'a Path>,
    toml_root: Option<&'a Path>,
}

impl<'a> RootFolderResolver<'a> {
    pub fn new(cli_arg: Option<&'a Path>, toml_root: Option<&'a Path>) -> Self {
        Self { cli_arg, toml_root }
    }

    pub fn resolve(&self) -> PathBuf {
        if let Some(path) = self.cli_arg {
            return path.to_path_buf();
        }

        if let Ok(path) = std::env::var(ROOT_FOLDER_ENV_VAR) {
            if !path.trim().is_empty() {
                return PathBuf::from(path);
            }
        }

        if let Some(path) = self.toml_root {
            return path.to_path_buf();
        }

        default_root_folder()
    }
}

/// Get OS-dependent default root folder path
pub fn default_root_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("krishi"))
        .unwrap_or_else(|| PathBuf::from("./krishi_data"))
}

/// Creates the root folder and derives file locations inside it
pub struct RootFolderInitializer {
    root: PathBuf,
}

impl RootFolderInitializer {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Create the root folder if missing (idempotent)
    pub fn ensure_directory_exists(&self) -> Result<()> {
        if !self.root.exists() {
            info!("Creating root folder: {}", self.root.display());
        }
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.root.join(DATABASE_FILE_NAME)
    }

    pub fn database_exists(&self) -> bool {
        self.database_path().exists()
    }
}
