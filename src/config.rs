//! Application configuration.
//!
//! Two layers, both built once at startup and passed by reference:
//! - [`AppConfig`]: settings captured from the process environment
//!   (data directory, default LLM provider, runtime environment).
//! - [`ModelConfig`]: the YAML model configuration file
//!   (`embedding_model.*`, `llm.<provider_key>.*`).
//!
//! Only the `from_env` / `load` constructors touch the environment; every
//! other component receives these values explicitly.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "estate-rag";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const ENV_DATA_DIR: &str = "ESTATE_DATA_STORAGE_PATH";
pub const ENV_CONFIG_PATH: &str = "CONFIG_PATH";
pub const ENV_LLM_PROVIDER: &str = "LLM_PROVIDER";
pub const ENV_RUNTIME: &str = "ENV";

pub const DEFAULT_PROVIDER_KEY: &str = "google";
pub const DEFAULT_TEMPERATURE: f32 = 0.2;
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;

/// Default config location, relative to the project root.
const DEFAULT_CONFIG_RELATIVE: &str = "config/config.yaml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Missing configuration value: {0}")]
    MissingValue(String),
}

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "estate_rag=info,warn"
}

/// Root directory of the project (where `config/` lives).
///
/// The current directory when it holds the default config, otherwise the
/// directory of the running executable. Falls back to the current directory.
pub fn project_root() -> PathBuf {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    select_project_root(cwd, exe_dir)
}

fn select_project_root(cwd: PathBuf, exe_dir: Option<PathBuf>) -> PathBuf {
    if cwd.join(DEFAULT_CONFIG_RELATIVE).is_file() {
        return cwd;
    }
    exe_dir
        .filter(|dir| dir.join(DEFAULT_CONFIG_RELATIVE).is_file())
        .unwrap_or(cwd)
}

/// Local vs production runtime. Local runs load a `.env` file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeEnvironment {
    Local,
    Production,
}

impl RuntimeEnvironment {
    fn from_value(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()) {
            Some(v) if v == "production" => Self::Production,
            _ => Self::Local,
        }
    }
}

/// Load `.env` for local runs.
///
/// Runs before logging is initialised, so it reports instead of logging:
/// the detected environment and whether a `.env` file was loaded.
pub fn load_dotenv() -> (RuntimeEnvironment, bool) {
    let env = RuntimeEnvironment::from_value(std::env::var(ENV_RUNTIME).ok().as_deref());
    (env, load_dotenv_for(env))
}

fn load_dotenv_for(env: RuntimeEnvironment) -> bool {
    match env {
        // A missing .env is normal outside development.
        RuntimeEnvironment::Local => dotenvy::dotenv().is_ok(),
        RuntimeEnvironment::Production => false,
    }
}

/// Environment-derived settings, captured once.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Explicit data directory from `ESTATE_DATA_STORAGE_PATH`, if set.
    pub data_dir: Option<PathBuf>,
    /// Provider key used when a caller does not name one.
    pub default_provider: String,
    /// Explicit config file path from `CONFIG_PATH`, if set.
    pub config_path: Option<PathBuf>,
    pub environment: RuntimeEnvironment,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            default_provider: DEFAULT_PROVIDER_KEY.to_string(),
            config_path: None,
            environment: RuntimeEnvironment::Local,
        }
    }
}

impl AppConfig {
    /// Snapshot the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup (used by tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            data_dir: non_empty(ENV_DATA_DIR).map(PathBuf::from),
            default_provider: non_empty(ENV_LLM_PROVIDER)
                .unwrap_or_else(|| DEFAULT_PROVIDER_KEY.to_string()),
            config_path: non_empty(ENV_CONFIG_PATH).map(PathBuf::from),
            environment: RuntimeEnvironment::from_value(lookup(ENV_RUNTIME).as_deref()),
        }
    }

    /// Session root for single-document analysis.
    pub fn analysis_data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| fallback_data_root().join("document_analysis"))
    }

    /// Session root for document comparison.
    pub fn comparison_data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| fallback_data_root().join("document_compare"))
    }
}

fn fallback_data_root() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("estate_data")
}

// ═══════════════════════════════════════════════════════════
// Model configuration file
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EmbeddingModelConfig {
    pub model_name: Option<String>,
}

/// One `llm.<provider_key>` block.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LlmProviderConfig {
    pub provider: Option<String>,
    pub model_name: Option<String>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
    /// Override for the provider's API endpoint.
    pub base_url: Option<String>,
    /// Per-request timeout. Absent means requests never time out.
    pub request_timeout_secs: Option<u64>,
}

impl LlmProviderConfig {
    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(DEFAULT_TEMPERATURE)
    }

    pub fn max_output_tokens(&self) -> u32 {
        self.max_output_tokens.unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS)
    }
}

/// Parsed model configuration file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub embedding_model: Option<EmbeddingModelConfig>,
    #[serde(default)]
    pub llm: BTreeMap<String, LlmProviderConfig>,
}

impl ModelConfig {
    /// Load the config file.
    ///
    /// Priority: explicit argument, then `CONFIG_PATH` (as captured in
    /// `app`), then `<project_root>/config/config.yaml`. Relative paths
    /// resolve against the project root.
    pub fn load(explicit: Option<&Path>, app: &AppConfig) -> Result<Self, ConfigError> {
        let path = resolve_config_path(explicit, app.config_path.as_deref(), &project_root());
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }

        let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_yaml_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;

        tracing::info!(
            path = %path.display(),
            providers = ?config.llm.keys().collect::<Vec<_>>(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Parse YAML text. An empty document yields the default config.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, serde_yaml::Error> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
    }

    pub fn provider(&self, key: &str) -> Option<&LlmProviderConfig> {
        self.llm.get(key)
    }

    pub fn embedding_model_name(&self) -> Result<&str, ConfigError> {
        self.embedding_model
            .as_ref()
            .and_then(|e| e.model_name.as_deref())
            .ok_or_else(|| ConfigError::MissingValue("embedding_model.model_name".into()))
    }
}

fn resolve_config_path(explicit: Option<&Path>, from_env: Option<&Path>, root: &Path) -> PathBuf {
    let chosen = explicit
        .or(from_env)
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_RELATIVE));
    if chosen.is_absolute() {
        chosen
    } else {
        root.join(chosen)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
embedding_model:
  model_name: "models/text-embedding-004"
llm:
  groq:
    provider: "groq"
    model_name: "deepseek-r1-distill-llama-70b"
    temperature: 0
    max_output_tokens: 2048
  google:
    provider: "google"
    model_name: "gemini-2.0-flash"
"#;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let owned: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| owned.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    #[test]
    fn app_name_is_estate_rag() {
        assert_eq!(APP_NAME, "estate-rag");
    }

    #[test]
    fn parses_provider_blocks() {
        let config = ModelConfig::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(config.llm.len(), 2);
        let groq = config.provider("groq").unwrap();
        assert_eq!(groq.provider.as_deref(), Some("groq"));
        assert_eq!(groq.temperature(), 0.0);
        assert_eq!(
            config.embedding_model_name().unwrap(),
            "models/text-embedding-004"
        );
    }

    #[test]
    fn missing_numeric_fields_use_defaults() {
        let config = ModelConfig::from_yaml_str(SAMPLE).unwrap();
        let google = config.provider("google").unwrap();
        assert!((google.temperature() - DEFAULT_TEMPERATURE).abs() < f32::EPSILON);
        assert_eq!(google.max_output_tokens(), DEFAULT_MAX_OUTPUT_TOKENS);
        assert!(google.request_timeout_secs.is_none());
    }

    #[test]
    fn empty_yaml_is_default_config() {
        let config = ModelConfig::from_yaml_str("  \n").unwrap();
        assert!(config.llm.is_empty());
        assert!(matches!(
            config.embedding_model_name(),
            Err(ConfigError::MissingValue(_))
        ));
    }

    #[test]
    fn explicit_path_wins_over_env() {
        let root = Path::new("/srv/estate");
        let path = resolve_config_path(
            Some(Path::new("/etc/explicit.yaml")),
            Some(Path::new("/etc/env.yaml")),
            root,
        );
        assert_eq!(path, PathBuf::from("/etc/explicit.yaml"));
    }

    #[test]
    fn env_path_used_when_no_explicit_path() {
        let root = Path::new("/srv/estate");
        let path = resolve_config_path(None, Some(Path::new("conf/alt.yaml")), root);
        assert_eq!(path, PathBuf::from("/srv/estate/conf/alt.yaml"));
    }

    #[test]
    fn default_path_is_under_project_root() {
        let root = Path::new("/srv/estate");
        let path = resolve_config_path(None, None, root);
        assert_eq!(path, PathBuf::from("/srv/estate/config/config.yaml"));
    }

    #[test]
    fn load_reads_file_from_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = ModelConfig::load(Some(&path), &AppConfig::default()).unwrap();
        assert!(config.provider("google").is_some());
    }

    #[test]
    fn production_never_loads_dotenv() {
        assert!(!load_dotenv_for(RuntimeEnvironment::Production));
    }

    #[test]
    fn project_root_prefers_cwd_with_config() {
        let cwd = tempfile::tempdir().unwrap();
        let exe = tempfile::tempdir().unwrap();
        for dir in [cwd.path(), exe.path()] {
            std::fs::create_dir_all(dir.join("config")).unwrap();
            std::fs::write(dir.join(DEFAULT_CONFIG_RELATIVE), "llm: {}").unwrap();
        }
        let root = select_project_root(cwd.path().to_path_buf(), Some(exe.path().to_path_buf()));
        assert_eq!(root, cwd.path());
    }

    #[test]
    fn project_root_falls_back_to_executable_dir() {
        let cwd = tempfile::tempdir().unwrap();
        let exe = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(exe.path().join("config")).unwrap();
        std::fs::write(exe.path().join(DEFAULT_CONFIG_RELATIVE), "llm: {}").unwrap();

        let root = select_project_root(cwd.path().to_path_buf(), Some(exe.path().to_path_buf()));
        assert_eq!(root, exe.path());
    }

    #[test]
    fn project_root_without_config_is_cwd() {
        let cwd = tempfile::tempdir().unwrap();
        let exe = tempfile::tempdir().unwrap();
        let root = select_project_root(cwd.path().to_path_buf(), Some(exe.path().to_path_buf()));
        assert_eq!(root, cwd.path());
    }

    #[test]
    fn bundled_config_loads_by_default() {
        let config = ModelConfig::load(None, &AppConfig::default()).unwrap();
        assert!(config.provider(DEFAULT_PROVIDER_KEY).is_some());
        assert!(config.embedding_model_name().is_ok());
    }

    #[test]
    fn load_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");
        let err = ModelConfig::load(Some(&path), &AppConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(p) if p == path));
    }

    #[test]
    fn load_invalid_yaml_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "llm: [unclosed").unwrap();
        let err = ModelConfig::load(Some(&path), &AppConfig::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn app_config_reads_lookup() {
        let app = AppConfig::from_lookup(lookup_from(&[
            (ENV_DATA_DIR, "/data/estate"),
            (ENV_LLM_PROVIDER, "groq"),
            (ENV_RUNTIME, "Production"),
        ]));
        assert_eq!(app.data_dir, Some(PathBuf::from("/data/estate")));
        assert_eq!(app.default_provider, "groq");
        assert_eq!(app.environment, RuntimeEnvironment::Production);
        assert_eq!(app.analysis_data_dir(), PathBuf::from("/data/estate"));
    }

    #[test]
    fn app_config_defaults_when_env_empty() {
        let app = AppConfig::from_lookup(lookup_from(&[(ENV_LLM_PROVIDER, "  ")]));
        assert_eq!(app.default_provider, DEFAULT_PROVIDER_KEY);
        assert_eq!(app.environment, RuntimeEnvironment::Local);
        assert!(app.analysis_data_dir().ends_with("estate_data/document_analysis"));
        assert!(app.comparison_data_dir().ends_with("estate_data/document_compare"));
    }
}
