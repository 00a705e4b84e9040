//! `.docsync.toml` loading, defaults and CLI overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".docsync.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Generation backend settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Alignment analysis settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Connector workspace file (connections and source content).
    #[serde(default = "default_workspace")]
    pub workspace: PathBuf,

    /// Analysis history, one JSON record per line.
    #[serde(default = "default_store")]
    pub store: PathBuf,

    /// Default report output path.
    #[serde(default = "default_output")]
    pub output: PathBuf,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            store: default_store(),
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_workspace() -> PathBuf {
    PathBuf::from("docsync_workspace.json")
}

fn default_store() -> PathBuf {
    PathBuf::from("docsync_history.jsonl")
}

fn default_output() -> PathBuf {
    PathBuf::from("docsync_report.md")
}

/// Which generation API to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Anthropic Messages API (default)
    #[default]
    Anthropic,
    /// Local Ollama server
    Ollama,
}

impl Provider {
    pub fn default_url(&self) -> &'static str {
        match self {
            Provider::Anthropic => "https://api.anthropic.com",
            Provider::Ollama => "http://localhost:11434",
        }
    }
}

/// Generation backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub provider: Provider,

    /// Model name passed to the backend.
    #[serde(default = "default_model")]
    pub name: String,

    /// API base URL. Defaults per provider when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// API key. Usually supplied through `CLAUDE_API_KEY` instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Bounded wait per generation call, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: Provider::default(),
            name: default_model(),
            api_url: None,
            api_key: None,
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl ModelConfig {
    pub fn effective_api_url(&self) -> &str {
        self.api_url
            .as_deref()
            .unwrap_or_else(|| self.provider.default_url())
            .trim_end_matches('/')
    }
}

fn default_model() -> String {
    "claude-3-sonnet-20240229".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_timeout() -> u64 {
    30
}

/// Alignment pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Allow the three-call generate/critique/refine path.
    #[serde(default = "default_true")]
    pub enable_self_critique: bool,

    /// Fewer total sections than this always use the simple path.
    #[serde(default = "default_simple_threshold")]
    pub simple_threshold: usize,

    /// Fewer non-empty slots than this use the simple path, and block manual updates.
    #[serde(default = "default_min_document_types")]
    pub min_document_types: usize,

    /// Output budget of the analysis and refine calls.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Output budget of the critique call.
    #[serde(default = "default_critique_max_tokens")]
    pub critique_max_tokens: u32,

    /// Snapshot characters embedded in the critique and refine prompts.
    #[serde(default = "default_context_excerpt_chars")]
    pub context_excerpt_chars: usize,

    /// Characters of each response kept in process details.
    #[serde(default = "default_detail_excerpt_chars")]
    pub detail_excerpt_chars: usize,

    /// Emit per-document enhancement hints.
    #[serde(default = "default_true")]
    pub suggest_enhancements: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            enable_self_critique: true,
            simple_threshold: default_simple_threshold(),
            min_document_types: default_min_document_types(),
            max_tokens: default_max_tokens(),
            critique_max_tokens: default_critique_max_tokens(),
            context_excerpt_chars: default_context_excerpt_chars(),
            detail_excerpt_chars: default_detail_excerpt_chars(),
            suggest_enhancements: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_simple_threshold() -> usize {
    5
}

fn default_min_document_types() -> usize {
    2
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_critique_max_tokens() -> u32 {
    1000
}

fn default_context_excerpt_chars() -> usize {
    2000
}

fn default_detail_excerpt_chars() -> usize {
    500
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given explicitly on the command line (or through their
    /// environment variables) override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref workspace) = args.workspace {
            self.general.workspace = workspace.clone();
        }
        if let Some(ref store) = args.store {
            self.general.store = store.clone();
        }
        if let Some(ref output) = args.output {
            self.general.output = output.clone();
        }

        if let Some(provider) = args.provider {
            self.model.provider = provider;
        }
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref api_url) = args.api_url {
            self.model.api_url = Some(api_url.clone());
        }
        if let Some(ref api_key) = args.api_key {
            self.model.api_key = Some(api_key.clone());
        }
        if let Some(temperature) = args.temperature {
            self.model.temperature = temperature;
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }

        if args.self_critique {
            self.analysis.enable_self_critique = true;
        } else if args.no_self_critique {
            self.analysis.enable_self_critique = false;
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
