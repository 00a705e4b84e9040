//! Command-line flags and their cross-field validation.

use crate::config::Provider;
use crate::models::{DocumentType, SourceKind};
use clap::Parser;
use std::path::PathBuf;
use std::str::FromStr;

/// DocSync - cross-document alignment analysis
///
/// Aggregates PRDs, PRFAQs, strategy docs and ticket backlogs from the
/// connected sources and asks a language model where they disagree.
///
/// Examples:
///   docsync
///   docsync --connect google_docs:checkout-prfaq
///   docsync --connect jira:PROJ
///   docsync --webhook payload.json --format json
///   docsync --collect-only
///   docsync --status
///   docsync --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Handle a webhook payload read from FILE
    ///
    /// The payload's `source` field names the source kind
    /// (google_docs, jira, linear, confluence).
    #[arg(long, value_name = "FILE", conflicts_with_all = ["connect", "collect_only", "status"])]
    pub webhook: Option<PathBuf>,

    /// Connect a source item, then analyze
    ///
    /// Example: --connect google_docs:checkout-prfaq or --connect jira:PROJ
    #[arg(long, value_name = "KIND:ID", conflicts_with_all = ["collect_only", "status"])]
    pub connect: Option<ConnectTarget>,

    /// Declared type of a connected document (prd, prfaq, strategy)
    ///
    /// Inferred from the document id when omitted.
    #[arg(long, value_name = "TYPE", requires = "connect")]
    pub doc_type: Option<DocumentType>,

    /// Print the unified snapshot without calling the model
    #[arg(long, conflicts_with = "status")]
    pub collect_only: bool,

    /// Show connected content and the latest analysis
    #[arg(long)]
    pub status: bool,

    /// Generate a default .docsync.toml configuration file
    #[arg(long)]
    pub init_config: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .docsync.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Connector workspace file
    #[arg(short, long, value_name = "FILE", env = "DOCSYNC_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Analysis history file (JSON lines)
    #[arg(long, value_name = "FILE", env = "DOCSYNC_STORE")]
    pub store: Option<PathBuf>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Generation backend
    #[arg(long, value_name = "PROVIDER", env = "DOCSYNC_PROVIDER")]
    pub provider: Option<Provider>,

    /// Model name
    #[arg(short, long, env = "CLAUDE_MODEL")]
    pub model: Option<String>,

    /// API base URL of the generation backend
    #[arg(long, value_name = "URL", env = "DOCSYNC_API_URL")]
    pub api_url: Option<String>,

    /// API key for the generation backend
    #[arg(long, env = "CLAUDE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Temperature for model responses (0.0 - 1.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Bounded wait per generation call, in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Allow the generate/critique/refine path. Overrides config file setting.
    #[arg(long, conflicts_with = "no_self_critique")]
    pub self_critique: bool,

    /// Always use a single analysis call. Overrides config file setting.
    #[arg(long, conflicts_with = "self_critique")]
    pub no_self_critique: bool,

    /// Fail if the alignment score is below SCORE
    ///
    /// Useful for CI pipelines. Exit code 2 when the score is lower.
    #[arg(long, value_name = "SCORE")]
    pub fail_below: Option<u8>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

/// `KIND:ID` argument of `--connect`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget {
    pub kind: SourceKind,
    pub id: String,
}

impl FromStr for ConnectTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| format!("Expected KIND:ID, got '{}'", s))?;

        let id = id.trim();
        if id.is_empty() {
            return Err("Connection id must not be empty".to_string());
        }

        Ok(Self {
            kind: kind.parse()?,
            id: id.to_string(),
        })
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref url) = self.api_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("API URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 1.0".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(score) = self.fail_below {
            if !(1..=10).contains(&score) {
                return Err("--fail-below must be between 1 and 10".to_string());
            }
        }

        if let Some(ref doc_type) = self.doc_type {
            let is_document = self
                .connect
                .as_ref()
                .is_some_and(|target| target.kind == SourceKind::GoogleDocs);
            if !is_document {
                return Err(format!(
                    "--doc-type {} only applies to google_docs connections",
                    doc_type
                ));
            }
        }

        if let Some(ref path) = self.webhook {
            if !path.is_file() {
                return Err(format!("Webhook payload not found: {}", path.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn make_args() -> Args {
        Args {
            webhook: None,
            connect: None,
            doc_type: None,
            collect_only: false,
            status: false,
            init_config: false,
            config: None,
            workspace: None,
            store: None,
            output: None,
            format: OutputFormat::Markdown,
            provider: None,
            model: None,
            api_url: None,
            api_key: None,
            temperature: None,
            timeout: None,
            self_critique: false,
            no_self_critique: false,
            fail_below: None,
            verbose: false,
            quiet: false,
        }
    }

    #[test]
    fn test_parse_connect_target() {
        let target: ConnectTarget = "google_docs:checkout-prfaq".parse().unwrap();
        assert_eq!(target.kind, SourceKind::GoogleDocs);
        assert_eq!(target.id, "checkout-prfaq");

        assert!("jira".parse::<ConnectTarget>().is_err());
        assert!("jira:".parse::<ConnectTarget>().is_err());
        assert!("slack:general".parse::<ConnectTarget>().is_err());
    }

    #[test]
    fn test_cli_parsing() {
        let args = Args::try_parse_from([
            "docsync",
            "--connect",
            "google_docs:launch",
            "--doc-type",
            "prfaq",
            "--fail-below",
            "6",
        ])
        .unwrap();

        assert_eq!(args.connect.as_ref().unwrap().id, "launch");
        assert_eq!(args.doc_type, Some(DocumentType::Prfaq));
        assert_eq!(args.fail_below, Some(6));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_doc_type_requires_connect() {
        assert!(Args::try_parse_from(["docsync", "--doc-type", "prd"]).is_err());
    }

    #[test]
    fn test_validation_doc_type_on_ticket_source() {
        let mut args = make_args();
        args.connect = Some("jira:PROJ".parse().unwrap());
        args.doc_type = Some(DocumentType::Prd);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_ranges() {
        let mut args = make_args();
        args.fail_below = Some(11);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.temperature = Some(1.5);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.timeout = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.api_url = Some("localhost:11434".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(), tracing::Level::ERROR);
    }
}
