//! DocSync - cross-document alignment analysis
//!
//! Aggregates product documents and ticket backlogs from the connected
//! sources and asks a language model where they disagree.
//!
//! Exit codes:
//!   0 - Success (score at or above --fail-below, or no --fail-below set)
//!   1 - Runtime error (config, workspace, store, unknown webhook source, etc.)
//!   2 - Alignment score below --fail-below

mod aggregator;
mod cli;
mod config;
mod detector;
mod llm;
mod models;
mod pipeline;
mod report;
mod sources;
mod store;
mod sync;

use anyhow::{Context, Result};
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use indicatif::{ProgressBar, ProgressStyle};
use models::SuggestionSummary;
use pipeline::{AlignmentPipeline, PipelineSettings};
use sources::Workspace;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use store::{AnalysisRecord, AnalysisStore, JsonlStore, MemoryStore};
use sync::{SyncError, SyncService, WebhookOutcome};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("DocSync v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Run failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .docsync.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE
        );
        std::process::exit(1);
    }

    std::fs::write(path, Config::default_toml())
        .with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to choose the model backend and analysis thresholds.");
    Ok(())
}

/// Install the global subscriber. `RUST_LOG` wins over the CLI flags.
fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level().to_string()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Dispatch the requested action. Returns the exit code.
async fn run(args: Args) -> Result<i32> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let workspace_path = config.general.workspace.clone();
    let mut workspace = Workspace::load(&workspace_path)
        .with_context(|| format!("Failed to load workspace {}", workspace_path.display()))?;

    if let Some(ref target) = args.connect {
        workspace
            .connect(target.kind, &target.id, args.doc_type)
            .with_context(|| format!("Failed to connect {}:{}", target.kind, target.id))?;
        workspace.save(&workspace_path)?;
        println!(
            "🔗 Connected {} {} ({} {} connection(s))",
            target.kind,
            target.id,
            workspace.connection_count(target.kind),
            target.kind
        );
    }

    let registry = Arc::new(workspace.build_registry());
    if registry.is_empty() {
        warn!("No sources connected; use --connect KIND:ID");
    } else {
        info!("{} source(s) registered", registry.len());
    }

    let store: Box<dyn AnalysisStore> = if args.collect_only {
        Box::new(MemoryStore::new())
    } else {
        let store = JsonlStore::new(&config.general.store);
        debug!("Analysis history: {}", store.path().display());
        Box::new(store)
    };

    let generator = llm::build_generator(&config.model)
        .context("Failed to initialize the generation backend")?;
    let model_name = generator.model_name().to_string();
    let pipeline = AlignmentPipeline::new(generator, PipelineSettings::from_config(&config));
    let service = SyncService::new(registry, pipeline, store);

    if args.collect_only {
        let snapshot = service
            .collect()
            .await
            .context("Failed to serialize snapshot")?;
        println!("{}", snapshot);
        return Ok(0);
    }

    if args.status {
        return handle_status(&service).await;
    }

    let start_time = Instant::now();

    let record = if let Some(ref path) = args.webhook {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read webhook payload {}", path.display()))?;
        let payload: serde_json::Value = serde_json::from_str(&content)
            .with_context(|| format!("Webhook payload is not JSON: {}", path.display()))?;

        let spinner = spinner(&args, "Processing webhook...");
        let outcome = service.handle_webhook(&payload).await;
        finish_spinner(spinner);

        match outcome? {
            WebhookOutcome::NoChanges => {
                println!("✅ Webhook processed: no changes detected, analysis skipped.");
                return Ok(0);
            }
            WebhookOutcome::Analyzed { changes, record } => {
                for scope in changes.scopes() {
                    if let Some(sections) = changes.get(*scope) {
                        println!(
                            "📝 {}: {} section change(s)",
                            scope,
                            sections.total()
                        );
                    }
                }
                record
            }
        }
    } else if let Some(ref target) = args.connect {
        let spinner = spinner(&args, "Analyzing alignment...");
        let record = service.on_connected(target.kind).await;
        finish_spinner(spinner);
        record?
    } else {
        let spinner = spinner(&args, "Analyzing alignment...");
        let record = service.manual_update().await;
        finish_spinner(spinner);

        match record {
            Ok(record) => record,
            Err(e @ SyncError::InsufficientContent { .. }) => {
                eprintln!("⚠️  {}", e);
                eprintln!("   Connect more sources with --connect KIND:ID.");
                return Ok(1);
            }
            Err(e) => return Err(e.into()),
        }
    };

    write_report(&args, &config, &record, &model_name)?;
    print_summary(&record, start_time.elapsed());

    if let Some(threshold) = args.fail_below {
        let score = record.result.analysis.alignment_score;
        if score < threshold {
            eprintln!(
                "\n⛔ Alignment score {} is below {}. Failing (exit code 2).",
                score, threshold
            );
            return Ok(2);
        }
    }

    Ok(0)
}

async fn handle_status(service: &SyncService) -> Result<i32> {
    let status = service.status().await?;
    let counts = status.counts;

    println!("📚 Connected content:");
    println!("   PRD sections:      {}", counts.prd);
    println!("   PRFAQ sections:    {}", counts.prfaq);
    println!("   Strategy sections: {}", counts.strategy);
    println!("   Tickets:           {}", counts.tickets);
    println!("   Document types:    {}", status.non_empty_slots);

    match status.latest() {
        Some(record) => {
            println!("\n🕒 Latest analysis:");
            println!(
                "   Date:    {}",
                record.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
            );
            println!("   Trigger: {}", record.trigger);
            println!("   Method:  {}", record.result.processing_method);
            println!("   API calls: {}", record.result.api_calls_used);
            println!("   Score:   {}/10", record.result.analysis.alignment_score);
        }
        None => println!("\n🕒 No analysis has been run yet."),
    }

    if status.recent.len() > 1 {
        println!("\n📈 Recent runs:");
        for record in status.recent.iter().rev() {
            println!(
                "   {}  {:>2}/10  {}",
                record.timestamp.format("%Y-%m-%d %H:%M"),
                record.result.analysis.alignment_score,
                record.trigger
            );
        }
    }

    Ok(0)
}

fn write_report(args: &Args, config: &Config, record: &AnalysisRecord, model: &str) -> Result<()> {
    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&record.result)?,
        OutputFormat::Markdown => report::generate_markdown_report(record, model),
    };

    let path = &config.general.output;
    std::fs::write(path, &output)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    println!("\n✅ Analysis complete! Report saved to: {}", path.display());
    Ok(())
}

fn print_summary(record: &AnalysisRecord, elapsed: Duration) {
    let result = &record.result;
    let summary = SuggestionSummary::from_suggestions(&result.analysis.suggestions);

    println!("\n📊 Alignment Summary:");
    println!("   Score: {}/10", result.analysis.alignment_score);
    println!(
        "   Method: {} ({} API call(s))",
        result.processing_method, result.api_calls_used
    );
    println!(
        "   Misalignments: {}",
        result.analysis.critical_misalignments.len()
    );
    println!(
        "   Suggestions: {} | 🔴 High: {} | 🟡 Medium: {} | 🟢 Low: {}",
        summary.total, summary.high, summary.medium, summary.low
    );
    if !result.enhancement_suggestions.is_empty() {
        println!(
            "   Enhancement hints: {}",
            result.enhancement_suggestions.len()
        );
    }
    println!("   Duration: {:.1}s", elapsed.as_secs_f64());

    if result.is_degraded() {
        warn!(
            "Analysis degraded to {}; check the generation backend",
            result.processing_method
        );
    }
}

fn spinner(args: &Args, message: &'static str) -> Option<ProgressBar> {
    if args.quiet {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed}] {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(120));
    Some(pb)
}

fn finish_spinner(spinner: Option<ProgressBar>) {
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
