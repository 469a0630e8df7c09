//! Binary entry point for corrlink.
//!
//! This binary provides the CLI interface for the correspondence linker.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI output
#![allow(clippy::print_stderr)]
#![allow(clippy::print_stdout)]
// Allow needless_pass_by_value for command functions
#![allow(clippy::needless_pass_by_value)]
// Allow multiple crate versions from transitive dependencies
#![allow(clippy::multiple_crate_versions)]

use anyhow::{anyhow, Context};
use chrono::DateTime;
use clap::{Parser, Subcommand};
use corrlink::config::CorrlinkConfig;
use corrlink::llm::build_classifier;
use corrlink::services::ReviewService;
use corrlink::storage::{DocumentSource, EntityCatalog, SqliteStore};
use corrlink::{DecisionAction, EntityCode, ResolutionService, SuggestionId};
use std::process::ExitCode;
use std::sync::Arc;

/// Corrlink - links inbound correspondence to the entities it concerns.
#[derive(Parser)]
#[command(name = "corrlink")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Run one resolution pass over unresolved documents.
    Run {
        /// Number of documents to process (defaults to the configured batch size).
        #[arg(short, long)]
        batch_size: Option<usize>,

        /// Skip the LLM tier; documents the cheap tiers cannot resolve stay
        /// unresolved.
        #[arg(long)]
        no_oracle: bool,
    },

    /// Work the review queue.
    Review {
        #[command(subcommand)]
        action: ReviewCommands,
    },

    /// Show learned patterns, strongest first.
    Patterns {
        /// Maximum patterns to show.
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Show store contents and link statistics.
    Status,

    /// Apply pending schema migrations and exit.
    Migrate,
}

/// Review queue commands.
#[derive(Subcommand)]
enum ReviewCommands {
    /// List pending suggestions, oldest first.
    List {
        /// Maximum suggestions to show.
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Decide one pending suggestion.
    Decide {
        /// The suggestion ID.
        id: String,

        /// The decision: approve, correct, reject, or skip.
        action: String,

        /// The corrected entity code (required for correct).
        #[arg(short, long)]
        entity: Option<String>,

        /// Who is deciding.
        #[arg(long, default_value = "cli")]
        actor: String,
    },

    /// Apply one action to many suggestions.
    Bulk {
        /// The decision: approve, reject, or skip.
        action: String,

        /// The suggestion IDs.
        #[arg(required = true)]
        ids: Vec<String>,

        /// Who is deciding.
        #[arg(long, default_value = "cli")]
        actor: String,
    },
}

/// Main entry point.
fn main() -> ExitCode {
    let cli = Cli::parse();

    corrlink::observability::init_logging(cli.verbose);

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        },
    };

    match run_command(cli, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Formats a Unix timestamp for display.
fn format_timestamp(seconds: u64) -> String {
    i64::try_from(seconds)
        .ok()
        .and_then(|s| DateTime::from_timestamp(s, 0))
        .map_or_else(|| "-".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string())
}

/// Runs the selected command.
fn run_command(cli: Cli, config: CorrlinkConfig) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run {
            batch_size,
            no_oracle,
        } => cmd_run(&config, batch_size, no_oracle),

        Commands::Review { action } => match action {
            ReviewCommands::List { limit } => cmd_review_list(&config, limit),
            ReviewCommands::Decide {
                id,
                action,
                entity,
                actor,
            } => cmd_review_decide(&config, &id, &action, entity, &actor),
            ReviewCommands::Bulk { action, ids, actor } => {
                cmd_review_bulk(&config, &action, &ids, &actor)
            },
        },

        Commands::Patterns { limit } => cmd_patterns(&config, limit),

        Commands::Status => cmd_status(&config),

        Commands::Migrate => cmd_migrate(&config),
    }
}

/// Loads configuration.
fn load_config(path: Option<&str>) -> anyhow::Result<CorrlinkConfig> {
    if let Some(config_path) = path {
        return CorrlinkConfig::load_from_file(std::path::Path::new(config_path))
            .with_context(|| format!("loading config from {config_path}"));
    }

    if let Ok(config_path) = std::env::var("CORRLINK_CONFIG_PATH") {
        if !config_path.trim().is_empty() {
            return CorrlinkConfig::load_from_file(std::path::Path::new(&config_path))
                .with_context(|| format!("loading config from {config_path}"));
        }
    }

    Ok(CorrlinkConfig::load_default())
}

/// Opens the store at the configured location.
fn open_store(config: &CorrlinkConfig) -> anyhow::Result<Arc<SqliteStore>> {
    let db_path = config.db_path();
    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("opening store at {}", db_path.display()))?;
    Ok(Arc::new(store))
}

/// Run command.
fn cmd_run(
    config: &CorrlinkConfig,
    batch_size: Option<usize>,
    no_oracle: bool,
) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let classifier = build_classifier(&config.llm);

    let resolution = ResolutionService::new(
        Arc::clone(&store),
        Arc::clone(&store) as Arc<dyn DocumentSource>,
        Arc::clone(&store) as Arc<dyn EntityCatalog>,
        classifier,
    )
    .with_strict_review(config.strict_review)
    .with_max_candidates(config.max_candidates);

    let batch_size = batch_size.unwrap_or(config.batch_size);
    let summary = resolution.run_resolution(batch_size, !no_oracle)?;

    println!("Resolution run complete:");
    println!("  Auto-linked:  {}", summary.auto_linked);
    println!("  Enqueued:     {}", summary.enqueued);
    println!("  Skipped:      {}", summary.skipped);
    println!("  Unresolved:   {}", summary.unresolved);
    println!("  Failed:       {}", summary.failed);
    println!("  Oracle calls: {}", summary.oracle_calls);
    println!("  Elapsed:      {}ms", summary.elapsed_ms);

    Ok(())
}

/// Review list command.
fn cmd_review_list(config: &CorrlinkConfig, limit: usize) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let review = ReviewService::new(Arc::clone(&store), Arc::clone(&store) as Arc<dyn EntityCatalog>);

    let pending = review.list_pending(limit)?;
    if pending.is_empty() {
        println!("No pending suggestions.");
        return Ok(());
    }

    println!("{} pending suggestion(s):", pending.len());
    println!();
    for suggestion in &pending {
        println!(
            "  {}  [{:.2}] {} -> {} ({}, {})",
            suggestion.id,
            suggestion.confidence,
            suggestion.document_id,
            suggestion.proposed_entity_code,
            suggestion.method,
            format_timestamp(suggestion.created_at),
        );
        println!("       {}", suggestion.evidence);
        println!();
    }

    Ok(())
}

/// Review decide command.
fn cmd_review_decide(
    config: &CorrlinkConfig,
    id: &str,
    action: &str,
    entity: Option<String>,
    actor: &str,
) -> anyhow::Result<()> {
    let action = DecisionAction::parse(action)
        .ok_or_else(|| anyhow!("unknown action '{action}' (approve, correct, reject, skip)"))?;

    let store = open_store(config)?;
    let review = ReviewService::new(Arc::clone(&store), Arc::clone(&store) as Arc<dyn EntityCatalog>);

    let decision = review.decide(
        &SuggestionId::new(id),
        action,
        entity.map(EntityCode::new),
        actor,
    )?;

    println!(
        "Suggestion {} is now {}.",
        decision.suggestion_id,
        decision.action.terminal_status()
    );
    if let Some(code) = decision.corrected_entity_code {
        println!("  Linked to {code} instead.");
    }

    Ok(())
}

/// Review bulk command.
fn cmd_review_bulk(
    config: &CorrlinkConfig,
    action: &str,
    ids: &[String],
    actor: &str,
) -> anyhow::Result<()> {
    let action = DecisionAction::parse(action)
        .ok_or_else(|| anyhow!("unknown action '{action}' (approve, reject, skip)"))?;

    let store = open_store(config)?;
    let review = ReviewService::new(Arc::clone(&store), Arc::clone(&store) as Arc<dyn EntityCatalog>);

    let ids: Vec<SuggestionId> = ids.iter().map(SuggestionId::new).collect();
    let summary = review.bulk_decide(&ids, action, actor)?;

    println!("Bulk review complete:");
    println!("  Decided:   {}", summary.decided);
    println!("  Conflicts: {}", summary.conflicts);
    println!("  Failed:    {}", summary.failed);

    Ok(())
}

/// Patterns command.
fn cmd_patterns(config: &CorrlinkConfig, limit: usize) -> anyhow::Result<()> {
    let store = open_store(config)?;

    let patterns = store.all_patterns(limit)?;
    if patterns.is_empty() {
        println!("No learned patterns yet.");
        return Ok(());
    }

    println!("{} learned pattern(s):", patterns.len());
    println!();
    for pattern in &patterns {
        println!(
            "  [{:.2}] {} '{}' -> {} ({} occurrence(s), last used {})",
            pattern.confidence,
            pattern.pattern_type,
            pattern.key,
            pattern.target_code,
            pattern.occurrences,
            format_timestamp(pattern.last_used),
        );
    }

    Ok(())
}

/// Status command.
fn cmd_status(config: &CorrlinkConfig) -> anyhow::Result<()> {
    let store = open_store(config)?;
    let status = store.status()?;

    println!("Corrlink Status");
    println!("===============");
    println!();
    println!("Version: {}", env!("CARGO_PKG_VERSION"));
    println!("Database: {}", config.db_path().display());
    println!();
    println!("Links: {}", status.links);
    for (method, count) in &status.links_by_method {
        println!("  {method}: {count}");
    }
    println!("Pending suggestions: {}", status.pending_suggestions);
    println!("Decided suggestions: {}", status.decided_suggestions);
    println!("Learned patterns: {}", status.patterns);
    println!("Skipped documents: {}", status.skipped_documents);

    Ok(())
}

/// Migrate command.
fn cmd_migrate(config: &CorrlinkConfig) -> anyhow::Result<()> {
    // Opening the store applies any pending migrations.
    let _store = open_store(config)?;
    println!("Schema is up to date at {}.", config.db_path().display());
    Ok(())
}
