//! Recollect CLI
//!
//! Command-line interface for saving, searching and maintaining memories.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use colored::Colorize;
use recollect_core::{
    CascadeSearch, ConsolidationSweep, EmotionCategory, Memory, MemoryStore, ReviewCalculator,
    ReviewDispatcher, SaveInput, SearchQuery, Storage,
};
use recollect_daemon::{ConsoleMessenger, DaemonConfig};
use serde::Serialize;

/// Recollect - personal memory with spaced review
#[derive(Parser)]
#[command(name = "recollect")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CLI for the Recollect memory engine")]
struct Cli {
    /// Database path (overrides RECOLLECT_DB_PATH)
    #[arg(long, global = true)]
    db_path: Option<PathBuf>,

    /// Owner the command acts for
    #[arg(long, global = true, env = "RECOLLECT_OWNER_ID", default_value_t = 1)]
    owner: i64,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a new memory
    Save {
        /// Note text; hashtags become tags
        content: String,
        /// Channel reviews are delivered to
        #[arg(long, default_value_t = 1)]
        channel: i64,
        /// Origin label
        #[arg(long, default_value = "cli")]
        source: String,
    },

    /// Search memories with the keyword cascade
    Search {
        /// Keywords, hashtags and time cues ("coffee yesterday morning")
        #[arg(required = true)]
        query: Vec<String>,
        #[arg(long, default_value_t = 10)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
    },

    /// Show the newest memories
    Recent {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Show memory statistics
    Stats,

    /// Delete one of your memories
    Delete {
        /// Memory id
        id: String,
    },

    /// Run one consolidation sweep now
    Consolidate,

    /// Run one review dispatch tick, printing sessions here
    Review,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = DaemonConfig::from_env().context("Invalid configuration")?;
    if cli.db_path.is_some() {
        config.db_path = cli.db_path.clone();
    }
    let storage = Arc::new(
        Storage::new(config.db_path.clone()).context("Could not open the memory database")?,
    );
    let out = Output { json: cli.json };

    match cli.command {
        Commands::Save {
            content,
            channel,
            source,
        } => run_save(&storage, &out, SaveInput::new(cli.owner, channel, content).with_source(source)),
        Commands::Search {
            query,
            limit,
            offset,
        } => run_search(&storage, &out, cli.owner, &query.join(" "), limit, offset),
        Commands::Recent { limit } => run_recent(&storage, &out, cli.owner, limit),
        Commands::Stats => run_stats(&storage, &out, cli.owner, &config),
        Commands::Delete { id } => run_delete(&storage, &out, cli.owner, &id),
        Commands::Consolidate => run_consolidate(storage, &out, &config),
        Commands::Review => run_review(storage, &config).await,
    }
}

struct Output {
    json: bool,
}

impl Output {
    fn print_json<T: Serialize>(&self, value: &T) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

/// Run save command
fn run_save(storage: &Storage, out: &Output, input: SaveInput) -> anyhow::Result<()> {
    let memory = storage.save(input)?;
    if out.json {
        return out.print_json(&memory);
    }

    let emotion = EmotionCategory::from_weight(memory.emotional_weight);
    println!("{}", "Memory saved".green().bold());
    println!("{}: {}", "ID".white().bold(), memory.id);
    println!("{}: {} ({:.2})", "Emotion".white().bold(), emotion, memory.emotional_weight);
    if !memory.tags.is_empty() {
        println!("{}: {}", "Tags".white().bold(), memory.tags.join(", "));
    }
    println!("{}: {}", "Context".white().bold(), memory.encoding_context().describe());
    let calculator = ReviewCalculator::new();
    println!(
        "{}: {}",
        "First Review".white().bold(),
        calculator.describe_next_review(&memory, Utc::now())
    );
    Ok(())
}

/// Run search command
fn run_search(
    storage: &Arc<Storage>,
    out: &Output,
    owner: i64,
    keyword: &str,
    limit: usize,
    offset: usize,
) -> anyhow::Result<()> {
    let search = CascadeSearch::new(storage.clone());
    let query = SearchQuery::new(owner, keyword)
        .with_limit(limit)
        .with_offset(offset);
    let page = search.search_page(&query);
    if out.json {
        return out.print_json(&page);
    }

    match page.strategy {
        Some(strategy) => println!(
            "{} {} {}",
            format!("{} result(s)", page.results.len()).cyan().bold(),
            "via".dimmed(),
            strategy.as_str().dimmed()
        ),
        None => {
            println!("{}", "No memories found.".dimmed());
            return Ok(());
        }
    }
    println!();
    for ranked in &page.results {
        print_memory(&ranked.memory);
        println!("  {} {:.3}", "score".dimmed(), ranked.score);
    }
    if page.has_more {
        println!();
        println!(
            "{}",
            format!("More results: --offset {}", offset + page.results.len()).yellow()
        );
    }
    Ok(())
}

/// Run recent command
fn run_recent(storage: &Storage, out: &Output, owner: i64, limit: usize) -> anyhow::Result<()> {
    let memories = storage.recent(owner, limit)?;
    if out.json {
        return out.print_json(&memories);
    }
    if memories.is_empty() {
        println!("{}", "No memories found.".dimmed());
        return Ok(());
    }
    for memory in &memories {
        print_memory(memory);
    }
    Ok(())
}

/// Run stats command
fn run_stats(
    storage: &Storage,
    out: &Output,
    owner: i64,
    config: &DaemonConfig,
) -> anyhow::Result<()> {
    let calculator = ReviewCalculator::with_config(config.review_schedule.clone());
    let stats = storage.stats(owner, &calculator, Utc::now())?;
    let last_sweep = storage.last_consolidation()?;
    if out.json {
        return out.print_json(&serde_json::json!({
            "stats": stats,
            "lastConsolidation": last_sweep,
        }));
    }

    println!("{}", "=== Recollect Memory Statistics ===".cyan().bold());
    println!();
    println!("{}: {}", "Total Memories".white().bold(), stats.total_memories);
    println!("{}: {}", "Due for Review".white().bold(), stats.due_for_review);
    println!("{}: {}", "Fragile".white().bold(), stats.fragile);
    println!(
        "{}: {:.2}",
        "Average Emotional Weight".white().bold(),
        stats.average_emotional_weight
    );
    if let Some(oldest) = stats.oldest_memory {
        println!("{}: {}", "Oldest Memory".white().bold(), oldest.with_timezone(&Local).format("%Y-%m-%d %H:%M"));
    }
    if let Some(newest) = stats.newest_memory {
        println!("{}: {}", "Newest Memory".white().bold(), newest.with_timezone(&Local).format("%Y-%m-%d %H:%M"));
    }
    match last_sweep {
        Some(sweep) => println!(
            "{}: {} ({} boosted, {} expired)",
            "Last Consolidation".white().bold(),
            sweep.completed_at.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
            sweep.memories_boosted,
            sweep.boosts_expired
        ),
        None => println!("{}: {}", "Last Consolidation".white().bold(), "never".dimmed()),
    }
    Ok(())
}

/// Run delete command
fn run_delete(storage: &Storage, out: &Output, owner: i64, id: &str) -> anyhow::Result<()> {
    storage
        .delete(id, owner)
        .with_context(|| format!("Could not delete memory {id}"))?;
    if out.json {
        return out.print_json(&serde_json::json!({ "deleted": id }));
    }
    println!("{} {}", "Deleted".green().bold(), id);
    Ok(())
}

/// Run consolidation sweep
fn run_consolidate(
    storage: Arc<Storage>,
    out: &Output,
    config: &DaemonConfig,
) -> anyhow::Result<()> {
    let sweep = ConsolidationSweep::new(storage).with_config(config.consolidation.clone());
    let report = sweep.run(Utc::now());
    if out.json {
        return out.print_json(&report);
    }

    println!("{}", "=== Recollect Consolidation ===".cyan().bold());
    println!();
    println!("{}: {}", "Memories Examined".white().bold(), report.memories_examined);
    println!("{}: {}", "Memories Boosted".white().bold(), report.memories_boosted);
    println!("{}: {}", "Boosts Expired".white().bold(), report.boosts_expired);
    if report.failures > 0 {
        println!("{}: {}", "Failures".red().bold(), report.failures);
    }
    println!("{}: {}ms", "Duration".white().bold(), report.duration_ms);
    Ok(())
}

/// Run one dispatch tick against the console
async fn run_review(storage: Arc<Storage>, config: &DaemonConfig) -> anyhow::Result<()> {
    let calculator = ReviewCalculator::with_config(config.review_schedule.clone());
    let dispatcher = ReviewDispatcher::new(storage, ConsoleMessenger::stdout(), calculator)
        .with_config(config.dispatch.clone());
    let report = dispatcher.run_once(Utc::now()).await;

    if report.owners == 0 {
        println!("{}", "Nothing is due for review.".dimmed());
    } else {
        println!();
        println!(
            "{}",
            format!(
                "Review complete: {} delivered, {} deferred, {} failed",
                report.delivered, report.deferred, report.failed
            )
            .green()
        );
    }
    Ok(())
}

fn print_memory(memory: &Memory) {
    println!(
        "{} {}",
        memory.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string().dimmed(),
        memory.content
    );
    println!(
        "  {} {}  {} {}",
        "id".dimmed(),
        memory.id,
        "context".dimmed(),
        memory.encoding_context().describe()
    );
}
