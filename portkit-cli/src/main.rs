//! portkit: move workbench data in and out of a local store.
//!
//! Usage:
//!   portkit --owner alice export --preset config-only --out ./backups
//!   portkit --owner alice preview backup.json
//!   portkit --owner alice import backup.json --strategy keep-local
//!   portkit --owner alice stats
//!   portkit --owner alice clear ocr_cache_ --yes
//!
//! Data lives in a SQLite file (`--db`), partitioned by account.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use portkit_model::DataTypeRegistry;
use portkit_storage::SqliteStorage;
use portkit_sync::{
    CacheManager, DataScope, DiffReport, ExportPreset, ExportScope, Exporter, ImportOptions,
    Importer, MergeStrategy, PortabilityConfig, TracingProgress,
};
use portkit_types::OwnerId;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "portkit")]
#[command(about = "Export, import and merge workbench data")]
struct Args {
    /// Path to the SQLite store
    #[arg(long, default_value = "portkit.sqlite")]
    db: PathBuf,

    /// Account whose data to operate on
    #[arg(short, long)]
    owner: String,

    /// Optional JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write an export file
    Export {
        /// all, config-only, conversations-only, patent-cache-only or ocr-cache-only
        #[arg(long, default_value = "all")]
        preset: ExportPreset,

        /// Data type keys to leave out
        #[arg(long)]
        exclude: Vec<String>,

        /// Directory to write into
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Merge an export file into the store
    Import {
        file: PathBuf,

        /// smart, keep-local, keep-import or add-new
        #[arg(long, default_value = "smart")]
        strategy: MergeStrategy,

        /// Restrict to these data type keys
        #[arg(long)]
        only: Vec<String>,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show what an import would change, without writing
    Preview {
        file: PathBuf,

        /// Print the full report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Item counts and sizes per category
    Stats,

    /// Remove one data type, or every exportable type
    Clear {
        /// Data type key; omit to clear everything exportable
        type_key: Option<String>,

        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_target(false)
        .compact()
        .init();

    let config = match &args.config {
        Some(path) => PortabilityConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => PortabilityConfig::default(),
    };
    debug!("config: {:?}", config);

    let storage = SqliteStorage::open(&args.db)
        .with_context(|| format!("opening store {}", args.db.display()))?;
    let registry = Arc::new(DataTypeRegistry::builtin());
    let mut cache = CacheManager::new(registry.clone(), Arc::new(storage));
    cache.initialize(OwnerId::new(&args.owner).context("invalid --owner")?);

    match args.command {
        Command::Export { preset, exclude, out } => {
            let mut scope = ExportScope::preset(preset, &registry);
            scope.exclude.extend(exclude);
            std::fs::create_dir_all(&out).with_context(|| format!("creating {}", out.display()))?;

            let outcome = Exporter::new(&cache, &config).export_to_dir(&scope, &out)?;
            println!(
                "Exported {} items ({}) to {}",
                outcome.total_items,
                outcome.total_size,
                outcome.path.display()
            );
            println!("Checksum: {}", outcome.checksum);
        }

        Command::Import { file, strategy, only, json } => {
            let scope = if only.is_empty() {
                DataScope::everything()
            } else {
                DataScope::only(only)
            };
            let options = ImportOptions { strategy, scope };
            let progress = TracingProgress;
            let report = Importer::new(&cache, &config)
                .with_progress(&progress)
                .import_file(&file, &options)
                .await
                .with_context(|| format!("importing {}", file.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                for warning in &report.warnings {
                    warn!("{}", warning);
                }
                println!(
                    "Imported from {} ({}): {} added, {} updated, {} skipped, {} conflicts",
                    report.exported_by,
                    report.strategy,
                    report.merge.added,
                    report.merge.updated,
                    report.merge.skipped,
                    report.merge.conflicts
                );
                if !report.ignored_keys.is_empty() {
                    println!("Ignored {} unrecognised keys", report.ignored_keys.len());
                }
                if report.commit.failed > 0 {
                    println!(
                        "{} records failed to save: {}",
                        report.commit.failed,
                        report.commit.failed_keys.join(", ")
                    );
                }
            }
        }

        Command::Preview { file, json } => {
            let report = Importer::new(&cache, &config)
                .preview_file(&file, &ImportOptions::default())
                .await
                .with_context(|| format!("reading {}", file.display()))?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!(
                    "{} items exported by {} at {} (format {})",
                    report.item_count, report.exported_by, report.export_time, report.version
                );
                for warning in &report.warnings {
                    println!("warning: {warning}");
                }
                print_diff(&report.diff);
            }
        }

        Command::Stats => {
            let stats = cache.stats()?;
            for (category, s) in &stats.categories {
                println!("{:<16} {:>6} items  {:>10}", category.as_str(), s.items, s.size_display());
            }
            println!("{:<16} {:>6} items  {:>10}", "total", stats.total_items, stats.size_display());
        }

        Command::Clear { type_key, yes } => {
            if !yes {
                bail!("refusing to clear without --yes");
            }
            let removed = match type_key {
                Some(key) => cache.clear_data_type(&key)?,
                None => cache.clear_all_data()?,
            };
            info!("removed {} keys", removed);
            println!("Removed {removed} keys");
        }
    }

    Ok(())
}

fn print_diff(diff: &DiffReport) {
    let t = &diff.totals;
    println!(
        "{} new, {} newer, {} older, {} conflicting, {} unchanged, {} local only",
        t.added, t.newer, t.older, t.conflict, t.unchanged, t.local_only
    );
    for (category, counts) in &diff.categories {
        if counts.changes() > 0 {
            println!("  {:<16} {} changes", category.as_str(), counts.changes());
        }
    }
    if diff.is_noop() {
        println!("Importing would change nothing.");
    }
}
