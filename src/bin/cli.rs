//! OSRS Tracker CLI
//!
//! Local entry point for building the progress timeline and maintaining
//! the snapshot store.

use std::path::PathBuf;

use chrono::{Local, Utc};
use clap::{Parser, Subcommand};
use osrs_tracker::{
    error::{AppError, Result},
    models::{AchievementEvent, Config},
    pipeline::{self, EventSummary},
    storage::{LocalStorage, SnapshotStore},
};

/// osrs-tracker - Old School RuneScape progress tracker
#[derive(Parser, Debug)]
#[command(
    name = "tracker",
    version,
    about = "Detects progress events from stored player snapshots"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "tracker.toml", global = true)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect progress events and write the event document
    Events {
        /// Include every event instead of the trailing window
        #[arg(long, conflicts_with = "days")]
        all: bool,

        /// Trailing window in days (default: events.window_days)
        #[arg(long)]
        days: Option<u32>,

        /// Output path (default: paths.events_file)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show per-player and per-type event counts
    Summary {
        /// Trailing window in days (default: events.window_days)
        #[arg(long)]
        days: Option<u32>,
    },

    /// Write progress series and the latest-snapshot comparison
    Progress {
        /// Print one skill's level history instead of the latest totals
        #[arg(long)]
        skill: Option<String>,

        /// Output path (default: paths.progress_file)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Remove snapshots identical to the one before them
    Dedup {
        /// Only report what would be removed
        #[arg(long)]
        dry_run: bool,
    },

    /// Validate the configuration file
    Validate,

    /// Show players and snapshot counts
    Info,
}

/// Initialize logging based on verbosity flag and configured level.
fn init_logging(verbose: bool, configured: &str) {
    let level = if verbose { "debug" } else { configured };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn log_invalid(e: &AppError) {
    log::error!("Config validation failed: {}", e);
}

fn print_event(event: &AchievementEvent) {
    let marker = if event.is_quick() { "*" } else { " " };
    println!(
        "{}{}  {:<16} {:<15} {}",
        marker,
        event.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
        event.display_name,
        event.kind,
        event.name
    );
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Config is read before logging starts so its level can apply;
    // load errors are reported once the logger is up.
    let loaded = Config::load(&cli.config);
    let mut config = loaded.as_ref().cloned().unwrap_or_default();
    init_logging(cli.verbose, &config.logging.level);
    if let Err(e) = &loaded {
        log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            cli.config.display(),
            e
        );
    }

    match cli.command {
        Command::Events { all, days, output } => {
            if let Some(path) = output {
                config.paths.events_file = path;
            }
            let days = config.apply_window(days).inspect_err(log_invalid)?;
            let window = (!all).then_some(days);

            let storage = LocalStorage::new(config.paths.clone());
            let document = pipeline::run_timeline(&config, &storage, Utc::now(), window).await?;

            for event in &document.events {
                print_event(event);
            }
            match window {
                Some(days) => log::info!(
                    "{} events in the last {} days ({} total)",
                    document.events.len(),
                    days,
                    document.total_events
                ),
                None => log::info!("{} events", document.total_events),
            }
        }

        Command::Summary { days } => {
            let days = config.apply_window(days).inspect_err(log_invalid)?;
            let storage = LocalStorage::new(config.paths.clone());
            let references = storage.load_references().await?;
            let histories = pipeline::load_histories(&config, &storage).await?;
            let extractor = pipeline::EventExtractor::new(&references, &config.players);
            let timeline = pipeline::Timeline::build(&histories, &extractor);

            let summary = EventSummary::from_events(timeline.recent(Utc::now(), days));
            println!("Achievement summary (last {days} days): {} events", summary.total);
            println!("By player:");
            for tally in summary.by_player.values() {
                println!("    {}: {}", tally.display_name, tally.count);
            }
            println!("By type:");
            for (kind, count) in &summary.by_kind {
                println!("    {}: {}", kind, count);
            }
        }

        Command::Progress { skill, output } => {
            if let Some(path) = output {
                config.paths.progress_file = path;
            }
            config.validate().inspect_err(log_invalid)?;

            let storage = LocalStorage::new(config.paths.clone());
            let document = pipeline::run_progress(&config, &storage, Utc::now()).await?;

            for player in &document.players {
                match &skill {
                    Some(skill) => {
                        println!("{} - {}", player.display_name, skill);
                        for point in &player.points {
                            println!(
                                "    {}  {}",
                                point.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                                point.skill_level(skill)
                            );
                        }
                    }
                    None => match player.latest() {
                        Some(point) => println!(
                            "{:<16} total level {:>4}  quests {:>3}",
                            player.display_name, point.total_level, point.completed_quests
                        ),
                        None => println!("{:<16} no readable snapshots", player.display_name),
                    },
                }
            }
            let unknown = skill
                .as_ref()
                .filter(|skill| !document.available_skills.contains(*skill));
            if let Some(skill) = unknown {
                log::warn!("'{}' does not appear in any snapshot", skill);
            }
        }

        Command::Dedup { dry_run } => {
            let storage = LocalStorage::new(config.paths.clone());
            let report = pipeline::run_dedup(&config, &storage, dry_run).await?;

            if dry_run {
                log::info!(
                    "{} duplicate snapshots across {} players (dry run)",
                    report.redundant.len(),
                    report.players_scanned
                );
            } else {
                log::info!(
                    "Removed {} duplicate snapshots ({} failed)",
                    report.removed,
                    report.failed
                );
            }
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = loaded {
                log::error!("Config load failed: {}", e);
                return Err(e);
            }
            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::debug!("Effective configuration:\n{}", config.to_toml()?);
            log::info!("✓ Config OK");
        }

        Command::Info => {
            let storage = LocalStorage::new(config.paths.clone());
            log::info!("Player data: {}", config.paths.player_data_dir.display());
            log::info!("Game data: {}", config.paths.game_data_dir.display());

            let references = storage.load_references().await?;
            log::info!(
                "Reference data: {} quests, {} combat achievements, {} collection log items",
                references.quests.len(),
                references.combat_achievements.len(),
                references.collection_log.len()
            );

            for history in pipeline::load_histories(&config, &storage).await? {
                let latest = history
                    .entries()
                    .last()
                    .map(|e| e.taken_at.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string());
                let ironman = if config.players.is_ironman(&history.player) {
                    " [ironman]"
                } else {
                    ""
                };
                println!(
                    "{:<16} {:>5} snapshots  latest {}  {}{}",
                    config.players.display_name(&history.player),
                    history.len(),
                    latest,
                    config.players.color(&history.player),
                    ironman
                );
            }
        }
    }

    Ok(())
}
