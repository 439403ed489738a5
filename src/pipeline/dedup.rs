//! Duplicate snapshot detection.
//!
//! A scrape that captured nothing new produces a snapshot identical to the
//! one before it. Such snapshots add no information to the history and are
//! pruned; the first snapshot of every identical run is kept.

use serde::Serialize;

use crate::error::Result;
use crate::models::{Config, HistoryEntry, PlayerHistory};
use crate::pipeline::timeline::load_histories;
use crate::storage::SnapshotStore;

/// Entries whose content equals the immediately preceding entry.
///
/// Unreadable entries never count as duplicates.
pub fn find_redundant(history: &PlayerHistory) -> Vec<&HistoryEntry> {
    history
        .pairs()
        .filter(|(previous, current)| {
            previous.is_readable()
                && current.is_readable()
                && previous.fingerprint.is_some()
                && previous.fingerprint == current.fingerprint
        })
        .map(|(_, current)| current)
        .collect()
}

/// A snapshot selected for removal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedundantSnapshot {
    pub player: String,
    pub file_name: String,
}

/// Outcome of a dedup run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DedupReport {
    pub players_scanned: usize,
    pub redundant: Vec<RedundantSnapshot>,
    pub removed: usize,
    pub failed: usize,
}

/// Find, and unless `dry_run` delete, redundant snapshots of every tracked player.
pub async fn run_dedup(
    config: &Config,
    store: &dyn SnapshotStore,
    dry_run: bool,
) -> Result<DedupReport> {
    let histories = load_histories(config, store).await?;
    let mut report = DedupReport {
        players_scanned: histories.len(),
        ..DedupReport::default()
    };

    for history in &histories {
        for entry in find_redundant(history) {
            report.redundant.push(RedundantSnapshot {
                player: history.player.clone(),
                file_name: entry.file_name.clone(),
            });
        }
    }

    if report.redundant.is_empty() {
        log::info!("No duplicate snapshots found");
        return Ok(report);
    }

    for snapshot in &report.redundant {
        if dry_run {
            log::info!("Would remove {}/{}", snapshot.player, snapshot.file_name);
            continue;
        }
        match store
            .remove_snapshot(&snapshot.player, &snapshot.file_name)
            .await
        {
            Ok(()) => {
                log::info!("Removed {}/{}", snapshot.player, snapshot.file_name);
                report.removed += 1;
            }
            Err(e) => {
                log::error!(
                    "Failed to remove {}/{}: {}",
                    snapshot.player,
                    snapshot.file_name,
                    e
                );
                report.failed += 1;
            }
        }
    }

    Ok(report)
}
