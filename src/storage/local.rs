//! Local filesystem storage implementation.
//!
//! ## Storage Layout
//!
//! ```text
//! {player_data_dir}/{player}/{player}_{ISO-8601 ms}.json   # Snapshots
//! {game_data_dir}/quests.json                               # Reference tables
//! {game_data_dir}/combat_achievements.json
//! {game_data_dir}/collection_log.json
//! {events_file}                                             # Generated output
//! {progress_file}
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{HistoryEntry, PathsConfig, PlayerHistory, ReferenceTables, Snapshot};
use crate::pipeline::{EventsDocument, ProgressDocument};
use crate::storage::{SnapshotStore, WriteMetadata};
use crate::utils::{filename, fingerprint};

const QUESTS_FILE: &str = "quests.json";
const COMBAT_ACHIEVEMENTS_FILE: &str = "combat_achievements.json";
const COLLECTION_LOG_FILE: &str = "collection_log.json";

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    paths: PathsConfig,
}

impl LocalStorage {
    /// Create a LocalStorage over the configured locations.
    pub fn new(paths: PathsConfig) -> Self {
        Self { paths }
    }

    fn player_dir(&self, player: &str) -> PathBuf {
        self.paths.player_data_dir.join(player)
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
        Self::ensure_dir(path).await?;

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Write JSON data.
    async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        Self::write_bytes(path, &bytes).await
    }

    /// Read bytes, returning None if file doesn't exist.
    async fn read_bytes(path: &Path) -> Result<Option<Vec<u8>>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }

    /// Read a reference table, degrading to an empty table when the file
    /// is missing or malformed.
    async fn read_table<T: DeserializeOwned>(&self, file_name: &str) -> Vec<T> {
        let path = self.paths.game_data_dir.join(file_name);
        match Self::read_bytes(&path).await {
            Ok(Some(bytes)) => serde_json::from_slice(&bytes).unwrap_or_else(|e| {
                log::warn!("Ignoring malformed reference table {}: {}", path.display(), e);
                Vec::new()
            }),
            Ok(None) => {
                log::warn!("No reference table found at {}", path.display());
                Vec::new()
            }
            Err(e) => {
                log::warn!("Failed to read {}: {}", path.display(), e);
                Vec::new()
            }
        }
    }

    /// Names of entries in a directory, optionally only sub-directories.
    async fn list_dir(path: &Path, dirs_only: bool) -> Result<Vec<String>> {
        let mut dir = match tokio::fs::read_dir(path).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(AppError::Io(e)),
        };

        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            if entry.file_type().await?.is_dir() != dirs_only {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.starts_with('.') {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Read and decode one snapshot file into a history entry.
    ///
    /// Files that do not carry a capture timestamp, or that are named for a
    /// different player, are not part of the history.
    async fn load_entry(
        &self,
        player: &str,
        path: &Path,
        file_name: String,
    ) -> Option<HistoryEntry> {
        let taken_at = match filename::parse(&file_name) {
            Ok(name) if name.player == player => name.taken_at,
            Ok(name) => {
                log::warn!(
                    "Skipping {}: snapshot belongs to '{}', not '{}'",
                    path.display(),
                    name.player,
                    player
                );
                return None;
            }
            Err(e) => {
                log::warn!("Skipping {}: {}", path.display(), e);
                return None;
            }
        };

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return Some(HistoryEntry::unreadable(taken_at, file_name, None, e.to_string()));
            }
        };

        let payload: Value = match serde_json::from_slice(&bytes) {
            Ok(payload) => payload,
            Err(e) => {
                return Some(HistoryEntry::unreadable(taken_at, file_name, None, e.to_string()));
            }
        };

        let content_id = Some(fingerprint(&payload));
        Some(match Snapshot::from_value(payload) {
            Ok(snapshot) => HistoryEntry::loaded(taken_at, file_name, content_id, snapshot),
            Err(e) => HistoryEntry::unreadable(taken_at, file_name, content_id, e.to_string()),
        })
    }
}

#[async_trait]
impl SnapshotStore for LocalStorage {
    async fn list_players(&self) -> Result<Vec<String>> {
        let players = Self::list_dir(&self.paths.player_data_dir, true).await?;
        if players.is_empty() {
            log::warn!(
                "No player directories found in {}",
                self.paths.player_data_dir.display()
            );
        }
        Ok(players)
    }

    async fn load_history(&self, player: &str) -> Result<PlayerHistory> {
        let dir = self.player_dir(player);
        let mut entries = Vec::new();

        for file_name in Self::list_dir(&dir, false).await? {
            if !file_name.ends_with(".json") {
                continue;
            }
            let path = dir.join(&file_name);
            if let Some(entry) = self.load_entry(player, &path, file_name).await {
                entries.push(entry);
            }
        }

        let history = PlayerHistory::new(player, entries);
        let unreadable = history.entries().iter().filter(|e| !e.is_readable()).count();
        if unreadable > 0 {
            log::warn!("{player}: {unreadable} of {} snapshots are unreadable", history.len());
        }
        Ok(history)
    }

    async fn load_references(&self) -> Result<ReferenceTables> {
        let tables = ReferenceTables::from_rows(
            self.read_table(QUESTS_FILE).await,
            self.read_table(COMBAT_ACHIEVEMENTS_FILE).await,
            self.read_table(COLLECTION_LOG_FILE).await,
        );
        log::debug!(
            "Reference tables: {} quests, {} combat achievements, {} collection log items",
            tables.quests.len(),
            tables.combat_achievements.len(),
            tables.collection_log.len()
        );
        Ok(tables)
    }

    async fn write_events(&self, document: &EventsDocument) -> Result<WriteMetadata> {
        Self::write_json(&self.paths.events_file, document).await?;
        Ok(WriteMetadata {
            location: self.paths.events_file.display().to_string(),
            records: document.events.len(),
        })
    }

    async fn write_progress(&self, document: &ProgressDocument) -> Result<WriteMetadata> {
        Self::write_json(&self.paths.progress_file, document).await?;
        Ok(WriteMetadata {
            location: self.paths.progress_file.display().to_string(),
            records: document.players.len(),
        })
    }

    async fn remove_snapshot(&self, player: &str, file_name: &str) -> Result<()> {
        let owned = !file_name.contains(['/', '\\'])
            && filename::parse(file_name).is_ok_and(|name| name.player == player);
        if !owned {
            return Err(AppError::InvalidFilename(file_name.to_string()));
        }
        tokio::fs::remove_file(self.player_dir(player).join(file_name)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use tempfile::TempDir;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, day, 12, 0, 0).unwrap()
    }

    fn storage(tmp: &TempDir) -> LocalStorage {
        LocalStorage::new(PathsConfig {
            player_data_dir: tmp.path().join("player_data"),
            game_data_dir: tmp.path().join("game_data"),
            events_file: tmp.path().join("public/events.json"),
            progress_file: tmp.path().join("public/progress.json"),
        })
    }

    async fn write(path: PathBuf, body: &str) {
        LocalStorage::write_bytes(&path, body.as_bytes()).await.unwrap();
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/test.txt");

        LocalStorage::write_bytes(&path, b"hello").await.unwrap();
        let data = LocalStorage::read_bytes(&path).await.unwrap();
        assert_eq!(data, Some(b"hello".to_vec()));
        assert!(!path.with_extension("tmp").exists());
    }

    #[tokio::test]
    async fn test_read_nonexistent() {
        let tmp = TempDir::new().unwrap();
        let data = LocalStorage::read_bytes(&tmp.path().join("nope.txt")).await.unwrap();
        assert!(data.is_none());
    }

    #[tokio::test]
    async fn test_list_players_ignores_hidden_and_files() {
        let tmp = TempDir::new().unwrap();
        let store = storage(&tmp);
        let root = tmp.path().join("player_data");

        write(root.join("zezima/x.json"), "{}").await;
        write(root.join("anime irl/x.json"), "{}").await;
        write(root.join(".git/HEAD"), "ref").await;
        write(root.join("README.md"), "hi").await;

        assert_eq!(store.list_players().await.unwrap(), vec!["anime irl", "zezima"]);
    }

    #[tokio::test]
    async fn test_missing_data_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = storage(&tmp);

        assert!(store.list_players().await.unwrap().is_empty());
        assert!(store.load_history("zezima").await.unwrap().is_empty());
        assert!(store.load_references().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_history_tolerates_bad_files() {
        let tmp = TempDir::new().unwrap();
        let store = storage(&tmp);
        let dir = tmp.path().join("player_data/zezima");

        write(dir.join(filename::format("zezima", at(3))), r#"{"levels": {"Attack": 3}}"#).await;
        write(dir.join(filename::format("zezima", at(1))), r#"{"levels": {"Attack": 1}}"#).await;
        write(dir.join(filename::format("zezima", at(2))), "{ not json").await;
        write(dir.join(filename::format("zezima", at(4))), "[1, 2]").await;
        write(dir.join("zezima_latest.json"), "{}").await;
        write(dir.join("notes.txt"), "hello").await;

        let history = store.load_history("zezima").await.unwrap();
        let days: Vec<_> = history.entries().iter().map(|e| e.taken_at).collect();
        assert_eq!(days, vec![at(1), at(2), at(3), at(4)]);

        let readable: Vec<_> = history.entries().iter().map(|e| e.is_readable()).collect();
        assert_eq!(readable, vec![true, false, true, false]);
        assert!(history.entries()[1].fingerprint.is_none());
        assert!(history.entries()[3].fingerprint.is_some());
    }

    #[tokio::test]
    async fn test_load_history_ignores_other_players_files() {
        let tmp = TempDir::new().unwrap();
        let store = storage(&tmp);
        let dir = tmp.path().join("player_data/zezima");

        write(dir.join(filename::format("zezima", at(1))), r#"{"levels": {"Attack": 1}}"#).await;
        write(dir.join(filename::format("woox", at(2))), r#"{"levels": {"Attack": 99}}"#).await;
        write(dir.join(filename::format("zezima", at(3))), r#"{"levels": {"Attack": 2}}"#).await;

        let history = store.load_history("zezima").await.unwrap();
        let names: Vec<_> = history.entries().iter().map(|e| e.file_name.clone()).collect();
        assert_eq!(
            names,
            vec![filename::format("zezima", at(1)), filename::format("zezima", at(3))]
        );

        let result = store
            .remove_snapshot("zezima", &filename::format("woox", at(2)))
            .await;
        assert!(matches!(result, Err(AppError::InvalidFilename(_))));
    }

    #[tokio::test]
    async fn test_load_references() {
        let tmp = TempDir::new().unwrap();
        let store = storage(&tmp);
        let game_data = tmp.path().join("game_data");

        write(
            game_data.join(COMBAT_ACHIEVEMENTS_FILE),
            r#"[{"taskId": "5", "name": "Fat of the Land", "tierIconUrl": null}]"#,
        )
        .await;
        write(game_data.join(COLLECTION_LOG_FILE), "not json").await;

        let tables = store.load_references().await.unwrap();
        assert_eq!(tables.combat_achievements[&5].name, "Fat of the Land");
        assert!(tables.collection_log.is_empty());
        assert!(tables.quests.is_empty());
    }

    #[tokio::test]
    async fn test_remove_snapshot_rejects_paths() {
        let tmp = TempDir::new().unwrap();
        let store = storage(&tmp);

        let result = store.remove_snapshot("zezima", "../config.toml").await;
        assert!(matches!(result, Err(AppError::InvalidFilename(_))));

        let file_name = filename::format("zezima", at(1));
        write(tmp.path().join("player_data/zezima").join(&file_name), "{}").await;
        store.remove_snapshot("zezima", &file_name).await.unwrap();
        assert!(store.load_history("zezima").await.unwrap().is_empty());
    }
}
