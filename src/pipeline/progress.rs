//! Progress series and cross-player comparison.
//!
//! Both views are derived from the same histories as the event timeline:
//! the series from every readable snapshot, the comparison from each
//! player's most recent readable snapshot.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{
    BASE_LEVEL, Config, DiaryArea, PlayerHistory, PlayersConfig, QUEST_COMPLETED, Snapshot,
};
use crate::pipeline::timeline::load_histories;
use crate::storage::SnapshotStore;

/// Account state at one capture time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPoint {
    pub timestamp: DateTime<Utc>,
    /// Sum of all recorded skill levels (0 when levels were not captured)
    pub total_level: i64,
    pub completed_quests: usize,
    pub skill_levels: BTreeMap<String, i64>,
}

impl ProgressPoint {
    fn from_snapshot(timestamp: DateTime<Utc>, snapshot: &Snapshot) -> Self {
        let skill_levels = snapshot.levels.clone().unwrap_or_default();
        let completed_quests = snapshot.quests.as_ref().map_or(0, |quests| {
            quests
                .values()
                .filter(|&&status| status == QUEST_COMPLETED)
                .count()
        });

        Self {
            timestamp,
            total_level: skill_levels.values().sum(),
            completed_quests,
            skill_levels,
        }
    }

    /// Level of one skill; unrecorded skills are at the base level.
    pub fn skill_level(&self, skill: &str) -> i64 {
        self.skill_levels.get(skill).copied().unwrap_or(BASE_LEVEL)
    }
}

/// Chronological progress of one player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerProgress {
    pub player: String,
    pub display_name: String,
    pub color: String,
    pub ironman: bool,
    /// One point per readable snapshot, oldest first
    pub points: Vec<ProgressPoint>,
}

impl PlayerProgress {
    pub fn from_history(history: &PlayerHistory, players: &PlayersConfig) -> Self {
        let points = history
            .entries()
            .iter()
            .filter_map(|entry| {
                let snapshot = entry.snapshot.as_ref().ok()?;
                Some(ProgressPoint::from_snapshot(entry.taken_at, snapshot))
            })
            .collect();

        Self {
            player: history.player.clone(),
            display_name: players.display_name(&history.player).to_string(),
            color: players.color(&history.player).to_string(),
            ironman: players.is_ironman(&history.player),
            points,
        }
    }

    pub fn latest(&self) -> Option<&ProgressPoint> {
        self.points.last()
    }
}

/// One snapshot category laid side by side for every player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonTable<V> {
    /// Players whose latest snapshot carries the category, sorted
    pub players: Vec<String>,
    /// Union of the category's keys across those players, sorted
    pub rows: Vec<String>,
    /// Player key to that player's values
    pub values: BTreeMap<String, BTreeMap<String, V>>,
}

impl<V> Default for ComparisonTable<V> {
    fn default() -> Self {
        Self {
            players: Vec::new(),
            rows: Vec::new(),
            values: BTreeMap::new(),
        }
    }
}

impl<V: Clone> ComparisonTable<V> {
    fn collect<F>(latest: &[(&str, &Snapshot)], category: F) -> Self
    where
        F: Fn(&Snapshot) -> Option<&BTreeMap<String, V>>,
    {
        let mut table = Self::default();
        let mut rows = BTreeSet::new();

        for &(player, snapshot) in latest {
            if let Some(values) = category(snapshot) {
                rows.extend(values.keys().cloned());
                table.values.insert(player.to_string(), values.clone());
            }
        }

        table.players = table.values.keys().cloned().collect();
        table.rows = rows.into_iter().collect();
        table
    }
}

/// Latest-snapshot comparison across players.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    /// Quest status codes
    pub quests: ComparisonTable<i64>,
    pub levels: ComparisonTable<i64>,
    /// Rows are diary areas
    pub achievement_diaries: ComparisonTable<DiaryArea>,
    /// Unlocked flags
    pub music_tracks: ComparisonTable<bool>,
}

impl Comparison {
    pub fn from_histories(histories: &[PlayerHistory]) -> Self {
        let latest: Vec<(&str, &Snapshot)> = histories
            .iter()
            .filter_map(|history| Some((history.player.as_str(), history.latest()?)))
            .collect();

        Self {
            quests: ComparisonTable::collect(&latest, |s| s.quests.as_ref()),
            levels: ComparisonTable::collect(&latest, |s| s.levels.as_ref()),
            achievement_diaries: ComparisonTable::collect(&latest, |s| {
                s.achievement_diaries.as_ref()
            }),
            music_tracks: ComparisonTable::collect(&latest, |s| s.music_tracks.as_ref()),
        }
    }
}

/// Generated progress document consumed by the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDocument {
    pub generated_at: DateTime<Utc>,
    /// Every skill seen in any snapshot, sorted
    pub available_skills: Vec<String>,
    pub players: Vec<PlayerProgress>,
    pub comparison: Comparison,
}

impl ProgressDocument {
    pub fn build(
        histories: &[PlayerHistory],
        settings: &PlayersConfig,
        now: DateTime<Utc>,
    ) -> Self {
        let players: Vec<PlayerProgress> = histories
            .iter()
            .map(|history| PlayerProgress::from_history(history, settings))
            .collect();

        let available_skills = players
            .iter()
            .flat_map(|player| &player.points)
            .flat_map(|point| point.skill_levels.keys().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        Self {
            generated_at: now,
            available_skills,
            players,
            comparison: Comparison::from_histories(histories),
        }
    }
}

/// Build the progress document from the store and write it.
pub async fn run_progress(
    config: &Config,
    store: &dyn SnapshotStore,
    now: DateTime<Utc>,
) -> Result<ProgressDocument> {
    let histories = load_histories(config, store).await?;
    let document = ProgressDocument::build(&histories, &config.players, now);

    let written = store.write_progress(&document).await?;
    log::info!(
        "Wrote progress for {} players ({} skills) to {}",
        written.records,
        document.available_skills.len(),
        written.location
    );

    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DiaryTier, HistoryEntry};
    use crate::storage::LocalStorage;
    use crate::utils::filename;
    use chrono::TimeZone;
    use serde_json::{Value, json};
    use tempfile::TempDir;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, day, 12, 0, 0).unwrap()
    }

    fn loaded(player: &str, day: u32, value: Value) -> HistoryEntry {
        HistoryEntry::loaded(
            at(day),
            filename::format(player, at(day)),
            None,
            Snapshot::from_value(value).unwrap(),
        )
    }

    fn sample_histories() -> Vec<PlayerHistory> {
        vec![
            PlayerHistory::new(
                "alice",
                vec![
                    loaded(
                        "alice",
                        1,
                        json!({
                            "quests": { "Cook's Assistant": 1 },
                            "levels": { "Attack": 10, "Defence": 5 }
                        }),
                    ),
                    loaded(
                        "alice",
                        2,
                        json!({
                            "quests": { "Cook's Assistant": 2, "Dragon Slayer I": 2 },
                            "levels": { "Attack": 12, "Defence": 5 },
                            "music_tracks": { "Harmony": true, "Sea Shanty": false }
                        }),
                    ),
                    HistoryEntry::unreadable(at(3), "alice_broken.json", None, "EOF"),
                ],
            ),
            PlayerHistory::new(
                "bob",
                vec![loaded(
                    "bob",
                    1,
                    json!({
                        "quests": { "Cook's Assistant": 2 },
                        "levels": { "Attack": 40, "Sailing": 3 },
                        "achievement_diaries": {
                            "Varrock": { "Easy": { "tasks": [true, true] } }
                        }
                    }),
                )],
            ),
            PlayerHistory::new("carol", vec![]),
        ]
    }

    #[test]
    fn test_progress_series() {
        let mut settings = PlayersConfig::default();
        settings
            .display_names
            .insert("alice".to_string(), "Alice".to_string());
        settings.ironman = vec!["bob".to_string()];

        let document = ProgressDocument::build(&sample_histories(), &settings, at(10));
        let alice = &document.players[0];

        assert_eq!(alice.display_name, "Alice");
        assert_eq!(alice.color, "#999999");
        assert!(!alice.ironman);
        assert!(document.players[1].ironman);

        // The unreadable snapshot contributes no point
        let totals: Vec<_> = alice.points.iter().map(|p| p.total_level).collect();
        assert_eq!(totals, vec![15, 17]);
        let quests: Vec<_> = alice.points.iter().map(|p| p.completed_quests).collect();
        assert_eq!(quests, vec![0, 2]);

        let latest = alice.latest().unwrap();
        assert_eq!(latest.timestamp, at(2));
        assert_eq!(latest.skill_level("Attack"), 12);
        assert_eq!(latest.skill_level("Sailing"), 1);

        assert!(document.players[2].points.is_empty());
        assert_eq!(document.available_skills, vec!["Attack", "Defence", "Sailing"]);
    }

    #[test]
    fn test_snapshot_without_levels_totals_zero() {
        let history = PlayerHistory::new("alice", vec![loaded("alice", 1, json!({}))]);
        let progress = PlayerProgress::from_history(&history, &PlayersConfig::default());

        assert_eq!(progress.points[0].total_level, 0);
        assert_eq!(progress.points[0].completed_quests, 0);
    }

    #[test]
    fn test_comparison_uses_latest_readable_snapshot() {
        let comparison = Comparison::from_histories(&sample_histories());

        assert_eq!(comparison.quests.players, vec!["alice", "bob"]);
        assert_eq!(
            comparison.quests.rows,
            vec!["Cook's Assistant", "Dragon Slayer I"]
        );
        assert_eq!(comparison.quests.values["alice"]["Dragon Slayer I"], 2);
        assert!(!comparison.quests.values["bob"].contains_key("Dragon Slayer I"));
        assert_eq!(comparison.levels.values["alice"]["Attack"], 12);

        // Categories only list players whose latest snapshot carries them
        assert_eq!(comparison.music_tracks.players, vec!["alice"]);
        assert!(!comparison.music_tracks.values["alice"]["Sea Shanty"]);
        assert_eq!(comparison.achievement_diaries.players, vec!["bob"]);
        assert_eq!(comparison.achievement_diaries.rows, vec!["Varrock"]);

        let varrock = &comparison.achievement_diaries.values["bob"]["Varrock"];
        assert_eq!(
            varrock["Easy"],
            DiaryTier {
                completed: 2,
                total: 2,
                complete: true
            }
        );
    }

    #[test]
    fn test_serialized_shape() {
        let document = ProgressDocument::build(&sample_histories(), &PlayersConfig::default(), at(10));
        let value = serde_json::to_value(&document).unwrap();

        assert!(value.get("availableSkills").is_some());
        assert_eq!(value["players"][0]["points"][1]["totalLevel"], 17);
        assert_eq!(value["players"][0]["points"][1]["completedQuests"], 2);
        assert_eq!(
            value["comparison"]["achievementDiaries"]["values"]["bob"]["Varrock"]["Easy"]["completed"],
            2
        );
        assert_eq!(value["comparison"]["musicTracks"]["rows"][0], "Harmony");
    }

    #[tokio::test]
    async fn test_run_progress_writes_document() {
        let tmp = TempDir::new().unwrap();
        let mut config = Config::default();
        config.paths.player_data_dir = tmp.path().join("player_data");
        config.paths.game_data_dir = tmp.path().join("game_data");
        config.paths.progress_file = tmp.path().join("public/progress.json");

        let dir = config.paths.player_data_dir.join("alice");
        tokio::fs::create_dir_all(&dir).await.unwrap();
        for (day, attack) in [(1, 10), (2, 11)] {
            tokio::fs::write(
                dir.join(filename::format("alice", at(day))),
                json!({ "levels": { "Attack": attack } }).to_string(),
            )
            .await
            .unwrap();
        }

        let store = LocalStorage::new(config.paths.clone());
        let document = run_progress(&config, &store, at(10)).await.unwrap();
        assert_eq!(document.players.len(), 1);
        assert_eq!(document.players[0].points.len(), 2);

        let written: ProgressDocument = serde_json::from_slice(
            &tokio::fs::read(&config.paths.progress_file).await.unwrap(),
        )
        .unwrap();
        assert_eq!(written, document);
    }
}
