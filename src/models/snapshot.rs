//! Player snapshot data structure.
//!
//! A snapshot is one scrape of a player's tracked game state. Every
//! category is optional: a missing key means the scrape did not capture it.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{AppError, Result};

/// Stable game-content identifier (combat task or collection log item).
pub type ContentId = i64;

/// Quest status code for a finished quest.
pub const QUEST_COMPLETED: i64 = 2;

/// Level a skill starts at when absent from a snapshot.
pub const BASE_LEVEL: i64 = 1;

/// Activity score used by the hiscores for "unranked".
pub const UNRANKED_SCORE: i64 = -1;

/// Tiers of one diary area, keyed by tier name (`Easy`, `Medium`, ...).
pub type DiaryArea = BTreeMap<String, DiaryTier>;

/// One immutable capture of a player's game state.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Snapshot {
    /// Quest name to status (0 = not started, 1 = in progress, 2 = completed)
    #[serde(default)]
    pub quests: Option<BTreeMap<String, i64>>,

    /// Skill name to level
    #[serde(default)]
    pub levels: Option<BTreeMap<String, i64>>,

    /// Diary area to tier completion, normalized at ingestion
    #[serde(default, deserialize_with = "deserialize_diaries")]
    pub achievement_diaries: Option<BTreeMap<String, DiaryArea>>,

    /// Completed combat achievement task IDs
    #[serde(default)]
    pub combat_achievements: Option<BTreeSet<ContentId>>,

    /// Obtained collection log item IDs
    #[serde(default)]
    pub collection_log: Option<BTreeSet<ContentId>>,

    /// Coarse collection log counter; its presence marks item-level tracking
    #[serde(default, rename = "collectionLogItemCount")]
    pub collection_log_item_count: Option<i64>,

    /// Completed league tasks (only the count is used)
    #[serde(default)]
    pub league_tasks: Option<Vec<Value>>,

    /// Hiscore activities (bosses, clues, minigames)
    #[serde(default)]
    pub activities: Option<Vec<Activity>>,

    /// Music track name to unlocked flag
    #[serde(default, deserialize_with = "deserialize_unlocks")]
    pub music_tracks: Option<BTreeMap<String, bool>>,
}

impl Snapshot {
    /// Decode a snapshot from a parsed JSON document.
    ///
    /// The payload must be a JSON object.
    pub fn from_value(value: Value) -> Result<Self> {
        if !value.is_object() {
            return Err(AppError::validation("snapshot payload is not a JSON object"));
        }
        Ok(serde_json::from_value(value)?)
    }
}

/// Hiscore activity entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Activity {
    pub name: String,
    pub score: i64,
}

/// Completion state of one diary tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiaryTier {
    /// Tasks marked done (zero for the legacy `complete` form)
    pub completed: usize,
    /// Tasks in the tier (zero for the legacy `complete` form)
    pub total: usize,
    /// Whether the whole tier is done
    pub complete: bool,
}

impl DiaryTier {
    /// Normalize a raw tier record.
    ///
    /// A `tasks` array wins when present: the tier is complete iff the array
    /// is non-empty and every entry is `true`. Otherwise an explicit
    /// `complete` boolean is used. Any other shape yields `None`.
    pub fn from_record(record: &Value) -> Option<Self> {
        let record = record.as_object()?;

        if let Some(tasks) = record.get("tasks").and_then(Value::as_array) {
            let total = tasks.len();
            let completed = tasks.iter().filter(|t| t.as_bool() == Some(true)).count();
            return Some(Self {
                completed,
                total,
                complete: total > 0 && completed == total,
            });
        }

        record
            .get("complete")
            .and_then(Value::as_bool)
            .map(|complete| Self {
                completed: 0,
                total: 0,
                complete,
            })
    }
}

fn deserialize_diaries<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<BTreeMap<String, DiaryArea>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, BTreeMap<String, Value>>>::deserialize(deserializer)?;

    Ok(raw.map(|areas| {
        areas
            .into_iter()
            .map(|(area, tiers)| {
                let tiers = tiers
                    .iter()
                    // `tasks` at area level is a flat task list, not a tier
                    .filter(|(tier, _)| tier.as_str() != "tasks")
                    .filter_map(|(tier, record)| {
                        DiaryTier::from_record(record).map(|status| (tier.clone(), status))
                    })
                    .collect();
                (area, tiers)
            })
            .collect()
    }))
}

/// Only an explicit `true` counts as unlocked.
fn deserialize_unlocks<'de, D>(
    deserializer: D,
) -> std::result::Result<Option<BTreeMap<String, bool>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, Value>>::deserialize(deserializer)?;
    Ok(raw.map(|tracks| {
        tracks
            .into_iter()
            .map(|(track, unlocked)| (track, unlocked == Value::Bool(true)))
            .collect()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_categories_are_none() {
        let snapshot = Snapshot::from_value(json!({ "username": "zezima" })).unwrap();
        assert_eq!(snapshot, Snapshot::default());
    }

    #[test]
    fn test_rejects_non_object_payload() {
        assert!(Snapshot::from_value(json!([1, 2, 3])).is_err());
        assert!(Snapshot::from_value(json!("zezima")).is_err());
    }

    #[test]
    fn test_null_item_count_is_none() {
        let snapshot = Snapshot::from_value(json!({ "collectionLogItemCount": null })).unwrap();
        assert_eq!(snapshot.collection_log_item_count, None);
    }

    #[test]
    fn test_parses_full_payload() {
        let snapshot = Snapshot::from_value(json!({
            "quests": { "Cook's Assistant": 2, "Dragon Slayer I": 1 },
            "levels": { "Attack": 40 },
            "combat_achievements": [3, 1, 2, 1],
            "collection_log": [10, 11],
            "collectionLogItemCount": 2,
            "league_tasks": [100, 101],
            "activities": [{ "id": 0, "name": "Zulrah", "rank": 5, "score": 12 }]
        }))
        .unwrap();

        assert_eq!(snapshot.quests.unwrap()["Cook's Assistant"], QUEST_COMPLETED);
        assert_eq!(snapshot.combat_achievements.unwrap().len(), 3);
        assert_eq!(snapshot.league_tasks.unwrap().len(), 2);
        assert_eq!(snapshot.activities.unwrap()[0].score, 12);
    }

    #[test]
    fn test_music_tracks_unlock_flags() {
        let snapshot = Snapshot::from_value(json!({
            "music_tracks": { "Harmony": true, "Sea Shanty": false, "Newbie Melody": null }
        }))
        .unwrap();

        let tracks = snapshot.music_tracks.unwrap();
        assert!(tracks["Harmony"]);
        assert!(!tracks["Sea Shanty"]);
        assert!(!tracks["Newbie Melody"]);
    }

    #[test]
    fn test_diary_tasks_rule() {
        let all_done = DiaryTier::from_record(&json!({ "tasks": [true, true] })).unwrap();
        assert!(all_done.complete);
        assert_eq!((all_done.completed, all_done.total), (2, 2));

        let partial = DiaryTier::from_record(&json!({ "tasks": [true, false] })).unwrap();
        assert!(!partial.complete);

        let none_done = DiaryTier::from_record(&json!({ "tasks": [false, false] })).unwrap();
        assert!(!none_done.complete);

        let empty = DiaryTier::from_record(&json!({ "tasks": [] })).unwrap();
        assert!(!empty.complete);
    }

    #[test]
    fn test_diary_tasks_take_precedence_over_complete_flag() {
        let tier =
            DiaryTier::from_record(&json!({ "complete": true, "tasks": [true, false] })).unwrap();
        assert!(!tier.complete);
    }

    #[test]
    fn test_diary_legacy_complete_flag() {
        let tier = DiaryTier::from_record(&json!({ "complete": true })).unwrap();
        assert!(tier.complete);
        assert!(DiaryTier::from_record(&json!({ "complete": "yes" })).is_none());
        assert!(DiaryTier::from_record(&json!(true)).is_none());
    }

    #[test]
    fn test_diary_area_skips_tasks_key() {
        let snapshot = Snapshot::from_value(json!({
            "achievement_diaries": {
                "Varrock": {
                    "Easy": { "complete": true, "tasks": [true, true] },
                    "Medium": { "complete": false, "tasks": [true, false] },
                    "tasks": [true, false]
                }
            }
        }))
        .unwrap();

        let diaries = snapshot.achievement_diaries.unwrap();
        let varrock = &diaries["Varrock"];
        assert_eq!(varrock.len(), 2);
        assert!(varrock["Easy"].complete);
        assert!(!varrock["Medium"].complete);
        assert!(!varrock.contains_key("tasks"));
    }
}
