//! Static game metadata used to enrich events.
//!
//! The tables come from wiki exports in the game data directory and are
//! never used for detection itself, only for display.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::models::ContentId;

/// Quest metadata row from `quests.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QuestMeta {
    pub name: String,
    #[serde(default)]
    pub name_wiki_link: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub quest_points: Option<i64>,
    #[serde(default)]
    pub is_miniquest: bool,
}

/// Combat achievement row from `combat_achievements.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CombatAchievementMeta {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub task_id: Option<ContentId>,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub monster: Option<String>,
    #[serde(default)]
    pub tier: Option<String>,
    #[serde(default)]
    pub tier_icon_url: Option<String>,
    #[serde(default)]
    pub name_wiki_link: Option<String>,
}

/// Collection log item row from `collection_log.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CollectionLogItemMeta {
    #[serde(default, deserialize_with = "deserialize_id")]
    pub item_id: Option<ContentId>,
    pub item_name: String,
    #[serde(default)]
    pub item_icon: Option<String>,
    #[serde(default)]
    pub item_link: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
}

/// Lookup tables keyed the way the extractor queries them.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub quests: HashMap<String, QuestMeta>,
    pub combat_achievements: HashMap<ContentId, CombatAchievementMeta>,
    pub collection_log: HashMap<ContentId, CollectionLogItemMeta>,
}

impl ReferenceTables {
    /// Re-key raw table rows. Rows without a usable ID are dropped; for
    /// duplicate keys the first row wins.
    pub fn from_rows(
        quests: Vec<QuestMeta>,
        combat_achievements: Vec<CombatAchievementMeta>,
        collection_log: Vec<CollectionLogItemMeta>,
    ) -> Self {
        let mut tables = Self::default();

        for quest in quests {
            tables.quests.entry(quest.name.clone()).or_insert(quest);
        }
        for task in combat_achievements {
            if let Some(id) = task.task_id {
                tables.combat_achievements.entry(id).or_insert(task);
            }
        }
        for item in collection_log {
            if let Some(id) = item.item_id {
                tables.collection_log.entry(id).or_insert(item);
            }
        }

        tables
    }

    pub fn is_empty(&self) -> bool {
        self.quests.is_empty()
            && self.combat_achievements.is_empty()
            && self.collection_log.is_empty()
    }
}

/// Accept an ID written as a number, a numeric string, or null.
fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<Option<ContentId>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(ContentId),
        Text(String),
    }

    Ok(match Option::<RawId>::deserialize(deserializer)? {
        Some(RawId::Number(id)) => Some(id),
        Some(RawId::Text(text)) => text.trim().parse().ok(),
        None => None,
    })
}
