//! Progress event extraction.
//!
//! Walks one player's history pair by pair and turns every forward state
//! transition between adjacent snapshots into an [`AchievementEvent`].
//!
//! Each category is compared only when both snapshots of the pair carry
//! it. Missing keys inside a category fall back to the "nothing done yet"
//! value for that category (quest status 0, skill level 1, unranked score).

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{
    AchievementEvent, Activity, BASE_LEVEL, EventKind, HistoryEntry, PlayerHistory, PlayersConfig,
    QUEST_COMPLETED, ReferenceTables, Snapshot, UNRANKED_SCORE,
};

/// A pair of snapshots that could not be compared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedPair {
    pub player: String,
    pub previous: String,
    pub current: String,
    pub reason: String,
}

/// Events and skipped pairs for one player.
#[derive(Debug, Clone, Default)]
pub struct PlayerEvents {
    /// Events in generation order (chronological by pair)
    pub events: Vec<AchievementEvent>,
    pub skipped: Vec<SkippedPair>,
}

/// Extracts progress events from player histories.
#[derive(Debug, Clone, Copy)]
pub struct EventExtractor<'a> {
    references: &'a ReferenceTables,
    players: &'a PlayersConfig,
}

impl<'a> EventExtractor<'a> {
    /// Create an extractor using the given reference tables and player settings.
    pub fn new(references: &'a ReferenceTables, players: &'a PlayersConfig) -> Self {
        Self {
            references,
            players,
        }
    }

    /// Extract every event from one player's history.
    ///
    /// Histories shorter than two entries yield nothing. A pair where
    /// either snapshot is unreadable is skipped and reported; the rest of
    /// the history is still processed.
    pub fn extract(&self, history: &PlayerHistory) -> PlayerEvents {
        let mut result = PlayerEvents::default();
        let display_name = self.players.display_name(&history.player);

        for (previous, current) in history.pairs() {
            let (before, after) = match (&previous.snapshot, &current.snapshot) {
                (Ok(before), Ok(after)) => (before, after),
                (Err(reason), _) => {
                    result
                        .skipped
                        .push(skip(&history.player, previous, current, &previous.file_name, reason));
                    continue;
                }
                (_, Err(reason)) => {
                    result
                        .skipped
                        .push(skip(&history.player, previous, current, &current.file_name, reason));
                    continue;
                }
            };

            let pair = PairDiff {
                player: &history.player,
                display_name,
                timestamp: current.taken_at,
                previous_timestamp: previous.taken_at,
                references: self.references,
            };
            pair.detect(before, after, &mut result.events);
        }

        result
    }
}

fn skip(
    player: &str,
    previous: &HistoryEntry,
    current: &HistoryEntry,
    bad_file: &str,
    reason: &str,
) -> SkippedPair {
    log::warn!(
        "Skipping {} → {} for {}: {} is unreadable ({})",
        previous.file_name,
        current.file_name,
        player,
        bad_file,
        reason
    );
    SkippedPair {
        player: player.to_string(),
        previous: previous.file_name.clone(),
        current: current.file_name.clone(),
        reason: format!("{bad_file}: {reason}"),
    }
}

/// Comparison of one adjacent snapshot pair.
struct PairDiff<'a> {
    player: &'a str,
    display_name: &'a str,
    timestamp: DateTime<Utc>,
    previous_timestamp: DateTime<Utc>,
    references: &'a ReferenceTables,
}

impl PairDiff<'_> {
    fn detect(&self, before: &Snapshot, after: &Snapshot, out: &mut Vec<AchievementEvent>) {
        self.quests(before, after, out);
        self.diaries(before, after, out);
        self.levels(before, after, out);
        self.combat_achievements(before, after, out);
        self.collection_log(before, after, out);
        self.league_tasks(before, after, out);
        self.activities(before, after, out);
    }

    fn event(&self, kind: EventKind, name: impl Into<String>) -> AchievementEvent {
        AchievementEvent {
            player: self.player.to_string(),
            display_name: self.display_name.to_string(),
            kind,
            name: name.into(),
            timestamp: self.timestamp,
            previous_timestamp: self.previous_timestamp,
            icon_url: None,
            wiki_link: None,
            description: None,
        }
    }

    fn quests(&self, before: &Snapshot, after: &Snapshot, out: &mut Vec<AchievementEvent>) {
        let (Some(was), Some(now)) = (&before.quests, &after.quests) else {
            return;
        };

        for (quest, &status) in now {
            let previous = was.get(quest).copied().unwrap_or(0);
            if previous == QUEST_COMPLETED || status != QUEST_COMPLETED {
                continue;
            }

            let mut event = self.event(EventKind::Quest, quest.as_str());
            if let Some(meta) = self.references.quests.get(quest) {
                event.wiki_link = meta.name_wiki_link.clone();
                event.description = meta.difficulty.clone();
            }
            out.push(event);
        }
    }

    fn diaries(&self, before: &Snapshot, after: &Snapshot, out: &mut Vec<AchievementEvent>) {
        let (Some(was), Some(now)) = (&before.achievement_diaries, &after.achievement_diaries)
        else {
            return;
        };

        for (area, tiers) in now {
            for (tier, status) in tiers {
                let was_complete = was
                    .get(area)
                    .and_then(|tiers| tiers.get(tier))
                    .is_some_and(|t| t.complete);

                if !was_complete && status.complete {
                    out.push(self.event(EventKind::Diary, format!("{area} {tier}")));
                }
            }
        }
    }

    fn levels(&self, before: &Snapshot, after: &Snapshot, out: &mut Vec<AchievementEvent>) {
        let (Some(was), Some(now)) = (&before.levels, &after.levels) else {
            return;
        };

        for (skill, &level) in now {
            let previous = was.get(skill).copied().unwrap_or(BASE_LEVEL);
            if level > previous {
                out.push(self.event(EventKind::Level, format!("{skill} ({previous} → {level})")));
            }
        }
    }

    fn combat_achievements(
        &self,
        before: &Snapshot,
        after: &Snapshot,
        out: &mut Vec<AchievementEvent>,
    ) {
        let (Some(was), Some(now)) = (&before.combat_achievements, &after.combat_achievements)
        else {
            return;
        };

        for id in now.difference(was) {
            let Some(meta) = self.references.combat_achievements.get(id) else {
                log::debug!("No metadata for combat achievement {id}; skipping");
                continue;
            };

            let mut event = self.event(EventKind::Combat, meta.name.as_str());
            event.description = meta.description.clone();
            event.icon_url = meta.tier_icon_url.clone();
            event.wiki_link = meta.name_wiki_link.clone();
            out.push(event);
        }
    }

    /// Item-level diff when both item lists exist, otherwise the coarse
    /// item count. Either way the previous snapshot must carry the count,
    /// which marks scrapes made after item tracking started.
    fn collection_log(&self, before: &Snapshot, after: &Snapshot, out: &mut Vec<AchievementEvent>) {
        let Some(previous_count) = before.collection_log_item_count else {
            return;
        };

        match (&before.collection_log, &after.collection_log) {
            (Some(was), Some(now)) => {
                for id in now.difference(was) {
                    let Some(meta) = self.references.collection_log.get(id) else {
                        log::debug!("No metadata for collection log item {id}; skipping");
                        continue;
                    };

                    let mut event = self.event(EventKind::CollectionItem, meta.item_name.as_str());
                    event.description = meta.collection.clone();
                    event.icon_url = meta.item_icon.clone();
                    event.wiki_link = meta.item_link.clone();
                    out.push(event);
                }
            }
            _ => {
                let grown = after
                    .collection_log_item_count
                    .filter(|&count| count > previous_count);
                if let Some(count) = grown {
                    out.push(self.event(
                        EventKind::Collection,
                        format!("Collection Log ({previous_count} → {count} items)"),
                    ));
                }
            }
        }
    }

    fn league_tasks(&self, before: &Snapshot, after: &Snapshot, out: &mut Vec<AchievementEvent>) {
        let (Some(was), Some(now)) = (&before.league_tasks, &after.league_tasks) else {
            return;
        };

        if now.len() > was.len() {
            out.push(self.event(
                EventKind::League,
                format!("League Task ({} → {} completed)", was.len(), now.len()),
            ));
        }
    }

    fn activities(&self, before: &Snapshot, after: &Snapshot, out: &mut Vec<AchievementEvent>) {
        let (Some(was), Some(now)) = (&before.activities, &after.activities) else {
            return;
        };

        let previous_scores: HashMap<&str, i64> = ranked_scores(was).collect();

        for (activity, score) in ranked_scores(now) {
            let previous = previous_scores
                .get(activity)
                .copied()
                .unwrap_or(UNRANKED_SCORE);

            if score <= previous {
                continue;
            }

            let name = if previous == UNRANKED_SCORE {
                format!("{activity}: {score}")
            } else {
                format!("{activity} ({previous} → {score})")
            };
            out.push(self.event(EventKind::Activity, name));
        }
    }
}

/// Ranked activity scores in listing order.
///
/// An activity listed more than once keeps its first entry.
fn ranked_scores(activities: &[Activity]) -> impl Iterator<Item = (&str, i64)> {
    let mut seen = HashSet::new();
    activities
        .iter()
        .filter(move |a| seen.insert(a.name.as_str()))
        .filter(|a| a.score > UNRANKED_SCORE)
        .map(|a| (a.name.as_str(), a.score))
}
