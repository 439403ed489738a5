//! Per-player and per-kind event counts.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{AchievementEvent, EventKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerTally {
    pub display_name: String,
    pub count: usize,
}

/// Counts shown above the event table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSummary {
    pub total: usize,
    pub by_player: BTreeMap<String, PlayerTally>,
    pub by_kind: BTreeMap<EventKind, usize>,
}

impl EventSummary {
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a AchievementEvent>) -> Self {
        let mut summary = Self::default();

        for event in events {
            summary.total += 1;
            summary
                .by_player
                .entry(event.player.clone())
                .or_insert_with(|| PlayerTally {
                    display_name: event.display_name.clone(),
                    count: 0,
                })
                .count += 1;
            *summary.by_kind.entry(event.kind).or_default() += 1;
        }

        summary
    }
}
