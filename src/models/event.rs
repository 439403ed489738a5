//! Achievement event data structure.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Category of a detected progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Quest,
    Diary,
    Level,
    Combat,
    Collection,
    CollectionItem,
    League,
    Activity,
}

impl EventKind {
    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            EventKind::Quest => "Quest",
            EventKind::Diary => "Diary",
            EventKind::Level => "Level",
            EventKind::Combat => "Combat",
            EventKind::Collection => "Collection",
            EventKind::CollectionItem => "Collection item",
            EventKind::League => "League",
            EventKind::Activity => "Activity",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// One forward progress transition between two adjacent snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementEvent {
    /// Player key
    pub player: String,

    /// Display name from the player configuration
    pub display_name: String,

    #[serde(rename = "type")]
    pub kind: EventKind,

    /// Category-specific description, e.g. `Attack (10 → 15)`
    pub name: String,

    /// Capture time of the snapshot where the change was seen
    pub timestamp: DateTime<Utc>,

    /// Capture time of the snapshot before it
    pub previous_timestamp: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wiki_link: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AchievementEvent {
    /// Time between the two snapshots that bracket this event.
    pub fn gap(&self) -> Duration {
        self.timestamp - self.previous_timestamp
    }

    /// Whether the event was pinned down to less than a day.
    pub fn is_quick(&self) -> bool {
        self.gap() < Duration::hours(24)
    }
}
