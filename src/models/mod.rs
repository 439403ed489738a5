// src/models/mod.rs

//! Domain models for the tracker.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod event;
mod history;
mod reference;
mod snapshot;

// Re-export all public types
pub use config::{Config, EventsConfig, LoggingConfig, PathsConfig, PlayersConfig};
pub use event::{AchievementEvent, EventKind};
pub use history::{HistoryEntry, PlayerHistory};
pub use reference::{CollectionLogItemMeta, CombatAchievementMeta, QuestMeta, ReferenceTables};
pub use snapshot::{
    Activity, BASE_LEVEL, ContentId, DiaryArea, DiaryTier, QUEST_COMPLETED, Snapshot,
    UNRANKED_SCORE,
};
