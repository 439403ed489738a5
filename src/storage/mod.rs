//! Storage abstractions for snapshot persistence.
//!
//! ## Directory Structure
//!
//! ```text
//! player_data/
//! ├── anime irl/
//! │   ├── anime irl_2025-08-19T14:09:33.500Z.json
//! │   └── anime irl_2025-08-20T14:09:31.118Z.json
//! └── zezima/
//!     └── zezima_2025-08-19T14:09:33.500Z.json
//! game_data/
//! ├── quests.json
//! ├── combat_achievements.json
//! └── collection_log.json
//! public/
//! ├── events.json           # Generated event document
//! └── progress.json         # Generated progress and comparison document
//! ```

pub mod local;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{PlayerHistory, ReferenceTables};
use crate::pipeline::{EventsDocument, ProgressDocument};

// Re-export for convenience
pub use local::LocalStorage;

/// Metadata about a generated document write.
#[derive(Debug, Clone)]
pub struct WriteMetadata {
    /// Where the document was written
    pub location: String,
    /// Number of top-level records (events or players) in the document
    pub records: usize,
}

/// Trait for snapshot storage backends.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Player keys with a snapshot directory, sorted.
    async fn list_players(&self) -> Result<Vec<String>>;

    /// Every snapshot of one player in capture order.
    ///
    /// Unreadable snapshots are returned as unreadable entries rather than
    /// failing the load.
    async fn load_history(&self, player: &str) -> Result<PlayerHistory>;

    /// Reference tables; missing tables load as empty.
    async fn load_references(&self) -> Result<ReferenceTables>;

    /// Persist the generated event document.
    async fn write_events(&self, document: &EventsDocument) -> Result<WriteMetadata>;

    /// Persist the generated progress and comparison document.
    async fn write_progress(&self, document: &ProgressDocument) -> Result<WriteMetadata>;

    /// Delete one snapshot file.
    async fn remove_snapshot(&self, player: &str, file_name: &str) -> Result<()>;
}
