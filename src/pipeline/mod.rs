//! Pipeline entry points for tracker operations.
//!
//! - `run_timeline`: Detect progress events and write the event document
//! - `run_progress`: Write per-snapshot progress series and the latest-snapshot comparison
//! - `run_dedup`: Prune snapshots identical to their predecessor

pub mod dedup;
pub mod extract;
pub mod progress;
pub mod summary;
pub mod timeline;

pub use dedup::{DedupReport, find_redundant, run_dedup};
pub use extract::{EventExtractor, PlayerEvents, SkippedPair};
pub use progress::{
    Comparison, ComparisonTable, PlayerProgress, ProgressDocument, ProgressPoint, run_progress,
};
pub use summary::EventSummary;
pub use timeline::{EventsDocument, Timeline, load_histories, run_timeline};
