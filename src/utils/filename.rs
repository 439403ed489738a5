// src/utils/filename.rs

//! Snapshot filename utilities.
//!
//! Snapshots are stored as `<player>_<ISO-8601 with milliseconds>.json`.
//! The timestamp in the name is the only ordering key: the payload carries
//! no reliable capture time of its own.

use std::sync::LazyLock;

use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;

use crate::error::{AppError, Result};

static SNAPSHOT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<player>.+)_(?P<ts>\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}\.\d{3}Z)\.json$")
        .expect("snapshot filename pattern is valid")
});

/// Parsed parts of a snapshot filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotName {
    pub player: String,
    pub taken_at: DateTime<Utc>,
}

/// Parse a snapshot filename into player key and capture time.
///
/// # Examples
/// ```
/// use osrs_tracker::utils::filename::parse;
///
/// let name = parse("anime irl_2025-08-19T14:09:33.500Z.json").unwrap();
/// assert_eq!(name.player, "anime irl");
/// ```
pub fn parse(file_name: &str) -> Result<SnapshotName> {
    let caps = SNAPSHOT_NAME
        .captures(file_name)
        .ok_or_else(|| AppError::InvalidFilename(file_name.to_string()))?;

    let taken_at = DateTime::parse_from_rfc3339(&caps["ts"])
        .map_err(|_| AppError::InvalidFilename(file_name.to_string()))?
        .with_timezone(&Utc);

    Ok(SnapshotName {
        player: caps["player"].to_string(),
        taken_at,
    })
}

/// Build the filename a snapshot captured at `taken_at` is stored under.
pub fn format(player: &str, taken_at: DateTime<Utc>) -> String {
    format!(
        "{}_{}.json",
        player,
        taken_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    )
}
