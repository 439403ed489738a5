//! Per-player snapshot history.

use chrono::{DateTime, Utc};

use crate::models::Snapshot;

/// One stored snapshot of a player.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    /// Capture time taken from the filename
    pub taken_at: DateTime<Utc>,

    /// Source filename, e.g. `zezima_2025-08-19T14:09:33.500Z.json`
    pub file_name: String,

    /// Content fingerprint; `None` if the file could not be parsed as JSON
    pub fingerprint: Option<String>,

    /// Decoded snapshot, or the reason it could not be read
    pub snapshot: std::result::Result<Snapshot, String>,
}

impl HistoryEntry {
    /// Create an entry for a readable snapshot.
    pub fn loaded(
        taken_at: DateTime<Utc>,
        file_name: impl Into<String>,
        fingerprint: Option<String>,
        snapshot: Snapshot,
    ) -> Self {
        Self {
            taken_at,
            file_name: file_name.into(),
            fingerprint,
            snapshot: Ok(snapshot),
        }
    }

    /// Create an entry for a snapshot that failed to read or decode.
    pub fn unreadable(
        taken_at: DateTime<Utc>,
        file_name: impl Into<String>,
        fingerprint: Option<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            taken_at,
            file_name: file_name.into(),
            fingerprint,
            snapshot: Err(reason.into()),
        }
    }

    /// Whether the snapshot decoded successfully.
    pub fn is_readable(&self) -> bool {
        self.snapshot.is_ok()
    }
}

/// Ordered snapshot history of one player.
#[derive(Debug, Clone, Default)]
pub struct PlayerHistory {
    /// Player key (directory name)
    pub player: String,

    /// Entries in ascending capture order
    entries: Vec<HistoryEntry>,
}

impl PlayerHistory {
    /// Build a history, ordering entries by capture time.
    pub fn new(player: impl Into<String>, mut entries: Vec<HistoryEntry>) -> Self {
        entries.sort_by(|a, b| {
            a.taken_at
                .cmp(&b.taken_at)
                .then_with(|| a.file_name.cmp(&b.file_name))
        });
        Self {
            player: player.into(),
            entries,
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adjacent `(previous, current)` pairs in chronological order.
    pub fn pairs(&self) -> impl Iterator<Item = (&HistoryEntry, &HistoryEntry)> {
        self.entries.windows(2).map(|w| (&w[0], &w[1]))
    }

    /// Most recent readable snapshot.
    pub fn latest(&self) -> Option<&Snapshot> {
        self.entries
            .iter()
            .rev()
            .find_map(|entry| entry.snapshot.as_ref().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 8, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_entries_sorted_by_capture_time() {
        let history = PlayerHistory::new(
            "zezima",
            vec![
                HistoryEntry::loaded(at(3), "c.json", None, Snapshot::default()),
                HistoryEntry::loaded(at(1), "a.json", None, Snapshot::default()),
                HistoryEntry::loaded(at(2), "b.json", None, Snapshot::default()),
            ],
        );

        let names: Vec<_> = history.entries().iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.json", "b.json", "c.json"]);
    }

    #[test]
    fn test_pairs() {
        let empty = PlayerHistory::new("zezima", vec![]);
        assert_eq!(empty.pairs().count(), 0);

        let single = PlayerHistory::new(
            "zezima",
            vec![HistoryEntry::loaded(at(1), "a.json", None, Snapshot::default())],
        );
        assert_eq!(single.pairs().count(), 0);

        let three = PlayerHistory::new(
            "zezima",
            vec![
                HistoryEntry::loaded(at(1), "a.json", None, Snapshot::default()),
                HistoryEntry::loaded(at(2), "b.json", None, Snapshot::default()),
                HistoryEntry::loaded(at(3), "c.json", None, Snapshot::default()),
            ],
        );
        let pairs: Vec<_> = three
            .pairs()
            .map(|(p, c)| (p.file_name.as_str(), c.file_name.as_str()))
            .collect();
        assert_eq!(pairs, vec![("a.json", "b.json"), ("b.json", "c.json")]);
    }

    #[test]
    fn test_latest_skips_unreadable() {
        let mut good = Snapshot::default();
        good.levels = Some([("Attack".to_string(), 50)].into());

        let history = PlayerHistory::new(
            "zezima",
            vec![
                HistoryEntry::loaded(at(1), "a.json", None, good.clone()),
                HistoryEntry::unreadable(at(2), "b.json", None, "EOF while parsing"),
            ],
        );

        assert_eq!(history.latest(), Some(&good));
    }
}
