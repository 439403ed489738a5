// src/pipeline/timeline.rs

//! Event timeline across all players.

use chrono::{DateTime, Duration, Utc};
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{AchievementEvent, Config, PlayerHistory};
use crate::pipeline::extract::{EventExtractor, SkippedPair};
use crate::storage::SnapshotStore;

/// All events of a run, most recent first.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    events: Vec<AchievementEvent>,
    skipped: Vec<SkippedPair>,
}

impl Timeline {
    /// Extract and merge events for every history.
    ///
    /// The final order is descending by timestamp. The sort is stable, so
    /// events sharing a timestamp keep their generation order.
    pub fn build(histories: &[PlayerHistory], extractor: &EventExtractor<'_>) -> Self {
        let mut timeline = Self::default();

        for history in histories {
            let result = extractor.extract(history);
            log::debug!(
                "{}: {} events from {} snapshots ({} pairs skipped)",
                history.player,
                result.events.len(),
                history.len(),
                result.skipped.len()
            );
            timeline.events.extend(result.events);
            timeline.skipped.extend(result.skipped);
        }

        timeline
            .events
            .sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        timeline
    }

    /// Every detected event.
    pub fn events(&self) -> &[AchievementEvent] {
        &self.events
    }

    /// Pairs that could not be compared.
    pub fn skipped(&self) -> &[SkippedPair] {
        &self.skipped
    }

    /// Events strictly newer than `now - window_days`.
    ///
    /// A window reaching past the earliest representable date keeps every
    /// event.
    pub fn recent(
        &self,
        now: DateTime<Utc>,
        window_days: u32,
    ) -> impl Iterator<Item = &AchievementEvent> {
        let cutoff = Duration::try_days(i64::from(window_days))
            .and_then(|window| now.checked_sub_signed(window));
        if cutoff.is_none() {
            log::debug!("{window_days}-day window exceeds the calendar; keeping all events");
        }
        self.events
            .iter()
            .filter(move |e| cutoff.is_none_or(|cutoff| e.timestamp > cutoff))
    }

    /// Events for the requested view: a trailing window, or everything.
    pub fn view(&self, now: DateTime<Utc>, window_days: Option<u32>) -> Vec<AchievementEvent> {
        match window_days {
            Some(days) => self.recent(now, days).cloned().collect(),
            None => self.events.clone(),
        }
    }
}

/// Generated event document consumed by the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsDocument {
    pub generated_at: DateTime<Utc>,
    /// Trailing window applied to `events`; `None` means unfiltered
    pub window_days: Option<u32>,
    /// Events detected over the whole history, before filtering
    pub total_events: usize,
    pub skipped_pairs: Vec<SkippedPair>,
    pub events: Vec<AchievementEvent>,
}

/// Load every tracked player's history from the store.
///
/// Players are loaded concurrently; ordering is restored by name.
pub async fn load_histories(
    config: &Config,
    store: &dyn SnapshotStore,
) -> Result<Vec<PlayerHistory>> {
    let players: Vec<String> = store
        .list_players()
        .await?
        .into_iter()
        .filter(|p| config.players.is_tracked(p))
        .collect();

    let loaded = join_all(players.iter().map(|p| store.load_history(p))).await;
    let mut histories = loaded.into_iter().collect::<Result<Vec<_>>>()?;
    histories.sort_by(|a, b| a.player.cmp(&b.player));

    log::info!(
        "Loaded {} players with {} snapshots",
        histories.len(),
        histories.iter().map(PlayerHistory::len).sum::<usize>()
    );

    Ok(histories)
}

/// Build the timeline from the store and write the event document.
///
/// `window_days` selects the view written to the document; `None` writes
/// every event.
pub async fn run_timeline(
    config: &Config,
    store: &dyn SnapshotStore,
    now: DateTime<Utc>,
    window_days: Option<u32>,
) -> Result<EventsDocument> {
    let references = store.load_references().await?;
    if references.is_empty() {
        log::warn!("No reference data found; combat and collection events will be omitted");
    }

    let histories = load_histories(config, store).await?;
    let extractor = EventExtractor::new(&references, &config.players);
    let timeline = Timeline::build(&histories, &extractor);

    let document = EventsDocument {
        generated_at: now,
        window_days,
        total_events: timeline.events().len(),
        skipped_pairs: timeline.skipped().to_vec(),
        events: timeline.view(now, window_days),
    };

    let written = store.write_events(&document).await?;
    log::info!(
        "Wrote {} of {} events to {}",
        written.records,
        document.total_events,
        written.location
    );
    if !document.skipped_pairs.is_empty() {
        log::warn!(
            "{} snapshot pairs were skipped",
            document.skipped_pairs.len()
        );
    }

    Ok(document)
}
