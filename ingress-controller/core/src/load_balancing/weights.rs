use crate::DestinationState;
use chrono::{offset::Utc, DateTime};
use std::{sync::Arc, time::Duration};

/// The default time it takes a newly-healthy destination to receive its full share of traffic.
pub const SLOW_START_WINDOW: Duration = Duration::from_secs(200);

/// An ordered table of destination weights.
///
/// Entries are in the same order as the destinations they were computed from; selection indexes
/// into the table positionally.
#[derive(Debug)]
pub struct DestinationWeights<'d> {
    entries: Vec<(&'d Arc<DestinationState>, u32)>,
    total: u64,
}

// === impl DestinationWeights ===

impl<'d> DestinationWeights<'d> {
    /// Weighs each destination by the whole seconds elapsed since it last became healthy, capped at
    /// `window`. An empty destination list yields an empty table.
    pub fn compute(
        destinations: &'d [Arc<DestinationState>],
        now: DateTime<Utc>,
        window: Duration,
    ) -> Self {
        let window = u32::try_from(window.as_secs()).unwrap_or(u32::MAX);

        let entries = destinations
            .iter()
            .map(|dst| {
                let since = dst.health().last_healthy_transition();
                (dst, weight(since, now, window))
            })
            .collect::<Vec<_>>();
        let total = entries.iter().map(|(_, w)| u64::from(*w)).sum();

        Self { entries, total }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn weight(&self, idx: usize) -> u32 {
        self.entries[idx].1
    }

    pub fn destination(&self, idx: usize) -> &'d Arc<DestinationState> {
        self.entries[idx].0
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'d Arc<DestinationState>, u32)> + '_ {
        self.entries.iter().copied()
    }
}

fn weight(last_healthy: Option<DateTime<Utc>>, now: DateTime<Utc>, window: u32) -> u32 {
    match last_healthy {
        None => window,
        // A transition in the future (clock skew) counts as just-healthy.
        Some(at) => (now - at).num_seconds().clamp(0, i64::from(window)) as u32,
    }
}
