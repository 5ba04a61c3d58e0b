use super::{DestinationWeights, SLOW_START_WINDOW};
use crate::DestinationState;
use chrono::{offset::Utc, DateTime};
use rand::{Rng, RngCore};
use std::{sync::Arc, time::Duration};

/// Draws an index with probability proportional to its weight.
///
/// Returns `None` for an empty table. When every weight is zero no draw happens and the last entry
/// is chosen; the last entry is also the fallback if the walk runs off the end of the table.
pub fn pick_index(weights: &DestinationWeights<'_>, rng: &mut dyn RngCore) -> Option<usize> {
    let last = weights.len().checked_sub(1)?;
    if weights.total() == 0 {
        tracing::trace!(last, "All destinations have zero weight");
        return Some(last);
    }

    let mut remainder = rng.gen_range(0..weights.total());
    for (idx, (_, weight)) in weights.iter().take(last).enumerate() {
        let weight = u64::from(weight);
        if remainder < weight {
            return Some(idx);
        }
        remainder -= weight;
    }
    Some(last)
}

/// Weighs destinations and draws from them.
#[derive(Clone, Copy, Debug)]
pub struct SlowStartSelector {
    window: Duration,
}

// === impl SlowStartSelector ===

impl Default for SlowStartSelector {
    fn default() -> Self {
        Self::new(SLOW_START_WINDOW)
    }
}

impl SlowStartSelector {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    pub fn compute_weights<'d>(
        &self,
        available: &'d [Arc<DestinationState>],
        now: DateTime<Utc>,
    ) -> DestinationWeights<'d> {
        DestinationWeights::compute(available, now, self.window)
    }

    /// Makes a single weighted draw over all available destinations.
    pub fn pick_random_destination<'d>(
        &self,
        available: &'d [Arc<DestinationState>],
        now: DateTime<Utc>,
        rng: &mut dyn RngCore,
    ) -> Option<&'d Arc<DestinationState>> {
        if available.is_empty() {
            return None;
        }

        let weights = self.compute_weights(available, now);
        let idx = pick_index(&weights, rng)?;
        tracing::trace!(
            destination = %available[idx].id(),
            weight = weights.weight(idx),
            total = weights.total(),
            "Picked destination"
        );
        Some(&available[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use rand::{rngs::StdRng, SeedableRng};

    fn dsts(now: DateTime<Utc>, healthy_for: &[Option<i64>]) -> Vec<Arc<DestinationState>> {
        healthy_for
            .iter()
            .enumerate()
            .map(|(i, secs)| {
                let dst = DestinationState::new(
                    format!("dst-{i}"),
                    format!("192.0.2.{}:8080", i + 1).parse().unwrap(),
                );
                if let Some(secs) = secs {
                    dst.health().mark_healthy(now - TimeDelta::seconds(*secs));
                }
                Arc::new(dst)
            })
            .collect()
    }

    #[test]
    fn zero_total_picks_last() {
        let now = Utc::now();
        let dsts = dsts(now, &[Some(0), Some(0), Some(0)]);
        let weights = DestinationWeights::compute(&dsts, now, SLOW_START_WINDOW);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(pick_index(&weights, &mut rng), Some(2));
    }

    #[test]
    fn zero_weight_entries_are_skipped() {
        let now = Utc::now();
        let dsts = dsts(now, &[Some(0), None, Some(0)]);
        let weights = DestinationWeights::compute(&dsts, now, SLOW_START_WINDOW);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..1_000 {
            assert_eq!(pick_index(&weights, &mut rng), Some(1));
        }
    }

    #[test]
    fn empty_table_picks_nothing() {
        let weights = DestinationWeights::compute(&[], Utc::now(), SLOW_START_WINDOW);
        assert_eq!(pick_index(&weights, &mut StdRng::seed_from_u64(0)), None);
    }

    #[test]
    fn single_destination() {
        let now = Utc::now();
        let dsts = dsts(now, &[Some(3)]);
        let weights = DestinationWeights::compute(&dsts, now, SLOW_START_WINDOW);
        assert_eq!(pick_index(&weights, &mut StdRng::seed_from_u64(1)), Some(0));
    }

    #[test]
    fn every_index_is_reachable() {
        let now = Utc::now();
        let dsts = dsts(now, &[Some(10), Some(20), Some(30), None]);
        let weights = DestinationWeights::compute(&dsts, now, SLOW_START_WINDOW);
        let mut rng = StdRng::seed_from_u64(42);
        let mut seen = [0usize; 4];
        for _ in 0..10_000 {
            let idx = pick_index(&weights, &mut rng).expect("weights are not empty");
            seen[idx] += 1;
        }
        assert!(seen.iter().all(|n| *n > 0), "{seen:?}");
        // The fully-ramped destination receives the largest share.
        assert!(seen[3] > seen[2] && seen[2] > seen[1] && seen[1] > seen[0], "{seen:?}");
    }

    #[test]
    fn selector_rejects_empty_list() {
        let selector = SlowStartSelector::default();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(selector
            .pick_random_destination(&[], Utc::now(), &mut rng)
            .is_none());
    }
}
