use super::{pick_index, LoadBalancingPolicy, SlowStartSelector};
use crate::DestinationState;
use chrono::{offset::Utc, DateTime};
use rand::RngCore;
use std::{sync::Arc, time::Duration};

/// Bounds the number of draws spent looking for a second candidate distinct from the first.
pub const MAX_DISTINCT_DRAWS: usize = 32;

/// Picks a destination with probability proportional to its slow-start weight.
#[derive(Clone, Copy, Debug, Default)]
pub struct SlowStart {
    selector: SlowStartSelector,
}

/// Same draw as [`SlowStart`], exposed under its own policy name.
#[derive(Clone, Copy, Debug, Default)]
pub struct SlowStartRandom {
    selector: SlowStartSelector,
}

/// Samples two distinct destinations by slow-start weight and picks the less loaded one.
///
/// Load is compared as in-flight requests scaled by the other candidate's weight, so a destination
/// that is still ramping up is not chosen merely because it has few requests.
#[derive(Clone, Copy, Debug, Default)]
pub struct SlowStartPowerOfTwoChoices {
    selector: SlowStartSelector,
}

// === impl SlowStart ===

impl SlowStart {
    pub const NAME: &'static str = "SlowStart";

    pub fn with_window(window: Duration) -> Self {
        Self {
            selector: SlowStartSelector::new(window),
        }
    }
}

impl LoadBalancingPolicy for SlowStart {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn pick_destination<'d>(
        &self,
        available: &'d [Arc<DestinationState>],
        now: DateTime<Utc>,
        rng: &mut dyn RngCore,
    ) -> Option<&'d Arc<DestinationState>> {
        self.selector.pick_random_destination(available, now, rng)
    }
}

// === impl SlowStartRandom ===

impl SlowStartRandom {
    pub const NAME: &'static str = "SlowStartRandom";

    pub fn with_window(window: Duration) -> Self {
        Self {
            selector: SlowStartSelector::new(window),
        }
    }
}

impl LoadBalancingPolicy for SlowStartRandom {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn pick_destination<'d>(
        &self,
        available: &'d [Arc<DestinationState>],
        now: DateTime<Utc>,
        rng: &mut dyn RngCore,
    ) -> Option<&'d Arc<DestinationState>> {
        self.selector.pick_random_destination(available, now, rng)
    }
}

// === impl SlowStartPowerOfTwoChoices ===

impl SlowStartPowerOfTwoChoices {
    pub const NAME: &'static str = "SlowStartPowerOfTwoChoices";

    pub fn with_window(window: Duration) -> Self {
        Self {
            selector: SlowStartSelector::new(window),
        }
    }
}

impl LoadBalancingPolicy for SlowStartPowerOfTwoChoices {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn pick_destination<'d>(
        &self,
        available: &'d [Arc<DestinationState>],
        now: DateTime<Utc>,
        rng: &mut dyn RngCore,
    ) -> Option<&'d Arc<DestinationState>> {
        match available {
            [] => return None,
            [only] => return Some(only),
            _ => {}
        }

        let weights = self.selector.compute_weights(available, now);
        let first = pick_index(&weights, rng)?;
        let Some(second) = (0..MAX_DISTINCT_DRAWS)
            .filter_map(|_| pick_index(&weights, rng))
            .find(|idx| *idx != first)
        else {
            // Only reachable when the weights leave a single destination drawable (e.g. every
            // other weight is zero). Treat it as a tie.
            tracing::debug!(
                destination = %available[first].id(),
                "No distinct second candidate drawn"
            );
            return Some(&available[first]);
        };

        let first_weight = u64::from(weights.weight(first));
        let second_weight = u64::from(weights.weight(second));
        let first_count = available[first].concurrent_request_count() as u64;
        let second_count = available[second].concurrent_request_count() as u64;

        let first_adjusted = first_count.saturating_mul(second_weight);
        let second_adjusted = second_count.saturating_mul(first_weight);
        tracing::trace!(
            first = %available[first].id(),
            second = %available[second].id(),
            first_adjusted,
            second_adjusted,
            "Comparing candidates"
        );

        if first_adjusted <= second_adjusted {
            Some(&available[first])
        } else {
            Some(&available[second])
        }
    }
}
