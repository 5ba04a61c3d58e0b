//! Slow-start destination selection.
//!
//! A destination that recently became healthy is weighted by the number of seconds it has been
//! healthy, up to a fixed window, so that traffic ramps up gradually instead of hitting a cold
//! instance with its full share at once. Destinations with no recorded transition are considered
//! fully ramped.
//!
//! ```text
//! [ available destinations ] -> [ DestinationWeights ] -> [ pick_index ] -> [ policy ] -> destination
//! ```

mod policy;
mod selector;
mod weights;

pub use self::{
    policy::{SlowStart, SlowStartPowerOfTwoChoices, SlowStartRandom, MAX_DISTINCT_DRAWS},
    selector::{pick_index, SlowStartSelector},
    weights::{DestinationWeights, SLOW_START_WINDOW},
};
use crate::DestinationState;
use chrono::{offset::Utc, DateTime};
use rand::RngCore;
use std::sync::Arc;

/// Chooses one of a cluster's available destinations for a request.
///
/// Implementations are stateless: every call computes its answer from the given destinations, the
/// current time, and the random source.
pub trait LoadBalancingPolicy: Send + Sync {
    /// The name proxy configuration uses to refer to this policy.
    fn name(&self) -> &'static str;

    /// Returns `None` when there is nothing to route to.
    fn pick_destination<'d>(
        &self,
        available: &'d [Arc<DestinationState>],
        now: DateTime<Utc>,
        rng: &mut dyn RngCore,
    ) -> Option<&'d Arc<DestinationState>>;
}

/// Resolves a slow-start policy by name, using the default window.
pub fn policy_for_name(name: &str) -> Option<Box<dyn LoadBalancingPolicy>> {
    match name {
        SlowStart::NAME => Some(Box::<SlowStart>::default()),
        SlowStartRandom::NAME => Some(Box::<SlowStartRandom>::default()),
        SlowStartPowerOfTwoChoices::NAME => Some(Box::<SlowStartPowerOfTwoChoices>::default()),
        _ => None,
    }
}
