//! Live backend instances as seen by the request-routing layer.
//!
//! Health probing and request forwarding happen elsewhere; this module only models the state they
//! publish: when a destination last became healthy, and how many requests it is currently serving.

use chrono::{offset::Utc, DateTime};
use parking_lot::RwLock;
use std::{
    net::SocketAddr,
    sync::atomic::{AtomicUsize, Ordering},
};

/// A backend instance eligible to receive proxied requests.
#[derive(Debug)]
pub struct DestinationState {
    id: String,
    addr: SocketAddr,
    health: DestinationHealth,
    concurrent_requests: AtomicUsize,
}

/// Health signal of a destination, as published by the health checker.
#[derive(Debug, Default)]
pub struct DestinationHealth {
    last_healthy_transition: RwLock<Option<DateTime<Utc>>>,
}

/// Decrements a destination's in-flight counter when dropped.
#[must_use = "the request is no longer counted once the guard is dropped"]
#[derive(Debug)]
pub struct RequestGuard<'d> {
    destination: &'d DestinationState,
}

// === impl DestinationState ===

impl DestinationState {
    pub fn new(id: impl ToString, addr: SocketAddr) -> Self {
        Self {
            id: id.to_string(),
            addr,
            health: DestinationHealth::default(),
            concurrent_requests: AtomicUsize::new(0),
        }
    }

    /// Builds a destination that became healthy at `at`.
    pub fn healthy_since(id: impl ToString, addr: SocketAddr, at: DateTime<Utc>) -> Self {
        let dst = Self::new(id, addr);
        dst.health.mark_healthy(at);
        dst
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn health(&self) -> &DestinationHealth {
        &self.health
    }

    pub fn concurrent_request_count(&self) -> usize {
        self.concurrent_requests.load(Ordering::Relaxed)
    }

    /// Counts a request against this destination until the returned guard is dropped.
    pub fn start_request(&self) -> RequestGuard<'_> {
        self.concurrent_requests.fetch_add(1, Ordering::Relaxed);
        RequestGuard { destination: self }
    }
}

// === impl DestinationHealth ===

impl DestinationHealth {
    /// The last time the destination transitioned into the healthy state, if ever observed.
    pub fn last_healthy_transition(&self) -> Option<DateTime<Utc>> {
        *self.last_healthy_transition.read()
    }

    pub fn mark_healthy(&self, at: DateTime<Utc>) {
        *self.last_healthy_transition.write() = Some(at);
    }

    /// Forgets the last transition, so the destination is treated as fully ramped.
    pub fn clear(&self) {
        *self.last_healthy_transition.write() = None;
    }
}

// === impl RequestGuard ===

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        self.destination
            .concurrent_requests
            .fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_guard_tracks_in_flight_requests() {
        let dst = DestinationState::new("dst-0", "192.0.2.1:8080".parse().unwrap());
        assert_eq!(dst.concurrent_request_count(), 0);

        let first = dst.start_request();
        let second = dst.start_request();
        assert_eq!(dst.concurrent_request_count(), 2);

        drop(first);
        assert_eq!(dst.concurrent_request_count(), 1);
        drop(second);
        assert_eq!(dst.concurrent_request_count(), 0);
    }

    #[test]
    fn health_transitions() {
        let dst = DestinationState::new("dst-0", "192.0.2.1:8080".parse().unwrap());
        assert_eq!(dst.health().last_healthy_transition(), None);

        let now = Utc::now();
        dst.health().mark_healthy(now);
        assert_eq!(dst.health().last_healthy_transition(), Some(now));

        dst.health().clear();
        assert_eq!(dst.health().last_healthy_transition(), None);
    }
}
