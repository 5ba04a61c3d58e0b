//! Ingress topology cache
//!
//! Watches the following resources and maintains, per namespace, which services and pods each
//! ingress routes to:
//!
//! - Each `Ingress` references services through its default backend and its rule paths. We keep
//!   the ingress-to-service references and their inverse.
//! - Each `Service` may be referenced by any number of ingresses. When a service changes, every
//!   ingress referencing it must be re-rendered.
//! - Each `Endpoints` lists the addresses backing a service. We index endpoints both by service
//!   name and by address.
//! - Each `Pod` is linked to a service through its address. When a pod changes, the ingresses
//!   referencing that service must be re-rendered.
//!
//! ```text
//! [ Ingress ] <-> [ Service ] <- [ Endpoints ] <- [ Pod ]
//! ```
//!
//! Every update returns the names of the ingresses it affects; the cluster-wide [`Index`] publishes
//! these on a reconcile queue. The reconciler then calls [`Index::lookup`] to obtain a
//! [`ReconcileData`] bundle that joins an ingress with its related resources.
//!
//! These resources cannot reference resources in other namespaces, so all indices are scoped
//! within a [`NamespaceCache`].

#![deny(rust_2018_idioms)]
#![forbid(unsafe_code)]

mod endpoints;
mod index;
mod ingress;
pub mod metrics;
mod namespace;
mod pod;
mod reconcile;
mod service;

#[cfg(test)]
mod tests;

pub use self::{
    endpoints::{EndpointAddressData, EndpointPortData, EndpointSet, EndpointSubsetData},
    index::{Index, ReconcileRx, SharedIndex},
    ingress::{Backend, IngressData, Path, Rule},
    namespace::{CacheSizes, NamespaceCache},
    pod::{ContainerPortData, PodData},
    reconcile::ReconcileData,
    service::{PortRef, ServiceData, ServicePortData},
};

/// Rejects a watch event that cannot be applied.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("{kind} resource must have a name")]
    MissingName { kind: &'static str },
}
