//! Drains the reconcile queue, re-joining each affected ingress with its related resources.
//!
//! Rendering proxy configuration from a [`ReconcileData`] bundle happens downstream; here we
//! resolve the bundle and report whether the ingress is ready.

use crate::{
    core::NamespacedName,
    index::{ReconcileData, ReconcileRx, SharedIndex},
};
use std::collections::BTreeSet;

/// The outcome of resolving a queued key against the index.
#[derive(Debug, PartialEq)]
enum Resolved {
    Ready(ReconcileData),
    /// The ingress is cached but none of its services are known yet.
    Pending,
    Removed,
}

pub(crate) async fn run(index: SharedIndex, mut rx: ReconcileRx) {
    while let Some(key) = rx.recv().await {
        for key in next_batch(key, &mut rx) {
            match resolve(&index, &key) {
                Resolved::Ready(data) => tracing::info!(
                    %key,
                    services = data.services.len(),
                    endpoints = data.endpoints.len(),
                    pods = data.pods.len(),
                    "Ingress is ready"
                ),
                Resolved::Pending => tracing::debug!(%key, "Waiting for services"),
                Resolved::Removed => tracing::info!(%key, "Ingress removed"),
            }
        }
    }
    tracing::debug!("Reconcile queue closed");
}

/// Coalesces the keys that are already queued, since a single watch event may affect the same
/// ingress several times.
fn next_batch(first: NamespacedName, rx: &mut ReconcileRx) -> BTreeSet<NamespacedName> {
    let mut keys = BTreeSet::from([first]);
    while let Ok(key) = rx.try_recv() {
        keys.insert(key);
    }
    keys
}

fn resolve(index: &SharedIndex, key: &NamespacedName) -> Resolved {
    let index = index.read();
    if let Some(data) = index.lookup(key) {
        return Resolved::Ready(data);
    }
    let cached = index
        .namespace(&key.namespace)
        .is_some_and(|ns| ns.has_ingress(&key.name));
    if cached {
        Resolved::Pending
    } else {
        Resolved::Removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{index::Index, k8s};
    use kubert::index::IndexNamespacedResource;

    fn mk_meta(ns: &str, name: &str) -> k8s::ObjectMeta {
        k8s::ObjectMeta {
            namespace: Some(ns.to_string()),
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    fn mk_ingress(ns: &str, name: &str, service: &str) -> k8s::Ingress {
        k8s::Ingress {
            metadata: mk_meta(ns, name),
            spec: Some(k8s::IngressSpec {
                default_backend: Some(k8s::IngressBackend {
                    service: Some(k8s::IngressServiceBackend {
                        name: service.to_string(),
                        port: None,
                    }),
                    ..Default::default()
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn mk_service(ns: &str, name: &str) -> k8s::Service {
        k8s::Service {
            metadata: mk_meta(ns, name),
            ..Default::default()
        }
    }

    #[test]
    fn coalesces_queued_keys() {
        let (index, mut rx) = Index::shared();
        index.write().apply(mk_ingress("ns-0", "web", "svc-a"));
        index.write().apply(mk_ingress("ns-0", "api", "svc-a"));
        index.write().apply(mk_service("ns-0", "svc-a"));

        let first = rx.try_recv().expect("a key must be queued");
        let batch = next_batch(first, &mut rx);
        assert_eq!(
            batch.into_iter().collect::<Vec<_>>(),
            vec![
                NamespacedName::new("ns-0", "api"),
                NamespacedName::new("ns-0", "web"),
            ],
        );
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn resolves_readiness() {
        let (index, _rx) = Index::shared();
        let key = NamespacedName::new("ns-0", "web");

        index.write().apply(mk_ingress("ns-0", "web", "svc-a"));
        assert_eq!(resolve(&index, &key), Resolved::Pending);

        index.write().apply(mk_service("ns-0", "svc-a"));
        assert!(matches!(resolve(&index, &key), Resolved::Ready(_)));

        IndexNamespacedResource::<k8s::Ingress>::delete(
            &mut *index.write(),
            "ns-0".to_string(),
            "web".to_string(),
        );
        assert_eq!(resolve(&index, &key), Resolved::Removed);
    }
}
