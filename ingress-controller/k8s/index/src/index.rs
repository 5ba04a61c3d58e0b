//! Routes watch events to per-namespace caches and publishes the keys of ingresses that need to be
//! reconciled.
//!
//! `kubert` does not distinguish added from modified resources, so every `apply` is treated as a
//! modification; deletions carry only the resource's identity.

use crate::{namespace::NamespaceCache, reconcile::ReconcileData, CacheError};
use ahash::AHashMap as HashMap;
use ingress_controller_core::NamespacedName;
use ingress_controller_k8s_api::{self as k8s, EventKind, Resource, ResourceExt};
use parking_lot::RwLock;
use std::{collections::BTreeSet, sync::Arc};
use tokio::sync::mpsc;

pub type SharedIndex = Arc<RwLock<Index>>;

/// Receives the keys of ingresses whose rendered configuration may be stale.
pub type ReconcileRx = mpsc::UnboundedReceiver<NamespacedName>;

/// Holds a topology cache for each namespace with cached resources.
#[derive(Debug)]
pub struct Index {
    namespaces: HashMap<String, Arc<NamespaceCache>>,
    reconcile_tx: mpsc::UnboundedSender<NamespacedName>,
}

type Apply<R> = fn(&NamespaceCache, EventKind, &R) -> Result<BTreeSet<String>, CacheError>;

// === impl Index ===

impl Index {
    pub fn shared() -> (SharedIndex, ReconcileRx) {
        let (reconcile_tx, reconcile_rx) = mpsc::unbounded_channel();
        let index = Self {
            namespaces: HashMap::default(),
            reconcile_tx,
        };
        (Arc::new(RwLock::new(index)), reconcile_rx)
    }

    pub fn namespace(&self, namespace: &str) -> Option<Arc<NamespaceCache>> {
        self.namespaces.get(namespace).cloned()
    }

    pub(crate) fn namespaces(&self) -> impl Iterator<Item = (&String, &Arc<NamespaceCache>)> {
        self.namespaces.iter()
    }

    /// Lists the keys of every cached ingress, e.g. to re-render all configuration.
    pub fn keys(&self) -> BTreeSet<NamespacedName> {
        self.namespaces
            .values()
            .flat_map(|ns| ns.list_keys())
            .collect()
    }

    pub fn lookup(&self, key: &NamespacedName) -> Option<ReconcileData> {
        self.namespaces.get(&key.namespace)?.lookup(&key.name)
    }

    fn ns_or_default(&mut self, namespace: &str) -> Arc<NamespaceCache> {
        self.namespaces
            .entry(namespace.to_string())
            .or_insert_with(|| Arc::new(NamespaceCache::new(namespace)))
            .clone()
    }

    fn update<R>(&mut self, namespace: String, kind: EventKind, resource: &R, apply: Apply<R>) {
        let cache = self.ns_or_default(&namespace);
        match apply(&cache, kind, resource) {
            Ok(affected) => {
                for name in affected {
                    let key = NamespacedName {
                        namespace: namespace.clone(),
                        name,
                    };
                    tracing::trace!(%key, "Queueing reconcile");
                    if self.reconcile_tx.send(key).is_err() {
                        tracing::debug!("Reconcile queue closed");
                        break;
                    }
                }
            }
            Err(error) => tracing::warn!(%error, %namespace, "Ignoring resource"),
        }

        if cache.is_empty() {
            tracing::debug!(%namespace, "Removing empty namespace cache");
            self.namespaces.remove(&namespace);
        }
    }

    fn apply_resource<R: ResourceExt>(&mut self, resource: R, apply: Apply<R>) {
        match resource.namespace() {
            Some(namespace) => self.update(namespace, EventKind::Modified, &resource, apply),
            None => {
                tracing::warn!(name = %resource.name_any(), "Ignoring resource without a namespace")
            }
        }
    }

    fn delete_resource<R>(&mut self, namespace: String, name: String, apply: Apply<R>)
    where
        R: Resource + Default,
    {
        let mut resource = R::default();
        *resource.meta_mut() = k8s::ObjectMeta {
            namespace: Some(namespace.clone()),
            name: Some(name),
            ..Default::default()
        };
        self.update(namespace, EventKind::Deleted, &resource, apply)
    }
}

fn apply_ingress(
    cache: &NamespaceCache,
    kind: EventKind,
    ingress: &k8s::Ingress,
) -> Result<BTreeSet<String>, CacheError> {
    cache.apply_ingress(kind, ingress)?;
    // The ingress itself always needs to be re-rendered (or removed).
    Ok(ingress.metadata.name.iter().cloned().collect())
}

impl kubert::index::IndexNamespacedResource<k8s::Ingress> for Index {
    fn apply(&mut self, ingress: k8s::Ingress) {
        self.apply_resource(ingress, apply_ingress)
    }

    fn delete(&mut self, namespace: String, name: String) {
        self.delete_resource::<k8s::Ingress>(namespace, name, apply_ingress)
    }
}

impl kubert::index::IndexNamespacedResource<k8s::Service> for Index {
    fn apply(&mut self, service: k8s::Service) {
        self.apply_resource(service, NamespaceCache::apply_service)
    }

    fn delete(&mut self, namespace: String, name: String) {
        self.delete_resource::<k8s::Service>(namespace, name, NamespaceCache::apply_service)
    }
}

impl kubert::index::IndexNamespacedResource<k8s::Pod> for Index {
    fn apply(&mut self, pod: k8s::Pod) {
        self.apply_resource(pod, NamespaceCache::apply_pod)
    }

    fn delete(&mut self, namespace: String, name: String) {
        self.delete_resource::<k8s::Pod>(namespace, name, NamespaceCache::apply_pod)
    }
}

impl kubert::index::IndexNamespacedResource<k8s::Endpoints> for Index {
    fn apply(&mut self, endpoints: k8s::Endpoints) {
        self.apply_resource(endpoints, NamespaceCache::apply_endpoints)
    }

    fn delete(&mut self, namespace: String, name: String) {
        self.delete_resource::<k8s::Endpoints>(namespace, name, NamespaceCache::apply_endpoints)
    }
}
