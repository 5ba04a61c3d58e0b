//! Per-namespace topology cache.
//!
//! Ingresses, services, pods and endpoints can only refer to resources in their own namespace, so
//! every cross-reference index is scoped to a single namespace. This keeps updates cheap and lets
//! namespaces be processed independently.
//!
//! ```text
//! [ Ingress ] <-> [ Service ] <- [ Endpoints ] <- (address) - [ Pod ]
//! ```
//!
//! The ingress/service link is kept in both directions: `ingress_to_services` and
//! `service_to_ingresses` are exact inverses of each other after every call.

use crate::{
    endpoints::EndpointSet, ingress::IngressData, pod, pod::PodData, reconcile::ReconcileData,
    service::ServiceData, CacheError,
};
use ahash::AHashMap as HashMap;
use ingress_controller_core::NamespacedName;
use ingress_controller_k8s_api::{self as k8s, EventKind};
use parking_lot::Mutex;
use std::{
    collections::{hash_map::Entry, BTreeSet},
    net::IpAddr,
    sync::Arc,
};

/// Holds all cached resources of a single namespace.
///
/// Every method holds the cache's lock for its whole duration, so no partially-applied update is
/// ever observable. Returned collections are copies (or shared immutable snapshots) that callers
/// may keep without holding the lock.
#[derive(Debug)]
pub struct NamespaceCache {
    namespace: Arc<String>,
    state: Mutex<State>,
}

/// Counts of cached resources, by kind.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CacheSizes {
    pub ingresses: usize,
    pub services: usize,
    pub pods: usize,
    pub endpoints: usize,
}

#[derive(Debug, Default)]
pub(crate) struct State {
    pub(crate) ingresses: HashMap<String, Arc<IngressData>>,
    pub(crate) services: HashMap<String, Arc<ServiceData>>,
    pub(crate) pods: HashMap<String, Arc<PodData>>,
    pub(crate) endpoints_by_service: HashMap<String, Arc<EndpointSet>>,

    /// Ready endpoint addresses. When an address is listed by more than one service, the most
    /// recently applied endpoints win.
    pub(crate) endpoints_by_addr: HashMap<IpAddr, Arc<EndpointSet>>,

    /// Service names referenced by each ingress, in the order the ingress references them.
    pub(crate) ingress_to_services: HashMap<String, Vec<String>>,

    /// Ingress names referencing each service. Entries are removed when they become empty.
    pub(crate) service_to_ingresses: HashMap<String, BTreeSet<String>>,
}

// === impl NamespaceCache ===

impl NamespaceCache {
    pub fn new(namespace: impl ToString) -> Self {
        Self {
            namespace: Arc::new(namespace.to_string()),
            state: Mutex::new(State::default()),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Stores or removes an ingress and updates the ingress/service cross-references.
    pub fn apply_ingress(&self, kind: EventKind, ingress: &k8s::Ingress) -> Result<(), CacheError> {
        let name = resource_name(&ingress.metadata, "Ingress")?;
        let (data, service_names) = if kind.is_upsert() {
            let data = IngressData::from_resource(name.clone(), ingress);
            let service_names = data.service_names();
            (Some(Arc::new(data)), service_names)
        } else {
            (None, Vec::new())
        };

        let mut state = self.state.lock();
        let previous = match data {
            Some(data) => {
                state.ingresses.insert(name.clone(), data);
                state
                    .ingress_to_services
                    .insert(name.clone(), service_names.clone())
            }
            None => {
                state.ingresses.remove(&name);
                state.ingress_to_services.remove(&name)
            }
        }
        .unwrap_or_default();

        tracing::debug!(
            namespace = %self.namespace,
            ingress = %name,
            %kind,
            services = ?service_names,
            "Applied ingress"
        );
        state.relink_ingress(&name, &previous, &service_names);
        Ok(())
    }

    /// Stores or removes a service, returning the ingresses that reference it.
    pub fn apply_service(
        &self,
        kind: EventKind,
        service: &k8s::Service,
    ) -> Result<BTreeSet<String>, CacheError> {
        let name = resource_name(&service.metadata, "Service")?;
        let data = kind
            .is_upsert()
            .then(|| Arc::new(ServiceData::from_resource(name.clone(), service)));

        let mut state = self.state.lock();
        match data {
            Some(data) => state.services.insert(name.clone(), data),
            None => state.services.remove(&name),
        };
        tracing::debug!(namespace = %self.namespace, service = %name, %kind, "Applied service");
        Ok(state.ingress_names(&name))
    }

    /// Stores or removes a pod, returning the ingresses that route to the service whose endpoints
    /// include the pod's address.
    ///
    /// Deleted events need not carry the pod's status; the cached pod's address is used instead.
    pub fn apply_pod(
        &self,
        kind: EventKind,
        pod: &k8s::Pod,
    ) -> Result<BTreeSet<String>, CacheError> {
        let name = resource_name(&pod.metadata, "Pod")?;
        let data = kind
            .is_upsert()
            .then(|| Arc::new(PodData::from_resource(name.clone(), pod)));

        let mut state = self.state.lock();
        let ip = match data {
            Some(data) => {
                let ip = data.ip;
                state.pods.insert(name.clone(), data);
                ip
            }
            None => {
                let cached = state.pods.remove(&name);
                pod::pod_ip(&name, pod).or_else(|| cached.and_then(|p| p.ip))
            }
        };
        tracing::debug!(namespace = %self.namespace, pod = %name, %kind, ?ip, "Applied pod");

        Ok(ip
            .map(|ip| state.ingress_names_for_addr(ip))
            .unwrap_or_default())
    }

    /// Stores or removes a service's endpoints and re-indexes their addresses, returning the
    /// ingresses that reference the service.
    pub fn apply_endpoints(
        &self,
        kind: EventKind,
        endpoints: &k8s::Endpoints,
    ) -> Result<BTreeSet<String>, CacheError> {
        let name = resource_name(&endpoints.metadata, "Endpoints")?;
        let data = kind
            .is_upsert()
            .then(|| Arc::new(EndpointSet::from_resource(name.clone(), endpoints)));

        let mut guard = self.state.lock();
        let state = &mut *guard;

        // Clear the addresses indexed for the prior endpoints before indexing the new ones. This
        // also drops addresses another service claimed since.
        if let Some(prior) = state.endpoints_by_service.get(&name) {
            for ip in prior.ready_addresses() {
                state.endpoints_by_addr.remove(&ip);
            }
        }

        match data {
            Some(data) => {
                for ip in data.ready_addresses() {
                    if let Some(other) = state.endpoints_by_addr.insert(ip, data.clone()) {
                        if other.name != name {
                            tracing::debug!(
                                namespace = %self.namespace,
                                %ip,
                                service = %name,
                                previous = %other.name,
                                "Address is listed by multiple services"
                            );
                        }
                    }
                }
                state.endpoints_by_service.insert(name.clone(), data);
            }
            None => {
                state.endpoints_by_service.remove(&name);
            }
        }
        tracing::debug!(namespace = %self.namespace, endpoints = %name, %kind, "Applied endpoints");

        Ok(state.ingress_names(&name))
    }

    /// Lists the keys of all cached ingresses.
    pub fn list_keys(&self) -> BTreeSet<NamespacedName> {
        self.state
            .lock()
            .ingresses
            .keys()
            .map(|name| NamespacedName::new(&*self.namespace, name))
            .collect()
    }

    pub fn has_ingress(&self, name: &str) -> bool {
        self.state.lock().ingresses.contains_key(name)
    }

    /// Lists all cached ingresses, ordered by name.
    pub fn list_ingresses(&self) -> Vec<Arc<IngressData>> {
        let mut ingresses = self
            .state
            .lock()
            .ingresses
            .values()
            .cloned()
            .collect::<Vec<_>>();
        ingresses.sort_by(|a, b| a.name.cmp(&b.name));
        ingresses
    }

    /// Joins an ingress with its related services, endpoints, and pods.
    ///
    /// Returns `None` if the ingress is unknown or none of the services it references are cached
    /// yet; the ingress is not ready to render in either case.
    pub fn lookup(&self, name: &str) -> Option<ReconcileData> {
        let state = self.state.lock();
        let data = ReconcileData::join(&state, name);
        if data.is_none() {
            tracing::debug!(namespace = %self.namespace, ingress = %name, "Not ready to reconcile");
        }
        data
    }

    /// The services an ingress references, in reference order.
    pub fn service_names_for(&self, ingress: &str) -> Vec<String> {
        self.state
            .lock()
            .ingress_to_services
            .get(ingress)
            .cloned()
            .unwrap_or_default()
    }

    /// The ingresses referencing a service.
    pub fn ingress_names_for(&self, service: &str) -> BTreeSet<String> {
        self.state.lock().ingress_names(service)
    }

    /// The service whose endpoints currently claim an address.
    pub fn service_for_addr(&self, ip: IpAddr) -> Option<String> {
        self.state
            .lock()
            .endpoints_by_addr
            .get(&ip)
            .map(|ep| ep.name.clone())
    }

    pub fn sizes(&self) -> CacheSizes {
        let state = self.state.lock();
        CacheSizes {
            ingresses: state.ingresses.len(),
            services: state.services.len(),
            pods: state.pods.len(),
            endpoints: state.endpoints_by_service.len(),
        }
    }

    /// Returns true if the cache does not hold any resources.
    pub fn is_empty(&self) -> bool {
        self.sizes() == CacheSizes::default()
    }

    /// Checks that the ingress/service cross-references are exact inverses.
    #[cfg(test)]
    pub(crate) fn check_links(&self) -> Result<(), String> {
        let state = self.state.lock();
        for (ingress, services) in &state.ingress_to_services {
            for service in services {
                if !state
                    .service_to_ingresses
                    .get(service)
                    .is_some_and(|ingresses| ingresses.contains(ingress))
                {
                    return Err(format!("{service} does not link back to {ingress}"));
                }
            }
        }
        for (service, ingresses) in &state.service_to_ingresses {
            if ingresses.is_empty() {
                return Err(format!("{service} has an empty reverse entry"));
            }
            for ingress in ingresses {
                if !state
                    .ingress_to_services
                    .get(ingress)
                    .is_some_and(|services| services.contains(service))
                {
                    return Err(format!("{ingress} does not link back to {service}"));
                }
            }
        }
        Ok(())
    }
}

// === impl State ===

impl State {
    fn ingress_names(&self, service: &str) -> BTreeSet<String> {
        self.service_to_ingresses
            .get(service)
            .cloned()
            .unwrap_or_default()
    }

    fn ingress_names_for_addr(&self, ip: IpAddr) -> BTreeSet<String> {
        match self.endpoints_by_addr.get(&ip) {
            Some(endpoints) => self.ingress_names(&endpoints.name),
            None => BTreeSet::new(),
        }
    }

    /// Moves an ingress's reverse links from its `previous` services to its `current` ones.
    fn relink_ingress(&mut self, ingress: &str, previous: &[String], current: &[String]) {
        for service in current.iter().filter(|s| !previous.contains(s)) {
            self.service_to_ingresses
                .entry(service.clone())
                .or_default()
                .insert(ingress.to_string());
        }

        for service in previous.iter().filter(|s| !current.contains(s)) {
            if let Entry::Occupied(mut entry) = self.service_to_ingresses.entry(service.clone()) {
                entry.get_mut().remove(ingress);
                if entry.get().is_empty() {
                    entry.remove();
                }
            }
        }
    }
}

fn resource_name(meta: &k8s::ObjectMeta, kind: &'static str) -> Result<String, CacheError> {
    meta.name
        .clone()
        .filter(|name| !name.is_empty())
        .ok_or(CacheError::MissingName { kind })
}
