use crate::{
    endpoints::EndpointSet, ingress::IngressData, namespace::State, pod::PodData,
    service::ServiceData,
};
use std::{collections::HashSet, net::IpAddr, sync::Arc};

/// A consistent view of one ingress and the resources it routes to, from which proxy
/// configuration is rendered.
#[derive(Clone, Debug, PartialEq)]
pub struct ReconcileData {
    pub ingress: Arc<IngressData>,

    /// Cached services referenced by the ingress, in reference order.
    pub services: Vec<Arc<ServiceData>>,

    /// Cached endpoints of those services, in reference order.
    pub endpoints: Vec<Arc<EndpointSet>>,

    /// Pods whose address appears in `endpoints`, ordered by name.
    pub pods: Vec<Arc<PodData>>,
}

// === impl ReconcileData ===

impl ReconcileData {
    pub(crate) fn join(state: &State, name: &str) -> Option<Self> {
        let ingress = state.ingresses.get(name)?.clone();
        let service_names = state
            .ingress_to_services
            .get(name)
            .map(Vec::as_slice)
            .unwrap_or_default();

        let services = service_names
            .iter()
            .filter_map(|s| state.services.get(s).cloned())
            .collect::<Vec<_>>();
        if services.is_empty() {
            return None;
        }

        let endpoints = service_names
            .iter()
            .filter_map(|s| state.endpoints_by_service.get(s).cloned())
            .collect::<Vec<_>>();

        let addrs = endpoints
            .iter()
            .flat_map(|ep| ep.all_addresses())
            .collect::<HashSet<IpAddr>>();
        let mut pods = state
            .pods
            .values()
            .filter(|pod| pod.ip.is_some_and(|ip| addrs.contains(&ip)))
            .cloned()
            .collect::<Vec<_>>();
        pods.sort_by(|a, b| a.name.cmp(&b.name));

        Some(Self {
            ingress,
            services,
            endpoints,
            pods,
        })
    }

    pub fn service(&self, name: &str) -> Option<&ServiceData> {
        self.services.iter().find(|s| s.name == name).map(|s| &**s)
    }

    pub fn endpoints_for(&self, service: &str) -> Option<&EndpointSet> {
        self.endpoints
            .iter()
            .find(|ep| ep.name == service)
            .map(|ep| &**ep)
    }
}
