use ingress_controller_k8s_api::{self as k8s, IntOrString};
use std::collections::BTreeMap;

/// The parts of a `Service` needed to render clusters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceData {
    pub name: String,
    pub service_type: Option<String>,
    pub cluster_ip: Option<String>,
    pub external_name: Option<String>,
    pub selector: BTreeMap<String, String>,
    pub ports: Vec<ServicePortData>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServicePortData {
    pub name: Option<String>,
    pub port: i32,
    pub target_port: Option<PortRef>,
    pub protocol: Option<String>,
}

/// Refers to a port by number or by name.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum PortRef {
    Number(i32),
    Name(String),
}

// === impl ServiceData ===

impl ServiceData {
    pub(crate) fn from_resource(name: String, service: &k8s::Service) -> Self {
        let spec = service.spec.as_ref();
        let ports = spec
            .and_then(|spec| spec.ports.as_ref())
            .into_iter()
            .flatten()
            .map(|port| ServicePortData {
                name: port.name.clone(),
                port: port.port,
                target_port: port.target_port.as_ref().map(|tp| match tp {
                    IntOrString::Int(n) => PortRef::Number(*n),
                    IntOrString::String(s) => PortRef::Name(s.clone()),
                }),
                protocol: port.protocol.clone(),
            })
            .collect();

        Self {
            name,
            service_type: spec.and_then(|spec| spec.type_.clone()),
            cluster_ip: spec
                .and_then(|spec| spec.cluster_ip.clone())
                .filter(|ip| !ip.is_empty() && ip != "None"),
            external_name: spec.and_then(|spec| spec.external_name.clone()),
            selector: spec
                .and_then(|spec| spec.selector.clone())
                .unwrap_or_default(),
            ports,
        }
    }

    /// Finds a port by its name or number, as an ingress backend refers to it.
    pub fn port(&self, port: &PortRef) -> Option<&ServicePortData> {
        self.ports.iter().find(|p| match port {
            PortRef::Number(n) => p.port == *n,
            PortRef::Name(name) => p.name.as_deref() == Some(name.as_str()),
        })
    }
}
