use ingress_controller_k8s_api as k8s;
use std::{collections::BTreeMap, net::IpAddr};

/// The parts of a `Pod` needed to render destinations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PodData {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub node_name: Option<String>,
    pub phase: Option<String>,

    /// Unset until the pod is scheduled and assigned an address.
    pub ip: Option<IpAddr>,

    pub container_ports: Vec<ContainerPortData>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerPortData {
    pub name: Option<String>,
    pub port: i32,
}

// === impl PodData ===

impl PodData {
    pub(crate) fn from_resource(name: String, pod: &k8s::Pod) -> Self {
        let container_ports = pod
            .spec
            .iter()
            .flat_map(|spec| spec.containers.iter())
            .flat_map(|c| c.ports.iter().flatten())
            .map(|p| ContainerPortData {
                name: p.name.clone(),
                port: p.container_port,
            })
            .collect();

        Self {
            ip: pod_ip(&name, pod),
            labels: pod.metadata.labels.clone().unwrap_or_default(),
            node_name: pod.spec.as_ref().and_then(|spec| spec.node_name.clone()),
            phase: pod.status.as_ref().and_then(|status| status.phase.clone()),
            container_ports,
            name,
        }
    }
}

pub(crate) fn pod_ip(name: &str, pod: &k8s::Pod) -> Option<IpAddr> {
    let ip = pod
        .status
        .as_ref()?
        .pod_ip
        .as_deref()
        .filter(|ip| !ip.is_empty())?;
    match ip.parse() {
        Ok(ip) => Some(ip),
        Err(error) => {
            tracing::warn!(%error, pod = %name, ip, "invalid pod IP");
            None
        }
    }
}
