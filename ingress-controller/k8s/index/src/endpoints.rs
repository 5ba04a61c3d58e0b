use ingress_controller_k8s_api::{self as k8s, EndpointAddress};
use std::net::IpAddr;

/// The current addresses backing a service, keyed by the service's name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointSet {
    pub name: String,
    pub subsets: Vec<EndpointSubsetData>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EndpointSubsetData {
    pub addresses: Vec<EndpointAddressData>,
    pub not_ready_addresses: Vec<EndpointAddressData>,
    pub ports: Vec<EndpointPortData>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointAddressData {
    pub ip: IpAddr,
    pub node_name: Option<String>,

    /// The name of the pod backing this address, if the address refers to one.
    pub pod_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EndpointPortData {
    pub name: Option<String>,
    pub port: i32,
    pub protocol: Option<String>,
}

// === impl EndpointSet ===

impl EndpointSet {
    pub(crate) fn from_resource(name: String, endpoints: &k8s::Endpoints) -> Self {
        let subsets = endpoints
            .subsets
            .iter()
            .flatten()
            .map(|subset| EndpointSubsetData {
                addresses: addresses(&name, subset.addresses.as_deref()),
                not_ready_addresses: addresses(&name, subset.not_ready_addresses.as_deref()),
                ports: subset
                    .ports
                    .iter()
                    .flatten()
                    .map(|p| EndpointPortData {
                        name: p.name.clone(),
                        port: p.port,
                        protocol: p.protocol.clone(),
                    })
                    .collect(),
            })
            .collect();
        Self { name, subsets }
    }

    /// Addresses that are ready to receive traffic.
    pub fn ready_addresses(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.subsets
            .iter()
            .flat_map(|s| s.addresses.iter().map(|a| a.ip))
    }

    /// Both ready and not-ready addresses.
    pub fn all_addresses(&self) -> impl Iterator<Item = IpAddr> + '_ {
        self.subsets.iter().flat_map(|s| {
            s.addresses
                .iter()
                .chain(s.not_ready_addresses.iter())
                .map(|a| a.ip)
        })
    }
}

fn addresses(service: &str, addrs: Option<&[EndpointAddress]>) -> Vec<EndpointAddressData> {
    addrs
        .unwrap_or_default()
        .iter()
        .filter_map(|addr| match addr.ip.parse() {
            Ok(ip) => Some(EndpointAddressData {
                ip,
                node_name: addr.node_name.clone(),
                pod_name: addr
                    .target_ref
                    .as_ref()
                    .filter(|r| r.kind.as_deref() == Some("Pod"))
                    .and_then(|r| r.name.clone()),
            }),
            Err(error) => {
                tracing::warn!(%error, endpoints = %service, ip = %addr.ip, "invalid endpoint address");
                None
            }
        })
        .collect()
}
