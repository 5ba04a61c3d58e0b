mod reconcile;

use crate::NamespaceCache;
use ingress_controller_k8s_api::{
    self as k8s, EndpointAddress, EndpointSubset, HTTPIngressPath, HTTPIngressRuleValue,
    IngressBackend, IngressRule, IngressServiceBackend, ServiceBackendPort,
};
use std::sync::Arc;
use tracing::Level;

struct TestConfig {
    cache: Arc<NamespaceCache>,
    _tracing: tracing::subscriber::DefaultGuard,
}

impl Default for TestConfig {
    fn default() -> Self {
        let _tracing = tracing::subscriber::set_default(
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_max_level(Level::TRACE)
                .finish(),
        );
        Self {
            cache: Arc::new(NamespaceCache::new("ns-0")),
            _tracing,
        }
    }
}

impl TestConfig {
    fn check_links(&self) {
        if let Err(error) = self.cache.check_links() {
            panic!("cross-references are not symmetric: {error}");
        }
    }
}

fn mk_meta(ns: impl ToString, name: impl ToString) -> k8s::ObjectMeta {
    k8s::ObjectMeta {
        namespace: Some(ns.to_string()),
        name: Some(name.to_string()),
        ..Default::default()
    }
}

fn mk_backend(service: impl ToString) -> IngressBackend {
    IngressBackend {
        service: Some(IngressServiceBackend {
            name: service.to_string(),
            port: Some(ServiceBackendPort {
                number: Some(80),
                ..Default::default()
            }),
        }),
        ..Default::default()
    }
}

/// Builds an ingress with an optional default backend and one path per rule service.
fn mk_ingress<'s>(
    ns: impl ToString,
    name: impl ToString,
    default_backend: Option<&str>,
    services: impl IntoIterator<Item = &'s str>,
) -> k8s::Ingress {
    let paths = services
        .into_iter()
        .map(|svc| HTTPIngressPath {
            path: Some(format!("/{svc}")),
            path_type: "Prefix".to_string(),
            backend: mk_backend(svc),
        })
        .collect();

    k8s::Ingress {
        metadata: mk_meta(ns, name),
        spec: Some(k8s::IngressSpec {
            default_backend: default_backend.map(mk_backend),
            rules: Some(vec![IngressRule {
                host: Some("example.com".to_string()),
                http: Some(HTTPIngressRuleValue { paths }),
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn mk_service(ns: impl ToString, name: impl ToString) -> k8s::Service {
    k8s::Service {
        metadata: mk_meta(ns, name),
        spec: Some(k8s::ServiceSpec {
            ports: Some(vec![k8s::ServicePort {
                name: Some("http".to_string()),
                port: 80,
                ..Default::default()
            }]),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn mk_pod(ns: impl ToString, name: impl ToString, ip: Option<&str>) -> k8s::Pod {
    k8s::Pod {
        metadata: mk_meta(ns, name),
        status: Some(k8s::PodStatus {
            pod_ip: ip.map(ToString::to_string),
            phase: Some("Running".to_string()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn mk_endpoints<'a>(
    ns: impl ToString,
    name: impl ToString,
    ips: impl IntoIterator<Item = &'a str>,
) -> k8s::Endpoints {
    let addresses = ips
        .into_iter()
        .map(|ip| EndpointAddress {
            ip: ip.to_string(),
            ..Default::default()
        })
        .collect();
    k8s::Endpoints {
        metadata: mk_meta(ns, name),
        subsets: Some(vec![EndpointSubset {
            addresses: Some(addresses),
            ports: Some(vec![k8s::EndpointPort {
                port: 8080,
                ..Default::default()
            }]),
            ..Default::default()
        }]),
    }
}
