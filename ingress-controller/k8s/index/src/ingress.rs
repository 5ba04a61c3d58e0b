use crate::service::PortRef;
use ingress_controller_k8s_api::{self as k8s, IngressBackend};
use std::collections::BTreeMap;

/// The parts of an `Ingress` needed to render routes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IngressData {
    pub name: String,
    pub class_name: Option<String>,
    pub annotations: BTreeMap<String, String>,
    pub default_backend: Option<Backend>,
    pub rules: Vec<Rule>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rule {
    pub host: Option<String>,
    pub paths: Vec<Path>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    pub path: Option<String>,
    pub path_type: String,
    pub backend: Backend,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Backend {
    Service { name: String, port: Option<PortRef> },

    /// A reference to a non-service object. Contributes no service name.
    Resource { kind: String, name: String },
}

// === impl IngressData ===

impl IngressData {
    pub(crate) fn from_resource(name: String, ingress: &k8s::Ingress) -> Self {
        let spec = ingress.spec.as_ref();
        let rules = spec
            .and_then(|spec| spec.rules.as_ref())
            .into_iter()
            .flatten()
            .map(|rule| Rule {
                host: rule.host.clone(),
                paths: rule
                    .http
                    .iter()
                    .flat_map(|http| http.paths.iter())
                    .filter_map(|path| {
                        Some(Path {
                            path: path.path.clone(),
                            path_type: path.path_type.clone(),
                            backend: Backend::from_resource(&path.backend)?,
                        })
                    })
                    .collect(),
            })
            .collect();

        Self {
            name,
            class_name: spec.and_then(|spec| spec.ingress_class_name.clone()),
            annotations: ingress.metadata.annotations.clone().unwrap_or_default(),
            default_backend: spec
                .and_then(|spec| spec.default_backend.as_ref())
                .and_then(Backend::from_resource),
            rules,
        }
    }

    /// Lists the services this ingress routes to: the default backend first, followed by each
    /// distinct path backend in the order it appears.
    pub fn service_names(&self) -> Vec<String> {
        let mut names = Vec::<String>::new();
        let backends = self
            .default_backend
            .iter()
            .chain(self.rules.iter().flat_map(|r| r.paths.iter().map(|p| &p.backend)));
        for backend in backends {
            if let Some(name) = backend.service_name() {
                if !names.iter().any(|n| n == name) {
                    names.push(name.to_string());
                }
            }
        }
        names
    }
}

// === impl Backend ===

impl Backend {
    fn from_resource(backend: &IngressBackend) -> Option<Self> {
        if let Some(svc) = backend.service.as_ref() {
            let port = svc.port.as_ref().and_then(|port| match (port.number, &port.name) {
                (Some(number), _) => Some(PortRef::Number(number)),
                (None, Some(name)) => Some(PortRef::Name(name.clone())),
                (None, None) => None,
            });
            return Some(Self::Service {
                name: svc.name.clone(),
                port,
            });
        }

        backend.resource.as_ref().map(|r| Self::Resource {
            kind: r.kind.clone(),
            name: r.name.clone(),
        })
    }

    pub fn service_name(&self) -> Option<&str> {
        match self {
            Self::Service { name, .. } if !name.is_empty() => Some(name),
            _ => None,
        }
    }
}
