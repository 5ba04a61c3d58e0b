use super::*;
use crate::{ingress::Backend, service::PortRef};
use ingress_controller_k8s_api::EventKind;

impl TestConfig {
    fn apply_topology(&self) {
        self.cache
            .apply_ingress(
                EventKind::Added,
                &mk_ingress("ns-0", "web", Some("svc-a"), ["svc-b"]),
            )
            .expect("ingress must apply");
        for svc in ["svc-a", "svc-b", "svc-unrelated"] {
            self.cache
                .apply_service(EventKind::Added, &mk_service("ns-0", svc))
                .expect("service must apply");
        }
        for (svc, ip) in [
            ("svc-a", "10.0.0.1"),
            ("svc-b", "10.0.0.2"),
            ("svc-unrelated", "10.0.0.3"),
        ] {
            self.cache
                .apply_endpoints(EventKind::Added, &mk_endpoints("ns-0", svc, [ip]))
                .expect("endpoints must apply");
        }
        for (pod, ip) in [
            ("pod-b", "10.0.0.2"),
            ("pod-a", "10.0.0.1"),
            ("pod-unrelated", "10.0.0.3"),
        ] {
            self.cache
                .apply_pod(EventKind::Added, &mk_pod("ns-0", pod, Some(ip)))
                .expect("pod must apply");
        }
    }
}

#[test]
fn joins_related_resources() {
    let test = TestConfig::default();
    test.apply_topology();

    let data = test.cache.lookup("web").expect("ingress must be ready");
    assert_eq!(data.ingress.name, "web");
    assert_eq!(
        data.services.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
        vec!["svc-a", "svc-b"],
    );
    assert_eq!(
        data.endpoints.iter().map(|e| e.name.as_str()).collect::<Vec<_>>(),
        vec!["svc-a", "svc-b"],
    );
    assert_eq!(
        data.pods.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        vec!["pod-a", "pod-b"],
    );

    let svc = data.service("svc-b").expect("service must be joined");
    assert_eq!(svc.port(&PortRef::Number(80)).map(|p| p.port), Some(80));
    assert!(data.endpoints_for("svc-unrelated").is_none());
}

#[test]
fn retains_ingress_routing() {
    let test = TestConfig::default();
    test.apply_topology();

    let data = test.cache.lookup("web").expect("ingress must be ready");
    assert_eq!(
        data.ingress.default_backend.as_ref().and_then(Backend::service_name),
        Some("svc-a"),
    );
    let rule = &data.ingress.rules[0];
    assert_eq!(rule.host.as_deref(), Some("example.com"));
    assert_eq!(rule.paths[0].path.as_deref(), Some("/svc-b"));
    assert_eq!(rule.paths[0].backend.service_name(), Some("svc-b"));
}

#[test]
fn unknown_ingresses_are_not_ready() {
    let test = TestConfig::default();
    test.apply_topology();
    assert!(test.cache.lookup("missing").is_none());
}

#[test]
fn ingresses_without_cached_services_are_not_ready() {
    let test = TestConfig::default();
    test.cache
        .apply_ingress(EventKind::Added, &mk_ingress("ns-0", "web", None, ["svc-a"]))
        .expect("ingress must apply");
    test.cache
        .apply_service(EventKind::Added, &mk_service("ns-0", "svc-other"))
        .expect("service must apply");
    assert!(test.cache.lookup("web").is_none());

    test.cache
        .apply_service(EventKind::Added, &mk_service("ns-0", "svc-a"))
        .expect("service must apply");
    let data = test.cache.lookup("web").expect("ingress must be ready");
    assert!(data.endpoints.is_empty());
    assert!(data.pods.is_empty());
}

#[test]
fn reflects_deleted_pods() {
    let test = TestConfig::default();
    test.apply_topology();
    test.cache
        .apply_pod(EventKind::Deleted, &mk_pod("ns-0", "pod-a", None))
        .expect("pod must delete");

    let data = test.cache.lookup("web").expect("ingress must be ready");
    assert_eq!(
        data.pods.iter().map(|p| p.name.as_str()).collect::<Vec<_>>(),
        vec!["pod-b"],
    );
}
