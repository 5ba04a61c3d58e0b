use crate::{index::SharedIndex, namespace::CacheSizes};
use prometheus_client::{
    collector::Collector,
    encoding::{DescriptorEncoder, EncodeMetric},
    metrics::{gauge::ConstGauge, MetricType},
    registry::Registry,
};

#[derive(Debug)]
struct Instrumented(SharedIndex);

/// Registers gauges of the number of cached resources, by namespace.
pub fn register(reg: &mut Registry, index: SharedIndex) {
    reg.register_collector(Box::new(Instrumented(index)));
}

impl Collector for Instrumented {
    fn encode(&self, mut encoder: DescriptorEncoder<'_>) -> Result<(), std::fmt::Error> {
        let sizes = self
            .0
            .read()
            .namespaces()
            .map(|(ns, cache)| (ns.clone(), cache.sizes()))
            .collect::<Vec<_>>();

        let gauges: [(&str, &str, fn(&CacheSizes) -> usize); 4] = [
            (
                "ingress_index_size",
                "The number of ingresses in the index",
                |s| s.ingresses,
            ),
            (
                "service_index_size",
                "The number of services in the index",
                |s| s.services,
            ),
            (
                "pod_index_size",
                "The number of pods in the index",
                |s| s.pods,
            ),
            (
                "endpoints_index_size",
                "The number of endpoints in the index",
                |s| s.endpoints,
            ),
        ];

        for (name, help, size) in gauges {
            let mut gauge_encoder =
                encoder.encode_descriptor(name, help, None, MetricType::Gauge)?;
            for (ns, sizes) in &sizes {
                let labels = vec![("namespace", ns.as_str())];
                let gauge = ConstGauge::new(size(sizes) as i64);
                let family_encoder = gauge_encoder.encode_family(&labels)?;
                gauge.encode(family_encoder)?;
            }
        }

        Ok(())
    }
}
