//! Service builder

use k8s_openapi::api::core::v1::{Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;

use super::BuildInput;
use super::deployment::port_name;
use crate::resource::{Manifest, Resource};

/// ClusterIP Service over the resolved ports, absent for port-less services
///
/// The selector is copied from the Deployment by the resolver.
pub fn build_service(input: &BuildInput<'_>) -> Option<Resource> {
    if input.ports.is_empty() {
        return None;
    }

    let logical = input.logical_name();
    let ports = input
        .ports
        .iter()
        .map(|port| ServicePort {
            name: Some(port_name(port)),
            port: i32::from(port.target),
            target_port: Some(IntOrString::Int(i32::from(port.target))),
            protocol: Some(port.protocol.as_k8s().to_string()),
            ..Default::default()
        })
        .collect();

    let service = Service {
        metadata: input.ctx.metadata(&input.service.name, &logical),
        spec: Some(ServiceSpec {
            type_: Some("ClusterIP".to_string()),
            ports: Some(ports),
            ..Default::default()
        }),
        ..Default::default()
    };

    Some(Resource::new(&input.service.name, logical, Manifest::Service(service)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{BuildContext, resolve_ports};
    use crate::directives::Directives;
    use crate::partition::EnvPartition;

    fn build(service: &stevedore_core::Service, directives: &Directives) -> Option<Resource> {
        let ctx = BuildContext::new("shop", "v0.1.0");
        let (partition, _) = EnvPartition::compute(service, directives, "shop");
        let input = BuildInput {
            ctx: &ctx,
            service,
            directives,
            partition: &partition,
            ports: resolve_ports(service, directives),
        };
        build_service(&input)
    }

    #[test]
    fn test_service_ports() {
        let service = stevedore_core::Service::new("web").with_port(80);
        let directives = Directives {
            ports: vec![443],
            ..Default::default()
        };
        let resource = build(&service, &directives).unwrap();
        assert_eq!(resource.path, "web/service.yaml");

        let Manifest::Service(k8s) = &resource.manifest else {
            panic!("expected a Service");
        };
        let spec = k8s.spec.as_ref().unwrap();
        assert_eq!(spec.type_.as_deref(), Some("ClusterIP"));
        let ports: Vec<i32> = spec.ports.as_ref().unwrap().iter().map(|p| p.port).collect();
        assert_eq!(ports, vec![80, 443]);
        assert!(spec.selector.is_none());
    }

    #[test]
    fn test_no_ports_no_service() {
        let service = stevedore_core::Service::new("worker");
        assert!(build(&service, &Directives::default()).is_none());
    }
}
