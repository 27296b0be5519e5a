//! Resource builders
//!
//! One builder per Kubernetes kind. Builders only share the naming rules in
//! [`crate::naming`]; references between resources are wired afterwards by
//! the resolver.

mod configmap;
mod deployment;
mod ingress;
mod secret;
mod service;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use stevedore_core::{Service, ServicePort};

use crate::directives::Directives;
use crate::error::{ConversionWarning, Result, WarningCategory};
use crate::naming;
use crate::partition::EnvPartition;
use crate::resource::Resource;
use crate::values::ServiceValues;

pub use configmap::{build_env_config_map, build_file_config_maps};
pub use deployment::build_deployment;
pub use ingress::build_ingress;
pub use secret::build_secret;
pub use service::build_service as build_k8s_service;

/// Chart-wide settings shared by every builder
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Chart name used in templated names and `__APP__`
    pub app_name: String,
    /// Tool version recorded in annotations
    pub version: String,
}

impl BuildContext {
    pub fn new(app_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            version: version.into(),
        }
    }

    /// Metadata for a resource of `service` registered as `logical`
    pub fn metadata(&self, service: &str, logical: &str) -> ObjectMeta {
        ObjectMeta {
            name: Some(naming::tpl_name(&self.app_name, logical)),
            labels: Some(naming::labels(&self.app_name, service)),
            annotations: Some(naming::annotations(&self.version)),
            ..Default::default()
        }
    }
}

/// Everything a builder reads for one service
#[derive(Debug)]
pub struct BuildInput<'a> {
    pub ctx: &'a BuildContext,
    pub service: &'a Service,
    pub directives: &'a Directives,
    pub partition: &'a EnvPartition,
    /// Compose ports followed by label ports, without duplicates
    pub ports: Vec<ServicePort>,
}

impl BuildInput<'_> {
    pub fn logical_name(&self) -> String {
        naming::logical_name(&self.service.name)
    }
}

/// Builders, in the order they run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builder {
    ConfigMap,
    Secret,
    Deployment,
    Service,
    Ingress,
}

impl Builder {
    pub const ALL: [Builder; 5] = [
        Self::ConfigMap,
        Self::Secret,
        Self::Deployment,
        Self::Service,
        Self::Ingress,
    ];

    pub fn build(
        &self,
        input: &BuildInput<'_>,
        warnings: &mut Vec<ConversionWarning>,
    ) -> Result<Vec<Resource>> {
        Ok(match self {
            Self::ConfigMap => {
                let mut resources: Vec<Resource> = build_env_config_map(input).into_iter().collect();
                resources.extend(build_file_config_maps(input, warnings)?);
                resources
            }
            Self::Secret => build_secret(input).into_iter().collect(),
            Self::Deployment => vec![build_deployment(input, warnings)?],
            Self::Service => build_k8s_service(input).into_iter().collect(),
            Self::Ingress => build_ingress(input)?.into_iter().collect(),
        })
    }
}

/// Resources, values and warnings produced for one service
#[derive(Debug)]
pub struct ServiceBuild {
    pub resources: Vec<Resource>,
    pub values: ServiceValues,
    pub warnings: Vec<ConversionWarning>,
}

/// Compose ports extended with the ports label
pub fn resolve_ports(service: &Service, directives: &Directives) -> Vec<ServicePort> {
    let mut ports: Vec<ServicePort> = Vec::new();
    let declared = service
        .ports
        .iter()
        .copied()
        .chain(directives.ports.iter().map(|p| ServicePort::tcp(*p)));
    for port in declared {
        if !ports.contains(&port) {
            ports.push(port);
        }
    }
    ports
}

/// Run every builder for one service
pub fn build_service(
    ctx: &BuildContext,
    service: &Service,
    directives: &Directives,
) -> Result<ServiceBuild> {
    let (partition, mut warnings) = EnvPartition::compute(service, directives, &ctx.app_name);

    let image = match &service.image {
        Some(image) => image.clone(),
        None => {
            warnings.push(
                ConversionWarning::warning(
                    WarningCategory::Image,
                    &service.name,
                    format!("no image declared, using '{}'", service.name),
                )
                .with_suggestion("set the repository in values.yaml"),
            );
            service.name.clone()
        }
    };

    let input = BuildInput {
        ctx,
        service,
        directives,
        partition: &partition,
        ports: resolve_ports(service, directives),
    };

    let mut resources = Vec::new();
    for builder in Builder::ALL {
        resources.extend(builder.build(&input, &mut warnings)?);
    }

    for resource in &resources {
        tracing::debug!(
            service = %service.name,
            kind = %resource.kind(),
            path = %resource.path,
            "built resource"
        );
    }

    Ok(ServiceBuild {
        resources,
        values: ServiceValues::new(&image, directives, &partition),
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceKind;
    use stevedore_core::PortProtocol;

    fn ctx() -> BuildContext {
        BuildContext::new("shop", "v0.1.0")
    }

    #[test]
    fn test_resolve_ports_is_additive() {
        let mut service = Service::new("web").with_port(80);
        service.ports.push(ServicePort {
            target: 53,
            protocol: PortProtocol::Udp,
        });
        let directives = Directives {
            ports: vec![80, 8080],
            ..Default::default()
        };
        let ports: Vec<String> = resolve_ports(&service, &directives)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(ports, vec!["80", "53/udp", "8080"]);
    }

    #[test]
    fn test_metadata_is_templated() {
        let meta = ctx().metadata("web", "web-foo-txt");
        assert_eq!(
            meta.name.as_deref(),
            Some("{{ include \"shop.fullname\" . }}-web-foo-txt")
        );
        assert_eq!(meta.labels.unwrap()["stevedore.io/component"], "web");
        assert_eq!(meta.annotations.unwrap()["stevedore.io/version"], "v0.1.0");
    }

    #[test]
    fn test_env_only_service() {
        let service = Service::new("web")
            .with_image("nginx")
            .with_env("FOO", "bar")
            .with_env("BAR", "baz");
        let build = build_service(&ctx(), &service, &Directives::default()).unwrap();

        let kinds: Vec<ResourceKind> = build.resources.iter().map(Resource::kind).collect();
        assert_eq!(kinds, vec![ResourceKind::ConfigMap, ResourceKind::Deployment]);
        assert!(build.warnings.is_empty());
    }

    #[test]
    fn test_missing_image_warns() {
        let service = Service::new("worker");
        let build = build_service(&ctx(), &service, &Directives::default()).unwrap();
        assert_eq!(build.values.repository.image, "worker");
        assert_eq!(build.warnings[0].category, WarningCategory::Image);
    }
}
