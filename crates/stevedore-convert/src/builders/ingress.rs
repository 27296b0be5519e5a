//! Ingress builder

use k8s_openapi::api::networking::v1::{
    HTTPIngressPath, HTTPIngressRuleValue, Ingress, IngressBackend, IngressRule,
    IngressServiceBackend, IngressSpec, IngressTLS, ServiceBackendPort,
};

use super::BuildInput;
use crate::error::{ConvertError, Result};
use crate::labels::LabelKind;
use crate::naming::{tpl_name, values_ref};
use crate::resource::{Manifest, Resource};

/// Ingress routing the configured host to the service port
///
/// The manifest is guarded by `<service>.ingress.enabled`.
pub fn build_ingress(input: &BuildInput<'_>) -> Result<Option<Resource>> {
    let Some(directive) = &input.directives.ingress else {
        return Ok(None);
    };
    let service = input.service;
    let label_error = |message: String| {
        let key = LabelKind::Ingress.key();
        let raw = service.labels.get(&key).cloned().unwrap_or_default();
        ConvertError::label(&service.name, &key, &raw, message)
    };

    let port = match directive.port {
        Some(port) if input.ports.iter().any(|p| p.target == port) => port,
        Some(port) => {
            return Err(label_error(format!("port {} is not exposed by the service", port)));
        }
        None => match input.ports.first() {
            Some(port) => port.target,
            None => {
                return Err(label_error(
                    "the service has no port to route to".to_string(),
                ));
            }
        },
    };

    let app = &input.ctx.app_name;
    let logical = input.logical_name();
    let host = format!("{{{{ {} }}}}", values_ref(&service.name, &["ingress", "host"]));

    let mut metadata = input.ctx.metadata(&service.name, &logical);
    if !directive.annotations.is_empty() {
        metadata
            .annotations
            .get_or_insert_with(Default::default)
            .extend(directive.annotations.clone());
    }

    let tls = directive.tls.enabled.then(|| {
        vec![IngressTLS {
            hosts: Some(vec![host.clone()]),
            secret_name: Some(
                directive
                    .tls
                    .secret_name
                    .clone()
                    .unwrap_or_else(|| tpl_name(app, &format!("{}-tls", logical))),
            ),
        }]
    });

    let ingress = Ingress {
        metadata,
        spec: Some(IngressSpec {
            ingress_class_name: directive.class.clone(),
            rules: Some(vec![IngressRule {
                host: Some(host),
                http: Some(HTTPIngressRuleValue {
                    paths: vec![HTTPIngressPath {
                        path: Some(directive.path.clone()),
                        path_type: "Prefix".to_string(),
                        backend: IngressBackend {
                            service: Some(IngressServiceBackend {
                                name: tpl_name(app, &logical),
                                port: Some(ServiceBackendPort {
                                    number: Some(i32::from(port)),
                                    ..Default::default()
                                }),
                            }),
                            ..Default::default()
                        },
                    }],
                }),
            }]),
            tls,
            ..Default::default()
        }),
        ..Default::default()
    };

    Ok(Some(
        Resource::new(&service.name, logical, Manifest::Ingress(ingress))
            .with_condition(values_ref(&service.name, &["ingress", "enabled"])),
    ))
}
