//! Deployment builder
//!
//! Builds the pod template of a service. ConfigMap and Secret references
//! (`envFrom`, file volumes) are left to the resolver; this builder only
//! handles what the service declares on its own.

use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EmptyDirVolumeSource, EnvVar, PodSpec, PodTemplateSpec, Volume,
    VolumeMount,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use stevedore_core::{PortProtocol, ServicePort, ServiceVolume, VolumeKind};

use super::BuildInput;
use crate::error::{ConversionWarning, ConvertError, Result, WarningCategory};
use crate::labels::LabelKind;
use crate::naming::{file_logical_name, normalize_path, sanitize, selector_labels, values_ref};
use crate::resource::{Manifest, Resource};

/// Container port name, unique per port and protocol
pub fn port_name(port: &ServicePort) -> String {
    match port.protocol {
        PortProtocol::Tcp => format!("port-{}", port.target),
        other => format!("port-{}-{}", port.target, other.as_k8s().to_lowercase()),
    }
}

pub fn build_deployment(
    input: &BuildInput<'_>,
    warnings: &mut Vec<ConversionWarning>,
) -> Result<Resource> {
    let service = input.service;
    let logical = input.logical_name();
    let selector = selector_labels(&input.ctx.app_name, &service.name);
    let (volumes, volume_mounts) = container_volumes(input, &logical, warnings)?;

    let image = format!(
        "{{{{ {} }}}}:{{{{ {} }}}}",
        values_ref(&service.name, &["repository", "image"]),
        values_ref(&service.name, &["repository", "tag"])
    );

    let ports: Vec<ContainerPort> = input
        .ports
        .iter()
        .map(|port| ContainerPort {
            name: Some(port_name(port)),
            container_port: i32::from(port.target),
            protocol: Some(port.protocol.as_k8s().to_string()),
            ..Default::default()
        })
        .collect();

    let env: Vec<EnvVar> = input
        .partition
        .values
        .keys()
        .map(|name| EnvVar {
            name: name.clone(),
            value: Some(format!(
                "{{{{ tpl ({}) $ }}}}",
                values_ref(&service.name, &["environment", name.as_str()])
            )),
            ..Default::default()
        })
        .collect();

    let health_check = input.directives.health_check.clone().unwrap_or_default();

    let container = Container {
        name: logical.clone(),
        image: Some(image),
        image_pull_policy: Some("IfNotPresent".to_string()),
        command: non_empty(service.entrypoint.clone()),
        args: non_empty(service.command.clone()),
        ports: non_empty(ports),
        env: non_empty(env),
        volume_mounts: non_empty(volume_mounts),
        liveness_probe: health_check.liveness_probe,
        readiness_probe: health_check.readiness_probe,
        ..Default::default()
    };

    let deployment = Deployment {
        metadata: input.ctx.metadata(&service.name, &logical),
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(selector.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(selector),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    containers: vec![container],
                    volumes: non_empty(volumes),
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    };

    Ok(Resource::new(
        &service.name,
        logical,
        Manifest::Deployment(Box::new(deployment)),
    ))
}

/// Pod volumes and mounts for named, anonymous and tmpfs volumes
///
/// Bind mounts covered by `configmap-files` are mounted by the resolver,
/// other bind mounts have no cluster counterpart and are skipped. Names
/// taken by the file ConfigMaps of the service are rejected.
fn container_volumes(
    input: &BuildInput<'_>,
    logical: &str,
    warnings: &mut Vec<ConversionWarning>,
) -> Result<(Vec<Volume>, Vec<VolumeMount>)> {
    let service = input.service;
    let mut volumes: Vec<Volume> = Vec::new();
    let mut mounts = Vec::new();

    for (index, volume) in service.volumes.iter().enumerate() {
        let name = match volume.kind {
            VolumeKind::Bind => {
                if !is_embedded(input, volume) {
                    warnings.push(
                        ConversionWarning::warning(
                            WarningCategory::Volume,
                            &service.name,
                            format!(
                                "bind mount '{}' on {} is skipped",
                                volume.source, volume.target
                            ),
                        )
                        .with_suggestion("list the path in configmap-files to embed it in a ConfigMap"),
                    );
                }
                continue;
            }
            VolumeKind::Volume if !volume.source.is_empty() => {
                let name = format!("{}-data-{}", logical, sanitize(&volume.source));
                warnings.push(
                    ConversionWarning::warning(
                        WarningCategory::Volume,
                        &service.name,
                        format!(
                            "named volume '{}' becomes an emptyDir, its data is not persisted",
                            volume.source
                        ),
                    )
                    .with_suggestion("replace the volume with a PersistentVolumeClaim"),
                );
                name
            }
            VolumeKind::Volume => format!("{}-volume-{}", logical, index),
            VolumeKind::Tmpfs => format!("{}-tmpfs-{}", logical, index),
        };

        if let Some(path) = file_config_map_named(input, &name) {
            let key = LabelKind::ConfigMapFiles.key();
            let raw = service.labels.get(&key).cloned().unwrap_or_default();
            return Err(ConvertError::label(
                &service.name,
                &key,
                &raw,
                format!(
                    "'{}' maps to volume name '{}', which the volume on {} already uses",
                    path, name, volume.target
                ),
            ));
        }

        if !volumes.iter().any(|v| v.name == name) {
            let medium = (volume.kind == VolumeKind::Tmpfs).then(|| "Memory".to_string());
            volumes.push(Volume {
                name: name.clone(),
                empty_dir: Some(EmptyDirVolumeSource {
                    medium,
                    ..Default::default()
                }),
                ..Default::default()
            });
        }
        mounts.push(VolumeMount {
            name,
            mount_path: volume.target.clone(),
            read_only: volume.read_only.then_some(true),
            ..Default::default()
        });
    }

    Ok((volumes, mounts))
}

/// `configmap-files` entry whose pod volume would be called `name`
fn file_config_map_named<'a>(input: &'a BuildInput<'_>, name: &str) -> Option<&'a str> {
    input
        .directives
        .configmap_files
        .iter()
        .find(|path| file_logical_name(&input.service.name, path) == name)
        .map(String::as_str)
}

fn is_embedded(input: &BuildInput<'_>, volume: &ServiceVolume) -> bool {
    let source = normalize_path(&volume.source);
    input
        .directives
        .configmap_files
        .iter()
        .any(|path| normalize_path(path) == source)
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{BuildContext, resolve_ports};
    use crate::directives::{Directives, HealthCheck};
    use crate::partition::EnvPartition;
    use k8s_openapi::api::core::v1::Probe;
    use std::collections::BTreeMap;
    use stevedore_core::Service;

    fn build(service: &Service, directives: &Directives) -> (Deployment, Vec<ConversionWarning>) {
        let ctx = BuildContext::new("shop", "v0.1.0");
        let (partition, _) = EnvPartition::compute(service, directives, "shop");
        let input = BuildInput {
            ctx: &ctx,
            service,
            directives,
            partition: &partition,
            ports: resolve_ports(service, directives),
        };
        let mut warnings = Vec::new();
        let resource = build_deployment(&input, &mut warnings).unwrap();
        assert_eq!(resource.path, format!("{}/deployment.yaml", service.name));
        match resource.manifest {
            Manifest::Deployment(deployment) => (*deployment, warnings),
            other => panic!("expected a Deployment, got {:?}", other.kind()),
        }
    }

    fn container(deployment: &Deployment) -> &Container {
        &deployment.spec.as_ref().unwrap().template.spec.as_ref().unwrap().containers[0]
    }

    #[test]
    fn test_container_basics() {
        let service = Service::new("web").with_image("nginx:1.25").with_port(80);
        let directives = Directives {
            ports: vec![8080],
            ..Default::default()
        };
        let (deployment, warnings) = build(&service, &directives);
        assert!(warnings.is_empty());

        let spec = deployment.spec.as_ref().unwrap();
        assert_eq!(spec.replicas, Some(1));
        assert_eq!(
            spec.selector.match_labels,
            spec.template.metadata.as_ref().unwrap().labels
        );

        let container = container(&deployment);
        assert_eq!(container.name, "web");
        assert_eq!(
            container.image.as_deref(),
            Some("{{ index .Values \"web\" \"repository\" \"image\" }}:{{ index .Values \"web\" \"repository\" \"tag\" }}")
        );
        let ports: Vec<(Option<String>, i32)> = container
            .ports
            .as_ref()
            .unwrap()
            .iter()
            .map(|p| (p.name.clone(), p.container_port))
            .collect();
        assert_eq!(
            ports,
            vec![
                (Some("port-80".to_string()), 80),
                (Some("port-8080".to_string()), 8080)
            ]
        );
        assert!(container.env_from.is_none());
    }

    #[test]
    fn test_values_become_templated_env() {
        let service = Service::new("web")
            .with_image("nginx")
            .with_env("LOG_LEVEL", "info")
            .with_env("FOO", "bar");
        let directives = Directives {
            values: BTreeMap::from([("LOG_LEVEL".to_string(), None)]),
            ..Default::default()
        };
        let (deployment, _) = build(&service, &directives);

        let env = container(&deployment).env.as_ref().unwrap();
        assert_eq!(env.len(), 1);
        assert_eq!(env[0].name, "LOG_LEVEL");
        assert_eq!(
            env[0].value.as_deref(),
            Some("{{ tpl (index .Values \"web\" \"environment\" \"LOG_LEVEL\") $ }}")
        );
    }

    #[test]
    fn test_volumes() {
        let service = Service::new("db")
            .with_image("postgres")
            .with_volume(ServiceVolume::named("pg_data", "/var/lib/postgresql/data"))
            .with_volume(ServiceVolume::bind("./init.sql", "/docker-entrypoint-initdb.d/init.sql"))
            .with_volume(ServiceVolume::bind("./conf", "/etc/postgresql"));
        let directives = Directives {
            configmap_files: vec!["conf".to_string()],
            ..Default::default()
        };
        let (deployment, warnings) = build(&service, &directives);

        let pod = deployment.spec.as_ref().unwrap().template.spec.as_ref().unwrap();
        let volumes = pod.volumes.as_ref().unwrap();
        assert_eq!(volumes.len(), 1);
        assert_eq!(volumes[0].name, "db-data-pg-data");
        assert!(volumes[0].empty_dir.is_some());

        let mounts = pod.containers[0].volume_mounts.as_ref().unwrap();
        assert_eq!(mounts.len(), 1);
        assert_eq!(mounts[0].name, volumes[0].name);

        // named volume converted, init.sql skipped, conf left to the resolver
        assert_eq!(warnings.len(), 2);
        assert!(warnings.iter().any(|w| w.message.contains("init.sql")));
        assert!(!warnings.iter().any(|w| w.message.contains("conf")));
    }

    #[test]
    fn test_command_and_probes() {
        let mut service = Service::new("api").with_image("python:3.12");
        service.entrypoint = vec!["python".to_string()];
        service.command = vec!["-m".to_string(), "http.server".to_string()];
        let directives = Directives {
            health_check: Some(HealthCheck {
                liveness_probe: Some(Probe {
                    period_seconds: Some(10),
                    ..Default::default()
                }),
                readiness_probe: None,
            }),
            ..Default::default()
        };
        let (deployment, _) = build(&service, &directives);

        let container = container(&deployment);
        assert_eq!(container.command, Some(vec!["python".to_string()]));
        assert_eq!(container.args.as_ref().unwrap().len(), 2);
        assert_eq!(container.liveness_probe.as_ref().unwrap().period_seconds, Some(10));
        assert!(container.readiness_probe.is_none());
    }

    #[test]
    fn test_named_volume_and_file_config_map_do_not_share_a_name() {
        let service = Service::new("web")
            .with_image("nginx")
            .with_volume(ServiceVolume::named("conf", "/data"))
            .with_volume(ServiceVolume::bind("./conf", "/etc/app"));
        let directives = Directives {
            configmap_files: vec!["./conf".to_string()],
            ..Default::default()
        };
        let (deployment, _) = build(&service, &directives);

        let pod = deployment.spec.as_ref().unwrap().template.spec.as_ref().unwrap();
        let names: Vec<&str> = pod.volumes.iter().flatten().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["web-data-conf"]);
        assert_ne!(names[0], file_logical_name("web", "./conf"));
    }

    #[test]
    fn test_volume_name_taken_by_file_config_map_is_a_label_error() {
        let service = Service::new("web")
            .with_image("nginx")
            .with_label("configmap-files", "- data/conf")
            .with_volume(ServiceVolume::named("conf", "/data"));
        let directives = Directives {
            configmap_files: vec!["data/conf".to_string()],
            ..Default::default()
        };
        let ctx = BuildContext::new("shop", "v0.1.0");
        let (partition, _) = EnvPartition::compute(&service, &directives, "shop");
        let input = BuildInput {
            ctx: &ctx,
            service: &service,
            directives: &directives,
            partition: &partition,
            ports: Vec::new(),
        };

        match build_deployment(&input, &mut Vec::new()).unwrap_err() {
            ConvertError::Label { label, value, message, .. } => {
                assert_eq!(label, "stevedore.io/configmap-files");
                assert_eq!(value, "- data/conf");
                assert!(message.contains("web-data-conf"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
