//! Cross-reference resolver
//!
//! Runs once every service has been built. It only links existing
//! resources: ConfigMaps and Secrets into Deployments (`envFrom`, file
//! volumes), Deployment pod labels into Service selectors, and checks that
//! every Ingress backend exists. Linking is idempotent.
//!
//! The final check rejects any reference to a ConfigMap or Secret missing
//! from the registry. Such a reference is a generator bug, never a user
//! error.

use std::collections::BTreeSet;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{
    ConfigMapEnvSource, ConfigMapVolumeSource, EnvFromSource, SecretEnvSource, Volume,
    VolumeMount,
};
use stevedore_core::Project;

use crate::error::{ConvertError, Result};
use crate::naming::logical_name;
use crate::registry::Registry;
use crate::resource::{ConfigMapUsage, Manifest, ResourceKind};

/// Link every resource of the registry
pub fn resolve(registry: &mut Registry, project: &Project) -> Result<()> {
    link_deployments(registry, project)?;
    link_services(registry)?;
    check_ingresses(registry)?;
    validate_references(registry)
}

/// References to add to the pod of one service
#[derive(Debug, Default)]
struct PodLinks {
    env_from: Vec<EnvFromSource>,
    volumes: Vec<Volume>,
    mounts: Vec<VolumeMount>,
}

fn link_deployments(registry: &mut Registry, project: &Project) -> Result<()> {
    let plans: Vec<(String, String, PodLinks)> = registry
        .of_kind(ResourceKind::Deployment)
        .map(|deployment| {
            let depends_on = project
                .service(&deployment.service)
                .map(|service| service.depends_on.as_slice())
                .unwrap_or_default();
            (
                deployment.name.clone(),
                logical_name(&deployment.service),
                pod_links(registry, &deployment.service, depends_on),
            )
        })
        .collect();

    for (name, container, links) in plans {
        if let Some(resource) = registry.get_mut(ResourceKind::Deployment, &name)
            && let Manifest::Deployment(deployment) = &mut resource.manifest
        {
            apply_links(deployment, &name, &container, links)?;
        }
    }
    Ok(())
}

fn pod_links(registry: &Registry, service: &str, depends_on: &[String]) -> PodLinks {
    let mut links = PodLinks::default();
    let own = logical_name(service);

    if let Some(name) = env_config_map(registry, &own) {
        links.env_from.push(config_map_ref(name));
    }
    if let Some(name) = registry
        .get(ResourceKind::Secret, &own)
        .and_then(|secret| secret.metadata_name())
    {
        links.env_from.push(EnvFromSource {
            secret_ref: Some(SecretEnvSource {
                name: name.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        });
    }

    // ignored and failed dependencies have no ConfigMap in the registry
    let dependencies: BTreeSet<&String> = depends_on.iter().filter(|d| d.as_str() != service).collect();
    for dependency in dependencies {
        if let Some(name) = env_config_map(registry, &logical_name(dependency)) {
            links.env_from.push(config_map_ref(name));
        }
    }

    for resource in registry
        .of_kind(ResourceKind::ConfigMap)
        .filter(|r| r.service == service)
    {
        let Manifest::ConfigMap {
            usage: ConfigMapUsage::Files { mounts, .. },
            ..
        } = &resource.manifest
        else {
            continue;
        };
        let Some(config_map_name) = resource.metadata_name() else {
            continue;
        };
        links.volumes.push(Volume {
            name: resource.name.clone(),
            config_map: Some(ConfigMapVolumeSource {
                name: config_map_name.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        });
        links.mounts.extend(mounts.iter().map(|mount| VolumeMount {
            name: resource.name.clone(),
            mount_path: mount.mount_path.clone(),
            sub_path: mount.sub_path.clone(),
            read_only: mount.read_only.then_some(true),
            ..Default::default()
        }));
    }

    links
}

fn env_config_map<'a>(registry: &'a Registry, logical: &str) -> Option<&'a str> {
    registry
        .get(ResourceKind::ConfigMap, logical)
        .filter(|resource| {
            matches!(
                resource.manifest,
                Manifest::ConfigMap {
                    usage: ConfigMapUsage::Environment,
                    ..
                }
            )
        })
        .and_then(|resource| resource.metadata_name())
}

fn config_map_ref(name: &str) -> EnvFromSource {
    EnvFromSource {
        config_map_ref: Some(ConfigMapEnvSource {
            name: name.to_string(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// A volume name already bound to another source is a conflict
fn apply_links(
    deployment: &mut Deployment,
    owner: &str,
    container_name: &str,
    links: PodLinks,
) -> Result<()> {
    let Some(pod) = deployment
        .spec
        .as_mut()
        .and_then(|spec| spec.template.spec.as_mut())
    else {
        return Ok(());
    };

    let volumes = pod.volumes.get_or_insert_with(Vec::new);
    for volume in links.volumes {
        match volumes.iter().find(|v| v.name == volume.name) {
            Some(existing) if existing == &volume => {}
            Some(_) => {
                return Err(ConvertError::VolumeConflict {
                    owner: format!("Deployment '{}'", owner),
                    volume: volume.name,
                });
            }
            None => volumes.push(volume),
        }
    }
    if volumes.is_empty() {
        pod.volumes = None;
    }

    for container in pod.containers.iter_mut().filter(|c| c.name == container_name) {
        let env_from = container.env_from.get_or_insert_with(Vec::new);
        for source in &links.env_from {
            if !env_from.contains(source) {
                env_from.push(source.clone());
            }
        }
        if env_from.is_empty() {
            container.env_from = None;
        }

        let mounts = container.volume_mounts.get_or_insert_with(Vec::new);
        for mount in &links.mounts {
            if !mounts
                .iter()
                .any(|m| m.name == mount.name && m.mount_path == mount.mount_path)
            {
                mounts.push(mount.clone());
            }
        }
        if mounts.is_empty() {
            container.volume_mounts = None;
        }
    }
    Ok(())
}

/// Copy the pod labels of each Deployment into the selector of its Service
fn link_services(registry: &mut Registry) -> Result<()> {
    let mut selectors = Vec::new();
    for service in registry.of_kind(ResourceKind::Service) {
        let labels = registry
            .get(ResourceKind::Deployment, &service.name)
            .and_then(|resource| match &resource.manifest {
                Manifest::Deployment(deployment) => deployment.spec.as_ref(),
                _ => None,
            })
            .and_then(|spec| spec.template.metadata.as_ref())
            .and_then(|meta| meta.labels.clone())
            .ok_or_else(|| ConvertError::DanglingReference {
                owner: format!("Service '{}'", service.name),
                kind: ResourceKind::Deployment,
                name: service.name.clone(),
            })?;
        selectors.push((service.name.clone(), labels));
    }

    for (name, labels) in selectors {
        if let Some(resource) = registry.get_mut(ResourceKind::Service, &name)
            && let Manifest::Service(service) = &mut resource.manifest
        {
            service.spec.get_or_insert_with(Default::default).selector = Some(labels);
        }
    }
    Ok(())
}

/// Every Ingress backend must be a generated Service exposing the port
fn check_ingresses(registry: &Registry) -> Result<()> {
    for ingress in registry.of_kind(ResourceKind::Ingress) {
        let Manifest::Ingress(k8s) = &ingress.manifest else {
            continue;
        };
        let backends = k8s
            .spec
            .iter()
            .flat_map(|spec| spec.rules.iter().flatten())
            .flat_map(|rule| rule.http.iter())
            .flat_map(|http| http.paths.iter())
            .filter_map(|path| path.backend.service.as_ref());

        for backend in backends {
            let port = backend.port.as_ref().and_then(|p| p.number);
            let exposed = registry
                .of_kind(ResourceKind::Service)
                .filter(|service| service.metadata_name() == Some(backend.name.as_str()))
                .filter_map(|service| match &service.manifest {
                    Manifest::Service(k8s) => k8s.spec.as_ref(),
                    _ => None,
                })
                .flat_map(|spec| spec.ports.iter().flatten())
                .any(|p| Some(p.port) == port);

            if !exposed {
                return Err(ConvertError::DanglingReference {
                    owner: format!("Ingress '{}'", ingress.name),
                    kind: ResourceKind::Service,
                    name: backend.name.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Reject references to objects missing from the registry
pub fn validate_references(registry: &Registry) -> Result<()> {
    for resource in registry.of_kind(ResourceKind::Deployment) {
        let Manifest::Deployment(deployment) = &resource.manifest else {
            continue;
        };
        let Some(pod) = deployment
            .spec
            .as_ref()
            .and_then(|spec| spec.template.spec.as_ref())
        else {
            continue;
        };
        let owner = format!("Deployment '{}'", resource.name);
        let dangling = |kind: ResourceKind, name: &str| ConvertError::DanglingReference {
            owner: owner.clone(),
            kind,
            name: name.to_string(),
        };

        let volumes = pod.volumes.as_deref().unwrap_or_default();
        for volume in volumes {
            if let Some(source) = &volume.config_map
                && !registry.has_metadata_name(ResourceKind::ConfigMap, &source.name)
            {
                return Err(dangling(ResourceKind::ConfigMap, &source.name));
            }
            if let Some(name) = volume.secret.as_ref().and_then(|s| s.secret_name.as_deref())
                && !registry.has_metadata_name(ResourceKind::Secret, name)
            {
                return Err(dangling(ResourceKind::Secret, name));
            }
        }

        for container in &pod.containers {
            for source in container.env_from.iter().flatten() {
                if let Some(config_map) = &source.config_map_ref
                    && !registry.has_metadata_name(ResourceKind::ConfigMap, &config_map.name)
                {
                    return Err(dangling(ResourceKind::ConfigMap, &config_map.name));
                }
                if let Some(secret) = &source.secret_ref
                    && !registry.has_metadata_name(ResourceKind::Secret, &secret.name)
                {
                    return Err(dangling(ResourceKind::Secret, &secret.name));
                }
            }
            for mount in container.volume_mounts.iter().flatten() {
                if !volumes.iter().any(|v| v.name == mount.name) {
                    return Err(ConvertError::UnboundMount {
                        owner: owner.clone(),
                        volume: mount.name.clone(),
                    });
                }
            }
        }
    }
    Ok(())
}
