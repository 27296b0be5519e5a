//! Generated resources
//!
//! A `Resource` is one Kubernetes manifest plus the bookkeeping needed to
//! place it in the chart: owning service, logical name, output path and an
//! optional template guard.

use std::fmt;

use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, Secret, Service};
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::error::Result;
use crate::naming::normalize_path;

/// Kind of a generated resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    ConfigMap,
    Secret,
    Deployment,
    Service,
    Ingress,
}

impl ResourceKind {
    /// Manifest file name inside the service directory
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::ConfigMap => "configmap.yaml",
            Self::Secret => "secret.yaml",
            Self::Deployment => "deployment.yaml",
            Self::Service => "service.yaml",
            Self::Ingress => "ingress.yaml",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::ConfigMap => "ConfigMap",
            Self::Secret => "Secret",
            Self::Deployment => "Deployment",
            Self::Service => "Service",
            Self::Ingress => "Ingress",
        };
        f.write_str(name)
    }
}

/// Where a file-backed ConfigMap is mounted in the service container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMount {
    pub mount_path: String,
    /// Set when a single file is mounted over its target
    pub sub_path: Option<String>,
    pub read_only: bool,
}

/// What a ConfigMap carries
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigMapUsage {
    /// Environment variables, consumed through `envFrom`
    Environment,
    /// File contents, consumed through volume mounts
    Files {
        /// Normalized path relative to the service working directory
        source: String,
        mounts: Vec<FileMount>,
    },
}

/// Kind-specific payload
#[derive(Debug, Clone, PartialEq)]
pub enum Manifest {
    ConfigMap {
        config_map: ConfigMap,
        usage: ConfigMapUsage,
    },
    Secret(Secret),
    Deployment(Box<Deployment>),
    Service(Service),
    Ingress(Ingress),
}

impl Manifest {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Self::ConfigMap { .. } => ResourceKind::ConfigMap,
            Self::Secret(_) => ResourceKind::Secret,
            Self::Deployment(_) => ResourceKind::Deployment,
            Self::Service(_) => ResourceKind::Service,
            Self::Ingress(_) => ResourceKind::Ingress,
        }
    }

    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::ConfigMap { config_map, .. } => &config_map.metadata,
            Self::Secret(secret) => &secret.metadata,
            Self::Deployment(deployment) => &deployment.metadata,
            Self::Service(service) => &service.metadata,
            Self::Ingress(ingress) => &ingress.metadata,
        }
    }

    fn to_yaml(&self) -> serde_yaml::Result<String> {
        match self {
            Self::ConfigMap { config_map, .. } => serde_yaml::to_string(config_map),
            Self::Secret(secret) => serde_yaml::to_string(secret),
            Self::Deployment(deployment) => serde_yaml::to_string(deployment.as_ref()),
            Self::Service(service) => serde_yaml::to_string(service),
            Self::Ingress(ingress) => serde_yaml::to_string(ingress),
        }
    }
}

/// A generated manifest and its place in the chart
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// Compose service owning the resource
    pub service: String,
    /// Logical name, unique per kind
    pub name: String,
    /// Output path relative to the chart `templates/` directory
    pub path: String,
    /// Template condition guarding the whole manifest
    pub condition: Option<String>,
    pub manifest: Manifest,
}

impl Resource {
    pub fn new(service: &str, name: impl Into<String>, manifest: Manifest) -> Self {
        let path = match &manifest {
            Manifest::ConfigMap {
                usage: ConfigMapUsage::Files { source, .. },
                ..
            } => format!(
                "{}/statics/{}/{}",
                service,
                normalize_path(source),
                ResourceKind::ConfigMap.file_name()
            ),
            other => format!("{}/{}", service, other.kind().file_name()),
        };

        Self {
            service: service.to_string(),
            name: name.into(),
            path,
            condition: None,
            manifest,
        }
    }

    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = Some(condition.into());
        self
    }

    pub fn kind(&self) -> ResourceKind {
        self.manifest.kind()
    }

    /// Source path of a file-backed ConfigMap
    pub fn file_source(&self) -> Option<&str> {
        match &self.manifest {
            Manifest::ConfigMap {
                usage: ConfigMapUsage::Files { source, .. },
                ..
            } => Some(source),
            _ => None,
        }
    }

    /// Templated `metadata.name`
    pub fn metadata_name(&self) -> Option<&str> {
        self.manifest.metadata().name.as_deref()
    }

    /// Render the manifest, wrapped in its guard when there is one
    pub fn to_yaml(&self) -> Result<String> {
        let body = self.manifest.to_yaml()?;
        Ok(match &self.condition {
            Some(condition) => format!("{{{{- if {} }}}}\n{}{{{{- end }}}}\n", condition, body),
            None => body,
        })
    }
}
