//! Project model consumed by the manifest generator
//!
//! A `Project` is an already-resolved compose project. The generator never
//! mutates it: every label, environment variable and volume is read from
//! here and turned into Kubernetes resources.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::LABEL_PREFIX;

/// A parsed compose project
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Project {
    /// Project name (explicit `name:` or the compose directory name)
    pub name: String,

    /// Directory containing the compose file
    pub working_dir: PathBuf,

    /// Services keyed by name
    pub services: BTreeMap<String, Service>,
}

impl Project {
    /// Create an empty project rooted at `working_dir`
    pub fn new(name: impl Into<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            working_dir: working_dir.into(),
            services: BTreeMap::new(),
        }
    }

    /// Add a service, replacing any service with the same name
    pub fn with_service(mut self, service: Service) -> Self {
        self.services.insert(service.name.clone(), service);
        self
    }

    /// Get a service by name
    pub fn service(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }

    /// Iterate services in name order
    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.services.values()
    }
}

/// One workload unit of the project
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Service {
    /// Service name, unique within the project
    pub name: String,

    /// Container image
    #[serde(default)]
    pub image: Option<String>,

    /// Environment variables; `None` is a pass-through variable without value
    #[serde(default)]
    pub environment: BTreeMap<String, Option<String>>,

    /// Raw labels
    #[serde(default)]
    pub labels: BTreeMap<String, String>,

    /// Declared volumes
    #[serde(default)]
    pub volumes: Vec<ServiceVolume>,

    /// Declared container ports
    #[serde(default)]
    pub ports: Vec<ServicePort>,

    /// Services this one depends on
    #[serde(default)]
    pub depends_on: Vec<String>,

    /// Container command (compose `command`)
    #[serde(default)]
    pub command: Vec<String>,

    /// Container entrypoint (compose `entrypoint`)
    #[serde(default)]
    pub entrypoint: Vec<String>,

    /// Directory used to resolve relative paths referenced by labels
    #[serde(default)]
    pub working_dir: PathBuf,
}

impl Service {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), Some(value.into()));
        self
    }

    /// Set a Stevedore label, `name` is given without the prefix
    pub fn with_label(mut self, name: &str, value: impl Into<String>) -> Self {
        self.labels
            .insert(format!("{}/{}", LABEL_PREFIX, name), value.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.ports.push(ServicePort::tcp(port));
        self
    }

    pub fn with_volume(mut self, volume: ServiceVolume) -> Self {
        self.volumes.push(volume);
        self
    }

    pub fn with_dependency(mut self, service: impl Into<String>) -> Self {
        self.depends_on.push(service.into());
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Resolve a label-referenced path against the service working directory
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.working_dir.join(path)
    }

    /// Labels under the Stevedore prefix, keyed by their bare name
    pub fn stevedore_labels(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().filter_map(|(key, value)| {
            key.strip_prefix(LABEL_PREFIX)
                .and_then(|rest| rest.strip_prefix('/'))
                .map(|name| (name, value.as_str()))
        })
    }
}

/// Transport protocol of a port
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortProtocol {
    #[default]
    Tcp,
    Udp,
    Sctp,
}

impl PortProtocol {
    /// Kubernetes protocol name
    pub fn as_k8s(&self) -> &'static str {
        match self {
            Self::Tcp => "TCP",
            Self::Udp => "UDP",
            Self::Sctp => "SCTP",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "tcp" => Some(Self::Tcp),
            "udp" => Some(Self::Udp),
            "sctp" => Some(Self::Sctp),
            _ => None,
        }
    }
}

/// A container port declared by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServicePort {
    /// Port inside the container
    pub target: u16,

    #[serde(default)]
    pub protocol: PortProtocol,
}

impl ServicePort {
    pub fn tcp(target: u16) -> Self {
        Self {
            target,
            protocol: PortProtocol::Tcp,
        }
    }
}

impl fmt::Display for ServicePort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.protocol {
            PortProtocol::Tcp => write!(f, "{}", self.target),
            other => write!(f, "{}/{}", self.target, other.as_k8s().to_lowercase()),
        }
    }
}

/// Volume type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeKind {
    /// Host path mounted into the container
    Bind,
    /// Named volume managed by the engine
    Volume,
    /// In-memory filesystem
    Tmpfs,
}

/// A volume mounted by the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceVolume {
    pub kind: VolumeKind,

    /// Host path (bind) or volume name; empty for anonymous volumes
    #[serde(default)]
    pub source: String,

    /// Mount point inside the container
    pub target: String,

    #[serde(default)]
    pub read_only: bool,
}

impl ServiceVolume {
    pub fn bind(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: VolumeKind::Bind,
            source: source.into(),
            target: target.into(),
            read_only: false,
        }
    }

    pub fn named(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: VolumeKind::Volume,
            source: source.into(),
            target: target.into(),
            read_only: false,
        }
    }
}
