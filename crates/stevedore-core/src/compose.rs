//! Compose file loader
//!
//! Reads the subset of the Compose format the generator consumes: images,
//! environment, labels, ports, volumes, dependencies and commands. There is
//! no variable interpolation, no profile handling and no `extends`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{CoreError, Result};
use crate::project::{PortProtocol, Project, Service, ServicePort, ServiceVolume, VolumeKind};

/// Compose file names looked up when no file is given, in order
pub const DEFAULT_COMPOSE_FILES: &[&str] = &[
    "compose.yaml",
    "compose.yml",
    "docker-compose.yaml",
    "docker-compose.yml",
];

#[derive(Debug, Deserialize)]
struct ComposeFile {
    #[serde(default)]
    name: Option<String>,

    #[serde(default)]
    services: BTreeMap<String, RawService>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawService {
    image: Option<String>,
    environment: Option<ListOrMap>,
    labels: Option<ListOrMap>,
    volumes: Vec<RawVolume>,
    ports: Vec<RawPort>,
    expose: Vec<Value>,
    depends_on: Option<DependsOn>,
    command: Option<StringOrList>,
    entrypoint: Option<StringOrList>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ListOrMap {
    List(Vec<String>),
    Map(BTreeMap<String, Option<Value>>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DependsOn {
    List(Vec<String>),
    Map(BTreeMap<String, Value>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StringOrList {
    String(String),
    List(Vec<String>),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPort {
    Long {
        target: u16,
        #[serde(default)]
        protocol: Option<String>,
    },
    Short(Value),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawVolume {
    Long {
        #[serde(rename = "type", default)]
        kind: Option<String>,
        #[serde(default)]
        source: Option<String>,
        target: String,
        #[serde(default)]
        read_only: bool,
    },
    Short(String),
}

/// Find the default compose file in a directory
pub fn find_compose_file(dir: &Path) -> Option<PathBuf> {
    DEFAULT_COMPOSE_FILES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Load a project from a compose file on disk
pub fn load_project(path: &Path) -> Result<Project> {
    if !path.is_file() {
        return Err(CoreError::ComposeNotFound {
            path: path.display().to_string(),
        });
    }

    let content = std::fs::read_to_string(path)?;
    let working_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };

    parse_project(&content, &working_dir)
}

/// Parse a compose document, resolving relative paths against `working_dir`
pub fn parse_project(content: &str, working_dir: &Path) -> Result<Project> {
    let file: ComposeFile = serde_yaml::from_str(content)?;

    let name = file
        .name
        .or_else(|| {
            working_dir
                .canonicalize()
                .ok()
                .and_then(|dir| dir.file_name().map(|n| n.to_string_lossy().into_owned()))
        })
        .unwrap_or_else(|| "app".to_string());

    let mut project = Project::new(name, working_dir);
    for (service_name, raw) in file.services {
        let service = convert_service(&service_name, raw, working_dir)?;
        project.services.insert(service_name, service);
    }

    tracing::debug!(
        project = %project.name,
        services = project.services.len(),
        "loaded compose project"
    );

    Ok(project)
}

fn convert_service(name: &str, raw: RawService, working_dir: &Path) -> Result<Service> {
    let mut service = Service::new(name).with_working_dir(working_dir);
    service.image = raw.image;

    if let Some(environment) = raw.environment {
        service.environment = parse_environment(environment);
    }

    if let Some(labels) = raw.labels {
        service.labels = parse_labels(labels);
    }

    for port in raw.ports {
        service.ports.push(parse_port(name, port)?);
    }
    for exposed in raw.expose {
        let port = parse_short_port(name, &scalar_to_string(&exposed))?;
        if !service.ports.contains(&port) {
            service.ports.push(port);
        }
    }

    for volume in raw.volumes {
        service.volumes.push(parse_volume(name, volume)?);
    }

    service.depends_on = match raw.depends_on {
        Some(DependsOn::List(list)) => list,
        Some(DependsOn::Map(map)) => map.into_keys().collect(),
        None => Vec::new(),
    };

    service.command = raw.command.map(split_command).unwrap_or_default();
    service.entrypoint = raw.entrypoint.map(split_command).unwrap_or_default();

    Ok(service)
}

fn parse_environment(raw: ListOrMap) -> BTreeMap<String, Option<String>> {
    match raw {
        ListOrMap::List(items) => items
            .into_iter()
            .map(|item| match item.split_once('=') {
                Some((key, value)) => (key.to_string(), Some(value.to_string())),
                None => {
                    let value = std::env::var(&item).ok();
                    (item, value)
                }
            })
            .collect(),
        ListOrMap::Map(map) => map
            .into_iter()
            .map(|(key, value)| {
                let value = match value {
                    Some(v) => Some(scalar_to_string(&v)),
                    None => std::env::var(&key).ok(),
                };
                (key, value)
            })
            .collect(),
    }
}

fn parse_labels(raw: ListOrMap) -> BTreeMap<String, String> {
    match raw {
        ListOrMap::List(items) => items
            .into_iter()
            .map(|item| match item.split_once('=') {
                Some((key, value)) => (key.to_string(), value.to_string()),
                None => (item, String::new()),
            })
            .collect(),
        ListOrMap::Map(map) => map
            .into_iter()
            .map(|(key, value)| {
                let value = value.map(|v| scalar_to_string(&v)).unwrap_or_default();
                (key, value)
            })
            .collect(),
    }
}

fn parse_port(service: &str, raw: RawPort) -> Result<ServicePort> {
    match raw {
        RawPort::Long { target, protocol } => {
            let protocol = match protocol {
                Some(p) => PortProtocol::parse(&p).ok_or_else(|| {
                    CoreError::invalid_service(service, format!("unknown port protocol '{}'", p))
                })?,
                None => PortProtocol::Tcp,
            };
            Ok(ServicePort { target, protocol })
        }
        RawPort::Short(value) => parse_short_port(service, &scalar_to_string(&value)),
    }
}

/// Parse `[host:][published:]target[/protocol]`, keeping only the target
fn parse_short_port(service: &str, spec: &str) -> Result<ServicePort> {
    let (ports, protocol) = match spec.rsplit_once('/') {
        Some((ports, proto)) => {
            let protocol = PortProtocol::parse(proto).ok_or_else(|| {
                CoreError::invalid_service(service, format!("unknown port protocol '{}'", proto))
            })?;
            (ports, protocol)
        }
        None => (spec, PortProtocol::Tcp),
    };

    let target = ports.rsplit(':').next().unwrap_or(ports).trim();
    if target.contains('-') {
        return Err(CoreError::invalid_service(
            service,
            format!("port ranges are not supported: '{}'", spec),
        ));
    }

    let target: u16 = target
        .parse()
        .ok()
        .filter(|port| *port > 0)
        .ok_or_else(|| CoreError::invalid_service(service, format!("invalid port '{}'", spec)))?;

    Ok(ServicePort { target, protocol })
}

fn parse_volume(service: &str, raw: RawVolume) -> Result<ServiceVolume> {
    match raw {
        RawVolume::Long {
            kind,
            source,
            target,
            read_only,
        } => {
            let source = source.unwrap_or_default();
            let kind = match kind.as_deref() {
                Some("bind") => VolumeKind::Bind,
                Some("volume") => VolumeKind::Volume,
                Some("tmpfs") => VolumeKind::Tmpfs,
                Some(other) => {
                    return Err(CoreError::invalid_service(
                        service,
                        format!("unsupported volume type '{}'", other),
                    ));
                }
                None => volume_kind_for(&source),
            };
            Ok(ServiceVolume {
                kind,
                source,
                target,
                read_only,
            })
        }
        RawVolume::Short(spec) => {
            let parts: Vec<&str> = spec.split(':').collect();
            match parts.as_slice() {
                [target] => Ok(ServiceVolume::named("", *target)),
                [source, target, rest @ ..] => {
                    let read_only = rest
                        .first()
                        .map(|mode| mode.split(',').any(|m| m == "ro"))
                        .unwrap_or(false);
                    Ok(ServiceVolume {
                        kind: volume_kind_for(source),
                        source: source.to_string(),
                        target: target.to_string(),
                        read_only,
                    })
                }
                [] => Err(CoreError::invalid_service(service, "empty volume definition")),
            }
        }
    }
}

fn volume_kind_for(source: &str) -> VolumeKind {
    if source.starts_with('.') || source.starts_with('/') || source.starts_with('~') {
        VolumeKind::Bind
    } else {
        VolumeKind::Volume
    }
}

/// Split a string command on whitespace; lists are kept as-is
fn split_command(raw: StringOrList) -> Vec<String> {
    match raw {
        StringOrList::String(s) => s.split_whitespace().map(str::to_string).collect(),
        StringOrList::List(list) => list,
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Null => String::new(),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}
