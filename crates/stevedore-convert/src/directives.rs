//! Label interpreter
//!
//! Decodes raw label values into typed directives. Each label has its own
//! grammar; malformed values are errors carrying the service, the label key
//! and the raw value.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::Probe;
use serde::Deserialize;
use serde_yaml::Value;
use stevedore_core::Service;

use crate::error::{ConvertError, Result};
use crate::labels::{LabelKind, suggest_label};
use crate::naming::normalize_path;

/// Ingress label
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct IngressDirective {
    /// Service port to route to, first service port when absent
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default)]
    pub hostname: Option<String>,

    #[serde(default = "default_ingress_path")]
    pub path: String,

    /// Ingress class name
    #[serde(default)]
    pub class: Option<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub annotations: BTreeMap<String, String>,

    #[serde(default)]
    pub tls: TlsDirective,
}

impl Default for IngressDirective {
    fn default() -> Self {
        Self {
            port: None,
            hostname: None,
            path: default_ingress_path(),
            class: None,
            enabled: true,
            annotations: BTreeMap::new(),
            tls: TlsDirective::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct TlsDirective {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub secret_name: Option<String>,
}

fn default_ingress_path() -> String {
    "/".to_string()
}

fn default_true() -> bool {
    true
}

/// Health-check label
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HealthCheck {
    #[serde(default)]
    pub liveness_probe: Option<Probe>,
    #[serde(default)]
    pub readiness_probe: Option<Probe>,
}

/// A decoded label value
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    Ports(Vec<u16>),
    Ingress(IngressDirective),
    Secrets(Vec<String>),
    MapEnv(BTreeMap<String, String>),
    ConfigMapFiles(Vec<String>),
    Ignore(bool),
    /// Variable name to optional description
    Values(BTreeMap<String, Option<String>>),
    HealthCheck(HealthCheck),
    MainApp(bool),
}

/// Decode one raw label value
///
/// ```
/// use stevedore_convert::directives::{Directive, decode};
/// use stevedore_convert::labels::LabelKind;
///
/// assert_eq!(decode(LabelKind::Ports, "- 80\n- 443").unwrap(), Directive::Ports(vec![80, 443]));
/// assert_eq!(decode(LabelKind::Ports, "80, 443").unwrap(), Directive::Ports(vec![80, 443]));
/// ```
pub fn decode(kind: LabelKind, raw: &str) -> std::result::Result<Directive, String> {
    match kind {
        LabelKind::Ports => decode_ports(raw).map(Directive::Ports),
        LabelKind::Ingress => decode_yaml::<IngressDirective>(raw).map(Directive::Ingress),
        LabelKind::Secrets => decode_string_list(raw).map(Directive::Secrets),
        LabelKind::MapEnv => decode_map_env(raw).map(Directive::MapEnv),
        LabelKind::ConfigMapFiles => decode_paths(raw).map(Directive::ConfigMapFiles),
        LabelKind::Ignore => decode_bool(raw).map(Directive::Ignore),
        LabelKind::Values => decode_values(raw).map(Directive::Values),
        LabelKind::HealthCheck => decode_yaml::<HealthCheck>(raw).map(Directive::HealthCheck),
        LabelKind::MainApp => decode_bool(raw).map(Directive::MainApp),
    }
}

fn decode_yaml<T: serde::de::DeserializeOwned>(raw: &str) -> std::result::Result<T, String> {
    serde_yaml::from_str(raw).map_err(|e| e.to_string())
}

/// Strict YAML list first, comma separated integers as a fallback
fn decode_ports(raw: &str) -> std::result::Result<Vec<u16>, String> {
    match serde_yaml::from_str::<Vec<i64>>(raw) {
        Ok(ports) => ports.into_iter().map(check_port).collect(),
        Err(_) => raw
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| {
                part.parse::<i64>()
                    .map_err(|_| format!("'{}' is not a port number", part))
                    .and_then(check_port)
            })
            .collect(),
    }
}

fn check_port(port: i64) -> std::result::Result<u16, String> {
    u16::try_from(port)
        .ok()
        .filter(|p| *p > 0)
        .ok_or_else(|| format!("{} is not in the port range 1-65535", port))
}

fn decode_string_list(raw: &str) -> std::result::Result<Vec<String>, String> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    decode_yaml::<Vec<String>>(raw)
}

fn decode_paths(raw: &str) -> std::result::Result<Vec<String>, String> {
    let mut paths: Vec<String> = Vec::new();
    for path in decode_string_list(raw)? {
        if normalize_path(&path).is_empty() {
            return Err(format!("'{}' does not name a file or directory", path));
        }
        if !paths.iter().any(|p| normalize_path(p) == normalize_path(&path)) {
            paths.push(path);
        }
    }
    Ok(paths)
}

fn decode_map_env(raw: &str) -> std::result::Result<BTreeMap<String, String>, String> {
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    decode_yaml::<BTreeMap<String, Value>>(raw)?
        .into_iter()
        .map(|(name, value)| {
            scalar(&value)
                .map(|value| (name.clone(), value))
                .ok_or_else(|| format!("value of '{}' must be a scalar", name))
        })
        .collect()
}

fn decode_values(raw: &str) -> std::result::Result<BTreeMap<String, Option<String>>, String> {
    if raw.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    let mut values = BTreeMap::new();
    for entry in decode_yaml::<Vec<Value>>(raw)? {
        match entry {
            Value::String(name) => {
                values.insert(name, None);
            }
            Value::Mapping(mapping) if mapping.len() == 1 => {
                for (key, description) in mapping {
                    let name = key
                        .as_str()
                        .ok_or("variable names must be strings")?
                        .to_string();
                    values.insert(name, scalar(&description).filter(|d| !d.is_empty()));
                }
            }
            other => {
                return Err(format!(
                    "expected a variable name or a `NAME: description` mapping, found {:?}",
                    other
                ));
            }
        }
    }
    Ok(values)
}

fn decode_bool(raw: &str) -> std::result::Result<bool, String> {
    match raw.trim().trim_matches('"').to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        other => Err(format!("'{}' is not a boolean", other)),
    }
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
    }
}

/// All directives of one service
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Directives {
    pub ports: Vec<u16>,
    pub ingress: Option<IngressDirective>,
    pub secrets: Vec<String>,
    pub map_env: BTreeMap<String, String>,
    pub configmap_files: Vec<String>,
    pub ignore: bool,
    pub values: BTreeMap<String, Option<String>>,
    pub health_check: Option<HealthCheck>,
    pub main_app: bool,
}

impl Directives {
    /// Reject label keys outside the vocabulary
    pub fn check_vocabulary(service: &Service) -> Result<()> {
        for (name, _) in service.stevedore_labels() {
            if LabelKind::from_name(name).is_none() {
                return Err(unknown_label(service, name));
            }
        }
        Ok(())
    }

    /// Decode every Stevedore label of a service
    pub fn interpret(service: &Service) -> Result<Self> {
        let mut directives = Self::default();
        for (name, raw) in service.stevedore_labels() {
            let kind = LabelKind::from_name(name).ok_or_else(|| unknown_label(service, name))?;
            let directive = decode(kind, raw)
                .map_err(|message| ConvertError::label(&service.name, &kind.key(), raw, message))?;
            tracing::debug!(service = %service.name, label = %kind, "decoded label");
            directives.apply(directive);
        }
        Ok(directives)
    }

    fn apply(&mut self, directive: Directive) {
        match directive {
            Directive::Ports(ports) => self.ports = ports,
            Directive::Ingress(ingress) => self.ingress = Some(ingress),
            Directive::Secrets(secrets) => self.secrets = secrets,
            Directive::MapEnv(map_env) => self.map_env = map_env,
            Directive::ConfigMapFiles(paths) => self.configmap_files = paths,
            Directive::Ignore(ignore) => self.ignore = ignore,
            Directive::Values(values) => self.values = values,
            Directive::HealthCheck(health_check) => self.health_check = Some(health_check),
            Directive::MainApp(main_app) => self.main_app = main_app,
        }
    }
}

fn unknown_label(service: &Service, name: &str) -> ConvertError {
    ConvertError::UnknownLabel {
        service: service.name.clone(),
        label: format!("{}/{}", stevedore_core::LABEL_PREFIX, name),
        suggestion: suggest_label(name).map(|kind| format!("did you mean '{}'?", kind.key())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ports_grammar() {
        assert_eq!(decode_ports("- 80\n- 443").unwrap(), vec![80, 443]);
        assert_eq!(decode_ports("[8080]").unwrap(), vec![8080]);
        assert_eq!(decode_ports("80,443").unwrap(), vec![80, 443]);
        assert_eq!(decode_ports(" 80 , 443 ,").unwrap(), vec![80, 443]);
        assert_eq!(decode_ports("8080").unwrap(), vec![8080]);
        assert!(decode_ports("- 0").is_err());
        assert!(decode_ports("- 70000").is_err());
        assert!(decode_ports("80,http").is_err());
    }

    #[test]
    fn test_ingress_defaults() {
        let Directive::Ingress(ingress) = decode(LabelKind::Ingress, "port: 80").unwrap() else {
            panic!("expected an ingress directive");
        };
        assert_eq!(ingress.port, Some(80));
        assert_eq!(ingress.path, "/");
        assert!(ingress.enabled);
        assert!(!ingress.tls.enabled);
    }

    #[test]
    fn test_ingress_rejects_unknown_keys() {
        let err = decode(LabelKind::Ingress, "port: 80\nhost: example.com").unwrap_err();
        assert!(err.contains("host"));
    }

    #[test]
    fn test_ingress_full() {
        let raw = r#"
port: 8080
hostname: shop.example.com
path: /api
class: nginx
annotations:
  nginx.ingress.kubernetes.io/rewrite-target: /
tls:
  enabled: true
  secretName: shop-tls
"#;
        let Directive::Ingress(ingress) = decode(LabelKind::Ingress, raw).unwrap() else {
            panic!("expected an ingress directive");
        };
        assert_eq!(ingress.hostname.as_deref(), Some("shop.example.com"));
        assert_eq!(ingress.class.as_deref(), Some("nginx"));
        assert_eq!(ingress.tls.secret_name.as_deref(), Some("shop-tls"));
        assert_eq!(ingress.annotations.len(), 1);
    }

    #[test]
    fn test_map_env_stringifies_scalars() {
        let Directive::MapEnv(map) = decode(LabelKind::MapEnv, "PORT: 80\nDEBUG: true\nHOST: __APP__-db").unwrap()
        else {
            panic!("expected a map-env directive");
        };
        assert_eq!(map["PORT"], "80");
        assert_eq!(map["DEBUG"], "true");
        assert_eq!(map["HOST"], "__APP__-db");

        assert!(decode(LabelKind::MapEnv, "LIST: [1, 2]").is_err());
    }

    #[test]
    fn test_values_entries() {
        let Directive::Values(values) =
            decode(LabelKind::Values, "- LOG_LEVEL\n- DB_NAME: the database name").unwrap()
        else {
            panic!("expected a values directive");
        };
        assert_eq!(values["LOG_LEVEL"], None);
        assert_eq!(values["DB_NAME"].as_deref(), Some("the database name"));

        assert!(decode(LabelKind::Values, "- [nested]").is_err());
    }

    #[test]
    fn test_configmap_paths_are_deduplicated() {
        let Directive::ConfigMapFiles(paths) =
            decode(LabelKind::ConfigMapFiles, "- ./conf\n- conf/\n- foo.txt").unwrap()
        else {
            panic!("expected a configmap-files directive");
        };
        assert_eq!(paths, vec!["./conf", "foo.txt"]);
        assert!(decode(LabelKind::ConfigMapFiles, "- ./").is_err());
    }

    #[test]
    fn test_booleans() {
        for raw in ["true", "yes", "1", "True", "YES", "true\n"] {
            assert_eq!(decode_bool(raw), Ok(true), "{raw}");
        }
        for raw in ["false", "no", "0"] {
            assert_eq!(decode_bool(raw), Ok(false), "{raw}");
        }
        assert!(decode_bool("maybe").is_err());
    }

    #[test]
    fn test_health_check() {
        let raw = "livenessProbe:\n  httpGet:\n    path: /health\n    port: 80\n";
        let Directive::HealthCheck(check) = decode(LabelKind::HealthCheck, raw).unwrap() else {
            panic!("expected a health-check directive");
        };
        let probe = check.liveness_probe.unwrap();
        assert_eq!(probe.http_get.unwrap().path.as_deref(), Some("/health"));
        assert!(check.readiness_probe.is_none());
    }

    #[test]
    fn test_interpret_collects_directives() {
        let service = Service::new("web")
            .with_label("ports", "- 8080")
            .with_label("secrets", "- PASSWORD")
            .with_label("ignore", "no");
        let directives = Directives::interpret(&service).unwrap();
        assert_eq!(directives.ports, vec![8080]);
        assert_eq!(directives.secrets, vec!["PASSWORD"]);
        assert!(!directives.ignore);
    }

    #[test]
    fn test_malformed_label_has_provenance() {
        let service = Service::new("web").with_label("ports", "eighty");
        match Directives::interpret(&service).unwrap_err() {
            ConvertError::Label {
                service,
                label,
                value,
                ..
            } => {
                assert_eq!(service, "web");
                assert_eq!(label, "stevedore.io/ports");
                assert_eq!(value, "eighty");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_label_is_rejected_with_suggestion() {
        let service = Service::new("web").with_label("port", "- 80");
        let err = Directives::check_vocabulary(&service).unwrap_err();
        assert!(err.is_global());
        match err {
            ConvertError::UnknownLabel { label, suggestion, .. } => {
                assert_eq!(label, "stevedore.io/port");
                assert_eq!(suggestion.as_deref(), Some("did you mean 'stevedore.io/ports'?"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
