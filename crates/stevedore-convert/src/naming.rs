//! Naming conventions shared by every builder
//!
//! Resources are registered under a *logical* name (the sanitized service
//! name, plus a path suffix for file-backed ConfigMaps). The Kubernetes
//! `metadata.name` is the logical name prefixed with the chart fullname
//! helper, so every generated object follows the release name.

use std::collections::BTreeMap;
use std::path::{Component, Path};

use once_cell::sync::Lazy;
use regex::Regex;
use stevedore_core::LABEL_PREFIX;

static NON_DNS_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid regex"));

/// Reduce a string to the DNS-label character set
///
/// ```
/// use stevedore_convert::naming::sanitize;
///
/// assert_eq!(sanitize("envéfoo.file"), "env-foo-file");
/// assert_eq!(sanitize("My_Service"), "my-service");
/// ```
pub fn sanitize(value: &str) -> String {
    let lower = value.to_lowercase();
    NON_DNS_RUN
        .replace_all(&lower, "-")
        .trim_matches('-')
        .to_string()
}

/// Normalize a label-referenced path: `./conf//nginx/` becomes `conf/nginx`
///
/// Only normal components are kept, so the result is always relative.
pub fn normalize_path(path: &str) -> String {
    Path::new(path)
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Name token derived from a path
pub fn path_to_name(path: &str) -> String {
    sanitize(&normalize_path(path))
}

/// Logical name of the resources owned by a service
pub fn logical_name(service: &str) -> String {
    sanitize(service)
}

/// Logical name of a file-backed ConfigMap
pub fn file_logical_name(service: &str, path: &str) -> String {
    format!("{}-{}", logical_name(service), path_to_name(path))
}

/// Templated `metadata.name` for a logical name
pub fn tpl_name(app: &str, logical: &str) -> String {
    format!("{{{{ include \"{}.fullname\" . }}}}-{}", app, logical)
}

/// Template expression reading a service entry of `values.yaml`
///
/// `index` keeps service names containing dashes addressable.
pub fn values_ref(service: &str, keys: &[&str]) -> String {
    let mut expr = format!("index .Values \"{}\"", service);
    for key in keys {
        expr.push_str(&format!(" \"{}\"", key));
    }
    expr
}

/// Provenance label naming the owning service
pub fn component_label() -> String {
    format!("{}/component", LABEL_PREFIX)
}

/// Labels identifying the pods of a service
pub fn selector_labels(app: &str, service: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        (
            "app.kubernetes.io/name".to_string(),
            format!("{{{{ include \"{}.name\" . }}}}", app),
        ),
        (
            "app.kubernetes.io/instance".to_string(),
            "{{ .Release.Name }}".to_string(),
        ),
        (component_label(), service.to_string()),
    ])
}

/// Labels set on every generated object
pub fn labels(app: &str, service: &str) -> BTreeMap<String, String> {
    let mut labels = selector_labels(app, service);
    labels.insert(
        "app.kubernetes.io/managed-by".to_string(),
        "{{ .Release.Service }}".to_string(),
    );
    labels
}

/// Annotations set on every generated object
pub fn annotations(version: &str) -> BTreeMap<String, String> {
    BTreeMap::from([(format!("{}/version", LABEL_PREFIX), version.to_string())])
}
