//! values.yaml content

use std::collections::BTreeMap;

use serde::Serialize;

use crate::directives::Directives;
use crate::error::Result;
use crate::partition::EnvPartition;

/// Host used when the ingress label has no hostname
pub const DEFAULT_INGRESS_HOST: &str = "chart-example.local";

const DEFAULT_TAG: &str = "latest";

/// Split an image reference into repository and tag
///
/// Digest references keep the digest in the repository and use the
/// default tag.
///
/// ```
/// use stevedore_convert::values::split_image;
///
/// assert_eq!(split_image("nginx:1.25"), ("nginx".to_string(), "1.25".to_string()));
/// assert_eq!(split_image("localhost:5000/app"), ("localhost:5000/app".to_string(), "latest".to_string()));
/// ```
pub fn split_image(image: &str) -> (String, String) {
    if image.contains('@') {
        return (image.to_string(), DEFAULT_TAG.to_string());
    }
    let name_start = image.rfind('/').map(|i| i + 1).unwrap_or(0);
    match image[name_start..].rfind(':') {
        Some(colon) => {
            let split = name_start + colon;
            (image[..split].to_string(), image[split + 1..].to_string())
        }
        None => (image.to_string(), DEFAULT_TAG.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Repository {
    pub image: String,
    pub tag: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngressValues {
    pub enabled: bool,
    pub host: String,
}

/// Values of one service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceValues {
    pub repository: Repository,

    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingress: Option<IngressValues>,

    /// Descriptions of the `environment` entries, rendered as comments
    #[serde(skip)]
    pub descriptions: BTreeMap<String, String>,
}

impl ServiceValues {
    pub fn new(image: &str, directives: &Directives, partition: &EnvPartition) -> Self {
        let (image, tag) = split_image(image);
        let descriptions = directives
            .values
            .iter()
            .filter(|(name, _)| partition.values.contains_key(*name))
            .filter_map(|(name, description)| {
                description.as_ref().map(|d| (name.clone(), d.clone()))
            })
            .collect();

        Self {
            repository: Repository { image, tag },
            environment: partition.values.clone(),
            ingress: directives.ingress.as_ref().map(|ingress| IngressValues {
                enabled: ingress.enabled,
                host: ingress
                    .hostname
                    .clone()
                    .unwrap_or_else(|| DEFAULT_INGRESS_HOST.to_string()),
            }),
            descriptions,
        }
    }
}

/// The whole values.yaml, keyed by service name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartValues {
    pub services: BTreeMap<String, ServiceValues>,
}

impl ChartValues {
    pub fn insert(&mut self, service: &str, values: ServiceValues) {
        self.services.insert(service.to_string(), values);
    }

    pub fn get(&self, service: &str) -> Option<&ServiceValues> {
        self.services.get(service)
    }

    /// Render values.yaml, variable descriptions first as comments
    pub fn to_yaml(&self) -> Result<String> {
        let mut out = String::new();
        for (service, values) in &self.services {
            for (name, description) in &values.descriptions {
                out.push_str(&format!("# {}.environment.{}: {}\n", service, name, description));
            }
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&serde_yaml::to_string(&self.services)?);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directives::IngressDirective;

    #[test]
    fn test_split_image() {
        assert_eq!(split_image("nginx"), ("nginx".to_string(), "latest".to_string()));
        assert_eq!(split_image("nginx:1.25"), ("nginx".to_string(), "1.25".to_string()));
        assert_eq!(
            split_image("registry.local:5000/team/app:2.0"),
            ("registry.local:5000/team/app".to_string(), "2.0".to_string())
        );
        assert_eq!(
            split_image("nginx@sha256:abcd"),
            ("nginx@sha256:abcd".to_string(), "latest".to_string())
        );
    }

    #[test]
    fn test_service_values() {
        let directives = Directives {
            values: BTreeMap::from([
                ("LOG_LEVEL".to_string(), Some("verbosity".to_string())),
                ("UNSET".to_string(), Some("not in the environment".to_string())),
            ]),
            ingress: Some(IngressDirective::default()),
            ..Default::default()
        };
        let partition = EnvPartition {
            values: BTreeMap::from([("LOG_LEVEL".to_string(), "info".to_string())]),
            ..Default::default()
        };

        let values = ServiceValues::new("nginx:1.25", &directives, &partition);
        assert_eq!(values.repository.tag, "1.25");
        assert_eq!(values.environment["LOG_LEVEL"], "info");
        assert_eq!(values.ingress.as_ref().unwrap().host, DEFAULT_INGRESS_HOST);
        assert_eq!(values.descriptions.len(), 1);

        let mut chart_values = ChartValues::default();
        chart_values.insert("web", values);
        let yaml = chart_values.to_yaml().unwrap();
        assert!(yaml.starts_with("# web.environment.LOG_LEVEL: verbosity\n"));
        assert!(yaml.contains("repository:"));
        assert!(yaml.contains("host: chart-example.local"));
        assert!(!yaml.contains("descriptions"));
    }
}
