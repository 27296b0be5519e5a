//! Label vocabulary
//!
//! Every label lives under `stevedore.io/`. The vocabulary is closed: a key
//! under the prefix that is not listed here is rejected.

use std::fmt;

use stevedore_core::LABEL_PREFIX;

/// Maximum edit distance for "did you mean" suggestions
const MAX_SUGGESTION_DISTANCE: usize = 3;

/// A recognized label
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LabelKind {
    Ports,
    Ingress,
    Secrets,
    MapEnv,
    ConfigMapFiles,
    Ignore,
    Values,
    HealthCheck,
    MainApp,
}

impl LabelKind {
    /// All labels, in documentation order
    pub const ALL: &'static [LabelKind] = &[
        Self::MainApp,
        Self::Values,
        Self::Secrets,
        Self::Ports,
        Self::Ingress,
        Self::MapEnv,
        Self::HealthCheck,
        Self::ConfigMapFiles,
        Self::Ignore,
    ];

    /// Bare name, without the prefix
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ports => "ports",
            Self::Ingress => "ingress",
            Self::Secrets => "secrets",
            Self::MapEnv => "map-env",
            Self::ConfigMapFiles => "configmap-files",
            Self::Ignore => "ignore",
            Self::Values => "values",
            Self::HealthCheck => "health-check",
            Self::MainApp => "main-app",
        }
    }

    /// Full label key, `stevedore.io/<name>`
    pub fn key(&self) -> String {
        format!("{}/{}", LABEL_PREFIX, self.name())
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|kind| kind.name() == name)
    }

    /// One-line summary
    pub fn summary(&self) -> &'static str {
        match self {
            Self::Ports => "Ports to expose in addition to the compose ports",
            Self::Ingress => "Expose the service through an Ingress",
            Self::Secrets => "Environment variables stored in a Secret",
            Self::MapEnv => "Override environment values in the generated ConfigMap",
            Self::ConfigMapFiles => "Files or directories embedded in ConfigMaps",
            Self::Ignore => "Do not generate anything for this service",
            Self::Values => "Environment variables exposed as chart values",
            Self::HealthCheck => "Liveness and readiness probes",
            Self::MainApp => "Use the image tag of this service as chart appVersion",
        }
    }

    /// Value grammar and an example
    pub fn long_help(&self) -> &'static str {
        match self {
            Self::Ports => {
                "A YAML list of port numbers. A comma separated list is also accepted.\n\n\
                 labels:\n  stevedore.io/ports: |\n    - 8080\n    - 8443"
            }
            Self::Ingress => {
                "A YAML mapping. `port` defaults to the first service port, `path` to `/`.\n\
                 Keys: port, hostname, path, class, enabled, annotations, tls {enabled, secretName}.\n\n\
                 labels:\n  stevedore.io/ingress: |\n    port: 80\n    hostname: shop.example.com"
            }
            Self::Secrets => {
                "A YAML list of environment variable names moved out of the ConfigMap\n\
                 and into a Secret.\n\n\
                 labels:\n  stevedore.io/secrets: |\n    - DB_PASSWORD"
            }
            Self::MapEnv => {
                "A YAML mapping of variable name to value. `__APP__` is replaced by the\n\
                 chart name. Variables missing from the compose environment are added.\n\n\
                 labels:\n  stevedore.io/map-env: |\n    DB_HOST: __APP__-database"
            }
            Self::ConfigMapFiles => {
                "A YAML list of paths relative to the compose file. A directory becomes\n\
                 one ConfigMap holding its files; subdirectories are skipped.\n\n\
                 labels:\n  stevedore.io/configmap-files: |\n    - ./conf/nginx.conf"
            }
            Self::Ignore => {
                "A boolean (true/false/yes/no/1/0).\n\n\
                 labels:\n  stevedore.io/ignore: \"true\""
            }
            Self::Values => {
                "A YAML list of variable names, or `NAME: description` mappings. Each\n\
                 variable becomes `<service>.environment.<NAME>` in values.yaml.\n\n\
                 labels:\n  stevedore.io/values: |\n    - LOG_LEVEL\n    - DB_NAME: the database name"
            }
            Self::HealthCheck => {
                "A YAML mapping with `livenessProbe` and/or `readinessProbe`, using the\n\
                 Kubernetes probe format.\n\n\
                 labels:\n  stevedore.io/health-check: |\n    livenessProbe:\n      httpGet:\n        path: /health\n        port: 80"
            }
            Self::MainApp => {
                "A boolean. The image tag of the main service becomes the chart appVersion.\n\n\
                 labels:\n  stevedore.io/main-app: \"true\""
            }
        }
    }
}

impl fmt::Display for LabelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Closest known label for an unknown bare name
pub fn suggest_label(name: &str) -> Option<LabelKind> {
    LabelKind::ALL
        .iter()
        .copied()
        .map(|kind| (strsim::levenshtein(name, kind.name()), kind))
        .filter(|(distance, _)| *distance <= MAX_SUGGESTION_DISTANCE)
        .min()
        .map(|(_, kind)| kind)
}
