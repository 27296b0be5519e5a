//! Environment partition
//!
//! Every environment variable of a service lands in exactly one bucket.
//! Precedence among label-declared buckets: secrets, then map-env, then
//! values; everything else is inlined into the ConfigMap.

use std::collections::BTreeMap;

use stevedore_core::Service;

use crate::directives::Directives;
use crate::error::{ConversionWarning, WarningCategory};

/// Placeholder replaced by the chart name in map-env values
pub const APP_PLACEHOLDER: &str = "__APP__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EnvBucket {
    /// Routed to the service Secret
    Secret,
    /// Literal override from map-env, stored in the ConfigMap
    MapEnv,
    /// Exposed as a chart value
    Value,
    /// Inlined into the ConfigMap
    ConfigMap,
}

/// Environment of one service split into disjoint buckets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvPartition {
    pub secrets: BTreeMap<String, String>,
    pub overridden: BTreeMap<String, String>,
    pub values: BTreeMap<String, String>,
    pub inlined: BTreeMap<String, String>,
}

impl EnvPartition {
    /// Partition the environment of `service`
    pub fn compute(
        service: &Service,
        directives: &Directives,
        app_name: &str,
    ) -> (Self, Vec<ConversionWarning>) {
        let mut partition = Self::default();
        let mut warnings = Vec::new();

        for name in &directives.secrets {
            if !service.environment.contains_key(name) {
                warnings.push(
                    ConversionWarning::warning(
                        WarningCategory::Environment,
                        &service.name,
                        format!("secret '{}' is not defined in the environment, ignored", name),
                    )
                    .with_suggestion("add the variable to the service environment"),
                );
            }
        }

        for (name, value) in &directives.map_env {
            if directives.secrets.contains(name) {
                continue;
            }
            partition
                .overridden
                .insert(name.clone(), value.replace(APP_PLACEHOLDER, app_name));
        }

        for (name, value) in &service.environment {
            if partition.overridden.contains_key(name) {
                continue;
            }
            let value = match value {
                Some(value) => value.clone(),
                None => {
                    warnings.push(ConversionWarning::warning(
                        WarningCategory::Environment,
                        &service.name,
                        format!("variable '{}' has no value, an empty string is used", name),
                    ));
                    String::new()
                }
            };

            if directives.secrets.contains(name) {
                partition.secrets.insert(name.clone(), value);
            } else if directives.values.contains_key(name) {
                partition.values.insert(name.clone(), value);
            } else {
                partition.inlined.insert(name.clone(), value);
            }
        }

        (partition, warnings)
    }

    /// The four buckets, in precedence order
    pub fn buckets(&self) -> [(EnvBucket, &BTreeMap<String, String>); 4] {
        [
            (EnvBucket::Secret, &self.secrets),
            (EnvBucket::MapEnv, &self.overridden),
            (EnvBucket::Value, &self.values),
            (EnvBucket::ConfigMap, &self.inlined),
        ]
    }

    /// Bucket holding `name`
    pub fn bucket_of(&self, name: &str) -> Option<EnvBucket> {
        self.buckets()
            .into_iter()
            .find(|(_, vars)| vars.contains_key(name))
            .map(|(bucket, _)| bucket)
    }

    /// Key/value pairs stored in the plain ConfigMap
    pub fn config_map_data(&self) -> BTreeMap<String, String> {
        self.overridden
            .iter()
            .chain(self.inlined.iter())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
