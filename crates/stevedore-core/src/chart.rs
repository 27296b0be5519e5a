//! Chart.yaml metadata

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CoreError, Result};
use crate::version::parse_chart_version;

/// Helm Chart.yaml structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartMetadata {
    /// API version (always v2)
    pub api_version: String,

    /// Chart name
    pub name: String,

    /// Chart description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Chart type (application or library)
    #[serde(rename = "type")]
    pub chart_type: String,

    /// Chart version (SemVer)
    pub version: String,

    /// App version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_version: Option<String>,

    /// Icon URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,

    /// Annotations
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl ChartMetadata {
    /// Create the metadata for a generated application chart
    pub fn new(name: impl Into<String>, version: &str) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(CoreError::MissingField {
                field: "name".to_string(),
            });
        }
        let version = parse_chart_version(version)?;

        Ok(Self {
            api_version: "v2".to_string(),
            description: Some(format!("A Helm chart for {}", name)),
            name,
            chart_type: "application".to_string(),
            version: version.to_string(),
            app_version: None,
            icon: None,
            annotations: BTreeMap::new(),
        })
    }

    pub fn with_app_version(mut self, app_version: impl Into<String>) -> Self {
        self.app_version = Some(app_version.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn with_annotation(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.annotations.insert(key.into(), value.into());
        self
    }

    /// Serialize to YAML string
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}
