//! Chart assembly
//!
//! Turns a `GenerationOutput` into the files of a Helm chart.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use stevedore_core::ChartMetadata;

use crate::error::Result;
use crate::generator::GenerationOutput;
use crate::resource::{Manifest, ResourceKind};

const HELPERS_TEMPLATE: &str = r#"{{/*
Expand the name of the chart.
*/}}
{{- define "__APP__.name" -}}
{{- default .Chart.Name .Values.nameOverride | trunc 63 | trimSuffix "-" }}
{{- end }}

{{/*
Create a default fully qualified app name, truncated to 63 characters.
If the release name contains the chart name it is used as the full name.
*/}}
{{- define "__APP__.fullname" -}}
{{- if .Values.fullnameOverride }}
{{- .Values.fullnameOverride | trunc 63 | trimSuffix "-" }}
{{- else }}
{{- $name := default .Chart.Name .Values.nameOverride }}
{{- if contains $name .Release.Name }}
{{- .Release.Name | trunc 63 | trimSuffix "-" }}
{{- else }}
{{- printf "%s-%s" .Release.Name $name | trunc 63 | trimSuffix "-" }}
{{- end }}
{{- end }}
{{- end }}

{{/*
Common labels
*/}}
{{- define "__APP__.labels" -}}
{{ include "__APP__.selectorLabels" . }}
app.kubernetes.io/managed-by: {{ .Release.Service }}
{{- end }}

{{/*
Selector labels
*/}}
{{- define "__APP__.selectorLabels" -}}
app.kubernetes.io/name: {{ include "__APP__.name" . }}
app.kubernetes.io/instance: {{ .Release.Name }}
{{- end }}
"#;

/// Files of a chart, keyed by path relative to the chart root
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChartTree {
    files: BTreeMap<PathBuf, String>,
}

impl ChartTree {
    pub fn insert(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files.insert(path.into(), content.into());
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.files.get(path.as_ref()).map(String::as_str)
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.files.keys().map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Write every file under `root`, returning the written paths
    pub fn write_to(&self, root: &Path) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(self.files.len());
        for (relative, content) in &self.files {
            let path = root.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, content)?;
            written.push(path);
        }
        Ok(written)
    }
}

/// Assembles the chart tree
#[derive(Debug, Clone)]
pub struct ChartBuilder {
    metadata: ChartMetadata,
}

impl ChartBuilder {
    pub fn new(metadata: ChartMetadata) -> Self {
        Self { metadata }
    }

    pub fn build(&self, output: &GenerationOutput) -> Result<ChartTree> {
        let app = &self.metadata.name;
        let mut tree = ChartTree::default();

        tree.insert("Chart.yaml", self.metadata.to_yaml()?);
        tree.insert("values.yaml", output.values.to_yaml()?);
        tree.insert("templates/_helpers.tpl", helpers(app));
        tree.insert("templates/NOTES.txt", notes(output));

        for resource in &output.resources {
            tree.insert(Path::new("templates").join(&resource.path), resource.to_yaml()?);
        }

        tracing::debug!(files = tree.len(), chart = %app, "chart assembled");
        Ok(tree)
    }
}

/// `_helpers.tpl` for a chart
pub fn helpers(app: &str) -> String {
    HELPERS_TEMPLATE.replace("__APP__", app)
}

fn notes(output: &GenerationOutput) -> String {
    let mut notes = String::from(
        "Your release is named {{ .Release.Name }}.\n\n\
         To learn more about the release, try:\n\n  \
         $ helm status {{ .Release.Name }}\n  \
         $ helm get all {{ .Release.Name }}\n",
    );

    let mut urls = Vec::new();
    for resource in output.resources_of(ResourceKind::Ingress) {
        let Manifest::Ingress(ingress) = &resource.manifest else {
            continue;
        };
        let Some(spec) = &ingress.spec else {
            continue;
        };
        let scheme = if spec.tls.is_some() { "https" } else { "http" };
        for rule in spec.rules.iter().flatten() {
            let host = rule.host.as_deref().unwrap_or_default();
            for path in rule.http.iter().flat_map(|http| http.paths.iter()) {
                let path = path.path.as_deref().unwrap_or("/");
                let line = format!("  {}: {}://{}{}\n", resource.service, scheme, host, path);
                urls.push(match &resource.condition {
                    Some(condition) => format!("{{{{- if {} }}}}\n{}{{{{- end }}}}\n", condition, line),
                    None => line,
                });
            }
        }
    }

    if !urls.is_empty() {
        notes.push_str("\nApplication URLs:\n");
        for url in urls {
            notes.push_str(&url);
        }
    }
    notes
}
