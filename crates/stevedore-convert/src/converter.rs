//! Conversion driver
//!
//! Loads a compose project, applies the override file, generates the
//! manifests and writes the chart.

use std::fs;
use std::path::{Path, PathBuf};

use stevedore_core::{
    ChartMetadata, CoreError, apply_overrides, find_compose_file, find_override_file,
    load_overrides, load_project, resolve_version,
};

use crate::chart::ChartBuilder;
use crate::error::{ConversionWarning, ConvertError, Result};
use crate::generator::Generator;
use crate::naming::sanitize;

/// Chart version used when none is given
pub const DEFAULT_CHART_VERSION: &str = "0.1.0";

/// Options for the converter
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Overwrite existing output directory
    pub force: bool,
    /// Only compute the chart, write nothing
    pub dry_run: bool,
    /// Chart name, defaults to the sanitized project name
    pub app_name: Option<String>,
    pub chart_version: String,
    /// Chart appVersion, defaults to the `main-app` image tag
    pub app_version: Option<String>,
    pub icon: Option<String>,
    pub description: Option<String>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            force: false,
            dry_run: false,
            app_name: None,
            chart_version: DEFAULT_CHART_VERSION.to_string(),
            app_version: None,
            icon: None,
            description: None,
        }
    }
}

/// Result of a conversion
#[derive(Debug)]
pub struct ConversionResult {
    /// Chart name
    pub app_name: String,
    /// Files written, or that would be written on a dry run
    pub files: Vec<PathBuf>,
    /// Number of generated Kubernetes manifests
    pub resources: usize,
    /// Services skipped through the `ignore` label
    pub ignored: Vec<String>,
    pub warnings: Vec<ConversionWarning>,
}

/// Version string stamped on generated resources
pub fn tool_version() -> String {
    resolve_version(
        env!("CARGO_PKG_VERSION"),
        option_env!("STEVEDORE_BUILD_VERSION"),
    )
}

/// Convert a compose project to a Helm chart
pub struct Converter {
    options: ConvertOptions,
}

impl Converter {
    pub fn new(options: ConvertOptions) -> Self {
        Self { options }
    }

    /// Convert `compose_path` (a compose file, or a directory holding one)
    /// into a chart at `output_path`
    pub fn convert(&self, compose_path: &Path, output_path: &Path) -> Result<ConversionResult> {
        let compose_file = if compose_path.is_dir() {
            find_compose_file(compose_path).ok_or_else(|| CoreError::ComposeNotFound {
                path: compose_path.display().to_string(),
            })?
        } else {
            compose_path.to_path_buf()
        };

        if output_path.exists() && !self.options.force {
            return Err(ConvertError::OutputExists(output_path.to_path_buf()));
        }

        let mut project = load_project(&compose_file)?;
        tracing::info!(
            compose = %compose_file.display(),
            services = project.services.len(),
            "project loaded"
        );

        if let Some(override_file) = find_override_file(&project.working_dir) {
            let overrides = load_overrides(&override_file)?;
            apply_overrides(&mut project, &overrides, &override_file)?;
            tracing::info!(file = %override_file.display(), "label overrides applied");
        }

        let raw_name = self.options.app_name.as_deref().unwrap_or(&project.name);
        let app_name = sanitize(raw_name);
        if app_name.is_empty() {
            return Err(ConvertError::InvalidAppName {
                name: raw_name.to_string(),
            });
        }

        let output = Generator::new(&app_name, tool_version()).generate(&project)?;
        if !output.failures.is_empty() {
            return Err(ConvertError::ServiceFailures {
                failures: output.failures,
            });
        }

        let mut metadata = ChartMetadata::new(&app_name, &self.options.chart_version)?;
        if let Some(app_version) = self.options.app_version.clone().or_else(|| output.app_version.clone()) {
            metadata = metadata.with_app_version(app_version);
        }
        if let Some(icon) = &self.options.icon {
            metadata = metadata.with_icon(icon);
        }
        if let Some(description) = &self.options.description {
            metadata = metadata.with_description(description);
        }

        let tree = ChartBuilder::new(metadata).build(&output)?;

        let files = if self.options.dry_run {
            tree.paths().map(|path| output_path.join(path)).collect()
        } else {
            if output_path.exists() {
                fs::remove_dir_all(output_path)?;
            }
            fs::create_dir_all(output_path)?;
            tree.write_to(output_path)?
        };

        Ok(ConversionResult {
            app_name,
            files,
            resources: output.resources.len(),
            ignored: output.ignored,
            warnings: output.warnings,
        })
    }
}

/// Convenience function to convert a compose project
pub fn convert(compose_path: &Path, output_path: &Path) -> Result<ConversionResult> {
    Converter::new(ConvertOptions::default()).convert(compose_path, output_path)
}

/// Convert with options
pub fn convert_with_options(
    compose_path: &Path,
    output_path: &Path,
    options: ConvertOptions,
) -> Result<ConversionResult> {
    Converter::new(options).convert(compose_path, output_path)
}
