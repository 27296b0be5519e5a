//! Error and warning types for the generator
//!
//! Errors follow three families:
//! - configuration errors (bad label values, unknown labels, missing files)
//!   which abort the affected service only, unknown labels excepted;
//! - I/O errors while reading file content, scoped to a service;
//! - internal consistency errors (dangling references, duplicate names)
//!   which abort the whole generation.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

use crate::resource::ResourceKind;

/// Generator error
#[derive(Debug, Error, Diagnostic)]
pub enum ConvertError {
    #[error("service '{service}': invalid value for label '{label}': {message} (value: {value:?})")]
    #[diagnostic(code(stevedore::label::invalid))]
    Label {
        service: String,
        label: String,
        value: String,
        message: String,
    },

    #[error("service '{service}': unknown label '{label}'")]
    #[diagnostic(code(stevedore::label::unknown))]
    UnknownLabel {
        service: String,
        label: String,
        #[help]
        suggestion: Option<String>,
    },

    #[error("service '{service}': path {} does not exist", .path.display())]
    #[diagnostic(
        code(stevedore::files::missing),
        help("paths in configmap-files are relative to the compose file directory")
    )]
    MissingPath { service: String, path: PathBuf },

    #[error("service '{service}': failed to read {}: {source}", .path.display())]
    #[diagnostic(code(stevedore::files::read))]
    FileRead {
        service: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{owner} references {kind} '{name}' which is not part of the generated chart")]
    #[diagnostic(code(stevedore::internal::dangling_reference))]
    DanglingReference {
        owner: String,
        kind: ResourceKind,
        name: String,
    },

    #[error("service '{service}': {kind} name '{name}' is already generated for service '{other}'")]
    #[diagnostic(
        code(stevedore::naming::clash),
        help("service names must stay distinct once lowercased and reduced to [a-z0-9-]")
    )]
    NameClash {
        service: String,
        kind: ResourceKind,
        name: String,
        other: String,
    },

    #[error("chart name {name:?} has no character left once reduced to [a-z0-9-]")]
    #[diagnostic(
        code(stevedore::chart::invalid_name),
        help("set a project `name:` in the compose file or pass --app-name")
    )]
    InvalidAppName { name: String },

    #[error("{owner} declares volume '{volume}' for two different sources")]
    #[diagnostic(code(stevedore::internal::volume_conflict))]
    VolumeConflict { owner: String, volume: String },

    #[error("{owner} mounts volume '{volume}' which is not declared in its pod")]
    #[diagnostic(code(stevedore::internal::unbound_mount))]
    UnboundMount { owner: String, volume: String },

    #[error("{kind} '{name}' is generated more than once")]
    #[diagnostic(code(stevedore::internal::duplicate_resource))]
    DuplicateResource { kind: ResourceKind, name: String },

    #[error("{} service(s) failed to convert:\n{}", .failures.len(), format_failures(.failures))]
    #[diagnostic(code(stevedore::services_failed))]
    ServiceFailures { failures: Vec<ServiceFailure> },

    #[error("Output directory already exists: {}", .0.display())]
    #[diagnostic(code(stevedore::output_exists), help("use --force to overwrite it"))]
    OutputExists(PathBuf),

    #[error(transparent)]
    Core(#[from] stevedore_core::CoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl ConvertError {
    /// Create a label error
    pub fn label(
        service: &str,
        label: &str,
        value: &str,
        message: impl Into<String>,
    ) -> Self {
        Self::Label {
            service: service.to_string(),
            label: label.to_string(),
            value: value.to_string(),
            message: message.into(),
        }
    }

    /// Errors that indicate a broken invariant in the generator itself
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::DanglingReference { .. }
                | Self::UnboundMount { .. }
                | Self::VolumeConflict { .. }
                | Self::DuplicateResource { .. }
        )
    }

    /// Errors that abort the whole generation rather than one service
    pub fn is_global(&self) -> bool {
        self.is_internal() || matches!(self, Self::UnknownLabel { .. })
    }

    /// Service the error is attributed to, if any
    pub fn service(&self) -> Option<&str> {
        match self {
            Self::Label { service, .. }
            | Self::UnknownLabel { service, .. }
            | Self::MissingPath { service, .. }
            | Self::FileRead { service, .. }
            | Self::NameClash { service, .. } => Some(service),
            _ => None,
        }
    }
}

/// A service whose resources could not be generated
#[derive(Debug)]
pub struct ServiceFailure {
    pub service: String,
    pub error: ConvertError,
}

fn format_failures(failures: &[ServiceFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("  - {}", f.error))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Result type for generator operations
pub type Result<T> = std::result::Result<T, ConvertError>;

// =============================================================================
// WARNING SYSTEM
// =============================================================================

/// Warning severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WarningSeverity {
    /// Informational - conversion succeeded with a minor adjustment
    Info,
    /// Warning - conversion succeeded but manual review recommended
    Warning,
}

impl WarningSeverity {
    /// Get the emoji icon for this severity
    pub fn icon(&self) -> &'static str {
        match self {
            Self::Info => "ℹ",
            Self::Warning => "⚠",
        }
    }

    /// Get the label for this severity
    pub fn label(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
        }
    }
}

/// Warning category for grouping related warnings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WarningCategory {
    /// Volume that has no faithful Kubernetes counterpart
    Volume,
    /// Environment variable handling
    Environment,
    /// File-backed ConfigMap content
    Files,
    /// Label usage
    Labels,
    /// Container image
    Image,
}

impl WarningCategory {
    /// Get the display label
    pub fn label(&self) -> &'static str {
        match self {
            Self::Volume => "volume",
            Self::Environment => "environment",
            Self::Files => "files",
            Self::Labels => "labels",
            Self::Image => "image",
        }
    }
}

/// Warning with service context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionWarning {
    pub severity: WarningSeverity,
    pub category: WarningCategory,
    /// Service the warning was raised for
    pub service: String,
    /// Human-readable message
    pub message: String,
    /// Suggested fix
    pub suggestion: Option<String>,
}

impl ConversionWarning {
    /// Create a warning-level warning
    pub fn warning(category: WarningCategory, service: &str, message: impl Into<String>) -> Self {
        Self {
            severity: WarningSeverity::Warning,
            category,
            service: service.to_string(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Create an info-level warning
    pub fn info(category: WarningCategory, service: &str, message: impl Into<String>) -> Self {
        Self {
            severity: WarningSeverity::Info,
            ..Self::warning(category, service, message)
        }
    }

    /// Add suggestion to warning
    pub fn with_suggestion(mut self, suggestion: &str) -> Self {
        self.suggestion = Some(suggestion.to_string());
        self
    }

    /// Log the warning through `tracing` and hand it back
    pub(crate) fn emit(self) -> Self {
        tracing::warn!(
            service = %self.service,
            category = self.category.label(),
            "{}",
            self.message
        );
        self
    }
}

impl std::fmt::Display for ConversionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Format: [severity] service - message
        write!(
            f,
            "[{}] {} - {}",
            self.severity.label(),
            self.service,
            self.message
        )?;

        if let Some(ref suggestion) = self.suggestion {
            write!(f, "\n  {} {}", self.severity.icon(), suggestion)?;
        }

        Ok(())
    }
}
