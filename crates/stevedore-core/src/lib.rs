//! Stevedore Core - Core types for the compose to Helm chart converter
//!
//! This crate provides the foundational types used throughout Stevedore:
//! - `Project`: The parsed compose project (services, volumes, ports)
//! - `compose`: A loader for the subset of the Compose format Stevedore consumes
//! - `overrides`: The optional `stevedore.yaml` label override file
//! - `ChartMetadata`: The `Chart.yaml` document
//! - `version`: Version string resolution

pub mod chart;
pub mod compose;
pub mod error;
pub mod overrides;
pub mod project;
pub mod version;

pub use chart::ChartMetadata;
pub use compose::{DEFAULT_COMPOSE_FILES, find_compose_file, load_project, parse_project};
pub use error::{CoreError, Result};
pub use overrides::{
    OVERRIDE_FILE_NAMES, Overrides, apply_overrides, find_override_file, load_overrides,
};
pub use project::{PortProtocol, Project, Service, ServicePort, ServiceVolume, VolumeKind};
pub use version::{parse_chart_version, resolve_version};

/// Prefix shared by every Stevedore label (`stevedore.io/<name>`)
pub const LABEL_PREFIX: &str = "stevedore.io";
