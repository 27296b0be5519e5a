//! Stevedore Convert - compose project to Helm chart generator
//!
//! This crate turns a parsed compose project into the Kubernetes manifests
//! of a Helm chart. Each service is driven by its `stevedore.io/*` labels:
//!
//! | Label                        | Effect                                         |
//! |------------------------------|------------------------------------------------|
//! | `stevedore.io/ports`         | extra container ports, and a Service           |
//! | `stevedore.io/ingress`       | an Ingress guarded by `<svc>.ingress.enabled`  |
//! | `stevedore.io/secrets`       | env vars moved into a Secret                   |
//! | `stevedore.io/map-env`       | literal overrides of env values                |
//! | `stevedore.io/configmap-files` | files embedded in ConfigMaps and mounted     |
//! | `stevedore.io/values`        | env vars exposed in `values.yaml`              |
//! | `stevedore.io/ignore`        | skip the service                               |
//!
//! The pipeline runs in three stages: label interpretation, per-kind
//! builders, then the resolver which links Deployments to the ConfigMaps,
//! Secrets and Services generated for them. Label and file errors abort the
//! affected service only; unknown labels and consistency errors abort the run.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use stevedore_convert::{ConvertOptions, convert_with_options};
//!
//! let options = ConvertOptions {
//!     force: true,
//!     ..Default::default()
//! };
//!
//! let result = convert_with_options(
//!     Path::new("./compose.yaml"),
//!     Path::new("./chart"),
//!     options,
//! ).unwrap();
//!
//! println!("Generated {} manifests", result.resources);
//! for warning in &result.warnings {
//!     println!("{}", warning);
//! }
//! ```

pub mod builders;
pub mod chart;
pub mod converter;
pub mod directives;
pub mod error;
pub mod generator;
pub mod labels;
pub mod naming;
pub mod partition;
pub mod registry;
pub mod resolver;
pub mod resource;
pub mod values;

// Re-exports
pub use chart::{ChartBuilder, ChartTree};
pub use converter::{
    ConversionResult, ConvertOptions, Converter, convert, convert_with_options, tool_version,
};
pub use directives::{Directive, Directives};
pub use error::{
    ConversionWarning, ConvertError, Result, ServiceFailure, WarningCategory, WarningSeverity,
};
pub use generator::{GenerationOutput, Generator};
pub use labels::{LabelKind, suggest_label};
pub use partition::{EnvBucket, EnvPartition};
pub use resource::{Manifest, Resource, ResourceKind};
pub use values::ChartValues;
