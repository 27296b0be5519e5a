//! Label override file (`stevedore.yaml`)
//!
//! The override file lets users keep Stevedore configuration out of the
//! compose file. Each service entry maps bare label names to YAML nodes:
//!
//! ```yaml
//! web:
//!   ports: [80]
//!   ingress:
//!     port: 80
//!     hostname: web.example.com
//! ```
//!
//! Every entry becomes the label `stevedore.io/<name>`, replacing any value
//! set in the compose file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::LABEL_PREFIX;
use crate::error::{CoreError, Result};
use crate::project::Project;

/// File names looked up next to the compose file, in order
pub const OVERRIDE_FILE_NAMES: &[&str] = &["stevedore.yaml", "stevedore.yml"];

/// Per-service label overrides
pub type Overrides = BTreeMap<String, BTreeMap<String, Value>>;

/// Find the override file in a directory
pub fn find_override_file(dir: &Path) -> Option<PathBuf> {
    OVERRIDE_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

/// Load an override file
pub fn load_overrides(path: &Path) -> Result<Overrides> {
    let content = std::fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Overrides::new());
    }
    serde_yaml::from_str(&content).map_err(|e| CoreError::InvalidOverride {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Apply overrides to the project labels
///
/// Override values win over compose labels. Strings are stored verbatim,
/// any other node is stored as its YAML serialization.
pub fn apply_overrides(project: &mut Project, overrides: &Overrides, origin: &Path) -> Result<()> {
    for (service_name, labels) in overrides {
        let service = project
            .services
            .get_mut(service_name)
            .ok_or_else(|| CoreError::InvalidOverride {
                path: origin.display().to_string(),
                message: format!("service '{}' does not exist in the project", service_name),
            })?;

        for (name, value) in labels {
            let raw = match value {
                Value::String(s) => s.clone(),
                other => serde_yaml::to_string(other).map_err(|e| CoreError::InvalidOverride {
                    path: origin.display().to_string(),
                    message: e.to_string(),
                })?,
            };
            let key = format!("{}/{}", LABEL_PREFIX, name);
            if service.labels.insert(key.clone(), raw).is_some() {
                tracing::debug!(service = %service_name, label = %key, "label overridden");
            }
        }
    }
    Ok(())
}
