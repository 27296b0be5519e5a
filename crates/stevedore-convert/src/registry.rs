//! Registry of generated resources
//!
//! Resources are keyed by kind and logical name. Iteration follows the key
//! order, which makes the output independent of build order.

use std::collections::BTreeMap;

use crate::error::{ConvertError, Result};
use crate::resource::{Resource, ResourceKind};

type Key = (ResourceKind, String);

#[derive(Debug, Clone, Default)]
pub struct Registry {
    resources: BTreeMap<Key, Resource>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource, rejecting a second one with the same kind and name
    pub fn insert(&mut self, resource: Resource) -> Result<()> {
        let key = (resource.kind(), resource.name.clone());
        if self.resources.contains_key(&key) {
            return Err(ConvertError::DuplicateResource {
                kind: key.0,
                name: key.1,
            });
        }
        self.resources.insert(key, resource);
        Ok(())
    }

    pub fn get(&self, kind: ResourceKind, name: &str) -> Option<&Resource> {
        self.resources.get(&(kind, name.to_string()))
    }

    pub fn get_mut(&mut self, kind: ResourceKind, name: &str) -> Option<&mut Resource> {
        self.resources.get_mut(&(kind, name.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Resource> {
        self.resources.values()
    }

    pub fn of_kind(&self, kind: ResourceKind) -> impl Iterator<Item = &Resource> {
        self.resources
            .iter()
            .filter(move |((k, _), _)| *k == kind)
            .map(|(_, resource)| resource)
    }

    /// Keys of the resources of one kind
    pub fn names(&self, kind: ResourceKind) -> Vec<String> {
        self.of_kind(kind).map(|r| r.name.clone()).collect()
    }

    /// Whether a resource of `kind` has this templated `metadata.name`
    pub fn has_metadata_name(&self, kind: ResourceKind, metadata_name: &str) -> bool {
        self.of_kind(kind)
            .any(|resource| resource.metadata_name() == Some(metadata_name))
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Resources sorted by output path
    pub fn into_resources(self) -> Vec<Resource> {
        let mut resources: Vec<Resource> = self.resources.into_values().collect();
        resources.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.kind().cmp(&b.kind())));
        resources
    }
}
