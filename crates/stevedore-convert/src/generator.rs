//! Generation pipeline
//!
//! Interpret, build, resolve. Label errors and file errors abort the
//! affected service only; unknown labels and internal consistency errors
//! abort the whole run. Resource names claimed by two services, or twice
//! by one, fail the services involved before anything is registered.

use std::collections::BTreeMap;

use stevedore_core::{Project, Service};

use crate::builders::{BuildContext, ServiceBuild, build_service};
use crate::directives::Directives;
use crate::error::{ConversionWarning, ConvertError, Result, ServiceFailure, WarningCategory};
use crate::labels::LabelKind;
use crate::registry::Registry;
use crate::resolver;
use crate::resource::{Resource, ResourceKind};
use crate::values::ChartValues;

/// Everything produced by one generation pass
#[derive(Debug, Default)]
pub struct GenerationOutput {
    /// Resources sorted by output path
    pub resources: Vec<Resource>,
    pub values: ChartValues,
    pub warnings: Vec<ConversionWarning>,
    /// Services whose resources could not be generated
    pub failures: Vec<ServiceFailure>,
    /// Image tag of the service labelled `main-app`
    pub app_version: Option<String>,
    /// Services skipped through the `ignore` label
    pub ignored: Vec<String>,
}

impl GenerationOutput {
    pub fn resources_of(&self, kind: ResourceKind) -> impl Iterator<Item = &Resource> {
        self.resources.iter().filter(move |r| r.kind() == kind)
    }

    pub fn resource(&self, kind: ResourceKind, name: &str) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|r| r.kind() == kind && r.name == name)
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, service: &Service, error: ConvertError) {
        tracing::error!(service = %service.name, "{}", error);
        self.failures.push(ServiceFailure {
            service: service.name.clone(),
            error,
        });
    }
}

/// Manifest generator for one chart
#[derive(Debug, Clone)]
pub struct Generator {
    ctx: BuildContext,
}

impl Generator {
    pub fn new(app_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            ctx: BuildContext::new(app_name, version),
        }
    }

    pub fn app_name(&self) -> &str {
        &self.ctx.app_name
    }

    /// Run the whole pipeline over a project
    pub fn generate(&self, project: &Project) -> Result<GenerationOutput> {
        for service in project.services() {
            Directives::check_vocabulary(service)?;
        }

        let mut output = GenerationOutput::default();
        let mut built = Vec::new();

        for service in project.services() {
            let directives = match Directives::interpret(service) {
                Ok(directives) => directives,
                Err(error) => {
                    output.fail(service, error);
                    continue;
                }
            };

            if directives.ignore {
                tracing::info!(service = %service.name, "service ignored");
                output.ignored.push(service.name.clone());
                continue;
            }

            match build_service(&self.ctx, service, &directives) {
                Ok(build) => built.push(BuiltService {
                    service,
                    main_app: directives.main_app,
                    build,
                }),
                Err(error) => output.fail(service, error),
            }
        }

        let mut clashes = name_clashes(&built);
        let mut registry = Registry::new();

        for BuiltService {
            service,
            main_app,
            build,
        } in built
        {
            if let Some(error) = clashes.remove(&service.name) {
                output.fail(service, error);
                continue;
            }

            tracing::info!(
                service = %service.name,
                resources = build.resources.len(),
                "service converted"
            );

            if main_app {
                let tag = build.values.repository.tag.clone();
                match &output.app_version {
                    None => output.app_version = Some(tag),
                    Some(_) => output.warnings.push(ConversionWarning::warning(
                        WarningCategory::Labels,
                        &service.name,
                        "another service is already the main app, label ignored",
                    )),
                }
            }

            for resource in build.resources {
                registry.insert(resource)?;
            }
            output.values.insert(&service.name, build.values);
            output.warnings.extend(build.warnings);
        }
        output.failures.sort_by(|a, b| a.service.cmp(&b.service));

        resolver::resolve(&mut registry, project)?;

        output.warnings = output.warnings.into_iter().map(ConversionWarning::emit).collect();
        output.resources = registry.into_resources();
        Ok(output)
    }
}

/// A service whose resources are built but not yet registered
struct BuiltService<'a> {
    service: &'a Service,
    main_app: bool,
    build: ServiceBuild,
}

/// Failures for the services whose resource names collide
///
/// A collision involving a file ConfigMap fails the services owning the
/// file ConfigMaps, as a `configmap-files` label error. Any other collision
/// fails every service after the first claimant.
fn name_clashes(built: &[BuiltService<'_>]) -> BTreeMap<String, ConvertError> {
    let mut claims: BTreeMap<(ResourceKind, &str), Vec<(&Service, &Resource)>> = BTreeMap::new();
    for entry in built {
        for resource in &entry.build.resources {
            claims
                .entry((resource.kind(), resource.name.as_str()))
                .or_default()
                .push((entry.service, resource));
        }
    }

    let mut clashes = BTreeMap::new();
    for ((kind, name), claimants) in claims {
        if claimants.len() < 2 {
            continue;
        }

        if claimants.iter().any(|(_, r)| r.file_source().is_some()) {
            let key = LabelKind::ConfigMapFiles.key();
            for &(service, resource) in &claimants {
                let Some(source) = resource.file_source() else {
                    continue;
                };
                let others: Vec<String> = claimants
                    .iter()
                    .filter(|(_, other)| !std::ptr::eq(*other, resource))
                    .map(|(owner, other)| match other.file_source() {
                        Some(path) => format!("'{}' of service '{}'", path, owner.name),
                        None => format!("service '{}'", owner.name),
                    })
                    .collect();
                let raw = service.labels.get(&key).cloned().unwrap_or_default();
                clashes.entry(service.name.clone()).or_insert_with(|| {
                    ConvertError::label(
                        &service.name,
                        &key,
                        &raw,
                        format!(
                            "'{}' maps to {} name '{}', also generated for {}",
                            source,
                            kind,
                            name,
                            others.join(", ")
                        ),
                    )
                });
            }
        } else {
            let first = claimants[0].0;
            for &(service, _) in &claimants[1..] {
                clashes
                    .entry(service.name.clone())
                    .or_insert_with(|| ConvertError::NameClash {
                        service: service.name.clone(),
                        kind,
                        name: name.to_string(),
                        other: first.name.clone(),
                    });
            }
        }
    }
    clashes
}
