//! ConfigMap builder
//!
//! A service gets at most one environment ConfigMap and one file-backed
//! ConfigMap per `configmap-files` entry.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::ConfigMap;
use stevedore_core::VolumeKind;
use walkdir::WalkDir;

use super::BuildInput;
use crate::error::{ConversionWarning, ConvertError, Result, WarningCategory};
use crate::naming::{file_logical_name, normalize_path};
use crate::resource::{ConfigMapUsage, FileMount, Manifest, Resource};

/// Environment ConfigMap, absent when there is nothing to store
pub fn build_env_config_map(input: &BuildInput<'_>) -> Option<Resource> {
    let data = input.partition.config_map_data();
    if data.is_empty() {
        return None;
    }

    let logical = input.logical_name();
    let config_map = ConfigMap {
        metadata: input.ctx.metadata(&input.service.name, &logical),
        data: Some(data),
        ..Default::default()
    };

    Some(Resource::new(
        &input.service.name,
        logical,
        Manifest::ConfigMap {
            config_map,
            usage: ConfigMapUsage::Environment,
        },
    ))
}

/// One ConfigMap per `configmap-files` entry, carrying file contents only
pub fn build_file_config_maps(
    input: &BuildInput<'_>,
    warnings: &mut Vec<ConversionWarning>,
) -> Result<Vec<Resource>> {
    input
        .directives
        .configmap_files
        .iter()
        .map(|path| build_file_config_map(input, path, warnings))
        .collect()
}

fn build_file_config_map(
    input: &BuildInput<'_>,
    path: &str,
    warnings: &mut Vec<ConversionWarning>,
) -> Result<Resource> {
    let service = input.service;
    let resolved = service.resolve_path(path);
    let metadata = fs::metadata(&resolved).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ConvertError::MissingPath {
            service: service.name.clone(),
            path: resolved.clone(),
        },
        _ => ConvertError::FileRead {
            service: service.name.clone(),
            path: resolved.clone(),
            source: e,
        },
    })?;

    let mut contents = FileContents::default();
    if metadata.is_dir() {
        for entry in WalkDir::new(&resolved)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| ConvertError::FileRead {
                service: service.name.clone(),
                path: resolved.clone(),
                source: e.into(),
            })?;
            if entry.file_type().is_dir() {
                warnings.push(
                    ConversionWarning::warning(
                        WarningCategory::Files,
                        &service.name,
                        format!(
                            "subdirectory {} is skipped, subdirectories are not embedded",
                            entry.path().display()
                        ),
                    )
                    .with_suggestion("list the subdirectory in configmap-files"),
                );
                continue;
            }
            contents.add_file(&service.name, entry.path())?;
        }
    } else {
        contents.add_file(&service.name, &resolved)?;
    }

    let mounts = file_mounts(input, path, metadata.is_dir());
    if mounts.is_empty() {
        warnings.push(
            ConversionWarning::info(
                WarningCategory::Files,
                &service.name,
                format!("'{}' is not mounted by any volume of the service", path),
            )
            .with_suggestion("add a bind mount with this path as source"),
        );
    }

    let logical = file_logical_name(&service.name, path);
    let config_map = ConfigMap {
        metadata: input.ctx.metadata(&service.name, &logical),
        data: Some(contents.data),
        binary_data: (!contents.binary_data.is_empty()).then_some(contents.binary_data),
        ..Default::default()
    };

    Ok(Resource::new(
        &service.name,
        logical,
        Manifest::ConfigMap {
            config_map,
            usage: ConfigMapUsage::Files {
                source: path.to_string(),
                mounts,
            },
        },
    ))
}

/// Mount points of the bind volumes whose source is `path`
fn file_mounts(input: &BuildInput<'_>, path: &str, is_dir: bool) -> Vec<FileMount> {
    let normalized = normalize_path(path);
    let sub_path = if is_dir {
        None
    } else {
        Path::new(&normalized)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    };

    input
        .service
        .volumes
        .iter()
        .filter(|volume| volume.kind == VolumeKind::Bind && normalize_path(&volume.source) == normalized)
        .map(|volume| FileMount {
            mount_path: volume.target.clone(),
            sub_path: sub_path.clone(),
            read_only: volume.read_only,
        })
        .collect()
}

#[derive(Debug, Default)]
struct FileContents {
    data: BTreeMap<String, String>,
    binary_data: BTreeMap<String, ByteString>,
}

impl FileContents {
    /// Store a file as text when it is valid UTF-8, as binary otherwise
    fn add_file(&mut self, service: &str, path: &Path) -> Result<()> {
        let bytes = fs::read(path).map_err(|source| ConvertError::FileRead {
            service: service.to_string(),
            path: path.to_path_buf(),
            source,
        })?;
        let key = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        match String::from_utf8(bytes) {
            Ok(text) => {
                self.data.insert(key, text);
            }
            Err(e) => {
                self.binary_data.insert(key, ByteString(e.into_bytes()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{BuildContext, resolve_ports};
    use crate::directives::Directives;
    use crate::partition::EnvPartition;
    use stevedore_core::{Service, ServiceVolume};
    use tempfile::TempDir;

    fn build(
        service: &Service,
        directives: &Directives,
    ) -> (Result<Vec<Resource>>, Vec<ConversionWarning>) {
        let ctx = BuildContext::new("shop", "v0.1.0");
        let (partition, _) = EnvPartition::compute(service, directives, "shop");
        let input = BuildInput {
            ctx: &ctx,
            service,
            directives,
            partition: &partition,
            ports: resolve_ports(service, directives),
        };
        let mut warnings = Vec::new();
        (build_file_config_maps(&input, &mut warnings), warnings)
    }

    fn files_directive(paths: &[&str]) -> Directives {
        Directives {
            configmap_files: paths.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    fn config_map(resource: &Resource) -> (&ConfigMap, &ConfigMapUsage) {
        match &resource.manifest {
            Manifest::ConfigMap { config_map, usage } => (config_map, usage),
            other => panic!("expected a ConfigMap, got {:?}", other.kind()),
        }
    }

    #[test]
    fn test_single_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("foo.txt"), "hello").unwrap();
        let service = Service::new("web")
            .with_working_dir(dir.path())
            .with_env("FOO", "bar")
            .with_volume(ServiceVolume::bind("./foo.txt", "/etc/foo.txt"));

        let (resources, warnings) = build(&service, &files_directive(&["./foo.txt"]));
        let resources = resources.unwrap();
        assert!(warnings.is_empty());
        assert_eq!(resources.len(), 1);

        let resource = &resources[0];
        assert_eq!(resource.name, "web-foo-txt");
        assert_eq!(resource.path, "web/statics/foo.txt/configmap.yaml");

        let (config_map, usage) = config_map(resource);
        let data = config_map.data.as_ref().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data["foo.txt"], "hello");
        assert!(!data.contains_key("FOO"));
        assert!(config_map.binary_data.is_none());

        let ConfigMapUsage::Files { mounts, .. } = usage else {
            panic!("expected a file ConfigMap");
        };
        assert_eq!(
            mounts,
            &vec![FileMount {
                mount_path: "/etc/foo.txt".to_string(),
                sub_path: Some("foo.txt".to_string()),
                read_only: false,
            }]
        );
    }

    #[test]
    fn test_directory_skips_subdirectories() {
        let dir = TempDir::new().unwrap();
        let conf = dir.path().join("conf");
        fs::create_dir_all(conf.join("nested")).unwrap();
        fs::write(conf.join("a.conf"), "a").unwrap();
        fs::write(conf.join("b.conf"), "b").unwrap();
        fs::write(conf.join("nested/c.conf"), "c").unwrap();
        let service = Service::new("web")
            .with_working_dir(dir.path())
            .with_volume(ServiceVolume::bind("./conf", "/etc/app"));

        let (resources, warnings) = build(&service, &files_directive(&["./conf"]));
        let resources = resources.unwrap();

        let (config_map, usage) = config_map(&resources[0]);
        let keys: Vec<&String> = config_map.data.as_ref().unwrap().keys().collect();
        assert_eq!(keys, vec!["a.conf", "b.conf"]);
        assert_eq!(resources[0].name, "web-conf");

        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("nested"));

        let ConfigMapUsage::Files { mounts, .. } = usage else {
            panic!("expected a file ConfigMap");
        };
        assert_eq!(mounts[0].sub_path, None);
    }

    #[test]
    fn test_binary_content() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("logo.png"), [0x89, 0x50, 0xff, 0xfe]).unwrap();
        let service = Service::new("web").with_working_dir(dir.path());

        let (resources, warnings) = build(&service, &files_directive(&["logo.png"]));
        let resources = resources.unwrap();

        let (config_map, _) = config_map(&resources[0]);
        assert!(config_map.data.as_ref().unwrap().is_empty());
        let binary = config_map.binary_data.as_ref().unwrap();
        assert_eq!(binary["logo.png"].0, vec![0x89, 0x50, 0xff, 0xfe]);

        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("not mounted"));
    }

    #[test]
    fn test_missing_path() {
        let dir = TempDir::new().unwrap();
        let service = Service::new("web").with_working_dir(dir.path());

        let (resources, _) = build(&service, &files_directive(&["./missing.txt"]));
        match resources.unwrap_err() {
            ConvertError::MissingPath { service, path } => {
                assert_eq!(service, "web");
                assert!(path.ends_with("missing.txt"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_path_is_a_read_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("foo.txt"), "hello").unwrap();
        let service = Service::new("web").with_working_dir(dir.path());

        // a regular file used as a directory fails with ENOTDIR
        let (resources, _) = build(&service, &files_directive(&["./foo.txt/inner"]));
        match resources.unwrap_err() {
            ConvertError::FileRead { service, path, .. } => {
                assert_eq!(service, "web");
                assert!(path.ends_with("inner"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_sanitized_name() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("envéfoo.file"), "x").unwrap();
        let service = Service::new("web").with_working_dir(dir.path());

        let (resources, _) = build(&service, &files_directive(&["envéfoo.file"]));
        assert_eq!(resources.unwrap()[0].name, "web-env-foo-file");
    }
}
