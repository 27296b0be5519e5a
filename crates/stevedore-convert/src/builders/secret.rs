//! Secret builder

use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1::Secret;

use super::BuildInput;
use crate::resource::{Manifest, Resource};

/// Secret holding the variables listed in the `secrets` label
pub fn build_secret(input: &BuildInput<'_>) -> Option<Resource> {
    if input.partition.secrets.is_empty() {
        return None;
    }

    let logical = input.logical_name();
    let data = input
        .partition
        .secrets
        .iter()
        .map(|(name, value)| (name.clone(), ByteString(value.as_bytes().to_vec())))
        .collect();

    let secret = Secret {
        metadata: input.ctx.metadata(&input.service.name, &logical),
        type_: Some("Opaque".to_string()),
        data: Some(data),
        ..Default::default()
    };

    Some(Resource::new(&input.service.name, logical, Manifest::Secret(secret)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::{BuildContext, resolve_ports};
    use crate::directives::Directives;
    use crate::partition::EnvPartition;
    use stevedore_core::Service;

    #[test]
    fn test_secret_holds_declared_variables() {
        let ctx = BuildContext::new("shop", "v0.1.0");
        let service = Service::new("db")
            .with_env("POSTGRES_PASSWORD", "hunter2")
            .with_env("POSTGRES_DB", "shop");
        let directives = Directives {
            secrets: vec!["POSTGRES_PASSWORD".to_string()],
            ..Default::default()
        };
        let (partition, _) = EnvPartition::compute(&service, &directives, "shop");
        let input = BuildInput {
            ctx: &ctx,
            service: &service,
            directives: &directives,
            partition: &partition,
            ports: resolve_ports(&service, &directives),
        };

        let resource = build_secret(&input).unwrap();
        assert_eq!(resource.path, "db/secret.yaml");
        let Manifest::Secret(secret) = &resource.manifest else {
            panic!("expected a Secret");
        };
        let data = secret.data.as_ref().unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data["POSTGRES_PASSWORD"].0, b"hunter2".to_vec());

        let json = serde_json::to_value(secret).unwrap();
        assert_eq!(json["kind"], "Secret");
        assert_eq!(json["data"]["POSTGRES_PASSWORD"], "aHVudGVyMg==");

        let yaml = resource.to_yaml().unwrap();
        assert!(yaml.contains("POSTGRES_PASSWORD: aHVudGVyMg=="));
        assert!(yaml.contains("type: Opaque"));
    }

    #[test]
    fn test_no_secret_without_label() {
        let ctx = BuildContext::new("shop", "v0.1.0");
        let service = Service::new("db").with_env("POSTGRES_DB", "shop");
        let directives = Directives::default();
        let (partition, _) = EnvPartition::compute(&service, &directives, "shop");
        let input = BuildInput {
            ctx: &ctx,
            service: &service,
            directives: &directives,
            partition: &partition,
            ports: Vec::new(),
        };
        assert!(build_secret(&input).is_none());
    }
}
