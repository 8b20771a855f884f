use std::path::Path;

use serde::{Deserialize, Serialize};

use areg_cache::CacheConfig;
use areg_editor::EditorsConfig;
use areg_space::{Namespace, SpacesConfig, DEFAULT_NAMESPACE};
use areg_store::{DocumentsConfig, StorageConfig};

use crate::error::{RegistryError, RegistryResult};
use crate::retry::RetryPolicy;

/// Registry configuration. Every section has defaults, so an empty file is a
/// working single-space, in-memory registry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Global prefix of every store name.
    pub database_namespace: String,
    pub spaces: SpacesConfig,
    pub storage: StorageConfig,
    pub documents: DocumentsConfig,
    pub cache: CacheConfig,
    pub editors: EditorsConfig,
    pub retry: RetryPolicy,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            database_namespace: DEFAULT_NAMESPACE.to_string(),
            spaces: SpacesConfig::default(),
            storage: StorageConfig::default(),
            documents: DocumentsConfig::default(),
            cache: CacheConfig::default(),
            editors: EditorsConfig::default(),
            retry: RetryPolicy::default(),
        }
    }
}

impl RegistryConfig {
    pub fn from_toml(raw: &str) -> RegistryResult<Self> {
        toml::from_str(raw).map_err(|e| RegistryError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> RegistryResult<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| RegistryError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&raw)
    }

    pub fn namespace(&self) -> RegistryResult<Namespace> {
        Ok(Namespace::new(self.database_namespace.clone())?)
    }

    /// Checks that must pass before serving: namespace and spaces table.
    pub fn validate(&self) -> RegistryResult<()> {
        self.namespace()?;
        self.spaces.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::time::Duration;

    const FULL: &str = r#"
        database_namespace = "apps"

        [spaces]
        spaces = ["main", "partners"]
        [spaces.virtual_spaces.mespapiers]
        source = "main"
        filter = { select = ["drive"] }
        [spaces.domain_space]
        "cozy.example" = "main"
        [spaces.trusted_domains]
        "cozy.example" = ["cozy"]

        [storage]
        kind = "memory"
        timeout = "3s"

        [documents]
        kind = "memory"

        [cache]
        kind = "lru"
        capacity = 64
        ttl = "1m"

        [editors]
        kind = "memory"

        [retry]
        attempts = 2
        backoff = "10ms"
    "#;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = RegistryConfig::from_toml("").unwrap();
        assert_eq!(cfg, RegistryConfig::default());
        cfg.validate().unwrap();
    }

    #[test]
    fn full_file() {
        let cfg = RegistryConfig::from_toml(FULL).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.namespace().unwrap().db_name("main"), "apps-main");
        assert_eq!(cfg.storage.timeout, Duration::from_secs(3));
        assert_eq!(cfg.documents, DocumentsConfig::Memory);
        assert_eq!(cfg.cache.capacity, 64);
        assert_eq!(cfg.retry.attempts, 2);
        assert!(cfg.spaces.virtual_spaces.contains_key("mespapiers"));
    }

    #[test]
    fn conflicting_virtual_space_fails_validation() {
        let raw = r#"
            [spaces]
            spaces = ["main"]
            [spaces.virtual_spaces.main]
            source = "main"
        "#;
        let err = RegistryConfig::from_toml(raw).unwrap().validate().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NamespaceConflict);
    }

    #[test]
    fn bad_namespace_fails_validation() {
        let cfg = RegistryConfig {
            database_namespace: "Bad Prefix".into(),
            ..RegistryConfig::default()
        };
        assert_eq!(cfg.validate().unwrap_err().kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn load_reads_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.toml");
        std::fs::write(&path, FULL).unwrap();
        assert_eq!(RegistryConfig::load(&path).unwrap().database_namespace, "apps");
        assert!(RegistryConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
