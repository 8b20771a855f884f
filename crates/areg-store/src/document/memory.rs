use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use areg_types::{App, Version};

use crate::error::StoreResult;
use crate::keys::validate_prefix;

use super::DocumentStore;

#[derive(Default)]
struct Database {
    apps: BTreeMap<String, App>,
    // (slug, version) -> document
    versions: BTreeMap<(String, String), Version>,
}

/// In-memory document store, for tests and local runs.
#[derive(Default)]
pub struct InMemoryDocumentStore {
    databases: RwLock<HashMap<String, Database>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the existing databases, sorted.
    pub fn databases(&self) -> Vec<String> {
        let map = self.databases.read().expect("lock poisoned");
        let mut names: Vec<String> = map.keys().cloned().collect();
        names.sort();
        names
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn ensure_database(&self, db: &str) -> StoreResult<()> {
        validate_prefix(db)?;
        self.databases
            .write()
            .expect("lock poisoned")
            .entry(db.to_string())
            .or_default();
        Ok(())
    }

    async fn delete_database(&self, db: &str) -> StoreResult<()> {
        validate_prefix(db)?;
        self.databases.write().expect("lock poisoned").remove(db);
        Ok(())
    }

    async fn get_app(&self, db: &str, slug: &str) -> StoreResult<Option<App>> {
        validate_prefix(db)?;
        let map = self.databases.read().expect("lock poisoned");
        Ok(map.get(db).and_then(|d| d.apps.get(slug)).cloned())
    }

    async fn put_app(&self, db: &str, app: &App) -> StoreResult<()> {
        validate_prefix(db)?;
        let mut map = self.databases.write().expect("lock poisoned");
        map.entry(db.to_string())
            .or_default()
            .apps
            .insert(app.slug.clone(), app.clone());
        Ok(())
    }

    async fn list_apps(&self, db: &str) -> StoreResult<Vec<App>> {
        validate_prefix(db)?;
        let map = self.databases.read().expect("lock poisoned");
        Ok(map
            .get(db)
            .map(|d| d.apps.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_version(
        &self,
        db: &str,
        slug: &str,
        version: &str,
    ) -> StoreResult<Option<Version>> {
        validate_prefix(db)?;
        let map = self.databases.read().expect("lock poisoned");
        Ok(map
            .get(db)
            .and_then(|d| d.versions.get(&(slug.to_string(), version.to_string())))
            .cloned())
    }

    async fn put_version(&self, db: &str, version: &Version) -> StoreResult<()> {
        validate_prefix(db)?;
        let mut map = self.databases.write().expect("lock poisoned");
        map.entry(db.to_string()).or_default().versions.insert(
            (version.slug.clone(), version.version.clone()),
            version.clone(),
        );
        Ok(())
    }

    async fn delete_version(&self, db: &str, slug: &str, version: &str) -> StoreResult<bool> {
        validate_prefix(db)?;
        let mut map = self.databases.write().expect("lock poisoned");
        Ok(map
            .get_mut(db)
            .and_then(|d| d.versions.remove(&(slug.to_string(), version.to_string())))
            .is_some())
    }

    async fn list_versions(&self, db: &str, slug: &str) -> StoreResult<Vec<Version>> {
        validate_prefix(db)?;
        let map = self.databases.read().expect("lock poisoned");
        Ok(map
            .get(db)
            .map(|d| {
                d.versions
                    .values()
                    .filter(|v| v.slug == slug)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDocumentStore")
            .field("databases", &self.databases())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn contract() {
        crate::contract::document_store_contract(&InMemoryDocumentStore::new()).await;
    }

    #[tokio::test]
    async fn delete_database_forgets_it() {
        let store = InMemoryDocumentStore::new();
        store.ensure_database("registry-a").await.unwrap();
        store.ensure_database("registry-b").await.unwrap();
        store.delete_database("registry-a").await.unwrap();
        assert_eq!(store.databases(), vec!["registry-b".to_string()]);
    }
}
