use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use areg_crypto::EditorSecret;

use crate::error::EditorResult;
use crate::traits::EditorRegistry;

/// Editor secrets held in a `HashMap` behind a `RwLock`. Lost on drop.
#[derive(Default)]
pub struct InMemoryEditorRegistry {
    secrets: RwLock<HashMap<String, Arc<EditorSecret>>>,
}

impl InMemoryEditorRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EditorRegistry for InMemoryEditorRegistry {
    async fn get_secret(&self, editor: &str) -> EditorResult<Option<Arc<EditorSecret>>> {
        Ok(self
            .secrets
            .read()
            .expect("lock poisoned")
            .get(editor)
            .cloned())
    }

    async fn put_secret(&self, editor: &str, secret: EditorSecret) -> EditorResult<()> {
        self.secrets
            .write()
            .expect("lock poisoned")
            .insert(editor.to_string(), Arc::new(secret));
        Ok(())
    }

    async fn delete(&self, editor: &str) -> EditorResult<bool> {
        Ok(self
            .secrets
            .write()
            .expect("lock poisoned")
            .remove(editor)
            .is_some())
    }

    async fn list(&self) -> EditorResult<Vec<String>> {
        let mut names: Vec<String> = self
            .secrets
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }
}

impl std::fmt::Debug for InMemoryEditorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryEditorRegistry")
            .field("editors", &self.secrets.read().expect("lock poisoned").len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_replace_delete() {
        let reg = InMemoryEditorRegistry::new();
        assert!(reg.get_secret("cozy").await.unwrap().is_none());

        let first = EditorSecret::generate();
        reg.put_secret("cozy", first.clone()).await.unwrap();
        assert_eq!(*reg.get_secret("cozy").await.unwrap().unwrap(), first);

        let second = EditorSecret::generate();
        reg.put_secret("cozy", second.clone()).await.unwrap();
        assert_eq!(*reg.get_secret("cozy").await.unwrap().unwrap(), second);

        reg.put_secret("banks", EditorSecret::generate()).await.unwrap();
        assert_eq!(reg.list().await.unwrap(), vec!["banks", "cozy"]);

        assert!(reg.delete("cozy").await.unwrap());
        assert!(!reg.delete("cozy").await.unwrap());
        assert!(reg.get_secret("cozy").await.unwrap().is_none());
    }

    #[test]
    fn debug_does_not_leak_secrets() {
        let reg = InMemoryEditorRegistry::new();
        let debug = format!("{reg:?}");
        assert!(debug.contains("editors: 0"));
    }
}
