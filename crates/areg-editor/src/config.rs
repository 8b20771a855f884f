use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{EditorError, EditorResult};
use crate::file::FileEditorRegistry;
use crate::memory::InMemoryEditorRegistry;
use crate::traits::EditorRegistry;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorsBackend {
    Memory,
    #[default]
    File,
}

/// `[editors]` section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorsConfig {
    pub kind: EditorsBackend,
    /// Location of the secrets file for the `file` backend.
    pub path: PathBuf,
}

impl Default for EditorsConfig {
    fn default() -> Self {
        Self {
            kind: EditorsBackend::File,
            path: PathBuf::from("editors.json"),
        }
    }
}

pub async fn build_editor_registry(config: &EditorsConfig) -> EditorResult<Arc<dyn EditorRegistry>> {
    match config.kind {
        EditorsBackend::Memory => Ok(Arc::new(InMemoryEditorRegistry::new())),
        EditorsBackend::File => {
            if config.path.as_os_str().is_empty() {
                return Err(EditorError::Config("editors.path must not be empty".into()));
            }
            Ok(Arc::new(FileEditorRegistry::open(&config.path).await?))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_file() {
        let cfg: EditorsConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.kind, EditorsBackend::File);
        assert_eq!(cfg.path, PathBuf::from("editors.json"));
    }

    #[tokio::test]
    async fn builds_memory_backend() {
        let cfg: EditorsConfig = toml::from_str(r#"kind = "memory""#).unwrap();
        let reg = build_editor_registry(&cfg).await.unwrap();
        assert!(reg.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_path_is_rejected() {
        let cfg = EditorsConfig {
            kind: EditorsBackend::File,
            path: PathBuf::new(),
        };
        assert!(matches!(
            build_editor_registry(&cfg).await,
            Err(EditorError::Config(_))
        ));
    }
}
