//! Editor credentials.
//!
//! An editor is a named publishing identity holding exactly one symmetric
//! secret. [`CredentialManager`] rotates secrets, issues signed tokens and
//! verifies them against the editor's *current* secret. Tokens are stateless:
//! nothing is recorded when one is issued, and rotating the secret is the only
//! way to revoke outstanding tokens.
//!
//! Secrets are persisted by an [`EditorRegistry`]: [`InMemoryEditorRegistry`]
//! for tests and local runs, or [`FileEditorRegistry`] backed by a JSON file.

pub mod clock;
pub mod config;
pub mod error;
pub mod file;
pub mod manager;
pub mod memory;
pub mod traits;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{build_editor_registry, EditorsBackend, EditorsConfig};
pub use error::{EditorError, EditorResult};
pub use file::FileEditorRegistry;
pub use manager::CredentialManager;
pub use memory::InMemoryEditorRegistry;
pub use traits::EditorRegistry;
