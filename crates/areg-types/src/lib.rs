//! Foundation types for the apps registry.
//!
//! Every other registry crate depends on `areg-types`. It holds the shared
//! vocabulary: validated names, the app and version documents stored per
//! space, and release channels derived from semantic versions.
//!
//! # Key Types
//!
//! - [`App`] — An application published under a space
//! - [`Version`] — One published version of an app
//! - [`Channel`] — Release channel (`stable`, `beta`, `dev`)
//! - [`AppKind`] — Webapp or konnector

pub mod app;
pub mod channel;
pub mod duration;
pub mod error;
pub mod names;

pub use app::{parse_version, App, AppKind, Version};
pub use channel::Channel;
pub use error::TypeError;
pub use names::{
    validate_app_name, validate_editor_name, validate_space_name, MAX_NAME_LEN, RESERVED_SUFFIX,
};
