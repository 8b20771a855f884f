//! Namespaces of the apps registry.
//!
//! A *space* is a base namespace of apps and versions backed by one store. A
//! *virtual space* overlays exactly one base space: it owns a dedicated
//! overwrite store holding only the entries it overrides, and every other
//! read falls through to the base.
//!
//! - [`Namespace`] derives store names (`<ns>-<space>`,
//!   `<ns>-<virtual>-overwrites`).
//! - [`SpacesConfig`] is the domain/space/virtual-space table, validated once
//!   at startup.
//! - [`NamespaceResolver`] maps domains to spaces, checks trusted editors and
//!   turns a space name into a [`StoreHandle`].
//! - [`overlay`] holds the read and listing rules for handles with an
//!   overwrite store.
//!
//! Everything here is pure: no I/O, no interior mutability.

pub mod config;
pub mod error;
pub mod naming;
pub mod overlay;
pub mod resolver;

pub use config::{AppFilter, SpacesConfig, VirtualSpaceConfig};
pub use error::{SpaceError, SpaceResult};
pub use naming::{Namespace, DEFAULT_NAMESPACE};
pub use overlay::{merge_listings, read_through, Layer};
pub use resolver::{NamespaceResolver, StoreHandle};
