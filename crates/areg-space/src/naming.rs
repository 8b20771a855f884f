//! Store name derivation.
//!
//! `db_name(space)` is `<ns>-<space>` and the overwrite store of a virtual
//! space `v` is `db_name("<v>-overwrites")`. Space names may not end with
//! `-overwrites`, so an overwrite store name can never equal a base store
//! name, and two distinct virtual spaces never share an overwrite store.

use areg_types::{validate_space_name, TypeError, RESERVED_SUFFIX};

/// Global prefix used when none is configured.
pub const DEFAULT_NAMESPACE: &str = "registry";

/// The global database namespace.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Namespace(String);

impl Namespace {
    /// `prefix` must be non-empty and use only `[a-z0-9_-]`.
    pub fn new(prefix: impl Into<String>) -> Result<Self, TypeError> {
        let prefix = prefix.into();
        let ok = !prefix.is_empty()
            && prefix
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if !ok {
            return Err(TypeError::InvalidName {
                what: "namespace",
                name: prefix,
                reason: "must be non-empty and use only [a-z0-9_-]".to_string(),
            });
        }
        Ok(Self(prefix))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Store name of a base space.
    pub fn db_name(&self, space: &str) -> String {
        format!("{}-{space}", self.0)
    }

    /// Store name holding a virtual space's overrides.
    pub fn overwrite_db_name(&self, virtual_space: &str) -> String {
        self.db_name(&format!("{virtual_space}{RESERVED_SUFFIX}"))
    }

    /// Like [`Namespace::overwrite_db_name`], validating the name first.
    pub fn checked_overwrite_db_name(&self, virtual_space: &str) -> Result<String, TypeError> {
        validate_space_name(virtual_space)?;
        Ok(self.overwrite_db_name(virtual_space))
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self(DEFAULT_NAMESPACE.to_string())
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
