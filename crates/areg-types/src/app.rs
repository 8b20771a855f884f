use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::channel::Channel;
use crate::error::TypeError;
use crate::names::{validate_app_name, validate_editor_name};

/// Kind of application.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppKind {
    #[default]
    Webapp,
    Konnector,
}

impl fmt::Display for AppKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppKind::Webapp => f.write_str("webapp"),
            AppKind::Konnector => f.write_str("konnector"),
        }
    }
}

impl FromStr for AppKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "webapp" => Ok(AppKind::Webapp),
            "konnector" => Ok(AppKind::Konnector),
            other => Err(TypeError::UnknownAppKind(other.to_string())),
        }
    }
}

/// An application document.
///
/// One per app per store. The `editor` is the publishing identity that owns
/// the app; only that editor may publish new versions of it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    pub slug: String,
    #[serde(rename = "type", default)]
    pub kind: AppKind,
    pub editor: String,
    pub created_at: DateTime<Utc>,
}

impl App {
    pub fn new(
        slug: impl Into<String>,
        kind: AppKind,
        editor: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, TypeError> {
        let slug = slug.into();
        let editor = editor.into();
        validate_app_name(&slug)?;
        validate_editor_name(&editor)?;
        Ok(Self {
            slug,
            kind,
            editor,
            created_at,
        })
    }
}

/// A published version document.
///
/// Keyed by `(slug, version)`. Writing the same key twice replaces the
/// document, which makes publication an upsert.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub slug: String,
    pub version: String,
    pub channel: Channel,
    pub editor: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default)]
    pub manifest: serde_json::Value,
}

impl Version {
    /// Build a version document, validating the slug and deriving the channel.
    pub fn new(
        slug: impl Into<String>,
        version: impl Into<String>,
        editor: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, TypeError> {
        let slug = slug.into();
        let version = version.into();
        let editor = editor.into();
        validate_app_name(&slug)?;
        validate_editor_name(&editor)?;
        let parsed = parse_version(&version)?;
        Ok(Self {
            slug,
            channel: Channel::of(&parsed),
            version,
            editor,
            created_at,
            url: None,
            sha256: None,
            size: None,
            manifest: serde_json::Value::Null,
        })
    }

    /// The parsed semantic version.
    pub fn semver(&self) -> Result<semver::Version, TypeError> {
        parse_version(&self.version)
    }
}

/// Parse a version string as a semantic version.
pub fn parse_version(version: &str) -> Result<semver::Version, TypeError> {
    semver::Version::parse(version).map_err(|e| TypeError::InvalidVersion {
        version: version.to_string(),
        reason: e.to_string(),
    })
}
