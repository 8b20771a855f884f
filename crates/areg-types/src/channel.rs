use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Release channel of a version.
///
/// Derived from the pre-release part of the semantic version: none means
/// `stable`, a pre-release starting with `beta` means `beta`, anything else
/// is `dev`. Channels are ordered by stability, `Stable` being the most
/// stable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Stable,
    Beta,
    Dev,
}

impl Channel {
    /// All channels, most stable first.
    pub const ALL: [Channel; 3] = [Channel::Stable, Channel::Beta, Channel::Dev];

    /// Channel of a parsed semantic version.
    pub fn of(version: &semver::Version) -> Self {
        let pre = version.pre.as_str();
        if pre.is_empty() {
            Channel::Stable
        } else if pre.starts_with("beta") {
            Channel::Beta
        } else {
            Channel::Dev
        }
    }

    /// Whether a version released on `other` is visible when asking for `self`.
    ///
    /// `stable` sees only stable versions, `beta` sees stable and beta, `dev`
    /// sees everything.
    pub fn includes(self, other: Channel) -> bool {
        other <= self
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Channel::Stable => "stable",
            Channel::Beta => "beta",
            Channel::Dev => "dev",
        }
    }
}

impl Default for Channel {
    fn default() -> Self {
        Channel::Stable
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Channel {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stable" => Ok(Channel::Stable),
            "beta" => Ok(Channel::Beta),
            "dev" => Ok(Channel::Dev),
            other => Err(TypeError::UnknownChannel(other.to_string())),
        }
    }
}
