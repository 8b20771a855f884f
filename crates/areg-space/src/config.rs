use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use areg_types::{validate_app_name, validate_editor_name, validate_space_name};

use crate::error::{SpaceError, SpaceResult};

/// Which apps of the base space a virtual space exposes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppFilter {
    /// Only these apps are visible.
    Select(BTreeSet<String>),
    /// These apps are hidden.
    Reject(BTreeSet<String>),
}

impl AppFilter {
    pub fn allows(&self, slug: &str) -> bool {
        match self {
            AppFilter::Select(apps) => apps.contains(slug),
            AppFilter::Reject(apps) => !apps.contains(slug),
        }
    }

    fn apps(&self) -> &BTreeSet<String> {
        match self {
            AppFilter::Select(apps) | AppFilter::Reject(apps) => apps,
        }
    }
}

/// One virtual space definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualSpaceConfig {
    /// The base space this virtual space overlays.
    pub source: String,
    /// Filter applied to base entries. Overridden entries are always visible.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<AppFilter>,
}

/// `[spaces]` section: spaces, virtual spaces and domain bindings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpacesConfig {
    /// Base space names.
    pub spaces: Vec<String>,
    pub virtual_spaces: BTreeMap<String, VirtualSpaceConfig>,
    /// Domain → space (base or virtual).
    pub domain_space: BTreeMap<String, String>,
    /// Domain → editors allowed to publish under it.
    pub trusted_domains: BTreeMap<String, Vec<String>>,
}

impl Default for SpacesConfig {
    fn default() -> Self {
        Self {
            spaces: vec!["main".to_string()],
            virtual_spaces: BTreeMap::new(),
            domain_space: BTreeMap::new(),
            trusted_domains: BTreeMap::new(),
        }
    }
}

impl SpacesConfig {
    /// Check every rule that must hold before the registry serves traffic.
    ///
    /// - all names are valid
    /// - base space names are unique
    /// - no virtual space shares a name with a base space
    /// - every virtual space overlays a base space (no nesting)
    /// - every domain binding targets a configured space
    /// - trusted editors are only listed for bound domains
    pub fn validate(&self) -> SpaceResult<()> {
        if self.spaces.is_empty() {
            return Err(SpaceError::Config("at least one space is required".into()));
        }

        let mut bases = HashSet::new();
        for space in &self.spaces {
            validate_space_name(space)?;
            if !bases.insert(space.as_str()) {
                return Err(SpaceError::NamespaceConflict(format!(
                    "space {space} is declared twice"
                )));
            }
        }

        for (name, def) in &self.virtual_spaces {
            validate_space_name(name)?;
            if bases.contains(name.as_str()) {
                return Err(SpaceError::NamespaceConflict(format!(
                    "virtual space {name} has the same name as a base space"
                )));
            }
            if !bases.contains(def.source.as_str()) {
                return Err(SpaceError::UnknownSource {
                    virtual_space: name.clone(),
                    source_space: def.source.clone(),
                });
            }
            if let Some(filter) = &def.filter {
                for app in filter.apps() {
                    validate_app_name(app)?;
                }
            }
        }

        for (domain, space) in &self.domain_space {
            if domain.is_empty() {
                return Err(SpaceError::Config("empty domain in domain_space".into()));
            }
            // Request domains are matched lowercased.
            if domain.chars().any(|c| c.is_ascii_uppercase()) {
                return Err(SpaceError::Config(format!(
                    "domain {domain} must be lowercase"
                )));
            }
            if !self.is_known(space) {
                return Err(SpaceError::UnknownBinding {
                    domain: domain.clone(),
                    space: space.clone(),
                });
            }
        }

        for (domain, editors) in &self.trusted_domains {
            if !self.domain_space.contains_key(domain) {
                return Err(SpaceError::Config(format!(
                    "trusted editors listed for unbound domain {domain}"
                )));
            }
            for editor in editors {
                validate_editor_name(editor)?;
            }
        }

        debug!(
            spaces = self.spaces.len(),
            virtual_spaces = self.virtual_spaces.len(),
            domains = self.domain_space.len(),
            "spaces configuration valid"
        );
        Ok(())
    }

    /// Whether `name` is a base or virtual space.
    pub fn is_known(&self, name: &str) -> bool {
        self.spaces.iter().any(|s| s == name) || self.virtual_spaces.contains_key(name)
    }

    /// A copy without the virtual space `name` and without the domains bound
    /// to it. Base spaces are never touched.
    pub fn without_virtual_space(&self, name: &str) -> SpaceResult<Self> {
        if !self.virtual_spaces.contains_key(name) {
            return Err(SpaceError::UnknownSpace(name.to_string()));
        }
        let mut next = self.clone();
        next.virtual_spaces.remove(name);
        let unbound: Vec<String> = next
            .domain_space
            .iter()
            .filter(|(_, space)| space.as_str() == name)
            .map(|(domain, _)| domain.clone())
            .collect();
        for domain in unbound {
            next.domain_space.remove(&domain);
            next.trusted_domains.remove(&domain);
        }
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SpacesConfig {
        toml::from_str(
            r#"
            spaces = ["main", "partners"]

            [virtual_spaces.mespapiers]
            source = "main"
            filter = { select = ["drive", "photos"] }

            [virtual_spaces.pro]
            source = "main"
            filter = { reject = ["banks"] }

            [domain_space]
            "cozy.example" = "main"
            "papiers.example" = "mespapiers"

            [trusted_domains]
            "cozy.example" = ["cozy", "partner-a"]
            "papiers.example" = ["cozy"]
            "#,
        )
        .unwrap()
    }

    #[test]
    fn sample_is_valid() {
        let cfg = sample();
        cfg.validate().unwrap();
        assert_eq!(
            cfg.virtual_spaces["mespapiers"].filter,
            Some(AppFilter::Select(["drive", "photos"].iter().map(|s| s.to_string()).collect()))
        );
    }

    #[test]
    fn default_has_one_space() {
        let cfg: SpacesConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.spaces, vec!["main".to_string()]);
        cfg.validate().unwrap();
    }

    #[test]
    fn virtual_name_equal_to_base_is_a_conflict() {
        let mut cfg = sample();
        cfg.virtual_spaces.insert(
            "partners".into(),
            VirtualSpaceConfig {
                source: "main".into(),
                filter: None,
            },
        );
        assert!(matches!(cfg.validate(), Err(SpaceError::NamespaceConflict(_))));
    }

    #[test]
    fn duplicate_base_is_a_conflict() {
        let mut cfg = sample();
        cfg.spaces.push("main".into());
        assert!(matches!(cfg.validate(), Err(SpaceError::NamespaceConflict(_))));
    }

    #[test]
    fn mixed_case_domains_are_rejected() {
        let mut cfg = sample();
        cfg.domain_space.insert("Cozy.Example".into(), "main".into());
        assert!(matches!(cfg.validate(), Err(SpaceError::Config(_))));
    }

    #[test]
    fn nesting_is_rejected() {
        let mut cfg = sample();
        cfg.virtual_spaces.insert(
            "nested".into(),
            VirtualSpaceConfig {
                source: "mespapiers".into(),
                filter: None,
            },
        );
        assert!(matches!(cfg.validate(), Err(SpaceError::UnknownSource { .. })));
    }

    #[test]
    fn binding_to_unknown_space_is_rejected() {
        let mut cfg = sample();
        cfg.domain_space.insert("x.example".into(), "nowhere".into());
        assert!(matches!(cfg.validate(), Err(SpaceError::UnknownBinding { .. })));
    }

    #[test]
    fn reserved_suffix_is_rejected() {
        let mut cfg = sample();
        cfg.spaces.push("main-overwrites".into());
        assert!(matches!(cfg.validate(), Err(SpaceError::InvalidName(_))));
    }

    #[test]
    fn trusted_editors_need_a_bound_domain() {
        let mut cfg = sample();
        cfg.trusted_domains.insert("stray.example".into(), vec!["cozy".into()]);
        assert!(matches!(cfg.validate(), Err(SpaceError::Config(_))));
    }

    #[test]
    fn filters() {
        let select = AppFilter::Select(["drive".to_string()].into());
        assert!(select.allows("drive"));
        assert!(!select.allows("banks"));
        let reject = AppFilter::Reject(["banks".to_string()].into());
        assert!(reject.allows("drive"));
        assert!(!reject.allows("banks"));
    }

    #[test]
    fn removing_a_virtual_space_keeps_the_base() {
        let cfg = sample();
        let next = cfg.without_virtual_space("mespapiers").unwrap();
        assert!(!next.virtual_spaces.contains_key("mespapiers"));
        assert!(next.virtual_spaces.contains_key("pro"));
        assert!(!next.domain_space.contains_key("papiers.example"));
        assert!(!next.trusted_domains.contains_key("papiers.example"));
        assert_eq!(next.spaces, cfg.spaces);
        assert_eq!(next.domain_space["cozy.example"], "main");
        next.validate().unwrap();

        assert!(matches!(
            cfg.without_virtual_space("main"),
            Err(SpaceError::UnknownSpace(_))
        ));
    }
}
