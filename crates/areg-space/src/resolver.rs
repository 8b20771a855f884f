use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use crate::config::{AppFilter, SpacesConfig};
use crate::error::{SpaceError, SpaceResult};
use crate::naming::Namespace;

/// The stores backing one space.
///
/// For a base space only `base` is set. For a virtual space `overwrite` is
/// its dedicated store and `base` the store of the space it overlays.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoreHandle {
    space: String,
    base_space: String,
    base: String,
    overwrite: Option<String>,
    filter: Option<AppFilter>,
}

impl StoreHandle {
    /// The space the handle was resolved for.
    pub fn space(&self) -> &str {
        &self.space
    }

    /// The base space whose store backs reads that fall through.
    pub fn base_space(&self) -> &str {
        &self.base_space
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn overwrite(&self) -> Option<&str> {
        self.overwrite.as_deref()
    }

    pub fn is_virtual(&self) -> bool {
        self.overwrite.is_some()
    }

    /// Where writes land: the overwrite store of a virtual space, the base
    /// store otherwise. A virtual-space write never reaches the base.
    pub fn write_target(&self) -> &str {
        self.overwrite.as_deref().unwrap_or(&self.base)
    }

    /// Whether a base entry for `slug` is visible through this handle.
    pub fn base_visible(&self, slug: &str) -> bool {
        self.filter.as_ref().map_or(true, |f| f.allows(slug))
    }
}

/// Maps domains and space names onto stores.
///
/// Built once from a validated [`SpacesConfig`] and never mutated; share it
/// behind an `Arc`.
#[derive(Debug)]
pub struct NamespaceResolver {
    namespace: Namespace,
    config: SpacesConfig,
    trusted: HashMap<String, HashSet<String>>,
}

impl NamespaceResolver {
    /// Validate `config` and build the lookup tables.
    pub fn new(namespace: Namespace, config: SpacesConfig) -> SpaceResult<Self> {
        config.validate()?;
        let trusted = config
            .trusted_domains
            .iter()
            .map(|(domain, editors)| (domain.clone(), editors.iter().cloned().collect()))
            .collect();
        Ok(Self {
            namespace,
            config,
            trusted,
        })
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn config(&self) -> &SpacesConfig {
        &self.config
    }

    /// The space bound to `domain`.
    pub fn resolve_space(&self, domain: &str) -> SpaceResult<&str> {
        self.config
            .domain_space
            .get(domain)
            .map(String::as_str)
            .ok_or_else(|| SpaceError::UnknownDomain(domain.to_string()))
    }

    /// The space addressed by a request: `explicit` when given (it must be
    /// configured), otherwise the space bound to `domain`.
    pub fn resolve(&self, domain: &str, explicit: Option<&str>) -> SpaceResult<String> {
        match explicit {
            Some(space) if self.config.is_known(space) => Ok(space.to_string()),
            Some(space) => Err(SpaceError::UnknownSpace(space.to_string())),
            None => self.resolve_space(domain).map(str::to_string),
        }
    }

    /// Fails with `EditorNotTrusted` unless `editor` may publish under
    /// `domain`. Independent of token verification.
    pub fn authorize_write(&self, domain: &str, editor: &str) -> SpaceResult<()> {
        if !self.config.domain_space.contains_key(domain) {
            return Err(SpaceError::UnknownDomain(domain.to_string()));
        }
        let trusted = self
            .trusted
            .get(domain)
            .is_some_and(|editors| editors.contains(editor));
        if !trusted {
            debug!(domain, editor, "write refused: editor not trusted");
            return Err(SpaceError::EditorNotTrusted {
                domain: domain.to_string(),
                editor: editor.to_string(),
            });
        }
        Ok(())
    }

    /// Like [`authorize_write`](Self::authorize_write), and additionally
    /// requires `space` to be the space bound to `domain`. Trust on one
    /// domain never grants writes into another domain's space.
    pub fn authorize_space_write(&self, domain: &str, space: &str, editor: &str) -> SpaceResult<()> {
        self.authorize_write(domain, editor)?;
        if self.resolve_space(domain)? != space {
            debug!(domain, space, editor, "write refused: space not bound to domain");
            return Err(SpaceError::EditorNotTrusted {
                domain: domain.to_string(),
                editor: editor.to_string(),
            });
        }
        Ok(())
    }

    /// Stores backing `space`.
    pub fn resolve_store(&self, space: &str) -> SpaceResult<StoreHandle> {
        if let Some(def) = self.config.virtual_spaces.get(space) {
            return Ok(StoreHandle {
                space: space.to_string(),
                base_space: def.source.clone(),
                base: self.namespace.db_name(&def.source),
                overwrite: Some(self.namespace.overwrite_db_name(space)),
                filter: def.filter.clone(),
            });
        }
        if self.config.spaces.iter().any(|s| s == space) {
            return Ok(StoreHandle {
                space: space.to_string(),
                base_space: space.to_string(),
                base: self.namespace.db_name(space),
                overwrite: None,
                filter: None,
            });
        }
        Err(SpaceError::UnknownSpace(space.to_string()))
    }

    /// Spaces whose reads can observe a write to `space`'s write target:
    /// the space itself, plus every virtual space over it when it is a base.
    pub fn dependents(&self, space: &str) -> Vec<String> {
        let mut out = vec![space.to_string()];
        if !self.config.virtual_spaces.contains_key(space) {
            out.extend(
                self.config
                    .virtual_spaces
                    .iter()
                    .filter(|(_, def)| def.source == space)
                    .map(|(name, _)| name.clone()),
            );
        }
        out
    }

    /// Every store name the configuration uses: base stores and overwrite
    /// stores, sorted.
    pub fn store_names(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = self
            .config
            .spaces
            .iter()
            .map(|s| self.namespace.db_name(s))
            .collect();
        names.extend(
            self.config
                .virtual_spaces
                .keys()
                .map(|v| self.namespace.overwrite_db_name(v)),
        );
        names.into_iter().collect()
    }

    /// A resolver for the same configuration minus the virtual space `name`.
    pub fn without_virtual_space(&self, name: &str) -> SpaceResult<Self> {
        Self::new(
            self.namespace.clone(),
            self.config.without_virtual_space(name)?,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VirtualSpaceConfig;

    fn resolver() -> NamespaceResolver {
        let mut cfg = SpacesConfig {
            spaces: vec!["main".into(), "partners".into()],
            ..SpacesConfig::default()
        };
        cfg.virtual_spaces.insert(
            "mespapiers".into(),
            VirtualSpaceConfig {
                source: "main".into(),
                filter: Some(AppFilter::Select(["drive".to_string()].into())),
            },
        );
        cfg.domain_space.insert("cozy.example".into(), "main".into());
        cfg.domain_space.insert("papiers.example".into(), "mespapiers".into());
        cfg.trusted_domains
            .insert("cozy.example".into(), vec!["cozy".into()]);
        NamespaceResolver::new(Namespace::default(), cfg).unwrap()
    }

    #[test]
    fn resolve_space_by_domain() {
        let r = resolver();
        assert_eq!(r.resolve_space("cozy.example").unwrap(), "main");
        assert_eq!(r.resolve_space("papiers.example").unwrap(), "mespapiers");
        assert!(matches!(
            r.resolve_space("evil.example"),
            Err(SpaceError::UnknownDomain(_))
        ));
    }

    #[test]
    fn explicit_space_wins() {
        let r = resolver();
        assert_eq!(r.resolve("cozy.example", Some("partners")).unwrap(), "partners");
        assert_eq!(r.resolve("anything", Some("mespapiers")).unwrap(), "mespapiers");
        assert_eq!(r.resolve("cozy.example", None).unwrap(), "main");
        assert!(matches!(
            r.resolve("cozy.example", Some("ghost")),
            Err(SpaceError::UnknownSpace(_))
        ));
    }

    #[test]
    fn trust_is_per_domain() {
        let r = resolver();
        r.authorize_write("cozy.example", "cozy").unwrap();
        assert!(matches!(
            r.authorize_write("cozy.example", "mallory"),
            Err(SpaceError::EditorNotTrusted { .. })
        ));
        // bound domain with no trusted list
        assert!(matches!(
            r.authorize_write("papiers.example", "cozy"),
            Err(SpaceError::EditorNotTrusted { .. })
        ));
        assert!(matches!(
            r.authorize_write("evil.example", "cozy"),
            Err(SpaceError::UnknownDomain(_))
        ));
    }

    #[test]
    fn trust_does_not_cross_into_other_spaces() {
        let r = resolver();
        r.authorize_space_write("cozy.example", "main", "cozy").unwrap();
        for space in ["partners", "mespapiers"] {
            assert!(matches!(
                r.authorize_space_write("cozy.example", space, "cozy"),
                Err(SpaceError::EditorNotTrusted { .. })
            ));
        }
    }

    #[test]
    fn base_store_handle() {
        let h = resolver().resolve_store("main").unwrap();
        assert_eq!(h.overwrite(), None);
        assert_eq!(h.base(), "registry-main");
        assert_eq!(h.write_target(), "registry-main");
        assert!(!h.is_virtual());
        assert!(h.base_visible("anything"));
    }

    #[test]
    fn virtual_store_handle() {
        let h = resolver().resolve_store("mespapiers").unwrap();
        assert_eq!(h.overwrite(), Some("registry-mespapiers-overwrites"));
        assert_eq!(h.base(), "registry-main");
        assert_eq!(h.base_space(), "main");
        assert_eq!(h.write_target(), "registry-mespapiers-overwrites");
        assert!(h.base_visible("drive"));
        assert!(!h.base_visible("banks"));
    }

    #[test]
    fn unknown_store() {
        assert!(matches!(
            resolver().resolve_store("ghost"),
            Err(SpaceError::UnknownSpace(_))
        ));
    }

    #[test]
    fn dependents_of_a_base_include_its_overlays() {
        let r = resolver();
        assert_eq!(r.dependents("main"), vec!["main", "mespapiers"]);
        assert_eq!(r.dependents("partners"), vec!["partners"]);
        assert_eq!(r.dependents("mespapiers"), vec!["mespapiers"]);
    }

    #[test]
    fn store_names_cover_everything() {
        assert_eq!(
            resolver().store_names(),
            vec![
                "registry-main",
                "registry-mespapiers-overwrites",
                "registry-partners",
            ]
        );
    }

    #[test]
    fn conflicting_config_is_rejected_at_construction() {
        let mut cfg = SpacesConfig::default();
        cfg.virtual_spaces.insert(
            "main".into(),
            VirtualSpaceConfig {
                source: "main".into(),
                filter: None,
            },
        );
        assert!(matches!(
            NamespaceResolver::new(Namespace::default(), cfg),
            Err(SpaceError::NamespaceConflict(_))
        ));
    }

    #[test]
    fn dropping_a_virtual_space() {
        let r = resolver().without_virtual_space("mespapiers").unwrap();
        assert!(matches!(
            r.resolve_store("mespapiers"),
            Err(SpaceError::UnknownSpace(_))
        ));
        assert!(r.resolve_store("main").is_ok());
        assert!(matches!(
            r.resolve_space("papiers.example"),
            Err(SpaceError::UnknownDomain(_))
        ));
    }
}
