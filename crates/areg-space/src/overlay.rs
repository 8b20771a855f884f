//! Read and listing rules for virtual spaces.
//!
//! Reads consult the overwrite store first. A hit there is authoritative and
//! the base is not consulted; a miss falls through to the base, subject to the
//! virtual space's app filter. Listings are the union of both stores where an
//! overridden entry replaces the base entry with the same key.

use std::collections::BTreeMap;
use std::future::Future;

use tracing::trace;

use crate::resolver::StoreHandle;

/// Which store served a read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    Overwrite,
    Base,
}

/// Read the entry of app `slug` through `handle`.
///
/// `read` is called with a store name and returns `Ok(None)` when the entry
/// is absent from that store.
pub async fn read_through<T, E, F, Fut>(
    handle: &StoreHandle,
    slug: &str,
    mut read: F,
) -> Result<Option<(T, Layer)>, E>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<Option<T>, E>>,
{
    if let Some(overwrite) = handle.overwrite() {
        if let Some(found) = read(overwrite.to_string()).await? {
            trace!(space = handle.space(), slug, "served from overwrite store");
            return Ok(Some((found, Layer::Overwrite)));
        }
    }
    if !handle.base_visible(slug) {
        return Ok(None);
    }
    Ok(read(handle.base().to_string())
        .await?
        .map(|found| (found, Layer::Base)))
}

/// Merge base and overwrite listings. Entries are keyed by `key`; an
/// override replaces the base entry with the same key. Base entries the
/// handle does not expose are dropped. Output is sorted by key.
pub fn merge_listings<T, K, F>(
    handle: &StoreHandle,
    overrides: Vec<T>,
    base: Vec<T>,
    slug_of: impl Fn(&T) -> &str,
    key: F,
) -> Vec<T>
where
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut merged: BTreeMap<K, T> = BTreeMap::new();
    for entry in base {
        if handle.base_visible(slug_of(&entry)) {
            merged.insert(key(&entry), entry);
        }
    }
    for entry in overrides {
        merged.insert(key(&entry), entry);
    }
    merged.into_values().collect()
}
