//! Behavioral suites every engine must pass. Each engine's tests call these
//! with a fresh instance, which is what makes the engines interchangeable.

use bytes::Bytes;
use chrono::{DateTime, Utc};

use areg_types::{App, AppKind, Version};

use crate::document::DocumentStore;
use crate::traits::ObjectStorage;

pub(crate) async fn object_storage_contract(store: &dyn ObjectStorage) {
    let p = "registry-contract";

    store.ensure_container(p).await.unwrap();
    store.ensure_container(p).await.unwrap();
    assert!(store.list(p).await.unwrap().is_empty());

    let err = store.get(p, "missing").await.unwrap_err();
    assert!(err.is_not_found(), "{err}");
    assert!(!store.exists(p, "missing").await.unwrap());

    store.put(p, "drive/1.0.0.tar.gz", Bytes::from_static(b"v1")).await.unwrap();
    assert_eq!(store.get(p, "drive/1.0.0.tar.gz").await.unwrap(), Bytes::from_static(b"v1"));
    assert!(store.exists(p, "drive/1.0.0.tar.gz").await.unwrap());

    // upsert
    store.put(p, "drive/1.0.0.tar.gz", Bytes::from_static(b"v2")).await.unwrap();
    assert_eq!(store.get(p, "drive/1.0.0.tar.gz").await.unwrap(), Bytes::from_static(b"v2"));

    store.put(p, "banks/2.0.0.tar.gz", Bytes::from_static(b"b")).await.unwrap();
    store.put(p, "drive/1.1.0.tar.gz", Bytes::from_static(b"c")).await.unwrap();
    assert_eq!(
        store.list(p).await.unwrap(),
        vec![
            "banks/2.0.0.tar.gz".to_string(),
            "drive/1.0.0.tar.gz".to_string(),
            "drive/1.1.0.tar.gz".to_string(),
        ]
    );
    assert_eq!(store.list_under(p, "drive/").await.unwrap().len(), 2);

    // isolation between prefixes
    let other = "registry-contract-other";
    assert!(store.get(other, "drive/1.0.0.tar.gz").await.unwrap_err().is_not_found());
    assert!(store.list(other).await.unwrap().is_empty());
    store.put(other, "drive/1.0.0.tar.gz", Bytes::from_static(b"o")).await.unwrap();
    assert_eq!(store.get(p, "drive/1.0.0.tar.gz").await.unwrap(), Bytes::from_static(b"v2"));

    store.delete(p, "drive/1.0.0.tar.gz").await.unwrap();
    store.delete(p, "drive/1.0.0.tar.gz").await.unwrap();
    assert!(store.get(p, "drive/1.0.0.tar.gz").await.unwrap_err().is_not_found());

    assert!(store.put(p, "../escape", Bytes::new()).await.is_err());
    assert!(store.put("Bad/Prefix", "k", Bytes::new()).await.is_err());

    store.delete_container(p).await.unwrap();
    assert!(store.list(p).await.unwrap().is_empty());
    assert_eq!(store.list(other).await.unwrap(), vec!["drive/1.0.0.tar.gz".to_string()]);
}

fn at(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap()
}

pub(crate) async fn document_store_contract(store: &dyn DocumentStore) {
    let db = "registry-docs";

    store.ensure_database(db).await.unwrap();
    store.ensure_database(db).await.unwrap();
    assert!(store.get_app(db, "drive").await.unwrap().is_none());
    assert!(store.list_apps(db).await.unwrap().is_empty());

    let drive = App::new("drive", AppKind::Webapp, "cozy", at(1)).unwrap();
    let banks = App::new("banks", AppKind::Konnector, "cozy", at(2)).unwrap();
    store.put_app(db, &drive).await.unwrap();
    store.put_app(db, &banks).await.unwrap();
    store.put_app(db, &drive).await.unwrap();
    assert_eq!(store.get_app(db, "drive").await.unwrap(), Some(drive.clone()));
    let slugs: Vec<String> = store
        .list_apps(db)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.slug)
        .collect();
    assert_eq!(slugs, vec!["banks".to_string(), "drive".to_string()]);

    let mut v1 = Version::new("drive", "1.0.0", "cozy", at(3)).unwrap();
    let v2 = Version::new("drive", "2.0.0-beta.1", "cozy", at(4)).unwrap();
    let other = Version::new("drive-extra", "1.0.0", "cozy", at(5)).unwrap();
    store.put_version(db, &v1).await.unwrap();
    store.put_version(db, &v2).await.unwrap();
    store.put_version(db, &other).await.unwrap();

    // upsert replaces
    v1.manifest = serde_json::json!({ "name": "Drive" });
    store.put_version(db, &v1).await.unwrap();
    assert_eq!(store.get_version(db, "drive", "1.0.0").await.unwrap(), Some(v1.clone()));

    let mut versions: Vec<String> = store
        .list_versions(db, "drive")
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.version)
        .collect();
    versions.sort();
    assert_eq!(versions, vec!["1.0.0".to_string(), "2.0.0-beta.1".to_string()]);

    // other databases are untouched
    assert!(store.get_version("registry-elsewhere", "drive", "1.0.0").await.unwrap().is_none());

    assert!(store.delete_version(db, "drive", "1.0.0").await.unwrap());
    assert!(!store.delete_version(db, "drive", "1.0.0").await.unwrap());
    assert!(store.get_version(db, "drive", "1.0.0").await.unwrap().is_none());

    store.delete_database(db).await.unwrap();
    assert!(store.list_apps(db).await.unwrap().is_empty());
    assert!(store.list_versions(db, "drive").await.unwrap().is_empty());
}
