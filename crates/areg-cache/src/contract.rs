//! Behavior every cache engine must share.

use std::time::Duration;

use bytes::Bytes;

use crate::traits::Cache;

pub(crate) async fn cache_contract(cache: &dyn Cache) {
    assert!(cache.get("registry/main/drive/stable").await.unwrap().is_none());

    cache
        .set("registry/main/drive/stable", Bytes::from_static(b"[\"1.0.0\"]"), None)
        .await
        .unwrap();
    assert_eq!(
        cache.get("registry/main/drive/stable").await.unwrap(),
        Some(Bytes::from_static(b"[\"1.0.0\"]"))
    );

    // overwrite is visible immediately
    cache
        .set("registry/main/drive/stable", Bytes::from_static(b"[\"1.0.0\",\"2.0.0\"]"), None)
        .await
        .unwrap();
    assert_eq!(
        cache.get("registry/main/drive/stable").await.unwrap(),
        Some(Bytes::from_static(b"[\"1.0.0\",\"2.0.0\"]"))
    );

    cache.delete("registry/main/drive/stable").await.unwrap();
    cache.delete("registry/main/drive/stable").await.unwrap();
    assert!(cache.get("registry/main/drive/stable").await.unwrap().is_none());

    cache
        .set("registry/main/drive/beta", Bytes::from_static(b"x"), Some(Duration::from_millis(50)))
        .await
        .unwrap();
    assert!(cache.get("registry/main/drive/beta").await.unwrap().is_some());
    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert!(cache.get("registry/main/drive/beta").await.unwrap().is_none());
}
