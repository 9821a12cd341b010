use bytes::Bytes;
use std::sync::Arc;

use bucket_walkthrough::{
    domain::models::{CannedAcl, PutObjectOptions},
    BucketName, InMemoryStorageAdapter, ObjectKey, StorageError, StorageProvider,
};

async fn provider_with_buckets() -> (Arc<dyn StorageProvider>, BucketName, BucketName) {
    let provider: Arc<dyn StorageProvider> = Arc::new(InMemoryStorageAdapter::new());
    let first = BucketName::generate("source-").unwrap();
    let second = BucketName::generate("target-").unwrap();
    provider.create_bucket(&first, None).await.unwrap();
    provider.create_bucket(&second, Some("eu-west-1")).await.unwrap();
    (provider, first, second)
}

#[tokio::test]
async fn test_copy_is_byte_identical() {
    let (provider, first, second) = provider_with_buckets().await;
    let key = ObjectKey::new("copied.bin").unwrap();
    let data = Bytes::from((0u8..=255).cycle().take(4096).collect::<Vec<u8>>());

    let put = provider
        .put_object(&first, &key, data.clone(), &PutObjectOptions::default())
        .await
        .unwrap();
    let copied = provider
        .copy_object(&first, &key, &second, &key)
        .await
        .unwrap();

    assert_eq!(provider.get_object(&second, &key, None).await.unwrap(), data);
    assert_eq!(put.etag, copied.etag);
}

#[tokio::test]
async fn test_acl_round_trip() {
    let (provider, first, _) = provider_with_buckets().await;
    let key = ObjectKey::new("shared.txt").unwrap();
    let options = PutObjectOptions::default().with_acl(CannedAcl::PublicRead);

    provider
        .put_object(&first, &key, Bytes::from("hello"), &options)
        .await
        .unwrap();
    let acl = provider.get_object_acl(&first, &key).await.unwrap();
    assert!(acl.is_public_read());
    assert!(acl.owner.is_some());

    provider
        .put_object_acl(&first, &key, CannedAcl::Private)
        .await
        .unwrap();
    let acl = provider.get_object_acl(&first, &key).await.unwrap();
    assert!(!acl.is_public_read());
    assert_eq!(acl.grants.len(), 1);
}

#[tokio::test]
async fn test_version_ids_follow_bucket_versioning() {
    let (provider, first, _) = provider_with_buckets().await;
    let key = ObjectKey::new("versioned.txt").unwrap();

    let unversioned = provider
        .put_object(&first, &key, Bytes::from("a"), &PutObjectOptions::default())
        .await
        .unwrap();
    assert_eq!(unversioned.version_id, None);

    provider.put_bucket_versioning(&first, true).await.unwrap();

    // The object written earlier now reports the null version
    let head = provider.head_object(&first, &key).await.unwrap();
    assert!(head.version_id.unwrap().is_null());

    let versioned = provider
        .put_object(&first, &key, Bytes::from("b"), &PutObjectOptions::default())
        .await
        .unwrap();
    let version_id = versioned.version_id.unwrap();
    assert!(!version_id.is_null());
    assert_eq!(
        provider.head_object(&first, &key).await.unwrap().version_id,
        Some(version_id)
    );
}

#[tokio::test]
async fn test_missing_resources_are_typed_errors() {
    let (provider, first, _) = provider_with_buckets().await;
    let key = ObjectKey::new("absent.txt").unwrap();
    let missing = BucketName::new("no-such-bucket").unwrap();

    let err = provider.get_object(&first, &key, None).await.unwrap_err();
    assert_eq!(
        err,
        StorageError::ObjectNotFound {
            bucket: first.clone(),
            key: key.clone()
        }
    );

    let err = provider.head_object(&missing, &key).await.unwrap_err();
    assert_eq!(err, StorageError::BucketNotFound { bucket: missing });
}

#[tokio::test]
async fn test_list_buckets_and_objects() {
    let (provider, first, second) = provider_with_buckets().await;
    for name in ["b.txt", "a.txt", "logs/c.txt"] {
        provider
            .put_object(
                &first,
                &ObjectKey::new(name).unwrap(),
                Bytes::from(name),
                &PutObjectOptions::default(),
            )
            .await
            .unwrap();
    }

    let buckets: Vec<BucketName> = provider
        .list_buckets()
        .await
        .unwrap()
        .into_iter()
        .map(|b| b.name)
        .collect();
    assert_eq!(buckets.len(), 2);
    assert!(buckets.contains(&first) && buckets.contains(&second));

    let keys: Vec<String> = provider
        .list_objects(&first, None)
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.key.to_string())
        .collect();
    assert_eq!(keys, vec!["a.txt", "b.txt", "logs/c.txt"]);

    let logs = provider.list_objects(&first, Some("logs/")).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].size, "logs/c.txt".len() as u64);
}
