//! Synced configuration integration tests.

#[cfg(test)]
mod tests {
    use crate::{DEFAULT_ARTIFACT, Harness, ObjectStore, synced_config_batch};

    const SYNCED: &str = "http:\n  routers:\n    api: {rule: \"Host(`api`)\"}\n";

    #[tokio::test]
    async fn test_should_fetch_and_publish_new_version() {
        let store = ObjectStore::start("200 OK", SYNCED).await;
        let mut harness = Harness::new();
        let seeded = harness.state.tracked_file_path.clone();

        let dirty = harness.feed(&synced_config_batch(store.base_url(), "t1")).await;

        assert!(dirty);
        assert_eq!(store.hits(), 1);
        assert_eq!(harness.tracked_contents(), SYNCED.as_bytes());
        assert_eq!(harness.state.tracked_file_version.as_deref(), Some("t1"));
        assert_ne!(harness.state.tracked_file_path, seeded);
        assert!(!seeded.exists());
        assert_eq!(harness.staged_files(), 1);
    }

    #[tokio::test]
    async fn test_should_sign_object_request() {
        let store = ObjectStore::start("200 OK", SYNCED).await;
        let mut harness = Harness::new();

        harness.feed(&synced_config_batch(store.base_url(), "t1")).await;

        let head = store.requests()[0].to_lowercase();
        assert!(head.starts_with("get /traefik.yaml http/1.1"));
        assert!(head.contains("x-amz-date: "));
        assert!(head.contains("authorization: aws4-hmac-sha256 credential=test/"));
        assert!(head.contains("/us-east-1/s3/aws4_request"));
        assert!(head.contains("signedheaders=host;x-amz-date"));
    }

    #[tokio::test]
    async fn test_should_not_refetch_same_version() {
        let store = ObjectStore::start("200 OK", SYNCED).await;
        let mut harness = Harness::new();
        let batch = synced_config_batch(store.base_url(), "t1");

        assert!(harness.feed(&batch).await);
        let published = harness.state.tracked_file_path.clone();

        assert!(!harness.feed(&batch).await);
        assert_eq!(store.hits(), 1);
        assert_eq!(harness.state.tracked_file_path, published);
        assert_eq!(harness.tracked_contents(), SYNCED.as_bytes());
    }

    #[tokio::test]
    async fn test_should_fetch_again_for_new_version() {
        let store = ObjectStore::start("200 OK", SYNCED).await;
        let mut harness = Harness::new();

        assert!(harness.feed(&synced_config_batch(store.base_url(), "t1")).await);
        assert!(harness.feed(&synced_config_batch(store.base_url(), "t2")).await);

        assert_eq!(store.hits(), 2);
        assert_eq!(harness.state.tracked_file_version.as_deref(), Some("t2"));
        assert_eq!(harness.staged_files(), 1);
    }

    #[tokio::test]
    async fn test_should_keep_artifact_when_fetch_is_forbidden() {
        let store = ObjectStore::start("403 Forbidden", "<Error><Code>AccessDenied</Code></Error>").await;
        let mut harness = Harness::new();
        let before = harness.state.clone();

        let dirty = harness.feed(&synced_config_batch(store.base_url(), "t1")).await;

        assert!(!dirty);
        assert_eq!(store.hits(), 1);
        assert_eq!(harness.state, before);
        assert_eq!(harness.tracked_contents(), DEFAULT_ARTIFACT);
        assert_eq!(harness.staged_files(), 1);
    }

    #[tokio::test]
    async fn test_should_retry_version_after_failed_fetch() {
        let forbidden = ObjectStore::start("403 Forbidden", "denied").await;
        let healthy = ObjectStore::start("200 OK", SYNCED).await;
        let mut harness = Harness::new();

        assert!(!harness.feed(&synced_config_batch(forbidden.base_url(), "t1")).await);
        assert!(harness.feed(&synced_config_batch(healthy.base_url(), "t1")).await);

        assert_eq!(healthy.hits(), 1);
        assert_eq!(harness.tracked_contents(), SYNCED.as_bytes());
    }

    #[tokio::test]
    async fn test_should_skip_records_for_other_files() {
        let store = ObjectStore::start("200 OK", SYNCED).await;
        let mut harness = Harness::new();
        let batch = format!(
            "synced_config\n\
             {{\"status\":\"success\",\"type\":\"file\",\"key\":\"other.yaml\",\"url\":\"{url}\",\"lastModified\":\"t1\"}}\n\
             {{\"status\":\"failed\",\"type\":\"file\",\"key\":\"traefik.yaml\",\"url\":\"{url}\",\"lastModified\":\"t1\"}}\n\
             {{\"status\":\"success\",\"type\":\"folder\",\"key\":\"traefik.yaml\",\"url\":\"{url}\",\"lastModified\":\"t1\"}}\n",
            url = store.base_url()
        );

        assert!(!harness.feed(&batch).await);
        assert_eq!(store.hits(), 0);
    }
}
