//! Bucket listing integration tests.

#[cfg(test)]
mod tests {
    use proxysync_core::state::{EXTRA_STORE_PREFIX, REMOTE_STORE_PREFIX};

    use crate::{EXTRA_BUCKETS, Harness};

    #[tokio::test]
    async fn test_should_map_remote_folder_to_bucket() {
        let mut harness = Harness::new();

        let dirty = harness
            .feed("bucket\n{\"type\":\"folder\",\"key\":\"thanos-mybucket/prod/\"}\n")
            .await;

        assert!(dirty);
        assert_eq!(harness.state.remotes, vec!["prod"]);
        assert_eq!(harness.state.stores.len(), 1 + EXTRA_BUCKETS.len());

        let remote_entries: Vec<_> = harness
            .state
            .stores
            .iter()
            .filter(|(key, _)| key.starts_with(REMOTE_STORE_PREFIX))
            .collect();
        assert_eq!(remote_entries.len(), 1);
        assert_eq!(remote_entries[0].0, "remote-prod");
        assert_eq!(remote_entries[0].1.bucket, "mybucket");

        for bucket in EXTRA_BUCKETS {
            let key = format!("{EXTRA_STORE_PREFIX}{bucket}");
            assert_eq!(harness.state.stores[&key].bucket, bucket);
        }
    }

    #[tokio::test]
    async fn test_should_be_idempotent_for_repeated_listing() {
        let mut harness = Harness::new();
        let batch = "bucket\n{\"type\":\"folder\",\"key\":\"thanos-mybucket/prod/\"}\n{\"type\":\"folder\",\"key\":\"thanos-other/dev/\"}\n";

        assert!(harness.feed(batch).await);
        let after_first = harness.state.clone();

        assert!(!harness.feed(batch).await);
        assert_eq!(harness.state, after_first);
    }

    #[tokio::test]
    async fn test_should_ignore_listing_order() {
        let mut harness = Harness::new();

        assert!(
            harness
                .feed("bucket\n{\"type\":\"folder\",\"key\":\"thanos-a/one/\"}\n{\"type\":\"folder\",\"key\":\"thanos-b/two/\"}\n")
                .await
        );
        assert!(
            !harness
                .feed("bucket\n{\"type\":\"folder\",\"key\":\"thanos-b/two/\"}\n{\"type\":\"folder\",\"key\":\"thanos-a/one/\"}\n")
                .await
        );
    }

    #[tokio::test]
    async fn test_should_keep_valid_records_beside_bad_ones() {
        let mut harness = Harness::new();

        let dirty = harness
            .feed(
                "bucket\n\
                 {\"type\":\"folder\",\"key\":\"thanos-mybucket/prod/\"}\n\
                 {not json\n\
                 {\"type\":\"folder\"}\n\
                 {\"type\":\"folder\",\"key\":\"thanos-mybucket/Bad--Name/\"}\n",
            )
            .await;

        assert!(dirty);
        assert_eq!(harness.state.remotes, vec!["prod"]);
    }

    #[tokio::test]
    async fn test_should_leave_tracked_file_alone() {
        let mut harness = Harness::new();
        let tracked = harness.state.tracked_file_path.clone();

        harness
            .feed("bucket\n{\"type\":\"folder\",\"key\":\"thanos-mybucket/prod/\"}\n")
            .await;

        assert_eq!(harness.state.tracked_file_path, tracked);
        assert_eq!(harness.tracked_contents(), crate::DEFAULT_ARTIFACT);
    }
}
