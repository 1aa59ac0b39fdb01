// SPDX-FileCopyrightText: 2026 Linnet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capacity and expiry behaviour of the message cache.

use std::time::Duration;

use linnet_cache::{CachedMessage, MessageCache};
use linnet_config::model::MessageCacheConfig;
use linnet_core::MessageId;
use proptest::prelude::*;

/// Filling the cache one past capacity evicts exactly the first entry.
#[tokio::test(start_paused = true)]
async fn one_past_capacity_evicts_oldest() {
    let cache = MessageCache::from_config(&MessageCacheConfig::default());

    for i in 0..=100 {
        cache.put(
            MessageId::new(format!("m{i}")),
            CachedMessage::text(format!("message {i}")),
        );
    }

    assert_eq!(cache.len(), 100);
    assert!(cache.get(&MessageId::from("m0")).is_none());
    for i in 1..=100 {
        assert!(
            cache.get(&MessageId::new(format!("m{i}"))).is_some(),
            "m{i} should survive"
        );
    }
}

/// Lookups after the TTL miss.
#[tokio::test(start_paused = true)]
async fn lookup_after_ttl_misses() {
    let cache = MessageCache::from_config(&MessageCacheConfig::default());
    cache.put(MessageId::from("m1"), CachedMessage::text("hello"));

    tokio::time::advance(Duration::from_secs(3600)).await;
    assert!(cache.get(&MessageId::from("m1")).is_some());

    tokio::time::advance(Duration::from_secs(1)).await;
    assert!(cache.get(&MessageId::from("m1")).is_none());
}

proptest! {
    /// The cache never holds more than its capacity, and the most recent
    /// insert is always retrievable.
    #[test]
    fn size_is_bounded(
        capacity in 1usize..20,
        keys in proptest::collection::vec(0u8..40, 1..200),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .start_paused(true)
            .build()
            .expect("runtime");
        let _guard = rt.enter();

        let cache = MessageCache::new(capacity, Duration::from_secs(3600));
        for key in keys {
            let id = MessageId::new(format!("m{key}"));
            cache.put(id.clone(), CachedMessage::text(key.to_string()));
            prop_assert!(cache.len() <= capacity);
            let entry = cache.get(&id);
            let expected = key.to_string();
            prop_assert_eq!(
                entry.as_ref().and_then(|e| e.text_content()),
                Some(expected.as_str())
            );
        }
    }
}
