//! Access key resolution and nonce allocation
//!
//! - Cache hits skip the node
//! - Racing resolutions keep the first stored entry
//! - Missing ledger keys resolve to `None`, missing signer keys to `KeyNotFound`
//! - Successive signs on one cached key use strictly increasing nonces

#[cfg(test)]
mod access_key_cache_tests {
    use crate::provider::Provider;
    use crate::sender::{AccessKeyCache, AccessKeyResolver, TransactionSigner};
    use crate::signer::{InMemorySigner, Signer};
    use crate::test_utils::{fixtures, MockProvider};
    use crate::types::{AccessKey, Action, PublicKey};
    use prometheus::IntGauge;
    use proptest::prelude::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn resolver_for(provider: &MockProvider, signer: Arc<InMemorySigner>) -> Arc<AccessKeyResolver> {
        let provider: Arc<dyn Provider> = Arc::new(provider.clone());
        let signer: Arc<dyn Signer> = signer;
        Arc::new(AccessKeyResolver::new(provider, signer))
    }

    fn tx_signer_for(
        provider: &MockProvider,
        signer: Arc<InMemorySigner>,
        resolver: Arc<AccessKeyResolver>,
    ) -> TransactionSigner {
        TransactionSigner::new(
            resolver,
            Arc::new(provider.clone()),
            signer,
            fixtures::ACCOUNT_ID,
            fixtures::NETWORK_ID,
        )
    }

    #[tokio::test]
    async fn test_cache_hit_skips_node() {
        let provider = MockProvider::new(7);
        let (signer, public_key) = fixtures::signer();
        let resolver = resolver_for(&provider, signer);

        let first = resolver
            .resolve(fixtures::ACCOUNT_ID, fixtures::NETWORK_ID)
            .await
            .unwrap()
            .unwrap();
        let second = resolver
            .resolve(fixtures::ACCOUNT_ID, fixtures::NETWORK_ID)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(first.public_key, public_key);
        assert_eq!(first.access_key.nonce, 7);
        assert_eq!(first, second);
        assert_eq!(provider.query_count().await, 1);
        assert_eq!(resolver.cache().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_resolutions_keep_first_entry() {
        let provider = MockProvider::new(0);
        provider.queue_query_nonces([5, 9]).await;
        provider.set_query_delay(Duration::from_millis(50)).await;
        let (signer, public_key) = fixtures::signer();
        let resolver = resolver_for(&provider, signer);

        let (a, b) = tokio::join!(
            resolver.resolve(fixtures::ACCOUNT_ID, fixtures::NETWORK_ID),
            resolver.resolve(fixtures::ACCOUNT_ID, fixtures::NETWORK_ID),
        );
        let a = a.unwrap().unwrap();
        let b = b.unwrap().unwrap();

        // Both went to the node, only one write landed
        assert_eq!(provider.query_count().await, 2);
        assert_eq!(a.access_key, b.access_key);
        assert_eq!(resolver.cache().len(), 1);
        assert_eq!(resolver.cache().get(&public_key), Some(a.access_key));
    }

    #[test]
    fn test_insert_if_absent_prefers_existing() {
        let cache = AccessKeyCache::new();
        let key = PublicKey([3u8; 32]);
        let first = AccessKey { nonce: 5, ..AccessKey::full_access() };
        let second = AccessKey { nonce: 9, ..AccessKey::full_access() };

        assert_eq!(cache.insert_if_absent(&key, first.clone()), first);
        assert_eq!(cache.insert_if_absent(&key, second), first);
        assert_eq!(cache.get(&key).unwrap().nonce, 5);
    }

    #[tokio::test]
    async fn test_missing_ledger_key_resolves_to_none() {
        let provider = MockProvider::without_access_key();
        let (signer, _) = fixtures::signer();
        let resolver = resolver_for(&provider, signer);

        let resolved = resolver
            .resolve(fixtures::ACCOUNT_ID, fixtures::NETWORK_ID)
            .await
            .unwrap();
        assert!(resolved.is_none());
        assert!(resolver.cache().is_empty());
    }

    #[tokio::test]
    async fn test_missing_signer_key_is_key_not_found() {
        let provider = MockProvider::new(1);
        let resolver = resolver_for(&provider, Arc::new(InMemorySigner::new()));

        let err = resolver
            .resolve(fixtures::ACCOUNT_ID, fixtures::NETWORK_ID)
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "KeyNotFound");
        assert_eq!(provider.query_count().await, 0);
    }

    #[tokio::test]
    async fn test_signing_without_ledger_key_is_key_not_found() {
        let provider = MockProvider::without_access_key();
        let (signer, _) = fixtures::signer();
        let resolver = resolver_for(&provider, signer.clone());
        let tx_signer = tx_signer_for(&provider, signer, resolver);

        let err = tx_signer
            .sign(fixtures::RECEIVER_ID, vec![Action::transfer(1)])
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), "KeyNotFound");
        assert_eq!(provider.block_count().await, 0);
    }

    #[tokio::test]
    async fn test_successive_signs_increase_nonce() {
        let provider = MockProvider::new(41);
        let (signer, public_key) = fixtures::signer();
        let resolver = resolver_for(&provider, signer.clone());
        let tx_signer = tx_signer_for(&provider, signer, resolver.clone());

        let mut nonces = Vec::new();
        for _ in 0..5 {
            let attempt = tx_signer
                .sign(fixtures::RECEIVER_ID, vec![Action::transfer(1)])
                .await
                .unwrap();
            assert_eq!(attempt.signed.transaction.block_hash, provider.block_hash());
            assert_eq!(attempt.public_key, public_key);
            nonces.push(attempt.signed.transaction.nonce);
        }

        assert_eq!(nonces, vec![42, 43, 44, 45, 46]);
        assert_eq!(provider.query_count().await, 1);
        assert_eq!(provider.block_count().await, 5);
        assert_eq!(resolver.cache().get(&public_key).unwrap().nonce, 46);
    }

    #[tokio::test]
    async fn test_eviction_rereads_nonce() {
        let provider = MockProvider::new(10);
        let (signer, public_key) = fixtures::signer();
        let resolver = resolver_for(&provider, signer.clone());
        let tx_signer = tx_signer_for(&provider, signer, resolver.clone());

        let first = tx_signer.sign(fixtures::RECEIVER_ID, vec![]).await.unwrap();
        assert_eq!(first.signed.transaction.nonce, 11);

        provider.set_access_key_nonce(30).await;
        resolver.evict(&public_key);
        assert!(resolver.cache().is_empty());

        let second = tx_signer.sign(fixtures::RECEIVER_ID, vec![]).await.unwrap();
        assert_eq!(second.signed.transaction.nonce, 31);
        assert_eq!(provider.query_count().await, 2);
    }

    #[tokio::test]
    async fn test_exhausted_nonce_is_an_error() {
        let provider = MockProvider::new(u64::MAX);
        let (signer, public_key) = fixtures::signer();
        let resolver = resolver_for(&provider, signer.clone());
        let tx_signer = tx_signer_for(&provider, signer, resolver.clone());

        let err = tx_signer
            .sign(fixtures::RECEIVER_ID, vec![Action::transfer(1)])
            .await
            .unwrap_err();

        assert_eq!(err.error_type(), "NonceOverflow");
        assert!(!err.is_retryable());
        assert_eq!(resolver.cache().get(&public_key).unwrap().nonce, u64::MAX);
    }

    #[test]
    fn test_size_gauge_counts_only_own_entries() {
        let gauge = IntGauge::new("test_cache_size", "entries").unwrap();
        gauge.set(5);
        let first = PublicKey([1u8; 32]);
        let second = PublicKey([2u8; 32]);

        let cache = AccessKeyCache::with_size_gauge(gauge.clone());
        cache.insert_if_absent(&first, AccessKey::full_access());
        cache.insert_if_absent(&first, AccessKey { nonce: 9, ..AccessKey::full_access() });
        cache.insert_if_absent(&second, AccessKey::full_access());
        assert_eq!(gauge.get(), 7);

        assert!(cache.evict(&first));
        assert!(!cache.evict(&first));
        assert_eq!(gauge.get(), 6);

        drop(cache);
        assert_eq!(gauge.get(), 5);
    }

    proptest! {
        #[test]
        fn prop_advance_nonce_is_strictly_increasing(start in 0u64..(u64::MAX / 2), count in 1usize..50) {
            let cache = AccessKeyCache::new();
            let key = PublicKey([8u8; 32]);
            cache.insert_if_absent(&key, AccessKey { nonce: start, ..AccessKey::full_access() });

            let nonces: Vec<u64> = (0..count)
                .filter_map(|_| cache.advance_nonce(&key).unwrap())
                .collect();

            prop_assert_eq!(nonces.len(), count);
            prop_assert_eq!(nonces[0], start + 1);
            prop_assert!(nonces.windows(2).all(|pair| pair[1] == pair[0] + 1));
        }
    }
}
