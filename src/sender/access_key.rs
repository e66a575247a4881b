//! Access key resolution with a populate-if-absent cache

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use prometheus::IntGauge;
use std::sync::Arc;
use tracing::debug;

use crate::errors::{kinds, SenderError, SenderResult};
use crate::metrics::metrics;
use crate::provider::{BlockReference, Provider, QueryRequest};
use crate::signer::Signer;
use crate::types::{AccessKey, PublicKey};

/// Nonce following `nonce`, or `NonceOverflow` once the key has used them all
pub fn next_nonce(public_key: &PublicKey, nonce: u64) -> SenderResult<u64> {
    nonce.checked_add(1).ok_or_else(|| {
        SenderError::typed(
            format!("Access key {} has no nonce left after {}", public_key, nonce),
            kinds::NONCE_OVERFLOW,
        )
    })
}

/// Access keys by public key string
///
/// Entries are written with insert-if-absent: when two resolutions race, the
/// one that stores second gets the entry already there instead of replacing it.
/// The size gauge is shared by every cache in the process, so each cache adds
/// and removes only its own entries.
#[derive(Debug)]
pub struct AccessKeyCache {
    entries: DashMap<String, AccessKey>,
    size: IntGauge,
}

impl Default for AccessKeyCache {
    fn default() -> Self {
        Self::with_size_gauge(metrics().access_key_cache_size.clone())
    }
}

impl AccessKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size_gauge(size: IntGauge) -> Self {
        Self {
            entries: DashMap::new(),
            size,
        }
    }

    pub fn get(&self, public_key: &PublicKey) -> Option<AccessKey> {
        self.entries
            .get(&public_key.to_string())
            .map(|entry| entry.value().clone())
    }

    /// Store `fetched` unless an entry exists; return whichever entry is cached
    pub fn insert_if_absent(&self, public_key: &PublicKey, fetched: AccessKey) -> AccessKey {
        match self.entries.entry(public_key.to_string()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                self.size.inc();
                entry.insert(fetched).value().clone()
            }
        }
    }

    /// Bump the cached nonce and return the new value, `None` if nothing is
    /// cached. On overflow the entry keeps its nonce.
    pub fn advance_nonce(&self, public_key: &PublicKey) -> SenderResult<Option<u64>> {
        match self.entries.get_mut(&public_key.to_string()) {
            Some(mut entry) => {
                let nonce = next_nonce(public_key, entry.nonce)?;
                entry.nonce = nonce;
                Ok(Some(nonce))
            }
            None => Ok(None),
        }
    }

    /// Drop the cached entry so the next resolution re-queries the node
    pub fn evict(&self, public_key: &PublicKey) -> bool {
        let removed = self.entries.remove(&public_key.to_string()).is_some();
        if removed {
            self.size.dec();
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Drop for AccessKeyCache {
    fn drop(&mut self) {
        self.size.sub(self.entries.len() as i64);
    }
}

/// Resolved key pair: the signer's public key and the ledger access key
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAccessKey {
    pub public_key: PublicKey,
    pub access_key: AccessKey,
}

/// Finds the access key the signer would use for an account
pub struct AccessKeyResolver {
    provider: Arc<dyn Provider>,
    signer: Arc<dyn Signer>,
    cache: Arc<AccessKeyCache>,
}

impl AccessKeyResolver {
    pub fn new(provider: Arc<dyn Provider>, signer: Arc<dyn Signer>) -> Self {
        Self::with_cache(provider, signer, Arc::new(AccessKeyCache::new()))
    }

    pub fn with_cache(
        provider: Arc<dyn Provider>,
        signer: Arc<dyn Signer>,
        cache: Arc<AccessKeyCache>,
    ) -> Self {
        Self {
            provider,
            signer,
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<AccessKeyCache> {
        &self.cache
    }

    /// Public key the signer holds for the account, or `KeyNotFound`
    pub async fn public_key(&self, account_id: &str, network_id: &str) -> SenderResult<PublicKey> {
        self.signer
            .get_public_key(account_id, network_id)
            .await?
            .ok_or_else(|| SenderError::KeyNotFound {
                account_id: account_id.to_string(),
                network_id: network_id.to_string(),
            })
    }

    /// Resolve the access key, querying the node only on a cache miss.
    ///
    /// Returns `Ok(None)` when the node has no such key for the account.
    pub async fn resolve(
        &self,
        account_id: &str,
        network_id: &str,
    ) -> SenderResult<Option<ResolvedAccessKey>> {
        let public_key = self.public_key(account_id, network_id).await?;

        if let Some(access_key) = self.cache.get(&public_key) {
            metrics().access_key_cache_hits.inc();
            return Ok(Some(ResolvedAccessKey {
                public_key,
                access_key,
            }));
        }
        metrics().access_key_cache_misses.inc();

        let request = QueryRequest::ViewAccessKey {
            account_id: account_id.to_string(),
            public_key,
        };
        let raw = match self
            .provider
            .query(&request, &BlockReference::optimistic())
            .await
        {
            Ok(raw) => raw,
            Err(err) if err.is_access_key_missing() => {
                debug!(
                    account_id = %account_id,
                    public_key = %public_key,
                    "Access key does not exist"
                );
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let fetched: AccessKey = serde_json::from_value(raw)?;
        let access_key = self.cache.insert_if_absent(&public_key, fetched);
        debug!(
            account_id = %account_id,
            public_key = %public_key,
            nonce = access_key.nonce,
            "Access key cached"
        );
        Ok(Some(ResolvedAccessKey {
            public_key,
            access_key,
        }))
    }

    /// Forget the cached key after the node rejected its nonce
    pub fn evict(&self, public_key: &PublicKey) {
        if self.cache.evict(public_key) {
            metrics().access_key_evictions.inc();
            debug!(public_key = %public_key, "Evicted cached access key");
        }
    }
}
