//! Single-use challenge store.
//!
//! Challenges are keyed by the content hash of the rendered image payload,
//! expire after a TTL, and are removed on first lookup whether or not the
//! answer matches. The store holds a small bounded number of outstanding
//! challenges; inserting beyond the bound evicts the oldest.

use sha2::{Digest, Sha256};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use intake_common::ServiceError;
use intake_common::constants::CAPTCHA_SWEEP_INTERVAL_SECS;

use super::CaptchaGenerator;

/// A challenge handed to the client: the key plus the image payload.
/// The stored answer is never part of this.
pub struct IssuedCaptcha {
    pub hash: String,
    pub image_data: String,
}

#[derive(Debug)]
struct StoredChallenge {
    hash: String,
    answer: String,
    issued_at: Instant,
}

/// Bounded TTL store for outstanding captcha challenges
pub struct CaptchaStore {
    ttl: Duration,
    max_outstanding: usize,
    entries: Mutex<VecDeque<StoredChallenge>>,
}

impl CaptchaStore {
    pub fn new(ttl: Duration, max_outstanding: usize) -> Self {
        Self {
            ttl,
            max_outstanding,
            entries: Mutex::new(VecDeque::new()),
        }
    }

    /// Generate a challenge, key it by the payload hash, and store the answer
    pub async fn issue(&self, generator: &CaptchaGenerator) -> Result<IssuedCaptcha, ServiceError> {
        let generated = generator.generate()?;
        let hash = format!("{:x}", Sha256::digest(generated.image_data.as_bytes()));

        self.insert(hash.clone(), generated.answer).await;

        Ok(IssuedCaptcha {
            hash,
            image_data: generated.image_data,
        })
    }

    /// Insert a challenge, evicting expired entries and then the oldest
    /// entries while over capacity
    pub async fn insert(&self, hash: String, answer: String) {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();

        entries.retain(|entry| now.duration_since(entry.issued_at) <= self.ttl);
        while entries.len() >= self.max_outstanding {
            if let Some(evicted) = entries.pop_front() {
                tracing::debug!(hash = %evicted.hash, "evicted oldest outstanding challenge");
            }
        }

        entries.push_back(StoredChallenge {
            hash,
            answer,
            issued_at: now,
        });
    }

    /// Look up and remove the challenge for `hash`, then compare answers.
    ///
    /// The entry is consumed even on a mismatch, so a second attempt with
    /// the same hash always fails. Expired entries compare as absent.
    /// Comparison is exact and case-sensitive.
    pub async fn redeem(&self, hash: &str, candidate: &str) -> bool {
        let mut entries = self.entries.lock().await;

        let Some(pos) = entries.iter().position(|entry| entry.hash == hash) else {
            return false;
        };
        let Some(entry) = entries.remove(pos) else {
            return false;
        };

        if entry.issued_at.elapsed() > self.ttl {
            return false;
        }

        entry.answer == candidate
    }

    /// Drop entries past their TTL; returns how many were removed
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.lock().await;
        let before = entries.len();
        entries.retain(|entry| entry.issued_at.elapsed() <= self.ttl);
        before - entries.len()
    }

    /// Drop every outstanding challenge
    pub async fn clear(&self) {
        self.entries.lock().await.clear();
    }

    /// Number of outstanding challenges
    pub async fn outstanding(&self) -> usize {
        self.entries.lock().await.len()
    }
}

/// Background sweeper for expired challenges; expiry is also enforced
/// lazily at redemption time
pub async fn sweep_worker(store: Arc<CaptchaStore>, mut shutdown: tokio::sync::broadcast::Receiver<()>) {
    let mut interval = tokio::time::interval(Duration::from_secs(CAPTCHA_SWEEP_INTERVAL_SECS));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let purged = store.purge_expired().await;
                if purged > 0 {
                    tracing::debug!(purged, "expired captcha challenges removed");
                }
            }
            _ = shutdown.recv() => {
                tracing::info!("Captcha sweeper shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(ttl_secs: u64, max: usize) -> CaptchaStore {
        CaptchaStore::new(Duration::from_secs(ttl_secs), max)
    }

    #[tokio::test]
    async fn redemption_is_single_use() {
        let store = store(300, 5);
        store.insert("h1".into(), "ab12CD".into()).await;

        assert!(store.redeem("h1", "ab12CD").await);
        assert!(!store.redeem("h1", "ab12CD").await);
    }

    #[tokio::test]
    async fn mismatch_still_consumes_the_challenge() {
        let store = store(300, 5);
        store.insert("h1".into(), "abc123".into()).await;

        assert!(!store.redeem("h1", "wrong").await);
        // The entry is gone; even the right answer fails now
        assert!(!store.redeem("h1", "abc123").await);
    }

    #[tokio::test]
    async fn comparison_is_case_sensitive() {
        let store = store(300, 5);
        store.insert("h1".into(), "ab12CD".into()).await;

        assert!(!store.redeem("h1", "AB12cd").await);
    }

    #[tokio::test]
    async fn expired_challenges_never_redeem() {
        let store = store(0, 5);
        store.insert("h1".into(), "abc123".into()).await;

        assert!(!store.redeem("h1", "abc123").await);
    }

    #[tokio::test]
    async fn unknown_hash_fails() {
        let store = store(300, 5);
        assert!(!store.redeem("missing", "anything").await);
    }

    #[tokio::test]
    async fn capacity_evicts_oldest_first() {
        let store = store(300, 2);
        store.insert("h1".into(), "a".into()).await;
        store.insert("h2".into(), "b".into()).await;
        store.insert("h3".into(), "c".into()).await;

        assert_eq!(store.outstanding().await, 2);
        assert!(!store.redeem("h1", "a").await);
        assert!(store.redeem("h2", "b").await);
        assert!(store.redeem("h3", "c").await);
    }

    #[tokio::test]
    async fn clear_drops_everything() {
        let store = store(300, 5);
        store.insert("h1".into(), "a".into()).await;
        store.insert("h2".into(), "b".into()).await;

        store.clear().await;
        assert_eq!(store.outstanding().await, 0);
        assert!(!store.redeem("h1", "a").await);
    }

    #[tokio::test]
    async fn issue_keys_by_payload_hash() {
        let store = store(300, 5);
        let generator = CaptchaGenerator::new(500, 200);

        let issued = store.issue(&generator).await.expect("issue succeeds");
        assert_eq!(issued.hash.len(), 64);
        assert!(issued.hash.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(issued.image_data.starts_with("data:image/svg+xml;base64,"));
        assert_eq!(store.outstanding().await, 1);

        let expected = format!("{:x}", Sha256::digest(issued.image_data.as_bytes()));
        assert_eq!(issued.hash, expected);
    }
}
