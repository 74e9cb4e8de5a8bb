//! Admission control — the gatekeeper for every outgoing message.
//!
//! Four independent predicates: rate limit, proof-of-message-work,
//! reputation, blacklist. The core deliberately does not compose them —
//! policy (which predicates gate a send, in what order) belongs to the
//! caller so it can change without touching the state machinery here.
//!
//! This struct is the sole owner and mutator of per-sender admission
//! state. A multi-threaded host must wrap it in its own lock so the
//! prune-then-append rate check stays a single read-modify-write unit.

use std::collections::{HashMap, HashSet, VecDeque};
use std::num::NonZeroUsize;

use lru::LruCache;
use merit_message::{IdentityKey, MessageRecord};
use tracing::debug;

use crate::work::{meets_difficulty, work_digest, WorkProof};

/// Accepted sends per sender within one rolling window.
pub const MAX_MESSAGES_PER_WINDOW: usize = 10;

/// Rolling rate-limit window: 5 minutes in milliseconds.
pub const WINDOW_MS: u64 = 5 * 60 * 1000;

/// Reputation delta applied per interaction.
const REPUTATION_DELTA: f64 = 1.0;

/// Default capacity of the seen-message-id dedup cache.
const SEEN_CACHE_SIZE: usize = 4096;

/// Tunables for the admission layer.
#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    /// Accepted sends per sender per window.
    pub max_messages_per_window: usize,
    /// Rolling window length in milliseconds.
    pub window_ms: u64,
    /// Required leading zero bits for proof-of-message-work.
    /// 0 disables the check.
    pub work_difficulty: u8,
    /// Capacity of the recently-seen message-id cache.
    pub seen_cache_size: usize,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_messages_per_window: MAX_MESSAGES_PER_WINDOW,
            window_ms: WINDOW_MS,
            work_difficulty: 0,
            seen_cache_size: SEEN_CACHE_SIZE,
        }
    }
}

/// Spam-prevention state for all senders.
pub struct AdmissionControl {
    config: AdmissionConfig,
    /// Accepted-send timestamps per sender, pruned to the window.
    send_times: HashMap<IdentityKey, VecDeque<u64>>,
    reputation: HashMap<IdentityKey, f64>,
    blacklist: HashSet<IdentityKey>,
    /// Recently-seen message ids (duplicate suppression).
    seen: LruCache<String, ()>,
}

impl AdmissionControl {
    pub fn new(config: AdmissionConfig) -> Self {
        let cache_size = NonZeroUsize::new(config.seen_cache_size.max(1))
            .expect("clamped to at least 1, always non-zero");
        Self {
            config,
            send_times: HashMap::new(),
            reputation: HashMap::new(),
            blacklist: HashSet::new(),
            seen: LruCache::new(cache_size),
        }
    }

    pub fn config(&self) -> &AdmissionConfig {
        &self.config
    }

    /// Rate-limit check for `sender` at `now`.
    ///
    /// Prunes timestamps older than the window, then either records `now`
    /// and accepts, or rejects without recording. A rejected attempt never
    /// consumes quota — a sender at the ceiling recovers as soon as old
    /// entries age out, no matter how often it retries.
    pub fn check_rate_limit(&mut self, sender: &IdentityKey, now: u64) -> bool {
        let times = self.send_times.entry(sender.clone()).or_default();

        let cutoff = now.saturating_sub(self.config.window_ms);
        while times.front().is_some_and(|t| *t < cutoff) {
            times.pop_front();
        }

        if times.len() >= self.config.max_messages_per_window {
            debug!(sender = %sender, in_window = times.len(), "rate limit exceeded");
            return false;
        }

        times.push_back(now);
        true
    }

    /// Proof-of-message-work check.
    ///
    /// Stateless over admission state: valid iff the record is not
    /// tombstoned at `now` and SHA-256(content_hash || nonce) clears the
    /// configured difficulty. Difficulty 0 only leaves the expiry check.
    pub fn validate_message_work(
        &self,
        record: &MessageRecord,
        proof: &WorkProof,
        now: u64,
    ) -> bool {
        if record.is_expired(now) {
            debug!(message_id = %record.id, "work rejected: record expired");
            return false;
        }
        if self.config.work_difficulty == 0 {
            return true;
        }
        meets_difficulty(
            &work_digest(&record.content_hash, proof.nonce),
            self.config.work_difficulty,
        )
    }

    /// Apply a fixed positive or negative reputation delta.
    ///
    /// Scores never go below zero and never decay on their own.
    pub fn update_reputation(&mut self, user: &IdentityKey, positive_interaction: bool) {
        let score = self.reputation.entry(user.clone()).or_insert(0.0);
        if positive_interaction {
            *score += REPUTATION_DELTA;
        } else {
            *score = (*score - REPUTATION_DELTA).max(0.0);
        }
    }

    /// Current reputation. 0.0 for unseen identities — reading never
    /// creates an entry.
    pub fn reputation(&self, user: &IdentityKey) -> f64 {
        self.reputation.get(user).copied().unwrap_or(0.0)
    }

    /// Blacklist `user`. There is no removal — once listed, an identity
    /// stays listed for the lifetime of this store.
    pub fn add_to_blacklist(&mut self, user: &IdentityKey) {
        debug!(user = %user, "blacklisted");
        self.blacklist.insert(user.clone());
    }

    pub fn is_blacklisted(&self, user: &IdentityKey) -> bool {
        self.blacklist.contains(user)
    }

    /// Duplicate suppression: record `message_id` as seen.
    ///
    /// Returns `false` if the id was already in the cache. The cache is
    /// bounded (LRU), so very old ids may be accepted again — the
    /// retention window makes replays of those worthless anyway.
    pub fn record_seen(&mut self, message_id: &str) -> bool {
        if self.seen.contains(message_id) {
            debug!(message_id, "duplicate message id");
            return false;
        }
        self.seen.put(message_id.to_string(), ());
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use merit_message::MessageScope;

    fn sender() -> IdentityKey {
        IdentityKey::from("alice")
    }

    fn admission() -> AdmissionControl {
        AdmissionControl::new(AdmissionConfig::default())
    }

    fn record_at(now: u64) -> MessageRecord {
        MessageRecord::new(
            sender(),
            MessageScope::Private {
                receiver: IdentityKey::from("bob"),
            },
            b"content",
            now,
        )
    }

    #[test]
    fn accepts_up_to_window_capacity() {
        let mut ac = admission();
        for i in 0..MAX_MESSAGES_PER_WINDOW {
            assert!(ac.check_rate_limit(&sender(), 1000 + i as u64), "send {i}");
        }
        assert!(!ac.check_rate_limit(&sender(), 2000));
    }

    #[test]
    fn rejected_attempt_consumes_no_quota() {
        let mut ac = admission();
        for i in 0..MAX_MESSAGES_PER_WINDOW {
            assert!(ac.check_rate_limit(&sender(), 1000 + i as u64));
        }
        // Hammer the limiter while at the ceiling.
        for _ in 0..100 {
            assert!(!ac.check_rate_limit(&sender(), 2000));
        }
        // Once the first accepted send ages out, exactly one slot frees up.
        let later = 1000 + WINDOW_MS + 1;
        assert!(ac.check_rate_limit(&sender(), later));
    }

    #[test]
    fn window_prunes_old_entries() {
        let mut ac = admission();
        for i in 0..MAX_MESSAGES_PER_WINDOW {
            assert!(ac.check_rate_limit(&sender(), 1000 + i as u64));
        }
        // A full window later, all entries have aged out.
        let later = 1000 + 2 * WINDOW_MS;
        for i in 0..MAX_MESSAGES_PER_WINDOW {
            assert!(ac.check_rate_limit(&sender(), later + i as u64));
        }
    }

    #[test]
    fn senders_are_rate_limited_independently() {
        let mut ac = admission();
        for i in 0..MAX_MESSAGES_PER_WINDOW {
            assert!(ac.check_rate_limit(&sender(), 1000 + i as u64));
        }
        assert!(!ac.check_rate_limit(&sender(), 2000));
        assert!(ac.check_rate_limit(&IdentityKey::from("bob"), 2000));
    }

    #[test]
    fn reputation_starts_at_zero_without_creation() {
        let ac = admission();
        assert_eq!(ac.reputation(&sender()), 0.0);
    }

    #[test]
    fn reputation_never_negative() {
        let mut ac = admission();
        for _ in 0..50 {
            ac.update_reputation(&sender(), false);
        }
        assert_eq!(ac.reputation(&sender()), 0.0);

        ac.update_reputation(&sender(), true);
        ac.update_reputation(&sender(), true);
        ac.update_reputation(&sender(), false);
        assert_eq!(ac.reputation(&sender()), 1.0);
    }

    #[test]
    fn blacklist_is_sticky() {
        let mut ac = admission();
        assert!(!ac.is_blacklisted(&sender()));
        ac.add_to_blacklist(&sender());
        assert!(ac.is_blacklisted(&sender()));
        // Positive reputation does not lift the listing.
        for _ in 0..10 {
            ac.update_reputation(&sender(), true);
        }
        assert!(ac.is_blacklisted(&sender()));
    }

    #[test]
    fn work_check_disabled_at_difficulty_zero() {
        let ac = admission();
        let record = record_at(1000);
        assert!(ac.validate_message_work(&record, &WorkProof { nonce: 0 }, 1000));
    }

    #[test]
    fn work_check_enforces_difficulty() {
        let config = AdmissionConfig {
            work_difficulty: 8,
            ..AdmissionConfig::default()
        };
        let ac = AdmissionControl::new(config);
        let record = record_at(1000);

        let proof = crate::work::mine(&record.content_hash, 8).unwrap();
        assert!(ac.validate_message_work(&record, &proof, 1000));

        // A nonce that fails the difficulty must be rejected.
        let mut bad_nonce = 0;
        while meets_difficulty(&work_digest(&record.content_hash, bad_nonce), 8) {
            bad_nonce += 1;
        }
        assert!(!ac.validate_message_work(&record, &WorkProof { nonce: bad_nonce }, 1000));
    }

    #[test]
    fn expired_record_fails_work_check() {
        let ac = admission();
        let record = record_at(1000);
        let past_expiry = record.expires_at + 1;
        assert!(!ac.validate_message_work(&record, &WorkProof { nonce: 0 }, past_expiry));
    }

    #[test]
    fn record_seen_rejects_duplicates() {
        let mut ac = admission();
        assert!(ac.record_seen("msg-1"));
        assert!(!ac.record_seen("msg-1"));
        assert!(ac.record_seen("msg-2"));
    }

    #[test]
    fn seen_cache_is_bounded() {
        let config = AdmissionConfig {
            seen_cache_size: 2,
            ..AdmissionConfig::default()
        };
        let mut ac = AdmissionControl::new(config);
        assert!(ac.record_seen("a"));
        assert!(ac.record_seen("b"));
        assert!(ac.record_seen("c")); // evicts "a"
        assert!(ac.record_seen("a"));
    }
}
