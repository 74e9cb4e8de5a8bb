//! The decision pipeline the core deliberately leaves to the caller.
//!
//! Composes the admission predicates in policy order (blacklist,
//! duplicate, rate limit, work), then credits the ledger. Each store
//! sits behind its own lock, matching the concurrency contract: per-key
//! admission updates are read-modify-write units, and registry selection
//! serializes against registration.

use std::sync::Mutex;

use merit_core::admission::{AdmissionConfig, AdmissionControl};
use merit_core::rewards::RewardLedger;
use merit_core::validators::{Validator, ValidatorRegistry};
use merit_core::work::WorkProof;
use merit_core::{IdentityKey, MeritCoreError, MessageRecord};
use rand::Rng;
use tracing::info;

/// Why a send was turned away. Normal negative outcomes — the sender
/// should back off, not treat this as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Blacklisted,
    Duplicate,
    RateLimited,
    InvalidWork,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RejectReason::Blacklisted => "sender blacklisted",
            RejectReason::Duplicate => "duplicate message id",
            RejectReason::RateLimited => "rate limit exceeded",
            RejectReason::InvalidWork => "proof-of-message-work invalid",
        };
        f.write_str(s)
    }
}

/// Outcome of one send request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Accepted { reward: f64 },
    Rejected { reason: RejectReason },
}

/// Shared decision state for one host process.
pub struct Engine {
    admission: Mutex<AdmissionControl>,
    ledger: Mutex<RewardLedger>,
    registry: Mutex<ValidatorRegistry>,
}

impl Engine {
    pub fn new(config: AdmissionConfig) -> Self {
        Self {
            admission: Mutex::new(AdmissionControl::new(config)),
            ledger: Mutex::new(RewardLedger::new()),
            registry: Mutex::new(ValidatorRegistry::new()),
        }
    }

    /// Run one send through the pipeline: admission checks in policy
    /// order, then a single compound reward credit.
    pub fn submit(
        &self,
        record: &MessageRecord,
        proof: &WorkProof,
        is_reply: bool,
        now: u64,
    ) -> Verdict {
        {
            let mut admission = self.admission.lock().expect("admission lock poisoned");

            if admission.is_blacklisted(&record.sender) {
                return Verdict::Rejected {
                    reason: RejectReason::Blacklisted,
                };
            }
            if !admission.record_seen(&record.id) {
                return Verdict::Rejected {
                    reason: RejectReason::Duplicate,
                };
            }
            if !admission.check_rate_limit(&record.sender, now) {
                return Verdict::Rejected {
                    reason: RejectReason::RateLimited,
                };
            }
            if !admission.validate_message_work(record, proof, now) {
                return Verdict::Rejected {
                    reason: RejectReason::InvalidWork,
                };
            }
        }

        let reward = self
            .ledger
            .lock()
            .expect("ledger lock poisoned")
            .total_reward(record, is_reply);
        info!(sender = %record.sender, message_id = %record.id, reward, "message accepted");
        Verdict::Accepted { reward }
    }

    pub fn blacklist(&self, user: &IdentityKey) {
        self.admission
            .lock()
            .expect("admission lock poisoned")
            .add_to_blacklist(user);
    }

    pub fn update_reputation(&self, user: &IdentityKey, positive: bool) {
        self.admission
            .lock()
            .expect("admission lock poisoned")
            .update_reputation(user, positive);
    }

    pub fn earned(&self, user: &IdentityKey) -> f64 {
        self.ledger.lock().expect("ledger lock poisoned").earned(user)
    }

    /// Earned balances as owned pairs, sorted by address.
    pub fn earned_totals(&self) -> Vec<(String, f64)> {
        self.ledger
            .lock()
            .expect("ledger lock poisoned")
            .earned_totals()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    pub fn register_validator(&self, validator: Validator) {
        self.registry
            .lock()
            .expect("registry lock poisoned")
            .register(validator);
    }

    /// Select the next validator under the registry lock, so the draw
    /// sees a consistent snapshot of the eligible set.
    pub fn rotate<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        now: u64,
    ) -> Result<IdentityKey, MeritCoreError> {
        let registry = self.registry.lock().expect("registry lock poisoned");
        let selected = registry.select_next(rng, now)?;
        Ok(selected.address.clone())
    }

    pub fn top_validators(&self, n: usize, now: u64) -> Vec<(String, f64)> {
        let registry = self.registry.lock().expect("registry lock poisoned");
        registry
            .top_validators(n, now)
            .into_iter()
            .map(|v| (v.address.to_string(), v.priority_score_at(now)))
            .collect()
    }
}
