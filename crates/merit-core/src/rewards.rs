//! Reward ledger — token accrual for messaging activity.
//!
//! Mostly pure computation plus the minimal bookkeeping the activity
//! bonus needs: an append-only per-sender history of sent messages.
//! An explicit instance owned by the host — never a process-wide map.

use std::collections::HashMap;

use merit_message::{IdentityKey, MessageRecord};
use tracing::trace;

/// Base reward for sending one message, in tokens.
pub const BASE_SEND_REWARD: f64 = 0.1;

/// Multiplier applied to the base reward for replies.
pub const REPLY_MULTIPLIER: f64 = 1.5;

/// Messages per tracked period required for the activity bonus.
pub const ACTIVITY_BONUS_THRESHOLD: usize = 10;

/// Activity bonus as a fraction of the base reward.
const ACTIVITY_BONUS_FACTOR: f64 = 0.5;

/// A reference to a sent message in a sender's history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub message_id: String,
    pub recorded_at: u64,
}

/// Per-identity reward state.
///
/// History is append-only; only [`RewardLedger::credit_send`] writes it.
/// The ledger does not track period boundaries itself — the activity
/// bonus takes the caller's count.
pub struct RewardLedger {
    history: HashMap<IdentityKey, Vec<HistoryEntry>>,
    earned: HashMap<IdentityKey, f64>,
}

impl RewardLedger {
    pub fn new() -> Self {
        Self {
            history: HashMap::new(),
            earned: HashMap::new(),
        }
    }

    /// Credit a plain send: returns [`BASE_SEND_REWARD`] and appends the
    /// record to the sender's history.
    ///
    /// The append is the point of this call — the return value is a
    /// constant, the history mutation is not.
    pub fn credit_send(&mut self, record: &MessageRecord) -> f64 {
        self.history
            .entry(record.sender.clone())
            .or_default()
            .push(HistoryEntry {
                message_id: record.id.clone(),
                recorded_at: record.created_at,
            });
        trace!(sender = %record.sender, message_id = %record.id, "send credited");
        BASE_SEND_REWARD
    }

    /// Reply reward: base × [`REPLY_MULTIPLIER`]. Pure — touches no history.
    ///
    /// Callers wanting reply-as-send semantics must credit the reply via
    /// [`credit_send`](Self::credit_send) separately; avoiding double
    /// counting is their responsibility.
    pub fn credit_reply(&self, _original: &MessageRecord, _reply: &MessageRecord) -> f64 {
        BASE_SEND_REWARD * REPLY_MULTIPLIER
    }

    /// Activity bonus: a step function of the caller-supplied count.
    ///
    /// Half the base reward at [`ACTIVITY_BONUS_THRESHOLD`] messages or
    /// more, zero below. No further scaling with higher counts.
    pub fn activity_bonus(&self, _user: &IdentityKey, messages_in_period: usize) -> f64 {
        if messages_in_period >= ACTIVITY_BONUS_THRESHOLD {
            BASE_SEND_REWARD * ACTIVITY_BONUS_FACTOR
        } else {
            0.0
        }
    }

    /// Compound credit for one message: send + optional reply bonus +
    /// activity bonus from the post-send history size.
    ///
    /// Mutates history exactly once (the internal `credit_send`) and
    /// accrues the total into the sender's earned balance. Callers must
    /// not credit the same record again.
    ///
    /// When `is_reply` is set, the record stands in for the original it
    /// replies to — a full accounting needs the original record, which
    /// this layer does not retain.
    pub fn total_reward(&mut self, record: &MessageRecord, is_reply: bool) -> f64 {
        let mut total = self.credit_send(record);
        if is_reply {
            total += self.credit_reply(record, record);
        }
        total += self.activity_bonus(&record.sender, self.history_len(&record.sender));

        *self.earned.entry(record.sender.clone()).or_insert(0.0) += total;
        total
    }

    /// Number of messages in `user`'s history.
    pub fn history_len(&self, user: &IdentityKey) -> usize {
        self.history.get(user).map_or(0, Vec::len)
    }

    /// Read-only view of `user`'s history.
    pub fn history(&self, user: &IdentityKey) -> &[HistoryEntry] {
        self.history.get(user).map_or(&[], Vec::as_slice)
    }

    /// Tokens accrued for `user` via [`total_reward`](Self::total_reward).
    pub fn earned(&self, user: &IdentityKey) -> f64 {
        self.earned.get(user).copied().unwrap_or(0.0)
    }

    /// All earned balances, sorted by address for stable output.
    pub fn earned_totals(&self) -> Vec<(&IdentityKey, f64)> {
        let mut totals: Vec<_> = self.earned.iter().map(|(k, v)| (k, *v)).collect();
        totals.sort_by(|a, b| a.0.cmp(b.0));
        totals
    }
}

impl Default for RewardLedger {
    fn default() -> Self {
        Self::new()
    }
}
