//! Merit incentive core.
//!
//! The trust-and-incentive layer of a decentralized messenger: decides
//! whether a sender may post (admission control), what activity earns
//! (reward ledger), and which staked participant validates next
//! (stake-weighted registry).
//!
//! Every component is a plain synchronous store with explicit `now`
//! parameters — no hidden clocks, no global state, no suspension points.
//! The host composes the admission predicates and wraps each store in
//! its own lock; see the `merit-cli` engine for the reference composition.

pub mod admission;
pub mod error;
pub mod rewards;
pub mod validators;
pub mod work;

pub use admission::{AdmissionConfig, AdmissionControl};
pub use error::MeritCoreError;
pub use rewards::{HistoryEntry, RewardLedger};
pub use validators::{Validator, ValidatorRegistry};
pub use work::{leading_zero_bits, mine, WorkProof, MAX_WORK_DIFFICULTY};

pub use merit_message::{now_ms, IdentityKey, MessageRecord, MessageScope};
