//! Proof-of-message-work (PoMW).
//!
//! A stateless computational-cost predicate: SHA-256 over the message
//! content hash and a nonce must carry enough leading zero bits. The
//! proof travels as transport-level metadata, not inside the record.
//!
//! Difficulty 0 disables the check entirely. Difficulty is capped at
//! [`MAX_WORK_DIFFICULTY`] so a malicious config cannot demand
//! unbounded CPU from senders.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::MeritCoreError;

/// Maximum allowed difficulty in leading zero bits.
///
/// 24 bits is ~16M hash attempts on average — a few seconds of CPU.
pub const MAX_WORK_DIFFICULTY: u8 = 24;

/// Nonce search bound for [`mine`] (~67M attempts).
const MAX_SEARCH: u64 = 1 << 26;

/// Proof-of-message-work token, attached alongside a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkProof {
    pub nonce: u64,
}

/// Digest a proof attempt: SHA-256(content_hash || nonce_le).
pub fn work_digest(content_hash: &[u8; 32], nonce: u64) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(content_hash);
    hasher.update(nonce.to_le_bytes());
    hasher.finalize().into()
}

/// Count leading zero bits of a digest.
pub fn leading_zero_bits(digest: &[u8; 32]) -> u32 {
    let mut bits = 0;
    for byte in digest {
        if *byte == 0 {
            bits += 8;
        } else {
            bits += byte.leading_zeros();
            break;
        }
    }
    bits
}

/// Whether `digest` satisfies `difficulty` leading zero bits.
pub fn meets_difficulty(digest: &[u8; 32], difficulty: u8) -> bool {
    leading_zero_bits(digest) >= u32::from(difficulty)
}

/// Search for a nonce satisfying `difficulty` over `content_hash`.
///
/// CPU-intensive for high difficulties — callers embedded in an async
/// host should dispatch this off the reactor.
pub fn mine(content_hash: &[u8; 32], difficulty: u8) -> Result<WorkProof, MeritCoreError> {
    if difficulty > MAX_WORK_DIFFICULTY {
        return Err(MeritCoreError::DifficultyTooHigh {
            difficulty,
            max: MAX_WORK_DIFFICULTY,
        });
    }

    for nonce in 0..MAX_SEARCH {
        if meets_difficulty(&work_digest(content_hash, nonce), difficulty) {
            return Ok(WorkProof { nonce });
        }
    }

    Err(MeritCoreError::WorkSearchExhausted { difficulty })
}
