//! Message records — the immutable unit the incentive core reasons about.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::MeritMessageError;
use crate::identity::IdentityKey;

/// Default retention window: 24 hours in milliseconds.
pub const RETENTION_MS: u64 = 24 * 60 * 60 * 1000;

const MS_PER_DAY: u64 = 24 * 60 * 60 * 1000;

/// Current Unix time in milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Delivery scope of a message.
///
/// A two-case variant instead of a subclass hierarchy: private messages
/// carry a receiver, group messages carry a group id and no receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageScope {
    Private { receiver: IdentityKey },
    Group { group_id: String },
}

/// An immutable record of a sent message.
///
/// Created at send time; the only field that may change afterwards is
/// `expires_at` (retention extension). Once `now > expires_at` the record
/// is tombstoned: consumers must grant no new rewards and accept no
/// proof-of-message-work for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Unique message identifier (UUID v4).
    pub id: String,
    /// Sender address.
    pub sender: IdentityKey,
    /// Private receiver or group destination.
    pub scope: MessageScope,
    /// SHA-256 digest of the plaintext content.
    pub content_hash: [u8; 32],
    /// Creation timestamp (Unix milliseconds).
    pub created_at: u64,
    /// Tombstone timestamp. Defaults to `created_at + RETENTION_MS`.
    pub expires_at: u64,
}

impl MessageRecord {
    /// Create a record for `content` sent by `sender` at `now`.
    ///
    /// The content itself is not stored — only its SHA-256 digest.
    pub fn new(sender: IdentityKey, scope: MessageScope, content: &[u8], now: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            sender,
            scope,
            content_hash: Sha256::digest(content).into(),
            created_at: now,
            expires_at: now + RETENTION_MS,
        }
    }

    /// Whether the record is tombstoned at `now`.
    pub fn is_expired(&self, now: u64) -> bool {
        now > self.expires_at
    }

    /// Extend retention to `days` after creation.
    ///
    /// Measured from `created_at`, not from now — extending an already
    /// expired record by fewer days than its age leaves it expired.
    pub fn extend_retention(&mut self, days: u32) {
        self.expires_at = self.created_at + u64::from(days) * MS_PER_DAY;
    }

    /// Serialize to MessagePack bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, MeritMessageError> {
        rmp_serde::to_vec(self).map_err(Into::into)
    }

    /// Deserialize from MessagePack bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self, MeritMessageError> {
        rmp_serde::from_slice(data).map_err(Into::into)
    }
}
