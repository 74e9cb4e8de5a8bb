//! Merit message container.
//!
//! The thin collaborator the incentive core consumes: message records
//! with content hashes and retention windows, identity addresses, and
//! AEAD-sealed payloads.
//!
//! Wire format: MessagePack (compact binary).
//! Crypto: SHA-256 content hashing + XChaCha20-Poly1305 sealing.

pub mod error;
pub mod identity;
pub mod record;
pub mod sealed;

pub use error::MeritMessageError;
pub use identity::IdentityKey;
pub use record::{now_ms, MessageRecord, MessageScope, RETENTION_MS};
pub use sealed::{open, seal, SealedContent};
