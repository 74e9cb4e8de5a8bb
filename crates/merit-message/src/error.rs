/// Errors for the message container.
///
/// Integrity failures (malformed sealed content) are hard errors — they
/// indicate corrupted or tampered data, never a normal negative outcome.
#[derive(Debug, thiserror::Error)]
pub enum MeritMessageError {
    #[error("invalid sealed content: {reason}")]
    InvalidCiphertext { reason: String },

    #[error("crypto error: {0}")]
    Crypto(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),
}

impl From<rmp_serde::encode::Error> for MeritMessageError {
    fn from(e: rmp_serde::encode::Error) -> Self {
        MeritMessageError::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for MeritMessageError {
    fn from(e: rmp_serde::decode::Error) -> Self {
        MeritMessageError::Deserialization(e.to_string())
    }
}
