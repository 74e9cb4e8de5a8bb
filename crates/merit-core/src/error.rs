/// Errors for the incentive core.
///
/// Admission verdicts are not here — a rejected message is a normal
/// negative outcome returned as a plain `bool`/enum, not an error.
/// These variants cover the conditions a caller must handle explicitly.
#[derive(Debug, thiserror::Error)]
pub enum MeritCoreError {
    #[error("no eligible validators in registry")]
    NoEligibleValidator,

    #[error("stake overdraft: requested {requested}, available {available}")]
    StakeOverdraft { requested: f64, available: f64 },

    #[error("work difficulty {difficulty} exceeds maximum {max}")]
    DifficultyTooHigh { difficulty: u8, max: u8 },

    #[error("no valid nonce found for difficulty {difficulty}")]
    WorkSearchExhausted { difficulty: u8 },
}
