use thiserror::Error;

pub type Result<T> = std::result::Result<T, GpicksError>;

/// Caller-input and persistence failures surfaced by the scoring core and ledger.
///
/// Configuration misses (unknown stat types, archetypes, correlation keys) are
/// never errors; they resolve to the documented table defaults.
#[derive(Debug, Error)]
pub enum GpicksError {
    #[error("slip needs {expected} picks, got {got}")]
    SlipSize { expected: usize, got: usize },

    #[error("unknown pick id {0}")]
    UnknownPick(String),

    #[error("pick id {0} appears more than once")]
    DuplicatePick(String),

    #[error("pool of {got} picks exceeds the limit of {limit} for exhaustive ranking")]
    PoolTooLarge { got: usize, limit: usize },

    #[error("{left_name} has {left} items but {right_name} has {right}")]
    LengthMismatch {
        left_name: &'static str,
        left: usize,
        right_name: &'static str,
        right: usize,
    },

    #[error("insufficient bankroll: stake {stake} > balance {balance}")]
    InsufficientBankroll { stake: f64, balance: f64 },

    #[error("bankroll already initialized with {entries} ledger entries")]
    AlreadyInitialized { entries: usize },

    #[error("bankroll is not initialized")]
    NotInitialized,

    #[error("invalid {field}: {value}")]
    InvalidAmount { field: &'static str, value: f64 },

    #[error("slip {0} has no open bet to grade")]
    NoOpenBet(String),

    #[error("slip {0} was already graded")]
    AlreadyGraded(String),

    #[error("direction must be Over or Under, got {0:?}")]
    InvalidDirection(String),

    #[error("unknown ledger action {0:?}")]
    InvalidAction(String),

    #[error("csv row {row}: field `{field}`: {message}")]
    Csv {
        row: usize,
        field: String,
        message: String,
    },

    #[error("persist ledger: {0}")]
    Persist(#[source] anyhow::Error),
}

impl GpicksError {
    /// True for errors caused by the caller's input rather than the filesystem.
    pub fn is_validation(&self) -> bool {
        !matches!(self, GpicksError::Persist(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_offending_values() {
        let err = GpicksError::SlipSize {
            expected: 3,
            got: 2,
        };
        assert_eq!(err.to_string(), "slip needs 3 picks, got 2");

        let err = GpicksError::InsufficientBankroll {
            stake: 150.0,
            balance: 100.0,
        };
        assert!(err.to_string().contains("150"));
        assert!(err.to_string().contains("100"));
    }

    #[test]
    fn persist_is_not_validation() {
        let err = GpicksError::Persist(anyhow::anyhow!("disk full"));
        assert!(!err.is_validation());
        assert!(GpicksError::NotInitialized.is_validation());
    }
}
