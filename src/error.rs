use thiserror::Error;

/// Failures of the indicator engine and metrics calculator.
///
/// The computations are pure; these errors describe input that cannot be
/// turned into a result. They are surfaced to the caller, never logged here.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("series contains no bars")]
    NoData,

    #[error("insufficient history: need at least {required} bars, got {actual}")]
    InsufficientHistory { required: usize, actual: usize },

    #[error("bar {index} has a missing or invalid {field} price")]
    InsufficientField { index: usize, field: &'static str },

    #[error("bar {index} is not strictly after the previous bar")]
    UnorderedSeries { index: usize },
}
