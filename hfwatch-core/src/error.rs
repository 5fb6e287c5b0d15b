//! Structural input errors
//!
//! Only caller contract violations surface as errors. Noisy or malformed
//! symptom values are recovered inside the pipeline and reported through
//! result flags and reasons instead.

use thiserror::Error;

/// A check-in, baseline or history that does not have the expected shape
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("{what} must be a JSON object")]
    NotAnObject { what: &'static str },

    #[error(
        "history sequences differ in length: {categories} categories, \
         {scores} normalized scores, {pressures} symptom pressures"
    )]
    HistoryLengthMismatch {
        categories: usize,
        scores: usize,
        pressures: usize,
    },

    #[error("history level series for {symptom} has {found} entries, expected {expected}")]
    HistorySymptomLengthMismatch {
        symptom: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("history {series}[{index}] is not a finite number")]
    NonFiniteHistoryValue { series: &'static str, index: usize },

    #[error("history has an invalid shape: {0}")]
    InvalidHistory(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClassifyError>;
