//! Analysis orchestration: one image in, one suggestion out.
//!
//! ```text
//! image ─► InferenceClient ─► detections + OCR fragments
//!                                 │             │
//!                  ObjectCodeResolver    DistanceExtractor + model distance
//!                                 │             │
//!                                 └──► merge · filter · select ─► AnalysisSuggestion
//! ```

pub mod orchestrator;
pub mod selection;

pub use orchestrator::*;
pub use selection::*;

use std::time::Duration;

use thiserror::Error;

use crate::pipeline::inference::InferenceError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("AI analysis is not configured: {0}")]
    Configuration(String),

    #[error("AI analysis timed out after {0:?}. Please try again.")]
    Timeout(Duration),

    #[error("AI analysis failed: {0}")]
    InferenceFailed(String),
}

impl AnalysisError {
    /// Stable tag for callers that branch on the failure type.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Timeout(_) => "timeout",
            Self::InferenceFailed(_) => "inference_failed",
        }
    }
}

impl From<InferenceError> for AnalysisError {
    fn from(e: InferenceError) -> Self {
        match e {
            InferenceError::Timeout(after) => Self::Timeout(after),
            InferenceError::Failed(msg) => Self::InferenceFailed(msg),
        }
    }
}
