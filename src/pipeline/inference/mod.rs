pub mod client;
pub mod types;

pub use client::*;
pub use types::*;

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("Vision model request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Vision model request failed: {0}")]
    Failed(String),
}
