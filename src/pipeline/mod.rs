//! Observation field extraction pipeline.
//!
//! `analysis::AnalysisOrchestrator` is the entry point; the other modules
//! are its stages.

pub mod analysis;
pub mod distance;
pub mod inference;
pub mod object_code;
