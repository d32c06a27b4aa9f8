//! Input validation for tool calls.
//!
//! Every tool runs its raw input through a [`Pipeline`] before touching the
//! store. Pipelines collect all violations in rule registration order, so a
//! caller sees the full list of problems in one response.

pub mod media;
pub mod model;
pub mod pipeline;
pub mod rules;

pub use media::{validate_media, MediaInput, DEFAULT_UPPER_BOUND, DEFAULT_UPTAKE};
pub use model::{
    validate_analysis, validate_build, AnalysisInput, BuildModelInput, BuildPlan, GenomeSource,
};
pub use pipeline::{Pipeline, Report, Verdict, Violation};
pub use rules::{exactly_one, Entries, OneOf, Presence};
