//! Numerical backends: reconstruction, gapfilling and flux balance analysis.
//!
//! Calls are synchronous and may take minutes. Handlers run them on the
//! blocking pool with a timeout and never while holding a store lock.

use crate::error::{AppError, Result};
use crate::external::Template;
use crate::store::{MediaRecord, ModelRecord, ModelSummary};
use crate::validation::GenomeSource;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub genome: GenomeSource,
    pub template: Arc<Template>,
}

#[derive(Debug, Clone)]
pub struct GapfillRequest {
    pub model: Arc<ModelRecord>,
    pub media: Arc<MediaRecord>,
}

#[derive(Debug, Clone)]
pub struct GapfillOutcome {
    pub summary: ModelSummary,
    pub reactions_added: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FbaRequest {
    pub model: Arc<ModelRecord>,
    pub media: Arc<MediaRecord>,
    pub objective: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FbaOutcome {
    pub status: String,
    pub objective_value: f64,
}

pub trait ComputeBackend: Send + Sync {
    fn build_model(&self, request: &BuildRequest) -> Result<ModelSummary>;

    fn gapfill(&self, request: &GapfillRequest) -> Result<GapfillOutcome>;

    fn run_fba(&self, request: &FbaRequest) -> Result<FbaOutcome>;
}

/// Backend used when no solver is attached to this process.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineBackend;

impl OfflineBackend {
    fn unavailable(service: &'static str) -> AppError {
        AppError::ExternalService {
            service,
            message: "no compute backend is attached to this service".to_string(),
            retryable: false,
        }
    }
}

impl ComputeBackend for OfflineBackend {
    fn build_model(&self, _request: &BuildRequest) -> Result<ModelSummary> {
        Err(Self::unavailable("reconstruction"))
    }

    fn gapfill(&self, _request: &GapfillRequest) -> Result<GapfillOutcome> {
        Err(Self::unavailable("gapfilling"))
    }

    fn run_fba(&self, _request: &FbaRequest) -> Result<FbaOutcome> {
        Err(Self::unavailable("flux balance analysis"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_offline_backend_reports_external_failure() {
        let request = BuildRequest {
            genome: GenomeSource::FastaPath("genome.faa".into()),
            template: Arc::new(Template::new("Core", ["c0"], 1)),
        };

        let err = OfflineBackend.build_model(&request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalService);
        assert!(matches!(err, AppError::ExternalService { retryable: false, .. }));
    }
}
