//! Read-only handles and backends this service consumes but does not own.

pub mod compounds;
pub mod compute;
pub mod templates;

pub use compounds::{CompoundDatabase, CompoundInfo, CompoundLookup};
pub use compute::{
    BuildRequest, ComputeBackend, FbaOutcome, FbaRequest, GapfillOutcome, GapfillRequest,
    OfflineBackend,
};
pub use templates::{Template, TemplateCache};
