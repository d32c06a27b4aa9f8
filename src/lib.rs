//! Metabolic session store - media and model bookkeeping for a metabolic
//! modeling tool service.
//!
//! This library exposes the validation pipeline, the session-scoped resource
//! store, lineage tracking and the HTTP tool handlers, enabling integration
//! tests and embedding behind other transports.

pub mod classify;
pub mod config;
pub mod error;
pub mod external;
pub mod handlers;
pub mod identifiers;
pub mod lineage;
pub mod registry;
pub mod state;
pub mod store;
pub mod validation;

// Re-export key types for convenience
pub use classify::{MediaType, MINIMAL_MEDIA_THRESHOLD};
pub use config::Config;
pub use error::{AppError, ErrorKind, Result};
pub use external::{CompoundDatabase, CompoundLookup, ComputeBackend, OfflineBackend, TemplateCache};
pub use handlers::router;
pub use identifiers::{IdentifierFactory, LineageState, LineageTag};
pub use registry::{Registry, RegistryError};
pub use state::AppState;
pub use store::{ResourceStore, SubStore};
pub use validation::{Pipeline, Verdict, Violation};
