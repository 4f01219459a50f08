//! `conferencia-recon`: route conference reconciliation core.
//!
//! Pure crate: a registry of loading routes, the scan classifier that moves
//! shipment ids between pending, verified and off-route sets, the cross-route
//! resolver, and the report shapes used by exports. No filesystem access;
//! the persisted document is produced and consumed as a string.

pub mod engine;
pub mod error;
pub mod import;
pub mod model;
pub mod normalize;
pub mod registry;
pub mod report;
pub mod resolver;
pub mod scan_csv;
pub mod schema;

pub use engine::{check_csv, observe_at, observe_raw_at};
pub use error::ReconError;
pub use import::{ImportReport, RouteImport};
pub use model::{
    BatchSummary, Millis, Observation, ObservationOutcome, RejectReason, Route, RouteSummary,
    ScanSource,
};
pub use normalize::{normalize, normalize_list};
pub use registry::{CsvBatch, Registry};
pub use report::ExportZone;
pub use schema::STORAGE_KEY;
