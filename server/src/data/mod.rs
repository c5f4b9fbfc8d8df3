//! Data storage layer
//!
//! - `sqlite` - Single-file database for projects, sessions and traces
//! - `types` - Row and parameter types shared by repositories
//! - `traits` - Repository traits the domain services depend on
//! - `error` - Unified error type for the data layer

pub mod error;
pub mod sqlite;
pub mod traits;
pub mod types;

pub use error::DataError;
pub use sqlite::SqliteService;
pub use traits::{AnalyticsRepository, ProjectRepository, TraceRepository};
