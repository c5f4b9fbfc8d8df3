//! SQLite repositories
//!
//! Types (ProjectRow, TraceRow, etc.) should be imported from `crate::data::types`.

pub mod analytics;
pub mod project;
pub mod trace;

pub use project::{create_project, project_id_for_key_hash};
pub use trace::{get_trace, insert_batch, list_traces, session_traces};
