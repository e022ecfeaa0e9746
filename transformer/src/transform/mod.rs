//! Transformation module.
//!
//! - Projection: source records onto the output schema
//! - Pipeline: read, project, write for one file
//! - Batch: every spreadsheet in a directory

pub mod batch;
pub mod pipeline;
pub mod projection;

pub use batch::{transform_dir, BatchOutcome};
pub use pipeline::*;
pub use projection::{project, project_all, resolve_physician};
