//! Pure computation shared by the taskfan workspace.
//!
//! Item normalization and parameter merging for multi-task fan-out,
//! host-requirement construction, and worker-path translation. No I/O
//! and no async -- everything here is deterministic and unit-testable.

pub mod error;
pub mod fanout;
pub mod host_requirements;
pub mod path_translate;

pub use error::CoreError;
