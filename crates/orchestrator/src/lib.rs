//! Multi-task job orchestration.
//!
//! Fans one parametrized unit of work out across N input items,
//! submits the batch as a single farm job, polls it to a terminal
//! state, and reassembles per-task results with worker paths rewritten
//! to caller-local ones. The farm service and the workflow host are
//! both consumed through trait seams ([`taskfan_farm::FarmClient`],
//! [`host::WorkflowHost`]); this crate owns only the orchestration.

pub mod bundle;
pub mod collect;
pub mod fanout;
pub mod host;
pub mod publish;

pub use host::{ParameterNameMapping, ParamRef, WorkflowHost};
pub use publish::{MultiTaskPublisher, PublishConfig, PublishError};
