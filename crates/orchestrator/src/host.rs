//! The workflow-host seam.
//!
//! The orchestrator never touches the host's node graph directly; it
//! consumes exactly three queries -- packaging, connection lookup, and
//! resolved-value lookup -- through the [`WorkflowHost`] trait. Context
//! is threaded explicitly; there is no ambient "current workflow"
//! state.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

/// Identifier of a node in the caller's graph.
pub type NodeId = String;

/// A `(node, parameter)` endpoint in the caller's graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParamRef {
    pub node: NodeId,
    pub param: String,
}

impl ParamRef {
    pub fn new(node: impl Into<NodeId>, param: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            param: param.into(),
        }
    }
}

/// Whether a connected node is a plain node or a nested grouping whose
/// boundary must be crossed with one more connection query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Regular,
    Grouping,
}

/// One endpoint returned by a connection query.
#[derive(Debug, Clone)]
pub struct ConnectedParam {
    pub endpoint: ParamRef,
    pub kind: NodeKind,
}

/// Direction of a connection query relative to the queried endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Upstream,
    Downstream,
}

/// Bidirectional link between a synthetic entry/exit parameter name of
/// the packaged unit and the `(node, parameter)` it replaced in the
/// caller's graph.
#[derive(Debug, Clone, Default)]
pub struct ParameterNameMapping {
    entries: Vec<(String, ParamRef)>,
}

impl ParameterNameMapping {
    pub fn insert(&mut self, synthetic: impl Into<String>, original: ParamRef) {
        self.entries.push((synthetic.into(), original));
    }

    /// Original endpoint for a synthetic parameter name.
    pub fn original_for(&self, synthetic: &str) -> Option<&ParamRef> {
        self.entries
            .iter()
            .find(|(name, _)| name == synthetic)
            .map(|(_, original)| original)
    }

    /// Synthetic parameter name for an original endpoint.
    pub fn synthetic_for(&self, original: &ParamRef) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, endpoint)| endpoint == original)
            .map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamRef)> {
        self.entries
            .iter()
            .map(|(name, original)| (name.as_str(), original))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of packaging a set of nodes into a transportable bundle.
#[derive(Debug, Clone)]
pub struct PackagedUnit {
    /// Opaque bundle location on the submitting machine.
    pub bundle_dir: PathBuf,
    /// Identifier of the synthetic entry boundary node.
    pub entry_point_id: String,
    /// Identifier of the synthetic exit boundary node.
    pub exit_point_id: String,
    pub entry_mapping: ParameterNameMapping,
    pub exit_mapping: ParameterNameMapping,
    /// False when the packaged selection contains nothing executable.
    pub has_work: bool,
}

/// Errors from the host integration layer.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Packaging failed: {0}")]
    Packaging(String),

    #[error("Connection query failed: {0}")]
    Connection(String),

    #[error("Resolved-value query failed: {0}")]
    Resolve(String),
}

/// Host queries consumed by the orchestrator.
#[async_trait]
pub trait WorkflowHost: Send + Sync {
    /// Package the given nodes into a transportable bundle under
    /// `staging_dir`, returning its location and the entry/exit
    /// parameter-name mappings.
    async fn package_nodes(
        &self,
        nodes: &[NodeId],
        staging_dir: &Path,
    ) -> Result<PackagedUnit, HostError>;

    /// Direct connections of an endpoint in the given direction.
    fn connections(
        &self,
        at: &ParamRef,
        direction: Direction,
    ) -> Result<Vec<ConnectedParam>, HostError>;

    /// Last-computed output value of an endpoint, if its node has
    /// finished executing.
    fn resolved_value(&self, at: &ParamRef) -> Result<Option<Value>, HostError>;
}
