//! Parameter fan-out planning over the workflow-host graph.
//!
//! For every entry-point parameter of the packaged unit, inspect what
//! feeds it in the caller's graph: the publisher's own "current item"
//! output marks the parameter that varies per task, and any
//! already-resolved producer outside the batch contributes a constant
//! value shared by all tasks. Graph lookups are best effort -- a
//! failed query skips that parameter and fan-out proceeds.

use serde_json::Value;
use taskfan_core::fanout::{merge_constants, ParameterSet};

use crate::host::{
    ConnectedParam, Direction, NodeId, NodeKind, ParamRef, ParameterNameMapping, WorkflowHost,
};

/// Where the publisher sits in the caller's graph, and which nodes are
/// inside the batch (their values come from task execution, never from
/// constant lookup).
pub struct FanoutContext<'a> {
    pub host: &'a dyn WorkflowHost,
    /// The orchestrator's own node in the caller's graph.
    pub publisher_node: &'a str,
    /// Name of the publisher output carrying the current item.
    pub item_output: &'a str,
    pub batch_nodes: &'a [NodeId],
}

/// The computed fan-out: which entry parameter receives the per-task
/// item, and the constants merged into every task.
#[derive(Debug, Default)]
pub struct FanoutPlan {
    pub item_parameter: Option<String>,
    pub constants: ParameterSet,
}

/// Inspect the entry-point mapping and classify each parameter's
/// upstream source.
pub fn plan_fanout(ctx: &FanoutContext<'_>, entry_mapping: &ParameterNameMapping) -> FanoutPlan {
    let mut plan = FanoutPlan::default();

    for (synthetic, original) in entry_mapping.iter() {
        let connections = match ctx.host.connections(original, Direction::Upstream) {
            Ok(connections) => connections,
            Err(e) => {
                tracing::warn!(
                    parameter = synthetic,
                    error = %e,
                    "Skipping entry parameter; connection query failed",
                );
                continue;
            }
        };

        for connection in connections {
            let Some(source) = resolve_source(ctx, connection) else {
                continue;
            };

            if source.node == ctx.publisher_node && source.param == ctx.item_output {
                plan.item_parameter = Some(synthetic.to_string());
            } else if !ctx.batch_nodes.contains(&source.node) {
                collect_constant(ctx, synthetic, &source, &mut plan.constants);
            }
        }
    }

    plan
}

/// Build one parameter set per task: the item value under the fan-out
/// parameter, then the shared constants (per-task keys win).
pub fn build_task_parameters(plan: &FanoutPlan, items: &[Value]) -> Vec<ParameterSet> {
    items
        .iter()
        .map(|item| {
            let mut params = ParameterSet::new();
            if let Some(name) = &plan.item_parameter {
                params.insert(name.clone(), item.clone());
            }
            merge_constants(&mut params, &plan.constants);
            params
        })
        .collect()
}

/// Resolve a connection endpoint to its real source, following at most
/// one indirection through a nested grouping. Deeper nesting is an
/// explicit unsupported case.
fn resolve_source(ctx: &FanoutContext<'_>, connection: ConnectedParam) -> Option<ParamRef> {
    match connection.kind {
        NodeKind::Regular => Some(connection.endpoint),
        NodeKind::Grouping => {
            let inner = match ctx.host.connections(&connection.endpoint, Direction::Upstream) {
                Ok(inner) => inner,
                Err(e) => {
                    tracing::warn!(
                        node = %connection.endpoint.node,
                        error = %e,
                        "Skipping grouping; inner connection query failed",
                    );
                    return None;
                }
            };
            match inner.into_iter().next() {
                Some(inner) if inner.kind == NodeKind::Regular => Some(inner.endpoint),
                Some(inner) => {
                    tracing::warn!(
                        node = %inner.endpoint.node,
                        "Groupings nested deeper than one level are not supported; skipping",
                    );
                    None
                }
                None => None,
            }
        }
    }
}

/// Fetch a resolved upstream value, logging and skipping on any miss.
fn collect_constant(
    ctx: &FanoutContext<'_>,
    synthetic: &str,
    source: &ParamRef,
    constants: &mut ParameterSet,
) {
    match ctx.host.resolved_value(source) {
        Ok(Some(value)) => {
            constants.insert(synthetic.to_string(), value);
        }
        Ok(None) => {
            tracing::debug!(
                parameter = synthetic,
                node = %source.node,
                "Upstream producer has no resolved value yet; skipping constant",
            );
        }
        Err(e) => {
            tracing::warn!(
                parameter = synthetic,
                node = %source.node,
                error = %e,
                "Resolved-value query failed; skipping constant",
            );
        }
    }
}
