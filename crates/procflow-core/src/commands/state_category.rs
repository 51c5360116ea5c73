use crate::errors::{FlowError, Result};
use crate::flownode::model::StateCategory;
use crate::flownode::services::FlowNodeInstanceService;

/// Idempotent: setting the current category again succeeds
///
/// # Errors
///
/// `FlowNodeNotFound`, or `InvalidStateTransition` from the service.
pub fn set_flow_node_state_category(
    flow_nodes: &dyn FlowNodeInstanceService,
    flow_node_id: i64,
    state_category: StateCategory,
) -> Result<()> {
    let flow_node = flow_nodes.get_flow_node_instance(flow_node_id)?;
    tracing::debug!(
        flow_node_id,
        from = %flow_node.state_category,
        to = %state_category,
        "setting state category"
    );
    flow_nodes.set_state_category(&flow_node, state_category)
}

/// Interrupt every NORMAL direct child of a container
///
/// Children already aborting or cancelling are left alone. Grandchildren are
/// reached when the surrounding engine processes each interrupted child.
///
/// # Errors
///
/// `InvalidInput` when asked to propagate `NORMAL`, otherwise service errors.
pub fn interrupt_children(
    flow_nodes: &dyn FlowNodeInstanceService,
    parent_container_id: i64,
    state_category: StateCategory,
) -> Result<Vec<i64>> {
    if !state_category.is_interrupting() {
        return Err(FlowError::InvalidInput {
            reason: "NORMAL is not an interruption".to_string(),
        });
    }

    let mut interrupted = Vec::new();
    for child in flow_nodes.get_direct_children(parent_container_id)? {
        if child.state_category != StateCategory::Normal {
            continue;
        }
        flow_nodes.set_state_category(&child, state_category)?;
        interrupted.push(child.id);
    }

    tracing::debug!(
        parent_container_id,
        state_category = %state_category,
        count = interrupted.len(),
        "children interrupted"
    );
    Ok(interrupted)
}
