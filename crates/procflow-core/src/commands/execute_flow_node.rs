use crate::commands::ServiceAccessor;
use crate::errors::Result;
use crate::flownode::model::{FlowNodeInstance, FlowNodeKind, Session};
use serde_json::Value;
use std::collections::HashMap;

/// Execute a flow node as `user_id`, or as the session user when `None`
///
/// Contract inputs of a user task are stored before execution. When the
/// executor differs from the session user, a system comment records the
/// delegation on the node's process instance.
///
/// # Errors
///
/// Lookup, contract storage and execution errors, unchanged.
pub fn execute_flow_node(
    services: &ServiceAccessor,
    session: &Session,
    user_id: Option<i64>,
    flow_node_id: i64,
    inputs: &HashMap<String, Value>,
) -> Result<FlowNodeInstance> {
    let executer_user_id = user_id.unwrap_or(session.user_id);
    let flow_node = services.flow_nodes.get_flow_node_instance(flow_node_id)?;

    if flow_node.kind == FlowNodeKind::UserTask {
        services.contract_data.add_user_task_data(flow_node.id, inputs)?;
    }

    let executed = services
        .executor
        .execute_flow_node(&flow_node, executer_user_id, session.user_id)?;

    if executer_user_id != session.user_id {
        add_delegation_comment(services, session, &flow_node, executer_user_id)?;
    }
    Ok(executed)
}

fn add_delegation_comment(
    services: &ServiceAccessor,
    session: &Session,
    flow_node: &FlowNodeInstance,
    executer_user_id: i64,
) -> Result<()> {
    let executer = services.identity.get_user(executer_user_id)?;
    let content = format!(
        "The user {} acting as delegate of the user {} has done the task \"{}\".",
        session.user_name,
        executer.user_name,
        flow_node.label()
    );
    services
        .comments
        .add_system_comment(flow_node.parent_process_instance_id, &content)?;
    Ok(())
}
