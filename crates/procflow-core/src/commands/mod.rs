//! Transactional commands
//!
//! Each command is a small use case that runs inside a transaction scope
//! opened by the caller and talks to the collaborators of a
//! [`ServiceAccessor`]. `execute_command` is the single dispatch point.
//!
//! Commands only log at debug level; lifecycle logging belongs to the API
//! layer that opens the transaction.

pub mod execute_flow_node;
pub mod gateway;
pub mod operations;
pub mod state_category;
pub mod task_visibility;

use crate::errors::Result;
use crate::flownode::model::{FlowNodeInstance, GatewayInstance, Session, StateCategory};
use crate::flownode::services::{
    ActivityInstanceService, CommentService, ContractDataService, FlowNodeExecutor,
    FlowNodeInstanceService, GatewayInstanceService, IdentityService,
};
use crate::operation::context::ContainerType;
use crate::operation::engine::OperationExecutionEngine;
use crate::operation::model::Operation;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Collaborators available to commands
#[derive(Clone)]
pub struct ServiceAccessor {
    pub flow_nodes: Arc<dyn FlowNodeInstanceService>,
    pub gateways: Arc<dyn GatewayInstanceService>,
    pub activities: Arc<dyn ActivityInstanceService>,
    pub identity: Arc<dyn IdentityService>,
    pub comments: Arc<dyn CommentService>,
    pub contract_data: Arc<dyn ContractDataService>,
    pub executor: Arc<dyn FlowNodeExecutor>,
    pub operations: Arc<OperationExecutionEngine>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Move a flow node to ABORTING or CANCELLING (or confirm its category)
    SetFlowNodeStateCategory {
        flow_node_id: i64,
        state_category: StateCategory,
    },

    /// Propagate an interruption to every NORMAL direct child of a container
    InterruptChildren {
        parent_container_id: i64,
        state_category: StateCategory,
    },

    CreateGatewayInstance { gateway: GatewayInstance },

    /// Execute a flow node, optionally on behalf of another user
    ExecuteFlowNode {
        /// `None` executes as the session user
        user_id: Option<i64>,
        flow_node_id: i64,
        inputs: HashMap<String, Value>,
    },

    /// All-or-nothing: fails if any task is already hidden
    HideTasks { user_id: i64, task_ids: Vec<i64> },

    UnhideTasks { user_id: i64, task_ids: Vec<i64> },

    ApplyOperations {
        operations: Vec<Operation>,
        container_id: i64,
        container_type: ContainerType,
        input_values: HashMap<String, Value>,
    },
}

impl Command {
    /// Stable name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetFlowNodeStateCategory { .. } => "set_flow_node_state_category",
            Command::InterruptChildren { .. } => "interrupt_children",
            Command::CreateGatewayInstance { .. } => "create_gateway_instance",
            Command::ExecuteFlowNode { .. } => "execute_flow_node",
            Command::HideTasks { .. } => "hide_tasks",
            Command::UnhideTasks { .. } => "unhide_tasks",
            Command::ApplyOperations { .. } => "apply_operations",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandOutcome {
    Done,
    /// The flow node as left by the executor
    FlowNode(FlowNodeInstance),
    /// Ids of the children that were interrupted
    Interrupted(Vec<i64>),
    /// Context values after an operation batch
    Values(HashMap<String, Value>),
}

/// Run one command on behalf of `session`
///
/// # Errors
///
/// The error of the command; nothing is caught here.
pub fn execute_command(
    services: &ServiceAccessor,
    session: &Session,
    command: Command,
) -> Result<CommandOutcome> {
    tracing::debug!(command = command.name(), user_id = session.user_id, "executing command");

    match command {
        Command::SetFlowNodeStateCategory {
            flow_node_id,
            state_category,
        } => {
            state_category::set_flow_node_state_category(
                services.flow_nodes.as_ref(),
                flow_node_id,
                state_category,
            )?;
            Ok(CommandOutcome::Done)
        }
        Command::InterruptChildren {
            parent_container_id,
            state_category,
        } => state_category::interrupt_children(
            services.flow_nodes.as_ref(),
            parent_container_id,
            state_category,
        )
        .map(CommandOutcome::Interrupted),
        Command::CreateGatewayInstance { gateway } => {
            gateway::create_gateway_instance(services.gateways.as_ref(), &gateway)?;
            Ok(CommandOutcome::Done)
        }
        Command::ExecuteFlowNode {
            user_id,
            flow_node_id,
            inputs,
        } => execute_flow_node::execute_flow_node(services, session, user_id, flow_node_id, &inputs)
            .map(CommandOutcome::FlowNode),
        Command::HideTasks { user_id, task_ids } => {
            task_visibility::hide_tasks(services.activities.as_ref(), user_id, &task_ids)?;
            Ok(CommandOutcome::Done)
        }
        Command::UnhideTasks { user_id, task_ids } => {
            task_visibility::unhide_tasks(services.activities.as_ref(), user_id, &task_ids)?;
            Ok(CommandOutcome::Done)
        }
        Command::ApplyOperations {
            operations,
            container_id,
            container_type,
            input_values,
        } => operations::apply_operations(
            services.operations.as_ref(),
            &operations,
            container_id,
            container_type,
            input_values,
        )
        .map(CommandOutcome::Values),
    }
}
