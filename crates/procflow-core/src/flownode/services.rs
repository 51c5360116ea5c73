//! Collaborator traits used by the transactional commands
//!
//! Implementations run inside the caller's transaction; none of them opens or
//! ends one.

use crate::errors::Result;
use crate::flownode::model::{
    Comment, FlowNodeInstance, GatewayInstance, HiddenTask, StateCategory, User,
};
use serde_json::Value;
use std::collections::HashMap;

pub trait FlowNodeInstanceService: Send + Sync {
    /// # Errors
    ///
    /// `FlowNodeNotFound` for an unknown id.
    fn get_flow_node_instance(&self, flow_node_id: i64) -> Result<FlowNodeInstance>;

    /// # Errors
    ///
    /// `InvalidStateTransition` when the node already left `NORMAL` for
    /// another category.
    fn set_state_category(
        &self,
        flow_node: &FlowNodeInstance,
        state_category: StateCategory,
    ) -> Result<()>;

    /// Flow nodes whose parent container is `parent_container_id`, by id
    ///
    /// # Errors
    ///
    /// Store failures.
    fn get_direct_children(&self, parent_container_id: i64) -> Result<Vec<FlowNodeInstance>>;
}

pub trait GatewayInstanceService: Send + Sync {
    /// # Errors
    ///
    /// Store failures.
    fn create_gateway_instance(&self, gateway: &GatewayInstance) -> Result<()>;

    /// # Errors
    ///
    /// `FlowNodeNotFound` for an unknown id.
    fn get_gateway_instance(&self, gateway_id: i64) -> Result<GatewayInstance>;
}

/// Per-user task visibility
pub trait ActivityInstanceService: Send + Sync {
    /// # Errors
    ///
    /// Store failures.
    fn is_task_hidden(&self, user_id: i64, task_id: i64) -> Result<bool>;

    /// # Errors
    ///
    /// Store failures.
    fn hide_tasks(&self, user_id: i64, task_ids: &[i64]) -> Result<()>;

    /// Ids that are not hidden are ignored
    ///
    /// # Errors
    ///
    /// Store failures.
    fn unhide_tasks(&self, user_id: i64, task_ids: &[i64]) -> Result<()>;

    /// # Errors
    ///
    /// Store failures.
    fn hidden_tasks(&self, user_id: i64) -> Result<Vec<HiddenTask>>;
}

pub trait IdentityService: Send + Sync {
    /// # Errors
    ///
    /// `UserNotFound` for an unknown id.
    fn get_user(&self, user_id: i64) -> Result<User>;
}

pub trait CommentService: Send + Sync {
    /// Post a comment not attributed to any user
    ///
    /// # Errors
    ///
    /// Store failures.
    fn add_system_comment(&self, process_instance_id: i64, content: &str) -> Result<Comment>;

    /// # Errors
    ///
    /// Store failures.
    fn comments(&self, process_instance_id: i64) -> Result<Vec<Comment>>;
}

/// Contract inputs submitted with a user task
pub trait ContractDataService: Send + Sync {
    /// # Errors
    ///
    /// Store failures.
    fn add_user_task_data(&self, user_task_id: i64, inputs: &HashMap<String, Value>)
        -> Result<()>;

    /// # Errors
    ///
    /// Store failures.
    fn get_user_task_data(&self, user_task_id: i64, name: &str) -> Result<Option<Value>>;
}

/// The shared flow node execution pipeline
pub trait FlowNodeExecutor: Send + Sync {
    /// Execute the node on behalf of `executer_user_id`, as requested by
    /// `session_user_id`
    ///
    /// # Errors
    ///
    /// Whatever the execution pipeline reports.
    fn execute_flow_node(
        &self,
        flow_node: &FlowNodeInstance,
        executer_user_id: i64,
        session_user_id: i64,
    ) -> Result<FlowNodeInstance>;
}
