use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Interruption signal carried by every flow node
///
/// Flow nodes start `Normal`. `Aborting` and `Cancelling` are one-way: once
/// set, only the surrounding engine moves the node further (to archive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StateCategory {
    #[default]
    Normal,
    Aborting,
    Cancelling,
}

impl StateCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateCategory::Normal => "NORMAL",
            StateCategory::Aborting => "ABORTING",
            StateCategory::Cancelling => "CANCELLING",
        }
    }

    /// Setting the current category again is allowed
    pub fn can_transition_to(self, to: StateCategory) -> bool {
        self == to || self == StateCategory::Normal
    }

    pub fn is_interrupting(self) -> bool {
        self != StateCategory::Normal
    }
}

impl fmt::Display for StateCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowNodeKind {
    UserTask,
    ManualTask,
    AutomaticTask,
    ReceiveTask,
    SendTask,
    CallActivity,
    SubProcessActivity,
    MultiInstanceActivity,
    LoopActivity,
    Gateway,
    StartEvent,
    IntermediateCatchEvent,
    IntermediateThrowEvent,
    BoundaryEvent,
    EndEvent,
}

/// Runtime instance of a flow node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowNodeInstance {
    pub id: i64,
    pub name: String,
    pub display_name: Option<String>,
    pub kind: FlowNodeKind,
    pub state_id: i32,
    pub state_category: StateCategory,
    pub parent_container_id: i64,
    pub parent_process_instance_id: i64,
    pub root_process_instance_id: i64,
}

impl FlowNodeInstance {
    /// New node directly under a process instance
    pub fn new(
        id: i64,
        name: impl Into<String>,
        kind: FlowNodeKind,
        process_instance_id: i64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            display_name: None,
            kind,
            state_id: 0,
            state_category: StateCategory::Normal,
            parent_container_id: process_instance_id,
            parent_process_instance_id: process_instance_id,
            root_process_instance_id: process_instance_id,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Nest the node under another flow node (multi-instance body, sub-task)
    pub fn with_parent_container(mut self, parent_container_id: i64) -> Self {
        self.parent_container_id = parent_container_id;
        self
    }

    /// Name shown to users; falls back to the technical name
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GatewayType {
    Exclusive,
    Inclusive,
    Parallel,
}

/// Gateway flow node plus its join bookkeeping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayInstance {
    pub flow_node: FlowNodeInstance,
    pub gateway_type: GatewayType,
    /// Incoming transitions that already reached the gateway
    pub hit_bys: Vec<String>,
}

impl GatewayInstance {
    pub fn new(flow_node: FlowNodeInstance, gateway_type: GatewayType) -> Self {
        Self {
            flow_node,
            gateway_type,
            hit_bys: Vec::new(),
        }
    }

    pub fn id(&self) -> i64 {
        self.flow_node.id
    }

    pub fn hit_by(&mut self, transition: impl Into<String>) {
        let transition = transition.into();
        if !self.hit_bys.contains(&transition) {
            self.hit_bys.push(transition);
        }
    }

    /// Whether every one of `incoming` has hit the gateway
    pub fn is_merged(&self, incoming: &[&str]) -> bool {
        match self.gateway_type {
            GatewayType::Exclusive => !self.hit_bys.is_empty(),
            GatewayType::Inclusive | GatewayType::Parallel => incoming
                .iter()
                .all(|t| self.hit_bys.iter().any(|hit| hit == t)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiddenTask {
    pub user_id: i64,
    pub task_id: i64,
    pub hidden_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub user_name: String,
}

/// Identity of the caller of an API request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: i64,
    pub user_name: String,
    pub tenant_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub process_instance_id: i64,
    /// `None` for system comments
    pub user_id: Option<i64>,
    pub content: String,
    pub posted_at: DateTime<Utc>,
}
