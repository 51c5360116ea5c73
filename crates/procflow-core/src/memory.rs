//! In-memory process store
//!
//! One object implementing every collaborator trait of the core, for the
//! in-memory runtime and for tests. Writes are applied immediately: the store
//! does not enlist in transactions, so a rollback does not undo them.
//!
//! Values are keyed by the exact `(container_id, container_type)` pair they
//! were written under.

use crate::errors::{FlowError, Result};
use crate::flownode::model::{
    Comment, FlowNodeInstance, GatewayInstance, HiddenTask, StateCategory, User,
};
use crate::flownode::services::{
    ActivityInstanceService, CommentService, ContractDataService, FlowNodeExecutor,
    FlowNodeInstanceService, GatewayInstanceService, IdentityService,
};
use crate::operation::context::ContainerType;
use crate::operation::services::{
    BusinessDataService, DataInstanceService, DocumentService, TransientDataService,
};
use crate::transaction::lock::{LockHandle, LockService};
use chrono::Utc;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

type SlotKey = (i64, ContainerType, String);

fn slot(name: &str, container_id: i64, container_type: ContainerType) -> SlotKey {
    (container_id, container_type, name.to_string())
}

/// Who ran a flow node through [`FlowNodeExecutor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Execution {
    pub flow_node_id: i64,
    pub executer_user_id: i64,
    pub session_user_id: i64,
}

#[derive(Default)]
struct State {
    data: HashMap<SlotKey, Value>,
    transient: HashMap<SlotKey, Value>,
    business_data: HashMap<SlotKey, Value>,
    documents: HashMap<SlotKey, Value>,
    document_lists: HashMap<SlotKey, Vec<Value>>,
    next_business_id: i64,
    flow_nodes: BTreeMap<i64, FlowNodeInstance>,
    gateways: BTreeMap<i64, GatewayInstance>,
    hidden: BTreeMap<(i64, i64), HiddenTask>,
    users: HashMap<i64, User>,
    comments: Vec<Comment>,
    contract_data: HashMap<(i64, String), Value>,
    executions: Vec<Execution>,
    locks: HashMap<(i64, String), String>,
}

#[derive(Default)]
pub struct InMemoryProcessStore {
    state: Mutex<State>,
}

impl InMemoryProcessStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_flow_node(&self, flow_node: FlowNodeInstance) {
        self.state().flow_nodes.insert(flow_node.id, flow_node);
    }

    pub fn add_user(&self, user: User) {
        self.state().users.insert(user.id, user);
    }

    /// Flow nodes executed so far, in order
    pub fn executions(&self) -> Vec<Execution> {
        self.state().executions.clone()
    }

    pub fn is_locked(&self, object_id: i64, object_type: &str) -> bool {
        self.state()
            .locks
            .contains_key(&(object_id, object_type.to_string()))
    }
}

impl DataInstanceService for InMemoryProcessStore {
    fn get_value(
        &self,
        name: &str,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<Option<Value>> {
        Ok(self
            .state()
            .data
            .get(&slot(name, container_id, container_type))
            .cloned())
    }

    fn update_value(
        &self,
        name: &str,
        value: &Value,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<()> {
        self.state()
            .data
            .insert(slot(name, container_id, container_type), value.clone());
        Ok(())
    }
}

impl TransientDataService for InMemoryProcessStore {
    fn get_transient(
        &self,
        name: &str,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<Option<Value>> {
        Ok(self
            .state()
            .transient
            .get(&slot(name, container_id, container_type))
            .cloned())
    }

    fn set_transient(
        &self,
        name: &str,
        value: &Value,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<()> {
        self.state()
            .transient
            .insert(slot(name, container_id, container_type), value.clone());
        Ok(())
    }
}

impl BusinessDataService for InMemoryProcessStore {
    fn get_business_data(
        &self,
        name: &str,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<Option<Value>> {
        Ok(self
            .state()
            .business_data
            .get(&slot(name, container_id, container_type))
            .cloned())
    }

    /// Objects get a `persistenceId` on first write
    fn put_business_data(
        &self,
        name: &str,
        value: &Value,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<Value> {
        let mut state = self.state();
        let mut stored = value.clone();
        if let Value::Object(fields) = &mut stored {
            if !fields.contains_key("persistenceId") {
                state.next_business_id += 1;
                fields.insert("persistenceId".to_string(), Value::from(state.next_business_id));
            }
        }
        state
            .business_data
            .insert(slot(name, container_id, container_type), stored.clone());
        Ok(stored)
    }

    fn remove_business_data(
        &self,
        name: &str,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<()> {
        self.state()
            .business_data
            .remove(&slot(name, container_id, container_type));
        Ok(())
    }
}

impl DocumentService for InMemoryProcessStore {
    fn get_document(
        &self,
        name: &str,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<Option<Value>> {
        Ok(self
            .state()
            .documents
            .get(&slot(name, container_id, container_type))
            .cloned())
    }

    fn set_document(
        &self,
        name: &str,
        document: &Value,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<()> {
        let mut stored = Map::new();
        stored.insert("name".to_string(), Value::from(name));
        if let Value::Object(fields) = document {
            stored.extend(fields.clone());
        }
        self.state()
            .documents
            .insert(slot(name, container_id, container_type), Value::Object(stored));
        Ok(())
    }

    fn remove_document(
        &self,
        name: &str,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<()> {
        self.state()
            .documents
            .remove(&slot(name, container_id, container_type));
        Ok(())
    }

    fn get_document_list(
        &self,
        name: &str,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<Option<Vec<Value>>> {
        Ok(self
            .state()
            .document_lists
            .get(&slot(name, container_id, container_type))
            .cloned())
    }

    fn set_document_list(
        &self,
        name: &str,
        documents: &[Value],
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<()> {
        self.state()
            .document_lists
            .insert(slot(name, container_id, container_type), documents.to_vec());
        Ok(())
    }

    fn remove_document_list(
        &self,
        name: &str,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<()> {
        self.state()
            .document_lists
            .remove(&slot(name, container_id, container_type));
        Ok(())
    }
}

impl FlowNodeInstanceService for InMemoryProcessStore {
    fn get_flow_node_instance(&self, flow_node_id: i64) -> Result<FlowNodeInstance> {
        self.state()
            .flow_nodes
            .get(&flow_node_id)
            .cloned()
            .ok_or(FlowError::FlowNodeNotFound { flow_node_id })
    }

    fn set_state_category(
        &self,
        flow_node: &FlowNodeInstance,
        state_category: StateCategory,
    ) -> Result<()> {
        let mut state = self.state();
        let stored = state
            .flow_nodes
            .get_mut(&flow_node.id)
            .ok_or(FlowError::FlowNodeNotFound {
                flow_node_id: flow_node.id,
            })?;
        if !stored.state_category.can_transition_to(state_category) {
            return Err(FlowError::InvalidStateTransition {
                flow_node_id: flow_node.id,
                from: stored.state_category.to_string(),
                to: state_category.to_string(),
            });
        }
        stored.state_category = state_category;
        if let Some(gateway) = state.gateways.get_mut(&flow_node.id) {
            gateway.flow_node.state_category = state_category;
        }
        Ok(())
    }

    fn get_direct_children(&self, parent_container_id: i64) -> Result<Vec<FlowNodeInstance>> {
        Ok(self
            .state()
            .flow_nodes
            .values()
            .filter(|node| {
                node.parent_container_id == parent_container_id && node.id != parent_container_id
            })
            .cloned()
            .collect())
    }
}

impl GatewayInstanceService for InMemoryProcessStore {
    fn create_gateway_instance(&self, gateway: &GatewayInstance) -> Result<()> {
        let mut state = self.state();
        if state.gateways.contains_key(&gateway.id()) {
            return Err(FlowError::Persistence {
                op: "create_gateway_instance".to_string(),
                message: format!("gateway {} already exists", gateway.id()),
            });
        }
        state
            .flow_nodes
            .insert(gateway.id(), gateway.flow_node.clone());
        state.gateways.insert(gateway.id(), gateway.clone());
        Ok(())
    }

    fn get_gateway_instance(&self, gateway_id: i64) -> Result<GatewayInstance> {
        self.state()
            .gateways
            .get(&gateway_id)
            .cloned()
            .ok_or(FlowError::FlowNodeNotFound {
                flow_node_id: gateway_id,
            })
    }
}

impl ActivityInstanceService for InMemoryProcessStore {
    fn is_task_hidden(&self, user_id: i64, task_id: i64) -> Result<bool> {
        Ok(self.state().hidden.contains_key(&(user_id, task_id)))
    }

    fn hide_tasks(&self, user_id: i64, task_ids: &[i64]) -> Result<()> {
        let hidden_at = Utc::now();
        let mut state = self.state();
        for &task_id in task_ids {
            state.hidden.entry((user_id, task_id)).or_insert(HiddenTask {
                user_id,
                task_id,
                hidden_at,
            });
        }
        Ok(())
    }

    fn unhide_tasks(&self, user_id: i64, task_ids: &[i64]) -> Result<()> {
        let mut state = self.state();
        for &task_id in task_ids {
            state.hidden.remove(&(user_id, task_id));
        }
        Ok(())
    }

    fn hidden_tasks(&self, user_id: i64) -> Result<Vec<HiddenTask>> {
        Ok(self
            .state()
            .hidden
            .range((user_id, i64::MIN)..=(user_id, i64::MAX))
            .map(|(_, task)| task.clone())
            .collect())
    }
}

impl IdentityService for InMemoryProcessStore {
    fn get_user(&self, user_id: i64) -> Result<User> {
        self.state()
            .users
            .get(&user_id)
            .cloned()
            .ok_or(FlowError::UserNotFound { user_id })
    }
}

impl CommentService for InMemoryProcessStore {
    fn add_system_comment(&self, process_instance_id: i64, content: &str) -> Result<Comment> {
        let comment = Comment {
            process_instance_id,
            user_id: None,
            content: content.to_string(),
            posted_at: Utc::now(),
        };
        self.state().comments.push(comment.clone());
        Ok(comment)
    }

    fn comments(&self, process_instance_id: i64) -> Result<Vec<Comment>> {
        Ok(self
            .state()
            .comments
            .iter()
            .filter(|c| c.process_instance_id == process_instance_id)
            .cloned()
            .collect())
    }
}

impl ContractDataService for InMemoryProcessStore {
    fn add_user_task_data(&self, user_task_id: i64, inputs: &HashMap<String, Value>) -> Result<()> {
        let mut state = self.state();
        for (name, value) in inputs {
            state
                .contract_data
                .insert((user_task_id, name.clone()), value.clone());
        }
        Ok(())
    }

    fn get_user_task_data(&self, user_task_id: i64, name: &str) -> Result<Option<Value>> {
        Ok(self
            .state()
            .contract_data
            .get(&(user_task_id, name.to_string()))
            .cloned())
    }
}

/// Moves the node one state forward; interrupted nodes are refused
impl FlowNodeExecutor for InMemoryProcessStore {
    fn execute_flow_node(
        &self,
        flow_node: &FlowNodeInstance,
        executer_user_id: i64,
        session_user_id: i64,
    ) -> Result<FlowNodeInstance> {
        let mut state = self.state();
        let stored = state
            .flow_nodes
            .get_mut(&flow_node.id)
            .ok_or(FlowError::FlowNodeNotFound {
                flow_node_id: flow_node.id,
            })?;
        if stored.state_category.is_interrupting() {
            return Err(FlowError::InvalidStateTransition {
                flow_node_id: flow_node.id,
                from: stored.state_category.to_string(),
                to: "EXECUTING".to_string(),
            });
        }
        stored.state_id += 1;
        let executed = stored.clone();
        state.executions.push(Execution {
            flow_node_id: flow_node.id,
            executer_user_id,
            session_user_id,
        });
        Ok(executed)
    }
}

impl LockService for InMemoryProcessStore {
    fn lock(&self, object_id: i64, object_type: &str, owner: &str) -> Result<LockHandle> {
        let mut state = self.state();
        let key = (object_id, object_type.to_string());
        if let Some(holder) = state.locks.get(&key) {
            return Err(FlowError::Lock {
                object_id,
                object_type: object_type.to_string(),
                reason: format!("held by {}", holder),
            });
        }
        state.locks.insert(key, owner.to_string());
        Ok(LockHandle {
            object_id,
            object_type: object_type.to_string(),
            owner: owner.to_string(),
        })
    }

    fn unlock(&self, handle: &LockHandle) -> Result<()> {
        let mut state = self.state();
        let key = (handle.object_id, handle.object_type.clone());
        match state.locks.get(&key) {
            Some(holder) if *holder == handle.owner => {
                state.locks.remove(&key);
                Ok(())
            }
            Some(holder) => Err(FlowError::Lock {
                object_id: handle.object_id,
                object_type: handle.object_type.clone(),
                reason: format!("held by {}, not {}", holder, handle.owner),
            }),
            None => Err(FlowError::Lock {
                object_id: handle.object_id,
                object_type: handle.object_type.clone(),
                reason: "not locked".to_string(),
            }),
        }
    }
}
