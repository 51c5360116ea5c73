use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;

/// Kind of object that owns the data an operation batch touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContainerType {
    ProcessInstance,
    ActivityInstance,
    MessageInstance,
}

impl ContainerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerType::ProcessInstance => "PROCESS_INSTANCE",
            ContainerType::ActivityInstance => "ACTIVITY_INSTANCE",
            ContainerType::MessageInstance => "MESSAGE_INSTANCE",
        }
    }
}

impl fmt::Display for ContainerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of evaluating an expression
///
/// Only `Data` can be stored. `Opaque` stands for a value the evaluator
/// produced but could not serialize; it carries the value's type name.
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluatedValue {
    Data(Value),
    Opaque(String),
}

impl From<Value> for EvaluatedValue {
    fn from(value: Value) -> Self {
        EvaluatedValue::Data(value)
    }
}

/// Values visible to expressions while an operation batch runs
///
/// `input_values` is both the read cache filled by handler loaders and the
/// staging area each operation writes its computed value into.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionContext {
    container_id: i64,
    container_type: ContainerType,
    input_values: HashMap<String, Value>,
}

impl ExecutionContext {
    pub fn new(container_id: i64, container_type: ContainerType) -> Self {
        Self {
            container_id,
            container_type,
            input_values: HashMap::new(),
        }
    }

    pub fn with_input_values(mut self, values: HashMap<String, Value>) -> Self {
        self.input_values.extend(values);
        self
    }

    pub fn container_id(&self) -> i64 {
        self.container_id
    }

    pub fn container_type(&self) -> ContainerType {
        self.container_type
    }

    /// Whether the context was built for this container
    pub fn belongs_to(&self, container_id: i64, container_type: ContainerType) -> bool {
        self.container_id == container_id && self.container_type == container_type
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.input_values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.input_values.contains_key(name)
    }

    pub fn put(&mut self, name: impl Into<String>, value: Value) {
        self.input_values.insert(name.into(), value);
    }

    /// Loader entry point: never replaces a value already staged
    pub fn put_if_absent(&mut self, name: impl Into<String>, value: Value) {
        self.input_values.entry(name.into()).or_insert(value);
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.input_values.remove(name)
    }

    pub fn input_values(&self) -> &HashMap<String, Value> {
        &self.input_values
    }
}
