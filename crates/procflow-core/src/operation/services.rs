//! Data stores behind the left operand handlers
//!
//! Values are addressed by name within a container. Implementations decide
//! how an activity container resolves to its process instance.

use crate::errors::Result;
use crate::operation::context::ContainerType;
use serde_json::Value;
use std::collections::HashMap;

/// Persistent process and activity variables
pub trait DataInstanceService: Send + Sync {
    /// # Errors
    ///
    /// Store failures.
    fn get_value(
        &self,
        name: &str,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<Option<Value>>;

    /// Values of every name that exists; unknown names are left out
    ///
    /// # Errors
    ///
    /// Store failures.
    fn get_values(
        &self,
        names: &[&str],
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<HashMap<String, Value>> {
        let mut values = HashMap::new();
        for name in names {
            if let Some(value) = self.get_value(name, container_id, container_type)? {
                values.insert(name.to_string(), value);
            }
        }
        Ok(values)
    }

    /// # Errors
    ///
    /// Store failures.
    fn update_value(
        &self,
        name: &str,
        value: &Value,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<()>;
}

/// Variables that live for the lifetime of a flow node and are never archived
pub trait TransientDataService: Send + Sync {
    /// # Errors
    ///
    /// Store failures.
    fn get_transient(
        &self,
        name: &str,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<Option<Value>>;

    /// # Errors
    ///
    /// Store failures.
    fn set_transient(
        &self,
        name: &str,
        value: &Value,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<()>;
}

/// Business objects referenced by a container
pub trait BusinessDataService: Send + Sync {
    /// # Errors
    ///
    /// Store failures.
    fn get_business_data(
        &self,
        name: &str,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<Option<Value>>;

    /// Store the object and return it as persisted
    ///
    /// # Errors
    ///
    /// Store failures.
    fn put_business_data(
        &self,
        name: &str,
        value: &Value,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<Value>;

    /// # Errors
    ///
    /// Store failures.
    fn remove_business_data(
        &self,
        name: &str,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<()>;
}

/// Documents and document lists attached to a container
pub trait DocumentService: Send + Sync {
    /// # Errors
    ///
    /// Store failures.
    fn get_document(
        &self,
        name: &str,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<Option<Value>>;

    /// # Errors
    ///
    /// Store failures.
    fn set_document(
        &self,
        name: &str,
        document: &Value,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<()>;

    /// # Errors
    ///
    /// Store failures.
    fn remove_document(&self, name: &str, container_id: i64, container_type: ContainerType)
        -> Result<()>;

    /// # Errors
    ///
    /// Store failures.
    fn get_document_list(
        &self,
        name: &str,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<Option<Vec<Value>>>;

    /// # Errors
    ///
    /// Store failures.
    fn set_document_list(
        &self,
        name: &str,
        documents: &[Value],
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<()>;

    /// # Errors
    ///
    /// Store failures.
    fn remove_document_list(
        &self,
        name: &str,
        container_id: i64,
        container_type: ContainerType,
    ) -> Result<()>;
}
