//! Built-in left operand handlers

pub mod business_data;
pub mod data;
pub mod document;
pub mod external;
pub mod transient;

pub use business_data::BusinessDataLeftOperandHandler;
pub use data::DataLeftOperandHandler;
pub use document::{DocumentLeftOperandHandler, DocumentListLeftOperandHandler};
pub use external::ExternalDataLeftOperandHandler;
pub use transient::TransientDataLeftOperandHandler;

use crate::errors::FlowError;
use crate::operation::model::LeftOperand;

pub(crate) fn deletion_unsupported(left_operand: &LeftOperand) -> FlowError {
    FlowError::operation(format!(
        "Deleting a left operand of type {} is not supported ({})",
        left_operand.operand_type(),
        left_operand.name()
    ))
}
