use crate::errors::{FlowError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Store a left operand lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LeftOperandType {
    Data,
    TransientData,
    BusinessData,
    Document,
    DocumentList,
    ExternalData,
}

impl LeftOperandType {
    pub const ALL: [LeftOperandType; 6] = [
        LeftOperandType::Data,
        LeftOperandType::TransientData,
        LeftOperandType::BusinessData,
        LeftOperandType::Document,
        LeftOperandType::DocumentList,
        LeftOperandType::ExternalData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeftOperandType::Data => "DATA",
            LeftOperandType::TransientData => "TRANSIENT_DATA",
            LeftOperandType::BusinessData => "BUSINESS_DATA",
            LeftOperandType::Document => "DOCUMENT",
            LeftOperandType::DocumentList => "DOCUMENT_LIST",
            LeftOperandType::ExternalData => "EXTERNAL_DATA",
        }
    }
}

impl fmt::Display for LeftOperandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeftOperandType {
    type Err = FlowError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| FlowError::InvalidInput {
                reason: format!("unknown left operand type '{}'", s),
            })
    }
}

/// Named target of an operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeftOperand {
    name: String,
    #[serde(rename = "type")]
    operand_type: LeftOperandType,
}

impl LeftOperand {
    pub fn new(name: impl Into<String>, operand_type: LeftOperandType) -> Self {
        Self {
            name: name.into(),
            operand_type,
        }
    }

    pub fn data(name: impl Into<String>) -> Self {
        Self::new(name, LeftOperandType::Data)
    }

    pub fn transient_data(name: impl Into<String>) -> Self {
        Self::new(name, LeftOperandType::TransientData)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn operand_type(&self) -> LeftOperandType {
        self.operand_type
    }
}

impl fmt::Display for LeftOperand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.operand_type, self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperatorType {
    Assignment,
    JavaMethod,
    #[serde(rename = "XPATH_UPDATE")]
    XPathUpdate,
    RecordInList,
    Deletion,
}

impl OperatorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatorType::Assignment => "ASSIGNMENT",
            OperatorType::JavaMethod => "JAVA_METHOD",
            OperatorType::XPathUpdate => "XPATH_UPDATE",
            OperatorType::RecordInList => "RECORD_IN_LIST",
            OperatorType::Deletion => "DELETION",
        }
    }
}

impl fmt::Display for OperatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExpressionKind {
    /// JSON literal held in `content`
    Constant,
    /// Value of the variable named by `content`
    Variable,
    /// Value of the contract input named by `content`
    ContractInput,
    /// Script in some expression language; needs a full interpreter
    Script,
}

/// Right-hand side of an operation, evaluated through an `ExpressionEvaluator`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expression {
    pub name: String,
    pub content: String,
    pub kind: ExpressionKind,
    pub return_type: String,
}

impl Expression {
    pub fn new(
        name: impl Into<String>,
        content: impl Into<String>,
        kind: ExpressionKind,
        return_type: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            kind,
            return_type: return_type.into(),
        }
    }

    /// Constant whose content is a JSON literal
    pub fn constant(content: impl Into<String>) -> Self {
        let content = content.into();
        Self::new(content.clone(), content, ExpressionKind::Constant, "json")
    }

    pub fn variable(name: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(name.clone(), name, ExpressionKind::Variable, "json")
    }
}

/// One mutation instruction; immutable once built
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    left_operand: LeftOperand,
    operator_type: OperatorType,
    operator: Option<String>,
    right_operand: Option<Expression>,
}

impl Operation {
    pub fn new(
        left_operand: LeftOperand,
        operator_type: OperatorType,
        operator: Option<String>,
        right_operand: Option<Expression>,
    ) -> Self {
        Self {
            left_operand,
            operator_type,
            operator,
            right_operand,
        }
    }

    pub fn assign(left_operand: LeftOperand, right_operand: Expression) -> Self {
        Self::new(left_operand, OperatorType::Assignment, None, Some(right_operand))
    }

    pub fn delete(left_operand: LeftOperand) -> Self {
        Self::new(left_operand, OperatorType::Deletion, None, None)
    }

    /// `method` may carry an argument type suffix, e.g. `add:java.lang.Object`
    pub fn java_method(
        left_operand: LeftOperand,
        method: impl Into<String>,
        right_operand: Option<Expression>,
    ) -> Self {
        Self::new(
            left_operand,
            OperatorType::JavaMethod,
            Some(method.into()),
            right_operand,
        )
    }

    pub fn xpath_update(
        left_operand: LeftOperand,
        path: impl Into<String>,
        right_operand: Expression,
    ) -> Self {
        Self::new(
            left_operand,
            OperatorType::XPathUpdate,
            Some(path.into()),
            Some(right_operand),
        )
    }

    pub fn record_in_list(left_operand: LeftOperand, right_operand: Expression) -> Self {
        Self::new(
            left_operand,
            OperatorType::RecordInList,
            None,
            Some(right_operand),
        )
    }

    pub fn left_operand(&self) -> &LeftOperand {
        &self.left_operand
    }

    pub fn operator_type(&self) -> OperatorType {
        self.operator_type
    }

    pub fn operator(&self) -> Option<&str> {
        self.operator.as_deref()
    }

    pub fn right_operand(&self) -> Option<&Expression> {
        self.right_operand.as_ref()
    }
}
