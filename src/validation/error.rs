//! Defines the error types for the validation module.
use crate::store::ObjectType;

/// The specific category of a validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorType {
    /// A species has no pipe expression.
    MissingPipeExpression,
    /// A bulk species has no tank expression.
    MissingTankExpression,
    /// A term references itself through other terms.
    CircularTerm,
}

/// A structured error report from the pre-run checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub object: ObjectType,
    /// 1-based index of the offending object.
    pub index: usize,
    pub object_name: String,
    pub error_type: ValidationErrorType,
    /// A human-readable message explaining the error.
    pub message: String,
}
