//! Terms must not depend on themselves.

use crate::analysis::topology::{self, TopologyError};
use crate::store::{ObjectType, Registry};
use crate::validation::error::{ValidationError, ValidationErrorType};

pub(crate) fn validate_terms(registry: &Registry) -> Option<ValidationError> {
    match topology::term_order(registry) {
        Err(TopologyError::CircularTerm(id)) => Some(ValidationError {
            object: ObjectType::Term,
            index: registry.terms.iter().position(|t| *t.id == *id).map_or(0, |i| i + 1),
            message: format!("Term '{}' refers to itself through other terms", id),
            object_name: id,
            error_type: ValidationErrorType::CircularTerm,
        }),
        _ => None,
    }
}
