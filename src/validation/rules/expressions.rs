//! Every species needs a pipe expression; bulk species also need a tank one.

use crate::store::{ExprClass, ObjectType, Registry, SpeciesKind};
use crate::validation::error::{ValidationError, ValidationErrorType};

pub(crate) fn validate_expressions(registry: &Registry, species: usize) -> Option<ValidationError> {
    let s = registry.species_at(species)?;
    let error = |error_type, side: &str| ValidationError {
        object: ObjectType::Species,
        index: species,
        object_name: s.id.to_string(),
        error_type,
        message: format!("Species '{}' has no {} expression", s.id, side),
    };

    if registry.expression(species, ExprClass::Pipe).is_none() {
        return Some(error(ValidationErrorType::MissingPipeExpression, "pipe"));
    }
    if s.kind == SpeciesKind::Bulk && registry.expression(species, ExprClass::Tank).is_none() {
        return Some(error(ValidationErrorType::MissingTankExpression, "tank"));
    }
    None
}
