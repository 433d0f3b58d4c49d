//! The central validator that orchestrates the execution of all validation rules.
use super::error::ValidationError;
use super::rules::{expressions, terms};
use crate::store::Registry;

/// Runs every rule over a loaded project, collecting all failures.
pub struct Validator<'a> {
    registry: &'a Registry,
}

impl<'a> Validator<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// # Returns
    /// - `Ok(())` if no validation errors are found.
    /// - `Err(Vec<ValidationError>)` with every error, species rules first.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        for m in 1..=self.registry.species.len() {
            if let Some(err) = expressions::validate_expressions(self.registry, m) {
                errors.push(err);
            }
        }
        if let Some(err) = terms::validate_terms(self.registry) {
            errors.push(err);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
