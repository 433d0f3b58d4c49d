//! Species, coefficients, terms, expressions, options and patterns.
//!
//! Adding a species, term, parameter or constant shifts variable codes, so
//! each of those adds follows the same sequence: validate, reserve every
//! buffer that grows, verify the relink, then register, patch and append.

use super::{check_reserved, Claim, Project};
use crate::compute::bytecode::compile;
use crate::compute::linker::ProjectResolver;
use crate::error::{MsxError, Result};
use crate::options::OptionType;
use crate::store::{
    Coefficient, ExprBinding, ExprClass, ExprKind, MassUnits, ObjectType, Species, SpeciesKind, Term,
};

impl Project {
    /// Adds a species. Every node, link and tank gets a zeroed concentration
    /// slot for it. Returns the species index.
    pub fn add_species(&mut self, id: &str, kind: SpeciesKind, units: MassUnits, a_tol: f64, r_tol: f64) -> Result<usize> {
        self.require_mutable()?;
        let claim = self.claim_chemistry_id(ObjectType::Species, id)?;
        self.symbols.try_reserve(ObjectType::Species, 1)?;
        self.registry.reserve_species()?;
        let relink = self.planned_relink(ObjectType::Species)?;

        self.register(ObjectType::Species, &claim);
        relink.run(&mut self.registry)?;
        Ok(self.registry.commit_species(Species::new(claim.key, kind, units, a_tol, r_tol)))
    }

    /// Adds a parameter or a constant. Returns its index within its type.
    pub fn add_coefficient(&mut self, ty: ObjectType, id: &str, value: f64) -> Result<usize> {
        self.require_mutable()?;
        if !matches!(ty, ObjectType::Parameter | ObjectType::Constant) {
            return Err(MsxError::Keyword(ty.label().to_string()));
        }
        let claim = self.claim_chemistry_id(ty, id)?;
        self.symbols.try_reserve(ty, 1)?;
        match ty {
            ObjectType::Parameter => self.registry.reserve_parameter()?,
            _ => self.registry.reserve_constant()?,
        }
        let relink = self.planned_relink(ty)?;

        self.register(ty, &claim);
        relink.run(&mut self.registry)?;
        let coefficient = Coefficient { id: claim.key, value };
        Ok(match ty {
            ObjectType::Parameter => self.registry.commit_parameter(coefficient),
            _ => self.registry.commit_constant(coefficient),
        })
    }

    /// Adds a named intermediate expression. The equation may reference
    /// species, earlier terms, parameters, constants and hydraulic variables.
    /// On a compile failure nothing is registered.
    pub fn add_term(&mut self, id: &str, equation: &str) -> Result<usize> {
        self.require_mutable()?;
        let claim = self.claim_chemistry_id(ObjectType::Term, id)?;
        self.symbols.try_reserve(ObjectType::Term, 1)?;
        self.registry.reserve_term()?;
        let relink = self.planned_relink(ObjectType::Term)?;

        // Compiled against the layout that already counts this term.
        let expr = compile(equation, &ProjectResolver::new(&self.symbols, relink.new))?;

        self.register(ObjectType::Term, &claim);
        relink.run(&mut self.registry)?;
        Ok(self.registry.commit_term(Term { id: claim.key, equation: equation.to_string(), expr }))
    }

    /// Attaches a pipe (`class` = Link) or tank (`class` = Tank) expression
    /// to a species.
    pub fn add_expression(&mut self, class: ObjectType, kind: ExprKind, species: &str, equation: &str) -> Result<()> {
        self.require_mutable()?;
        if kind == ExprKind::None {
            return Err(MsxError::Keyword(format!("{:?}", kind)));
        }
        let m = self.find_required(ObjectType::Species, species)?;
        let class = ExprClass::from_object_code(class as i32)
            .ok_or_else(|| MsxError::InvalidObjectParams(format!("{} cannot own an expression", class.label())))?;
        let binding = self
            .registry
            .species_at(m)
            .map(|s| s.binding(class))
            .ok_or(MsxError::InvalidObjectIndex(m))?;
        if binding.is_set() {
            return Err(MsxError::DuplicateExpression(species.to_string()));
        }

        let expr = compile(equation, &ProjectResolver::new(&self.symbols, self.registry.layout()))?;
        let s = self.registry.species_mut(m).ok_or(MsxError::InvalidObjectIndex(m))?;
        let bound = ExprBinding::Owned { kind, expr };
        match class {
            ExprClass::Pipe => s.pipe = bound,
            ExprClass::Tank => s.tank = bound,
        }
        Ok(())
    }

    pub fn add_option(&mut self, option: OptionType, value: &str) -> Result<()> {
        self.require_mutable()?;
        self.options.apply(option, value)
    }

    /// Adds an empty time pattern. Returns its index.
    pub fn add_pattern(&mut self, id: &str) -> Result<usize> {
        self.require_open()?;
        let claim = self.claim_id(ObjectType::Pattern, id)?;
        self.symbols.try_reserve(ObjectType::Pattern, 1)?;

        let index = self.registry.push_pattern(claim.key.clone())?;
        self.register(ObjectType::Pattern, &claim);
        Ok(index)
    }

    /// Replaces a pattern's multipliers and rewinds it.
    pub fn set_pattern(&mut self, pattern: usize, multipliers: &[f64]) -> Result<()> {
        self.require_open()?;
        let mut values = Vec::new();
        values.try_reserve_exact(multipliers.len())?;
        values.extend_from_slice(multipliers);
        self.registry
            .pattern_mut(pattern)
            .ok_or(MsxError::InvalidObjectIndex(pattern))?
            .set_values(values);
        Ok(())
    }

    /// Overwrites one multiplier (1-based `period`).
    pub fn set_pattern_value(&mut self, pattern: usize, period: i64, value: f64) -> Result<()> {
        self.require_open()?;
        let pat = self.registry.pattern_mut(pattern).ok_or(MsxError::InvalidObjectIndex(pattern))?;
        if !pat.set_value_at(period, value) {
            return Err(MsxError::InvalidObjectParams(format!("period {} outside pattern '{}'", period, pat.id)));
        }
        Ok(())
    }

    fn claim_chemistry_id(&self, ty: ObjectType, id: &str) -> Result<Claim> {
        let claim = self.claim_id(ty, id)?;
        check_reserved(id)?;
        Ok(claim)
    }
}
