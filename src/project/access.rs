//! Index and ID lookups, getters, setters and one-shot evaluation.
//!
//! Getters need an open project but not an open quality axis, so a transport
//! engine can read the model while it holds it.

use super::{check_id, Project};
use crate::analysis::TelemetryReport;
use crate::compute::engine::{Engine, Location};
use crate::compute::ledger::Ledger;
use crate::compute::linker::{HydVar, VarRef};
use crate::display::trace;
use crate::error::{MsxError, Result};
use crate::store::{ExprClass, Insertion, ObjectType, Source, Species};

pub use crate::error::error_message;

impl Project {
    // --- Symbol level ---

    /// Registers a name without creating an object. A later add of the same
    /// type claims the name when it lands on the registered index.
    pub fn add_object(&mut self, ty: ObjectType, id: &str) -> Result<Insertion> {
        self.require_open()?;
        check_id(id)?;
        self.symbols.try_reserve(ty, 1)?;
        Ok(self.symbols.insert(ty, id))
    }

    /// Symbol-level lookup, including names registered through `add_object`.
    pub fn find_object(&self, ty: ObjectType, id: &str) -> Option<usize> {
        self.symbols.find(ty, id)
    }

    pub fn find_id(&self, ty: ObjectType, index: usize) -> Option<&str> {
        self.symbols.id_of(ty, index).map(|s| &**s)
    }

    // --- Names and counts ---

    pub fn get_index(&self, ty: ObjectType, id: &str) -> Result<usize> {
        self.require_open()?;
        match ty {
            ObjectType::Species
            | ObjectType::Constant
            | ObjectType::Parameter
            | ObjectType::Pattern
            | ObjectType::Node
            | ObjectType::Link => self
                .symbols
                .find(ty, id)
                .filter(|&i| i <= self.registry.count(ty))
                .ok_or_else(|| MsxError::UndefinedObjectId(id.to_string())),
            _ => Err(MsxError::InvalidObjectType),
        }
    }

    pub fn get_id(&self, ty: ObjectType, index: usize) -> Result<&str> {
        self.require_open()?;
        let id = match ty {
            ObjectType::Species => self.registry.species_at(index).map(|s| &s.id),
            ObjectType::Constant => self.registry.constant(index).map(|c| &c.id),
            ObjectType::Parameter => self.registry.param(index).map(|p| &p.id),
            ObjectType::Pattern => self.registry.pattern(index).map(|p| &p.id),
            _ => return Err(MsxError::InvalidObjectType),
        };
        id.map(|s| &**s).ok_or(MsxError::InvalidObjectIndex(index))
    }

    /// Length in bytes of an object's ID.
    pub fn get_id_len(&self, ty: ObjectType, index: usize) -> Result<usize> {
        self.get_id(ty, index).map(str::len)
    }

    pub fn get_count(&self, ty: ObjectType) -> Result<usize> {
        self.require_open()?;
        Ok(self.registry.count(ty))
    }

    // --- Getters ---

    pub fn get_species(&self, index: usize) -> Result<&Species> {
        self.require_open()?;
        self.registry.species_at(index).ok_or(MsxError::InvalidObjectIndex(index))
    }

    pub fn get_constant(&self, index: usize) -> Result<f64> {
        self.require_open()?;
        self.registry.constant(index).map(|c| c.value).ok_or(MsxError::InvalidObjectIndex(index))
    }

    /// Local value of parameter `param` at a link, or at the tank behind a
    /// node. A junction node reads 0.0.
    pub fn get_parameter(&self, ty: ObjectType, index: usize, param: usize) -> Result<f64> {
        self.require_open()?;
        let values = self.local_parameters(ty, index, param)?;
        Ok(values.map(|v| v[param]).unwrap_or(0.0))
    }

    /// The source of `species` at `node`, if any.
    pub fn get_source(&self, node: usize, species: usize) -> Result<Option<Source>> {
        self.require_open()?;
        let n = self.registry.node(node).ok_or(MsxError::InvalidObjectIndex(node))?;
        if species < 1 || species > self.registry.species.len() {
            return Err(MsxError::InvalidObjectIndex(species));
        }
        Ok(crate::store::source::find(&n.sources, species).copied())
    }

    pub fn get_pattern_len(&self, pattern: usize) -> Result<usize> {
        self.require_open()?;
        self.registry.pattern(pattern).map(|p| p.len()).ok_or(MsxError::InvalidObjectIndex(pattern))
    }

    /// Multiplier for a 1-based period; 0.0 past the end. Moves the pattern
    /// cursor.
    pub fn get_pattern_value(&mut self, pattern: usize, period: i64) -> Result<f64> {
        self.require_open()?;
        self.registry
            .pattern_mut(pattern)
            .map(|p| p.value_at(period))
            .ok_or(MsxError::InvalidObjectIndex(pattern))
    }

    pub fn get_init_qual(&self, ty: ObjectType, index: usize, species: usize) -> Result<f64> {
        self.require_open()?;
        self.check_species_index(species)?;
        match ty {
            ObjectType::Node => Ok(self.registry.node(index).ok_or(MsxError::InvalidObjectIndex(index))?.c0[species]),
            ObjectType::Link => Ok(self.registry.link(index).ok_or(MsxError::InvalidObjectIndex(index))?.c0[species]),
            _ => Err(MsxError::InvalidObjectType),
        }
    }

    /// Current concentration at a node (read from its tank, if it has one)
    /// or a link.
    pub fn get_quality_by_index(&self, ty: ObjectType, index: usize, species: usize) -> Result<f64> {
        self.require_open()?;
        self.check_species_index(species)?;
        match ty {
            ObjectType::Node => {
                let n = self.registry.node(index).ok_or(MsxError::InvalidObjectIndex(index))?;
                Ok(match self.registry.tank(n.tank) {
                    Some(t) => t.c[species],
                    None => n.c[species],
                })
            }
            ObjectType::Link => Ok(self.registry.link(index).ok_or(MsxError::InvalidObjectIndex(index))?.c[species]),
            _ => Err(MsxError::InvalidObjectType),
        }
    }

    pub fn get_quality_by_id(&self, ty: ObjectType, id: &str, species: &str) -> Result<f64> {
        self.require_open()?;
        if !matches!(ty, ObjectType::Node | ObjectType::Link) {
            return Err(MsxError::InvalidObjectType);
        }
        let index = self.get_index(ty, id)?;
        let m = self.get_index(ObjectType::Species, species)?;
        self.get_quality_by_index(ty, index, m)
    }

    // --- Setters ---

    pub fn set_constant(&mut self, index: usize, value: f64) -> Result<()> {
        self.require_open()?;
        self.registry.constant_mut(index).ok_or(MsxError::InvalidObjectIndex(index))?.value = value;
        Ok(())
    }

    /// Sets a local parameter value at a link, or at the tank behind a node.
    /// Setting one on a junction node does nothing.
    pub fn set_parameter(&mut self, ty: ObjectType, index: usize, param: usize, value: f64) -> Result<()> {
        self.require_open()?;
        self.local_parameters(ty, index, param)?;
        let values = match ty {
            ObjectType::Node => {
                let tank = self.registry.node(index).map(|n| n.tank).unwrap_or(0);
                self.registry.tank_mut(tank).map(|t| &mut t.param)
            }
            _ => self.registry.link_mut(index).map(|l| &mut l.param),
        };
        if let Some(values) = values {
            values[param] = value;
        }
        Ok(())
    }

    /// Sets an initial concentration. Nodes only accept bulk species; a wall
    /// species at a node is left unchanged.
    pub fn set_init_qual(&mut self, ty: ObjectType, index: usize, species: usize, value: f64) -> Result<()> {
        self.require_open()?;
        self.check_species_index(species)?;
        match ty {
            ObjectType::Node => {
                let bulk = self.species_kind(species)? == crate::store::SpeciesKind::Bulk;
                let n = self.registry.node_mut(index).ok_or(MsxError::InvalidObjectIndex(index))?;
                if bulk {
                    n.c0[species] = value;
                }
            }
            ObjectType::Link => {
                self.registry.link_mut(index).ok_or(MsxError::InvalidObjectIndex(index))?.c0[species] = value;
            }
            _ => return Err(MsxError::InvalidObjectType),
        }
        Ok(())
    }

    // --- Evaluation ---

    /// Value of a term for the given concentrations (1-based, slot 0
    /// unused), with project-wide parameters and zero hydraulics.
    pub fn evaluate_term(&self, term: usize, conc: &[f64]) -> Result<f64> {
        self.require_open()?;
        if self.registry.term(term).is_none() {
            return Err(MsxError::InvalidObjectIndex(term));
        }
        let engine = Engine::new(&self.registry)?;
        let mut ledger = Ledger::new(self.registry.layout());
        engine.bind(&mut ledger, Location::Global, conc, &[0.0; HydVar::COUNT])?;
        engine.run_terms(&mut ledger)?;
        Ok(ledger.get(VarRef::Term(term)))
    }

    /// Value of a species' pipe or tank expression at `location`.
    pub fn evaluate_expression(
        &self,
        species: usize,
        class: ExprClass,
        location: Location,
        conc: &[f64],
        hyd: &[f64; HydVar::COUNT],
    ) -> Result<f64> {
        self.require_open()?;
        self.check_species_index(species)?;
        let engine = Engine::new(&self.registry)?;
        let mut ledger = Ledger::new(self.registry.layout());
        engine.bind(&mut ledger, location, conc, hyd)?;
        engine.run_terms(&mut ledger)?;
        Ok(engine.evaluate(species, class, &ledger)?)
    }

    // --- Diagnostics ---

    /// Equation text of a species' pipe or tank expression, rendered from
    /// the compiled form. `None` when the side has no expression.
    pub fn get_expression_text(&self, species: usize, class: ExprClass) -> Result<Option<String>> {
        self.require_open()?;
        self.check_species_index(species)?;
        Ok(self.registry.expression(species, class).map(|e| trace::expression_text(&self.registry, e)))
    }

    /// Dependency tree of a term, down to species, coefficients and
    /// hydraulic variables.
    pub fn term_trace(&self, term: usize) -> Result<String> {
        self.require_open()?;
        if self.registry.term(term).is_none() {
            return Err(MsxError::InvalidObjectIndex(term));
        }
        Ok(trace::format_term_trace(&self.registry, term))
    }

    /// Dependency tree of a species' pipe or tank expression.
    pub fn species_trace(&self, species: usize, class: ExprClass) -> Result<String> {
        self.require_open()?;
        self.check_species_index(species)?;
        Ok(trace::format_species_trace(&self.registry, species, class))
    }

    pub fn telemetry(&self) -> TelemetryReport {
        TelemetryReport::analyze(&self.registry)
    }

    // --- Helpers ---

    fn check_species_index(&self, species: usize) -> Result<()> {
        if species < 1 || species > self.registry.species.len() {
            return Err(MsxError::InvalidObjectIndex(species));
        }
        Ok(())
    }

    /// Checks `ty`, `index` and `param`, returning the local parameter vector
    /// (`None` for a junction node).
    fn local_parameters(&self, ty: ObjectType, index: usize, param: usize) -> Result<Option<&[f64]>> {
        let values = match ty {
            ObjectType::Node => {
                let n = self.registry.node(index).ok_or(MsxError::InvalidObjectIndex(index))?;
                self.registry.tank(n.tank).map(|t| t.param.as_slice())
            }
            ObjectType::Link => {
                Some(self.registry.link(index).ok_or(MsxError::InvalidObjectIndex(index))?.param.as_slice())
            }
            _ => return Err(MsxError::InvalidObjectType),
        };
        if param < 1 || param > self.registry.params.len() {
            return Err(MsxError::InvalidObjectIndex(param));
        }
        Ok(values)
    }
}
