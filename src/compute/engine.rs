use crate::analysis::topology::{self, TopologyError};
use crate::compute::kernel;
use crate::compute::ledger::{ComputationError, Ledger};
use crate::compute::linker::{HydVar, Layout, VarRef};
use crate::store::{ExprClass, Registry};

/// Where parameter values are read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    /// Project-wide parameter values.
    Global,
    /// Local overrides of a link (1-based).
    Link(usize),
    /// Local overrides of a tank (1-based).
    Tank(usize),
}

/// Evaluates compiled chemistry for one state snapshot.
///
/// Terms are evaluated in dependency order into the ledger, then pipe and tank
/// expressions read from it.
pub struct Engine<'a> {
    registry: &'a Registry,
    layout: Layout,
    order: Vec<usize>,
}

impl<'a> Engine<'a> {
    pub fn new(registry: &'a Registry) -> Result<Self, ComputationError> {
        let order = topology::term_order(registry).map_err(|e| match e {
            TopologyError::CircularTerm(id) => ComputationError::CycleDetected(id),
            other => ComputationError::Mismatch { msg: other.to_string() },
        })?;
        Ok(Self { registry, layout: registry.layout(), order })
    }

    /// Term indices in evaluation order.
    pub fn order(&self) -> &[usize] { &self.order }

    /// Loads species concentrations (1-based), parameters for `location`,
    /// constants and hydraulic variables into the ledger.
    pub fn bind(
        &self,
        ledger: &mut Ledger,
        location: Location,
        conc: &[f64],
        hyd: &[f64; HydVar::COUNT],
    ) -> Result<(), ComputationError> {
        // 1. Shape checks
        if conc.len() < self.layout.species + 1 {
            return Err(ComputationError::Mismatch {
                msg: format!("Expected {} concentrations, got {}", self.layout.species, conc.len().saturating_sub(1)),
            });
        }
        if ledger.layout() != self.layout {
            ledger.ensure_layout(self.layout);
        }

        // 2. Parameter source
        let local: Option<&[f64]> = match location {
            Location::Global => None,
            Location::Link(k) => Some(self.registry.link(k).ok_or_else(|| mismatch("link", k))?.param.as_slice()),
            Location::Tank(j) => Some(self.registry.tank(j).ok_or_else(|| mismatch("tank", j))?.param.as_slice()),
        };

        // 3. Fill
        for m in 1..=self.layout.species {
            ledger.insert(VarRef::Species(m), conc[m]);
        }
        for (i, p) in self.registry.params.iter().enumerate() {
            let value = match local {
                Some(values) => values.get(i + 1).copied().unwrap_or(0.0),
                None => p.value,
            };
            ledger.insert(VarRef::Parameter(i + 1), value);
        }
        for (i, c) in self.registry.consts.iter().enumerate() {
            ledger.insert(VarRef::Constant(i + 1), c.value);
        }
        ledger.set_hydraulics(hyd);
        ledger.invalidate_terms();
        Ok(())
    }

    /// Evaluates every term in dependency order, storing each result.
    pub fn run_terms(&self, ledger: &mut Ledger) -> Result<(), ComputationError> {
        for &t in &self.order {
            let term = self.registry.term(t).ok_or_else(|| mismatch("term", t))?;
            let value = kernel::evaluate(&term.expr, |code| ledger.get_code(code));
            if !value.is_finite() {
                return Err(ComputationError::MathError(term.id.to_string()));
            }
            ledger.insert(VarRef::Term(t), value);
        }
        Ok(())
    }

    /// Evaluates a species' pipe or tank expression against a bound ledger.
    pub fn evaluate(&self, species: usize, class: ExprClass, ledger: &Ledger) -> Result<f64, ComputationError> {
        let s = self.registry.species_at(species).ok_or_else(|| mismatch("species", species))?;
        let expr = self.registry.expression(species, class).ok_or_else(|| ComputationError::Mismatch {
            msg: format!("Species '{}' has no {:?} expression", s.id, class),
        })?;
        let value = kernel::evaluate(expr, |code| ledger.get_code(code));
        if !value.is_finite() {
            return Err(ComputationError::MathError(s.id.to_string()));
        }
        Ok(value)
    }
}

fn mismatch(what: &str, index: usize) -> ComputationError {
    ComputationError::Mismatch { msg: format!("No {} with index {}", what, index) }
}
