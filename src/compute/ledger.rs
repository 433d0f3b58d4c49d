use super::linker::{HydVar, Layout, VarRef};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComputationError {
    #[error("Math error: {0}")]
    MathError(String),
    #[error("Structural mismatch: {msg}")]
    Mismatch { msg: String },
    #[error("Cycle detected involving term '{0}'")]
    CycleDetected(String),
}

/// Dense variable values indexed by variable code (slot 0 unused).
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    layout: Layout,
    values: Vec<f64>,
}

impl Ledger {
    pub fn new(layout: Layout) -> Self {
        Self { layout, values: vec![0.0; layout.total() + 1] }
    }

    pub fn layout(&self) -> Layout { self.layout }

    /// Re-sizes for a new layout, zeroing every slot.
    pub fn ensure_layout(&mut self, layout: Layout) {
        self.layout = layout;
        self.values.clear();
        self.values.resize(layout.total() + 1, 0.0);
    }

    #[inline(always)]
    pub fn get_code(&self, code: u32) -> f64 {
        self.values.get(code as usize).copied().unwrap_or(0.0)
    }

    pub fn get(&self, var: VarRef) -> f64 {
        self.get_code(self.layout.encode(var))
    }

    pub fn insert(&mut self, var: VarRef, value: f64) {
        let code = self.layout.encode(var) as usize;
        if let Some(slot) = self.values.get_mut(code) {
            *slot = value;
        }
    }

    pub fn set_hydraulics(&mut self, hyd: &[f64; HydVar::COUNT]) {
        for h in HydVar::ALL {
            self.insert(VarRef::Hydraulic(h), hyd[h.index()]);
        }
    }

    /// Zeroes every term slot so stale results cannot leak into a new pass.
    pub fn invalidate_terms(&mut self) {
        for i in 1..=self.layout.terms {
            self.insert(VarRef::Term(i), 0.0);
        }
    }

    pub fn as_slice(&self) -> &[f64] { &self.values }
}
