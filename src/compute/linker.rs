//! Variable codes and the relink pass.
//!
//! Codes form one positional space, 1-based:
//!
//! ```text
//! species | terms | parameters | constants | hydraulic (9)
//! ```
//!
//! Appending to any category shifts every code after it. `Relink` moves
//! already-compiled tapes from the old layout to the new one.

use thiserror::Error;

use super::bytecode::{MathExpr, VariableResolver};
use crate::store::{ObjectType, Registry, SymbolTable};

/// Built-in hydraulic variables, in code order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HydVar {
    Diameter,
    Flow,
    Velocity,
    Reynolds,
    ShearVelocity,
    Friction,
    AreaPerVolume,
    RoughnessCoeff,
    Length,
}

impl HydVar {
    pub const COUNT: usize = 9;
    pub const ALL: [HydVar; 9] = [
        HydVar::Diameter,
        HydVar::Flow,
        HydVar::Velocity,
        HydVar::Reynolds,
        HydVar::ShearVelocity,
        HydVar::Friction,
        HydVar::AreaPerVolume,
        HydVar::RoughnessCoeff,
        HydVar::Length,
    ];
    const NAMES: [&'static str; 9] = ["D", "Q", "U", "Re", "Us", "Ff", "Av", "Kc", "Len"];

    /// Case-insensitive name lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMES
            .iter()
            .position(|n| n.eq_ignore_ascii_case(name))
            .map(|i| Self::ALL[i])
    }

    pub fn name(&self) -> &'static str {
        Self::NAMES[*self as usize]
    }

    #[inline(always)]
    pub fn index(&self) -> usize { *self as usize }
}

/// Names reserved for hydraulic variables may not be used by chemistry objects.
pub fn is_reserved_name(name: &str) -> bool {
    HydVar::from_name(name).is_some()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarRef {
    Species(usize),
    Term(usize),
    Parameter(usize),
    Constant(usize),
    Hydraulic(HydVar),
}

/// Object counts that determine the code space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Layout {
    pub species: usize,
    pub terms: usize,
    pub params: usize,
    pub consts: usize,
}

impl Layout {
    #[inline(always)]
    fn term_base(&self) -> usize { self.species }
    #[inline(always)]
    fn param_base(&self) -> usize { self.species + self.terms }
    #[inline(always)]
    fn const_base(&self) -> usize { self.param_base() + self.params }
    #[inline(always)]
    fn hyd_base(&self) -> usize { self.const_base() + self.consts }

    /// Highest valid code.
    pub fn total(&self) -> usize { self.hyd_base() + HydVar::COUNT }

    pub fn encode(&self, var: VarRef) -> u32 {
        let code = match var {
            VarRef::Species(i) => i,
            VarRef::Term(i) => self.term_base() + i,
            VarRef::Parameter(i) => self.param_base() + i,
            VarRef::Constant(i) => self.const_base() + i,
            VarRef::Hydraulic(h) => self.hyd_base() + h.index() + 1,
        };
        code as u32
    }

    pub fn decode(&self, code: u32) -> Option<VarRef> {
        let c = code as usize;
        if c == 0 || c > self.total() {
            None
        } else if c <= self.term_base() {
            Some(VarRef::Species(c))
        } else if c <= self.param_base() {
            Some(VarRef::Term(c - self.term_base()))
        } else if c <= self.const_base() {
            Some(VarRef::Parameter(c - self.param_base()))
        } else if c <= self.hyd_base() {
            Some(VarRef::Constant(c - self.const_base()))
        } else {
            Some(VarRef::Hydraulic(HydVar::ALL[c - self.hyd_base() - 1]))
        }
    }

    /// The layout after appending one object of `ty`.
    pub fn grown(&self, ty: ObjectType) -> Option<Layout> {
        let mut next = *self;
        match ty {
            ObjectType::Species => next.species += 1,
            ObjectType::Term => next.terms += 1,
            ObjectType::Parameter => next.params += 1,
            ObjectType::Constant => next.consts += 1,
            _ => return None,
        }
        Some(next)
    }
}

/// Resolves identifiers against a project's symbols: species, then terms,
/// parameters, constants, and finally hydraulic variable names.
pub struct ProjectResolver<'a> {
    symbols: &'a SymbolTable,
    layout: Layout,
}

impl<'a> ProjectResolver<'a> {
    pub fn new(symbols: &'a SymbolTable, layout: Layout) -> Self {
        Self { symbols, layout }
    }

    pub fn lookup(&self, name: &str) -> Option<VarRef> {
        let find = |ty| self.symbols.find(ty, name);
        if let Some(i) = find(ObjectType::Species).filter(|&i| i <= self.layout.species) {
            return Some(VarRef::Species(i));
        }
        if let Some(i) = find(ObjectType::Term).filter(|&i| i <= self.layout.terms) {
            return Some(VarRef::Term(i));
        }
        if let Some(i) = find(ObjectType::Parameter).filter(|&i| i <= self.layout.params) {
            return Some(VarRef::Parameter(i));
        }
        if let Some(i) = find(ObjectType::Constant).filter(|&i| i <= self.layout.consts) {
            return Some(VarRef::Constant(i));
        }
        HydVar::from_name(name).map(VarRef::Hydraulic)
    }
}

impl VariableResolver for ProjectResolver<'_> {
    fn resolve(&self, name: &str) -> Option<u32> {
        self.lookup(name).map(|v| self.layout.encode(v))
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RelinkError {
    #[error("variable code {code} is outside the current layout (max {max})")]
    Dangling { code: u32, max: usize },
}

/// Moves compiled tapes from one layout to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relink {
    pub old: Layout,
    pub new: Layout,
}

impl Relink {
    pub fn new(old: Layout, new: Layout) -> Self {
        Self { old, new }
    }

    #[inline]
    fn map(&self, code: u32) -> Option<u32> {
        self.old.decode(code).map(|v| self.new.encode(v))
    }

    /// Checks that every code in every tape decodes under the old layout.
    /// Nothing is modified.
    pub fn verify<'e>(&self, exprs: impl IntoIterator<Item = &'e MathExpr>) -> Result<(), RelinkError> {
        for expr in exprs {
            for code in expr.variables() {
                if self.old.decode(code).is_none() {
                    return Err(RelinkError::Dangling { code, max: self.old.total() });
                }
            }
        }
        Ok(())
    }

    /// Rewrites every code in place. Call only after `verify` succeeded.
    pub fn apply_to(&self, expr: &mut MathExpr) {
        for code in expr.variables_mut() {
            if let Some(next) = self.map(*code) {
                *code = next;
            }
        }
    }

    /// Verifies then patches every owned tape in the registry.
    pub fn run(&self, registry: &mut Registry) -> Result<(), RelinkError> {
        if self.old == self.new {
            return Ok(());
        }
        self.verify(registry.owned_expressions())?;
        for expr in registry.owned_expressions_mut() {
            self.apply_to(expr);
        }
        Ok(())
    }
}
