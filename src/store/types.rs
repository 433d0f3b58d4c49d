use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::compute::bytecode::MathExpr;
use crate::store::source::Source;

/// Object namespaces. Integer codes follow the legacy toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum ObjectType {
    Node = 0,
    Link = 1,
    Tank = 2,
    Species = 3,
    Term = 4,
    Parameter = 5,
    Constant = 6,
    Pattern = 7,
}

impl ObjectType {
    pub const COUNT: usize = 8;
    pub const ALL: [ObjectType; 8] = [
        ObjectType::Node,
        ObjectType::Link,
        ObjectType::Tank,
        ObjectType::Species,
        ObjectType::Term,
        ObjectType::Parameter,
        ObjectType::Constant,
        ObjectType::Pattern,
    ];

    #[inline(always)]
    pub fn index(&self) -> usize { *self as usize }

    pub fn from_code(code: i32) -> Option<Self> {
        Self::ALL.get(usize::try_from(code).ok()?).copied()
    }

    pub fn label(&self) -> &'static str {
        match self {
            ObjectType::Node => "NODE",
            ObjectType::Link => "LINK",
            ObjectType::Tank => "TANK",
            ObjectType::Species => "SPECIES",
            ObjectType::Term => "TERM",
            ObjectType::Parameter => "PARAMETER",
            ObjectType::Constant => "CONSTANT",
            ObjectType::Pattern => "PATTERN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SpeciesKind {
    #[default]
    Bulk,
    Wall,
}

/// How an expression defines its species. Codes follow the legacy toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExprKind {
    #[default]
    None = 0,
    Rate = 1,
    Formula = 2,
    Equil = 3,
}

impl ExprKind {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ExprKind::None),
            1 => Some(ExprKind::Rate),
            2 => Some(ExprKind::Formula),
            3 => Some(ExprKind::Equil),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MixModel {
    #[default]
    Mix1 = 0,
    Mix2 = 1,
    Fifo = 2,
    Lifo = 3,
}

impl MixModel {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(MixModel::Mix1),
            1 => Some(MixModel::Mix2),
            2 => Some(MixModel::Fifo),
            3 => Some(MixModel::Lifo),
            _ => None,
        }
    }
}

/// Mass units a species concentration is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MassUnits {
    #[default]
    Mg = 0,
    Ug = 1,
    Mole = 2,
    Mmole = 3,
}

impl MassUnits {
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(MassUnits::Mg),
            1 => Some(MassUnits::Ug),
            2 => Some(MassUnits::Mole),
            3 => Some(MassUnits::Mmole),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MassUnits::Mg => "MG",
            MassUnits::Ug => "UG",
            MassUnits::Mole => "MOLE",
            MassUnits::Mmole => "MMOLE",
        }
    }
}

/// Which side of a species an expression is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExprClass {
    Pipe,
    Tank,
}

impl ExprClass {
    /// Legacy class codes: LINK selects the pipe side, TANK the tank side.
    pub fn from_object_code(code: i32) -> Option<Self> {
        match ObjectType::from_code(code)? {
            ObjectType::Link => Some(ExprClass::Pipe),
            ObjectType::Tank => Some(ExprClass::Tank),
            _ => None,
        }
    }
}

/// Ownership of a species' pipe or tank expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ExprBinding {
    #[default]
    Unset,
    Owned { kind: ExprKind, expr: MathExpr },
    /// Shares the pipe expression of `species` (by 1-based index).
    Alias { species: usize, kind: ExprKind },
}

impl ExprBinding {
    pub fn kind(&self) -> ExprKind {
        match self {
            ExprBinding::Unset => ExprKind::None,
            ExprBinding::Owned { kind, .. } | ExprBinding::Alias { kind, .. } => *kind,
        }
    }

    pub fn is_set(&self) -> bool {
        !matches!(self, ExprBinding::Unset)
    }

    pub fn owned(&self) -> Option<&MathExpr> {
        match self {
            ExprBinding::Owned { expr, .. } => Some(expr),
            _ => None,
        }
    }

    pub(crate) fn owned_mut(&mut self) -> Option<&mut MathExpr> {
        match self {
            ExprBinding::Owned { expr, .. } => Some(expr),
            _ => None,
        }
    }
}

// --- Entities ---

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub id: Arc<str>,
    /// Tank index (0 = junction).
    pub tank: usize,
    pub rpt: bool,
    pub c: Vec<f64>,
    pub c0: Vec<f64>,
    pub sources: Vec<Source>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Link {
    pub id: Arc<str>,
    pub n1: usize,
    pub n2: usize,
    pub diam: f64,
    pub len: f64,
    pub roughness: f64,
    pub rpt: bool,
    pub c0: Vec<f64>,
    pub c: Vec<f64>,
    pub reacted: Vec<f64>,
    pub param: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tank {
    pub id: Arc<str>,
    pub node: usize,
    /// 1.0 for a tank, 0.0 for a reservoir.
    pub a: f64,
    pub v0: f64,
    pub mix_model: MixModel,
    pub v_mix: f64,
    pub param: Vec<f64>,
    pub c: Vec<f64>,
    pub reacted: Vec<f64>,
}

impl Tank {
    pub fn is_reservoir(&self) -> bool { self.a == 0.0 }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Species {
    pub id: Arc<str>,
    pub kind: SpeciesKind,
    pub units: MassUnits,
    pub a_tol: f64,
    pub r_tol: f64,
    pub pipe: ExprBinding,
    pub tank: ExprBinding,
    pub rpt: bool,
    pub precision: i32,
}

impl Species {
    pub fn new(id: Arc<str>, kind: SpeciesKind, units: MassUnits, a_tol: f64, r_tol: f64) -> Self {
        Self {
            id,
            kind,
            units,
            a_tol,
            r_tol,
            pipe: ExprBinding::Unset,
            tank: ExprBinding::Unset,
            rpt: false,
            precision: 2,
        }
    }

    pub fn binding(&self, class: ExprClass) -> &ExprBinding {
        match class {
            ExprClass::Pipe => &self.pipe,
            ExprClass::Tank => &self.tank,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub id: Arc<str>,
    pub equation: String,
    pub expr: MathExpr,
}

/// Parameters and constants share this shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Coefficient {
    pub id: Arc<str>,
    pub value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0, Some(ObjectType::Node))]
    #[case(3, Some(ObjectType::Species))]
    #[case(7, Some(ObjectType::Pattern))]
    #[case(8, None)]
    #[case(-1, None)]
    fn test_object_type_codes(#[case] code: i32, #[case] expected: Option<ObjectType>) {
        assert_eq!(ObjectType::from_code(code), expected);
    }

    #[test]
    fn test_expr_class_from_object_code() {
        assert_eq!(ExprClass::from_object_code(1), Some(ExprClass::Pipe));
        assert_eq!(ExprClass::from_object_code(2), Some(ExprClass::Tank));
        assert_eq!(ExprClass::from_object_code(0), None);
    }

    #[test]
    fn test_new_species_defaults() {
        let s = Species::new("CL2".into(), SpeciesKind::Bulk, MassUnits::Mg, 0.0, 0.0);
        assert_eq!(s.precision, 2);
        assert_eq!(s.pipe.kind(), ExprKind::None);
        assert!(!s.tank.is_set());
    }
}
