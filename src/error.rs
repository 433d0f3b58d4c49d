//! Error codes shared by every public operation of the project core.
//!
//! Each variant carries a stable integer code from the legacy toolkit so that
//! callers on the other side of a C or Python boundary can keep matching on
//! numbers. `error_message` is the fixed lookup table for those numbers.

use thiserror::Error;

use crate::analysis::topology::TopologyError;
use crate::compute::bytecode::CompileError;
use crate::compute::ledger::ComputationError;
use crate::compute::linker::RelinkError;
use crate::validation::error::{ValidationError, ValidationErrorType};

pub type Result<T> = std::result::Result<T, MsxError>;

// --- Legacy code ranges ---
pub const ERR_FIRST: i32 = 500;
pub const ERR_MAX: i32 = 525;
pub const INP_ERR_FIRST: i32 = 200;
pub const INP_ERR_LAST: i32 = 210;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MsxError {
    #[error("insufficient memory available")]
    OutOfMemory,
    #[error("could not read project data: {0}")]
    Input(String),
    #[error("too few pipe reaction expressions (species '{0}')")]
    TooFewPipeExpressions(String),
    #[error("too few tank reaction expressions (species '{0}')")]
    TooFewTankExpressions(String),
    #[error("reference made to an unknown type of object")]
    InvalidObjectType,
    #[error("reference made to an illegal object index: {0}")]
    InvalidObjectIndex(usize),
    #[error("reference made to an undefined object ID '{0}'")]
    UndefinedObjectId(String),
    #[error("invalid property values were specified: {0}")]
    InvalidObjectParams(String),
    #[error("an MSX project was not opened")]
    ProjectNotOpen,
    #[error("an MSX project is already opened")]
    ProjectAlreadyOpen,
    #[error("illegal math operation in '{0}'")]
    IllegalMath(String),
    #[error("invalid keyword '{0}'")]
    Keyword(String),
    #[error("invalid numeric value '{0}'")]
    Number(String),
    #[error("reference to undefined object '{0}'")]
    UndefinedName(String),
    #[error("illegal use of a reserved name '{0}'")]
    ReservedName(String),
    #[error("species '{0}' already assigned an expression")]
    DuplicateExpression(String),
    #[error("illegal math expression: {0}")]
    MathExpr(String),
}

impl MsxError {
    /// The legacy integer code for this error.
    pub fn code(&self) -> i32 {
        match self {
            MsxError::OutOfMemory => 501,
            MsxError::Input(_) => 506,
            MsxError::TooFewPipeExpressions(_) => 507,
            MsxError::TooFewTankExpressions(_) => 508,
            MsxError::InvalidObjectType => 515,
            MsxError::InvalidObjectIndex(_) => 516,
            MsxError::UndefinedObjectId(_) => 517,
            MsxError::InvalidObjectParams(_) => 518,
            MsxError::ProjectNotOpen => 519,
            MsxError::ProjectAlreadyOpen => 520,
            MsxError::IllegalMath(_) => 524,
            MsxError::Keyword(_) => 203,
            MsxError::Number(_) => 204,
            MsxError::UndefinedName(_) => 205,
            MsxError::ReservedName(_) => 206,
            MsxError::DuplicateExpression(_) => 208,
            MsxError::MathExpr(_) => 209,
        }
    }

    /// The fixed table text for this error's code.
    pub fn message(&self) -> &'static str {
        error_message(self.code())
    }
}

impl From<CompileError> for MsxError {
    fn from(e: CompileError) -> Self {
        MsxError::MathExpr(e.to_string())
    }
}

impl From<std::collections::TryReserveError> for MsxError {
    fn from(_: std::collections::TryReserveError) -> Self {
        MsxError::OutOfMemory
    }
}

impl From<ComputationError> for MsxError {
    fn from(e: ComputationError) -> Self {
        match e {
            ComputationError::MathError(s) => MsxError::IllegalMath(s),
            ComputationError::CycleDetected(s) => MsxError::MathExpr(s),
            ComputationError::Mismatch { msg } => MsxError::InvalidObjectParams(msg),
        }
    }
}

impl From<TopologyError> for MsxError {
    fn from(e: TopologyError) -> Self {
        match e {
            TopologyError::CircularTerm(id) => MsxError::MathExpr(id),
            other => MsxError::InvalidObjectParams(other.to_string()),
        }
    }
}

impl From<RelinkError> for MsxError {
    fn from(e: RelinkError) -> Self {
        MsxError::MathExpr(e.to_string())
    }
}

impl From<ValidationError> for MsxError {
    fn from(e: ValidationError) -> Self {
        match e.error_type {
            ValidationErrorType::MissingPipeExpression => MsxError::TooFewPipeExpressions(e.object_name),
            ValidationErrorType::MissingTankExpression => MsxError::TooFewTankExpressions(e.object_name),
            ValidationErrorType::CircularTerm => MsxError::MathExpr(e.message),
        }
    }
}

static ERRMSG: [&str; 25] = [
    "unknown error code.",
    "Error 501 - insufficient memory available.",
    "Error 502 - no EPANET data file supplied.",
    "Error 503 - could not open MSX input file.",
    "Error 504 - could not open hydraulic results file.",
    "Error 505 - could not read hydraulic results file.",
    "Error 506 - could not read MSX input file.",
    "Error 507 - too few pipe reaction expressions.",
    "Error 508 - too few tank reaction expressions.",
    "Error 509 - could not open differential equation solver.",
    "Error 510 - could not open algebraic equation solver.",
    "Error 511 - could not open binary results file.",
    "Error 512 - read/write error on binary results file.",
    "Error 513 - could not integrate reaction rate expressions.",
    "Error 514 - could not solve reaction equilibrium expressions.",
    "Error 515 - reference made to an unknown type of object.",
    "Error 516 - reference made to an illegal object index.",
    "Error 517 - reference made to an undefined object ID.",
    "Error 518 - invalid property values were specified.",
    "Error 519 - an MSX project was not opened.",
    "Error 520 - an MSX project is already opened.",
    "Error 521 - could not open MSX report file.",
    "Error 522 - could not compile chemistry functions.",
    "Error 523 - could not load functions from compiled chemistry file.",
    "Error 524 - illegal math operation.",
];

static INP_ERRMSG: [&str; 9] = [
    "Error 201 - line too long.",
    "Error 202 - too few items.",
    "Error 203 - invalid keyword.",
    "Error 204 - invalid numeric value.",
    "Error 205 - reference to undefined object.",
    "Error 206 - illegal use of a reserved name.",
    "Error 207 - name already used by another object.",
    "Error 208 - species already assigned an expression.",
    "Error 209 - illegal math expression.",
];

/// Looks up the text of an error code. Codes outside both legacy ranges map
/// to the generic "unknown error code." entry.
pub fn error_message(code: i32) -> &'static str {
    if code > ERR_FIRST && code < ERR_MAX {
        ERRMSG[(code - ERR_FIRST) as usize]
    } else if code > INP_ERR_FIRST && code < INP_ERR_LAST {
        INP_ERRMSG[(code - INP_ERR_FIRST - 1) as usize]
    } else {
        ERRMSG[0]
    }
}
