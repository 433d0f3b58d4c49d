//! Expression compiler, variable linker and evaluator.
pub mod bytecode;
pub mod engine;
pub mod kernel;
pub mod ledger;
pub mod linker;

pub use bytecode::{compile, CompileError, MathExpr, OpCode, VariableResolver};
pub use engine::{Engine, Location};
pub use ledger::{ComputationError, Ledger};
pub use linker::{HydVar, Layout, ProjectResolver, Relink, VarRef};
