//! In-memory project model: entity tables, identifiers, patterns and sources.
pub mod pattern;
pub mod registry;
pub mod source;
pub mod symbols;
pub mod types;

pub use pattern::Pattern;
pub use registry::Registry;
pub use source::{Source, SourceKind};
pub use symbols::{Insertion, SymbolTable};
pub use types::*;
