// Crate root: the project model and expression binding core of a
// multi-species water-quality simulator.
//
// A `Project` owns one network (nodes, links, tanks), its chemistry
// (species, terms, parameters, constants, patterns, sources) and every
// compiled expression. It is populated either in bulk through a
// `NetworkLoader` or one object at a time.

pub mod analysis;
pub mod compute;
pub mod display;
pub mod error;
pub mod loader;
pub mod options;
pub mod project;
pub mod store;
pub mod validation;

// --- Public surface ---
pub use compute::{Engine, Ledger, Location, MathExpr};
pub use error::{error_message, MsxError, Result};
pub use loader::{NetworkLoader, ProjectData};
pub use options::{OptionType, Options};
pub use project::{Project, ProjectState, MAX_ID_LEN};
pub use store::{
    ExprClass, ExprKind, Insertion, MassUnits, MixModel, ObjectType, Source, SourceKind, SpeciesKind,
};
