//! The project lifecycle: open, incremental construction, init and close.
//!
//! A `Project` exclusively owns its symbol table, entity tables and compiled
//! expressions. Several projects can coexist and each can be moved to another
//! thread.
//!
//! ```text
//!            open(loader) / open_empty()
//!   Closed ─────────────────────────────▶ Opening ──▶ Open
//!     ▲                                      │         │
//!     └────────── close() ◀── (failure) ─────┘◀────────┘
//! ```
//!
//! Independently, the quality axis (`open_quality` / `close_quality`) gates
//! structural mutation while a transport engine is attached.

pub mod access;
mod chemistry;
mod network;
mod quality;
#[cfg(test)]
mod tests;

use crate::analysis::topology::{self, Adjacency};
use crate::analysis::units::{self, ConversionTable};
use crate::compute::linker::{self, Relink};
use crate::error::{MsxError, Result};
use crate::loader::NetworkLoader;
use crate::options::Options;
use crate::store::{ExprBinding, ObjectType, Registry, SpeciesKind, SymbolTable};
use crate::validation::Validator;
use std::sync::Arc;

/// A name cleared for the next object of one type.
pub(crate) struct Claim {
    pub(crate) key: Arc<str>,
    /// Already in the symbol table through `add_object`.
    registered: bool,
}

/// Longest accepted object identifier.
pub const MAX_ID_LEN: usize = 31;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectState {
    #[default]
    Closed,
    /// A loader is populating the tables.
    Opening,
    Open,
}

#[derive(Debug, Default)]
pub struct Project {
    state: ProjectState,
    quality_open: bool,
    options: Options,
    symbols: SymbolTable,
    registry: Registry,
    adjacency: Option<Adjacency>,
    units: Option<ConversionTable>,
    conversion_passes: usize,
    term_order: Vec<usize>,
    initialized: bool,
}

impl Project {
    pub fn new() -> Self { Self::default() }

    // --- Lifecycle ---

    /// Opens a project populated by `loader`.
    ///
    /// On failure the project returns to `Closed`; whatever was loaded stays
    /// in place until the next `open` or `close`.
    pub fn open<L: NetworkLoader + ?Sized>(&mut self, loader: &L) -> Result<()> {
        if self.state != ProjectState::Closed {
            return Err(MsxError::ProjectAlreadyOpen);
        }
        self.reset();
        self.state = ProjectState::Opening;
        self.quality_open = true;

        match self.load(loader) {
            Ok(()) => {
                self.state = ProjectState::Open;
                Ok(())
            }
            Err(e) => {
                self.state = ProjectState::Closed;
                self.quality_open = false;
                Err(e)
            }
        }
    }

    fn load<L: NetworkLoader + ?Sized>(&mut self, loader: &L) -> Result<()> {
        // 1. Settings and table sizes
        self.options = loader.options();
        let counts = loader.counts();
        for ty in ObjectType::ALL {
            self.symbols.try_reserve(ty, counts[ty.index()])?;
        }
        self.registry.reserve_counts(&counts)?;

        // 2. Content
        loader.read_network(self)?;
        loader.read_chemistry(self)?;

        // 3. Derived state
        self.convert_units();
        self.adjacency = Some(Adjacency::build(&self.registry)?);
        Ok(())
    }

    /// Opens an empty project for incremental construction.
    pub fn open_empty(&mut self) -> Result<()> {
        if self.state != ProjectState::Closed {
            return Err(MsxError::ProjectAlreadyOpen);
        }
        self.reset();
        self.state = ProjectState::Open;
        self.quality_open = true;
        Ok(())
    }

    /// Releases everything. Safe to call in any state, any number of times.
    pub fn close(&mut self) {
        self.reset();
        self.state = ProjectState::Closed;
        self.quality_open = false;
    }

    fn reset(&mut self) {
        self.options = Options::default();
        self.symbols.clear();
        self.registry = Registry::default();
        self.adjacency = None;
        self.units = None;
        self.conversion_passes = 0;
        self.term_order = Vec::new();
        self.initialized = false;
    }

    /// Re-enables structural mutation after `close_quality`.
    pub fn open_quality(&mut self) -> Result<()> {
        self.require_open()?;
        self.quality_open = true;
        Ok(())
    }

    /// Freezes the structure while a transport engine holds the project.
    pub fn close_quality(&mut self) {
        self.quality_open = false;
    }

    /// Finishes an incrementally built (or loaded) project so it can be run.
    pub fn init(&mut self) -> Result<()> {
        self.require_mutable()?;

        // 1. Tolerances and tank aliases
        units::apply_default_tolerances(&mut self.registry, &self.options);
        for (i, s) in self.registry.species.iter_mut().enumerate() {
            if s.kind == SpeciesKind::Bulk && !s.tank.is_set() && s.pipe.owned().is_some() {
                s.tank = ExprBinding::Alias { species: i + 1, kind: s.pipe.kind() };
            }
        }

        // 2. Completeness checks, first failure wins
        if let Err(errors) = Validator::new(&self.registry).validate() {
            if let Some(first) = errors.into_iter().next() {
                return Err(first.into());
            }
        }

        // 3. Derived state
        self.convert_units();
        if self.adjacency.is_none() {
            self.adjacency = Some(Adjacency::build(&self.registry)?);
        }
        self.term_order = topology::term_order(&self.registry)?;
        self.initialized = true;
        Ok(())
    }

    /// Converts user units to internal units, at most once per open.
    fn convert_units(&mut self) {
        if self.units.is_some() {
            return;
        }
        let table = ConversionTable::new(&self.options);
        units::convert(&mut self.registry, &table, &self.options);
        self.units = Some(table);
        self.conversion_passes += 1;
    }

    // --- State guards ---

    pub(crate) fn require_open(&self) -> Result<()> {
        match self.state {
            ProjectState::Closed => Err(MsxError::ProjectNotOpen),
            _ => Ok(()),
        }
    }

    /// Structural changes need a loading project, or an open one whose
    /// quality axis is open.
    pub(crate) fn require_mutable(&self) -> Result<()> {
        match self.state {
            ProjectState::Opening => Ok(()),
            ProjectState::Open if self.quality_open => Ok(()),
            _ => Err(MsxError::ProjectNotOpen),
        }
    }

    /// Clears `id` to name the next object of `ty`.
    ///
    /// A name registered through `add_object` at exactly that index is
    /// claimed; any other existing name is a duplicate. Symbol and entity
    /// indices always agree.
    pub(crate) fn claim_id(&self, ty: ObjectType, id: &str) -> Result<Claim> {
        let next = self.registry.count(ty) + 1;
        match self.symbols.find(ty, id) {
            Some(i) if i == next => {
                let key = self.symbols.id_of(ty, i).cloned().unwrap_or_else(|| Arc::from(id));
                Ok(Claim { key, registered: true })
            }
            Some(_) => Err(MsxError::InvalidObjectParams(format!("duplicate {} ID '{}'", ty.label(), id))),
            None if self.symbols.len(ty) >= next => Err(MsxError::InvalidObjectParams(format!(
                "{} '{}' is out of step with names registered ahead of it",
                ty.label(),
                id
            ))),
            None => {
                check_id(id)?;
                Ok(Claim { key: Arc::from(id), registered: false })
            }
        }
    }

    /// Records a claimed name. Call after every fallible step.
    pub(crate) fn register(&mut self, ty: ObjectType, claim: &Claim) {
        if !claim.registered {
            self.symbols.insert_shared(ty, claim.key.clone());
        }
    }

    /// Relink from the current layout to the one after adding one `ty`,
    /// verified against every compiled expression. Nothing is modified.
    pub(crate) fn planned_relink(&self, ty: ObjectType) -> Result<Relink> {
        let old = self.registry.layout();
        let new = old.grown(ty).ok_or(MsxError::InvalidObjectType)?;
        let relink = Relink::new(old, new);
        relink.verify(self.registry.owned_expressions())?;
        Ok(relink)
    }

    /// Drops derived state that depends on network topology.
    fn topology_changed(&mut self) {
        self.adjacency = None;
    }

    // --- Accessors ---

    pub fn state(&self) -> ProjectState { self.state }
    pub fn is_open(&self) -> bool { self.state == ProjectState::Open }
    pub fn is_quality_open(&self) -> bool { self.quality_open }
    pub fn is_initialized(&self) -> bool { self.initialized }
    pub fn options(&self) -> &Options { &self.options }
    pub fn registry(&self) -> &Registry { &self.registry }
    pub fn symbols(&self) -> &SymbolTable { &self.symbols }
    pub fn units(&self) -> Option<&ConversionTable> { self.units.as_ref() }
    /// How many times unit conversion has run since the last open.
    pub fn conversion_passes(&self) -> usize { self.conversion_passes }
    /// Term evaluation order computed by `init`.
    pub fn term_order(&self) -> &[usize] { &self.term_order }

    /// Node adjacency, rebuilt if topology changed since the last build.
    pub fn adjacency(&mut self) -> Result<&Adjacency> {
        let adj = self.take_adjacency()?;
        Ok(self.adjacency.insert(adj))
    }

    /// Nodes ordered from upstream to downstream under the current flows.
    pub fn sort_nodes(&mut self) -> Result<Vec<usize>> {
        let adj = self.take_adjacency()?;
        let order = topology::sort_nodes(&self.registry, &adj);
        self.adjacency = Some(adj);
        Ok(order?)
    }

    fn take_adjacency(&mut self) -> Result<Adjacency> {
        self.require_open()?;
        match self.adjacency.take() {
            Some(adj) => Ok(adj),
            None => Adjacency::build(&self.registry),
        }
    }
}

/// Identifiers are non-empty, at most `MAX_ID_LEN` characters, and contain no
/// whitespace, quotes or comment markers.
pub(crate) fn check_id(id: &str) -> Result<()> {
    let bad = id.is_empty()
        || id.chars().count() > MAX_ID_LEN
        || id.chars().any(|c| c.is_whitespace() || c == ';' || c == '"');
    if bad {
        return Err(MsxError::InvalidObjectParams(format!("invalid ID '{}'", id)));
    }
    Ok(())
}

/// Hydraulic variable names may not name chemistry objects.
pub(crate) fn check_reserved(id: &str) -> Result<()> {
    if linker::is_reserved_name(id) {
        return Err(MsxError::ReservedName(id.to_string()));
    }
    Ok(())
}
