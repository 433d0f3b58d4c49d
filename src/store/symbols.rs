//! Identifier lookup: one namespace per object type, one shared string arena.
//!
//! The arena holds every identifier exactly once per registration. Maps and
//! entity records share the same `Arc<str>` so the bytes are released en masse
//! when the table is cleared or dropped.

use std::collections::HashMap;
use std::sync::Arc;

use super::types::ObjectType;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    Inserted(usize),
    Duplicate,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    arena: Vec<Arc<str>>,
    tables: [HashMap<Arc<str>, usize>; ObjectType::COUNT],
    // Reverse lookup: (type) -> index -> arena slot.
    reverse: [Vec<usize>; ObjectType::COUNT],
}

impl SymbolTable {
    pub fn new() -> Self { Self::default() }

    /// Registers `id` under `ty` at the next 1-based index for that namespace.
    /// Exact, case-sensitive match; an existing id is left untouched.
    pub fn insert(&mut self, ty: ObjectType, id: &str) -> Insertion {
        if self.tables[ty.index()].contains_key(id) {
            return Insertion::Duplicate;
        }
        self.insert_shared(ty, Arc::from(id))
    }

    /// Like `insert`, but keeps the caller's handle so an entity record and
    /// the table point at the same bytes.
    pub fn insert_shared(&mut self, ty: ObjectType, key: Arc<str>) -> Insertion {
        if self.tables[ty.index()].contains_key(&*key) {
            return Insertion::Duplicate;
        }
        let index = self.reverse[ty.index()].len() + 1;
        self.reverse[ty.index()].push(self.arena.len());
        self.arena.push(key.clone());
        self.tables[ty.index()].insert(key, index);
        Insertion::Inserted(index)
    }

    /// Reserves room for one more entry in `ty` so a later `insert` cannot
    /// fail on allocation.
    pub fn try_reserve(&mut self, ty: ObjectType, additional: usize) -> Result<(), std::collections::TryReserveError> {
        self.arena.try_reserve(additional)?;
        self.reverse[ty.index()].try_reserve(additional)?;
        self.tables[ty.index()].try_reserve(additional)
    }

    #[inline]
    pub fn find(&self, ty: ObjectType, id: &str) -> Option<usize> {
        self.tables[ty.index()].get(id).copied()
    }

    /// The shared handle for a registered id.
    pub fn id_of(&self, ty: ObjectType, index: usize) -> Option<&Arc<str>> {
        let slot = *self.reverse[ty.index()].get(index.checked_sub(1)?)?;
        self.arena.get(slot)
    }

    pub fn len(&self, ty: ObjectType) -> usize { self.reverse[ty.index()].len() }

    pub fn is_empty(&self) -> bool { self.arena.is_empty() }

    /// Total identifiers held by the arena across all namespaces.
    pub fn arena_len(&self) -> usize { self.arena.len() }

    pub fn clear(&mut self) {
        self.arena = Vec::new();
        for t in self.tables.iter_mut() { *t = HashMap::new(); }
        for r in self.reverse.iter_mut() { *r = Vec::new(); }
    }
}
