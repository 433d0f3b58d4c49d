use super::pattern::Pattern;
use super::types::*;
use crate::compute::bytecode::MathExpr;
use crate::compute::linker::Layout;
use crate::error::Result;
use std::collections::TryReserveError;
use std::sync::Arc;

/// Entity tables for one project.
///
/// Tables are stored 0-based and exposed through 1-based accessors; the length
/// of each table is its object count. Per-species vectors are sized
/// `species + 1` and per-parameter vectors `parameters + 1`, with slot 0 unused.
///
/// Growth is split into a fallible `reserve_*` step and an infallible
/// `commit_*` step so that callers can finish every check before anything
/// observable changes.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    pub tanks: Vec<Tank>,
    pub species: Vec<Species>,
    pub terms: Vec<Term>,
    pub params: Vec<Coefficient>,
    pub consts: Vec<Coefficient>,
    pub patterns: Vec<Pattern>,

    /// Project-wide initial concentration per species (1-based).
    pub c0: Vec<f64>,

    // Hydraulic snapshot (1-based).
    pub demand: Vec<f32>,
    pub head: Vec<f32>,
    pub flow: Vec<f32>,
}

#[inline(always)]
fn at<T>(table: &[T], index: usize) -> Option<&T> {
    table.get(index.checked_sub(1)?)
}

#[inline(always)]
fn at_mut<T>(table: &mut [T], index: usize) -> Option<&mut T> {
    table.get_mut(index.checked_sub(1)?)
}

fn zeroed(len: usize) -> std::result::Result<Vec<f64>, TryReserveError> {
    let mut v = Vec::new();
    v.try_reserve_exact(len)?;
    v.resize(len, 0.0);
    Ok(v)
}

/// Extra room a 1-based buffer needs for its next entry (slot 0 on first use).
fn base_len<T>(v: &[T]) -> usize {
    if v.is_empty() { 2 } else { 1 }
}

impl Registry {
    pub fn new() -> Self { Self::default() }

    pub fn count(&self, ty: ObjectType) -> usize {
        match ty {
            ObjectType::Node => self.nodes.len(),
            ObjectType::Link => self.links.len(),
            ObjectType::Tank => self.tanks.len(),
            ObjectType::Species => self.species.len(),
            ObjectType::Term => self.terms.len(),
            ObjectType::Parameter => self.params.len(),
            ObjectType::Constant => self.consts.len(),
            ObjectType::Pattern => self.patterns.len(),
        }
    }

    pub fn layout(&self) -> Layout {
        Layout {
            species: self.species.len(),
            terms: self.terms.len(),
            params: self.params.len(),
            consts: self.consts.len(),
        }
    }

    /// Pre-sizes every table for a bulk load.
    pub fn reserve_counts(&mut self, counts: &[usize; ObjectType::COUNT]) -> Result<()> {
        self.nodes.try_reserve(counts[ObjectType::Node.index()])?;
        self.links.try_reserve(counts[ObjectType::Link.index()])?;
        self.tanks.try_reserve(counts[ObjectType::Tank.index()])?;
        self.species.try_reserve(counts[ObjectType::Species.index()])?;
        self.terms.try_reserve(counts[ObjectType::Term.index()])?;
        self.params.try_reserve(counts[ObjectType::Parameter.index()])?;
        self.consts.try_reserve(counts[ObjectType::Constant.index()])?;
        self.patterns.try_reserve(counts[ObjectType::Pattern.index()])?;
        self.demand.try_reserve(counts[ObjectType::Node.index()] + 1)?;
        self.head.try_reserve(counts[ObjectType::Node.index()] + 1)?;
        self.flow.try_reserve(counts[ObjectType::Link.index()] + 1)?;
        self.c0.try_reserve(counts[ObjectType::Species.index()] + 1)?;
        Ok(())
    }

    // --- 1-based accessors ---

    pub fn node(&self, i: usize) -> Option<&Node> { at(&self.nodes, i) }
    pub fn node_mut(&mut self, i: usize) -> Option<&mut Node> { at_mut(&mut self.nodes, i) }
    pub fn link(&self, i: usize) -> Option<&Link> { at(&self.links, i) }
    pub fn link_mut(&mut self, i: usize) -> Option<&mut Link> { at_mut(&mut self.links, i) }
    pub fn tank(&self, i: usize) -> Option<&Tank> { at(&self.tanks, i) }
    pub fn tank_mut(&mut self, i: usize) -> Option<&mut Tank> { at_mut(&mut self.tanks, i) }
    pub fn species_at(&self, i: usize) -> Option<&Species> { at(&self.species, i) }
    pub fn species_mut(&mut self, i: usize) -> Option<&mut Species> { at_mut(&mut self.species, i) }
    pub fn term(&self, i: usize) -> Option<&Term> { at(&self.terms, i) }
    pub fn param(&self, i: usize) -> Option<&Coefficient> { at(&self.params, i) }
    pub fn param_mut(&mut self, i: usize) -> Option<&mut Coefficient> { at_mut(&mut self.params, i) }
    pub fn constant(&self, i: usize) -> Option<&Coefficient> { at(&self.consts, i) }
    pub fn constant_mut(&mut self, i: usize) -> Option<&mut Coefficient> { at_mut(&mut self.consts, i) }
    pub fn pattern(&self, i: usize) -> Option<&Pattern> { at(&self.patterns, i) }
    pub fn pattern_mut(&mut self, i: usize) -> Option<&mut Pattern> { at_mut(&mut self.patterns, i) }

    /// The expression a species uses on one side, following aliases.
    pub fn expression(&self, species: usize, class: ExprClass) -> Option<&MathExpr> {
        match self.species_at(species)?.binding(class) {
            ExprBinding::Owned { expr, .. } => Some(expr),
            ExprBinding::Alias { species: target, .. } => self.species_at(*target)?.pipe.owned(),
            ExprBinding::Unset => None,
        }
    }

    /// Every owned expression tree, each exactly once. Aliases are skipped.
    pub fn owned_expressions(&self) -> impl Iterator<Item = &MathExpr> {
        self.terms
            .iter()
            .map(|t| &t.expr)
            .chain(self.species.iter().flat_map(|s| s.pipe.owned().into_iter().chain(s.tank.owned())))
    }

    pub(crate) fn owned_expressions_mut(&mut self) -> impl Iterator<Item = &mut MathExpr> {
        self.terms.iter_mut().map(|t| &mut t.expr).chain(
            self.species
                .iter_mut()
                .flat_map(|s| s.pipe.owned_mut().into_iter().chain(s.tank.owned_mut())),
        )
    }

    // --- Network growth ---

    fn new_node(&self, id: Arc<str>, tank: usize) -> std::result::Result<Node, TryReserveError> {
        let ns = self.species.len() + 1;
        Ok(Node { id, tank, rpt: false, c: zeroed(ns)?, c0: zeroed(ns)?, sources: Vec::new() })
    }

    fn reserve_hydraulic_node(&mut self) -> std::result::Result<(), TryReserveError> {
        self.demand.try_reserve(base_len(&self.demand))?;
        self.head.try_reserve(base_len(&self.head))
    }

    fn commit_hydraulic_node(&mut self) {
        if self.demand.is_empty() { self.demand.push(0.0); }
        if self.head.is_empty() { self.head.push(0.0); }
        self.demand.push(0.0);
        self.head.push(0.0);
    }

    /// Appends a junction. Returns its 1-based index.
    pub fn push_node(&mut self, id: Arc<str>) -> Result<usize> {
        // 1. Everything that can fail
        let node = self.new_node(id, 0)?;
        self.nodes.try_reserve(1)?;
        self.reserve_hydraulic_node()?;

        // 2. Commit
        self.commit_hydraulic_node();
        self.nodes.push(node);
        Ok(self.nodes.len())
    }

    /// Appends a tank (or reservoir, `a == 0.0`) together with its node.
    /// Returns `(tank index, node index)`.
    pub fn push_tank(&mut self, id: Arc<str>, a: f64, v0: f64, mix_model: MixModel, v_mix: f64) -> Result<(usize, usize)> {
        let tank_index = self.tanks.len() + 1;
        let node_index = self.nodes.len() + 1;

        let node = self.new_node(id.clone(), tank_index)?;
        let tank = Tank {
            id,
            node: node_index,
            a,
            v0,
            mix_model,
            v_mix,
            param: zeroed(self.params.len() + 1)?,
            c: zeroed(self.species.len() + 1)?,
            reacted: zeroed(self.species.len() + 1)?,
        };
        self.nodes.try_reserve(1)?;
        self.tanks.try_reserve(1)?;
        self.reserve_hydraulic_node()?;

        self.commit_hydraulic_node();
        self.tanks.push(tank);
        self.nodes.push(node);
        Ok((tank_index, node_index))
    }

    pub fn push_link(&mut self, id: Arc<str>, n1: usize, n2: usize, len: f64, diam: f64, roughness: f64) -> Result<usize> {
        let ns = self.species.len() + 1;
        let link = Link {
            id,
            n1,
            n2,
            diam,
            len,
            roughness,
            rpt: false,
            c0: zeroed(ns)?,
            c: zeroed(ns)?,
            reacted: zeroed(ns)?,
            param: zeroed(self.params.len() + 1)?,
        };
        self.links.try_reserve(1)?;
        self.flow.try_reserve(base_len(&self.flow))?;

        if self.flow.is_empty() { self.flow.push(0.0); }
        self.flow.push(0.0);
        self.links.push(link);
        Ok(self.links.len())
    }

    // --- Chemistry growth ---

    /// Reserves one more slot in every per-species vector.
    pub fn reserve_species(&mut self) -> Result<()> {
        self.species.try_reserve(1)?;
        self.c0.try_reserve(base_len(&self.c0))?;
        for n in self.nodes.iter_mut() {
            n.c.try_reserve(1)?;
            n.c0.try_reserve(1)?;
        }
        for l in self.links.iter_mut() {
            l.c0.try_reserve(1)?;
            l.c.try_reserve(1)?;
            l.reacted.try_reserve(1)?;
        }
        for t in self.tanks.iter_mut() {
            t.c.try_reserve(1)?;
            t.reacted.try_reserve(1)?;
        }
        Ok(())
    }

    /// Fans a zeroed slot out to every entity, then appends the species.
    /// Call only after `reserve_species` succeeded.
    pub fn commit_species(&mut self, species: Species) -> usize {
        if self.c0.is_empty() { self.c0.push(0.0); }
        self.c0.push(0.0);
        for n in self.nodes.iter_mut() {
            n.c.push(0.0);
            n.c0.push(0.0);
        }
        for l in self.links.iter_mut() {
            l.c0.push(0.0);
            l.c.push(0.0);
            l.reacted.push(0.0);
        }
        for t in self.tanks.iter_mut() {
            t.c.push(0.0);
            t.reacted.push(0.0);
        }
        self.species.push(species);
        self.species.len()
    }

    /// Reserves one more slot in every per-parameter vector.
    pub fn reserve_parameter(&mut self) -> Result<()> {
        self.params.try_reserve(1)?;
        for l in self.links.iter_mut() { l.param.try_reserve(1)?; }
        for t in self.tanks.iter_mut() { t.param.try_reserve(1)?; }
        Ok(())
    }

    pub fn commit_parameter(&mut self, param: Coefficient) -> usize {
        for l in self.links.iter_mut() { l.param.push(0.0); }
        for t in self.tanks.iter_mut() { t.param.push(0.0); }
        self.params.push(param);
        self.params.len()
    }

    pub fn reserve_constant(&mut self) -> Result<()> {
        self.consts.try_reserve(1)?;
        Ok(())
    }

    pub fn commit_constant(&mut self, constant: Coefficient) -> usize {
        self.consts.push(constant);
        self.consts.len()
    }

    pub fn reserve_term(&mut self) -> Result<()> {
        self.terms.try_reserve(1)?;
        Ok(())
    }

    pub fn commit_term(&mut self, term: Term) -> usize {
        self.terms.push(term);
        self.terms.len()
    }

    pub fn push_pattern(&mut self, id: Arc<str>) -> Result<usize> {
        self.patterns.try_reserve(1)?;
        self.patterns.push(Pattern::new(id));
        Ok(self.patterns.len())
    }
}
