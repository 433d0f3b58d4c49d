use crate::compute::linker::VarRef;
use crate::error::MsxError;
use crate::store::Registry;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::VecDeque;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TopologyError {
    #[error("flow directions form a cycle")]
    CyclicFlow,
    #[error("term '{0}' depends on itself")]
    CircularTerm(String),
}

const NIL: u32 = u32::MAX;

/// Per-node lists of `(neighbor, link)` pairs, one entry per link endpoint.
///
/// Stored as intrusive linked lists over flat arrays. Each new entry is
/// prepended to its node's list, so a list yields links newest first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Adjacency {
    first: Vec<u32>,
    next: Vec<u32>,
    neighbor: Vec<u32>,
    link: Vec<u32>,
}

impl Adjacency {
    /// Builds the lists from every link's endpoints. On allocation failure
    /// the partial lists are dropped and `OutOfMemory` is returned.
    pub fn build(registry: &Registry) -> Result<Self, MsxError> {
        let mut adj = Self::allocate(registry.nodes.len(), 2 * registry.links.len())?;

        // Each link goes into the start node's list, then the end node's
        for (k, l) in registry.links.iter().enumerate() {
            adj.prepend(l.n1, l.n2, k + 1);
            adj.prepend(l.n2, l.n1, k + 1);
        }
        Ok(adj)
    }

    /// Empty lists for `nodes` nodes with room for `entries` entries.
    fn allocate(nodes: usize, entries: usize) -> Result<Self, MsxError> {
        let mut adj = Adjacency::default();
        adj.first.try_reserve_exact(nodes.checked_add(1).ok_or(MsxError::OutOfMemory)?)?;
        adj.next.try_reserve_exact(entries)?;
        adj.neighbor.try_reserve_exact(entries)?;
        adj.link.try_reserve_exact(entries)?;
        adj.first.resize(nodes + 1, NIL);
        Ok(adj)
    }

    fn prepend(&mut self, node: usize, neighbor: usize, link: usize) {
        let Some(head) = self.first.get_mut(node) else { return };
        let entry = self.link.len() as u32;
        self.next.push(*head);
        self.neighbor.push(neighbor as u32);
        self.link.push(link as u32);
        *head = entry;
    }

    pub fn node_count(&self) -> usize { self.first.len().saturating_sub(1) }

    pub fn entry_count(&self) -> usize { self.link.len() }

    /// Iterates `(neighbor, link)` pairs of a 1-based node.
    pub fn neighbors(&self, node: usize) -> Neighbors<'_> {
        Neighbors { adj: self, cursor: self.first.get(node).copied().unwrap_or(NIL) }
    }
}

pub struct Neighbors<'a> {
    adj: &'a Adjacency,
    cursor: u32,
}

impl Iterator for Neighbors<'_> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NIL {
            return None;
        }
        let e = self.cursor as usize;
        self.cursor = self.adj.next[e];
        Some((self.adj.neighbor[e] as usize, self.adj.link[e] as usize))
    }
}

/// Orders nodes so that every node follows the nodes that feed it, using
/// the sign of the current link flows. Links with zero flow are ignored.
///
/// Kahn's algorithm over the adjacency lists.
pub fn sort_nodes(registry: &Registry, adj: &Adjacency) -> Result<Vec<usize>, TopologyError> {
    let n = registry.nodes.len();
    let flow = |k: usize| registry.flow.get(k).copied().unwrap_or(0.0);

    // Is `link` carrying water from `from` into `to`?
    let feeds = |link: usize, from: usize, to: usize| -> bool {
        let Some(l) = registry.link(link) else { return false };
        let q = flow(link);
        (q > 0.0 && l.n1 == from && l.n2 == to) || (q < 0.0 && l.n2 == from && l.n1 == to)
    };

    // 1. In-degrees
    let mut in_degree = vec![0usize; n + 1];
    for i in 1..=n {
        in_degree[i] = adj.neighbors(i).filter(|&(j, k)| feeds(k, j, i)).count();
    }

    // 2. Process queue
    let mut queue: VecDeque<usize> = (1..=n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    while let Some(i) = queue.pop_front() {
        order.push(i);
        for (j, k) in adj.neighbors(i) {
            if feeds(k, i, j) {
                in_degree[j] -= 1;
                if in_degree[j] == 0 {
                    queue.push_back(j);
                }
            }
        }
    }

    if order.len() != n {
        return Err(TopologyError::CyclicFlow);
    }
    Ok(order)
}

/// Term indices (1-based) ordered so that every term follows the terms it
/// references.
pub fn term_order(registry: &Registry) -> Result<Vec<usize>, TopologyError> {
    let layout = registry.layout();
    let mut graph: DiGraph<usize, ()> = DiGraph::with_capacity(registry.terms.len(), 0);
    let ids: Vec<NodeIndex> = (1..=registry.terms.len()).map(|t| graph.add_node(t)).collect();

    for (t, term) in registry.terms.iter().enumerate() {
        for code in term.expr.variables() {
            if let Some(VarRef::Term(dep)) = layout.decode(code) {
                if let Some(&from) = ids.get(dep - 1) {
                    graph.add_edge(from, ids[t], ());
                }
            }
        }
    }

    toposort(&graph, None)
        .map(|order| order.into_iter().map(|ix| graph[ix]).collect())
        .map_err(|cycle| {
            let t = graph[cycle.node_id()];
            let id = registry.term(t).map(|term| term.id.to_string()).unwrap_or_default();
            TopologyError::CircularTerm(id)
        })
}
