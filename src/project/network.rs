//! Nodes, tanks, reservoirs, links and the hydraulic snapshot.

use super::Project;
use crate::error::{MsxError, Result};
use crate::store::{MixModel, ObjectType};

impl Project {
    /// Adds a junction. Returns its node index.
    pub fn add_node(&mut self, id: &str) -> Result<usize> {
        self.require_mutable()?;
        let claim = self.claim_id(ObjectType::Node, id)?;
        self.symbols.try_reserve(ObjectType::Node, 1)?;

        let index = self.registry.push_node(claim.key.clone())?;
        self.register(ObjectType::Node, &claim);
        self.topology_changed();
        Ok(index)
    }

    /// Adds a storage tank (area 1.0). Returns its tank index.
    pub fn add_tank(&mut self, id: &str, initial_volume: f64, mix_model: MixModel, mix_volume: f64) -> Result<usize> {
        self.push_tank(id, 1.0, initial_volume, mix_model, mix_volume)
    }

    /// Adds a reservoir, a tank with zero area. Returns its tank index.
    pub fn add_reservoir(&mut self, id: &str, initial_volume: f64, mix_model: MixModel, mix_volume: f64) -> Result<usize> {
        self.push_tank(id, 0.0, initial_volume, mix_model, mix_volume)
    }

    fn push_tank(&mut self, id: &str, area: f64, v0: f64, mix_model: MixModel, v_mix: f64) -> Result<usize> {
        self.require_mutable()?;
        // A tank is also a node, so the id must be free in both namespaces.
        let tank_claim = self.claim_id(ObjectType::Tank, id)?;
        let node_claim = self.claim_id(ObjectType::Node, id)?;
        self.symbols.try_reserve(ObjectType::Tank, 1)?;
        self.symbols.try_reserve(ObjectType::Node, 1)?;

        let (tank, _node) = self.registry.push_tank(tank_claim.key.clone(), area, v0, mix_model, v_mix)?;
        self.register(ObjectType::Tank, &tank_claim);
        self.register(ObjectType::Node, &node_claim);
        self.topology_changed();
        Ok(tank)
    }

    /// Adds a link between two existing nodes. Returns its link index.
    pub fn add_link(
        &mut self,
        id: &str,
        start_node: &str,
        end_node: &str,
        length: f64,
        diameter: f64,
        roughness: f64,
    ) -> Result<usize> {
        self.require_mutable()?;
        let claim = self.claim_id(ObjectType::Link, id)?;
        let n1 = self.find_required(ObjectType::Node, start_node)?;
        let n2 = self.find_required(ObjectType::Node, end_node)?;
        self.symbols.try_reserve(ObjectType::Link, 1)?;

        let index = self.registry.push_link(claim.key.clone(), n1, n2, length, diameter, roughness)?;
        self.register(ObjectType::Link, &claim);
        self.topology_changed();
        Ok(index)
    }

    /// Copies one hydraulic snapshot. The slices are 0-based with one entry
    /// per node (demands, heads) or per link (flows).
    pub fn set_hydraulics(&mut self, demands: &[f32], heads: &[f32], flows: &[f32]) -> Result<()> {
        self.require_mutable()?;
        let nodes = self.registry.nodes.len();
        let links = self.registry.links.len();
        if demands.len() < nodes || heads.len() < nodes || flows.len() < links {
            return Err(MsxError::InvalidObjectParams(format!(
                "expected {} node and {} link values, got {}/{}/{}",
                nodes,
                links,
                demands.len(),
                heads.len(),
                flows.len()
            )));
        }
        // Shifted by one: slot 0 of the internal arrays is unused.
        if nodes > 0 {
            self.registry.demand[1..=nodes].copy_from_slice(&demands[..nodes]);
            self.registry.head[1..=nodes].copy_from_slice(&heads[..nodes]);
        }
        if links > 0 {
            self.registry.flow[1..=links].copy_from_slice(&flows[..links]);
        }
        Ok(())
    }

    /// Index of a named object, or `UndefinedName` when no such object exists.
    /// Names registered through `add_object` alone do not count.
    pub(crate) fn find_required(&self, ty: ObjectType, id: &str) -> Result<usize> {
        self.symbols
            .find(ty, id)
            .filter(|&i| i <= self.registry.count(ty))
            .ok_or_else(|| MsxError::UndefinedName(id.to_string()))
    }
}
