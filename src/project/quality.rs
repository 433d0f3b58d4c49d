//! Sources, initial quality, local parameters, report flags and current
//! concentrations.

use super::Project;
use crate::error::{MsxError, Result};
use crate::options::{match_keyword, parse_integer};
use crate::store::{source, ObjectType, SourceKind, SpeciesKind};

const QUALITY_SCOPES: &[&str] = &["GLOBAL", "NODE", "LINK"];
const PARAMETER_SCOPES: &[&str] = &["PIPE", "TANK"];
const REPORT_WORDS: &[&str] = &["NODE", "LINK", "SPECIES", "FILE", "PAGESIZE"];

impl Project {
    /// Adds (or updates) the source of a species at a node, by ID.
    ///
    /// Wall species cannot carry a source; for them this succeeds without
    /// doing anything. A missing or empty pattern ID means "no pattern".
    pub fn add_source(
        &mut self,
        kind: SourceKind,
        node_id: &str,
        species_id: &str,
        strength: f64,
        pattern_id: Option<&str>,
    ) -> Result<()> {
        self.require_mutable()?;
        let j = self.find_required(ObjectType::Node, node_id)?;
        let m = self.find_required(ObjectType::Species, species_id)?;
        if self.species_kind(m)? != SpeciesKind::Bulk {
            return Ok(());
        }
        let pattern = match pattern_id {
            Some(id) if !id.is_empty() => self.find_required(ObjectType::Pattern, id)?,
            _ => 0,
        };
        let node = self.registry.node_mut(j).ok_or(MsxError::InvalidObjectIndex(j))?;
        source::upsert(&mut node.sources, m, kind, strength, pattern)?;
        Ok(())
    }

    /// Sets an initial concentration. `scope` is GLOBAL (every node and link,
    /// plus the project default), NODE or LINK; `id` names the node or link
    /// and is ignored for GLOBAL. Nodes only hold bulk species.
    pub fn add_quality(&mut self, scope: &str, species_id: &str, value: f64, id: &str) -> Result<()> {
        self.require_mutable()?;
        let scope = match_keyword(scope, QUALITY_SCOPES).ok_or_else(|| MsxError::Keyword(scope.to_string()))?;
        let m = self.find_required(ObjectType::Species, species_id)?;
        let bulk = self.species_kind(m)? == SpeciesKind::Bulk;

        match scope {
            0 => {
                self.registry.c0[m] = value;
                if bulk {
                    for n in self.registry.nodes.iter_mut() {
                        n.c0[m] = value;
                    }
                }
                for l in self.registry.links.iter_mut() {
                    l.c0[m] = value;
                }
            }
            1 => {
                let j = self.find_required(ObjectType::Node, id)?;
                if bulk {
                    self.registry.node_mut(j).ok_or(MsxError::InvalidObjectIndex(j))?.c0[m] = value;
                }
            }
            _ => {
                let k = self.find_required(ObjectType::Link, id)?;
                self.registry.link_mut(k).ok_or(MsxError::InvalidObjectIndex(k))?.c0[m] = value;
            }
        }
        Ok(())
    }

    /// Overrides a parameter for one pipe (`scope` PIPE) or tank (TANK).
    pub fn add_parameter(&mut self, scope: &str, param_id: &str, value: f64, id: &str) -> Result<()> {
        self.require_mutable()?;
        let scope = match_keyword(scope, PARAMETER_SCOPES).ok_or_else(|| MsxError::Keyword(scope.to_string()))?;
        let i = self.find_required(ObjectType::Parameter, param_id)?;

        let values = match scope {
            0 => {
                let k = self.find_required(ObjectType::Link, id)?;
                &mut self.registry.link_mut(k).ok_or(MsxError::InvalidObjectIndex(k))?.param
            }
            _ => {
                let t = self.find_required(ObjectType::Tank, id)?;
                &mut self.registry.tank_mut(t).ok_or(MsxError::InvalidObjectIndex(t))?.param
            }
        };
        values[i] = value;
        Ok(())
    }

    /// Report settings: NODE, LINK or SPECIES flag an object for reporting
    /// (`precision` applies to SPECIES only), FILE names the report file and
    /// PAGESIZE sets lines per page.
    pub fn set_report(&mut self, kind: &str, id: &str, precision: i32) -> Result<()> {
        self.require_mutable()?;
        let k = match_keyword(kind, REPORT_WORDS).ok_or_else(|| MsxError::Keyword(kind.to_string()))?;
        match k {
            0 => {
                let j = self.find_required(ObjectType::Node, id)?;
                self.registry.node_mut(j).ok_or(MsxError::InvalidObjectIndex(j))?.rpt = true;
            }
            1 => {
                let j = self.find_required(ObjectType::Link, id)?;
                self.registry.link_mut(j).ok_or(MsxError::InvalidObjectIndex(j))?.rpt = true;
            }
            2 => {
                let m = self.find_required(ObjectType::Species, id)?;
                let s = self.registry.species_mut(m).ok_or(MsxError::InvalidObjectIndex(m))?;
                s.rpt = true;
                s.precision = precision;
            }
            3 => self.options.report_file = id.to_string(),
            _ => self.options.page_size = parse_integer(id)?,
        }
        Ok(())
    }

    /// Sets the source of a bulk species at a node, by index. `pattern` 0
    /// (or negative) means none.
    pub fn set_source(&mut self, node: usize, species: usize, kind: SourceKind, level: f64, pattern: i64) -> Result<()> {
        self.require_open()?;
        if node < 1 || node > self.registry.nodes.len() {
            return Err(MsxError::InvalidObjectIndex(node));
        }
        if species < 1 || species > self.registry.species.len() {
            return Err(MsxError::InvalidObjectIndex(species));
        }
        let pattern = usize::try_from(pattern).unwrap_or(0);
        if pattern > self.registry.patterns.len() {
            return Err(MsxError::InvalidObjectIndex(pattern));
        }
        if self.species_kind(species)? != SpeciesKind::Bulk {
            return Err(MsxError::InvalidObjectParams(format!(
                "species {} is not a bulk species",
                species
            )));
        }
        if level < 0.0 {
            return Err(MsxError::InvalidObjectParams(format!("negative source level {}", level)));
        }
        let n = self.registry.node_mut(node).ok_or(MsxError::InvalidObjectIndex(node))?;
        source::upsert(&mut n.sources, species, kind, level, pattern)?;
        Ok(())
    }

    /// Writes a current concentration computed by a transport engine. Writing
    /// to a tank's node also updates the tank.
    pub fn set_quality(&mut self, ty: ObjectType, index: usize, species: usize, value: f64) -> Result<()> {
        self.require_open()?;
        if species < 1 || species > self.registry.species.len() {
            return Err(MsxError::InvalidObjectIndex(species));
        }
        match ty {
            ObjectType::Node => {
                let n = self.registry.node_mut(index).ok_or(MsxError::InvalidObjectIndex(index))?;
                n.c[species] = value;
                let tank = n.tank;
                if let Some(t) = self.registry.tank_mut(tank) {
                    t.c[species] = value;
                }
            }
            ObjectType::Link => {
                self.registry.link_mut(index).ok_or(MsxError::InvalidObjectIndex(index))?.c[species] = value;
            }
            _ => return Err(MsxError::InvalidObjectType),
        }
        Ok(())
    }

    pub(crate) fn species_kind(&self, m: usize) -> Result<SpeciesKind> {
        self.registry.species_at(m).map(|s| s.kind).ok_or(MsxError::InvalidObjectIndex(m))
    }
}
