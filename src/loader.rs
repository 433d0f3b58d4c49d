//! Bulk population of a project.
//!
//! `Project::open` drives a `NetworkLoader` in three passes: counts (so every
//! table is allocated once), network topology, then chemistry. `ProjectData`
//! is a JSON document implementing the trait.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{MsxError, Result};
use crate::options::Options;
use crate::project::Project;
use crate::store::{ExprClass, ExprKind, MassUnits, MixModel, ObjectType, SourceKind, SpeciesKind};

pub trait NetworkLoader {
    /// Expected number of objects per type, indexed by `ObjectType::index`.
    /// Tanks count toward both tanks and nodes.
    fn counts(&self) -> [usize; ObjectType::COUNT];

    fn options(&self) -> Options {
        Options::default()
    }

    /// Adds nodes, tanks, reservoirs and links.
    fn read_network(&self, project: &mut Project) -> Result<()>;

    /// Adds species, coefficients, terms, expressions, patterns, sources,
    /// initial quality, local parameters and report settings.
    fn read_chemistry(&self, project: &mut Project) -> Result<()>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TankData {
    pub id: String,
    #[serde(default)]
    pub initial_volume: f64,
    #[serde(default)]
    pub mix_model: MixModel,
    #[serde(default)]
    pub mix_volume: f64,
    /// Zero-area tank.
    #[serde(default)]
    pub reservoir: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkData {
    pub id: String,
    pub start: String,
    pub end: String,
    #[serde(default)]
    pub length: f64,
    #[serde(default)]
    pub diameter: f64,
    #[serde(default)]
    pub roughness: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpeciesData {
    pub id: String,
    #[serde(default)]
    pub kind: SpeciesKind,
    #[serde(default)]
    pub units: MassUnits,
    #[serde(default)]
    pub a_tol: f64,
    #[serde(default)]
    pub r_tol: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoefficientData {
    pub id: String,
    #[serde(default)]
    pub value: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TermData {
    pub id: String,
    pub equation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpressionData {
    pub species: String,
    pub class: ExprClass,
    pub kind: ExprKind,
    pub equation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternData {
    pub id: String,
    #[serde(default)]
    pub multipliers: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceData {
    pub node: String,
    pub species: String,
    pub kind: SourceKind,
    pub strength: f64,
    #[serde(default)]
    pub pattern: Option<String>,
}

/// Initial quality (`scope` GLOBAL, NODE or LINK) or a local parameter value
/// (`scope` PIPE or TANK).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScopedValue {
    pub scope: String,
    pub name: String,
    pub value: f64,
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportData {
    pub kind: String,
    #[serde(default)]
    pub id: String,
    #[serde(default = "default_precision")]
    pub precision: i32,
}

fn default_precision() -> i32 {
    2
}

/// A whole project as one JSON document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectData {
    pub options: Options,
    pub nodes: Vec<String>,
    pub tanks: Vec<TankData>,
    pub links: Vec<LinkData>,
    pub species: Vec<SpeciesData>,
    pub parameters: Vec<CoefficientData>,
    pub constants: Vec<CoefficientData>,
    pub terms: Vec<TermData>,
    pub expressions: Vec<ExpressionData>,
    pub patterns: Vec<PatternData>,
    pub sources: Vec<SourceData>,
    pub quality: Vec<ScopedValue>,
    pub local_parameters: Vec<ScopedValue>,
    pub report: Vec<ReportData>,
}

impl ProjectData {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| MsxError::Input(e.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| MsxError::Input(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| MsxError::Input(e.to_string()))
    }
}

impl NetworkLoader for ProjectData {
    fn counts(&self) -> [usize; ObjectType::COUNT] {
        let mut counts = [0; ObjectType::COUNT];
        counts[ObjectType::Node.index()] = self.nodes.len() + self.tanks.len();
        counts[ObjectType::Link.index()] = self.links.len();
        counts[ObjectType::Tank.index()] = self.tanks.len();
        counts[ObjectType::Species.index()] = self.species.len();
        counts[ObjectType::Term.index()] = self.terms.len();
        counts[ObjectType::Parameter.index()] = self.parameters.len();
        counts[ObjectType::Constant.index()] = self.constants.len();
        counts[ObjectType::Pattern.index()] = self.patterns.len();
        counts
    }

    fn options(&self) -> Options {
        self.options.clone()
    }

    fn read_network(&self, project: &mut Project) -> Result<()> {
        for id in &self.nodes {
            project.add_node(id)?;
        }
        for t in &self.tanks {
            if t.reservoir {
                project.add_reservoir(&t.id, t.initial_volume, t.mix_model, t.mix_volume)?;
            } else {
                project.add_tank(&t.id, t.initial_volume, t.mix_model, t.mix_volume)?;
            }
        }
        for l in &self.links {
            project.add_link(&l.id, &l.start, &l.end, l.length, l.diameter, l.roughness)?;
        }
        Ok(())
    }

    fn read_chemistry(&self, project: &mut Project) -> Result<()> {
        // 1. Objects that own variable codes
        for s in &self.species {
            project.add_species(&s.id, s.kind, s.units, s.a_tol, s.r_tol)?;
        }
        for p in &self.parameters {
            project.add_coefficient(ObjectType::Parameter, &p.id, p.value)?;
        }
        for c in &self.constants {
            project.add_coefficient(ObjectType::Constant, &c.id, c.value)?;
        }
        for t in &self.terms {
            project.add_term(&t.id, &t.equation)?;
        }

        // 2. Expressions and patterns
        for e in &self.expressions {
            let class = match e.class {
                ExprClass::Pipe => ObjectType::Link,
                ExprClass::Tank => ObjectType::Tank,
            };
            project.add_expression(class, e.kind, &e.species, &e.equation)?;
        }
        for p in &self.patterns {
            let index = project.add_pattern(&p.id)?;
            project.set_pattern(index, &p.multipliers)?;
        }

        // 3. Values attached to network objects
        for s in &self.sources {
            project.add_source(s.kind, &s.node, &s.species, s.strength, s.pattern.as_deref())?;
        }
        for q in &self.quality {
            project.add_quality(&q.scope, &q.name, q.value, &q.id)?;
        }
        for p in &self.local_parameters {
            project.add_parameter(&p.scope, &p.name, p.value, &p.id)?;
        }
        for r in &self.report {
            project.set_report(&r.kind, &r.id, r.precision)?;
        }
        Ok(())
    }
}
