use crate::options::{AreaUnits, FlowUnits, Options, UnitSystem};
use crate::store::Registry;

const M_PER_FT: f64 = 0.3048;
const M3_PER_FT3: f64 = 0.028317;
const M2_PER_FT2: f64 = 0.09290304;
const CM2_PER_FT2: f64 = 929.0304;
const L_PER_FT3: f64 = 28.317;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitCategory {
    Length,
    Diameter,
    Area,
    Volume,
    Flow,
    Concentration,
    Rate,
}

impl UnitCategory {
    pub const COUNT: usize = 7;
}

/// Factors from user units to internal (US, per-second) units, indexed by
/// `UnitCategory`. User value = internal value * factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionTable {
    factors: [f64; UnitCategory::COUNT],
}

impl ConversionTable {
    pub fn new(options: &Options) -> Self {
        let si = options.unit_system == UnitSystem::Si || options.flow_units.is_metric();
        let (length, diameter, volume) = if si {
            (M_PER_FT, 1000.0 * M_PER_FT, M3_PER_FT3)
        } else {
            (1.0, 12.0, 1.0)
        };
        let area = match options.area_units {
            AreaUnits::Ft2 => 1.0,
            AreaUnits::M2 => M2_PER_FT2,
            AreaUnits::Cm2 => CM2_PER_FT2,
        };
        let flow = match options.flow_units {
            FlowUnits::Cfs => 1.0,
            FlowUnits::Gpm => 448.831,
            FlowUnits::Mgd => 0.64632,
            FlowUnits::Imgd => 0.5382,
            FlowUnits::Afd => 1.9837,
            FlowUnits::Lps => 28.317,
            FlowUnits::Lpm => 1699.0,
            FlowUnits::Mld => 2.4466,
            FlowUnits::Cmh => 101.94,
            FlowUnits::Cmd => 2446.6,
        };
        Self { factors: [length, diameter, area, volume, flow, L_PER_FT3, options.rate_units.seconds()] }
    }

    #[inline]
    pub fn factor(&self, category: UnitCategory) -> f64 {
        self.factors[category as usize]
    }
}

/// Rescales link geometry and tank volumes into internal units and fills
/// zero species tolerances from the project defaults.
///
/// Not idempotent: the caller runs it once per project.
pub fn convert(registry: &mut Registry, table: &ConversionTable, options: &Options) {
    let diameter = table.factor(UnitCategory::Diameter);
    let length = table.factor(UnitCategory::Length);
    let volume = table.factor(UnitCategory::Volume);

    for link in registry.links.iter_mut() {
        link.diam /= diameter;
        link.len /= length;
    }
    for tank in registry.tanks.iter_mut() {
        tank.v0 /= volume;
        tank.v_mix /= volume;
    }
    apply_default_tolerances(registry, options);
}

pub fn apply_default_tolerances(registry: &mut Registry, options: &Options) {
    for s in registry.species.iter_mut() {
        if s.r_tol == 0.0 {
            s.r_tol = options.default_rtol;
        }
        if s.a_tol == 0.0 {
            s.a_tol = options.default_atol;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::RateUnits;
    use crate::store::{MassUnits, MixModel, Species, SpeciesKind};
    use rstest::rstest;

    #[rstest]
    #[case(UnitSystem::Us, FlowUnits::Gpm, 1.0, 12.0, 448.831)]
    #[case(UnitSystem::Us, FlowUnits::Lps, M_PER_FT, 304.8, 28.317)]
    #[case(UnitSystem::Si, FlowUnits::Cmh, M_PER_FT, 304.8, 101.94)]
    fn test_factor_table(
        #[case] system: UnitSystem,
        #[case] flow: FlowUnits,
        #[case] length: f64,
        #[case] diameter: f64,
        #[case] flow_factor: f64,
    ) {
        let options = Options { unit_system: system, flow_units: flow, ..Options::default() };
        let table = ConversionTable::new(&options);
        assert_eq!(table.factor(UnitCategory::Length), length);
        assert!((table.factor(UnitCategory::Diameter) - diameter).abs() < 1e-9);
        assert_eq!(table.factor(UnitCategory::Flow), flow_factor);
        assert_eq!(table.factor(UnitCategory::Concentration), L_PER_FT3);
    }

    #[test]
    fn test_area_and_rate_factors() {
        let options = Options { area_units: AreaUnits::Cm2, rate_units: RateUnits::Hr, ..Options::default() };
        let table = ConversionTable::new(&options);
        assert_eq!(table.factor(UnitCategory::Area), CM2_PER_FT2);
        assert_eq!(table.factor(UnitCategory::Rate), 3600.0);
    }

    #[test]
    fn test_convert_rescales_geometry_and_fills_tolerances() {
        let options = Options::default();
        let mut reg = Registry::new();
        reg.push_node("J1".into()).unwrap();
        reg.push_tank("T1".into(), 1.0, 50.0, MixModel::Mix2, 10.0).unwrap();
        reg.push_link("P1".into(), 1, 2, 1000.0, 6.0, 100.0).unwrap();
        reg.reserve_species().unwrap();
        reg.commit_species(Species::new("S1".into(), SpeciesKind::Bulk, MassUnits::Mg, 0.0, 0.5));

        convert(&mut reg, &ConversionTable::new(&options), &options);

        let link = reg.link(1).unwrap();
        assert_eq!(link.diam, 0.5);
        assert_eq!(link.len, 1000.0);
        assert_eq!(reg.tank(1).unwrap().v0, 50.0);
        let s = reg.species_at(1).unwrap();
        assert_eq!(s.a_tol, 0.01);
        assert_eq!(s.r_tol, 0.5);
    }
}
