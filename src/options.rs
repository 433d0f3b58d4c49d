//! Project-wide settings and the keyword parser used by `add_option`.

use serde::{Deserialize, Serialize};

use crate::error::{MsxError, Result};

/// Matches `word` against a keyword list. A keyword matches when the trimmed,
/// upper-cased input starts with it, so "DAYS" selects "DAY".
pub fn match_keyword(word: &str, keywords: &[&str]) -> Option<usize> {
    let w = word.trim().to_ascii_uppercase();
    if w.is_empty() {
        return None;
    }
    keywords.iter().position(|k| w.starts_with(k))
}

macro_rules! keyword_enum {
    ($name:ident { $($variant:ident => $word:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
        #[serde(rename_all = "UPPERCASE")]
        pub enum $name {
            #[default]
            $($variant),+
        }

        impl $name {
            pub const WORDS: &'static [&'static str] = &[$($word),+];
            const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn from_keyword(word: &str) -> Option<Self> {
                match_keyword(word, Self::WORDS).map(|i| Self::ALL[i])
            }

            pub fn keyword(&self) -> &'static str {
                Self::WORDS[*self as usize]
            }
        }
    };
}

// The first listed variant is the default.
keyword_enum!(AreaUnits { Ft2 => "FT2", M2 => "M2", Cm2 => "CM2" });
keyword_enum!(RateUnits { Day => "DAY", Sec => "SEC", Min => "MIN", Hr => "HR" });
keyword_enum!(Solver { Eul => "EUL", Rk5 => "RK5", Ros2 => "ROS2" });
keyword_enum!(Coupling { None => "NONE", Full => "FULL" });
keyword_enum!(Compiler { None => "NONE", Vc => "VC", Gc => "GC" });
keyword_enum!(UnitSystem { Us => "US", Si => "SI" });
keyword_enum!(FlowUnits {
    Gpm => "GPM", Cfs => "CFS", Mgd => "MGD", Imgd => "IMGD", Afd => "AFD",
    Lps => "LPS", Lpm => "LPM", Mld => "MLD", Cmh => "CMH", Cmd => "CMD",
});

impl RateUnits {
    /// Seconds per rate time unit.
    pub fn seconds(&self) -> f64 {
        match self {
            RateUnits::Sec => 1.0,
            RateUnits::Min => 60.0,
            RateUnits::Hr => 3600.0,
            RateUnits::Day => 86400.0,
        }
    }
}

impl FlowUnits {
    pub fn is_metric(&self) -> bool {
        matches!(
            self,
            FlowUnits::Lps | FlowUnits::Lpm | FlowUnits::Mld | FlowUnits::Cmh | FlowUnits::Cmd
        )
    }
}

/// The option selected by `add_option`. Integer codes follow the legacy toolkit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionType {
    AreaUnits = 0,
    RateUnits = 1,
    Solver = 2,
    Coupling = 3,
    Timestep = 4,
    Rtol = 5,
    Atol = 6,
    Compiler = 7,
}

impl OptionType {
    pub fn from_code(code: i32) -> Option<Self> {
        use OptionType::*;
        [AreaUnits, RateUnits, Solver, Coupling, Timestep, Rtol, Atol, Compiler]
            .get(usize::try_from(code).ok()?)
            .copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub title: String,
    pub unit_system: UnitSystem,
    pub flow_units: FlowUnits,
    pub area_units: AreaUnits,
    pub rate_units: RateUnits,
    pub solver: Solver,
    pub coupling: Coupling,
    pub compiler: Compiler,
    /// Quality time step (seconds).
    pub quality_step: u64,
    /// Reporting step (seconds).
    pub report_step: u64,
    pub report_start: u64,
    pub duration: u64,
    pub default_rtol: f64,
    pub default_atol: f64,
    pub page_size: i32,
    pub report_file: String,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            title: String::new(),
            unit_system: UnitSystem::Us,
            flow_units: FlowUnits::Gpm,
            area_units: AreaUnits::Ft2,
            rate_units: RateUnits::Day,
            solver: Solver::Eul,
            coupling: Coupling::None,
            compiler: Compiler::None,
            quality_step: 300,
            report_step: 3600,
            report_start: 0,
            duration: 0,
            default_rtol: 0.001,
            default_atol: 0.01,
            page_size: 0,
            report_file: String::new(),
        }
    }
}

impl Options {
    /// Applies one textual option value. Keyword options fail with
    /// `Keyword`, numeric options with `Number`.
    pub fn apply(&mut self, option: OptionType, value: &str) -> Result<()> {
        let keyword_err = || MsxError::Keyword(value.to_string());
        match option {
            OptionType::AreaUnits => {
                self.area_units = AreaUnits::from_keyword(value).ok_or_else(keyword_err)?;
            }
            OptionType::RateUnits => {
                self.rate_units = RateUnits::from_keyword(value).ok_or_else(keyword_err)?;
            }
            OptionType::Solver => {
                self.solver = Solver::from_keyword(value).ok_or_else(keyword_err)?;
            }
            OptionType::Coupling => {
                self.coupling = Coupling::from_keyword(value).ok_or_else(keyword_err)?;
            }
            OptionType::Compiler => {
                self.compiler = Compiler::from_keyword(value).ok_or_else(keyword_err)?;
            }
            OptionType::Timestep => {
                let step = parse_leading_int(value)
                    .filter(|&k| k > 0)
                    .ok_or_else(|| MsxError::Number(value.to_string()))?;
                self.quality_step = step as u64;
            }
            OptionType::Rtol => self.default_rtol = parse_number(value)?,
            OptionType::Atol => self.default_atol = parse_number(value)?,
        }
        Ok(())
    }
}

pub(crate) fn parse_number(value: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|_| MsxError::Number(value.to_string()))
}

pub(crate) fn parse_integer(value: &str) -> Result<i32> {
    value
        .trim()
        .parse::<i32>()
        .map_err(|_| MsxError::Number(value.to_string()))
}

/// `atoi`-style: optional sign then leading digits, trailing junk ignored.
fn parse_leading_int(value: &str) -> Option<i64> {
    let s = value.trim_start();
    let (sign, digits) = match s.as_bytes().first() {
        Some(b'-') => (-1, &s[1..]),
        Some(b'+') => (1, &s[1..]),
        _ => (1, s),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    if end == 0 {
        return Some(0);
    }
    digits[..end].parse::<i64>().ok().map(|v| sign * v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let o = Options::default();
        assert_eq!(o.flow_units, FlowUnits::Gpm);
        assert_eq!(o.rate_units, RateUnits::Day);
        assert_eq!(o.quality_step, 300);
        assert_eq!(o.report_step, 3600);
        assert_eq!(o.default_rtol, 0.001);
        assert_eq!(o.default_atol, 0.01);
    }

    #[rstest]
    #[case(OptionType::AreaUnits, "m2")]
    #[case(OptionType::RateUnits, " hr ")]
    #[case(OptionType::Solver, "ROS2")]
    #[case(OptionType::Coupling, "full")]
    #[case(OptionType::Compiler, "GC")]
    #[case(OptionType::Timestep, "60")]
    #[case(OptionType::Rtol, "1e-4")]
    fn test_apply_accepts(#[case] option: OptionType, #[case] value: &str) {
        let mut o = Options::default();
        o.apply(option, value).unwrap();
        assert_ne!(o, Options::default());
    }

    #[rstest]
    #[case(OptionType::AreaUnits, "acres", 203)]
    #[case(OptionType::Solver, "", 203)]
    #[case(OptionType::Compiler, "clang", 203)]
    #[case(OptionType::Timestep, "0", 204)]
    #[case(OptionType::Timestep, "abc", 204)]
    #[case(OptionType::Atol, "tiny", 204)]
    fn test_apply_rejects(#[case] option: OptionType, #[case] value: &str, #[case] code: i32) {
        let mut o = Options::default();
        let err = o.apply(option, value).unwrap_err();
        assert_eq!(err.code(), code);
        assert_eq!(o, Options::default());
    }

    #[test]
    fn test_option_codes() {
        assert_eq!(OptionType::from_code(7), Some(OptionType::Compiler));
        assert_eq!(OptionType::from_code(8), None);
        assert_eq!(OptionType::from_code(-1), None);
    }

    #[test]
    fn test_partial_json_block_uses_defaults() {
        let o: Options = serde_json::from_str(r#"{"flow_units": "LPS", "rate_units": "HR"}"#).unwrap();
        assert_eq!(o.flow_units, FlowUnits::Lps);
        assert!(o.flow_units.is_metric());
        assert_eq!(o.rate_units.seconds(), 3600.0);
        assert_eq!(o.quality_step, 300);
    }
}
