//! Argument parsing shared by several commands: `min:max:step` ranges,
//! `NAME=value` assignments and the run options.

use anyhow::{anyhow, bail, Result};
use clap::{Args, ValueEnum};

use stratopt_core::{
    coerce_number, InputType, ParamName, ParamRange, ParamRanges, Settings, StartPosition,
    StrategyParams,
};

/// Parse `MA`, `ma`, `spread_lvl`, ...
pub fn parse_param_name(s: &str) -> Result<ParamName> {
    ParamName::ALL
        .into_iter()
        .find(|name| name.as_str().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| anyhow!("unknown parameter '{s}'. Valid: MA, DROP, CHG4, RET3, SPREAD_LVL"))
}

/// Parse `min:max:step`, or a single value for a one-point range.
///
/// Validity of the range itself (zero step, inversion) is left to grid
/// expansion so the error names the parameter.
pub fn parse_range(s: &str) -> Result<ParamRange> {
    let parts: Vec<&str> = s.split(':').collect();
    let num = |p: &str| -> Result<f64> {
        p.trim()
            .parse::<f64>()
            .map_err(|_| anyhow!("'{p}' is not a number in range '{s}'"))
    };
    match parts.as_slice() {
        [value] => Ok(ParamRange::point(num(value)?, 1.0)),
        [min, max, step] => Ok(ParamRange::new(num(min)?, num(max)?, num(step)?)),
        _ => bail!("range '{s}' must be min:max:step or a single value"),
    }
}

/// Parse `NAME=value` into a parameter and its value.
pub fn parse_assignment(s: &str) -> Result<(ParamName, String)> {
    let Some((name, value)) = s.split_once('=') else {
        bail!("expected NAME=VALUE, got '{s}'");
    };
    Ok((parse_param_name(name)?, value.trim().to_string()))
}

/// Per-parameter range overrides applied on top of the config's default ranges.
#[derive(Args, Debug, Clone, Default)]
pub struct RangeArgs {
    /// MA range, `min:max:step` (or a single value).
    #[arg(long, value_name = "RANGE")]
    pub ma: Option<String>,

    /// DROP range.
    #[arg(long, value_name = "RANGE")]
    pub drop: Option<String>,

    /// CHG4 range.
    #[arg(long, value_name = "RANGE")]
    pub chg4: Option<String>,

    /// RET3 range. Negative values need `=`, e.g. `--ret3=-0.03:-0.02:0.005`.
    #[arg(long, value_name = "RANGE", allow_hyphen_values = true)]
    pub ret3: Option<String>,

    /// SPREAD_LVL range.
    #[arg(long, value_name = "RANGE")]
    pub spread_lvl: Option<String>,
}

impl RangeArgs {
    fn overrides(&self) -> [(ParamName, Option<&str>); 5] {
        [
            (ParamName::Ma, self.ma.as_deref()),
            (ParamName::Drop, self.drop.as_deref()),
            (ParamName::Chg4, self.chg4.as_deref()),
            (ParamName::Ret3, self.ret3.as_deref()),
            (ParamName::SpreadLvl, self.spread_lvl.as_deref()),
        ]
    }

    /// A one-point override keeps the default range's step.
    pub fn apply(&self, ranges: &mut ParamRanges) -> Result<()> {
        for (name, raw) in self.overrides() {
            let Some(raw) = raw else { continue };
            let parsed = parse_range(raw).map_err(|e| anyhow!("--{}: {e}", flag(name)))?;
            let target = ranges.get_mut(name);
            if raw.contains(':') {
                *target = parsed;
            } else {
                *target = ParamRange::point(parsed.min, target.step);
            }
        }
        Ok(())
    }
}

/// Per-parameter value overrides applied on top of the config's default params.
#[derive(Args, Debug, Clone, Default)]
pub struct ParamArgs {
    /// Parameter value, `NAME=value`; repeatable (e.g. `--set MA=55 --set DROP=0.02`).
    #[arg(long = "set", value_name = "NAME=VALUE", allow_hyphen_values = true)]
    pub set: Vec<String>,
}

impl ParamArgs {
    /// Unparseable numbers become 0, as in the interactive editors.
    pub fn apply(&self, params: &mut StrategyParams) -> Result<()> {
        for raw in &self.set {
            let (name, value) = parse_assignment(raw)?;
            params.set(name, coerce_number(&value));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InputArg {
    Csv,
    Api,
}

impl From<InputArg> for InputType {
    fn from(arg: InputArg) -> Self {
        match arg {
            InputArg::Csv => InputType::Csv,
            InputArg::Api => InputType::Api,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StartArg {
    Invested,
    Cash,
}

impl From<StartArg> for StartPosition {
    fn from(arg: StartArg) -> Self {
        match arg {
            StartArg::Invested => StartPosition::Invested,
            StartArg::Cash => StartPosition::Cash,
        }
    }
}

/// Run options. Anything not given comes from the saved settings.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Price data source.
    #[arg(long, value_enum)]
    pub input_type: Option<InputArg>,

    /// Annual return on cash while out of the market.
    #[arg(long)]
    pub cash_rate: Option<f64>,

    /// Start invested or in cash.
    #[arg(long, value_enum)]
    pub start: Option<StartArg>,
}

/// Run options after falling back to the saved settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedRun {
    pub input_type: InputType,
    pub cash_rate: f64,
    pub start_invested: StartPosition,
}

impl RunArgs {
    pub fn resolve(&self, settings: &Settings) -> ResolvedRun {
        ResolvedRun {
            input_type: self.input_type.map(Into::into).unwrap_or(settings.input_type),
            cash_rate: self.cash_rate.unwrap_or(settings.cash_rate),
            start_invested: self.start.map(Into::into).unwrap_or(settings.start_invested),
        }
    }
}

fn flag(name: ParamName) -> String {
    name.as_str().to_ascii_lowercase().replace('_', "-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratopt_core::AppConfig;

    #[test]
    fn parses_full_and_single_value_ranges() {
        let r = parse_range("0.01:0.02:0.005").unwrap();
        assert_eq!(r, ParamRange::new(0.01, 0.02, 0.005));

        let r = parse_range("-0.0225").unwrap();
        assert_eq!((r.min, r.max), (-0.0225, -0.0225));

        assert!(parse_range("1:2").is_err());
        assert!(parse_range("a:2:1").is_err());
    }

    #[test]
    fn param_names_are_case_insensitive() {
        assert_eq!(parse_param_name("spread_lvl").unwrap(), ParamName::SpreadLvl);
        assert_eq!(parse_param_name("MA").unwrap(), ParamName::Ma);
        assert!(parse_param_name("SPREAD").is_err());
    }

    #[test]
    fn range_overrides_replace_only_named_params() {
        // GIVEN: the built-in default ranges
        let mut ranges = AppConfig::fallback().default_ranges;
        let args = RangeArgs {
            ma: Some("40:60:10".into()),
            drop: Some("0.02".into()),
            ..RangeArgs::default()
        };

        // WHEN: overrides are applied
        args.apply(&mut ranges).unwrap();

        // THEN: MA is replaced, DROP collapses to a point keeping its step,
        // the rest are untouched
        assert_eq!(ranges.ma, ParamRange::new(40.0, 60.0, 10.0));
        assert_eq!(ranges.drop, ParamRange::new(0.02, 0.02, 0.001));
        assert_eq!(ranges.chg4, AppConfig::fallback().default_ranges.chg4);
    }

    #[test]
    fn bad_range_names_the_flag() {
        let mut ranges = AppConfig::fallback().default_ranges;
        let args = RangeArgs {
            spread_lvl: Some("x:1:1".into()),
            ..RangeArgs::default()
        };
        let err = args.apply(&mut ranges).unwrap_err().to_string();
        assert!(err.starts_with("--spread-lvl:"), "{err}");
    }

    #[test]
    fn param_overrides_coerce_like_the_editors() {
        let mut params = StrategyParams::default();
        let args = ParamArgs {
            set: vec!["MA=55.4".into(), "ret3=-0.03".into(), "DROP=abc".into()],
        };
        args.apply(&mut params).unwrap();
        assert_eq!(params.ma, 55);
        assert_eq!(params.ret3, -0.03);
        assert_eq!(params.drop, 0.0);
    }

    #[test]
    fn run_options_fall_back_to_settings() {
        let settings = Settings::default();
        let resolved = RunArgs {
            cash_rate: Some(0.01),
            ..RunArgs::default()
        }
        .resolve(&settings);
        assert_eq!(resolved.cash_rate, 0.01);
        assert_eq!(resolved.input_type, settings.input_type);
        assert_eq!(resolved.start_invested, settings.start_invested);

        let resolved = RunArgs {
            start: Some(StartArg::Cash),
            input_type: Some(InputArg::Api),
            ..RunArgs::default()
        }
        .resolve(&settings);
        assert_eq!(resolved.start_invested, StartPosition::Cash);
        assert_eq!(resolved.input_type, InputType::Api);
    }
}
