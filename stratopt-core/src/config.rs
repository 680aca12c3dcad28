//! Backend-owned application config: default params and default ranges.

use serde::{Deserialize, Serialize};

use crate::params::{ParamName, ParamRange, ParamRanges, StrategyParams};

/// A parameter's default value with its label and help text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDef {
    pub name: String,
    pub value: f64,
    #[serde(default, alias = "description")]
    pub desc: String,
}

impl ParamDef {
    fn new(name: ParamName, value: f64, desc: &str) -> Self {
        Self {
            name: name.as_str().to_string(),
            value,
            desc: desc.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefaultParams {
    #[serde(rename = "MA")]
    pub ma: ParamDef,
    #[serde(rename = "DROP")]
    pub drop: ParamDef,
    #[serde(rename = "CHG4")]
    pub chg4: ParamDef,
    #[serde(rename = "RET3")]
    pub ret3: ParamDef,
    #[serde(rename = "SPREAD_LVL")]
    pub spread_lvl: ParamDef,
}

impl DefaultParams {
    pub fn get(&self, name: ParamName) -> &ParamDef {
        match name {
            ParamName::Ma => &self.ma,
            ParamName::Drop => &self.drop,
            ParamName::Chg4 => &self.chg4,
            ParamName::Ret3 => &self.ret3,
            ParamName::SpreadLvl => &self.spread_lvl,
        }
    }

    pub fn get_mut(&mut self, name: ParamName) -> &mut ParamDef {
        match name {
            ParamName::Ma => &mut self.ma,
            ParamName::Drop => &mut self.drop,
            ParamName::Chg4 => &mut self.chg4,
            ParamName::Ret3 => &mut self.ret3,
            ParamName::SpreadLvl => &mut self.spread_lvl,
        }
    }

    /// The default values as a param tuple.
    pub fn to_params(&self) -> StrategyParams {
        let mut params = StrategyParams::default();
        for name in ParamName::ALL {
            params.set(name, self.get(name).value);
        }
        params
    }
}

/// Full config object; `PUT/POST config` replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub default_params: DefaultParams,
    pub default_ranges: ParamRanges,
}

impl AppConfig {
    /// Built-in config used before (or instead of) the backend's.
    pub fn fallback() -> Self {
        Self {
            default_params: DefaultParams {
                ma: ParamDef::new(ParamName::Ma, 50.0, "Moving average length (weeks)"),
                drop: ParamDef::new(ParamName::Drop, 0.017, "Drawdown from MA that triggers a sell"),
                chg4: ParamDef::new(ParamName::Chg4, 0.165, "4-week spread change threshold"),
                ret3: ParamDef::new(ParamName::Ret3, -0.021, "3-week return threshold"),
                spread_lvl: ParamDef::new(ParamName::SpreadLvl, 7.0, "Credit spread level threshold"),
            },
            default_ranges: ParamRanges {
                ma: ParamRange::new(50.0, 50.0, 5.0),
                drop: ParamRange::new(0.016, 0.016, 0.001),
                chg4: ParamRange::new(0.16, 0.16, 0.005),
                ret3: ParamRange::new(-0.0225, -0.0225, 0.0005),
                spread_lvl: ParamRange::new(7.0, 7.0, 0.1),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_defaults_match_strategy_defaults() {
        let config = AppConfig::fallback();
        assert_eq!(config.default_params.to_params(), StrategyParams::default());
        let grids = config.default_ranges.to_grids().unwrap();
        assert_eq!(grids.combinations(), 1);
    }

    #[test]
    fn parses_backend_config() {
        let json = r#"{
            "defaultParams": {
                "MA": {"name": "MA", "value": 45, "desc": "ma"},
                "DROP": {"name": "DROP", "value": 0.02, "description": "drop"},
                "CHG4": {"name": "CHG4", "value": 0.15},
                "RET3": {"name": "RET3", "value": -0.02},
                "SPREAD_LVL": {"name": "SPREAD_LVL", "value": 7.2}
            },
            "defaultRanges": {
                "MA": {"min": 40, "max": 60, "step": 5},
                "DROP": {"min": 0.01, "max": 0.03, "step": 0.01},
                "CHG4": {"min": 0.15, "max": 0.15, "step": 0.01},
                "RET3": {"min": -0.02, "max": -0.02, "step": 0.001},
                "SPREAD_LVL": {"min": 7.0, "max": 7.0, "step": 0.1}
            }
        }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.default_params.drop.desc, "drop");
        assert_eq!(config.default_params.chg4.desc, "");
        assert_eq!(config.default_params.to_params().ma, 45);
        assert_eq!(config.default_ranges.ma.max, 60.0);

        let out = serde_json::to_value(&config).unwrap();
        assert!(out.get("defaultParams").is_some());
        assert!(out.get("defaultRanges").is_some());
    }
}
