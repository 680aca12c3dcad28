//! Request bodies for the backend endpoints.

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::params::{OptimizerGrids, StrategyParams};

/// Where the backend loads its price data from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    #[default]
    Csv,
    Api,
}

impl InputType {
    pub fn toggle(self) -> Self {
        match self {
            InputType::Csv => InputType::Api,
            InputType::Api => InputType::Csv,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            InputType::Csv => "CSV",
            InputType::Api => "Live API",
        }
    }
}

impl fmt::Display for InputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            InputType::Csv => "csv",
            InputType::Api => "api",
        })
    }
}

/// Whether the backtest starts invested or in cash. On the wire this is `1` / `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartPosition {
    Cash,
    #[default]
    Invested,
}

impl StartPosition {
    pub fn as_flag(self) -> u8 {
        match self {
            StartPosition::Cash => 0,
            StartPosition::Invested => 1,
        }
    }

    pub fn toggle(self) -> Self {
        match self {
            StartPosition::Cash => StartPosition::Invested,
            StartPosition::Invested => StartPosition::Cash,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StartPosition::Cash => "Cash",
            StartPosition::Invested => "Invested",
        }
    }
}

impl Serialize for StartPosition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.as_flag())
    }
}

impl<'de> Deserialize<'de> for StartPosition {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match u8::deserialize(deserializer)? {
            0 => Ok(StartPosition::Cash),
            1 => Ok(StartPosition::Invested),
            other => Err(de::Error::custom(format!(
                "start position must be 0 or 1, got {other}"
            ))),
        }
    }
}

/// Body of the streaming sweep request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepRequest {
    pub ticker: String,
    #[serde(flatten)]
    pub grids: OptimizerGrids,
    pub start_invested: StartPosition,
    pub cash_rate: f64,
    pub input_type: InputType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuyHoldRequest {
    pub ticker: String,
    pub cash_rate: f64,
    pub input_type: InputType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRequest {
    pub ticker: String,
    pub params: StrategyParams,
    pub start_invested: StartPosition,
    pub cash_rate: f64,
    pub input_type: InputType,
}
