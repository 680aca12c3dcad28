//! Strategy parameter tuples, ranges and grids.
//!
//! - `StrategyParams`: one concrete binding of the five parameters.
//! - `ParamKey`: canonical string identity of a tuple, usable as a map/set key.
//! - `ParamRange` / `ParamRanges`: the user-edited `{min, max, step}` ranges.
//! - `OptimizerGrids`: per-parameter candidate sequences; their Cartesian
//!   product is the sweep's search space.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The five strategy parameters, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamName {
    #[serde(rename = "MA")]
    Ma,
    #[serde(rename = "DROP")]
    Drop,
    #[serde(rename = "CHG4")]
    Chg4,
    #[serde(rename = "RET3")]
    Ret3,
    #[serde(rename = "SPREAD_LVL")]
    SpreadLvl,
}

impl ParamName {
    pub const ALL: [ParamName; 5] = [
        ParamName::Ma,
        ParamName::Drop,
        ParamName::Chg4,
        ParamName::Ret3,
        ParamName::SpreadLvl,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ParamName::Ma => "MA",
            ParamName::Drop => "DROP",
            ParamName::Chg4 => "CHG4",
            ParamName::Ret3 => "RET3",
            ParamName::SpreadLvl => "SPREAD_LVL",
        }
    }

    /// Rounding granularity used when expanding this parameter's range.
    ///
    /// `MA` is a bar count and expands on whole numbers.
    pub fn grid_decimals(self) -> u32 {
        match self {
            ParamName::Ma => 0,
            _ => 6,
        }
    }

    /// Display precision for result tables.
    pub fn display_decimals(self) -> usize {
        match self {
            ParamName::Ma => 0,
            ParamName::Drop | ParamName::Chg4 => 3,
            ParamName::Ret3 => 4,
            ParamName::SpreadLvl => 1,
        }
    }
}

impl fmt::Display for ParamName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One concrete point in parameter space.
///
/// Equality is exact, field-wise: two tuples are the same point iff every
/// field matches. Use [`StrategyParams::key`] when a hashable identity is
/// needed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyParams {
    #[serde(rename = "MA")]
    pub ma: i64,
    #[serde(rename = "DROP")]
    pub drop: f64,
    #[serde(rename = "CHG4")]
    pub chg4: f64,
    #[serde(rename = "RET3")]
    pub ret3: f64,
    #[serde(rename = "SPREAD_LVL")]
    pub spread_lvl: f64,
}

impl StrategyParams {
    pub fn get(&self, name: ParamName) -> f64 {
        match name {
            ParamName::Ma => self.ma as f64,
            ParamName::Drop => self.drop,
            ParamName::Chg4 => self.chg4,
            ParamName::Ret3 => self.ret3,
            ParamName::SpreadLvl => self.spread_lvl,
        }
    }

    /// Set one field. `MA` is rounded to the nearest integer.
    pub fn set(&mut self, name: ParamName, value: f64) {
        match name {
            ParamName::Ma => self.ma = value.round() as i64,
            ParamName::Drop => self.drop = value,
            ParamName::Chg4 => self.chg4 = value,
            ParamName::Ret3 => self.ret3 = value,
            ParamName::SpreadLvl => self.spread_lvl = value,
        }
    }

    /// Canonical identity: `MA=50|DROP=0.017|CHG4=0.165|RET3=-0.021|SPREAD_LVL=7`.
    ///
    /// Floats use the shortest round-trip representation, so two tuples have
    /// the same key iff they compare equal (`-0.0` and `0.0` share a key).
    pub fn key(&self) -> ParamKey {
        let parts: Vec<String> = ParamName::ALL
            .iter()
            .map(|&name| {
                let v = self.get(name);
                let v = if v == 0.0 { 0.0 } else { v };
                format!("{}={}", name.as_str(), v)
            })
            .collect();
        ParamKey(parts.join("|"))
    }

    /// BLAKE3 hex digest of the canonical key.
    pub fn fingerprint(&self) -> String {
        blake3::hash(self.key().0.as_bytes()).to_hex().to_string()
    }
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            ma: 50,
            drop: 0.017,
            chg4: 0.165,
            ret3: -0.021,
            spread_lvl: 7.0,
        }
    }
}

impl fmt::Display for StrategyParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MA={} DROP={} CHG4={} RET3={} SPREAD_LVL={}",
            self.ma, self.drop, self.chg4, self.ret3, self.spread_lvl
        )
    }
}

/// Hashable canonical identity of a [`StrategyParams`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParamKey(pub String);

impl fmt::Display for ParamKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A `{min, max, step}` range for one parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl ParamRange {
    pub fn new(min: f64, max: f64, step: f64) -> Self {
        Self { min, max, step }
    }

    /// Degenerate range holding a single value.
    pub fn point(value: f64, step: f64) -> Self {
        Self {
            min: value,
            max: value,
            step,
        }
    }
}

/// The five named ranges edited by the user.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamRanges {
    #[serde(rename = "MA")]
    pub ma: ParamRange,
    #[serde(rename = "DROP")]
    pub drop: ParamRange,
    #[serde(rename = "CHG4")]
    pub chg4: ParamRange,
    #[serde(rename = "RET3")]
    pub ret3: ParamRange,
    #[serde(rename = "SPREAD_LVL")]
    pub spread_lvl: ParamRange,
}

impl ParamRanges {
    pub fn get(&self, name: ParamName) -> &ParamRange {
        match name {
            ParamName::Ma => &self.ma,
            ParamName::Drop => &self.drop,
            ParamName::Chg4 => &self.chg4,
            ParamName::Ret3 => &self.ret3,
            ParamName::SpreadLvl => &self.spread_lvl,
        }
    }

    pub fn get_mut(&mut self, name: ParamName) -> &mut ParamRange {
        match name {
            ParamName::Ma => &mut self.ma,
            ParamName::Drop => &mut self.drop,
            ParamName::Chg4 => &mut self.chg4,
            ParamName::Ret3 => &mut self.ret3,
            ParamName::SpreadLvl => &mut self.spread_lvl,
        }
    }
}

/// Per-parameter candidate sequences submitted to a sweep.
///
/// Serialized flat into the sweep request as `MA: [...]`, `DROP: [...]`, ...
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerGrids {
    #[serde(rename = "MA")]
    pub ma: Vec<i64>,
    #[serde(rename = "DROP")]
    pub drop: Vec<f64>,
    #[serde(rename = "CHG4")]
    pub chg4: Vec<f64>,
    #[serde(rename = "RET3")]
    pub ret3: Vec<f64>,
    #[serde(rename = "SPREAD_LVL")]
    pub spread_lvl: Vec<f64>,
}

impl OptimizerGrids {
    /// One-point grid evaluating exactly `params`.
    pub fn singleton(params: &StrategyParams) -> Self {
        Self {
            ma: vec![params.ma],
            drop: vec![params.drop],
            chg4: vec![params.chg4],
            ret3: vec![params.ret3],
            spread_lvl: vec![params.spread_lvl],
        }
    }

    fn lens(&self) -> [usize; 5] {
        [
            self.ma.len(),
            self.drop.len(),
            self.chg4.len(),
            self.ret3.len(),
            self.spread_lvl.len(),
        ]
    }

    /// Size of the Cartesian product (saturating).
    pub fn combinations(&self) -> usize {
        self.lens()
            .iter()
            .fold(1usize, |acc, &n| acc.saturating_mul(n))
    }

    pub fn is_empty(&self) -> bool {
        self.combinations() == 0
    }

    pub fn contains(&self, params: &StrategyParams) -> bool {
        self.ma.contains(&params.ma)
            && self.drop.contains(&params.drop)
            && self.chg4.contains(&params.chg4)
            && self.ret3.contains(&params.ret3)
            && self.spread_lvl.contains(&params.spread_lvl)
    }

    /// Iterate the Cartesian product; `SPREAD_LVL` varies fastest.
    pub fn points(&self) -> GridPoints<'_> {
        GridPoints {
            grids: self,
            odometer: Odometer::new(self),
        }
    }

    /// Owning version of [`points`](Self::points). Points are produced on
    /// demand, so the product is never held in memory.
    pub fn into_points(self) -> IntoGridPoints {
        IntoGridPoints {
            odometer: Odometer::new(&self),
            grids: self,
        }
    }
}

/// Per-axis indices into an [`OptimizerGrids`], last axis fastest.
#[derive(Debug, Clone)]
struct Odometer {
    idx: [usize; 5],
    done: bool,
}

impl Odometer {
    fn new(grids: &OptimizerGrids) -> Self {
        Self {
            idx: [0; 5],
            done: grids.is_empty(),
        }
    }

    fn next_point(&mut self, g: &OptimizerGrids) -> Option<StrategyParams> {
        if self.done {
            return None;
        }
        let point = StrategyParams {
            ma: g.ma[self.idx[0]],
            drop: g.drop[self.idx[1]],
            chg4: g.chg4[self.idx[2]],
            ret3: g.ret3[self.idx[3]],
            spread_lvl: g.spread_lvl[self.idx[4]],
        };

        let lens = g.lens();
        let mut pos = 5;
        loop {
            if pos == 0 {
                self.done = true;
                break;
            }
            pos -= 1;
            self.idx[pos] += 1;
            if self.idx[pos] < lens[pos] {
                break;
            }
            self.idx[pos] = 0;
        }

        Some(point)
    }
}

/// Odometer over the points of a borrowed [`OptimizerGrids`].
#[derive(Debug, Clone)]
pub struct GridPoints<'a> {
    grids: &'a OptimizerGrids,
    odometer: Odometer,
}

impl Iterator for GridPoints<'_> {
    type Item = StrategyParams;

    fn next(&mut self) -> Option<StrategyParams> {
        self.odometer.next_point(self.grids)
    }
}

/// Odometer over the points of an owned [`OptimizerGrids`].
#[derive(Debug, Clone)]
pub struct IntoGridPoints {
    grids: OptimizerGrids,
    odometer: Odometer,
}

impl Iterator for IntoGridPoints {
    type Item = StrategyParams;

    fn next(&mut self) -> Option<StrategyParams> {
        self.odometer.next_point(&self.grids)
    }
}

/// Numeric input coercion: anything unparseable (or non-finite) becomes `0.0`.
pub fn coerce_number(input: &str) -> f64 {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}
