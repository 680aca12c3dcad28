//! Grid generation: expand `{min, max, step}` ranges into candidate sequences.
//!
//! Count is `round((max - min) / step) + 1`; value `i` is
//! `round(min + i * step, decimals)`. Expansion is a pure function of its
//! inputs, so an [`Expansion`] can be cloned to restart it.

use crate::error::GridError;
use crate::params::{OptimizerGrids, ParamName, ParamRange, ParamRanges};

/// Upper bound on points per axis. Anything larger is a typo, not a sweep.
pub const MAX_POINTS_PER_AXIS: usize = 100_000;

/// Round `value` to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Number of points a range expands to, or why it cannot be expanded.
pub fn point_count(range: &ParamRange) -> Result<usize, GridError> {
    let ParamRange { min, max, step } = *range;
    if !(min.is_finite() && max.is_finite() && step.is_finite()) {
        return Err(GridError::NonFinite { min, max, step });
    }
    if step == 0.0 {
        return Err(GridError::ZeroStep);
    }
    if max < min {
        return Err(GridError::InvertedRange { min, max, step });
    }

    let steps = ((max - min) / step).round();
    if steps < 0.0 {
        // Negative step walking away from `max`.
        return Err(GridError::InvertedRange { min, max, step });
    }
    if steps >= MAX_POINTS_PER_AXIS as f64 {
        return Err(GridError::TooManyPoints {
            count: steps as u64 + 1,
            limit: MAX_POINTS_PER_AXIS,
        });
    }
    Ok(steps as usize + 1)
}

/// Lazily expanded range. Finite, ordered and restartable via `Clone`.
#[derive(Debug, Clone)]
pub struct Expansion {
    min: f64,
    step: f64,
    decimals: u32,
    count: usize,
    next: usize,
}

impl Expansion {
    pub fn new(range: &ParamRange, decimals: u32) -> Result<Self, GridError> {
        let count = point_count(range)?;
        Ok(Self {
            min: range.min,
            step: range.step,
            decimals,
            count,
            next: 0,
        })
    }
}

impl Iterator for Expansion {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        if self.next >= self.count {
            return None;
        }
        let value = round_to(self.min + self.next as f64 * self.step, self.decimals);
        self.next += 1;
        Some(value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count - self.next;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Expansion {}

/// Expand a range into its concrete value sequence.
pub fn expand(range: &ParamRange, decimals: u32) -> Result<Vec<f64>, GridError> {
    Ok(Expansion::new(range, decimals)?.collect())
}

impl ParamRanges {
    /// Expand all five ranges into sweep grids.
    ///
    /// `MA` expands on whole numbers and is then rounded to an integer; the
    /// other four keep six decimals.
    pub fn to_grids(&self) -> Result<OptimizerGrids, GridError> {
        let axis = |name: ParamName| {
            expand(self.get(name), name.grid_decimals()).map_err(|e| e.for_param(name))
        };

        Ok(OptimizerGrids {
            ma: axis(ParamName::Ma)?
                .into_iter()
                .map(|v| v.round() as i64)
                .collect(),
            drop: axis(ParamName::Drop)?,
            chg4: axis(ParamName::Chg4)?,
            ret3: axis(ParamName::Ret3)?,
            spread_lvl: axis(ParamName::SpreadLvl)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample_ranges() -> ParamRanges {
        ParamRanges {
            ma: ParamRange::new(50.0, 60.0, 5.0),
            drop: ParamRange::new(0.016, 0.018, 0.001),
            chg4: ParamRange::point(0.16, 0.005),
            ret3: ParamRange::new(-0.0225, -0.0215, 0.0005),
            spread_lvl: ParamRange::point(7.0, 0.1),
        }
    }

    #[test]
    fn expand_ma_pair() {
        let values = expand(&ParamRange::new(50.0, 55.0, 5.0), 0).unwrap();
        assert_eq!(values, vec![50.0, 55.0]);
    }

    #[test]
    fn expand_rounds_float_drift() {
        let values = expand(&ParamRange::new(0.016, 0.018, 0.001), 6).unwrap();
        assert_eq!(values, vec![0.016, 0.017, 0.018]);

        let values = expand(&ParamRange::new(-0.0225, -0.0215, 0.0005), 6).unwrap();
        assert_eq!(values, vec![-0.0225, -0.022, -0.0215]);
    }

    #[test]
    fn single_point_range() {
        let values = expand(&ParamRange::point(7.0, 0.1), 6).unwrap();
        assert_eq!(values, vec![7.0]);
    }

    #[test]
    fn zero_step_is_rejected() {
        let err = expand(&ParamRange::new(1.0, 2.0, 0.0), 6).unwrap_err();
        assert_eq!(err, GridError::ZeroStep);
        // Even a degenerate range needs a usable step.
        assert!(expand(&ParamRange::point(1.0, 0.0), 6).is_err());
    }

    #[test]
    fn inverted_and_non_finite_are_rejected() {
        assert!(matches!(
            expand(&ParamRange::new(2.0, 1.0, 0.5), 6),
            Err(GridError::InvertedRange { .. })
        ));
        assert!(matches!(
            expand(&ParamRange::new(1.0, 2.0, -0.5), 6),
            Err(GridError::InvertedRange { .. })
        ));
        assert!(matches!(
            expand(&ParamRange::new(f64::NAN, 2.0, 0.5), 6),
            Err(GridError::NonFinite { .. })
        ));
    }

    #[test]
    fn negative_step_on_point_range_yields_one_value() {
        let values = expand(&ParamRange::point(3.0, -1.0), 0).unwrap();
        assert_eq!(values, vec![3.0]);
    }

    #[test]
    fn oversized_axis_is_rejected() {
        let err = expand(&ParamRange::new(0.0, 1.0, 1e-9), 6).unwrap_err();
        assert!(matches!(err, GridError::TooManyPoints { .. }));
    }

    #[test]
    fn expansion_is_restartable() {
        let it = Expansion::new(&ParamRange::new(1.0, 3.0, 1.0), 0).unwrap();
        assert_eq!(it.len(), 3);
        let first: Vec<f64> = it.clone().collect();
        let second: Vec<f64> = it.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn ranges_to_grids() {
        let grids = sample_ranges().to_grids().unwrap();
        assert_eq!(grids.ma, vec![50, 55, 60]);
        assert_eq!(grids.drop, vec![0.016, 0.017, 0.018]);
        assert_eq!(grids.chg4, vec![0.16]);
        assert_eq!(grids.ret3.len(), 3);
        assert_eq!(grids.spread_lvl, vec![7.0]);
        assert_eq!(grids.combinations(), 27);
    }

    #[test]
    fn grid_error_names_the_parameter() {
        let mut ranges = sample_ranges();
        ranges.ret3.step = 0.0;
        let err = ranges.to_grids().unwrap_err();
        assert!(err.to_string().starts_with("RET3"));
    }

    proptest! {
        #[test]
        fn expansion_count_and_endpoints(
            min in -1000i32..1000,
            k in 0usize..200,
            step_milli in 1u32..5000,
        ) {
            let min = min as f64 / 10.0;
            let step = step_milli as f64 / 1000.0;
            let max = min + k as f64 * step;
            let values = expand(&ParamRange::new(min, max, step), 6).unwrap();

            prop_assert_eq!(values.len(), k + 1);
            prop_assert!((values[0] - min).abs() < 1e-9);
            prop_assert!((values[values.len() - 1] - max).abs() < 1e-6);
            for w in values.windows(2) {
                prop_assert!(w[1] > w[0]);
            }
        }

        #[test]
        fn expansion_never_loops_forever(
            min in -10.0f64..10.0,
            span in 0.0f64..10.0,
            step in -5.0f64..5.0,
        ) {
            // Every input terminates with either a bounded sequence or an error.
            match expand(&ParamRange::new(min, min + span, step), 6) {
                Ok(values) => prop_assert!(!values.is_empty() && values.len() <= MAX_POINTS_PER_AXIS),
                Err(_) => {}
            }
        }
    }
}
