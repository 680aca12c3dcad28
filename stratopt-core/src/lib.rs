//! Strat-Opt core: domain types for the parameter-sweep client.
//!
//! Everything in this crate is pure data plus the small amount of logic that
//! must agree between the TUI and the CLI:
//! - Parameter tuples, ranges and grids (`params`, `grid`)
//! - Backend wire types (`result`, `request`, `config`)
//! - Chart merging and CSV export (`chart`)
//! - The persisted settings store (`settings`)

pub mod chart;
pub mod config;
pub mod error;
pub mod grid;
pub mod params;
pub mod request;
pub mod result;
pub mod settings;

pub use chart::{
    export_rows, merge_curves, value_bounds, write_csv, write_csv_file, ChartPoint, ExportRow,
};
pub use config::{AppConfig, DefaultParams, ParamDef};
pub use error::{ExportError, GridError, SettingsError};
pub use grid::{expand, point_count, round_to, Expansion, MAX_POINTS_PER_AXIS};
pub use params::{
    coerce_number, GridPoints, IntoGridPoints, OptimizerGrids, ParamKey, ParamName, ParamRange,
    ParamRanges, StrategyParams,
};
pub use request::{BuyHoldRequest, InputType, SignalRequest, StartPosition, SweepRequest};
pub use result::{
    BacktestResult, EquityPoint, OptimizerResponse, OptimizerResultRow, Signal, SignalMetrics,
    SignalResponse, TradeAction, TradeEvent,
};
pub use settings::{
    FileStorage, MemoryStorage, Settings, SettingsPatch, SettingsStorage, SettingsStore,
    SETTINGS_KEY,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn wire_types_are_send_sync() {
        assert_send::<OptimizerResponse>();
        assert_sync::<OptimizerResponse>();
        assert_send::<SweepRequest>();
        assert_sync::<SweepRequest>();
        assert_send::<SignalResponse>();
        assert_sync::<SignalResponse>();
    }

    #[test]
    fn param_types_are_send_sync() {
        assert_send::<StrategyParams>();
        assert_sync::<StrategyParams>();
        assert_send::<OptimizerGrids>();
        assert_sync::<OptimizerGrids>();
        assert_send::<ParamRanges>();
        assert_sync::<ParamRanges>();
    }
}
