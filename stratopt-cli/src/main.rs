//! Strat-Opt CLI: sweep, backtest and config commands against the backend.
//!
//! Commands:
//! - `grid`: expand the ranges and print the candidate values
//! - `optimize`: run a streaming sweep, print the sorted result table,
//!   optionally drill into one row and export its chart as CSV
//! - `buyhold`: run the buy-and-hold baseline
//! - `signal`: current BUY/SELL/HOLD for one parameter set
//! - `config get` / `config set`: read or replace the backend config
//! - `settings`: show or change the saved local settings
//! - `securities`: tickers the backend can serve

mod args;
mod report;

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use stratopt_client::{
    Backend, ClientConfig, DrillDownResolver, HttpBackend, OfflineBackend,
    StreamingSessionManager, SweepContext,
};
use stratopt_core::{
    coerce_number, export_rows, merge_curves, write_csv_file, AppConfig, BacktestResult,
    BuyHoldRequest, FileStorage, ParamRanges, SettingsPatch, SettingsStore, SignalRequest,
};

use crate::args::{parse_assignment, parse_range, InputArg, ParamArgs, RangeArgs, RunArgs, StartArg};
use crate::report::SortKey;

#[derive(Parser)]
#[command(
    name = "stratopt",
    version,
    about = "Strat-Opt CLI: parameter sweeps, backtests and signals"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Use the built-in offline backend instead of HTTP.
    #[arg(long, global = true, default_value_t = false)]
    offline: bool,

    /// Client config file (TOML). Defaults to <config dir>/stratopt/client.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the backend base URL.
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Override the ticker.
    #[arg(long, global = true)]
    ticker: Option<String>,

    /// Directory holding the saved settings. Defaults to <config dir>/stratopt.
    #[arg(long, global = true)]
    settings_dir: Option<PathBuf>,

    /// More log output on stderr (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Expand the ranges into per-parameter grids.
    Grid {
        #[command(flatten)]
        ranges: RangeArgs,
    },
    /// Run a sweep over the grid and print the results.
    Optimize {
        #[command(flatten)]
        ranges: RangeArgs,

        #[command(flatten)]
        run: RunArgs,

        /// Rows to print (0 prints all).
        #[arg(long, default_value_t = 20)]
        top: usize,

        /// Column to sort by.
        #[arg(long, value_enum, default_value_t = SortKey::Apy)]
        sort: SortKey,

        /// Sort ascending instead of descending.
        #[arg(long, default_value_t = false)]
        asc: bool,

        /// Open the chart for this row of the printed table (1-based).
        #[arg(long)]
        drill: Option<usize>,

        /// Also fetch the buy-and-hold curve as the chart overlay.
        #[arg(long, default_value_t = false)]
        with_buyhold: bool,

        /// Write the chart (drilled row, else the best row) as CSV.
        #[arg(long)]
        export: Option<PathBuf>,

        /// Give up on the sweep after this many seconds.
        #[arg(long, default_value_t = 600)]
        timeout_secs: u64,
    },
    /// Run the buy-and-hold baseline.
    Buyhold {
        /// Price data source.
        #[arg(long, value_enum)]
        input_type: Option<InputArg>,

        /// Annual return on cash.
        #[arg(long)]
        cash_rate: Option<f64>,

        /// Write the equity curve as CSV.
        #[arg(long)]
        export: Option<PathBuf>,
    },
    /// Compute the current signal for one parameter set.
    Signal {
        #[command(flatten)]
        params: ParamArgs,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Backend config commands.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Show the saved settings, updating any that are given.
    Settings {
        /// Color theme name (used by the TUI).
        #[arg(long)]
        theme: Option<String>,

        #[arg(long, value_enum)]
        input_type: Option<InputArg>,

        #[arg(long)]
        cash_rate: Option<f64>,

        #[arg(long, value_enum)]
        start: Option<StartArg>,
    },
    /// List the tickers the backend can serve.
    Securities,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the backend config.
    Get {
        /// Print raw JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Edit the backend config and save it.
    Set {
        /// Replace the whole config with this JSON file first.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Default param value, `NAME=value`; repeatable.
        #[arg(long = "value", value_name = "NAME=VALUE", allow_hyphen_values = true)]
        values: Vec<String>,

        /// Default range, `NAME=min:max:step`; repeatable.
        #[arg(long = "range", value_name = "NAME=RANGE", allow_hyphen_values = true)]
        ranges: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings_dir = cli.settings_dir.clone().unwrap_or_else(default_dir);
    let mut settings = SettingsStore::load(Box::new(FileStorage::new(settings_dir)));
    let target = BackendArgs {
        offline: cli.offline,
        config: cli.config,
        base_url: cli.base_url,
        ticker: cli.ticker,
    };
    let mut out = io::stdout().lock();

    match cli.command {
        Commands::Settings {
            theme,
            input_type,
            cash_rate,
            start,
        } => {
            let patch = SettingsPatch {
                theme,
                input_type: input_type.map(Into::into),
                cash_rate,
                start_invested: start.map(Into::into),
            };
            run_settings(&mut out, &mut settings, patch)
        }
        Commands::Grid { ranges } => {
            let (backend, _) = target.build()?;
            run_grid(&mut out, backend.as_ref(), &ranges)
        }
        Commands::Optimize {
            ranges,
            run,
            top,
            sort,
            asc,
            drill,
            with_buyhold,
            export,
            timeout_secs,
        } => {
            let (backend, ticker) = target.build()?;
            let run = run.resolve(settings.settings());
            let ctx = SweepContext {
                ticker,
                start_invested: run.start_invested,
                cash_rate: run.cash_rate,
                input_type: run.input_type,
            };
            let opts = OptimizeOptions {
                top,
                sort,
                asc,
                drill,
                with_buyhold,
                export,
                timeout: Duration::from_secs(timeout_secs),
            };
            run_optimize(&mut out, backend, &ranges, &ctx, &opts)
        }
        Commands::Buyhold {
            input_type,
            cash_rate,
            export,
        } => {
            let (backend, ticker) = target.build()?;
            let s = settings.settings();
            let request = BuyHoldRequest {
                ticker,
                cash_rate: cash_rate.unwrap_or(s.cash_rate),
                input_type: input_type.map(Into::into).unwrap_or(s.input_type),
            };
            run_buyhold(&mut out, backend.as_ref(), &request, export.as_deref())
        }
        Commands::Signal { params, run } => {
            let (backend, ticker) = target.build()?;
            let config = backend.config().context("loading backend config")?;
            let mut values = config.default_params.to_params();
            params.apply(&mut values)?;
            let run = run.resolve(settings.settings());
            let request = SignalRequest {
                ticker,
                params: values,
                start_invested: run.start_invested,
                cash_rate: run.cash_rate,
                input_type: run.input_type,
            };
            tracing::info!("signal for {} at {}", request.ticker, request.params);
            let resp = backend.signal(&request).context("signal request failed")?;
            report::write_signal(&mut out, &request.ticker, &resp)?;
            Ok(())
        }
        Commands::Config { action } => {
            let (backend, _) = target.build()?;
            match action {
                ConfigAction::Get { json } => {
                    let config = backend.config().context("loading backend config")?;
                    if json {
                        writeln!(out, "{}", serde_json::to_string_pretty(&config)?)?;
                    } else {
                        report::write_config(&mut out, &config)?;
                    }
                    Ok(())
                }
                ConfigAction::Set {
                    file,
                    values,
                    ranges,
                } => run_config_set(&mut out, backend.as_ref(), file.as_deref(), &values, &ranges),
            }
        }
        Commands::Securities => {
            let (backend, _) = target.build()?;
            for ticker in backend.securities().context("listing securities")? {
                writeln!(out, "{ticker}")?;
            }
            Ok(())
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let _ = tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_target(false)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("stratopt={level}"))),
        )
        .try_init();
}

fn default_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stratopt")
}

/// Global flags that pick and configure the backend.
struct BackendArgs {
    offline: bool,
    config: Option<PathBuf>,
    base_url: Option<String>,
    ticker: Option<String>,
}

impl BackendArgs {
    /// The backend plus the ticker every request should use.
    fn build(self) -> Result<(Arc<dyn Backend>, String)> {
        let path = self
            .config
            .unwrap_or_else(|| default_dir().join("client.toml"));
        let mut config = ClientConfig::load(&path)?;
        if let Some(url) = self.base_url {
            config.base_url = url;
        }
        if let Some(ticker) = self.ticker {
            config.ticker = ticker;
        }
        let ticker = config.ticker.clone();

        let backend: Arc<dyn Backend> = if self.offline {
            Arc::new(OfflineBackend::new())
        } else {
            Arc::new(HttpBackend::new(config)?)
        };
        tracing::debug!("using backend {}", backend.name());
        Ok((backend, ticker))
    }
}

/// Default ranges from the backend, falling back to the built-in ones.
fn default_ranges(backend: &dyn Backend) -> ParamRanges {
    match backend.config() {
        Ok(config) => config.default_ranges,
        Err(e) => {
            tracing::warn!(
                "could not load config from {}: {e}; using built-in ranges",
                backend.name()
            );
            AppConfig::fallback().default_ranges
        }
    }
}

fn run_grid(out: &mut impl Write, backend: &dyn Backend, args: &RangeArgs) -> Result<()> {
    let mut ranges = default_ranges(backend);
    args.apply(&mut ranges)?;
    let grids = ranges.to_grids().context("invalid range")?;
    report::write_grid(out, &grids)?;
    Ok(())
}

struct OptimizeOptions {
    top: usize,
    sort: SortKey,
    asc: bool,
    drill: Option<usize>,
    with_buyhold: bool,
    export: Option<PathBuf>,
    timeout: Duration,
}

fn run_optimize(
    out: &mut impl Write,
    backend: Arc<dyn Backend>,
    args: &RangeArgs,
    ctx: &SweepContext,
    opts: &OptimizeOptions,
) -> Result<()> {
    let config = backend.config().context("loading backend config")?;
    let mut ranges = config.default_ranges;
    args.apply(&mut ranges)?;
    let grids = ranges.to_grids().context("invalid range")?;
    let total = grids.combinations();

    eprintln!(
        "Sweeping {total} combinations for {} on {}",
        ctx.ticker,
        backend.name()
    );

    let mut session = StreamingSessionManager::new(Arc::clone(&backend));
    session.start(ctx, grids);

    // Progress on stderr, one line per completed tenth.
    let deadline = Instant::now() + opts.timeout;
    let mut last_tenth = None;
    while session.is_loading() {
        if Instant::now() >= deadline {
            session.cancel();
            bail!("sweep timed out after {}s", opts.timeout.as_secs());
        }
        session.wait(Duration::from_millis(200));
        if let Some(p) = session.state().progress {
            let tenth = (p.ratio() * 10.0).floor() as u64;
            if last_tenth != Some(tenth) {
                eprintln!("  progress: {:>3.0}% ({}/{})", p.ratio() * 100.0, p.current, p.total);
                last_tenth = Some(tenth);
            }
        }
    }

    let state = session.state();
    if let Some(err) = &state.error {
        bail!("sweep failed: {err}");
    }
    let Some(response) = state.result.clone() else {
        bail!("sweep ended without a result");
    };

    let overlay = if opts.with_buyhold {
        let request = BuyHoldRequest {
            ticker: ctx.ticker.clone(),
            cash_rate: ctx.cash_rate,
            input_type: ctx.input_type,
        };
        match backend.buy_hold(&request) {
            Ok(result) => Some(result),
            Err(e) => {
                eprintln!("Buy & Hold overlay failed: {e}");
                None
            }
        }
    } else {
        None
    };

    let mut rows = response.all_results.clone();
    report::sort_rows(&mut rows, opts.sort, opts.asc);
    let shown = if opts.top == 0 {
        &rows[..]
    } else {
        &rows[..opts.top.min(rows.len())]
    };

    writeln!(out, "Best: {}", response.best_params)?;
    writeln!(
        out,
        "      APY {}  final {:.6}",
        report::percent(response.best_result.apy),
        response.best_result.final_value
    )?;
    writeln!(out)?;
    report::write_results(out, shown, |r| r.params() == response.best_params)?;
    if shown.len() < rows.len() {
        writeln!(out, "... {} more rows (use --top 0 for all)", rows.len() - shown.len())?;
    }

    let chart = match opts.drill {
        Some(n) => {
            let Some(row) = n.checked_sub(1).and_then(|i| rows.get(i)) else {
                bail!("--drill {n}: the table has {} rows", rows.len());
            };
            let params = row.params();
            let mut drill = DrillDownResolver::new(Arc::clone(&backend));
            drill.toggle(params, Some(&response), ctx);
            if !drill.wait_until_idle(opts.timeout) {
                bail!("backtest for {params} timed out");
            }
            let state = drill.state();
            if let Some(err) = &state.error {
                bail!("backtest failed for {params}: {err}");
            }
            let Some(result) = state.result.clone() else {
                bail!("backtest for {params} returned nothing");
            };
            report::write_backtest(out, &format!("Row {n}: {params}"), &result)?;
            result
        }
        None => response.best_result.clone(),
    };

    if let Some(path) = &opts.export {
        export_chart(path, &chart, overlay.as_ref())?;
        writeln!(out, "Chart exported to {}", path.display())?;
    }
    Ok(())
}

fn export_chart(path: &Path, primary: &BacktestResult, overlay: Option<&BacktestResult>) -> Result<()> {
    let points = merge_curves(
        &primary.equity_curve,
        overlay.map(|o| o.equity_curve.as_slice()),
        &primary.buy_dates,
        &primary.sell_dates,
    );
    let rows = export_rows(&points, overlay.is_some());
    write_csv_file(path, &rows, overlay.is_some())
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn run_buyhold(
    out: &mut impl Write,
    backend: &dyn Backend,
    request: &BuyHoldRequest,
    export: Option<&Path>,
) -> Result<()> {
    tracing::info!("buy & hold for {}", request.ticker);
    let result = backend.buy_hold(request).context("buy & hold request failed")?;
    report::write_backtest(out, &format!("{} buy & hold", request.ticker), &result)?;
    if let Some(path) = export {
        export_chart(path, &result, None)?;
        writeln!(out, "Equity curve exported to {}", path.display())?;
    }
    Ok(())
}

fn run_config_set(
    out: &mut impl Write,
    backend: &dyn Backend,
    file: Option<&Path>,
    values: &[String],
    ranges: &[String],
) -> Result<()> {
    if file.is_none() && values.is_empty() && ranges.is_empty() {
        bail!("nothing to set: pass --file, --value or --range");
    }

    let mut config = match file {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str::<AppConfig>(&text)
                .with_context(|| format!("parsing {}", path.display()))?
        }
        None => backend.config().context("loading backend config")?,
    };

    for raw in values {
        let (name, value) = parse_assignment(raw)?;
        config.default_params.get_mut(name).value = coerce_number(&value);
    }
    for raw in ranges {
        let (name, value) = parse_assignment(raw)?;
        if !value.contains(':') {
            bail!("--range {raw}: expected NAME=min:max:step");
        }
        *config.default_ranges.get_mut(name) = parse_range(&value)?;
    }

    config
        .default_ranges
        .to_grids()
        .context("refusing to save invalid default ranges")?;
    backend.save_config(&config).context("saving backend config")?;
    tracing::info!("saved config to {}", backend.name());

    report::write_config(out, &config)?;
    Ok(())
}

fn run_settings(out: &mut impl Write, store: &mut SettingsStore, patch: SettingsPatch) -> Result<()> {
    if patch != SettingsPatch::default() {
        store.update(patch).context("saving settings")?;
    }
    let s = store.settings();
    writeln!(out, "theme:          {}", s.theme)?;
    writeln!(out, "input type:     {}", s.input_type)?;
    writeln!(out, "cash rate:      {}", s.cash_rate)?;
    writeln!(out, "start:          {}", s.start_invested.label())?;
    Ok(())
}
