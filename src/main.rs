// Entry point and pipeline orchestration.
//
// One run: prepare output directories, load the spreadsheet, clean it, draw
// the charts, forecast, then write the cleaned and forecast tables. Load and
// clean failures stop the run; chart and forecast failures are logged and the
// remaining steps carry on. The process always exits normally.
mod analysis;
mod charts;
mod choropleth;
mod cleaner;
mod config;
mod error;
mod forecast;
mod loader;
mod model;
mod output;
mod setup;
mod types;
mod util;
mod visualize;

use clap::Parser;
use cleaner::CleanOptions;
use config::Config;
use error::PipelineResult;
use forecast::{Forecast, ForecastOptions};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use types::CleanRecord;

#[derive(Parser, Debug)]
#[command(
    name = "anuario-report",
    version,
    about = "Cleans the public-safety yearbook spreadsheet, charts it and forecasts homicides"
)]
struct Cli {
    /// Source spreadsheet (.xlsx, .xls, .ods or .csv)
    #[arg(short, long, env = "ANUARIO_INPUT", default_value = config::DEFAULT_INPUT)]
    input: PathBuf,

    /// Root under which visualizacoes/, dados_processados/ and logs/ are created
    #[arg(short, long, env = "ANUARIO_OUTPUT_DIR", default_value = ".")]
    output_dir: PathBuf,

    /// GeoJSON with state boundaries for the choropleth
    #[arg(long, env = "ANUARIO_GEOJSON_URL", default_value = config::DEFAULT_GEOJSON_URL)]
    geojson_url: String,

    /// Seconds to wait for the GeoJSON download
    #[arg(long, default_value_t = config::DEFAULT_HTTP_TIMEOUT_SECS)]
    http_timeout: u64,

    /// Oldest year kept by the cleaner
    #[arg(long, default_value_t = config::DEFAULT_MIN_YEAR)]
    min_year: i32,

    /// Newest year kept by the cleaner [default: current year]
    #[arg(long)]
    max_year: Option<i32>,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        let mut cfg = Config::new(cli.input, cli.output_dir)
            .with_geojson_url(cli.geojson_url)
            .with_http_timeout(cli.http_timeout)
            .with_min_year(cli.min_year);
        if let Some(y) = cli.max_year {
            cfg = cfg.with_max_year(y);
        }
        cfg
    }
}

fn init_logging() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env)
        .with_target(false)
        .init();
}

/// Load and clean. Either failure aborts the run.
fn handle_load_and_clean(config: &Config) -> PipelineResult<Vec<CleanRecord>> {
    info!(path = %config.input.display(), "loading data");
    let (raw, load_report) = loader::load(&config.input)?;
    println!(
        "Dataset loaded: {} rows from '{}' ({} malformed rows skipped)\n",
        util::format_int(load_report.total_rows),
        load_report.source,
        util::format_int(load_report.parse_errors)
    );
    println!("First rows (essential columns):\n");
    output::preview_table_rows(&raw, 5);

    let opts = CleanOptions {
        min_year: config.min_year,
        max_year: config.max_year,
    };
    info!(min_year = opts.min_year, max_year = opts.max_year, "cleaning data");
    let (data, report) = cleaner::clean(&raw, &opts)?;
    println!(
        "Cleaned: {} of {} rows kept ({} missing year/state, {} bad year, {} out of {}–{}, {} duplicates, {} values clipped)\n",
        util::format_int(report.output_rows),
        util::format_int(report.input_rows),
        util::format_int(report.missing_key),
        util::format_int(report.invalid_year),
        util::format_int(report.out_of_range),
        opts.min_year,
        opts.max_year,
        util::format_int(report.duplicates),
        util::format_int(report.clipped_values),
    );
    println!("Descriptive statistics:\n");
    output::preview_table_rows(&analysis::describe(&data), 10);
    Ok(data)
}

fn handle_visualize(data: &[CleanRecord], config: &Config) {
    info!("creating visualizations");
    let report = visualize::generate_all(data, config);
    println!("Visualizations:\n");
    for o in &report.outcomes {
        let status = if o.result.is_ok() { "ok" } else { "FAILED" };
        println!("  [{}] {} -> {}", status, o.artifact.name(), o.path.display());
    }
    println!();
    let failed = report.outcomes.len() - report.succeeded();
    if failed > 0 {
        warn!(
            succeeded = report.succeeded(),
            failed, "some visualizations were not produced"
        );
    } else {
        info!(count = report.succeeded(), "all visualizations saved");
    }
}

fn handle_forecast(data: &[CleanRecord], config: &Config) -> PipelineResult<Forecast> {
    info!("forecasting homicides");
    let opts = ForecastOptions {
        trees: config.forest_trees,
        seed: config.forest_seed,
    };
    let f = forecast::forecast(data, &opts)?;
    let colors = [0, 1, 2].map(|i| charts::hex_color(config.color(i)));
    let path = config.layout.forecast_chart();
    forecast::render(&f, colors, &path)?;
    info!(path = %path.display(), "forecast chart saved");
    println!("Forecast:\n");
    output::preview_table_rows(&f.rows, forecast::HORIZON as usize);
    Ok(f)
}

fn handle_write(data: &[CleanRecord], forecast: Option<&Forecast>, config: &Config) {
    info!("saving results");
    let cleaned = config.layout.cleaned_xlsx();
    match output::write_cleaned(&cleaned, data) {
        Ok(()) => info!(path = %cleaned.display(), "cleaned data saved"),
        Err(e) => error!(path = %cleaned.display(), error = %e, "write failed"),
    }
    let Some(f) = forecast else {
        warn!("no forecast available; skipping forecast spreadsheet");
        return;
    };
    let path = config.layout.forecast_xlsx();
    match output::write_forecast(&path, &f.rows) {
        Ok(()) => info!(path = %path.display(), "forecast saved"),
        Err(e) => error!(path = %path.display(), error = %e, "write failed"),
    }
}

fn run(config: &Config) {
    setup::prepare_output_dirs(config);

    let data = match handle_load_and_clean(config) {
        Ok(d) => d,
        Err(e) => {
            error!(error = %e, "data preparation failed; nothing else to do");
            return;
        }
    };

    handle_visualize(&data, config);

    let forecast = match handle_forecast(&data, config) {
        Ok(f) => Some(f),
        Err(e) => {
            error!(error = %e, "forecast failed");
            None
        }
    };

    handle_write(&data, forecast.as_ref(), config);
}

fn main() {
    init_logging();
    let config: Config = Cli::parse().into();

    println!("{}", "=".repeat(50));
    println!("ANÁLISE DE SEGURANÇA PÚBLICA - BRASIL");
    println!("{}\n", "=".repeat(50));

    run(&config);

    info!("analysis finished");
}
