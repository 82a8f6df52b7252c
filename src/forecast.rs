use crate::analysis::aggregate_by_year;
use crate::charts;
use crate::error::{PipelineError, PipelineResult};
use crate::model::{LinearTrend, ScaledForest};
use crate::types::{CleanRecord, ForecastRow, YearTotal};
use plotters::style::RGBColor;
use std::path::Path;
use tracing::{debug, info};

/// Number of years projected past the last observed one.
pub const HORIZON: i32 = 3;

#[derive(Debug, Clone, Copy)]
pub struct ForecastOptions {
    pub trees: usize,
    pub seed: u64,
}

impl Default for ForecastOptions {
    fn default() -> Self {
        Self {
            trees: 100,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Forecast {
    pub history: Vec<YearTotal>,
    pub rows: Vec<ForecastRow>,
}

/// Fit both regressors on yearly homicide totals and project `HORIZON` years.
///
/// The linear model sees the years themselves. The forest sees years
/// standardized by a scaler fit on the historical years only; the future years
/// go through the same fitted scaler. At least two years of history are needed.
pub fn forecast(data: &[CleanRecord], opts: &ForecastOptions) -> PipelineResult<Forecast> {
    let history = aggregate_by_year(data);
    let last_year = history
        .last()
        .map(|t| t.year)
        .ok_or_else(|| PipelineError::Forecast("no yearly totals to fit".to_string()))?;

    let x: Vec<f64> = history.iter().map(|t| t.year as f64).collect();
    let y: Vec<f64> = history.iter().map(|t| t.homicides).collect();
    let future_years: Vec<i32> = (1..=HORIZON).map(|i| last_year + i).collect();
    let future_x: Vec<f64> = future_years.iter().map(|&v| v as f64).collect();

    let linear = LinearTrend::fit(&x, &y)?;
    let linear_pred = linear.predict(&future_x)?;
    debug!(
        slope = linear.slope(),
        intercept = linear.intercept(),
        "linear regression fitted"
    );

    let forest = ScaledForest::fit(&x, &y, opts.trees, opts.seed)?;
    let forest_pred = forest.predict(&future_x)?;

    let rows: Vec<ForecastRow> = future_years
        .into_iter()
        .zip(linear_pred)
        .zip(forest_pred)
        .map(|((year, linear), random_forest)| ForecastRow {
            year,
            linear,
            random_forest,
        })
        .collect();
    info!(
        history_years = history.len(),
        projected = ?rows.iter().map(|r| r.year).collect::<Vec<_>>(),
        "forecast computed"
    );
    Ok(Forecast { history, rows })
}

/// Comparison chart: history solid, projections dashed.
pub fn render(f: &Forecast, colors: [RGBColor; 3], path: &Path) -> PipelineResult<()> {
    charts::forecast_chart(&f.history, &f.rows, colors, path)
        .map_err(|e| PipelineError::Chart(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(year: i32, state: &str, hom: f64) -> CleanRecord {
        CleanRecord {
            year,
            state: state.to_string(),
            homicides: Some(hom),
            latrocinios: Some(0.0),
            injury_deaths: None,
        }
    }

    #[test]
    fn three_rows_following_last_year() {
        let data = vec![
            rec(2019, "SP", 100.0),
            rec(2020, "SP", 120.0),
            rec(2021, "SP", 90.0),
        ];
        let f = forecast(&data, &ForecastOptions::default()).unwrap();
        let years: Vec<i32> = f.rows.iter().map(|r| r.year).collect();
        assert_eq!(years, vec![2022, 2023, 2024]);
        assert_eq!(f.history.len(), 3);
    }

    #[test]
    fn linear_projection_matches_least_squares() {
        let data = vec![
            rec(2019, "SP", 100.0),
            rec(2020, "SP", 120.0),
            rec(2021, "SP", 90.0),
        ];
        let f = forecast(&data, &ForecastOptions::default()).unwrap();
        // slope -5, mean 103.33 at 2020
        let expected = [93.333333, 88.333333, 83.333333];
        for (row, want) in f.rows.iter().zip(expected) {
            assert!((row.linear - want).abs() < 1e-2, "{} vs {}", row.linear, want);
        }
        for row in &f.rows {
            assert!((89.99..=120.01).contains(&row.random_forest));
        }
    }

    #[test]
    fn sums_states_per_year_before_fitting() {
        let data = vec![
            rec(2019, "SP", 100.0),
            rec(2019, "RJ", 50.0),
            rec(2020, "SP", 100.0),
            rec(2020, "RJ", 50.0),
        ];
        let f = forecast(&data, &ForecastOptions::default()).unwrap();
        assert_eq!(f.history[0].homicides, 150.0);
        for row in &f.rows {
            assert!((row.linear - 150.0).abs() < 1e-3);
            assert!((row.random_forest - 150.0).abs() < 1e-3);
        }
    }

    #[test]
    fn same_seed_same_forecast() {
        let data: Vec<CleanRecord> = (2005..2020)
            .map(|y| rec(y, "MG", ((y - 2005) * 7 % 11) as f64 * 10.0))
            .collect();
        let a = forecast(&data, &ForecastOptions::default()).unwrap();
        let b = forecast(&data, &ForecastOptions::default()).unwrap();
        assert_eq!(a.rows, b.rows);
    }

    #[test]
    fn single_year_cannot_be_extrapolated() {
        assert!(matches!(
            forecast(&[rec(2020, "SP", 10.0)], &ForecastOptions::default()),
            Err(PipelineError::Forecast(_))
        ));
    }

    #[test]
    fn empty_table_is_an_error() {
        assert!(matches!(
            forecast(&[], &ForecastOptions::default()),
            Err(PipelineError::Forecast(_))
        ));
    }
}
