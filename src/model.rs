// Regressors used by the forecaster, on top of aprender.
//
// The forecast regresses a yearly total against the year itself, so both
// models take one feature value per sample. aprender works in f32; years are
// shifted by the mean historical year before they reach it so the normal
// equations stay well conditioned.
use crate::error::{PipelineError, PipelineResult};
use aprender::linear_model::LinearRegression;
use aprender::preprocessing::StandardScaler;
use aprender::primitives::{Matrix, Vector};
use aprender::traits::{Estimator, Transformer};
use aprender::tree::RandomForestRegressor;
use std::fmt::Display;

fn model_err(e: impl Display) -> PipelineError {
    PipelineError::Forecast(e.to_string())
}

fn check_shapes(x: &[f64], y: &[f64]) -> PipelineResult<()> {
    if x.len() != y.len() {
        return Err(PipelineError::Forecast(format!(
            "feature/target length mismatch ({} vs {})",
            x.len(),
            y.len()
        )));
    }
    if x.is_empty() {
        return Err(PipelineError::Forecast(
            "cannot fit with zero samples".to_string(),
        ));
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return Err(PipelineError::Forecast(
            "non-finite value in training data".to_string(),
        ));
    }
    Ok(())
}

/// n×1 feature matrix of `x - centre`.
fn column(x: &[f64], centre: f64) -> PipelineResult<Matrix<f32>> {
    let data: Vec<f32> = x.iter().map(|v| (v - centre) as f32).collect();
    Matrix::from_vec(x.len(), 1, data).map_err(model_err)
}

fn targets(y: &[f64]) -> Vector<f32> {
    let data: Vec<f32> = y.iter().map(|&v| v as f32).collect();
    Vector::from_slice(&data)
}

fn to_f64(v: &Vector<f32>) -> Vec<f64> {
    v.as_slice().iter().map(|&p| p as f64).collect()
}

fn mean(x: &[f64]) -> f64 {
    x.iter().sum::<f64>() / x.len() as f64
}

/// Ordinary least squares over the year.
#[derive(Debug, Clone)]
pub struct LinearTrend {
    centre: f64,
    model: LinearRegression,
}

impl LinearTrend {
    /// Needs at least two distinct years.
    pub fn fit(x: &[f64], y: &[f64]) -> PipelineResult<Self> {
        check_shapes(x, y)?;
        let centre = mean(x);
        let mut model = LinearRegression::new();
        model
            .fit(&column(x, centre)?, &targets(y))
            .map_err(model_err)?;
        Ok(Self { centre, model })
    }

    pub fn predict(&self, x: &[f64]) -> PipelineResult<Vec<f64>> {
        let preds = self.model.predict(&column(x, self.centre)?);
        Ok(to_f64(&preds))
    }

    pub fn slope(&self) -> f64 {
        self.model
            .coefficients()
            .as_slice()
            .first()
            .map_or(0.0, |&c| c as f64)
    }

    /// Value at year zero, in the caller's units.
    pub fn intercept(&self) -> f64 {
        self.model.intercept() as f64 - self.slope() * self.centre
    }
}

/// Random forest on standardized years.
///
/// The scaler is fit on the training years only; anything passed to
/// `predict` goes through the same fitted scaler.
#[derive(Debug, Clone)]
pub struct ScaledForest {
    centre: f64,
    scaler: StandardScaler,
    forest: RandomForestRegressor,
}

impl ScaledForest {
    pub fn fit(x: &[f64], y: &[f64], trees: usize, seed: u64) -> PipelineResult<Self> {
        check_shapes(x, y)?;
        if trees == 0 {
            return Err(PipelineError::Forecast(
                "random forest needs at least one tree".to_string(),
            ));
        }
        let centre = mean(x);
        let mut scaler = StandardScaler::new();
        let scaled = scaler
            .fit_transform(&column(x, centre)?)
            .map_err(model_err)?;
        let mut forest = RandomForestRegressor::new(trees).with_random_state(seed);
        forest.fit(&scaled, &targets(y)).map_err(model_err)?;
        Ok(Self {
            centre,
            scaler,
            forest,
        })
    }

    fn scaled(&self, x: &[f64]) -> PipelineResult<Matrix<f32>> {
        self.scaler
            .transform(&column(x, self.centre)?)
            .map_err(model_err)
    }

    pub fn predict(&self, x: &[f64]) -> PipelineResult<Vec<f64>> {
        let preds = self.forest.predict(&self.scaled(x)?);
        Ok(to_f64(&preds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn standardize(f: &ScaledForest, x: &[f64]) -> Vec<f64> {
        to_f64(&Vector::from_slice(f.scaled(x).unwrap().as_slice()))
    }

    #[test]
    fn linear_trend_recovers_line() {
        let x = [2001.0, 2002.0, 2003.0, 2004.0];
        let y = [3.0, 5.0, 7.0, 9.0];
        let lr = LinearTrend::fit(&x, &y).unwrap();
        assert!((lr.slope() - 2.0).abs() < 1e-4);
        assert!((lr.intercept() - (3.0 - 2.0 * 2001.0)).abs() < 1e-2);
        let p = lr.predict(&[2010.0]).unwrap();
        assert!((p[0] - 21.0).abs() < 1e-3, "{}", p[0]);
    }

    #[test]
    fn linear_trend_needs_two_years() {
        assert!(LinearTrend::fit(&[2020.0], &[50.0]).is_err());
    }

    #[test]
    fn fit_rejects_empty_mismatched_and_nan() {
        assert!(LinearTrend::fit(&[], &[]).is_err());
        assert!(LinearTrend::fit(&[1.0], &[1.0, 2.0]).is_err());
        assert!(LinearTrend::fit(&[1.0, 2.0], &[1.0, f64::NAN]).is_err());
        assert!(ScaledForest::fit(&[], &[], 3, 1).is_err());
        assert!(ScaledForest::fit(&[1.0], &[1.0], 0, 1).is_err());
    }

    #[test]
    fn scaler_is_fit_on_history_and_reused_for_future_years() {
        let forest = ScaledForest::fit(&[2019.0, 2020.0, 2021.0], &[1.0, 2.0, 3.0], 5, 1).unwrap();
        let z = standardize(&forest, &[2019.0, 2020.0, 2021.0]);
        assert!(z[1].abs() < 1e-6);
        assert!((z[0] + z[2]).abs() < 1e-6);
        // one year past the end is 2 / population std away from the mean
        let future = standardize(&forest, &[2022.0]);
        let expected = 2.0 / (2.0f64 / 3.0).sqrt();
        assert!((future[0] - expected).abs() < 1e-4, "{}", future[0]);
    }

    #[test]
    fn forest_is_deterministic_with_seed_and_bounded() {
        let x = [2019.0, 2020.0, 2021.0];
        let y = [100.0, 120.0, 90.0];
        let a = ScaledForest::fit(&x, &y, 100, 42).unwrap();
        let b = ScaledForest::fit(&x, &y, 100, 42).unwrap();
        let pa = a.predict(&[2022.0, 2023.0]).unwrap();
        let pb = b.predict(&[2022.0, 2023.0]).unwrap();
        assert_eq!(pa, pb);
        for p in pa {
            assert!((89.99..=120.01).contains(&p), "{}", p);
        }
    }

    #[test]
    fn forest_on_constant_target_predicts_it() {
        let f = ScaledForest::fit(&[2019.0, 2020.0], &[4.0, 4.0], 5, 7).unwrap();
        assert_eq!(f.predict(&[2030.0]).unwrap(), vec![4.0]);
    }
}
