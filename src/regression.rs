//! Ordinary least squares attribution of grid energy use.
//!
//! The model is fitted on mean-centred columns with a Householder QR
//! factorisation using column pivoting. Columns that are numerically dependent
//! on earlier pivots get a zero coefficient instead of failing the fit.

use std::fmt;
use std::path::Path;

use log::{debug, info, warn};
use ndarray::{s, Array1, Array2};

use crate::charts;
use crate::config::require_output_dir;
use crate::error::{AnalysisError, Result};
use crate::read_csv::{load_dataset, Column, Dataset};

pub const FEATURES: [Column; 4] = [
    Column::ItEquipment,
    Column::Cooling,
    Column::Lighting,
    Column::DedicatedSolarOutput,
];
pub const TARGET: Column = Column::GridEnergyUse;

// Pivots whose remaining norm falls below this fraction of the first are treated as dependent
const RANK_TOLERANCE: f64 = 1e-10;

pub const COEFFICIENTS_FILE: &str = "regression_coefficients.png";
pub const RESIDUALS_FILE: &str = "residual_plot.png";

#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    pub intercept: f64,
    /// One coefficient per feature column, in input order
    pub coefficients: Vec<f64>,
    pub rank: usize,
}

impl LinearModel {
    pub fn predict_row(&self, row: &[f64]) -> f64 {
        self.intercept + self.coefficients.iter().zip(row).map(|(b, x)| b * x).sum::<f64>()
    }

    pub fn predict(&self, x: &Array2<f64>) -> Vec<f64> {
        x.rows().into_iter().map(|row| self.predict_row(&row.to_vec())).collect()
    }
}

/// Least squares fit of `y ≈ intercept + x · coefficients`
pub fn fit_ols(x: &Array2<f64>, y: &Array1<f64>) -> Result<LinearModel> {
    let (n, p) = x.dim();
    if n != y.len() {
        return Err(AnalysisError::Regression(format!("{} feature rows but {} targets", n, y.len())));
    }
    if n < 2 {
        return Err(AnalysisError::Regression(format!("need at least 2 rows, got {}", n)));
    }

    let x_mean = x.mean_axis(ndarray::Axis(0)).unwrap_or_else(|| Array1::zeros(p));
    let y_mean = y.sum() / n as f64;
    let xc = x - &x_mean;
    let yc = y - y_mean;

    let (centred, rank) = solve_least_squares(xc, yc);
    if rank < p {
        warn!("design matrix has rank {} of {}, dependent columns get a zero coefficient", rank, p);
    }

    let intercept = y_mean - centred.dot(&x_mean);
    Ok(LinearModel { intercept, coefficients: centred.to_vec(), rank })
}

/// Minimises |a·b - y| by Householder QR with column pivoting. Returns the
/// solution and the numerical rank.
fn solve_least_squares(mut a: Array2<f64>, mut y: Array1<f64>) -> (Array1<f64>, usize) {
    let (n, p) = a.dim();
    let steps = n.min(p);
    let mut perm: Vec<usize> = (0..p).collect();
    let mut tolerance = 0.0;
    let mut rank = 0;

    for k in 0..steps {
        // pivot on the largest remaining column
        let pivot = (k..p)
            .map(|j| (j, a.slice(s![k.., j]).dot(&a.slice(s![k.., j]))))
            .fold((k, f64::NEG_INFINITY), |best, c| if c.1 > best.1 { c } else { best })
            .0;
        if pivot != k {
            for i in 0..n {
                a.swap((i, k), (i, pivot));
            }
            perm.swap(k, pivot);
        }

        let norm = a.slice(s![k.., k]).dot(&a.slice(s![k.., k])).sqrt();
        if k == 0 {
            tolerance = norm * RANK_TOLERANCE;
        }
        if norm <= tolerance || norm == 0.0 {
            break;
        }

        let mut v = a.slice(s![k.., k]).to_owned();
        let alpha = if v[0] > 0.0 { -norm } else { norm };
        v[0] -= alpha;
        let vv = v.dot(&v);
        if vv > 0.0 {
            for j in k..p {
                let mut col = a.slice_mut(s![k.., j]);
                let f = 2.0 * v.dot(&col) / vv;
                col.scaled_add(-f, &v);
            }
            let mut tail = y.slice_mut(s![k..]);
            let f = 2.0 * v.dot(&tail) / vv;
            tail.scaled_add(-f, &v);
        }
        a[[k, k]] = alpha;
        rank = k + 1;
    }

    // back substitution on the leading rank x rank block of R
    let mut z = vec![0.0; rank];
    for i in (0..rank).rev() {
        let mut acc = y[i];
        for j in (i + 1)..rank {
            acc -= a[[i, j]] * z[j];
        }
        z[i] = acc / a[[i, i]];
    }

    let mut beta = Array1::zeros(p);
    for (i, value) in z.into_iter().enumerate() {
        beta[perm[i]] = value;
    }
    (beta, rank)
}

/// Coefficient of determination, 1 - SS_res / SS_tot
pub fn r2_score(actual: &[f64], predicted: &[f64]) -> f64 {
    let n = actual.len() as f64;
    let mean = actual.iter().sum::<f64>() / n;
    let ss_res: f64 = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}

pub fn rmse(actual: &[f64], predicted: &[f64]) -> f64 {
    let mse = actual.iter().zip(predicted).map(|(a, p)| (a - p).powi(2)).sum::<f64>() / actual.len() as f64;
    mse.sqrt()
}

#[derive(Debug, Clone)]
pub struct RegressionReport {
    pub model: LinearModel,
    /// (feature, coefficient), largest coefficient first
    pub coefficients: Vec<(Column, f64)>,
    pub r2: f64,
    pub rmse: f64,
    pub predicted: Vec<f64>,
    /// actual - predicted
    pub residuals: Vec<f64>,
}

impl fmt::Display for RegressionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:<28} {:>14}", "Feature", "Coefficient")?;
        for (column, value) in &self.coefficients {
            writeln!(f, "{:<28} {:>14.6}", column.header(), value)?;
        }
        Ok(())
    }
}

/// Fits grid energy use against the subsystem and solar columns
pub fn fit_grid_model(data: &Dataset) -> Result<RegressionReport> {
    let target = data.require(TARGET)?;
    let features = FEATURES.iter().map(|c| data.require(*c)).collect::<Result<Vec<_>>>()?;

    let n = target.len();
    let x = Array2::from_shape_fn((n, FEATURES.len()), |(i, j)| features[j][i]);
    let y = Array1::from(target.clone());

    let model = fit_ols(&x, &y)?;
    let predicted = model.predict(&x);
    let residuals: Vec<f64> = target.iter().zip(&predicted).map(|(a, p)| a - p).collect();

    let mut coefficients: Vec<(Column, f64)> = FEATURES.iter().copied().zip(model.coefficients.iter().copied()).collect();
    coefficients.sort_by(|a, b| b.1.total_cmp(&a.1));
    debug!("intercept {:.4}, coefficients {:?}", model.intercept, coefficients);

    Ok(RegressionReport {
        r2: r2_score(&target, &predicted),
        rmse: rmse(&target, &predicted),
        model,
        coefficients,
        predicted,
        residuals,
    })
}

/// Models which subsystems drive grid energy use and saves the coefficient and residual charts
pub fn model_grid_dependence(path: &Path, output_dir: &Path) -> Result<RegressionReport> {
    let mut required: Vec<&str> = FEATURES.iter().map(|c| c.header()).collect();
    required.push(TARGET.header());
    let data = load_dataset(path, &required)?;
    require_output_dir(output_dir)?;

    let report = fit_grid_model(&data)?;

    let names: Vec<String> = report.coefficients.iter().map(|(c, _)| c.header().to_string()).collect();
    let values: Vec<Option<f64>> = report.coefficients.iter().map(|(_, v)| Some(*v)).collect();
    charts::bar_chart(
        &output_dir.join(COEFFICIENTS_FILE),
        "Linear Regression Coefficients for Grid Energy Use",
        &names,
        &values,
        "Influence on Grid Energy Use (kWh)",
        &charts::palette(charts::CREST, names.len()),
        false,
    )?;
    charts::residual_plot(&output_dir.join(RESIDUALS_FILE), "Residual Plot", &report.predicted, &report.residuals)?;

    println!("Regression R² score: {:.4}, RMSE: {:.2}", report.r2, report.rmse);
    info!("regression charts saved to: {}", output_dir.display());
    Ok(report)
}
