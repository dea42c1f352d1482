//! Descriptive statistics shared by the analyses.
//!
//! Percentiles interpolate linearly between closest ranks and the standard
//! deviation is the sample one (n - 1), matching the usual dataframe defaults.

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Sample standard deviation, undefined below two observations
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    Some((ss / (values.len() - 1) as f64).sqrt())
}

pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut out = values.to_vec();
    out.sort_by(|a, b| a.total_cmp(b));
    out
}

/// Linear-interpolation percentile of ascending data, `q` in [0, 1]
pub fn percentile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let q = q.clamp(0.0, 1.0);
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    percentile_sorted(&sorted(values), q)
}

/// Five-number summary plus count, mean and standard deviation.
/// Undefined entries are NaN so that the table prints like a describe() frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

pub fn describe(values: &[f64]) -> Summary {
    let s = sorted(values);
    let at = |q: f64| percentile_sorted(&s, q).unwrap_or(f64::NAN);
    Summary {
        count: s.len(),
        mean: mean(&s).unwrap_or(f64::NAN),
        std: sample_std(&s).unwrap_or(f64::NAN),
        min: s.first().copied().unwrap_or(f64::NAN),
        q25: at(0.25),
        median: at(0.5),
        q75: at(0.75),
        max: s.last().copied().unwrap_or(f64::NAN),
    }
}

/// Box and whisker geometry with the 1.5 x IQR rule
#[derive(Debug, Clone, PartialEq)]
pub struct BoxplotStats {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    /// Smallest observation not below q1 - 1.5 IQR
    pub lower_whisker: f64,
    /// Largest observation not above q3 + 1.5 IQR
    pub upper_whisker: f64,
    pub outliers: Vec<f64>,
}

pub fn boxplot_stats(values: &[f64]) -> Option<BoxplotStats> {
    let s = sorted(values);
    let q1 = percentile_sorted(&s, 0.25)?;
    let median = percentile_sorted(&s, 0.5)?;
    let q3 = percentile_sorted(&s, 0.75)?;
    let iqr = q3 - q1;
    let low_fence = q1 - 1.5 * iqr;
    let high_fence = q3 + 1.5 * iqr;

    let inside: Vec<f64> = s.iter().copied().filter(|v| *v >= low_fence && *v <= high_fence).collect();
    let outliers = s.iter().copied().filter(|v| *v < low_fence || *v > high_fence).collect();

    Some(BoxplotStats {
        q1,
        median,
        q3,
        lower_whisker: inside.first().copied().unwrap_or(q1),
        upper_whisker: inside.last().copied().unwrap_or(q3),
        outliers,
    })
}

/// Pearson correlation coefficient, None when either side has no variance
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mx = mean(x)?;
    let my = mean(y)?;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (a, b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx).powi(2);
        syy += (b - my).powi(2);
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some((sxy / (sxx * syy).sqrt()).clamp(-1.0, 1.0))
}

/// Pearson correlation over the positions where both series have a value
pub fn pearson_pairwise(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y)
        .filter_map(|(a, b)| Some(((*a)?, (*b)?)))
        .unzip();
    pearson(&xs, &ys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn percentile_interpolates_between_ranks() {
        let v = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(percentile(&v, 0.5).unwrap(), 2.5);
        assert_relative_eq!(percentile(&v, 0.25).unwrap(), 1.75);
        assert_relative_eq!(percentile(&v, 0.95).unwrap(), 3.85, epsilon = 1e-12);
        assert_relative_eq!(percentile(&v, 0.0).unwrap(), 1.0);
        assert_relative_eq!(percentile(&v, 1.0).unwrap(), 4.0);
        assert_eq!(percentile(&[], 0.5), None);
    }

    #[test]
    fn percentile_ignores_input_order() {
        let v = [10.0, 1.0, 7.0, 3.0, 5.0];
        assert_relative_eq!(percentile(&v, 0.5).unwrap(), 5.0);
    }

    #[test]
    fn describe_matches_known_values() {
        let s = describe(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(s.count, 8);
        assert_relative_eq!(s.mean, 5.0);
        assert_relative_eq!(s.std, (32.0f64 / 7.0).sqrt(), epsilon = 1e-12);
        assert_relative_eq!(s.min, 2.0);
        assert_relative_eq!(s.q25, 4.0);
        assert_relative_eq!(s.median, 4.5);
        assert_relative_eq!(s.q75, 5.5);
        assert_relative_eq!(s.max, 9.0);
    }

    #[test]
    fn describe_single_value_has_undefined_std() {
        let s = describe(&[3.0]);
        assert_eq!(s.count, 1);
        assert!(s.std.is_nan());
        assert_relative_eq!(s.median, 3.0);
    }

    #[test]
    fn whiskers_stop_at_last_point_inside_fence() {
        // q1 = 2, q3 = 4, fences at -1 and 7
        let v = [1.0, 2.0, 2.0, 3.0, 4.0, 4.0, 6.5, 20.0, -5.0];
        let b = boxplot_stats(&v).unwrap();
        assert_relative_eq!(b.q1, 2.0);
        assert_relative_eq!(b.q3, 4.0);
        assert_relative_eq!(b.lower_whisker, 1.0);
        assert_relative_eq!(b.upper_whisker, 6.5);
        assert_eq!(b.outliers, vec![-5.0, 20.0]);
    }

    #[test]
    fn pearson_detects_perfect_relationships() {
        let x = [1.0, 2.0, 3.0, 4.0];
        assert_relative_eq!(pearson(&x, &[2.0, 4.0, 6.0, 8.0]).unwrap(), 1.0);
        assert_relative_eq!(pearson(&x, &[8.0, 6.0, 4.0, 2.0]).unwrap(), -1.0);
        assert_eq!(pearson(&x, &[1.0, 1.0, 1.0, 1.0]), None);
    }

    #[test]
    fn pairwise_pearson_skips_gaps() {
        let x = [Some(1.0), None, Some(2.0), Some(3.0)];
        let y = [Some(3.0), Some(100.0), Some(2.0), None];
        // only (1,3) and (2,2) remain
        assert_relative_eq!(pearson_pairwise(&x, &y).unwrap(), -1.0);
    }
}
