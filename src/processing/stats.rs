/// Arithmetic mean, `None` for an empty slice
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1 denominator). A single sample has no
/// spread and yields 0 rather than an undefined value.
pub fn sample_std(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let sum_sq: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (sum_sq / (n - 1) as f64).sqrt()
}

/// Mean and sample standard deviation together
pub fn mean_and_std(values: &[f64]) -> Option<(f64, f64)> {
    mean(values).map(|m| (m, sample_std(values)))
}

/// Combine independent error sources in quadrature
pub fn quadrature(errors: &[f64]) -> f64 {
    errors.iter().map(|e| e * e).sum::<f64>().sqrt()
}

/// Error from perturbing an input both ways: half the spread of the two
/// outcomes. When one side is undefined (a ray past the horizon) the
/// distance from `centre` to the defined side is used instead.
pub fn half_spread(lower: f64, upper: f64, centre: f64) -> f64 {
    match (lower.is_finite(), upper.is_finite()) {
        (true, true) => (upper - lower).abs() / 2.0,
        (true, false) => (centre - lower).abs(),
        (false, true) => (upper - centre).abs(),
        (false, false) => f64::INFINITY,
    }
}
