//! Small numeric helpers over return and position columns.

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

/// Rescale to zero mean and unit (population) standard deviation.
///
/// A constant input has zero deviation and yields NaN everywhere.
pub fn standardize(values: &[f64]) -> Vec<f64> {
    let m = mean(values);
    let s = std_dev(values);
    values.iter().map(|v| (v - m) / s).collect()
}
