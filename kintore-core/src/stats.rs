//! Derived display values. Nothing here is persisted.

/// Estimated max lift for a single set, rounded to the nearest 0.5 kg.
///
/// Returns `None` unless both weight and reps are present and positive.
pub fn estimate_rm(weight: Option<f64>, reps: Option<i64>) -> Option<f64> {
    let weight = weight?;
    let reps = reps?;
    if weight <= 0.0 || reps <= 0 {
        return None;
    }
    let raw = weight * (1.0 + reps as f64 / 40.0);
    Some((raw * 2.0).round() / 2.0)
}
