//! Min-max normalization

use super::frame::AnalysisFrame;

/// Scale to [0, 1] using the column's own min and max.
///
/// Nulls pass through. A constant or all-null column has no range and
/// normalizes to all null.
pub fn min_max_normalize(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let (min, max) = values
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;
    if !range.is_finite() || range == 0.0 {
        return vec![None; values.len()];
    }
    values.iter().map(|v| v.map(|v| (v - min) / range)).collect()
}

/// Normalize every column of a frame independently
pub fn normalize_frame(frame: &AnalysisFrame) -> AnalysisFrame {
    AnalysisFrame::new(
        frame.keys.clone(),
        frame.labels.clone(),
        frame.columns.iter().map(|c| min_max_normalize(c)).collect(),
    )
}
