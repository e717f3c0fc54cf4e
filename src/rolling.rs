//! Trailing rolling means over ordered series.

///Trailing mean over the last `window` values, one entry per input value.
///The first `window - 1` entries have no full window and are `None`, as is every entry for a
///zero window.
/// # Example
/// ```
/// use corpus_stats::rolling_mean;
/// let smooth = rolling_mean(&[1.0, 2.0, 3.0, 4.0], 2);
/// assert_eq!(smooth, vec![None, Some(1.5), Some(2.5), Some(3.5)]);
/// ```
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 || values.len() < window {
        return vec![None; values.len()];
    }
    let mut out = vec![None; window - 1];
    out.extend(
        values
            .windows(window)
            .map(|w| Some(w.iter().sum::<f64>() / window as f64)),
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_series_has_no_full_window() {
        assert_eq!(rolling_mean(&[1.0, 2.0], 7), vec![None, None]);
        assert!(rolling_mean(&[], 3).is_empty());
    }

    #[test]
    fn window_of_one_is_identity() {
        let v = [0.5, -0.25, 1.0];
        let out: Vec<f64> = rolling_mean(&v, 1).into_iter().flatten().collect();
        assert_eq!(out, v);
    }

    #[test]
    fn zero_window_is_empty_everywhere() {
        assert_eq!(rolling_mean(&[1.0, 2.0], 0), vec![None, None]);
    }
}
