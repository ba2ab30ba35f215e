//! Rolling z-score of a spread series

use statrs::statistics::Statistics;

/// `(x - mean) / std` over a trailing window, with sample standard deviation.
///
/// A position has no value until `window` samples are available, and also
/// when any sample in its window is missing or the window's deviation is
/// zero or not finite.
pub fn rolling_zscore(series: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..series.len())
        .map(|end| {
            if window < 2 || end + 1 < window {
                None
            } else {
                window_zscore(&series[end + 1 - window..=end])
            }
        })
        .collect()
}

/// Z-score of the last sample only
pub fn latest_zscore(series: &[Option<f64>], window: usize) -> Option<f64> {
    if window < 2 || series.len() < window {
        return None;
    }
    window_zscore(&series[series.len() - window..])
}

fn window_zscore(samples: &[Option<f64>]) -> Option<f64> {
    let values: Vec<f64> = samples.iter().copied().collect::<Option<Vec<f64>>>()?;
    let last = *values.last()?;

    let mean = values.iter().copied().mean();
    let std_dev = values.iter().copied().std_dev();
    if !std_dev.is_finite() || std_dev == 0.0 {
        return None;
    }

    let z = (last - mean) / std_dev;
    z.is_finite().then_some(z)
}
