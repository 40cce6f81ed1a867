//! Statistics over one or more energy series.
//!
//! Every function takes the whole collection, concatenates the time axis and
//! the requested quantity in collection order, and returns a [`Curve`] ready
//! to be drawn on top of the raw data. Nothing is cached: the functions are
//! pure and can be called on every repaint.

pub mod kde;

use std::sync::Arc;

use rayon::prelude::*;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Input: anything exposing a time axis and named, aligned samples
// ---------------------------------------------------------------------------

/// Source of one time axis plus named sample sequences aligned with it.
pub trait SeriesProvider {
    fn time(&self) -> &[f64];

    /// Samples of `quantity`, `None` when the source does not track it.
    fn values(&self, quantity: &str) -> Option<&[f64]>;
}

impl<T: SeriesProvider + ?Sized> SeriesProvider for Arc<T> {
    fn time(&self) -> &[f64] {
        (**self).time()
    }

    fn values(&self, quantity: &str) -> Option<&[f64]> {
        (**self).values(quantity)
    }
}

impl<T: SeriesProvider + ?Sized> SeriesProvider for &T {
    fn time(&self) -> &[f64] {
        (**self).time()
    }

    fn values(&self, quantity: &str) -> Option<&[f64]> {
        (**self).values(quantity)
    }
}

// ---------------------------------------------------------------------------
// Output / errors
// ---------------------------------------------------------------------------

/// A derived curve; `x.len() == y.len()` always holds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Curve {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
}

impl Curve {
    /// `[x, y]` pairs with non-finite points removed, as the plot expects.
    pub fn points(&self) -> Vec<[f64; 2]> {
        self.x
            .iter()
            .zip(&self.y)
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .map(|(&x, &y)| [x, y])
            .collect()
    }

    /// Last point of the curve.
    pub fn last(&self) -> Option<(f64, f64)> {
        Some((*self.x.last()?, *self.y.last()?))
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StatsError {
    #[error("quantity '{quantity}' is missing from series {series}")]
    UnknownQuantity { quantity: String, series: usize },

    #[error("no samples to compute statistics from")]
    NoSamples,

    #[error("window size is larger than given data point ({window_size} > {samples})")]
    WindowTooLarge { window_size: usize, samples: usize },

    #[error("window size must be at least 1")]
    ZeroWindow,
}

impl StatsError {
    /// Errors caused by user input; the caller drops the affected overlay
    /// and keeps going.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, StatsError::WindowTooLarge { .. } | StatsError::ZeroWindow)
    }
}

pub type Result<T> = std::result::Result<T, StatsError>;

// ---------------------------------------------------------------------------
// Concatenation
// ---------------------------------------------------------------------------

/// Concatenate the time axis and `quantity` of every series, in order.
pub fn concatenate<S: SeriesProvider>(series: &[S], quantity: &str) -> Result<(Vec<f64>, Vec<f64>)> {
    let total: usize = series.iter().map(|s| s.time().len()).sum();
    let mut time = Vec::with_capacity(total);
    let mut values = Vec::with_capacity(total);

    for (index, s) in series.iter().enumerate() {
        let samples = s.values(quantity).ok_or_else(|| StatsError::UnknownQuantity {
            quantity: quantity.to_string(),
            series: index,
        })?;
        time.extend_from_slice(s.time());
        values.extend_from_slice(samples);
    }

    Ok((time, values))
}

/// Like [`concatenate`] but refuses an empty result.
fn samples<S: SeriesProvider>(series: &[S], quantity: &str) -> Result<(Vec<f64>, Vec<f64>)> {
    let (time, values) = concatenate(series, quantity)?;
    if values.is_empty() {
        return Err(StatsError::NoSamples);
    }
    Ok((time, values))
}

fn horizontal(time: &[f64], level: f64) -> Curve {
    let first = time.first().copied().unwrap_or(f64::NAN);
    let last = time.last().copied().unwrap_or(f64::NAN);
    Curve {
        x: vec![first, last],
        y: vec![level, level],
    }
}

// ---------------------------------------------------------------------------
// Aggregates
// ---------------------------------------------------------------------------

/// Horizontal line at the arithmetic mean, spanning the full time extent.
pub fn mean<S: SeriesProvider>(series: &[S], quantity: &str) -> Result<Curve> {
    let (time, values) = samples(series, quantity)?;
    let m = values.iter().sum::<f64>() / values.len() as f64;
    Ok(horizontal(&time, m))
}

/// Horizontal line at the median, spanning the full time extent. `NaN` if
/// any sample is `NaN`.
pub fn median<S: SeriesProvider>(series: &[S], quantity: &str) -> Result<Curve> {
    let (time, mut values) = samples(series, quantity)?;
    if values.iter().any(|v| v.is_nan()) {
        return Ok(horizontal(&time, f64::NAN));
    }
    values.sort_unstable_by(f64::total_cmp);

    let n = values.len();
    let m = if n % 2 == 0 {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    } else {
        values[n / 2]
    };
    Ok(horizontal(&time, m))
}

/// Running mean from the first sample up to and including each index.
pub fn cumulative_average<S: SeriesProvider>(series: &[S], quantity: &str) -> Result<Curve> {
    let (time, values) = samples(series, quantity)?;
    let y = values
        .iter()
        .scan(0.0, |sum, &v| {
            *sum += v;
            Some(*sum)
        })
        .enumerate()
        .map(|(i, sum)| sum / (i + 1) as f64)
        .collect();
    Ok(Curve { x: time, y })
}

/// Autocorrelation normalised by the number of overlapping samples.
///
/// `y[i]` is the "same"-mode correlation of the values with themselves at lag
/// `i - M/2`, divided by the correlation of an all-ones sequence with the
/// values at the same lag. A zero denominator yields `NaN`, also when the
/// numerator is non-zero (a plain float division would give `±inf`).
pub fn auto_correlation<S: SeriesProvider>(series: &[S], quantity: &str) -> Result<Curve> {
    let (time, values) = samples(series, quantity)?;
    let n = values.len();
    let offset = (n / 2) as isize;

    let y = (0..n)
        .into_par_iter()
        .map(|i| {
            let (numerator, denominator) = lagged(&values, i as isize - offset);
            if denominator == 0.0 {
                f64::NAN
            } else {
                numerator / denominator
            }
        })
        .collect();

    Ok(Curve { x: time, y })
}

/// `(Σ v[n+k]·v[n], Σ v[n])` over every `n` with both indices in range.
fn lagged(values: &[f64], lag: isize) -> (f64, f64) {
    let n = values.len();
    let shift = lag.unsigned_abs();
    if shift >= n {
        return (0.0, 0.0);
    }
    // `leading` is indexed by n + lag, `trailing` by n.
    let (leading, trailing) = if lag >= 0 {
        (&values[shift..], &values[..n - shift])
    } else {
        (&values[..n - shift], &values[shift..])
    };
    let product = leading.iter().zip(trailing).map(|(a, b)| a * b).sum();
    (product, trailing.iter().sum())
}

/// Moving average over `window_size` samples, each window reported at the
/// mean timestamp inside it.
pub fn running_average<S: SeriesProvider>(
    series: &[S],
    quantity: &str,
    window_size: usize,
) -> Result<Curve> {
    if window_size == 0 {
        return Err(StatsError::ZeroWindow);
    }
    let (time, values) = samples(series, quantity)?;
    if values.len() < window_size {
        return Err(StatsError::WindowTooLarge {
            window_size,
            samples: values.len(),
        });
    }

    let width = window_size as f64;
    let average = |window: &[f64]| window.iter().sum::<f64>() / width;

    Ok(Curve {
        x: time.par_windows(window_size).map(average).collect(),
        y: values.par_windows(window_size).map(average).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::collection::vec;
    use proptest::prelude::*;

    struct Fixture {
        time: Vec<f64>,
        energy: Vec<f64>,
    }

    impl SeriesProvider for Fixture {
        fn time(&self) -> &[f64] {
            &self.time
        }

        fn values(&self, quantity: &str) -> Option<&[f64]> {
            match quantity {
                "SIMULATION-TIME" => Some(&self.time),
                "ENERGY" => Some(&self.energy),
                _ => None,
            }
        }
    }

    fn steps(from: u32, to: u32) -> Fixture {
        let time: Vec<f64> = (from..=to).map(f64::from).collect();
        Fixture {
            energy: time.clone(),
            time,
        }
    }

    fn random(values: Vec<f64>) -> Fixture {
        Fixture {
            time: (0..values.len()).map(|i| i as f64).collect(),
            energy: values,
        }
    }

    fn assert_close(actual: &[f64], expected: &[f64], rtol: f64) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() <= rtol * e.abs(), "{a} != {e}");
        }
    }

    #[test]
    fn test_mean() {
        let curve = mean(&[steps(1, 5)], "SIMULATION-TIME").unwrap();
        assert_eq!(curve.x, vec![1.0, 5.0]);
        assert_eq!(curve.y, vec![3.0, 3.0]);

        let curve = mean(&[steps(6, 10)], "SIMULATION-TIME").unwrap();
        assert_eq!(curve.x, vec![6.0, 10.0]);
        assert_eq!(curve.y, vec![8.0, 8.0]);
    }

    #[test]
    fn test_mean_spans_all_sources() {
        let curve = mean(&[steps(1, 5), steps(6, 10)], "ENERGY").unwrap();
        assert_eq!(curve.x, vec![1.0, 10.0]);
        assert_eq!(curve.y, vec![5.5, 5.5]);
    }

    #[test]
    fn test_mean_single_sample() {
        let curve = mean(&[steps(4, 4)], "ENERGY").unwrap();
        assert_eq!(curve.x, vec![4.0, 4.0]);
        assert_eq!(curve.y, vec![4.0, 4.0]);
    }

    #[test]
    fn test_median() {
        let curve = median(&[steps(1, 5)], "SIMULATION-TIME").unwrap();
        assert_eq!(curve.x, vec![1.0, 5.0]);
        assert_eq!(curve.y, vec![3.0, 3.0]);

        let curve = median(&[steps(6, 10)], "SIMULATION-TIME").unwrap();
        assert_eq!(curve.y, vec![8.0, 8.0]);

        let even = random(vec![4.0, 1.0, 3.0, 2.0]);
        assert_eq!(median(&[even], "ENERGY").unwrap().y, vec![2.5, 2.5]);
    }

    #[test]
    fn test_cumulative_average() {
        let curve = cumulative_average(&[steps(1, 5)], "SIMULATION-TIME").unwrap();
        assert_eq!(curve.x, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(curve.y, vec![1.0, 1.5, 2.0, 2.5, 3.0]);

        let curve = cumulative_average(&[steps(6, 10)], "SIMULATION-TIME").unwrap();
        assert_eq!(curve.x, vec![6.0, 7.0, 8.0, 9.0, 10.0]);
        assert_eq!(curve.y, vec![6.0, 6.5, 7.0, 7.5, 8.0]);
    }

    #[test]
    fn test_auto_correlation() {
        let curve = auto_correlation(&[steps(1, 5)], "SIMULATION-TIME").unwrap();
        assert_eq!(curve.x, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_close(&curve.y, &[2.1666, 2.8571, 3.6666, 4.0, 4.3333], 1e-4);

        let curve = auto_correlation(&[steps(6, 10)], "SIMULATION-TIME").unwrap();
        assert_eq!(curve.x, vec![6.0, 7.0, 8.0, 9.0, 10.0]);
        assert_close(&curve.y, &[7.0741, 7.6471, 8.25, 8.6666, 9.0952], 1e-4);
    }

    #[test]
    fn test_auto_correlation_even_length_lags() {
        // lags -2..=1 for four samples
        let curve = auto_correlation(&[steps(1, 4)], "ENERGY").unwrap();
        assert_close(&curve.y, &[11.0 / 7.0, 20.0 / 9.0, 3.0, 20.0 / 6.0], 1e-12);
    }

    #[test]
    fn test_auto_correlation_constant_and_zero() {
        let constant = random(vec![2.5; 6]);
        let curve = auto_correlation(&[constant], "ENERGY").unwrap();
        assert!(curve.y.iter().all(|&y| (y - 2.5).abs() < 1e-12));

        let zeros = random(vec![0.0; 4]);
        let curve = auto_correlation(&[zeros], "ENERGY").unwrap();
        assert!(curve.y.iter().all(|y| y.is_nan()));
        assert!(curve.points().is_empty());
    }

    #[test]
    fn test_running_average() {
        let curve = running_average(&[steps(1, 5)], "SIMULATION-TIME", 2).unwrap();
        assert_eq!(curve.x, vec![1.5, 2.5, 3.5, 4.5]);
        assert_eq!(curve.y, vec![1.5, 2.5, 3.5, 4.5]);

        let curve = running_average(&[steps(6, 10)], "SIMULATION-TIME", 2).unwrap();
        assert_eq!(curve.x, vec![6.5, 7.5, 8.5, 9.5]);
        assert_eq!(curve.y, vec![6.5, 7.5, 8.5, 9.5]);

        let curve = running_average(&[steps(6, 10)], "SIMULATION-TIME", 1).unwrap();
        assert_eq!(curve.x, vec![6.0, 7.0, 8.0, 9.0, 10.0]);
        assert_eq!(curve.y, vec![6.0, 7.0, 8.0, 9.0, 10.0]);
    }

    #[test]
    fn test_running_average_full_window() {
        let curve = running_average(&[steps(1, 5)], "ENERGY", 5).unwrap();
        assert_eq!(curve.x, vec![3.0]);
        assert_eq!(curve.y, vec![3.0]);
    }

    #[test]
    fn test_running_average_window_errors() {
        let err = running_average(&[steps(6, 10)], "SIMULATION-TIME", 6).unwrap_err();
        assert_eq!(
            err,
            StatsError::WindowTooLarge {
                window_size: 6,
                samples: 5
            }
        );
        assert!(err.to_string().contains("window size is larger than given data point"));
        assert!(err.is_recoverable());

        let err = running_average(&[steps(1, 5)], "ENERGY", 0).unwrap_err();
        assert_eq!(err, StatsError::ZeroWindow);
    }

    #[test]
    fn test_running_average_without_samples() {
        let none: [Fixture; 0] = [];
        assert_eq!(running_average(&none, "ENERGY", 1).unwrap_err(), StatsError::NoSamples);

        let err = running_average(&[random(Vec::new())], "ENERGY", 3).unwrap_err();
        assert_eq!(err, StatsError::NoSamples);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_median_with_nan() {
        let curve = median(&[random(vec![1.0, f64::NAN, 3.0])], "ENERGY").unwrap();
        assert_eq!(curve.x, vec![0.0, 2.0]);
        assert!(curve.y.iter().all(|y| y.is_nan()));

        let curve = median(&[random(vec![-f64::NAN, 1.0, 3.0])], "ENERGY").unwrap();
        assert!(curve.y.iter().all(|y| y.is_nan()));
    }

    #[test]
    fn test_auto_correlation_zero_denominator_with_products() {
        // lag 0: (1 + 1) / (1 - 1)
        let curve = auto_correlation(&[random(vec![1.0, -1.0])], "ENERGY").unwrap();
        assert_eq!(curve.y[0], 1.0);
        assert!(curve.y[1].is_nan());
    }

    #[test]
    fn test_unknown_quantity() {
        let err = mean(&[steps(1, 5), steps(6, 10)], "PRESSURE").unwrap_err();
        assert_eq!(
            err,
            StatsError::UnknownQuantity {
                quantity: "PRESSURE".to_string(),
                series: 0
            }
        );
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_empty_collection() {
        let none: [Fixture; 0] = [];
        assert_eq!(mean(&none, "ENERGY").unwrap_err(), StatsError::NoSamples);
        assert_eq!(
            auto_correlation(&[random(Vec::new())], "ENERGY").unwrap_err(),
            StatsError::NoSamples
        );
    }

    #[test]
    fn test_concatenate_keeps_order() {
        let (time, values) = concatenate(&[steps(6, 7), steps(1, 2)], "ENERGY").unwrap();
        assert_eq!(time, vec![6.0, 7.0, 1.0, 2.0]);
        assert_eq!(values, vec![6.0, 7.0, 1.0, 2.0]);
    }

    #[test]
    fn test_arc_providers() {
        let shared = vec![Arc::new(steps(1, 5))];
        assert_eq!(mean(&shared, "ENERGY").unwrap().y, vec![3.0, 3.0]);
    }

    fn values_strategy() -> impl Strategy<Value = Vec<f64>> {
        vec(-1.0e6..1.0e6f64, 1..200)
    }

    proptest! {
        #[test]
        fn mean_within_bounds(values in values_strategy()) {
            let min = values.iter().copied().fold(f64::INFINITY, f64::min);
            let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            let tolerance = 1e-9 * (max.abs().max(min.abs()).max(1.0));
            let curve = mean(&[random(values)], "ENERGY").unwrap();
            prop_assert!(curve.y[0] >= min - tolerance && curve.y[0] <= max + tolerance);
        }

        #[test]
        fn cumulative_average_ends_at_mean(a in values_strategy(), b in values_strategy()) {
            let sources = [random(a), random(b)];
            let cumulative = cumulative_average(&sources, "ENERGY").unwrap();
            let m = mean(&sources, "ENERGY").unwrap();
            prop_assert_eq!(cumulative.y.last().copied(), Some(m.y[0]));
        }

        #[test]
        fn running_average_length(values in values_strategy(), window in 1usize..250) {
            let total = values.len();
            let result = running_average(&[random(values)], "ENERGY", window);
            if window > total {
                prop_assert!(
                    matches!(result, Err(StatsError::WindowTooLarge { .. })),
                    "expected a window error"
                );
            } else {
                let curve = result.unwrap();
                prop_assert_eq!(curve.x.len(), total - window + 1);
                prop_assert_eq!(curve.y.len(), total - window + 1);
            }
        }

        #[test]
        fn running_average_unit_window_is_identity(values in values_strategy()) {
            let source = random(values);
            let curve = running_average(std::slice::from_ref(&source), "ENERGY", 1).unwrap();
            prop_assert_eq!(&curve.x, &source.time);
            prop_assert_eq!(&curve.y, &source.energy);
        }

        #[test]
        fn auto_correlation_keeps_length(a in values_strategy(), b in values_strategy()) {
            let total = a.len() + b.len();
            let curve = auto_correlation(&[random(a), random(b)], "ENERGY").unwrap();
            prop_assert_eq!(curve.x.len(), total);
            prop_assert_eq!(curve.y.len(), total);
        }

        #[test]
        fn statistics_are_idempotent(values in values_strategy()) {
            let sources = [random(values)];
            prop_assert_eq!(mean(&sources, "ENERGY"), mean(&sources, "ENERGY"));
            prop_assert_eq!(median(&sources, "ENERGY"), median(&sources, "ENERGY"));
            prop_assert_eq!(
                cumulative_average(&sources, "ENERGY"),
                cumulative_average(&sources, "ENERGY")
            );
            prop_assert_eq!(
                running_average(&sources, "ENERGY", 3),
                running_average(&sources, "ENERGY", 3)
            );
            let first = auto_correlation(&sources, "ENERGY").unwrap();
            let second = auto_correlation(&sources, "ENERGY").unwrap();
            prop_assert!(first.y.iter().zip(&second.y).all(|(a, b)| a.to_bits() == b.to_bits()));
        }
    }
}
