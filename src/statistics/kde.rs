use std::f64::consts::PI;

use thiserror::Error;

use super::Curve;

/// Number of evaluation points of a density curve.
pub const KDE_POINTS: usize = 256;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum KdeError {
    #[error("at least two samples are needed for a density estimate, got {0}")]
    TooFewSamples(usize),

    #[error("samples have zero variance, density is undefined")]
    ZeroVariance,
}

/// Gaussian kernel density estimate with Scott's bandwidth, evaluated on
/// `points` evenly spaced positions between the smallest and largest sample.
pub fn gaussian_kde(samples: &[f64], points: usize) -> Result<Curve, KdeError> {
    let n = samples.len();
    if n < 2 {
        return Err(KdeError::TooFewSamples(n));
    }

    let mean = samples.iter().sum::<f64>() / n as f64;
    let variance = samples.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;
    if variance <= 0.0 || !variance.is_finite() {
        return Err(KdeError::ZeroVariance);
    }

    let factor = (n as f64).powf(-0.2);
    let kernel_variance = variance * factor * factor;
    let norm = 1.0 / ((2.0 * PI * kernel_variance).sqrt() * n as f64);

    let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
    let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let step = if points > 1 {
        (max - min) / (points - 1) as f64
    } else {
        0.0
    };

    let x: Vec<f64> = (0..points).map(|i| min + step * i as f64).collect();
    let y = x
        .iter()
        .map(|&at| {
            norm * samples
                .iter()
                .map(|s| (-(at - s).powi(2) / (2.0 * kernel_variance)).exp())
                .sum::<f64>()
        })
        .collect();

    Ok(Curve { x, y })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn density_integrates_to_about_one() {
        let samples: Vec<f64> = (0..500).map(|i| ((i * 37) % 101) as f64).collect();
        let curve = gaussian_kde(&samples, KDE_POINTS).unwrap();
        assert_eq!(curve.x.len(), KDE_POINTS);

        let dx = curve.x[1] - curve.x[0];
        let area: f64 = curve.y.iter().sum::<f64>() * dx;
        // the grid stops at the sample extremes and cuts off kernel tails
        assert!(area > 0.8 && area <= 1.01, "area = {area}");
    }

    #[test]
    fn grid_spans_samples() {
        let curve = gaussian_kde(&[3.0, -1.0, 2.0, 7.0], 5).unwrap();
        assert_eq!(curve.x, vec![-1.0, 1.0, 3.0, 5.0, 7.0]);
        assert!(curve.y.iter().all(|&d| d > 0.0));
    }

    #[test]
    fn symmetric_samples_give_symmetric_density() {
        let curve = gaussian_kde(&[-2.0, -1.0, 0.0, 1.0, 2.0], 9).unwrap();
        for i in 0..4 {
            assert!((curve.y[i] - curve.y[8 - i]).abs() < 1e-12);
        }
    }

    #[test]
    fn degenerate_inputs_are_rejected() {
        assert_eq!(gaussian_kde(&[1.0], 10), Err(KdeError::TooFewSamples(1)));
        assert_eq!(gaussian_kde(&[4.0, 4.0, 4.0], 10), Err(KdeError::ZeroVariance));
    }
}
