use std::fmt;

use crate::statistics::{self, Curve, SeriesProvider, StatsError};

// ---------------------------------------------------------------------------
// Which statistics to draw over the raw data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayKind {
    Mean,
    Median,
    CumulativeAverage,
    AutoCorrelation,
    RunningAverage(usize),
}

impl fmt::Display for OverlayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverlayKind::Mean => write!(f, "Mean"),
            OverlayKind::Median => write!(f, "Median"),
            OverlayKind::CumulativeAverage => write!(f, "Cumulative Average"),
            OverlayKind::AutoCorrelation => write!(f, "Auto Correlation"),
            OverlayKind::RunningAverage(window) => write!(f, "Running Average ({window})"),
        }
    }
}

impl OverlayKind {
    /// Overlays that are a single level and make sense on a density plot.
    pub fn is_level(&self) -> bool {
        matches!(self, OverlayKind::Mean | OverlayKind::Median)
    }

    fn compute<S: SeriesProvider>(&self, series: &[S], quantity: &str) -> Result<Curve, StatsError> {
        match *self {
            OverlayKind::Mean => statistics::mean(series, quantity),
            OverlayKind::Median => statistics::median(series, quantity),
            OverlayKind::CumulativeAverage => statistics::cumulative_average(series, quantity),
            OverlayKind::AutoCorrelation => statistics::auto_correlation(series, quantity),
            OverlayKind::RunningAverage(window) => statistics::running_average(series, quantity, window),
        }
    }
}

/// The statistics toggled on by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlaySelection {
    pub mean: bool,
    pub median: bool,
    pub cumulative_average: bool,
    pub auto_correlation: bool,
    /// Window size when the running average is enabled.
    pub running_average: Option<usize>,
}

impl OverlaySelection {
    /// Enabled overlays in drawing order.
    pub fn kinds(&self) -> Vec<OverlayKind> {
        let mut kinds = Vec::new();
        if self.mean {
            kinds.push(OverlayKind::Mean);
        }
        if self.median {
            kinds.push(OverlayKind::Median);
        }
        if self.cumulative_average {
            kinds.push(OverlayKind::CumulativeAverage);
        }
        if self.auto_correlation {
            kinds.push(OverlayKind::AutoCorrelation);
        }
        if let Some(window) = self.running_average {
            kinds.push(OverlayKind::RunningAverage(window));
        }
        kinds
    }
}

// ---------------------------------------------------------------------------
// Computed overlays
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    pub kind: OverlayKind,
    pub curve: Curve,
}

impl Overlay {
    /// Text for the value label at the end of the curve.
    pub fn value_label(&self) -> Option<String> {
        let (_, y) = self.curve.last()?;
        Some(format!("{y:.3e}"))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overlays {
    pub curves: Vec<Overlay>,
    /// Overlays dropped because of bad user input, with the reason.
    pub skipped: Vec<(OverlayKind, StatsError)>,
}

impl Overlays {
    /// One line per skipped overlay, for the status bar.
    pub fn skipped_message(&self) -> Option<String> {
        if self.skipped.is_empty() {
            return None;
        }
        let lines: Vec<String> = self
            .skipped
            .iter()
            .map(|(kind, err)| format!("{kind}: {err}"))
            .collect();
        Some(lines.join("; "))
    }
}

/// Compute every selected overlay for `quantity`.
///
/// Recoverable errors (a bad window size) only drop the affected overlay;
/// anything else aborts and is returned to the caller.
pub fn compute_overlays<S: SeriesProvider>(
    series: &[S],
    quantity: &str,
    selection: &OverlaySelection,
) -> Result<Overlays, StatsError> {
    let mut overlays = Overlays::default();
    for kind in selection.kinds() {
        match kind.compute(series, quantity) {
            Ok(curve) => overlays.curves.push(Overlay { kind, curve }),
            Err(err) if err.is_recoverable() => {
                log::warn!("Skipping {kind} overlay: {err}");
                overlays.skipped.push((kind, err));
            }
            Err(err) => return Err(err),
        }
    }
    log::debug!(
        "Computed {} overlay(s) for {quantity}, skipped {}",
        overlays.curves.len(),
        overlays.skipped.len()
    );
    Ok(overlays)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Ramp(Vec<f64>);

    impl SeriesProvider for Ramp {
        fn time(&self) -> &[f64] {
            &self.0
        }

        fn values(&self, quantity: &str) -> Option<&[f64]> {
            (quantity == "ENERGY").then_some(self.0.as_slice())
        }
    }

    fn ramp() -> Ramp {
        Ramp(vec![1.0, 2.0, 3.0, 4.0, 5.0])
    }

    #[test]
    fn labels() {
        assert_eq!(OverlayKind::CumulativeAverage.to_string(), "Cumulative Average");
        assert_eq!(OverlayKind::RunningAverage(10).to_string(), "Running Average (10)");
        assert!(OverlayKind::Median.is_level());
        assert!(!OverlayKind::AutoCorrelation.is_level());
    }

    #[test]
    fn all_selected_overlays_in_order() {
        let selection = OverlaySelection {
            mean: true,
            median: true,
            cumulative_average: true,
            auto_correlation: true,
            running_average: Some(2),
        };
        let overlays = compute_overlays(&[ramp()], "ENERGY", &selection).unwrap();
        let kinds: Vec<_> = overlays.curves.iter().map(|o| o.kind).collect();
        assert_eq!(kinds, selection.kinds());
        assert!(overlays.skipped.is_empty());
        assert_eq!(overlays.curves[0].value_label().as_deref(), Some("3.000e0"));
    }

    #[test]
    fn oversized_window_only_skips_running_average() {
        let selection = OverlaySelection {
            mean: true,
            running_average: Some(6),
            ..Default::default()
        };
        let overlays = compute_overlays(&[ramp()], "ENERGY", &selection).unwrap();
        assert_eq!(overlays.curves.len(), 1);
        assert_eq!(overlays.curves[0].kind, OverlayKind::Mean);
        assert_eq!(overlays.skipped.len(), 1);
        let message = overlays.skipped_message().unwrap();
        assert!(message.starts_with("Running Average (6): window size is larger"));
    }

    #[test]
    fn missing_quantity_propagates() {
        let selection = OverlaySelection {
            median: true,
            ..Default::default()
        };
        let err = compute_overlays(&[ramp()], "PRESSURE", &selection).unwrap_err();
        assert!(matches!(err, StatsError::UnknownQuantity { .. }));
    }

    #[test]
    fn nothing_selected() {
        let overlays = compute_overlays(&[ramp()], "ENERGY", &OverlaySelection::default()).unwrap();
        assert_eq!(overlays, Overlays::default());
        assert_eq!(overlays.skipped_message(), None);
    }
}
