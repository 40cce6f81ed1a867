use std::path::PathBuf;
use std::time::{Duration, Instant};

use eframe::egui::ThemePreference;

use crate::config::{self, Args, ConfigError};
use crate::data::reader::Reader;
use crate::overlay::{OverlaySelection, Overlays, compute_overlays};
use crate::statistics::kde::{KDE_POINTS, KdeError, gaussian_kde};
use crate::statistics::{Curve, SeriesProvider};

// ---------------------------------------------------------------------------
// Small UI enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlotKind {
    #[default]
    Time,
    Histogram,
}

impl PlotKind {
    pub fn label(&self) -> &'static str {
        match self {
            PlotKind::Time => "Plot",
            PlotKind::Histogram => "Histogram",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Appearance {
    #[default]
    System,
    Light,
    Dark,
}

impl Appearance {
    pub const ALL: [Appearance; 3] = [Appearance::System, Appearance::Light, Appearance::Dark];

    pub fn label(&self) -> &'static str {
        match self {
            Appearance::System => "System",
            Appearance::Light => "Light",
            Appearance::Dark => "Dark",
        }
    }

    pub fn theme_preference(&self) -> ThemePreference {
        match self {
            Appearance::System => ThemePreference::System,
            Appearance::Light => ThemePreference::Light,
            Appearance::Dark => ThemePreference::Dark,
        }
    }
}

// ---------------------------------------------------------------------------
// Cached plot data
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
struct CacheKey {
    generation: u64,
    quantity: String,
    selection: OverlaySelection,
    plot_kind: PlotKind,
}

/// Everything the central plot draws for the current selection.
#[derive(Debug, Clone, Default)]
pub struct PlotData {
    pub overlays: Overlays,
    /// One density per file (label, estimate); histogram mode only.
    pub densities: Vec<(String, Result<Curve, KdeError>)>,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Loaded energy files (None until the user loads some).
    pub reader: Option<Reader>,

    /// Quantity being plotted.
    pub quantity: Option<String>,

    pub plot_kind: PlotKind,

    /// Hide the raw data, draw only the statistics.
    pub hide_data: bool,

    // ---- statistics toggles ----
    pub mean: bool,
    pub median: bool,
    pub cumulative_average: bool,
    pub auto_correlation: bool,
    pub running_average: bool,
    /// Window-size entry text.
    pub window_text: String,

    // ---- follow mode ----
    pub follow: bool,
    /// Interval entry text in seconds.
    pub interval_text: String,
    pub last_refresh: Instant,

    pub appearance: Appearance,

    /// Status / error message shown in the UI.
    pub status_message: Option<String>,

    /// Why the statistics could not be computed for the current selection.
    pub plot_error: Option<String>,

    /// Bumped whenever the loaded data changes.
    generation: u64,
    /// Last computed key; `None` data when the computation failed.
    cache: Option<(CacheKey, Option<PlotData>)>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            reader: None,
            quantity: None,
            plot_kind: PlotKind::default(),
            hide_data: false,
            mean: false,
            median: false,
            cumulative_average: false,
            auto_correlation: false,
            running_average: false,
            window_text: String::new(),
            follow: false,
            interval_text: String::new(),
            last_refresh: Instant::now(),
            appearance: Appearance::default(),
            status_message: None,
            plot_error: None,
            generation: 0,
            cache: None,
        }
    }
}

impl AppState {
    /// Initial state from the command line; files given there are loaded now.
    pub fn from_args(args: &Args) -> Self {
        let mut state = AppState {
            follow: args.follow,
            interval_text: args.interval.to_string(),
            hide_data: args.no_data,
            ..Default::default()
        };
        if let Some(window) = args.window_size {
            state.running_average = true;
            state.window_text = window.to_string();
        }
        if !args.files.is_empty() {
            state.open_files(args.files.clone());
        }
        if let Some(quantity) = &args.quantity {
            state.select_quantity(quantity);
        }
        state
    }

    /// Load a new set of files, replacing whatever was loaded.
    pub fn open_files(&mut self, files: Vec<PathBuf>) {
        match Reader::new(files) {
            Ok(reader) => self.set_reader(reader),
            Err(e) => {
                log::error!("Failed to load files: {e:#}");
                self.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }

    /// Ingest a newly loaded collection and keep the quantity if it still exists.
    pub fn set_reader(&mut self, reader: Reader) {
        let keep = self
            .quantity
            .as_ref()
            .is_some_and(|q| reader.quantities().contains(q));
        if !keep {
            self.quantity = reader.quantities().first().cloned();
        }
        self.reader = Some(reader);
        self.status_message = None;
        self.last_refresh = Instant::now();
        self.generation += 1;
    }

    pub fn select_quantity(&mut self, quantity: &str) {
        let known = self
            .reader
            .as_ref()
            .is_some_and(|r| r.quantities().iter().any(|q| q == quantity));
        if known {
            self.quantity = Some(quantity.to_string());
        } else {
            self.status_message = Some(format!("Unknown quantity '{quantity}'"));
        }
    }

    /// Switch running average on or off, pre-filling the window entry.
    pub fn toggle_running_average(&mut self) {
        self.running_average = !self.running_average;
        if self.running_average {
            self.window_text = config::INITIAL_WINDOW_SIZE.to_string();
        } else {
            self.window_text.clear();
        }
    }

    /// Switch follow mode on or off, pre-filling the interval entry.
    pub fn toggle_follow(&mut self) {
        self.follow = !self.follow;
        if self.follow {
            if self.interval_text.trim().is_empty() {
                self.interval_text = config::DEFAULT_INTERVAL_SECS.to_string();
            }
            self.last_refresh = Instant::now();
        }
    }

    /// The statistics currently toggled on.
    pub fn selection(&self) -> Result<OverlaySelection, ConfigError> {
        let running_average = if self.running_average {
            Some(config::parse_window_size(&self.window_text)?)
        } else {
            None
        };
        Ok(OverlaySelection {
            mean: self.mean,
            median: self.median,
            cumulative_average: self.cumulative_average,
            auto_correlation: self.auto_correlation,
            running_average,
        })
    }

    pub fn follow_interval(&self) -> Result<Duration, ConfigError> {
        config::parse_interval(&self.interval_text)
    }

    /// Re-read the newest file. Errors are shown, the old data stays.
    pub fn refresh_last(&mut self) {
        self.last_refresh = Instant::now();
        let Some(reader) = self.reader.as_mut() else {
            return;
        };
        match reader.read_last() {
            Ok(()) => {
                self.generation += 1;
                if self
                    .status_message
                    .as_deref()
                    .is_some_and(|m| m.starts_with("Re-read failed"))
                {
                    self.status_message = None;
                }
            }
            Err(e) => {
                log::warn!("Re-reading the last file failed: {e:#}");
                self.status_message = Some(format!("Re-read failed: {e:#}"));
            }
        }
    }

    /// Follow-mode heartbeat, called once per frame.
    ///
    /// Re-reads the last file when the interval has elapsed and returns the
    /// time until the next re-read, `None` when not following.
    pub fn tick(&mut self, now: Instant) -> Option<Duration> {
        if !self.follow || self.reader.is_none() {
            return None;
        }
        let interval = match self.follow_interval() {
            Ok(interval) => interval,
            Err(e) => {
                self.status_message = Some(e.to_string());
                return None;
            }
        };
        let elapsed = now.saturating_duration_since(self.last_refresh);
        if elapsed >= interval {
            self.refresh_last();
            Some(interval)
        } else {
            Some(interval - elapsed)
        }
    }

    /// Recompute overlays and densities if the data or the selection
    /// changed since the last call.
    pub fn refresh_plot_data(&mut self) {
        let (Some(reader), Some(quantity)) = (self.reader.as_ref(), self.quantity.clone()) else {
            self.cache = None;
            self.plot_error = None;
            return;
        };
        let selection = match self.selection() {
            Ok(selection) => selection,
            Err(e) => {
                self.plot_error = Some(e.to_string());
                self.cache = None;
                return;
            }
        };
        let key = CacheKey {
            generation: self.generation,
            quantity,
            selection,
            plot_kind: self.plot_kind,
        };
        if self.cache.as_ref().is_some_and(|(cached, _)| *cached == key) {
            return;
        }

        match build_plot_data(reader, &key) {
            Ok(data) => {
                self.plot_error = data.overlays.skipped_message();
                self.cache = Some((key, Some(data)));
            }
            Err(e) => {
                log::error!("Statistics failed: {e}");
                self.plot_error = Some(format!("Error: {e}"));
                self.cache = Some((key, None));
            }
        }
    }

    /// Data computed by the last [`AppState::refresh_plot_data`].
    pub fn plot_data(&self) -> Option<&PlotData> {
        self.cache.as_ref().and_then(|(_, data)| data.as_ref())
    }
}

fn build_plot_data(reader: &Reader, key: &CacheKey) -> Result<PlotData, crate::statistics::StatsError> {
    let series = reader.series();
    let overlays = compute_overlays(series, &key.quantity, &key.selection)?;

    let densities = if key.plot_kind == PlotKind::Histogram {
        series
            .iter()
            .map(|s| {
                let samples = s.values(&key.quantity).unwrap_or_default();
                (s.label(), gaussian_kde(samples, KDE_POINTS))
            })
            .collect()
    } else {
        Vec::new()
    };

    Ok(PlotData { overlays, densities })
}
