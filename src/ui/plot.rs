use eframe::egui::{Align2, RichText, Ui};
use egui_plot::{Legend, Line, LineStyle, Plot, PlotPoint, PlotPoints, PlotUi, Text, VLine};

use crate::color::{generate_palette, overlay_color};
use crate::data::reader::Reader;
use crate::state::{AppState, PlotData, PlotKind};
use crate::statistics::SeriesProvider;
use crate::ui::axis_label;

// ---------------------------------------------------------------------------
// Central panel plot
// ---------------------------------------------------------------------------

/// Render the time series or histogram of the selected quantity.
pub fn energy_plot(ui: &mut Ui, state: &AppState) {
    let (Some(reader), Some(quantity)) = (&state.reader, state.quantity.as_deref()) else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Open energy files to start  (File → Open…)");
        });
        return;
    };

    match state.plot_kind {
        PlotKind::Time => time_plot(ui, state, reader, quantity),
        PlotKind::Histogram => histogram_plot(ui, state, reader, quantity),
    }
}

fn time_plot(ui: &mut Ui, state: &AppState, reader: &Reader, quantity: &str) {
    let colors = generate_palette(reader.series().len());
    let data = state.plot_data();

    Plot::new("time_plot")
        .legend(Legend::default())
        .x_axis_label("Simulation step")
        .y_axis_label(axis_label(quantity, reader.unit(quantity)))
        .allow_boxed_zoom(true)
        .show(ui, |plot_ui| {
            if !state.hide_data {
                for (series, color) in reader.series().iter().zip(&colors) {
                    let Some(values) = series.values(quantity) else {
                        continue;
                    };
                    let points: PlotPoints = series
                        .time
                        .iter()
                        .zip(values)
                        .filter(|(t, v)| t.is_finite() && v.is_finite())
                        .map(|(&t, &v)| [t, v])
                        .collect();

                    plot_ui.line(Line::new(points).name(series.label()).color(*color).width(1.5));
                }
            }

            if let Some(data) = data {
                draw_overlays(plot_ui, data);
            }
        });
}

fn draw_overlays(plot_ui: &mut PlotUi, data: &PlotData) {
    for overlay in &data.overlays.curves {
        let color = overlay_color(overlay.kind);
        let line = Line::new(PlotPoints::from(overlay.curve.points()))
            .name(overlay.kind.to_string())
            .color(color)
            .style(LineStyle::dashed_dense())
            .width(2.0);
        plot_ui.line(line);

        // Current value at the right end of the line.
        if let (Some((x, y)), Some(label)) = (overlay.curve.last(), overlay.value_label()) {
            if x.is_finite() && y.is_finite() {
                let text = Text::new(PlotPoint::new(x, y), RichText::new(label).color(color))
                    .anchor(Align2::LEFT_BOTTOM);
                plot_ui.text(text);
            }
        }
    }
}

fn histogram_plot(ui: &mut Ui, state: &AppState, reader: &Reader, quantity: &str) {
    let colors = generate_palette(reader.series().len());
    let data = state.plot_data();

    Plot::new("histogram_plot")
        .legend(Legend::default())
        .x_axis_label(axis_label(quantity, reader.unit(quantity)))
        .y_axis_label("Density")
        .allow_boxed_zoom(true)
        .show(ui, |plot_ui| {
            let Some(data) = data else {
                return;
            };

            if !state.hide_data {
                for ((label, density), color) in data.densities.iter().zip(&colors) {
                    match density {
                        Ok(curve) => {
                            let line = Line::new(PlotPoints::from(curve.points()))
                                .name(label)
                                .color(*color)
                                .width(1.5);
                            plot_ui.line(line);
                        }
                        Err(e) => log::debug!("No density for {label}: {e}"),
                    }
                }
            }

            for overlay in data.overlays.curves.iter().filter(|o| o.kind.is_level()) {
                let Some((_, level)) = overlay.curve.last() else {
                    continue;
                };
                if !level.is_finite() {
                    continue;
                }
                let line = VLine::new(level)
                    .name(format!("{} {}", overlay.kind, overlay.value_label().unwrap_or_default()))
                    .color(overlay_color(overlay.kind))
                    .style(LineStyle::dashed_dense())
                    .width(2.0);
                plot_ui.vline(line);
            }
        });
}
