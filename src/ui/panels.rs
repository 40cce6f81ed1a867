use eframe::egui::{self, Color32, RichText, ScrollArea, TextEdit, Ui};
use egui_extras::{Column, TableBuilder};

use crate::config::is_numeric_entry;
use crate::state::{AppState, Appearance, PlotKind};
use crate::statistics::{self, SeriesProvider};

// ---------------------------------------------------------------------------
// Left side panel – quantity, statistics, follow, appearance
// ---------------------------------------------------------------------------

/// Render the left settings panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.vertical_centered(|ui: &mut Ui| {
        ui.heading(RichText::new("Energy Viewer").strong());
    });
    ui.separator();

    let Some(quantities) = state.reader.as_ref().map(|r| r.quantities().to_vec()) else {
        ui.label("No energy files loaded.");
        appearance_selector(ui, state);
        return;
    };

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            // ---- Quantity selector ----
            ui.strong("Parameter");
            let current = state.quantity.clone().unwrap_or_default();
            egui::ComboBox::from_id_salt("quantity")
                .selected_text(current.as_str())
                .width(180.0)
                .show_ui(ui, |ui: &mut Ui| {
                    for q in &quantities {
                        if ui.selectable_label(current == *q, q.as_str()).clicked() {
                            state.select_quantity(q);
                        }
                    }
                });
            ui.separator();

            // ---- Plot kind ----
            ui.horizontal(|ui: &mut Ui| {
                for kind in [PlotKind::Time, PlotKind::Histogram] {
                    ui.selectable_value(&mut state.plot_kind, kind, kind.label());
                }
            });
            ui.checkbox(&mut state.hide_data, "No Data");
            ui.separator();

            statistics_section(ui, state);
            ui.separator();

            follow_section(ui, state);
            ui.separator();

            summary_table(ui, state);
            ui.separator();

            appearance_selector(ui, state);
        });
}

fn statistics_section(ui: &mut Ui, state: &mut AppState) {
    ui.strong("Statistics");
    ui.checkbox(&mut state.mean, "Mean");
    ui.checkbox(&mut state.median, "Median");
    if state.plot_kind == PlotKind::Time {
        ui.checkbox(&mut state.cumulative_average, "Cumulative Average");
        ui.checkbox(&mut state.auto_correlation, "Auto Correlation");

        let mut running = state.running_average;
        if ui.checkbox(&mut running, "Running Average").changed() {
            state.toggle_running_average();
        }
        ui.horizontal(|ui: &mut Ui| {
            ui.label("Window Size:");
            numeric_entry(ui, state.running_average, &mut state.window_text);
        });
    }
}

fn follow_section(ui: &mut Ui, state: &mut AppState) {
    let mut follow = state.follow;
    if ui.checkbox(&mut follow, "Follow").changed() {
        state.toggle_follow();
    }
    ui.horizontal(|ui: &mut Ui| {
        ui.label("Interval (s):");
        numeric_entry(ui, state.follow, &mut state.interval_text);
    });
}

/// Single-line entry that rejects anything but digits and one decimal point.
fn numeric_entry(ui: &mut Ui, enabled: bool, text: &mut String) {
    let mut edited = text.clone();
    let response = ui.add_enabled(enabled, TextEdit::singleline(&mut edited).desired_width(70.0));
    if response.changed() && is_numeric_entry(&edited) {
        *text = edited;
    }
}

/// Per-file overview of the selected quantity.
fn summary_table(ui: &mut Ui, state: &AppState) {
    let (Some(reader), Some(quantity)) = (&state.reader, state.quantity.as_deref()) else {
        return;
    };

    egui::CollapsingHeader::new(RichText::new("Summary").strong())
        .default_open(false)
        .show(ui, |ui: &mut Ui| {
            TableBuilder::new(ui)
                .striped(true)
                .vscroll(false)
                .column(Column::auto())
                .columns(Column::auto(), 4)
                .header(18.0, |mut header| {
                    for title in ["File", "Samples", "Mean", "Min", "Max"] {
                        header.col(|ui| {
                            ui.strong(title);
                        });
                    }
                })
                .body(|mut body| {
                    for series in reader.series() {
                        let values = series.values(quantity).unwrap_or_default();
                        let mean = statistics::mean(std::slice::from_ref(series), quantity)
                            .map(|c| c.y[0])
                            .unwrap_or(f64::NAN);
                        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

                        body.row(18.0, |mut row| {
                            row.col(|ui| {
                                ui.label(series.label());
                            });
                            row.col(|ui| {
                                ui.label(values.len().to_string());
                            });
                            for value in [mean, min, max] {
                                row.col(|ui| {
                                    ui.label(format!("{value:.4e}"));
                                });
                            }
                        });
                    }
                });
        });
}

fn appearance_selector(ui: &mut Ui, state: &mut AppState) {
    ui.label("Appearance Mode:");
    egui::ComboBox::from_id_salt("appearance")
        .selected_text(state.appearance.label())
        .show_ui(ui, |ui: &mut Ui| {
            for mode in Appearance::ALL {
                ui.selectable_value(&mut state.appearance, mode, mode.label());
            }
        });
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Open…").clicked() {
                open_file_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if ui
            .add_enabled(state.reader.is_some(), egui::Button::new("Refresh"))
            .clicked()
        {
            state.refresh_last();
        }

        if let Some(reader) = &state.reader {
            let files: Vec<String> = reader
                .filenames()
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            ui.label(format!(
                "{} file(s), {} samples",
                reader.series().len(),
                reader.total_samples()
            ))
            .on_hover_text(format!("Time axis: {}\n{}", reader.time_name(), files.join("\n")));
        }

        ui.separator();

        if let Some(msg) = &state.status_message {
            ui.label(RichText::new(msg).color(Color32::RED));
        }
        if let Some(msg) = &state.plot_error {
            ui.label(RichText::new(msg).color(Color32::from_rgb(230, 140, 0)));
        }
    });
}

// ---------------------------------------------------------------------------
// File dialog
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let files = rfd::FileDialog::new()
        .set_title("Open energy files")
        .add_filter("Supported files", &["en", "csv", "json", "parquet", "pq"])
        .add_filter("Energy", &["en"])
        .add_filter("CSV", &["csv"])
        .add_filter("JSON", &["json"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("All files", &["*"])
        .pick_files();

    if let Some(paths) = files {
        log::info!("Opening {} file(s)", paths.len());
        state.open_files(paths);
    }
}
