use std::time::Instant;

use eframe::egui;

use crate::state::{AppState, Appearance};
use crate::ui::{panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct EnergyViewerApp {
    pub state: AppState,
    applied_appearance: Option<Appearance>,
}

impl EnergyViewerApp {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            applied_appearance: None,
        }
    }
}

impl eframe::App for EnergyViewerApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.applied_appearance != Some(self.state.appearance) {
            ctx.set_theme(self.state.appearance.theme_preference());
            self.applied_appearance = Some(self.state.appearance);
        }

        // ---- Follow mode ----
        if let Some(wait) = self.state.tick(Instant::now()) {
            ctx.request_repaint_after(wait);
        }

        // ---- Top panel: menu bar ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: settings ----
        egui::SidePanel::left("settings_panel")
            .default_width(240.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        self.state.refresh_plot_data();

        // ---- Central panel: plot ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::energy_plot(ui, &self.state);
        });
    }
}
