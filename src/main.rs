mod app;
mod color;
mod config;
mod data;
mod overlay;
mod state;
mod statistics;
mod term;
mod ui;

use anyhow::anyhow;
use app::EnergyViewerApp;
use clap::Parser;
use config::Args;
use eframe::egui;
use state::AppState;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    args.interval()?;

    if args.term {
        return term::run(&args);
    }

    let state = AppState::from_args(&args);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Energy Viewer",
        options,
        Box::new(|_cc| Ok(Box::new(EnergyViewerApp::new(state)))),
    )
    .map_err(|e| anyhow!("GUI failed: {e}"))
}
