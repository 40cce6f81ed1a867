use eframe::egui::Color32;
use palette::{Hsl, IntoColor, Srgb};

use crate::overlay::OverlayKind;

// ---------------------------------------------------------------------------
// Color palette generator
// ---------------------------------------------------------------------------

fn hsl_to_color32(hue: f32, saturation: f32, lightness: f32) -> Color32 {
    let hsl = Hsl::new(hue, saturation, lightness);
    let rgb: Srgb = hsl.into_color();
    Color32::from_rgb(
        (rgb.red * 255.0) as u8,
        (rgb.green * 255.0) as u8,
        (rgb.blue * 255.0) as u8,
    )
}

/// Generates `n` visually distinct colours using evenly spaced hues.
/// Used for the raw data of each loaded file.
pub fn generate_palette(n: usize) -> Vec<Color32> {
    if n == 0 {
        return Vec::new();
    }
    (0..n)
        .map(|i| hsl_to_color32((i as f32 / n as f32) * 360.0, 0.75, 0.55))
        .collect()
}

// ---------------------------------------------------------------------------
// Overlay colours
// ---------------------------------------------------------------------------

/// Fixed colour per statistic so an overlay keeps its colour when others
/// are toggled. Darker and less saturated than the data palette.
pub fn overlay_color(kind: OverlayKind) -> Color32 {
    let hue = match kind {
        OverlayKind::Mean => 210.0,
        OverlayKind::Median => 0.0,
        OverlayKind::CumulativeAverage => 120.0,
        OverlayKind::AutoCorrelation => 280.0,
        OverlayKind::RunningAverage(_) => 35.0,
    };
    hsl_to_color32(hue, 0.6, 0.4)
}
