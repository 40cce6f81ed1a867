pub mod panels;
pub mod plot;

/// `QUANTITY / unit`, or just the name when the unit is unknown.
pub fn axis_label(quantity: &str, unit: &str) -> String {
    if unit.is_empty() {
        quantity.to_string()
    } else {
        format!("{quantity} / {unit}")
    }
}
