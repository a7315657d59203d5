//! Number formatting for report cells.

pub const MM_DISPLAY_UNIT: f64 = 1_000_000.0;

pub fn one_dec_places(x: f64) -> String {
    format!("{x:.1}")
}

pub fn two_dec_places(x: f64) -> String {
    format!("{x:.2}")
}

/// `x` is already in percent units: `12.3` renders as `12%`.
pub fn percentage(x: f64) -> String {
    format!("{x:.0}%")
}

pub fn fixed(x: f64, decimals: usize) -> String {
    format!("{x:.decimals$}")
}

pub fn millions(x: f64) -> String {
    format!("{:.2}M", x / MM_DISPLAY_UNIT)
}
