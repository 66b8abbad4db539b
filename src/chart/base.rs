//! Base constants and utility functions for the chart module.

use egui::Color32;

use crate::common::constant::OverlayKind;

// Chart colors
pub const BLACK_COLOR: Color32 = Color32::from_rgb(0, 0, 0);
pub const GREY_COLOR: Color32 = Color32::from_rgb(100, 100, 100);
pub const GRID_COLOR: Color32 = Color32::from_rgb(38, 38, 44);
pub const BACKGROUND_COLOR: Color32 = Color32::from_rgb(16, 16, 20);
pub const HEADER_COLOR: Color32 = Color32::from_rgb(28, 28, 34);
pub const TEXT_COLOR: Color32 = Color32::from_rgb(200, 200, 200);

// Price movement colors
pub const UP_COLOR: Color32 = Color32::from_rgb(38, 166, 154);
pub const DOWN_COLOR: Color32 = Color32::from_rgb(239, 83, 80);
pub const STAY_COLOR: Color32 = Color32::from_rgb(200, 200, 200);

// Cursor color
pub const CURSOR_COLOR: Color32 = Color32::from_rgb(255, 245, 162);
pub const CURSOR_LINE_COLOR: Color32 = Color32::from_rgba_premultiplied(128, 128, 128, 128);

// Oscillator colors
pub const OSCILLATOR_COLOR: Color32 = Color32::from_rgb(126, 87, 194);
pub const SIGNAL_COLOR: Color32 = Color32::from_rgb(255, 152, 0);
pub const OVERBOUGHT_FILL: Color32 = Color32::from_rgba_premultiplied(40, 12, 12, 40);
pub const OVERSOLD_FILL: Color32 = Color32::from_rgba_premultiplied(10, 34, 32, 40);
pub const THRESHOLD_COLOR: Color32 = Color32::from_rgb(120, 120, 120);
pub const BAND_FILL: Color32 = Color32::from_rgba_premultiplied(16, 30, 48, 48);

// Chart dimensions
pub const BAR_WIDTH: f64 = 0.35;
pub const PEN_WIDTH: f32 = 1.0;
pub const LINE_WIDTH: f32 = 1.5;
pub const MIN_BODY_WIDTH: f64 = 3.0;

// Layout constants
pub const MARGIN: f32 = 5.0;
pub const AXIS_X_HEIGHT: f32 = 20.0;
pub const AXIS_Y_WIDTH: f32 = 70.0;
pub const HEADER_HEIGHT: f32 = 18.0;
pub const DIVIDER_GRAB: f32 = 4.0;
pub const FONT_SIZE: f32 = 11.0;
pub const MAX_Y_TICKS: usize = 5;

/// Vertical padding applied to the price range
pub const PRICE_PADDING: f64 = 0.05;

/// Color of an overlay line
pub fn overlay_color(kind: OverlayKind) -> Color32 {
    match kind {
        OverlayKind::Sma20 => Color32::from_rgb(255, 235, 59),
        OverlayKind::Sma50 => Color32::from_rgb(33, 150, 243),
        OverlayKind::Sma200 => Color32::from_rgb(233, 30, 99),
        OverlayKind::Ema9 => Color32::from_rgb(0, 230, 118),
        OverlayKind::Ema21 => Color32::from_rgb(255, 112, 67),
        OverlayKind::Bollinger => Color32::from_rgb(100, 181, 246),
    }
}

/// Format price with appropriate precision
pub fn format_price(price: f64, decimals: usize) -> String {
    format!("{:.prec$}", price, prec = decimals)
}

/// Decimals that keep a price readable at its magnitude
pub fn price_decimals(price: f64) -> usize {
    let abs = price.abs();
    if abs >= 1000.0 {
        0
    } else if abs >= 1.0 {
        2
    } else {
        4
    }
}

/// Format volume with appropriate units (K, M, B)
pub fn format_volume(volume: f64) -> String {
    if volume >= 1_000_000_000.0 {
        format!("{:.2}B", volume / 1_000_000_000.0)
    } else if volume >= 1_000_000.0 {
        format!("{:.2}M", volume / 1_000_000.0)
    } else if volume >= 1_000.0 {
        format!("{:.2}K", volume / 1_000.0)
    } else {
        format!("{:.0}", volume)
    }
}

/// Calculate nice axis tick values.
///
/// Steps have a leading digit of 1, 2, 5 or 10.
pub fn calculate_axis_ticks(min_val: f64, max_val: f64, max_ticks: usize) -> Vec<f64> {
    if !min_val.is_finite() || !max_val.is_finite() || max_ticks == 0 {
        return Vec::new();
    }
    if min_val >= max_val {
        return vec![min_val];
    }

    let range = max_val - min_val;
    let rough_step = range / max_ticks as f64;

    let magnitude = 10.0_f64.powf(rough_step.log10().floor());
    let residual = rough_step / magnitude;

    let nice_step = if residual <= 1.5 {
        magnitude
    } else if residual <= 3.0 {
        2.0 * magnitude
    } else if residual <= 7.0 {
        5.0 * magnitude
    } else {
        10.0 * magnitude
    };

    let first = (min_val / nice_step).ceil() as i64;
    let last = (max_val / nice_step).floor() as i64;
    (first..=last).map(|i| i as f64 * nice_step).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_volume() {
        assert_eq!(format_volume(100.0), "100");
        assert_eq!(format_volume(1500.0), "1.50K");
        assert_eq!(format_volume(1500000.0), "1.50M");
        assert_eq!(format_volume(1500000000.0), "1.50B");
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(12.345, 2), "12.35");
        assert_eq!(price_decimals(2500.0), 0);
        assert_eq!(price_decimals(25.0), 2);
        assert_eq!(price_decimals(0.25), 4);
    }

    #[test]
    fn test_calculate_axis_ticks() {
        let ticks = calculate_axis_ticks(0.0, 100.0, 5);
        assert_eq!(ticks, vec![0.0, 20.0, 40.0, 60.0, 80.0, 100.0]);

        let ticks = calculate_axis_ticks(101.3, 118.9, 5);
        assert!(!ticks.is_empty());
        for tick in &ticks {
            assert!(*tick >= 101.3 && *tick <= 118.9);
            let rem = (tick / 5.0).round() * 5.0 - tick;
            assert!(rem.abs() < 1e-9);
        }
    }

    #[test]
    fn test_calculate_axis_ticks_degenerate() {
        assert_eq!(calculate_axis_ticks(5.0, 5.0, 5), vec![5.0]);
        assert!(calculate_axis_ticks(f64::NAN, 5.0, 5).is_empty());
    }
}
