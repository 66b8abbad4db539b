//! Shared viewport state and the interaction controller that mutates it.

use crate::common::object::Series;
use crate::common::setting::Settings;

use super::base::MARGIN;

/// Zoom limits and smoothing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportConfig {
    pub min_candle_width: f64,
    pub max_candle_width: f64,
    pub default_candle_width: f64,
    /// Fraction of the remaining distance covered per frame. 1 applies zoom at once.
    pub zoom_alpha: f64,
    /// Width difference below which the live width snaps to the target
    pub zoom_epsilon: f64,
    /// Zoom factor of one wheel notch or key press
    pub zoom_step: f64,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            min_candle_width: 2.0,
            max_candle_width: 60.0,
            default_candle_width: 8.0,
            zoom_alpha: 0.25,
            zoom_epsilon: 0.05,
            zoom_step: 1.1,
        }
    }
}

impl ViewportConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let d = Self::default();
        let min_candle_width = settings.get_float("viewport.min_candle_width").unwrap_or(d.min_candle_width).max(0.5);
        let max_candle_width = settings
            .get_float("viewport.max_candle_width")
            .unwrap_or(d.max_candle_width)
            .max(min_candle_width);

        Self {
            min_candle_width,
            max_candle_width,
            default_candle_width: settings
                .get_float("viewport.default_candle_width")
                .unwrap_or(d.default_candle_width)
                .clamp(min_candle_width, max_candle_width),
            zoom_alpha: settings.get_float("viewport.zoom_alpha").unwrap_or(d.zoom_alpha).clamp(0.01, 1.0),
            zoom_epsilon: settings.get_float("viewport.zoom_epsilon").unwrap_or(d.zoom_epsilon).abs(),
            zoom_step: settings.get_float("viewport.zoom_step").unwrap_or(d.zoom_step).max(1.001),
        }
    }
}

/// Crosshair smoothing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CrosshairConfig {
    /// Interpolation factor for small moves
    pub alpha_min: f64,
    /// Interpolation factor for jumps of `jump_distance` pixels or more
    pub alpha_max: f64,
    pub jump_distance: f64,
    /// Distance below which the crosshair snaps to the pointer
    pub epsilon: f64,
}

impl Default for CrosshairConfig {
    fn default() -> Self {
        Self {
            alpha_min: 0.35,
            alpha_max: 0.85,
            jump_distance: 120.0,
            epsilon: 0.5,
        }
    }
}

impl CrosshairConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let d = Self::default();
        let alpha_min = settings.get_float("crosshair.alpha_min").unwrap_or(d.alpha_min).clamp(0.01, 1.0);
        Self {
            alpha_min,
            alpha_max: settings
                .get_float("crosshair.alpha_max")
                .unwrap_or(d.alpha_max)
                .clamp(alpha_min, 1.0),
            jump_distance: settings.get_float("crosshair.jump_distance").unwrap_or(d.jump_distance).max(1.0),
            epsilon: settings.get_float("crosshair.epsilon").unwrap_or(d.epsilon).abs(),
        }
    }

    /// Interpolation factor for a given distance
    fn alpha(&self, distance: f64) -> f64 {
        let t = (distance / self.jump_distance).min(1.0);
        self.alpha_min + (self.alpha_max - self.alpha_min) * t
    }
}

/// Navigation keys understood by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavKey {
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
}

/// The single visible-window state every panel reads.
///
/// Coordinates are chart-local pixels. All panels share the same horizontal
/// geometry, so one x mapping serves them all.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportState {
    pub view_start: usize,
    pub view_end: usize,
    /// Live candle width
    pub candle_width: f64,
    /// Width the live width is converging to
    pub target_width: f64,
    pub hover_index: Option<usize>,
    /// Raw pointer position
    pub pointer_x: f64,
    pub pointer_y: f64,
    pub pointer_active: bool,
    /// Displayed crosshair position
    pub crosshair_x: f64,
    pub crosshair_y: f64,
    pub left_margin: f64,
    pub plot_width: f64,
    pub series_len: usize,
}

impl ViewportState {
    fn new(width: f64) -> Self {
        Self {
            view_start: 0,
            view_end: 0,
            candle_width: width,
            target_width: width,
            hover_index: None,
            pointer_x: 0.0,
            pointer_y: 0.0,
            pointer_active: false,
            crosshair_x: 0.0,
            crosshair_y: 0.0,
            left_margin: MARGIN as f64,
            plot_width: 0.0,
            series_len: 0,
        }
    }

    /// Number of candle slots that fit the plot width, at least one
    pub fn visible_capacity(&self) -> usize {
        if self.candle_width <= 0.0 {
            return 1;
        }
        ((self.plot_width / self.candle_width).floor() as usize).max(1)
    }

    /// Whether a candle is inside the visible window
    pub fn is_visible(&self, ix: usize) -> bool {
        self.series_len > 0 && ix >= self.view_start && ix <= self.view_end
    }

    /// Visible inclusive index range, `None` for an empty series
    pub fn visible_range(&self) -> Option<(usize, usize)> {
        (self.series_len > 0).then_some((self.view_start, self.view_end))
    }

    /// Centre x of a candle
    pub fn index_to_x(&self, ix: usize) -> f64 {
        self.left_margin + (ix as f64 - self.view_start as f64) * self.candle_width + self.candle_width / 2.0
    }

    /// Candle under an x position, `None` outside the visible data
    pub fn x_to_index(&self, x: f64) -> Option<usize> {
        if self.series_len == 0 || self.candle_width <= 0.0 {
            return None;
        }
        let rel = x - self.left_margin;
        if rel < 0.0 || rel >= self.plot_width {
            return None;
        }
        let ix = self.view_start + (rel / self.candle_width).floor() as usize;
        (ix <= self.view_end).then_some(ix)
    }
}

/// Anchor of an in-flight zoom: a virtual candle slot pinned under a pixel x
#[derive(Debug, Clone, Copy, PartialEq)]
struct ZoomAnchor {
    slot: i64,
    x: f64,
}

/// Applies pan, zoom, hover and navigation to the viewport state.
#[derive(Debug, Clone)]
pub struct InteractionController {
    state: ViewportState,
    config: ViewportConfig,
    crosshair: CrosshairConfig,
    anchor: Option<ZoomAnchor>,
    pan_remainder: f64,
    pointer_entered: bool,
}

impl InteractionController {
    pub fn new(config: ViewportConfig, crosshair: CrosshairConfig) -> Self {
        Self {
            state: ViewportState::new(config.default_candle_width),
            config,
            crosshair,
            anchor: None,
            pan_remainder: 0.0,
            pointer_entered: false,
        }
    }

    pub fn state(&self) -> &ViewportState {
        &self.state
    }

    pub fn config(&self) -> &ViewportConfig {
        &self.config
    }

    /// Bind a series length, showing the newest candles
    pub fn set_series_len(&mut self, len: usize) {
        self.state.series_len = len;
        self.anchor = None;
        self.pan_remainder = 0.0;
        self.align_right(len.saturating_sub(1));
    }

    /// Update the plot width, keeping the right edge of the window fixed
    pub fn set_plot_width(&mut self, width: f64) {
        self.state.plot_width = width.max(0.0);
        if self.state.series_len == 0 {
            return;
        }
        let end = self.state.view_end;
        self.align_right(end);
    }

    pub fn set_left_margin(&mut self, margin: f64) {
        self.state.left_margin = margin.max(0.0);
    }

    /// Put `end` at the right edge of the window
    pub fn align_right(&mut self, end: usize) {
        let len = self.state.series_len;
        if len == 0 {
            self.state.view_start = 0;
            self.state.view_end = 0;
            self.refresh_hover();
            return;
        }
        let end = end.min(len - 1);
        let count = self.state.visible_capacity();
        self.state.view_start = (end + 1).saturating_sub(count);
        self.update_view_end();
    }

    fn update_view_end(&mut self) {
        let len = self.state.series_len;
        if len == 0 {
            self.state.view_end = 0;
            return;
        }
        self.state.view_start = self.state.view_start.min(len - 1);
        let count = self.state.visible_capacity();
        self.state.view_end = (self.state.view_start + count - 1).min(len - 1);
        self.refresh_hover();
    }

    /// Largest start that still fills the window
    fn max_start(&self) -> usize {
        let len = self.state.series_len;
        len.saturating_sub(self.state.visible_capacity()).min(len.saturating_sub(1))
    }

    /// Shift the window by whole candles.
    ///
    /// Positive deltas move toward newer candles. The start never goes below
    /// zero and never moves right past the last full window.
    pub fn pan(&mut self, delta: i64) {
        if self.state.series_len == 0 || delta == 0 {
            return;
        }
        let start = self.state.view_start as i64;
        let new_start = if delta < 0 {
            (start + delta).max(0)
        } else {
            let limit = (self.max_start() as i64).max(start);
            (start + delta).min(limit)
        };
        self.state.view_start = new_start as usize;
        self.anchor = None;
        self.update_view_end();
    }

    /// Pan by a pixel drag. Dragging right reveals older candles. Sub-candle
    /// movement accumulates until it adds up to a whole candle.
    pub fn pan_pixels(&mut self, dx: f64) {
        if self.state.candle_width <= 0.0 {
            return;
        }
        self.pan_remainder += -dx / self.state.candle_width;
        let whole = self.pan_remainder.trunc();
        self.pan_remainder -= whole;
        self.pan(whole as i64);
    }

    /// Scale the target width about a pixel x.
    ///
    /// The candle under `anchor_x` stays under it once the zoom settles,
    /// unless the window is clamped at the oldest candle.
    pub fn zoom(&mut self, factor: f64, anchor_x: f64) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }

        let target = (self.state.target_width * factor)
            .clamp(self.config.min_candle_width, self.config.max_candle_width);
        self.state.target_width = target;

        let rel = (anchor_x - self.state.left_margin).clamp(0.0, self.state.plot_width.max(0.0));
        let x = self.state.left_margin + rel;
        let slot = self.state.view_start as i64 + (rel / self.state.candle_width).floor() as i64;
        self.anchor = Some(ZoomAnchor { slot, x });

        if self.config.zoom_alpha >= 1.0 {
            self.state.candle_width = target;
            self.reanchor();
            self.anchor = None;
        }
    }

    /// Zoom about the centre of the plot
    pub fn zoom_center(&mut self, factor: f64) {
        let x = self.state.left_margin + self.state.plot_width / 2.0;
        self.zoom(factor, x);
    }

    fn reanchor(&mut self) {
        if self.state.series_len == 0 {
            return;
        }
        if let Some(anchor) = self.anchor {
            let rel = anchor.x - self.state.left_margin;
            let start = anchor.slot - (rel / self.state.candle_width).floor() as i64;
            self.state.view_start = start.max(0) as usize;
        }
        self.update_view_end();
    }

    /// Wheel input: horizontal delta pans, vertical delta zooms about `x`.
    ///
    /// Both components apply within the same event. Scrolling up shows more
    /// candles.
    pub fn on_wheel(&mut self, delta_x: f64, delta_y: f64, x: f64) {
        if delta_x != 0.0 {
            self.pan_pixels(delta_x);
        }
        if delta_y != 0.0 {
            let notches = delta_y / WHEEL_NOTCH;
            self.zoom(self.config.zoom_step.powf(-notches), x);
        }
    }

    pub fn on_key(&mut self, key: NavKey) {
        match key {
            NavKey::Left => self.pan(-1),
            NavKey::Right => self.pan(1),
            NavKey::Up => self.zoom_center(self.config.zoom_step),
            NavKey::Down => self.zoom_center(1.0 / self.config.zoom_step),
            NavKey::Home => {
                self.anchor = None;
                self.state.view_start = 0;
                self.update_view_end();
            }
            NavKey::End => {
                self.anchor = None;
                self.align_right(self.state.series_len.saturating_sub(1));
            }
        }
    }

    /// Centre a candle in the window
    pub fn scroll_to_index(&mut self, ix: usize) {
        let len = self.state.series_len;
        if len == 0 {
            return;
        }
        let ix = ix.min(len - 1);
        let half = self.state.visible_capacity() / 2;
        self.anchor = None;
        self.state.view_start = ix.saturating_sub(half).min(self.max_start());
        self.update_view_end();
    }

    /// Centre the candle holding `date`. Returns the resolved index.
    pub fn scroll_to_date(&mut self, series: &Series, date: &str) -> Option<usize> {
        let ix = series.index_at_or_after(date)?;
        self.scroll_to_index(ix);
        Some(ix)
    }

    /// Record the raw pointer position
    pub fn set_hover(&mut self, x: f64, y: f64) {
        if !self.state.pointer_active {
            self.pointer_entered = true;
        }
        self.state.pointer_active = true;
        self.state.pointer_x = x;
        self.state.pointer_y = y;
        self.refresh_hover();
    }

    pub fn clear_hover(&mut self) {
        self.state.pointer_active = false;
        self.state.hover_index = None;
        self.pointer_entered = false;
    }

    fn refresh_hover(&mut self) {
        self.state.hover_index = if self.state.pointer_active {
            self.state.x_to_index(self.state.pointer_x)
        } else {
            None
        };
    }

    /// Whether zoom or crosshair interpolation is still converging
    pub fn is_animating(&self) -> bool {
        self.state.candle_width != self.state.target_width
            || (self.state.pointer_active
                && (self.state.crosshair_x != self.state.pointer_x
                    || self.state.crosshair_y != self.state.pointer_y))
    }

    /// One smoothing step. Returns whether anything moved.
    pub fn advance_frame(&mut self) -> bool {
        let mut changed = false;

        let width = self.state.candle_width;
        let target = self.state.target_width;
        if width != target {
            let next = width + (target - width) * self.config.zoom_alpha;
            self.state.candle_width = if (target - next).abs() < self.config.zoom_epsilon {
                target
            } else {
                next
            };
            self.reanchor();
            if self.state.candle_width == target {
                self.anchor = None;
            }
            changed = true;
        }

        if self.state.pointer_active {
            if self.pointer_entered {
                self.state.crosshair_x = self.state.pointer_x;
                self.state.crosshair_y = self.state.pointer_y;
                self.pointer_entered = false;
                changed = true;
            } else {
                let dx = self.state.pointer_x - self.state.crosshair_x;
                let dy = self.state.pointer_y - self.state.crosshair_y;
                let distance = (dx * dx + dy * dy).sqrt();
                if distance > 0.0 {
                    if distance < self.crosshair.epsilon {
                        self.state.crosshair_x = self.state.pointer_x;
                        self.state.crosshair_y = self.state.pointer_y;
                    } else {
                        let alpha = self.crosshair.alpha(distance);
                        self.state.crosshair_x += dx * alpha;
                        self.state.crosshair_y += dy * alpha;
                    }
                    changed = true;
                }
            }
        }

        changed
    }
}

/// Pixels of wheel travel counted as one zoom step
const WHEEL_NOTCH: f64 = 50.0;
