//! Chart panels for candlesticks, volume bars and oscillators.

use egui::{Color32, Pos2, Rect, Stroke};

use super::base::{
    format_price, format_volume, overlay_color, price_decimals, BAND_FILL, BAR_WIDTH, BLACK_COLOR, DOWN_COLOR,
    LINE_WIDTH, MIN_BODY_WIDTH, OSCILLATOR_COLOR, OVERBOUGHT_FILL, OVERSOLD_FILL, PEN_WIDTH, PRICE_PADDING,
    SIGNAL_COLOR, STAY_COLOR, THRESHOLD_COLOR, UP_COLOR,
};
use super::draw::DrawList;
use super::layout::PanelDescriptor;
use super::panel::{draw_line, Panel, PanelFrame, RenderContext, ValueScale};
use super::persistence::IndicatorDefaults;
use crate::common::constant::{Direction, OverlayKind, PanelKind};
use crate::common::object::Candle;
use crate::indicator::{IndicatorKey, IndicatorOutput};

fn direction_color(candle: &Candle) -> Color32 {
    match candle.direction() {
        Direction::Up => UP_COLOR,
        Direction::Down => DOWN_COLOR,
        Direction::Flat => STAY_COLOR,
    }
}

/// Width of a candle body or volume bar for a slot width
fn body_width(candle_width: f64) -> f32 {
    (candle_width * BAR_WIDTH * 2.0).max(1.0) as f32
}

fn format_optional(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) => format_price(v, decimals),
        None => "-".to_string(),
    }
}

/// Value of a line at an index, `None` when missing or NaN
fn line_value(values: &[f64], ix: usize) -> Option<f64> {
    values.get(ix).copied().filter(|v| !v.is_nan())
}

/// Candlesticks with price overlays
#[derive(Debug, Clone, PartialEq)]
pub struct PricePanel {
    rect: Rect,
    overlays: Vec<OverlayKind>,
}

impl PricePanel {
    pub fn new(overlays: Vec<OverlayKind>) -> Self {
        Self {
            rect: Rect::NOTHING,
            overlays,
        }
    }

    pub fn overlays(&self) -> &[OverlayKind] {
        &self.overlays
    }

    fn draw_candle(&self, candle: &Candle, x: f32, candle_width: f64, scale: &ValueScale, list: &mut DrawList) {
        let color = direction_color(candle);
        let stroke = Stroke::new(PEN_WIDTH, color);

        let high_y = scale.value_to_y(candle.high);
        let low_y = scale.value_to_y(candle.low);
        list.line(Pos2::new(x, high_y), Pos2::new(x, low_y), stroke);

        let open_y = scale.value_to_y(candle.open);
        let close_y = scale.value_to_y(candle.close);

        if candle_width < MIN_BODY_WIDTH {
            list.line(Pos2::new(x, open_y), Pos2::new(x, close_y), stroke);
            return;
        }

        let half = body_width(candle_width) * 0.5;
        if (open_y - close_y).abs() < 1.0 {
            list.line(Pos2::new(x - half, open_y), Pos2::new(x + half, open_y), stroke);
            return;
        }

        let body = Rect::from_min_max(
            Pos2::new(x - half, open_y.min(close_y)),
            Pos2::new(x + half, open_y.max(close_y)),
        );
        match candle.direction() {
            Direction::Down => list.rect_filled(body, color),
            _ => {
                list.rect_filled(body, BLACK_COLOR);
                list.rect_stroke(body, stroke);
            }
        }
    }

    fn draw_overlay(&self, ctx: &RenderContext, overlay: OverlayKind, scale: &ValueScale, list: &mut DrawList) {
        let Some(output) = ctx.cache.lookup(&IndicatorKey::from(overlay)) else {
            return;
        };
        let vp = ctx.viewport;
        let stroke = Stroke::new(LINE_WIDTH, overlay_color(overlay));

        match output {
            IndicatorOutput::Bands(bands) => {
                let end = vp.view_end.min(bands.upper.len().saturating_sub(1));
                for ix in vp.view_start..end {
                    let (Some(u0), Some(u1), Some(l0), Some(l1)) = (
                        line_value(&bands.upper, ix),
                        line_value(&bands.upper, ix + 1),
                        line_value(&bands.lower, ix),
                        line_value(&bands.lower, ix + 1),
                    ) else {
                        continue;
                    };
                    let x0 = vp.index_to_x(ix) as f32;
                    let x1 = vp.index_to_x(ix + 1) as f32;
                    list.polygon(
                        vec![
                            Pos2::new(x0, scale.value_to_y(u0)),
                            Pos2::new(x1, scale.value_to_y(u1)),
                            Pos2::new(x1, scale.value_to_y(l1)),
                            Pos2::new(x0, scale.value_to_y(l0)),
                        ],
                        BAND_FILL,
                    );
                }
                draw_line(list, &bands.upper, vp, scale, stroke);
                draw_line(list, &bands.middle, vp, scale, Stroke::new(PEN_WIDTH, stroke.color));
                draw_line(list, &bands.lower, vp, scale, stroke);
            }
            other => {
                if let Some(values) = other.line() {
                    draw_line(list, values, vp, scale, stroke);
                }
            }
        }
    }
}

impl Panel for PricePanel {
    fn kind(&self) -> PanelKind {
        PanelKind::Price
    }

    fn title(&self) -> String {
        let mut title = PanelKind::Price.display_name().to_string();
        for overlay in &self.overlays {
            title.push_str("  ");
            title.push_str(overlay.display_name());
        }
        title
    }

    fn rect(&self) -> Rect {
        self.rect
    }

    fn resize(&mut self, rect: Rect) {
        self.rect = rect;
    }

    fn destroy(&mut self) {
        self.overlays.clear();
    }

    fn required_indicators(&self) -> Vec<IndicatorKey> {
        self.overlays.iter().map(|o| IndicatorKey::from(*o)).collect()
    }

    fn get_y_range(&self, ctx: &RenderContext, min_ix: usize, max_ix: usize) -> (f64, f64) {
        let Some((mut low, mut high)) = ctx.data().and_then(|s| s.price_range(min_ix, max_ix)) else {
            return (0.0, 1.0);
        };

        for overlay in &self.overlays {
            let range = ctx
                .cache
                .lookup(&IndicatorKey::from(*overlay))
                .and_then(|o| o.range(min_ix, max_ix));
            if let Some((lo, hi)) = range {
                low = low.min(lo);
                high = high.max(hi);
            }
        }

        let span = high - low;
        let padding = if span > 0.0 {
            span * PRICE_PADDING
        } else if high != 0.0 {
            high.abs() * PRICE_PADDING
        } else {
            1.0
        };
        (low - padding, high + padding)
    }

    fn get_info_text(&self, ctx: &RenderContext, ix: usize) -> String {
        let Some(candle) = ctx.data().and_then(|s| s.get(ix)) else {
            return String::new();
        };
        let d = price_decimals(candle.close);
        format!(
            "O {}  H {}  L {}  C {}",
            format_price(candle.open, d),
            format_price(candle.high, d),
            format_price(candle.low, d),
            format_price(candle.close, d)
        )
    }

    fn format_value(&self, value: f64) -> String {
        format_price(value, price_decimals(value))
    }

    fn draw_body(&self, ctx: &RenderContext, _frame: &PanelFrame, scale: &ValueScale, list: &mut DrawList) {
        let Some(series) = ctx.data() else {
            return;
        };
        let vp = ctx.viewport;

        for overlay in self.overlays.iter().filter(|o| **o == OverlayKind::Bollinger) {
            self.draw_overlay(ctx, *overlay, scale, list);
        }

        for ix in vp.view_start..=vp.view_end {
            if let Some(candle) = series.get(ix) {
                self.draw_candle(candle, vp.index_to_x(ix) as f32, vp.candle_width, scale, list);
            }
        }

        for overlay in self.overlays.iter().filter(|o| **o != OverlayKind::Bollinger) {
            self.draw_overlay(ctx, *overlay, scale, list);
        }
    }
}

/// Volume bars coloured by candle direction
#[derive(Debug, Clone, PartialEq)]
pub struct VolumePanel {
    rect: Rect,
}

impl VolumePanel {
    pub fn new() -> Self {
        Self { rect: Rect::NOTHING }
    }
}

impl Default for VolumePanel {
    fn default() -> Self {
        Self::new()
    }
}

impl Panel for VolumePanel {
    fn kind(&self) -> PanelKind {
        PanelKind::Volume
    }

    fn title(&self) -> String {
        PanelKind::Volume.display_name().to_string()
    }

    fn rect(&self) -> Rect {
        self.rect
    }

    fn resize(&mut self, rect: Rect) {
        self.rect = rect;
    }

    fn required_indicators(&self) -> Vec<IndicatorKey> {
        Vec::new()
    }

    fn get_y_range(&self, ctx: &RenderContext, min_ix: usize, max_ix: usize) -> (f64, f64) {
        let max = ctx
            .data()
            .and_then(|s| s.volume_max(min_ix, max_ix))
            .filter(|v| *v > 0.0)
            .unwrap_or(1.0);
        (0.0, max)
    }

    fn get_info_text(&self, ctx: &RenderContext, ix: usize) -> String {
        ctx.data()
            .and_then(|s| s.get(ix))
            .map(|c| format!("Vol {}", format_volume(c.volume)))
            .unwrap_or_default()
    }

    fn format_value(&self, value: f64) -> String {
        format_volume(value)
    }

    fn draw_body(&self, ctx: &RenderContext, _frame: &PanelFrame, scale: &ValueScale, list: &mut DrawList) {
        let Some(series) = ctx.data() else {
            return;
        };
        let vp = ctx.viewport;
        let half = body_width(vp.candle_width) * 0.5;
        let base = scale.value_to_y(0.0);

        for ix in vp.view_start..=vp.view_end {
            let Some(candle) = series.get(ix) else {
                continue;
            };
            let x = vp.index_to_x(ix) as f32;
            let top = scale.value_to_y(candle.volume);
            let bar = Rect::from_min_max(Pos2::new(x - half, top), Pos2::new(x + half, base));
            list.rect_filled(bar, direction_color(candle));
        }
    }
}

/// RSI, MACD or Stochastic in its own panel
#[derive(Debug, Clone, PartialEq)]
pub struct OscillatorPanel {
    rect: Rect,
    kind: PanelKind,
    key: IndicatorKey,
}

impl OscillatorPanel {
    /// Panel for an oscillator key. Keys of other indicators are refused.
    pub fn new(key: IndicatorKey) -> Option<Self> {
        let kind = match key {
            IndicatorKey::Rsi { .. } => PanelKind::Rsi,
            IndicatorKey::Macd { .. } => PanelKind::Macd,
            IndicatorKey::Stochastic { .. } => PanelKind::Stochastic,
            _ => return None,
        };
        Some(Self {
            rect: Rect::NOTHING,
            kind,
            key,
        })
    }

    pub fn key(&self) -> IndicatorKey {
        self.key
    }

    /// Overbought and oversold thresholds of bounded oscillators
    fn thresholds(&self) -> Option<(f64, f64)> {
        match self.kind {
            PanelKind::Rsi => Some((70.0, 30.0)),
            PanelKind::Stochastic => Some((80.0, 20.0)),
            _ => None,
        }
    }

    fn draw_bounded(&self, frame: &PanelFrame, scale: &ValueScale, list: &mut DrawList) {
        let Some((upper, lower)) = self.thresholds() else {
            return;
        };
        let left = frame.plot.left();
        let right = frame.plot.right();

        let overbought = Rect::from_min_max(
            Pos2::new(left, scale.value_to_y(100.0)),
            Pos2::new(right, scale.value_to_y(upper)),
        );
        let oversold = Rect::from_min_max(
            Pos2::new(left, scale.value_to_y(lower)),
            Pos2::new(right, scale.value_to_y(0.0)),
        );
        list.rect_filled(overbought, OVERBOUGHT_FILL);
        list.rect_filled(oversold, OVERSOLD_FILL);

        let stroke = Stroke::new(PEN_WIDTH, THRESHOLD_COLOR);
        for level in [upper, lower] {
            let y = scale.value_to_y(level);
            list.dashed_line(Pos2::new(left, y), Pos2::new(right, y), stroke);
        }
    }
}

impl Panel for OscillatorPanel {
    fn kind(&self) -> PanelKind {
        self.kind
    }

    fn title(&self) -> String {
        self.key.to_string()
    }

    fn rect(&self) -> Rect {
        self.rect
    }

    fn resize(&mut self, rect: Rect) {
        self.rect = rect;
    }

    fn required_indicators(&self) -> Vec<IndicatorKey> {
        vec![self.key]
    }

    fn get_y_range(&self, ctx: &RenderContext, min_ix: usize, max_ix: usize) -> (f64, f64) {
        if self.thresholds().is_some() {
            return (0.0, 100.0);
        }

        let magnitude = ctx
            .cache
            .lookup(&self.key)
            .and_then(|o| o.range(min_ix, max_ix))
            .map(|(lo, hi)| lo.abs().max(hi.abs()))
            .filter(|m| *m > 0.0);
        match magnitude {
            Some(m) => (-m, m),
            None => (-1.0, 1.0),
        }
    }

    fn get_info_text(&self, ctx: &RenderContext, ix: usize) -> String {
        let Some(output) = ctx.cache.lookup(&self.key) else {
            return String::new();
        };
        match output {
            IndicatorOutput::Line(values) => format_optional(line_value(values, ix), 2),
            IndicatorOutput::Macd(m) => format!(
                "MACD {}  Signal {}  Hist {}",
                format_optional(line_value(&m.macd, ix), 4),
                format_optional(line_value(&m.signal, ix), 4),
                format_optional(line_value(&m.histogram, ix), 4)
            ),
            IndicatorOutput::Stochastic(s) => format!(
                "%K {}  %D {}",
                format_optional(line_value(&s.k, ix), 2),
                format_optional(line_value(&s.d, ix), 2)
            ),
            IndicatorOutput::Bands(_) => String::new(),
        }
    }

    fn format_value(&self, value: f64) -> String {
        match self.kind {
            PanelKind::Macd => format_price(value, 4),
            _ => format_price(value, 1),
        }
    }

    fn draw_body(&self, ctx: &RenderContext, frame: &PanelFrame, scale: &ValueScale, list: &mut DrawList) {
        let vp = ctx.viewport;
        self.draw_bounded(frame, scale, list);

        let Some(output) = ctx.cache.lookup(&self.key) else {
            return;
        };
        let main = Stroke::new(LINE_WIDTH, OSCILLATOR_COLOR);
        let signal = Stroke::new(LINE_WIDTH, SIGNAL_COLOR);

        match output {
            IndicatorOutput::Line(values) => draw_line(list, values, vp, scale, main),
            IndicatorOutput::Stochastic(s) => {
                draw_line(list, &s.k, vp, scale, main);
                draw_line(list, &s.d, vp, scale, signal);
            }
            IndicatorOutput::Macd(m) => {
                let zero = scale.value_to_y(0.0);
                list.line(
                    Pos2::new(frame.plot.left(), zero),
                    Pos2::new(frame.plot.right(), zero),
                    Stroke::new(PEN_WIDTH, THRESHOLD_COLOR),
                );

                let half = body_width(vp.candle_width) * 0.5;
                for ix in vp.view_start..=vp.view_end {
                    let Some(value) = line_value(&m.histogram, ix) else {
                        continue;
                    };
                    let x = vp.index_to_x(ix) as f32;
                    let y = scale.value_to_y(value);
                    let color = if value >= 0.0 { UP_COLOR } else { DOWN_COLOR };
                    let bar = Rect::from_min_max(Pos2::new(x - half, y.min(zero)), Pos2::new(x + half, y.max(zero)));
                    list.rect_filled(bar, color);
                }

                draw_line(list, &m.macd, vp, scale, main);
                draw_line(list, &m.signal, vp, scale, signal);
            }
            IndicatorOutput::Bands(_) => {}
        }
    }
}

/// Closed set of panel variants
#[derive(Debug, Clone, PartialEq)]
pub enum PanelView {
    Price(PricePanel),
    Volume(VolumePanel),
    Oscillator(OscillatorPanel),
}

impl PanelView {
    /// Build the view for a layout entry
    pub fn from_descriptor(desc: &PanelDescriptor, defaults: &IndicatorDefaults) -> Self {
        let oscillator = desc
            .params
            .indicator_key(desc.kind, defaults)
            .and_then(OscillatorPanel::new);

        match (desc.kind, oscillator) {
            (PanelKind::Price, _) => PanelView::Price(PricePanel::new(desc.overlays.clone())),
            (_, Some(panel)) => PanelView::Oscillator(panel),
            _ => PanelView::Volume(VolumePanel::new()),
        }
    }

    fn inner(&self) -> &dyn Panel {
        match self {
            PanelView::Price(p) => p,
            PanelView::Volume(p) => p,
            PanelView::Oscillator(p) => p,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Panel {
        match self {
            PanelView::Price(p) => p,
            PanelView::Volume(p) => p,
            PanelView::Oscillator(p) => p,
        }
    }
}

impl Panel for PanelView {
    fn kind(&self) -> PanelKind {
        self.inner().kind()
    }

    fn title(&self) -> String {
        self.inner().title()
    }

    fn rect(&self) -> Rect {
        self.inner().rect()
    }

    fn resize(&mut self, rect: Rect) {
        self.inner_mut().resize(rect)
    }

    fn destroy(&mut self) {
        self.inner_mut().destroy()
    }

    fn required_indicators(&self) -> Vec<IndicatorKey> {
        self.inner().required_indicators()
    }

    fn get_y_range(&self, ctx: &RenderContext, min_ix: usize, max_ix: usize) -> (f64, f64) {
        self.inner().get_y_range(ctx, min_ix, max_ix)
    }

    fn get_info_text(&self, ctx: &RenderContext, ix: usize) -> String {
        self.inner().get_info_text(ctx, ix)
    }

    fn format_value(&self, value: f64) -> String {
        self.inner().format_value(value)
    }

    fn draw_body(&self, ctx: &RenderContext, frame: &PanelFrame, scale: &ValueScale, list: &mut DrawList) {
        self.inner().draw_body(ctx, frame, scale, list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use crate::chart::draw::DrawCommand;
    use crate::chart::viewport::{CrosshairConfig, InteractionController, ViewportState, ViewportConfig};
    use crate::common::object::Series;
    use crate::indicator::IndicatorCache;

    fn viewport(len: usize, candle_width: f64) -> ViewportState {
        let config = ViewportConfig {
            default_candle_width: candle_width,
            ..ViewportConfig::default()
        };
        let mut controller = InteractionController::new(config, CrosshairConfig::default());
        controller.set_plot_width(400.0);
        controller.set_series_len(len);
        controller.state().clone()
    }

    fn series(closes: &[f64]) -> Rc<Series> {
        let candles = closes
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let date = format!("2024-01-{:02}", i + 1);
                Candle::new(date, c - 0.5, c + 1.0, c - 1.0, *c, 1000.0 * (i + 1) as f64)
            })
            .collect();
        Rc::new(Series::new("TEST", candles))
    }

    fn ctx<'a>(vp: &'a ViewportState, series: Option<&'a Series>, cache: &'a IndicatorCache) -> RenderContext<'a> {
        RenderContext {
            viewport: vp,
            series,
            cache,
            collapsed: false,
            is_last: true,
        }
    }

    fn panel_rect() -> Rect {
        Rect::from_min_max(Pos2::new(0.0, 0.0), Pos2::new(480.0, 200.0))
    }

    fn texts(list: &DrawList) -> Vec<String> {
        list.commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_empty_series_draws_placeholder_only() {
        let vp = viewport(0, 8.0);
        let cache = IndicatorCache::new();
        let mut panel = PricePanel::new(vec![OverlayKind::Sma20]);
        panel.resize(panel_rect());

        let list = panel.render(&ctx(&vp, None, &cache));
        assert!(texts(&list).contains(&"No data".to_string()));
        assert_eq!(list.count(|c| matches!(c, DrawCommand::Polyline { .. })), 0);
        assert_eq!(list.count(|c| matches!(c, DrawCommand::RectStroke { .. })), 0);
    }

    #[test]
    fn test_collapsed_draws_header_only() {
        let data = series(&[10.0, 11.0, 12.0]);
        let vp = viewport(3, 8.0);
        let cache = IndicatorCache::new();
        let mut panel = VolumePanel::new();
        panel.resize(panel_rect());

        let mut context = ctx(&vp, Some(&data), &cache);
        context.collapsed = true;
        let list = panel.render(&context);
        // background, header, title, info, divider
        assert_eq!(list.len(), 5);
        assert!(texts(&list).contains(&"Volume".to_string()));
    }

    #[test]
    fn test_price_range_includes_overlays() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let data = series(&closes);
        let vp = viewport(30, 8.0);
        let mut cache = IndicatorCache::new();
        cache.set_series(Rc::clone(&data));

        let panel = PricePanel::new(vec![OverlayKind::Bollinger]);
        for key in panel.required_indicators() {
            cache.get_or_compute(key);
        }

        let (low, high) = panel.get_y_range(&ctx(&vp, Some(&data), &cache), 0, 29);
        let (raw_low, raw_high) = data.price_range(0, 29).unwrap();
        let (band_low, band_high) = cache
            .lookup(&IndicatorKey::from(OverlayKind::Bollinger))
            .unwrap()
            .range(0, 29)
            .unwrap();
        let unpadded_low = raw_low.min(band_low);
        let unpadded_high = raw_high.max(band_high);
        let pad = (unpadded_high - unpadded_low) * PRICE_PADDING;
        assert!((low - (unpadded_low - pad)).abs() < 1e-9);
        assert!((high - (unpadded_high + pad)).abs() < 1e-9);
    }

    #[test]
    fn test_thin_candles_skip_body() {
        let data = series(&[10.0, 9.0, 12.0]);
        let cache = IndicatorCache::new();
        let mut panel = PricePanel::new(Vec::new());
        panel.resize(panel_rect());

        let vp = viewport(3, 2.0);
        let list = panel.render(&ctx(&vp, Some(&data), &cache));
        assert_eq!(list.count(|c| matches!(c, DrawCommand::RectStroke { .. })), 0);

        let vp = viewport(3, 8.0);
        let list = panel.render(&ctx(&vp, Some(&data), &cache));
        // up candles are drawn hollow
        assert_eq!(list.count(|c| matches!(c, DrawCommand::RectStroke { .. })), 3);
    }

    #[test]
    fn test_volume_zero_max_uses_unit_range() {
        let candles = vec![
            Candle::new("2024-01-01", 1.0, 1.0, 1.0, 1.0, 0.0),
            Candle::new("2024-01-02", 1.0, 1.0, 1.0, 1.0, 0.0),
        ];
        let data = Series::new("FLAT", candles);
        let vp = viewport(2, 8.0);
        let cache = IndicatorCache::new();
        let panel = VolumePanel::new();
        assert_eq!(panel.get_y_range(&ctx(&vp, Some(&data), &cache), 0, 1), (0.0, 1.0));
    }

    #[test]
    fn test_oscillator_ranges() {
        let data = series(&[5.0; 40]);
        let vp = viewport(40, 8.0);
        let mut cache = IndicatorCache::new();
        cache.set_series(Rc::clone(&data));

        let rsi = OscillatorPanel::new(IndicatorKey::rsi(14)).unwrap();
        assert_eq!(rsi.get_y_range(&ctx(&vp, Some(&data), &cache), 0, 39), (0.0, 100.0));
        assert_eq!(rsi.title(), "RSI(14)");

        let key = IndicatorKey::Macd { fast: 12, slow: 26, signal: 9 };
        let macd = OscillatorPanel::new(key).unwrap();
        cache.get_or_compute(key);
        // flat closes give an all-zero MACD
        assert_eq!(macd.get_y_range(&ctx(&vp, Some(&data), &cache), 0, 39), (-1.0, 1.0));

        assert!(OscillatorPanel::new(IndicatorKey::sma(20)).is_none());
    }

    #[test]
    fn test_rsi_panel_draws_thresholds() {
        let closes: Vec<f64> = (0..40).map(|i| 50.0 + (i as f64 * 0.7).sin() * 5.0).collect();
        let data = series(&closes);
        let vp = viewport(40, 8.0);
        let mut cache = IndicatorCache::new();
        cache.set_series(Rc::clone(&data));

        let mut panel = OscillatorPanel::new(IndicatorKey::rsi(14)).unwrap();
        panel.resize(panel_rect());
        for key in panel.required_indicators() {
            cache.get_or_compute(key);
        }

        let list = panel.render(&ctx(&vp, Some(&data), &cache));
        assert_eq!(list.count(|c| matches!(c, DrawCommand::DashedLine { .. })), 2);
        assert_eq!(list.count(|c| matches!(c, DrawCommand::Polyline { .. })), 1);
    }

    #[test]
    fn test_view_from_descriptor() {
        let defaults = IndicatorDefaults::default();
        let desc = PanelDescriptor {
            id: crate::chart::layout::PanelId::new(),
            kind: PanelKind::Stochastic,
            height_share: 0.2,
            collapsed: false,
            overlays: Vec::new(),
            params: Default::default(),
        };
        let view = PanelView::from_descriptor(&desc, &defaults);
        assert_eq!(view.kind(), PanelKind::Stochastic);
        assert_eq!(
            view.required_indicators(),
            vec![IndicatorKey::Stochastic { k_period: 14, d_period: 3 }]
        );

        let desc = PanelDescriptor {
            kind: PanelKind::Volume,
            ..desc
        };
        assert_eq!(PanelView::from_descriptor(&desc, &defaults).kind(), PanelKind::Volume);
    }
}
