//! Rendering contract shared by every chart panel.

use egui::{vec2, Align2, Pos2, Rect, Stroke};

use super::base::{
    calculate_axis_ticks, AXIS_X_HEIGHT, AXIS_Y_WIDTH, BACKGROUND_COLOR, BLACK_COLOR, CURSOR_COLOR,
    CURSOR_LINE_COLOR, GREY_COLOR, GRID_COLOR, HEADER_COLOR, HEADER_HEIGHT, MARGIN, MAX_Y_TICKS, PEN_WIDTH,
    TEXT_COLOR,
};
use super::draw::DrawList;
use super::viewport::ViewportState;
use crate::common::constant::PanelKind;
use crate::common::object::Series;
use crate::indicator::{IndicatorCache, IndicatorKey};

/// Minimum pixel distance between two date labels
const DATE_LABEL_SPACING: f64 = 80.0;

/// Everything a panel reads while rendering one frame
#[derive(Clone, Copy)]
pub struct RenderContext<'a> {
    pub viewport: &'a ViewportState,
    pub series: Option<&'a Series>,
    pub cache: &'a IndicatorCache,
    pub collapsed: bool,
    /// The bottom panel draws the date axis and the shared date label
    pub is_last: bool,
}

impl<'a> RenderContext<'a> {
    /// Bound series when it has candles
    pub fn data(&self) -> Option<&'a Series> {
        self.series.filter(|s| !s.is_empty())
    }
}

/// Linear map between values and y pixels of a plot area
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueScale {
    pub min: f64,
    pub max: f64,
    pub top: f32,
    pub bottom: f32,
}

impl ValueScale {
    pub fn new(min: f64, max: f64, top: f32, bottom: f32) -> Self {
        Self { min, max, top, bottom }
    }

    pub fn value_to_y(&self, value: f64) -> f32 {
        let range = self.max - self.min;
        if range == 0.0 || !range.is_finite() {
            return (self.top + self.bottom) / 2.0;
        }
        let height = (self.bottom - self.top) as f64;
        (self.bottom as f64 - (value - self.min) / range * height) as f32
    }

    pub fn y_to_value(&self, y: f32) -> f64 {
        let height = (self.bottom - self.top) as f64;
        if height <= 0.0 {
            return (self.min + self.max) / 2.0;
        }
        self.min + (self.bottom - y) as f64 / height * (self.max - self.min)
    }
}

/// Sub-rectangles of a panel
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PanelFrame {
    pub header: Rect,
    pub plot: Rect,
    /// Value axis right of the plot
    pub axis: Rect,
    pub date_row: Option<Rect>,
}

impl PanelFrame {
    pub fn new(rect: Rect, viewport: &ViewportState, with_dates: bool) -> Self {
        let header_bottom = (rect.top() + HEADER_HEIGHT).min(rect.bottom());
        let header = Rect::from_min_max(rect.min, Pos2::new(rect.right(), header_bottom));

        let plot_bottom = if with_dates {
            (rect.bottom() - AXIS_X_HEIGHT).max(header_bottom)
        } else {
            rect.bottom()
        };
        let left = rect.left() + viewport.left_margin as f32;
        let right = (left + viewport.plot_width as f32).min(rect.right() - AXIS_Y_WIDTH).max(left);

        let plot = Rect::from_min_max(Pos2::new(left, header_bottom), Pos2::new(right, plot_bottom));
        let axis = Rect::from_min_max(Pos2::new(right, header_bottom), Pos2::new(rect.right(), plot_bottom));
        let date_row = with_dates.then(|| Rect::from_min_max(Pos2::new(left, plot_bottom), Pos2::new(right, rect.bottom())));

        Self {
            header,
            plot,
            axis,
            date_row,
        }
    }

    /// Scale over the plot area with a small inset
    pub fn scale(&self, min: f64, max: f64) -> ValueScale {
        let inset = 2.0_f32.min(self.plot.height() / 4.0);
        ValueScale::new(min, max, self.plot.top() + inset, self.plot.bottom() - inset)
    }
}

/// A drawable surface bound to the shared viewport.
pub trait Panel {
    fn kind(&self) -> PanelKind;

    fn title(&self) -> String;

    fn rect(&self) -> Rect;

    fn resize(&mut self, rect: Rect);

    /// Release per-panel state before the panel is dropped
    fn destroy(&mut self) {}

    /// Indicators the cache must hold before `render`
    fn required_indicators(&self) -> Vec<IndicatorKey>;

    /// Value range over an inclusive index range
    fn get_y_range(&self, ctx: &RenderContext, min_ix: usize, max_ix: usize) -> (f64, f64);

    /// Header readout for a candle index
    fn get_info_text(&self, ctx: &RenderContext, ix: usize) -> String;

    fn format_value(&self, value: f64) -> String;

    /// Panel specific drawing inside the plot area
    fn draw_body(&self, ctx: &RenderContext, frame: &PanelFrame, scale: &ValueScale, list: &mut DrawList);

    /// Produce the display list for the current frame
    fn render(&self, ctx: &RenderContext) -> DrawList {
        let mut list = DrawList::new();
        let rect = self.rect();
        if rect.width() <= 0.0 || rect.height() <= 0.0 {
            return list;
        }

        let frame = PanelFrame::new(rect, ctx.viewport, ctx.is_last && !ctx.collapsed);
        list.rect_filled(rect, BACKGROUND_COLOR);
        draw_header(self, ctx, &frame, &mut list);
        list.line(rect.left_bottom(), rect.right_bottom(), Stroke::new(PEN_WIDTH, GRID_COLOR));

        if ctx.collapsed {
            return list;
        }

        let Some(series) = ctx.data() else {
            list.text(frame.plot.center(), Align2::CENTER_CENTER, "No data", GREY_COLOR);
            return list;
        };

        let vp = ctx.viewport;
        let (min, max) = self.get_y_range(ctx, vp.view_start, vp.view_end);
        let scale = frame.scale(min, max);

        let grid = Stroke::new(PEN_WIDTH, GRID_COLOR);
        for tick in calculate_axis_ticks(min, max, MAX_Y_TICKS) {
            let y = scale.value_to_y(tick);
            list.line(Pos2::new(frame.plot.left(), y), Pos2::new(frame.plot.right(), y), grid);
            list.text(
                Pos2::new(frame.axis.left() + MARGIN, y),
                Align2::LEFT_CENTER,
                self.format_value(tick),
                TEXT_COLOR,
            );
        }

        self.draw_body(ctx, &frame, &scale, &mut list);
        draw_crosshair(self, ctx, &frame, &scale, &mut list);

        if let Some(row) = frame.date_row {
            draw_date_axis(series, vp, row, &mut list);
        }

        list
    }
}

fn draw_header<P: Panel + ?Sized>(panel: &P, ctx: &RenderContext, frame: &PanelFrame, list: &mut DrawList) {
    list.rect_filled(frame.header, HEADER_COLOR);
    list.text(
        frame.header.left_center() + vec2(MARGIN, 0.0),
        Align2::LEFT_CENTER,
        panel.title(),
        TEXT_COLOR,
    );

    if ctx.data().is_none() {
        return;
    }
    let ix = ctx.viewport.hover_index.unwrap_or(ctx.viewport.view_end);
    let info = panel.get_info_text(ctx, ix);
    if !info.is_empty() {
        list.text(
            frame.header.right_center() - vec2(MARGIN, 0.0),
            Align2::RIGHT_CENTER,
            info,
            TEXT_COLOR,
        );
    }
}

fn draw_crosshair<P: Panel + ?Sized>(
    panel: &P,
    ctx: &RenderContext,
    frame: &PanelFrame,
    scale: &ValueScale,
    list: &mut DrawList,
) {
    let vp = ctx.viewport;
    if !vp.pointer_active {
        return;
    }

    // margins included, the vertical line is held at the plot edge
    let stroke = Stroke::new(PEN_WIDTH, CURSOR_LINE_COLOR);
    let x = clamp_to_plot_x(vp.crosshair_x, frame.plot);
    list.line(Pos2::new(x, frame.plot.top()), Pos2::new(x, frame.plot.bottom()), stroke);

    let pointer_y = vp.pointer_y as f32;
    if pointer_y < frame.plot.top() || pointer_y >= frame.plot.bottom() {
        return;
    }
    let y = (vp.crosshair_y as f32).clamp(frame.plot.top(), frame.plot.bottom());
    list.line(Pos2::new(frame.plot.left(), y), Pos2::new(frame.plot.right(), y), stroke);
    list.label(
        Pos2::new(frame.axis.left() + 2.0, y),
        Align2::LEFT_CENTER,
        panel.format_value(scale.y_to_value(y)),
        BLACK_COLOR,
        CURSOR_COLOR,
    );
}

fn clamp_to_plot_x(x: f64, plot: Rect) -> f32 {
    (x as f32).clamp(plot.left(), plot.right().max(plot.left()))
}

fn draw_date_axis(series: &Series, vp: &ViewportState, row: Rect, list: &mut DrawList) {
    let step = if vp.candle_width > 0.0 {
        ((DATE_LABEL_SPACING / vp.candle_width).ceil() as usize).max(1)
    } else {
        1
    };
    let y = row.center().y;

    for ix in (vp.view_start..=vp.view_end).filter(|ix| ix % step == 0) {
        if let Some(candle) = series.get(ix) {
            let x = vp.index_to_x(ix) as f32;
            list.text(Pos2::new(x, y), Align2::CENTER_CENTER, candle.date.clone(), GREY_COLOR);
        }
    }

    if let Some(candle) = vp.hover_index.and_then(|ix| series.get(ix)) {
        list.label(
            Pos2::new(clamp_to_plot_x(vp.crosshair_x, row), y),
            Align2::CENTER_CENTER,
            candle.date.clone(),
            BLACK_COLOR,
            CURSOR_COLOR,
        );
    }
}

/// Screen points of the visible part of a line, split where values are NaN
pub fn polyline_segments(values: &[f64], vp: &ViewportState, scale: &ValueScale) -> Vec<Vec<Pos2>> {
    let mut segments = Vec::new();
    if values.is_empty() || vp.series_len == 0 {
        return segments;
    }

    let end = vp.view_end.min(values.len() - 1);
    let mut current: Vec<Pos2> = Vec::new();
    for ix in vp.view_start..=end {
        let value = values[ix];
        if value.is_nan() {
            if !current.is_empty() {
                segments.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.push(Pos2::new(vp.index_to_x(ix) as f32, scale.value_to_y(value)));
    }
    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Draw a value line over the visible window
pub fn draw_line(list: &mut DrawList, values: &[f64], vp: &ViewportState, scale: &ValueScale, stroke: Stroke) {
    for segment in polyline_segments(values, vp, scale) {
        list.polyline(segment, stroke);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::viewport::{CrosshairConfig, InteractionController, ViewportConfig};

    fn viewport(len: usize) -> ViewportState {
        let mut controller = InteractionController::new(ViewportConfig::default(), CrosshairConfig::default());
        controller.set_plot_width(80.0);
        controller.set_series_len(len);
        controller.state().clone()
    }

    #[test]
    fn test_value_scale_mapping() {
        let scale = ValueScale::new(0.0, 100.0, 0.0, 200.0);
        assert_eq!(scale.value_to_y(0.0), 200.0);
        assert_eq!(scale.value_to_y(100.0), 0.0);
        assert_eq!(scale.value_to_y(25.0), 150.0);
        assert!((scale.y_to_value(50.0) - 75.0).abs() < 1e-9);
    }

    #[test]
    fn test_value_scale_zero_range() {
        let scale = ValueScale::new(5.0, 5.0, 10.0, 110.0);
        assert_eq!(scale.value_to_y(5.0), 60.0);
        assert_eq!(scale.value_to_y(123.0), 60.0);
    }

    #[test]
    fn test_polyline_breaks_at_nan() {
        let vp = viewport(10);
        assert_eq!((vp.view_start, vp.view_end), (0, 9));

        let scale = ValueScale::new(0.0, 10.0, 0.0, 100.0);
        let values = vec![f64::NAN, 1.0, 2.0, f64::NAN, 4.0, 5.0, 6.0, f64::NAN, f64::NAN, 9.0];
        let segments = polyline_segments(&values, &vp, &scale);
        let lens: Vec<usize> = segments.iter().map(|s| s.len()).collect();
        assert_eq!(lens, vec![2, 3, 1]);
        assert_eq!(segments[0][0].x, vp.index_to_x(1) as f32);

        // single point segments are dropped by the display list
        let mut list = DrawList::new();
        draw_line(&mut list, &values, &vp, &scale, Stroke::new(1.0, TEXT_COLOR));
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_frame_layout() {
        let vp = viewport(10);
        let rect = Rect::from_min_max(Pos2::new(0.0, 100.0), Pos2::new(300.0, 300.0));

        let frame = PanelFrame::new(rect, &vp, true);
        assert_eq!(frame.header.height(), HEADER_HEIGHT);
        assert_eq!(frame.plot.left(), MARGIN);
        assert_eq!(frame.plot.right(), MARGIN + 80.0);
        assert_eq!(frame.plot.bottom(), 300.0 - AXIS_X_HEIGHT);
        assert!(frame.date_row.is_some());

        let frame = PanelFrame::new(rect, &vp, false);
        assert_eq!(frame.plot.bottom(), 300.0);
        assert!(frame.date_row.is_none());
    }
}
