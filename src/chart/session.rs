//! Chart session: applies input, keeps the panel runtimes and produces frames.

use std::rc::Rc;

use egui::Rect;

use super::base::{AXIS_Y_WIDTH, MARGIN};
use super::draw::DrawList;
use super::item::PanelView;
use super::layout::{LayoutConfig, LayoutManager, PanelId};
use super::panel::{Panel, RenderContext};
use super::persistence::{LayoutStore, PanelParams};
use super::viewport::{CrosshairConfig, InteractionController, NavKey, ViewportConfig, ViewportState};
use crate::aggregation::{AggregationCache, CacheConfig};
use crate::common::constant::{OverlayKind, PanelKind, Timeframe};
use crate::common::datafeed::SeriesSource;
use crate::common::object::{Candle, ScanMatch, Series};
use crate::common::setting::Settings;
use crate::error::{ChartError, Result};
use crate::indicator::{IndicatorCache, IndicatorSnapshot};

/// Reported when the hovered candle changes
#[derive(Debug, Clone, PartialEq)]
pub struct HoverEvent {
    pub index: usize,
    pub candle: Candle,
    pub snapshot: IndicatorSnapshot,
}

/// Input in chart-local pixels
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    PointerMove { x: f64, y: f64 },
    PointerLeave,
    PointerDown { x: f64, y: f64 },
    PointerUp,
    /// Wheel or trackpad scroll. `delta_x` pans, `delta_y` zooms.
    Wheel { delta_x: f64, delta_y: f64, x: f64 },
    /// Pinch or ctrl-wheel zoom
    Zoom { factor: f64, x: f64 },
    Resize { width: f32, height: f32 },
    Key(NavKey),
}

/// Typed configuration of a session
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionConfig {
    pub viewport: ViewportConfig,
    pub crosshair: CrosshairConfig,
    pub layout: LayoutConfig,
    pub cache: CacheConfig,
}

impl SessionConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            viewport: ViewportConfig::from_settings(settings),
            crosshair: CrosshairConfig::from_settings(settings),
            layout: LayoutConfig::from_settings(settings),
            cache: CacheConfig::from_settings(settings),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum DragState {
    Idle,
    Pan { last_x: f64 },
    Resize { panel: PanelId, last_y: f64 },
}

struct PanelRuntime {
    id: PanelId,
    view: PanelView,
    collapsed: bool,
    dirty: bool,
    draw_list: DrawList,
}

type HoverCallback = Box<dyn FnMut(&HoverEvent)>;

/// One chart: a viewport shared by a stack of panels.
///
/// Input only mutates state and marks panels dirty. Drawing happens in
/// [`ChartSession::frame`].
pub struct ChartSession {
    controller: InteractionController,
    layout: LayoutManager,
    panels: Vec<PanelRuntime>,
    indicators: IndicatorCache,
    aggregations: AggregationCache,
    source: Option<Box<dyn SeriesSource>>,
    raw: Option<Rc<Series>>,
    series: Option<Rc<Series>>,
    timeframe: Timeframe,
    drag: DragState,
    hover_callback: Option<HoverCallback>,
    last_hover: Option<usize>,
    synced_revision: Option<u64>,
    rendered_state: Option<ViewportState>,
}

impl ChartSession {
    pub fn new(config: SessionConfig, store: Box<dyn LayoutStore>) -> Self {
        let mut session = Self {
            controller: InteractionController::new(config.viewport, config.crosshair),
            layout: LayoutManager::new(config.layout, store),
            panels: Vec::new(),
            indicators: IndicatorCache::new(),
            aggregations: AggregationCache::new(config.cache),
            source: None,
            raw: None,
            series: None,
            timeframe: Timeframe::Day,
            drag: DragState::Idle,
            hover_callback: None,
            last_hover: None,
            synced_revision: None,
            rendered_state: None,
        };
        session.sync_panels();
        session
    }

    pub fn set_source(&mut self, source: Box<dyn SeriesSource>) {
        self.source = Some(source);
    }

    /// Instruments offered by the bound source
    pub fn instruments(&self) -> Vec<String> {
        self.source.as_ref().map(|s| s.instruments()).unwrap_or_default()
    }

    /// Register the hover listener
    pub fn on_hover(&mut self, callback: impl FnMut(&HoverEvent) + 'static) {
        self.hover_callback = Some(Box::new(callback));
    }

    /// Replace the raw series and show its newest candles
    pub fn load_series(&mut self, series: Series) {
        let raw = Rc::new(series);
        tracing::info!("showing {} with {} candles", raw.instrument(), raw.len());
        self.raw = Some(raw);
        self.rebind(None);
    }

    /// Load an instrument from the bound source
    pub fn open_instrument(&mut self, instrument: &str) -> Result<()> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| ChartError::InstrumentNotFound(instrument.to_string()))?;
        let series = source.load_series(instrument)?;
        self.load_series(series);
        Ok(())
    }

    /// Switch the timeframe, keeping the candle at the right edge in view
    pub fn set_timeframe(&mut self, timeframe: Timeframe) {
        if timeframe == self.timeframe {
            return;
        }
        let edge_date = self
            .series
            .as_ref()
            .and_then(|s| s.get(self.controller.state().view_end))
            .map(|c| c.date.clone());

        tracing::debug!("timeframe {} -> {}", self.timeframe, timeframe);
        self.timeframe = timeframe;
        self.rebind(edge_date);
    }

    fn rebind(&mut self, edge_date: Option<String>) {
        let Some(raw) = self.raw.as_ref() else {
            return;
        };
        let series = self.aggregations.get(raw, self.timeframe);
        self.indicators.set_series(Rc::clone(&series));
        self.controller.set_series_len(series.len());
        if let Some(ix) = edge_date.and_then(|date| series.index_at_or_after(&date)) {
            self.controller.align_right(ix);
        }
        self.series = Some(series);
        self.last_hover = None;
        self.mark_all_dirty();
    }

    /// Show a scan result: switch instrument when needed, then centre its date
    pub fn show_scan_match(&mut self, scan: &ScanMatch) -> Result<Option<usize>> {
        let current = self.raw.as_ref().map(|s| s.instrument());
        if current != Some(scan.instrument.as_str()) {
            self.open_instrument(&scan.instrument)?;
        }
        Ok(self.scroll_to_date(&scan.date))
    }

    /// Centre the candle holding `date`
    pub fn scroll_to_date(&mut self, date: &str) -> Option<usize> {
        let series = self.series.clone()?;
        let ix = self.controller.scroll_to_date(&series, date);
        self.mark_all_dirty();
        ix
    }

    /// Apply one input event
    pub fn handle_input(&mut self, event: InputEvent) {
        match event {
            InputEvent::PointerMove { x, y } => {
                match self.drag {
                    DragState::Pan { last_x } => {
                        self.controller.pan_pixels(x - last_x);
                        self.drag = DragState::Pan { last_x: x };
                    }
                    DragState::Resize { panel, last_y } => {
                        if let Err(e) = self.layout.resize_adjacent(panel, (y - last_y) as f32) {
                            tracing::warn!("resize refused: {}", e);
                        }
                        self.drag = DragState::Resize { panel, last_y: y };
                    }
                    DragState::Idle => {}
                }
                self.controller.set_hover(x, y);
            }
            InputEvent::PointerLeave => {
                self.end_drag();
                self.controller.clear_hover();
                self.mark_all_dirty();
            }
            InputEvent::PointerDown { x, y } => {
                self.drag = match self.layout.divider_at(y as f32) {
                    Some(panel) => DragState::Resize { panel, last_y: y },
                    None => DragState::Pan { last_x: x },
                };
            }
            InputEvent::PointerUp => self.end_drag(),
            InputEvent::Wheel { delta_x, delta_y, x } => self.controller.on_wheel(delta_x, delta_y, x),
            InputEvent::Zoom { factor, x } => self.controller.zoom(factor, x),
            InputEvent::Resize { width, height } => self.resize(width, height),
            InputEvent::Key(key) => self.controller.on_key(key),
        }
    }

    fn end_drag(&mut self) {
        if let DragState::Resize { .. } = self.drag {
            self.layout.finish_resize();
        }
        self.drag = DragState::Idle;
    }

    fn resize(&mut self, width: f32, height: f32) {
        if !self.layout.layout(width, height) {
            return;
        }
        self.controller.set_left_margin(MARGIN as f64);
        self.controller.set_plot_width((width - MARGIN - AXIS_Y_WIDTH).max(0.0) as f64);
        self.mark_all_dirty();
    }

    /// Whether the resize divider is being dragged
    pub fn is_resizing(&self) -> bool {
        matches!(self.drag, DragState::Resize { .. })
    }

    pub fn add_panel(&mut self, kind: PanelKind, params: Option<PanelParams>) -> Option<PanelId> {
        match self.layout.add_panel(kind, params) {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!("add {} panel refused: {}", kind.display_name(), e);
                None
            }
        }
    }

    pub fn remove_panel(&mut self, id: PanelId) -> bool {
        match self.layout.remove_panel(id) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("remove panel refused: {}", e);
                false
            }
        }
    }

    pub fn set_collapsed(&mut self, id: PanelId, collapsed: bool) -> bool {
        match self.layout.set_collapsed(id, collapsed) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("collapse refused: {}", e);
                false
            }
        }
    }

    pub fn set_overlay(&mut self, id: PanelId, overlay: OverlayKind, enabled: bool) -> bool {
        match self.layout.toggle_overlay(id, overlay, enabled) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("overlay change refused: {}", e);
                false
            }
        }
    }

    /// Whether the next `frame` call has work to do
    pub fn needs_frame(&self) -> bool {
        self.synced_revision != Some(self.layout.revision())
            || self.panels.iter().any(|p| p.dirty)
            || self.controller.state().pointer_active
            || self.controller.is_animating()
    }

    /// Advance smoothing and re-render dirty panels.
    ///
    /// Returns whether any panel was redrawn.
    pub fn frame(&mut self) -> bool {
        self.sync_panels();

        if self.controller.advance_frame() || self.controller.state().pointer_active {
            self.mark_all_dirty();
        }
        if self.rendered_state.as_ref() != Some(self.controller.state()) {
            self.mark_all_dirty();
        }

        let redrawn = self.render_dirty();
        if redrawn > 0 {
            self.rendered_state = Some(self.controller.state().clone());
            tracing::trace!("frame redrew {} panels", redrawn);
        }

        self.fire_hover();
        redrawn > 0
    }

    fn render_dirty(&mut self) -> usize {
        if !self.panels.iter().any(|p| p.dirty) {
            return 0;
        }

        for runtime in self.panels.iter().filter(|p| p.dirty && !p.collapsed) {
            for key in runtime.view.required_indicators() {
                self.indicators.get_or_compute(key);
            }
        }

        let viewport = self.controller.state();
        let series = self.series.as_deref();
        let bottom = self.panels.iter().rposition(|p| !p.collapsed);

        let mut redrawn = 0;
        for (ix, runtime) in self.panels.iter_mut().enumerate() {
            if !runtime.dirty {
                continue;
            }
            let ctx = RenderContext {
                viewport,
                series,
                cache: &self.indicators,
                collapsed: runtime.collapsed,
                is_last: bottom == Some(ix),
            };
            runtime.draw_list = runtime.view.render(&ctx);
            runtime.dirty = false;
            redrawn += 1;
        }
        redrawn
    }

    fn fire_hover(&mut self) {
        let index = self.controller.state().hover_index;
        if index == self.last_hover {
            return;
        }
        self.last_hover = index;

        let Some(callback) = self.hover_callback.as_mut() else {
            return;
        };
        let Some((ix, candle)) = index.zip(self.series.as_ref()).and_then(|(ix, s)| s.get(ix).map(|c| (ix, c.clone())))
        else {
            return;
        };
        let snapshot = self.indicators.snapshot(ix);
        callback(&HoverEvent {
            index: ix,
            candle,
            snapshot,
        });
    }

    /// Rebuild panel runtimes after the layout changed
    fn sync_panels(&mut self) {
        let revision = self.layout.revision();
        if self.synced_revision == Some(revision) {
            return;
        }
        self.synced_revision = Some(revision);

        let defaults = *self.layout.indicator_defaults();
        let mut previous = std::mem::take(&mut self.panels);

        for desc in self.layout.panels() {
            let mut view = PanelView::from_descriptor(desc, &defaults);
            view.resize(self.layout.rect_of(desc.id).unwrap_or(Rect::NOTHING));

            let draw_list = match previous.iter().position(|r| r.id == desc.id) {
                Some(pos) => previous.swap_remove(pos).draw_list,
                None => DrawList::new(),
            };
            self.panels.push(PanelRuntime {
                id: desc.id,
                view,
                collapsed: desc.collapsed,
                dirty: true,
                draw_list,
            });
        }

        for mut stale in previous {
            tracing::debug!("panel {} released", stale.id);
            stale.view.destroy();
        }
    }

    fn mark_all_dirty(&mut self) {
        for runtime in &mut self.panels {
            runtime.dirty = true;
        }
    }

    /// Rectangle and display list of every panel, top to bottom
    pub fn panel_frames(&self) -> impl Iterator<Item = (PanelId, Rect, &DrawList)> {
        self.panels.iter().map(|r| (r.id, r.view.rect(), &r.draw_list))
    }

    pub fn viewport(&self) -> &ViewportState {
        self.controller.state()
    }

    pub fn layout(&self) -> &LayoutManager {
        &self.layout
    }

    pub fn series(&self) -> Option<&Rc<Series>> {
        self.series.as_ref()
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn indicators(&self) -> &IndicatorCache {
        &self.indicators
    }

    pub fn aggregations(&self) -> &AggregationCache {
        &self.aggregations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    use crate::chart::base::CURSOR_LINE_COLOR;
    use crate::chart::draw::DrawCommand;
    use crate::chart::persistence::{MemoryLayoutStore, PersistedLayout};
    use crate::common::datafeed::{generate_sample_series, MemoryDatafeed};
    use crate::indicator::IndicatorKey;

    fn session() -> (ChartSession, MemoryLayoutStore) {
        let store = MemoryLayoutStore::new();
        let mut session = ChartSession::new(SessionConfig::default(), Box::new(store.clone()));
        session.handle_input(InputEvent::Resize {
            width: 800.0,
            height: 600.0,
        });
        (session, store)
    }

    fn with_series(len: usize) -> (ChartSession, MemoryLayoutStore) {
        let (mut session, store) = session();
        session.load_series(generate_sample_series("AAPL", len, 1));
        (session, store)
    }

    #[test]
    fn test_load_right_aligns_and_renders() {
        let (mut session, _) = with_series(300);
        // plot width 725 at 8 px per candle
        assert_eq!(session.viewport().view_end, 299);
        assert_eq!(session.viewport().view_start, 210);

        assert!(session.frame());
        assert_eq!(session.panel_frames().count(), 3);
        for (_, rect, list) in session.panel_frames() {
            assert!(rect.height() > 0.0);
            assert!(!list.is_empty());
        }
        assert!(session.indicators().lookup(&IndicatorKey::sma(20)).is_some());

        // nothing changed since the last frame
        assert!(!session.needs_frame());
        assert!(!session.frame());
    }

    #[test]
    fn test_frame_without_series_draws_placeholders() {
        let (mut session, _) = session();
        assert!(session.frame());
        assert!(session.indicators().is_empty());
        assert!(session.panel_frames().all(|(_, _, list)| !list.is_empty()));
    }

    #[test]
    fn test_hover_event_fires_on_index_change() {
        let (mut session, _) = with_series(300);
        let events: Rc<RefCell<Vec<HoverEvent>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        session.on_hover(move |e| sink.borrow_mut().push(e.clone()));

        session.handle_input(InputEvent::PointerMove { x: 9.0, y: 100.0 });
        session.frame();
        session.handle_input(InputEvent::PointerMove { x: 10.0, y: 120.0 });
        session.frame();
        session.handle_input(InputEvent::PointerMove { x: 21.0, y: 120.0 });
        session.frame();

        let events = events.borrow();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].index, 210);
        assert_eq!(events[1].index, 212);
        assert_eq!(events[0].candle, session.series().unwrap().get(210).cloned().unwrap());
        assert!(events[0].snapshot.sma20.is_some());
        assert!(events[0].snapshot.rsi14.is_some());
    }

    #[test]
    fn test_drag_pans_and_divider_resizes() {
        let (mut session, store) = with_series(300);
        session.frame();

        session.handle_input(InputEvent::PointerDown { x: 400.0, y: 200.0 });
        session.handle_input(InputEvent::PointerMove { x: 480.0, y: 200.0 });
        session.handle_input(InputEvent::PointerUp);
        assert_eq!(session.viewport().view_start, 200);
        assert_eq!(store.save_count(), 0);

        session.handle_input(InputEvent::PointerDown { x: 100.0, y: 420.0 });
        assert!(session.is_resizing());
        session.handle_input(InputEvent::PointerMove { x: 100.0, y: 450.0 });
        session.handle_input(InputEvent::PointerUp);
        assert!(!session.is_resizing());
        assert!((session.layout().panels()[0].height_share - 0.75).abs() < 1e-9);
        assert_eq!(store.save_count(), 1);
        assert!(session.needs_frame());
    }

    #[test]
    fn test_timeframe_switch_keeps_edge_date() {
        let (mut session, _) = with_series(2000);
        session.scroll_to_date("2024-01-01");
        let edge = session.series().unwrap().get(session.viewport().view_end).unwrap().date.clone();

        session.set_timeframe(Timeframe::Week);
        let weekly = Rc::clone(session.series().unwrap());
        assert!(weekly.len() < 2000);
        let end = session.viewport().view_end;
        assert!(weekly.get(end).unwrap().date >= edge);
        if end > 0 {
            assert!(weekly.get(end - 1).unwrap().date < edge);
        }
        assert!(session.aggregations().contains("AAPL", Timeframe::Week));

        session.set_timeframe(Timeframe::Day);
        assert_eq!(session.series().unwrap().len(), 2000);
    }

    #[test]
    fn test_panel_refusals_are_absorbed() {
        let (mut session, _) = with_series(50);
        let price = session.layout().panels()[0].id;
        assert!(session.add_panel(PanelKind::Price, None).is_none());
        assert!(!session.remove_panel(price));
        assert_eq!(session.layout().panels().len(), 3);

        let macd = session.add_panel(PanelKind::Macd, None).unwrap();
        session.frame();
        assert_eq!(session.panel_frames().count(), 4);
        assert!(session
            .indicators()
            .lookup(&IndicatorKey::Macd { fast: 12, slow: 26, signal: 9 })
            .is_some());

        assert!(session.remove_panel(macd));
        session.frame();
        assert_eq!(session.panel_frames().count(), 3);
    }

    #[test]
    fn test_show_scan_match_switches_instrument() {
        let (mut session, _) = session();
        let mut feed = MemoryDatafeed::new();
        feed.insert(generate_sample_series("AAPL", 300, 1));
        feed.insert(generate_sample_series("MSFT", 300, 2));
        session.set_source(Box::new(feed));
        assert_eq!(session.instruments(), vec!["AAPL".to_string(), "MSFT".to_string()]);

        session.open_instrument("AAPL").unwrap();
        let scan = ScanMatch {
            instrument: "MSFT".to_string(),
            date: "2020-03-01".to_string(),
            close: 0.0,
        };
        let ix = session.show_scan_match(&scan).unwrap();
        assert_eq!(ix, Some(60));
        assert_eq!(session.series().unwrap().instrument(), "MSFT");
        let vp = session.viewport();
        assert!(vp.view_start <= 60 && vp.view_end >= 60);

        assert!(matches!(
            session.open_instrument("TSLA"),
            Err(ChartError::InstrumentNotFound(_))
        ));
    }

    #[test]
    fn test_config_from_default_settings() {
        let config = SessionConfig::from_settings(&Settings::with_defaults());
        assert_eq!(config, SessionConfig::default());
    }

    #[test]
    fn test_out_of_range_layout_renders_defaults() {
        let store = MemoryLayoutStore::new();
        let mut layout = PersistedLayout::default_layout();
        layout.panels[2].params.period = Some(usize::MAX);
        store.clone().save(&layout).unwrap();

        let mut session = ChartSession::new(SessionConfig::default(), Box::new(store));
        session.handle_input(InputEvent::Resize {
            width: 800.0,
            height: 600.0,
        });
        session.load_series(generate_sample_series("AAPL", 300, 1));
        assert!(session.frame());
        assert!(session.indicators().lookup(&IndicatorKey::Rsi { period: 14 }).is_some());

        let params = PanelParams {
            k_period: Some(usize::MAX),
            ..PanelParams::default()
        };
        assert!(session.add_panel(PanelKind::Stochastic, Some(params)).is_some());
        assert!(session.frame());
        assert!(session
            .indicators()
            .lookup(&IndicatorKey::Stochastic { k_period: 14, d_period: 3 })
            .is_some());
    }

    #[test]
    fn test_crosshair_follows_pointer_into_axis_margin() {
        let cursor_lines = |session: &ChartSession| -> usize {
            session
                .panel_frames()
                .map(|(_, _, list)| {
                    list.count(|c| matches!(c, DrawCommand::Line { stroke, .. } if stroke.color == CURSOR_LINE_COLOR))
                })
                .sum()
        };

        let (mut session, _) = with_series(300);
        session.handle_input(InputEvent::PointerMove { x: 400.0, y: 200.0 });
        for _ in 0..30 {
            session.frame();
        }
        // vertical line in every panel, horizontal line in the price panel
        assert_eq!(cursor_lines(&session), 4);

        session.handle_input(InputEvent::PointerMove { x: 770.0, y: 200.0 });
        for _ in 0..30 {
            session.frame();
        }
        assert_eq!(cursor_lines(&session), 4);
        let plot_right = MARGIN + session.viewport().plot_width as f32;
        for (_, _, list) in session.panel_frames() {
            for command in list.commands() {
                if let DrawCommand::Line { points, stroke } = command {
                    if stroke.color == CURSOR_LINE_COLOR {
                        assert!(points[0].x <= plot_right && points[1].x <= plot_right);
                    }
                }
            }
        }

        session.handle_input(InputEvent::PointerLeave);
        session.frame();
        assert_eq!(cursor_lines(&session), 0);
    }

    #[test]
    fn test_zero_size_resize_is_deferred() {
        let store = MemoryLayoutStore::new();
        let mut session = ChartSession::new(SessionConfig::default(), Box::new(store));
        session.handle_input(InputEvent::Resize { width: 0.0, height: 0.0 });
        assert!(session.layout().is_pending());
        session.handle_input(InputEvent::Resize {
            width: 640.0,
            height: 480.0,
        });
        assert!(!session.layout().is_pending());
        assert_eq!(session.viewport().plot_width, (640.0 - MARGIN - AXIS_Y_WIDTH) as f64);
    }

}
