//! egui widget hosting a chart session.

use egui::{Key, Pos2, Rect, Response, Sense, Ui, Vec2};

use super::layout::PanelId;
use super::session::{ChartSession, InputEvent};
use super::viewport::NavKey;
use crate::common::constant::{OverlayKind, PanelKind, Timeframe};

/// Toolbar request, applied after the toolbar closure returns
enum ToolbarAction {
    Timeframe(Timeframe),
    AddPanel(PanelKind),
    RemovePanel(PanelId),
    Collapse(PanelId, bool),
    Overlay(PanelId, OverlayKind, bool),
}

/// Events for one frame of wheel and pinch input.
///
/// When egui reports a zoom, the vertical scroll of that frame was turned into
/// the zoom and is dropped. Horizontal scroll always pans.
fn wheel_events(zoom: f32, scroll_delta: Vec2, x: f64) -> Vec<InputEvent> {
    let mut events = Vec::new();
    let zooming = zoom != 1.0;
    if zooming {
        events.push(InputEvent::Zoom { factor: zoom as f64, x });
    }

    let delta_y = if zooming { 0.0 } else { scroll_delta.y as f64 };
    let delta_x = scroll_delta.x as f64;
    if delta_x != 0.0 || delta_y != 0.0 {
        events.push(InputEvent::Wheel { delta_x, delta_y, x });
    }
    events
}

/// Chart widget: toolbar plus the stacked panels
pub struct ChartWidget {
    session: ChartSession,
    size: Vec2,
    hovering: bool,
    show_toolbar: bool,
}

impl ChartWidget {
    pub fn new(session: ChartSession) -> Self {
        Self {
            session,
            size: Vec2::ZERO,
            hovering: false,
            show_toolbar: true,
        }
    }

    pub fn session(&self) -> &ChartSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ChartSession {
        &mut self.session
    }

    pub fn set_show_toolbar(&mut self, show: bool) {
        self.show_toolbar = show;
    }

    /// Show the chart widget
    pub fn show(&mut self, ui: &mut Ui) -> Response {
        if self.show_toolbar {
            self.show_toolbar(ui);
        }

        let available_size = ui.available_size();
        let (response, painter) = ui.allocate_painter(available_size, Sense::click_and_drag());

        if response.clicked() {
            response.request_focus();
        }

        let rect = response.rect;
        if rect.size() != self.size {
            self.size = rect.size();
            self.session.handle_input(InputEvent::Resize {
                width: rect.width(),
                height: rect.height(),
            });
        }

        self.handle_pointer(ui, &response, rect);
        if response.has_focus() {
            self.handle_keyboard(ui);
        }

        self.session.frame();

        let offset = rect.min.to_vec2();
        for (_, panel_rect, list) in self.session.panel_frames() {
            let clip = panel_rect.translate(offset).intersect(rect);
            if clip.is_positive() {
                list.paint(&painter.with_clip_rect(clip), offset);
            }
        }

        if self.session.needs_frame() {
            ui.ctx().request_repaint();
        }

        response
    }

    fn handle_pointer(&mut self, ui: &Ui, response: &Response, rect: Rect) {
        let local = |pos: Pos2| (pos - rect.min).to_pos2();

        match response.hover_pos() {
            Some(pos) => {
                let p = local(pos);
                self.hovering = true;
                self.session.handle_input(InputEvent::PointerMove {
                    x: p.x as f64,
                    y: p.y as f64,
                });
            }
            None if self.hovering && !response.dragged() => {
                self.hovering = false;
                self.session.handle_input(InputEvent::PointerLeave);
            }
            None => {}
        }

        if response.drag_started() {
            if let Some(pos) = response.interact_pointer_pos() {
                let p = local(pos);
                self.session.handle_input(InputEvent::PointerDown {
                    x: p.x as f64,
                    y: p.y as f64,
                });
            }
        }
        if response.dragged() && response.hover_pos().is_none() {
            if let Some(pos) = response.interact_pointer_pos() {
                let p = local(pos);
                self.session.handle_input(InputEvent::PointerMove {
                    x: p.x as f64,
                    y: p.y as f64,
                });
            }
        }
        if response.drag_stopped() {
            self.session.handle_input(InputEvent::PointerUp);
        }

        if !response.hovered() {
            return;
        }
        let anchor_x = response.hover_pos().map(|p| local(p).x as f64).unwrap_or(0.0);

        let (zoom, scroll_delta) = ui.input(|i| (i.zoom_delta(), i.raw_scroll_delta));
        for event in wheel_events(zoom, scroll_delta, anchor_x) {
            self.session.handle_input(event);
        }
    }

    /// Handle keyboard input
    fn handle_keyboard(&mut self, ui: &Ui) {
        let keys = [
            (Key::ArrowLeft, NavKey::Left),
            (Key::ArrowRight, NavKey::Right),
            (Key::ArrowUp, NavKey::Up),
            (Key::ArrowDown, NavKey::Down),
            (Key::Home, NavKey::Home),
            (Key::End, NavKey::End),
        ];
        for (key, nav) in keys {
            if ui.input(|i| i.key_pressed(key)) {
                self.session.handle_input(InputEvent::Key(nav));
            }
        }
    }

    fn show_toolbar(&mut self, ui: &mut Ui) {
        let mut actions: Vec<ToolbarAction> = Vec::new();
        let session = &self.session;

        egui::TopBottomPanel::top("chart_toolbar").show_inside(ui, |ui| {
            ui.horizontal(|ui| {
                if let Some(series) = session.series() {
                    ui.strong(series.instrument());
                    ui.separator();
                }

                for timeframe in Timeframe::all() {
                    if ui
                        .selectable_label(session.timeframe() == timeframe, timeframe.display_name())
                        .clicked()
                    {
                        actions.push(ToolbarAction::Timeframe(timeframe));
                    }
                }

                ui.separator();

                for kind in PanelKind::all().into_iter().filter(|k| k.is_oscillator()) {
                    if ui.button(format!("+ {}", kind.display_name())).clicked() {
                        actions.push(ToolbarAction::AddPanel(kind));
                    }
                }
            });

            ui.horizontal(|ui| {
                for panel in session.layout().panels() {
                    let label = if panel.collapsed {
                        format!("▸ {}", panel.kind.display_name())
                    } else {
                        format!("▾ {}", panel.kind.display_name())
                    };
                    if ui.small_button(label).clicked() {
                        actions.push(ToolbarAction::Collapse(panel.id, !panel.collapsed));
                    }

                    if panel.kind == PanelKind::Price {
                        for overlay in OverlayKind::all() {
                            let mut enabled = panel.overlays.contains(&overlay);
                            if ui.checkbox(&mut enabled, overlay.display_name()).changed() {
                                actions.push(ToolbarAction::Overlay(panel.id, overlay, enabled));
                            }
                        }
                    } else if ui.small_button("✕").clicked() {
                        actions.push(ToolbarAction::RemovePanel(panel.id));
                    }
                    ui.separator();
                }
            });
        });

        for action in actions {
            match action {
                ToolbarAction::Timeframe(timeframe) => self.session.set_timeframe(timeframe),
                ToolbarAction::AddPanel(kind) => {
                    self.session.add_panel(kind, None);
                }
                ToolbarAction::RemovePanel(id) => {
                    self.session.remove_panel(id);
                }
                ToolbarAction::Collapse(id, collapsed) => {
                    self.session.set_collapsed(id, collapsed);
                }
                ToolbarAction::Overlay(id, overlay, enabled) => {
                    self.session.set_overlay(id, overlay, enabled);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wheel_events_plain_scroll() {
        assert!(wheel_events(1.0, Vec2::ZERO, 10.0).is_empty());
        assert_eq!(
            wheel_events(1.0, Vec2::new(4.0, -50.0), 10.0),
            vec![InputEvent::Wheel {
                delta_x: 4.0,
                delta_y: -50.0,
                x: 10.0
            }]
        );
    }

    #[test]
    fn test_wheel_events_pinch_keeps_horizontal_pan() {
        let events = wheel_events(1.25, Vec2::new(-12.0, 30.0), 200.0);
        assert_eq!(
            events,
            vec![
                InputEvent::Zoom { factor: 1.25, x: 200.0 },
                InputEvent::Wheel {
                    delta_x: -12.0,
                    delta_y: 0.0,
                    x: 200.0
                },
            ]
        );

        assert_eq!(
            wheel_events(0.8, Vec2::new(0.0, 30.0), 200.0),
            vec![InputEvent::Zoom {
                factor: 0.8_f32 as f64,
                x: 200.0
            }]
        );
    }
}
