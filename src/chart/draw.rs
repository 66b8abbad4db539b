//! Display lists produced by panel render passes.

use egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Shape, Stroke, StrokeKind, Vec2};

use super::base::FONT_SIZE;

/// One drawing primitive, in chart-local coordinates
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Line {
        points: [Pos2; 2],
        stroke: Stroke,
    },
    DashedLine {
        points: [Pos2; 2],
        stroke: Stroke,
        dash: f32,
        gap: f32,
    },
    Polyline {
        points: Vec<Pos2>,
        stroke: Stroke,
    },
    Rect {
        rect: Rect,
        fill: Color32,
    },
    RectStroke {
        rect: Rect,
        stroke: Stroke,
    },
    Polygon {
        points: Vec<Pos2>,
        fill: Color32,
    },
    Text {
        pos: Pos2,
        anchor: Align2,
        text: String,
        color: Color32,
    },
    /// Text on a filled box
    Label {
        pos: Pos2,
        anchor: Align2,
        text: String,
        color: Color32,
        background: Color32,
    },
}

/// Ordered draw commands of one panel for one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawList {
    commands: Vec<DrawCommand>,
}

impl DrawList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn push(&mut self, command: DrawCommand) {
        self.commands.push(command);
    }

    pub fn line(&mut self, from: Pos2, to: Pos2, stroke: Stroke) {
        self.push(DrawCommand::Line {
            points: [from, to],
            stroke,
        });
    }

    pub fn dashed_line(&mut self, from: Pos2, to: Pos2, stroke: Stroke) {
        self.push(DrawCommand::DashedLine {
            points: [from, to],
            stroke,
            dash: 4.0,
            gap: 3.0,
        });
    }

    /// Add a polyline. Fewer than two points draw nothing.
    pub fn polyline(&mut self, points: Vec<Pos2>, stroke: Stroke) {
        if points.len() >= 2 {
            self.push(DrawCommand::Polyline { points, stroke });
        }
    }

    pub fn rect_filled(&mut self, rect: Rect, fill: Color32) {
        self.push(DrawCommand::Rect { rect, fill });
    }

    pub fn rect_stroke(&mut self, rect: Rect, stroke: Stroke) {
        self.push(DrawCommand::RectStroke { rect, stroke });
    }

    pub fn polygon(&mut self, points: Vec<Pos2>, fill: Color32) {
        if points.len() >= 3 {
            self.push(DrawCommand::Polygon { points, fill });
        }
    }

    pub fn text(&mut self, pos: Pos2, anchor: Align2, text: impl Into<String>, color: Color32) {
        self.push(DrawCommand::Text {
            pos,
            anchor,
            text: text.into(),
            color,
        });
    }

    pub fn label(
        &mut self,
        pos: Pos2,
        anchor: Align2,
        text: impl Into<String>,
        color: Color32,
        background: Color32,
    ) {
        self.push(DrawCommand::Label {
            pos,
            anchor,
            text: text.into(),
            color,
            background,
        });
    }

    /// Number of commands matching a predicate
    pub fn count(&self, predicate: impl Fn(&DrawCommand) -> bool) -> usize {
        self.commands.iter().filter(|c| predicate(c)).count()
    }

    /// Paint every command, shifted by `offset`
    pub fn paint(&self, painter: &Painter, offset: Vec2) {
        let font = FontId::proportional(FONT_SIZE);

        for command in &self.commands {
            match command {
                DrawCommand::Line { points, stroke } => {
                    painter.line_segment([points[0] + offset, points[1] + offset], *stroke);
                }
                DrawCommand::DashedLine {
                    points,
                    stroke,
                    dash,
                    gap,
                } => {
                    let path = [points[0] + offset, points[1] + offset];
                    painter.extend(Shape::dashed_line(&path, *stroke, *dash, *gap));
                }
                DrawCommand::Polyline { points, stroke } => {
                    let path = points.iter().map(|p| *p + offset).collect();
                    painter.add(Shape::line(path, *stroke));
                }
                DrawCommand::Rect { rect, fill } => {
                    painter.rect_filled(rect.translate(offset), 0.0, *fill);
                }
                DrawCommand::RectStroke { rect, stroke } => {
                    painter.rect_stroke(rect.translate(offset), 0.0, *stroke, StrokeKind::Inside);
                }
                DrawCommand::Polygon { points, fill } => {
                    let path = points.iter().map(|p| *p + offset).collect();
                    painter.add(Shape::convex_polygon(path, *fill, Stroke::NONE));
                }
                DrawCommand::Text {
                    pos,
                    anchor,
                    text,
                    color,
                } => {
                    painter.text(*pos + offset, *anchor, text, font.clone(), *color);
                }
                DrawCommand::Label {
                    pos,
                    anchor,
                    text,
                    color,
                    background,
                } => {
                    let galley = painter.layout_no_wrap(text.clone(), font.clone(), *color);
                    let rect = anchor.anchor_size(*pos + offset, galley.size());
                    painter.rect_filled(rect.expand(2.0), 2.0, *background);
                    painter.galley(rect.min, galley, *color);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_shapes_skipped() {
        let mut list = DrawList::new();
        list.polyline(vec![Pos2::new(0.0, 0.0)], Stroke::new(1.0, Color32::WHITE));
        list.polygon(vec![Pos2::ZERO, Pos2::new(1.0, 1.0)], Color32::WHITE);
        assert!(list.is_empty());

        list.polyline(vec![Pos2::ZERO, Pos2::new(1.0, 1.0)], Stroke::new(1.0, Color32::WHITE));
        list.text(Pos2::ZERO, Align2::LEFT_TOP, "RSI", Color32::WHITE);
        assert_eq!(list.len(), 2);
        assert_eq!(list.count(|c| matches!(c, DrawCommand::Text { .. })), 1);

        list.clear();
        assert!(list.is_empty());
    }
}
