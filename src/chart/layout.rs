//! Panel stack: ordering, height shares, collapse state and drag-resize.

use std::fmt;

use egui::{Pos2, Rect};
use uuid::Uuid;

use super::base::DIVIDER_GRAB;
use super::persistence::{
    load_or_default, IndicatorDefaults, LayoutStore, PanelParams, PersistedLayout, PersistedPanel, LAYOUT_VERSION,
};
use crate::common::constant::{OverlayKind, PanelKind};
use crate::common::setting::Settings;
use crate::error::{ChartError, Result};

const SHARE_EPSILON: f64 = 1e-9;

/// Identity of a panel for the lifetime of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PanelId(Uuid);

impl PanelId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PanelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PanelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Panel entry of the stack
#[derive(Debug, Clone, PartialEq)]
pub struct PanelDescriptor {
    pub id: PanelId,
    pub kind: PanelKind,
    /// Share of the expanded height. Collapsed panels keep the share they
    /// return to when expanded.
    pub height_share: f64,
    pub collapsed: bool,
    /// Ordered overlay set, price panel only
    pub overlays: Vec<OverlayKind>,
    /// Resolved parameters
    pub params: PanelParams,
}

/// Layout tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutConfig {
    /// Resize floor as a fraction of the container height
    pub min_share_ratio: f64,
    pub collapsed_row_height: f32,
    /// Share given to a newly added panel
    pub default_share: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            min_share_ratio: 0.08,
            collapsed_row_height: 22.0,
            default_share: 0.2,
        }
    }
}

impl LayoutConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        let d = Self::default();
        Self {
            min_share_ratio: settings
                .get_float("layout.min_share_ratio")
                .unwrap_or(d.min_share_ratio)
                .clamp(0.0, 0.45),
            collapsed_row_height: settings
                .get_float("layout.collapsed_row_height")
                .unwrap_or(d.collapsed_row_height as f64)
                .max(0.0) as f32,
            default_share: settings
                .get_float("layout.default_share")
                .unwrap_or(d.default_share)
                .clamp(0.05, 0.9),
        }
    }
}

/// Owns the panel list and computes panel rectangles.
pub struct LayoutManager {
    panels: Vec<PanelDescriptor>,
    defaults: IndicatorDefaults,
    config: LayoutConfig,
    store: Box<dyn LayoutStore>,
    rects: Vec<(PanelId, Rect)>,
    width: f32,
    height: f32,
    pending: bool,
    revision: u64,
}

impl LayoutManager {
    /// Restore the stored layout, or the default one
    pub fn new(config: LayoutConfig, store: Box<dyn LayoutStore>) -> Self {
        let persisted = load_or_default(store.as_ref());
        let mut manager = Self {
            panels: Vec::new(),
            defaults: persisted.indicator_defaults,
            config,
            store,
            rects: Vec::new(),
            width: 0.0,
            height: 0.0,
            pending: true,
            revision: 0,
        };
        manager.restore(&persisted);
        manager
    }

    fn restore(&mut self, persisted: &PersistedLayout) {
        self.defaults = persisted.indicator_defaults;
        self.panels = persisted
            .panels
            .iter()
            .map(|p| PanelDescriptor {
                id: PanelId::new(),
                kind: p.kind,
                height_share: p.height_share,
                collapsed: p.collapsed,
                overlays: if p.kind == PanelKind::Price {
                    dedup_overlays(&p.overlays)
                } else {
                    Vec::new()
                },
                params: p.params.resolve(p.kind, &self.defaults),
            })
            .collect();
        self.renormalize();
        self.relayout();
    }

    pub fn panels(&self) -> &[PanelDescriptor] {
        &self.panels
    }

    pub fn get(&self, id: PanelId) -> Option<&PanelDescriptor> {
        self.panels.iter().find(|p| p.id == id)
    }

    pub fn indicator_defaults(&self) -> &IndicatorDefaults {
        &self.defaults
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    /// Counter bumped by every change to the list or the rectangles
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Whether a layout pass waits for a measured container
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    fn index_of(&self, id: PanelId) -> Result<usize> {
        self.panels
            .iter()
            .position(|p| p.id == id)
            .ok_or(ChartError::UnknownPanel(id))
    }

    fn expanded_count(&self) -> usize {
        self.panels.iter().filter(|p| !p.collapsed).count()
    }

    /// Append a panel with the default share.
    ///
    /// The existing expanded panels shrink proportionally to make room.
    pub fn add_panel(&mut self, kind: PanelKind, params: Option<PanelParams>) -> Result<PanelId> {
        if kind == PanelKind::Price && self.panels.iter().any(|p| p.kind == PanelKind::Price) {
            return Err(ChartError::DuplicatePricePanel);
        }

        let share = self.config.default_share;
        for p in self.panels.iter_mut().filter(|p| !p.collapsed) {
            p.height_share *= 1.0 - share;
        }

        let id = PanelId::new();
        self.panels.push(PanelDescriptor {
            id,
            kind,
            height_share: share,
            collapsed: false,
            overlays: Vec::new(),
            params: params.unwrap_or_default().resolve(kind, &self.defaults),
        });
        tracing::debug!("added {} panel {}", kind.display_name(), id);

        self.renormalize();
        self.persist();
        self.relayout();
        Ok(id)
    }

    /// Remove a panel. The price panel cannot be removed.
    pub fn remove_panel(&mut self, id: PanelId) -> Result<()> {
        let ix = self.index_of(id)?;
        if self.panels[ix].kind == PanelKind::Price {
            return Err(ChartError::SolePricePanel);
        }

        let removed = self.panels.remove(ix);
        tracing::debug!("removed {} panel {}", removed.kind.display_name(), id);

        self.renormalize();
        self.persist();
        self.relayout();
        Ok(())
    }

    /// Collapse or expand a panel.
    ///
    /// The other expanded panels keep their relative proportions. The last
    /// expanded panel cannot be collapsed.
    pub fn set_collapsed(&mut self, id: PanelId, collapsed: bool) -> Result<()> {
        let ix = self.index_of(id)?;
        if self.panels[ix].collapsed == collapsed {
            return Ok(());
        }
        if collapsed && self.expanded_count() <= 1 {
            return Err(ChartError::LastExpandedPanel);
        }

        if collapsed {
            self.panels[ix].collapsed = true;
        } else {
            let share = self.panels[ix].height_share.clamp(self.config.default_share.min(0.5), 0.9);
            let others: f64 = self
                .panels
                .iter()
                .filter(|p| !p.collapsed)
                .map(|p| p.height_share)
                .sum();
            if others > 0.0 {
                let scale = (1.0 - share) / others;
                for p in self.panels.iter_mut().filter(|p| !p.collapsed) {
                    p.height_share *= scale;
                }
            }
            let panel = &mut self.panels[ix];
            panel.collapsed = false;
            panel.height_share = share;
        }

        self.renormalize();
        self.persist();
        self.relayout();
        Ok(())
    }

    /// Replace the overlay set of the price panel
    pub fn set_overlays(&mut self, id: PanelId, overlays: &[OverlayKind]) -> Result<()> {
        let ix = self.index_of(id)?;
        if self.panels[ix].kind != PanelKind::Price {
            return Ok(());
        }
        self.panels[ix].overlays = dedup_overlays(overlays);
        self.revision += 1;
        self.persist();
        Ok(())
    }

    /// Enable or disable one overlay on the price panel
    pub fn toggle_overlay(&mut self, id: PanelId, overlay: OverlayKind, enabled: bool) -> Result<()> {
        let current = self.index_of(id).map(|ix| self.panels[ix].overlays.clone())?;
        let mut overlays: Vec<OverlayKind> = current.into_iter().filter(|o| *o != overlay).collect();
        if enabled {
            overlays.push(overlay);
        }
        self.set_overlays(id, &overlays)
    }

    /// Drag the divider below panel `id` by `delta_px`.
    ///
    /// Only `id` and the next expanded panel below it change. Their combined
    /// share stays constant and neither drops below the floor.
    pub fn resize_adjacent(&mut self, id: PanelId, delta_px: f32) -> Result<()> {
        let ix = self.index_of(id)?;
        if self.panels[ix].collapsed || delta_px == 0.0 {
            return Ok(());
        }
        let Some(next) = (ix + 1..self.panels.len()).find(|&j| !self.panels[j].collapsed) else {
            return Ok(());
        };

        let available = self.available_height();
        if available <= 0.0 {
            return Ok(());
        }

        let a = self.panels[ix].height_share;
        let b = self.panels[next].height_share;
        let pair = a + b;
        let floor = self.share_floor(available).min(pair / 2.0);

        let new_a = (a + delta_px as f64 / available).clamp(floor, pair - floor);
        self.panels[ix].height_share = new_a;
        self.panels[next].height_share = pair - new_a;

        self.relayout();
        Ok(())
    }

    /// End of a drag-resize
    pub fn finish_resize(&mut self) {
        self.persist();
    }

    /// Minimum share a resize leaves a panel with
    fn share_floor(&self, available: f64) -> f64 {
        if available <= 0.0 {
            return 0.0;
        }
        self.config.min_share_ratio * self.height as f64 / available
    }

    fn available_height(&self) -> f64 {
        let collapsed = (self.panels.len() - self.expanded_count()) as f64;
        (self.height as f64 - collapsed * self.config.collapsed_row_height as f64).max(0.0)
    }

    /// Compute panel rectangles for a container.
    ///
    /// A zero-sized container defers the pass until a measured size arrives.
    /// Returns whether rectangles were assigned.
    pub fn layout(&mut self, width: f32, height: f32) -> bool {
        if width <= 0.0 || height <= 0.0 {
            if !self.pending {
                tracing::debug!("layout deferred for {}x{}", width, height);
            }
            self.pending = true;
            return false;
        }
        self.width = width;
        self.height = height;
        self.apply_layout();
        true
    }

    fn relayout(&mut self) {
        if self.width > 0.0 && self.height > 0.0 {
            self.apply_layout();
        } else {
            self.pending = true;
            self.revision += 1;
        }
    }

    fn apply_layout(&mut self) {
        let available = self.available_height();
        let row = self.config.collapsed_row_height;

        let mut y = 0.0_f32;
        self.rects = self
            .panels
            .iter()
            .map(|p| {
                let h = if p.collapsed {
                    row
                } else {
                    (available * p.height_share).floor() as f32
                };
                let rect = Rect::from_min_max(Pos2::new(0.0, y), Pos2::new(self.width, y + h));
                y += h;
                (p.id, rect)
            })
            .collect();

        self.pending = false;
        self.revision += 1;
        tracing::debug!("layout {}x{} with {} panels", self.width, self.height, self.rects.len());
    }

    pub fn rects(&self) -> &[(PanelId, Rect)] {
        &self.rects
    }

    pub fn rect_of(&self, id: PanelId) -> Option<Rect> {
        self.rects.iter().find(|(pid, _)| *pid == id).map(|(_, r)| *r)
    }

    /// Panel containing a y position
    pub fn panel_at(&self, y: f32) -> Option<PanelId> {
        self.rects
            .iter()
            .find(|(_, r)| y >= r.top() && y < r.bottom())
            .map(|(id, _)| *id)
    }

    /// Panel whose bottom divider is under a y position.
    ///
    /// Only dividers with an expanded panel further down can be dragged.
    pub fn divider_at(&self, y: f32) -> Option<PanelId> {
        self.rects.iter().enumerate().find_map(|(ix, (id, rect))| {
            let panel = &self.panels[ix];
            let has_next = self.panels[ix + 1..].iter().any(|p| !p.collapsed);
            let near = (y - rect.bottom()).abs() <= DIVIDER_GRAB;
            (!panel.collapsed && has_next && near).then_some(*id)
        })
    }

    /// Restore Σ expanded shares = 1 and at least one expanded panel
    fn renormalize(&mut self) {
        if self.panels.is_empty() {
            return;
        }
        if self.expanded_count() == 0 {
            let ix = self
                .panels
                .iter()
                .position(|p| p.kind == PanelKind::Price)
                .unwrap_or(0);
            self.panels[ix].collapsed = false;
        }

        for p in self.panels.iter_mut() {
            if !p.height_share.is_finite() || p.height_share <= 0.0 {
                p.height_share = self.config.default_share;
            }
        }

        let sum: f64 = self
            .panels
            .iter()
            .filter(|p| !p.collapsed)
            .map(|p| p.height_share)
            .sum();
        if (sum - 1.0).abs() > SHARE_EPSILON {
            for p in self.panels.iter_mut().filter(|p| !p.collapsed) {
                p.height_share /= sum;
            }
        }
    }

    /// Current arrangement as a persisted record
    pub fn to_persisted(&self) -> PersistedLayout {
        PersistedLayout {
            version: LAYOUT_VERSION,
            panels: self
                .panels
                .iter()
                .map(|p| PersistedPanel {
                    kind: p.kind,
                    height_share: p.height_share,
                    collapsed: p.collapsed,
                    overlays: p.overlays.clone(),
                    params: p.params,
                })
                .collect(),
            indicator_defaults: self.defaults,
        }
    }

    fn persist(&mut self) {
        let layout = self.to_persisted();
        if let Err(e) = self.store.save(&layout) {
            tracing::warn!("failed to save layout: {}", e);
        }
    }
}

fn dedup_overlays(overlays: &[OverlayKind]) -> Vec<OverlayKind> {
    let mut result: Vec<OverlayKind> = Vec::with_capacity(overlays.len());
    for overlay in overlays {
        if !result.contains(overlay) {
            result.push(*overlay);
        }
    }
    result
}
