//! Chart module: shared viewport, panel stack and egui rendering.
//!
//! This module provides:
//! - `InteractionController` - Pan, zoom, hover and smoothing of the shared viewport
//! - `LayoutManager` - Panel order, height shares, collapse and drag-resize
//! - `PricePanel`, `VolumePanel`, `OscillatorPanel` - Panel render passes
//! - `ChartSession` - Input handling and frame production
//! - `ChartWidget` - egui widget hosting a session
//!
//! # Example
//!
//! ```ignore
//! use chart_engine::chart::{ChartSession, ChartWidget, MemoryLayoutStore, SessionConfig};
//!
//! let mut session = ChartSession::new(SessionConfig::default(), Box::new(MemoryLayoutStore::new()));
//! session.load_series(series);
//! let mut chart = ChartWidget::new(session);
//! chart.show(ui);
//! ```

pub mod base;
pub mod draw;
pub mod item;
pub mod layout;
pub mod panel;
pub mod persistence;
pub mod session;
pub mod viewport;
pub mod widget;

pub use draw::{DrawCommand, DrawList};
pub use item::{OscillatorPanel, PanelView, PricePanel, VolumePanel};
pub use layout::{LayoutConfig, LayoutManager, PanelDescriptor, PanelId};
pub use panel::{Panel, PanelFrame, RenderContext, ValueScale};
pub use persistence::{
    IndicatorDefaults, JsonLayoutStore, LayoutStore, MemoryLayoutStore, PanelParams, PersistedLayout,
    PersistedPanel,
};
pub use session::{ChartSession, HoverEvent, InputEvent, SessionConfig};
pub use viewport::{CrosshairConfig, InteractionController, NavKey, ViewportConfig, ViewportState};
pub use widget::ChartWidget;
