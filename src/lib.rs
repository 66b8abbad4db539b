//! Chart Engine - multi-pane financial charting in Rust
//!
//! This crate provides the viewport, rendering and caching core of an
//! interactive candlestick chart:
//!
//! - One shared viewport driven by pan, zoom, hover and keyboard input
//! - A stack of price, volume and oscillator panels with drag-resize
//! - Technical indicators memoized per loaded series
//! - Week to year aggregation of daily series, cached per instrument
//! - Layout persistence and an egui widget to host everything
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use chart_engine::chart::{ChartSession, InputEvent, MemoryLayoutStore, SessionConfig};
//! use chart_engine::common::generate_sample_series;
//!
//! let mut session = ChartSession::new(SessionConfig::default(), Box::new(MemoryLayoutStore::new()));
//! session.load_series(generate_sample_series("DEMO", 500, 42));
//! session.handle_input(InputEvent::Resize { width: 1200.0, height: 800.0 });
//! session.frame();
//! ```

pub mod aggregation;
pub mod chart;
pub mod common;
pub mod error;
pub mod indicator;

// Re-export commonly used types
pub use aggregation::{aggregate, AggregationCache};
pub use chart::{ChartSession, ChartWidget, HoverEvent, InputEvent, SessionConfig};
pub use common::{Candle, OverlayKind, PanelKind, ScanMatch, Series, Timeframe};
pub use error::{ChartError, Result};
pub use indicator::{IndicatorCache, IndicatorKey, IndicatorOutput};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
