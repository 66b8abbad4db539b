//! Shared data types, settings, logging and data sources.

pub mod constant;
pub mod datafeed;
pub mod logger;
pub mod object;
pub mod setting;
pub mod utility;

pub use constant::{Direction, OverlayKind, PanelKind, Timeframe};
pub use datafeed::{generate_sample_series, JsonDatafeed, MemoryDatafeed, ScanSource, SeriesSource};
pub use logger::init_logger;
pub use object::{Candle, ScanMatch, Series};
pub use setting::{SettingValue, Settings, SETTINGS};
