//! General constant enums used across the chart engine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Price movement of a single candle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Flat,
}

/// Candle resolution shown by the chart.
///
/// `Day` is the raw resolution delivered by the data layer. `All` shows the
/// full history at raw resolution and therefore aggregates like `Day`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    Day,
    Week,
    Month,
    Quarter,
    HalfYear,
    Year,
    All,
}

impl Timeframe {
    /// Get timeframe value string
    pub fn value(&self) -> &'static str {
        match self {
            Timeframe::Day => "1D",
            Timeframe::Week => "1W",
            Timeframe::Month => "1M",
            Timeframe::Quarter => "3M",
            Timeframe::HalfYear => "6M",
            Timeframe::Year => "1Y",
            Timeframe::All => "ALL",
        }
    }

    /// Get display name
    pub fn display_name(&self) -> &'static str {
        match self {
            Timeframe::Day => "Daily",
            Timeframe::Week => "Weekly",
            Timeframe::Month => "Monthly",
            Timeframe::Quarter => "Quarterly",
            Timeframe::HalfYear => "Half-yearly",
            Timeframe::Year => "Yearly",
            Timeframe::All => "All history",
        }
    }

    /// Whether this timeframe leaves the raw series untouched.
    pub fn is_base(&self) -> bool {
        matches!(self, Timeframe::Day | Timeframe::All)
    }

    /// Get all timeframes for UI selection
    pub fn all() -> Vec<Timeframe> {
        vec![
            Timeframe::Day,
            Timeframe::Week,
            Timeframe::Month,
            Timeframe::Quarter,
            Timeframe::HalfYear,
            Timeframe::Year,
            Timeframe::All,
        ]
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

/// Kind of a stacked chart panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanelKind {
    Price,
    Volume,
    Rsi,
    Macd,
    Stochastic,
}

impl PanelKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            PanelKind::Price => "Price",
            PanelKind::Volume => "Volume",
            PanelKind::Rsi => "RSI",
            PanelKind::Macd => "MACD",
            PanelKind::Stochastic => "Stochastic",
        }
    }

    /// Oscillator panels draw a bounded or zero-centred indicator.
    pub fn is_oscillator(&self) -> bool {
        matches!(self, PanelKind::Rsi | PanelKind::Macd | PanelKind::Stochastic)
    }

    pub fn all() -> Vec<PanelKind> {
        vec![
            PanelKind::Price,
            PanelKind::Volume,
            PanelKind::Rsi,
            PanelKind::Macd,
            PanelKind::Stochastic,
        ]
    }
}

/// Fixed catalogue of overlays drawn on top of the price panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlayKind {
    Sma20,
    Sma50,
    Sma200,
    Ema9,
    Ema21,
    Bollinger,
}

impl OverlayKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            OverlayKind::Sma20 => "SMA 20",
            OverlayKind::Sma50 => "SMA 50",
            OverlayKind::Sma200 => "SMA 200",
            OverlayKind::Ema9 => "EMA 9",
            OverlayKind::Ema21 => "EMA 21",
            OverlayKind::Bollinger => "BB 20,2",
        }
    }

    pub fn all() -> Vec<OverlayKind> {
        vec![
            OverlayKind::Sma20,
            OverlayKind::Sma50,
            OverlayKind::Sma200,
            OverlayKind::Ema9,
            OverlayKind::Ema21,
            OverlayKind::Bollinger,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_timeframes() {
        assert!(Timeframe::Day.is_base());
        assert!(Timeframe::All.is_base());
        assert!(!Timeframe::Week.is_base());
        assert_eq!(Timeframe::all().len(), 7);
    }

    #[test]
    fn test_panel_kind_serde_names() {
        let json = serde_json::to_string(&PanelKind::Stochastic).unwrap();
        assert_eq!(json, "\"stochastic\"");
        let kind: PanelKind = serde_json::from_str("\"macd\"").unwrap();
        assert_eq!(kind, PanelKind::Macd);
        assert!(kind.is_oscillator());
        assert!(!PanelKind::Volume.is_oscillator());
    }

    #[test]
    fn test_overlay_kind_serde_names() {
        let json = serde_json::to_string(&OverlayKind::Sma200).unwrap();
        assert_eq!(json, "\"sma200\"");
    }
}
