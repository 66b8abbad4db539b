//! Persisted panel arrangement and the stores that keep it.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::common::constant::{OverlayKind, PanelKind};
use crate::common::setting::Settings;
use crate::common::utility::{get_file_path, load_json_file, save_json_file};
use crate::error::{ChartError, Result};
use crate::indicator::IndicatorKey;

/// Current layout schema version
pub const LAYOUT_VERSION: u32 = 1;

/// Default layout file name
pub const LAYOUT_FILENAME: &str = "chart_layout.json";

/// Accepted range of every indicator period
pub const PERIOD_RANGE: std::ops::RangeInclusive<usize> = 1..=500;

fn check_period(name: &str, value: usize) -> Result<()> {
    if PERIOD_RANGE.contains(&value) {
        Ok(())
    } else {
        Err(ChartError::InvalidLayout(format!(
            "{} {} outside {}..={}",
            name,
            value,
            PERIOD_RANGE.start(),
            PERIOD_RANGE.end()
        )))
    }
}

/// Default indicator parameters for new panels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorDefaults {
    pub rsi_period: usize,
    pub macd_fast: usize,
    pub macd_slow: usize,
    pub macd_signal: usize,
    pub stoch_k: usize,
    pub stoch_d: usize,
}

impl IndicatorDefaults {
    /// Every period in range and MACD fast below slow
    pub fn validate(&self) -> Result<()> {
        check_period("rsi_period", self.rsi_period)?;
        check_period("macd_fast", self.macd_fast)?;
        check_period("macd_slow", self.macd_slow)?;
        check_period("macd_signal", self.macd_signal)?;
        check_period("stoch_k", self.stoch_k)?;
        check_period("stoch_d", self.stoch_d)?;
        if self.macd_fast >= self.macd_slow {
            return Err(ChartError::InvalidLayout(format!(
                "macd fast {} not below slow {}",
                self.macd_fast, self.macd_slow
            )));
        }
        Ok(())
    }
}

impl Default for IndicatorDefaults {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            macd_fast: 12,
            macd_slow: 26,
            macd_signal: 9,
            stoch_k: 14,
            stoch_d: 3,
        }
    }
}

/// Kind-specific parameters of a panel. Unset fields use the defaults record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fast: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slow: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k_period: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d_period: Option<usize>,
}

impl PanelParams {
    /// Set fields in range. MACD fast must stay below slow once resolved.
    pub fn validate(&self, kind: PanelKind, defaults: &IndicatorDefaults) -> Result<()> {
        let fields = [
            ("period", self.period),
            ("fast", self.fast),
            ("slow", self.slow),
            ("signal", self.signal),
            ("k_period", self.k_period),
            ("d_period", self.d_period),
        ];
        for (name, value) in fields {
            if let Some(v) = value {
                check_period(name, v)?;
            }
        }

        if kind == PanelKind::Macd {
            let fast = self.fast.unwrap_or(defaults.macd_fast);
            let slow = self.slow.unwrap_or(defaults.macd_slow);
            if fast >= slow {
                return Err(ChartError::InvalidLayout(format!(
                    "macd fast {} not below slow {}",
                    fast, slow
                )));
            }
        }
        Ok(())
    }

    /// Fill every field the kind uses from the defaults. Out-of-range values take the default.
    pub fn resolve(&self, kind: PanelKind, defaults: &IndicatorDefaults) -> Self {
        let defaults = if defaults.validate().is_ok() {
            *defaults
        } else {
            IndicatorDefaults::default()
        };
        let pick =
            |value: Option<usize>, default: usize| Some(value.filter(|v| PERIOD_RANGE.contains(v)).unwrap_or(default));
        match kind {
            PanelKind::Rsi => Self {
                period: pick(self.period, defaults.rsi_period),
                ..Self::default()
            },
            PanelKind::Macd => {
                let fast = pick(self.fast, defaults.macd_fast);
                let slow = pick(self.slow, defaults.macd_slow);
                let (fast, slow) = if fast < slow {
                    (fast, slow)
                } else {
                    (Some(defaults.macd_fast), Some(defaults.macd_slow))
                };
                Self {
                    fast,
                    slow,
                    signal: pick(self.signal, defaults.macd_signal),
                    ..Self::default()
                }
            }
            PanelKind::Stochastic => Self {
                k_period: pick(self.k_period, defaults.stoch_k),
                d_period: pick(self.d_period, defaults.stoch_d),
                ..Self::default()
            },
            PanelKind::Price | PanelKind::Volume => Self::default(),
        }
    }

    /// Indicator drawn by an oscillator panel
    pub fn indicator_key(&self, kind: PanelKind, defaults: &IndicatorDefaults) -> Option<IndicatorKey> {
        let p = self.resolve(kind, defaults);
        match kind {
            PanelKind::Rsi => Some(IndicatorKey::Rsi {
                period: p.period.unwrap_or(defaults.rsi_period),
            }),
            PanelKind::Macd => Some(IndicatorKey::Macd {
                fast: p.fast.unwrap_or(defaults.macd_fast),
                slow: p.slow.unwrap_or(defaults.macd_slow),
                signal: p.signal.unwrap_or(defaults.macd_signal),
            }),
            PanelKind::Stochastic => Some(IndicatorKey::Stochastic {
                k_period: p.k_period.unwrap_or(defaults.stoch_k),
                d_period: p.d_period.unwrap_or(defaults.stoch_d),
            }),
            PanelKind::Price | PanelKind::Volume => None,
        }
    }
}

/// One panel of a stored layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedPanel {
    pub kind: PanelKind,
    pub height_share: f64,
    #[serde(default)]
    pub collapsed: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub overlays: Vec<OverlayKind>,
    #[serde(default)]
    pub params: PanelParams,
}

/// Versioned layout record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedLayout {
    pub version: u32,
    pub panels: Vec<PersistedPanel>,
    #[serde(default)]
    pub indicator_defaults: IndicatorDefaults,
}

impl PersistedLayout {
    /// Price with SMA 20/50, volume and RSI
    pub fn default_layout() -> Self {
        Self {
            version: LAYOUT_VERSION,
            panels: vec![
                PersistedPanel {
                    kind: PanelKind::Price,
                    height_share: 0.7,
                    collapsed: false,
                    overlays: vec![OverlayKind::Sma20, OverlayKind::Sma50],
                    params: PanelParams::default(),
                },
                PersistedPanel {
                    kind: PanelKind::Volume,
                    height_share: 0.15,
                    collapsed: false,
                    overlays: Vec::new(),
                    params: PanelParams::default(),
                },
                PersistedPanel {
                    kind: PanelKind::Rsi,
                    height_share: 0.15,
                    collapsed: false,
                    overlays: Vec::new(),
                    params: PanelParams::default(),
                },
            ],
            indicator_defaults: IndicatorDefaults::default(),
        }
    }

    /// Check the record can be restored
    pub fn validate(&self) -> Result<()> {
        if self.version != LAYOUT_VERSION {
            return Err(ChartError::UnsupportedVersion(self.version));
        }
        if self.panels.is_empty() {
            return Err(ChartError::InvalidLayout("no panels".to_string()));
        }

        let price_count = self.panels.iter().filter(|p| p.kind == PanelKind::Price).count();
        if price_count != 1 {
            return Err(ChartError::InvalidLayout(format!("{} price panels", price_count)));
        }

        if let Some(p) = self
            .panels
            .iter()
            .find(|p| !p.height_share.is_finite() || p.height_share <= 0.0)
        {
            return Err(ChartError::InvalidLayout(format!(
                "invalid share {} for {} panel",
                p.height_share,
                p.kind.display_name()
            )));
        }

        if self.panels.iter().all(|p| p.collapsed) {
            return Err(ChartError::InvalidLayout("every panel is collapsed".to_string()));
        }

        self.indicator_defaults.validate()?;
        for p in &self.panels {
            p.params.validate(p.kind, &self.indicator_defaults)?;
        }

        Ok(())
    }
}

/// Storage of the persisted layout
pub trait LayoutStore {
    /// Stored layout, `None` when nothing was saved yet
    fn load(&self) -> Result<Option<PersistedLayout>>;

    fn save(&mut self, layout: &PersistedLayout) -> Result<()>;
}

/// Stored layout when present and valid, otherwise the default
pub fn load_or_default(store: &dyn LayoutStore) -> PersistedLayout {
    match store.load() {
        Ok(Some(layout)) => match layout.validate() {
            Ok(()) => {
                tracing::info!("restored layout with {} panels", layout.panels.len());
                layout
            }
            Err(e) => {
                tracing::warn!("stored layout rejected, using default: {}", e);
                PersistedLayout::default_layout()
            }
        },
        Ok(None) => PersistedLayout::default_layout(),
        Err(e) => {
            tracing::warn!("failed to read layout, using default: {}", e);
            PersistedLayout::default_layout()
        }
    }
}

/// Layout kept in a JSON file
#[derive(Debug, Clone)]
pub struct JsonLayoutStore {
    path: PathBuf,
}

impl JsonLayoutStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Store in the engine folder, file name from `layout.filename`
    pub fn from_settings(settings: &Settings) -> Self {
        let filename = settings
            .get_string("layout.filename")
            .unwrap_or_else(|| LAYOUT_FILENAME.to_string());
        Self::new(get_file_path(&filename))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LayoutStore for JsonLayoutStore {
    fn load(&self) -> Result<Option<PersistedLayout>> {
        if !self.path.exists() {
            return Ok(None);
        }
        load_json_file(&self.path).map(Some)
    }

    fn save(&mut self, layout: &PersistedLayout) -> Result<()> {
        save_json_file(&self.path, layout)
    }
}

/// Layout kept in memory. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryLayoutStore {
    slot: Rc<RefCell<Option<PersistedLayout>>>,
    saves: Rc<RefCell<usize>>,
}

impl MemoryLayoutStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last saved layout
    pub fn snapshot(&self) -> Option<PersistedLayout> {
        self.slot.borrow().clone()
    }

    /// Number of saves so far
    pub fn save_count(&self) -> usize {
        *self.saves.borrow()
    }
}

impl LayoutStore for MemoryLayoutStore {
    fn load(&self) -> Result<Option<PersistedLayout>> {
        Ok(self.slot.borrow().clone())
    }

    fn save(&mut self, layout: &PersistedLayout) -> Result<()> {
        *self.slot.borrow_mut() = Some(layout.clone());
        *self.saves.borrow_mut() += 1;
        Ok(())
    }
}
