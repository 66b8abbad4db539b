//! Global setting of the chart engine.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;

use std::sync::{LazyLock, RwLock};

use super::utility::get_file_path;
use crate::error::Result;

/// Default settings
fn default_settings() -> HashMap<String, SettingValue> {
    let mut settings = HashMap::new();

    // Viewport settings
    settings.insert("viewport.min_candle_width".to_string(), SettingValue::Float(2.0));
    settings.insert("viewport.max_candle_width".to_string(), SettingValue::Float(60.0));
    settings.insert("viewport.default_candle_width".to_string(), SettingValue::Float(8.0));
    settings.insert("viewport.zoom_alpha".to_string(), SettingValue::Float(0.25));
    settings.insert("viewport.zoom_epsilon".to_string(), SettingValue::Float(0.05));
    settings.insert("viewport.zoom_step".to_string(), SettingValue::Float(1.1));

    // Crosshair settings
    settings.insert("crosshair.alpha_min".to_string(), SettingValue::Float(0.35));
    settings.insert("crosshair.alpha_max".to_string(), SettingValue::Float(0.85));
    settings.insert("crosshair.jump_distance".to_string(), SettingValue::Float(120.0));
    settings.insert("crosshair.epsilon".to_string(), SettingValue::Float(0.5));

    // Layout settings
    settings.insert("layout.min_share_ratio".to_string(), SettingValue::Float(0.08));
    settings.insert("layout.collapsed_row_height".to_string(), SettingValue::Float(22.0));
    settings.insert("layout.default_share".to_string(), SettingValue::Float(0.2));
    settings.insert("layout.filename".to_string(), SettingValue::String("chart_layout.json".to_string()));

    // Cache settings
    settings.insert("cache.max_instruments".to_string(), SettingValue::Int(16));

    // Log settings
    settings.insert("log.active".to_string(), SettingValue::Bool(true));
    settings.insert("log.level".to_string(), SettingValue::Int(20)); // INFO level
    settings.insert("log.console".to_string(), SettingValue::Bool(true));
    settings.insert("log.file".to_string(), SettingValue::Bool(false));

    settings
}

/// Setting value types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl SettingValue {
    /// Get as string
    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get as i64
    pub fn as_int(&self) -> Option<i64> {
        match self {
            SettingValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64
    pub fn as_float(&self) -> Option<f64> {
        match self {
            SettingValue::Float(f) => Some(*f),
            SettingValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as bool
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

/// Global settings container
pub struct Settings {
    settings: RwLock<HashMap<String, SettingValue>>,
}

impl Settings {
    /// Create new Settings with defaults, overridden by the setting file
    pub fn new() -> Self {
        let mut settings = default_settings();

        if let Some(file_settings) = load_settings_from_file() {
            settings.extend(file_settings);
        }

        Self {
            settings: RwLock::new(settings),
        }
    }

    /// Create Settings holding only the built-in defaults
    pub fn with_defaults() -> Self {
        Self {
            settings: RwLock::new(default_settings()),
        }
    }

    /// Get a setting value
    pub fn get(&self, key: &str) -> Option<SettingValue> {
        self.settings.read().ok()?.get(key).cloned()
    }

    /// Get a string setting
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key).and_then(|v| v.as_str().map(|s| s.to_string()))
    }

    /// Get an integer setting
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|v| v.as_int())
    }

    /// Get a float setting
    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|v| v.as_float())
    }

    /// Get a bool setting
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    /// Set a setting value
    pub fn set(&self, key: impl Into<String>, value: SettingValue) {
        if let Ok(mut settings) = self.settings.write() {
            settings.insert(key.into(), value);
        }
    }

    /// Update settings from a map
    pub fn update(&self, new_settings: HashMap<String, SettingValue>) {
        if let Ok(mut settings) = self.settings.write() {
            settings.extend(new_settings);
        }
    }

    /// Get all settings as HashMap
    pub fn get_all(&self) -> HashMap<String, SettingValue> {
        self.settings
            .read()
            .map(|settings| settings.clone())
            .unwrap_or_default()
    }

    /// Save settings to file
    pub fn save(&self) -> Result<()> {
        let filepath = get_file_path(SETTING_FILENAME);
        let json = serde_json::to_string_pretty(&self.get_all())?;
        fs::write(filepath, json)?;
        Ok(())
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::new()
    }
}

/// Setting filename
const SETTING_FILENAME: &str = "chart_setting.json";

/// Load settings from JSON file
fn load_settings_from_file() -> Option<HashMap<String, SettingValue>> {
    let filepath = get_file_path(SETTING_FILENAME);
    if filepath.exists() {
        let content = fs::read_to_string(filepath).ok()?;
        serde_json::from_str(&content).ok()
    } else {
        None
    }
}

/// Global settings instance
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::new);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setting_value_types() {
        let s = SettingValue::String("test".to_string());
        assert_eq!(s.as_str(), Some("test"));

        let i = SettingValue::Int(42);
        assert_eq!(i.as_int(), Some(42));
        assert_eq!(i.as_float(), Some(42.0));

        let b = SettingValue::Bool(true);
        assert_eq!(b.as_bool(), Some(true));
        assert_eq!(b.as_float(), None);
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::with_defaults();
        assert_eq!(settings.get_float("layout.min_share_ratio"), Some(0.08));
        assert_eq!(settings.get_int("cache.max_instruments"), Some(16));
        assert!(settings.get_bool("log.console").unwrap_or(false));
    }

    #[test]
    fn test_update_overrides() {
        let settings = Settings::with_defaults();
        let mut update = HashMap::new();
        update.insert("viewport.zoom_alpha".to_string(), SettingValue::Float(0.5));
        settings.update(update);
        settings.set("cache.max_instruments", SettingValue::Int(4));

        assert_eq!(settings.get_float("viewport.zoom_alpha"), Some(0.5));
        assert_eq!(settings.get_int("cache.max_instruments"), Some(4));
    }

    #[test]
    fn test_setting_file_json_shape() {
        let parsed: HashMap<String, SettingValue> =
            serde_json::from_str(r#"{"layout.default_share": 0.3, "log.file": true}"#).unwrap();
        assert_eq!(parsed["layout.default_share"], SettingValue::Float(0.3));
        assert_eq!(parsed["log.file"], SettingValue::Bool(true));
    }
}
