//! Error type of the chart engine.

use thiserror::Error;

use crate::chart::layout::PanelId;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported layout version {0}")]
    UnsupportedVersion(u32),

    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    #[error("instrument not found: {0}")]
    InstrumentNotFound(String),

    #[error("invalid series: {0}")]
    InvalidSeries(String),

    #[error("the price panel cannot be removed")]
    SolePricePanel,

    #[error("a price panel already exists")]
    DuplicatePricePanel,

    #[error("the last expanded panel cannot be collapsed")]
    LastExpandedPanel,

    #[error("unknown panel {0}")]
    UnknownPanel(PanelId),
}

pub type Result<T> = std::result::Result<T, ChartError>;
