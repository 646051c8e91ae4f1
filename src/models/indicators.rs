//! Moving averages and trend classification.
//!
//! Every metric here is either a well-defined number or explicitly missing:
//! a moving average is `None` until the series has a full window, and the
//! trend is `Unknown` whenever either of its gating averages is missing.
//! Nothing in this module panics or divides by zero.

use std::fmt;

use crate::constants::{MA_LONG, MA_MEDIUM, MA_SHORT};
use crate::models::PriceSeries;

/// Simple (unweighted) mean of the trailing `window` values.
///
/// Returns `None` when fewer than `window` values exist; a short window is
/// never silently averaged.
pub fn trailing_mean(values: &[f64], window: usize) -> Option<f64> {
    if window == 0 || values.len() < window {
        return None;
    }
    let tail = &values[values.len() - window..];
    Some(tail.iter().sum::<f64>() / window as f64)
}

/// Coarse directional state of the latest observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendState {
    Rising,
    Falling,
    Neutral,
    Unknown,
}

impl fmt::Display for TrendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TrendState::Rising => "rising",
            TrendState::Falling => "falling",
            TrendState::Neutral => "neutral",
            TrendState::Unknown => "unknown",
        };
        write!(f, "{}", label)
    }
}

/// Classify the latest close against its short and medium moving averages.
///
/// `Unknown` iff either average is missing. Ties count as `Neutral`, as do
/// mixed-direction cases (above one average, below the other).
pub fn classify_trend(close: f64, ma_short: Option<f64>, ma_medium: Option<f64>) -> TrendState {
    match (ma_short, ma_medium) {
        (Some(short), Some(medium)) => {
            if close < short && close < medium {
                TrendState::Falling
            } else if close > short && close > medium {
                TrendState::Rising
            } else {
                TrendState::Neutral
            }
        }
        _ => TrendState::Unknown,
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MovingAverageSet {
    pub ma5: Option<f64>,
    pub ma20: Option<f64>,
    pub ma50: Option<f64>,
}

/// Derived analytics for the latest observation of a series.
#[derive(Debug, Clone)]
pub struct TrendSnapshot {
    pub close: Option<f64>,
    pub change: Option<f64>,
    pub percent_change: Option<f64>,
    pub averages: MovingAverageSet,
    pub trend: TrendState,
}

/// Compute moving averages, point metrics, and trend state for the most
/// recent observation. An empty series yields an all-missing snapshot with
/// `Unknown` trend.
pub fn analyze(series: &PriceSeries) -> TrendSnapshot {
    let closes = series.closes();
    let averages = MovingAverageSet {
        ma5: trailing_mean(&closes, MA_SHORT),
        ma20: trailing_mean(&closes, MA_MEDIUM),
        ma50: trailing_mean(&closes, MA_LONG),
    };

    let latest = series.latest();
    let close = latest.map(|p| p.close);
    let change = latest.and_then(|p| p.open.map(|open| p.close - open));
    let percent_change = latest.and_then(|p| match p.open {
        Some(open) if open != 0.0 => Some((p.close - open) / open * 100.0),
        _ => None,
    });

    let trend = match close {
        Some(close) => classify_trend(close, averages.ma5, averages.ma20),
        None => TrendState::Unknown,
    };

    TrendSnapshot {
        close,
        change,
        percent_change,
        averages,
        trend,
    }
}
