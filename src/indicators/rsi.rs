//! # Relative Strength Index (RSI)
//!
//! Momentum oscillator in `[0, 100]`: a normalized ratio of Wilder-smoothed
//! average gains to average losses. The seed averages are arithmetic means
//! over the first `period` deltas; later bars use the Wilder recurrence.
//!
//! A window whose average gain and average loss are both zero has no
//! direction: the oscillator is `NaN` there (0/0), and callers that need a
//! defined sentinel substitute their own.
//!
//! ## Parameters
//! - **period**: Window size (number of bars, default: 14).
//!
//! ## Errors
//! - **EmptyData**: rsi: Input data slice is empty.
//! - **AllValuesNaN**: rsi: All input values are `NaN`.
//! - **InvalidPeriod**: rsi: `period` is zero or exceeds the data length.
//! - **NotEnoughValidData**: rsi: Not enough valid data points for the requested `period`.
//!
//! ## Returns
//! - **`Ok(RsiOutput)`** on success, containing a `Vec<f64>` of length matching the input.
//! - **`Err(RsiError)`** otherwise.

use crate::utilities::data_loader::Candles;
use thiserror::Error;

#[derive(Debug, Clone)]
pub enum RsiData<'a> {
    Candles {
        candles: &'a Candles,
        source: &'a str,
    },
    Slice(&'a [f64]),
}

#[derive(Debug, Clone)]
pub struct RsiOutput {
    pub values: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct RsiParams {
    pub period: Option<usize>,
}

impl Default for RsiParams {
    fn default() -> Self {
        Self { period: Some(14) }
    }
}

#[derive(Debug, Clone)]
pub struct RsiInput<'a> {
    pub data: RsiData<'a>,
    pub params: RsiParams,
}

impl<'a> RsiInput<'a> {
    #[inline]
    pub fn from_candles(candles: &'a Candles, source: &'a str, params: RsiParams) -> Self {
        Self {
            data: RsiData::Candles { candles, source },
            params,
        }
    }

    #[inline]
    pub fn from_slice(slice: &'a [f64], params: RsiParams) -> Self {
        Self {
            data: RsiData::Slice(slice),
            params,
        }
    }

    #[inline]
    pub fn with_default_candles(candles: &'a Candles) -> Self {
        Self::from_candles(candles, "close", RsiParams::default())
    }

    #[inline]
    pub fn get_period(&self) -> usize {
        self.params.period.unwrap_or(14)
    }
}

#[derive(Debug, Error)]
pub enum RsiError {
    #[error("rsi: Empty data provided.")]
    EmptyData,
    #[error("rsi: All values are NaN.")]
    AllValuesNaN,
    #[error("rsi: Invalid period: period = {period}, data length = {data_len}")]
    InvalidPeriod { period: usize, data_len: usize },
    #[error("rsi: Not enough valid data: needed = {needed}, valid = {valid}")]
    NotEnoughValidData { needed: usize, valid: usize },
    #[error("rsi: {0}")]
    InvalidSource(String),
}

#[inline]
pub fn rsi(input: &RsiInput) -> Result<RsiOutput, RsiError> {
    let data: &[f64] = match &input.data {
        RsiData::Candles { candles, source } => candles
            .select_candle_field(source)
            .map_err(|e| RsiError::InvalidSource(e.to_string()))?,
        RsiData::Slice(slice) => slice,
    };

    if data.is_empty() {
        return Err(RsiError::EmptyData);
    }

    let period = input.get_period();
    if period == 0 || period > data.len() {
        return Err(RsiError::InvalidPeriod {
            period,
            data_len: data.len(),
        });
    }

    let first = data
        .iter()
        .position(|&x| !x.is_nan())
        .ok_or(RsiError::AllValuesNaN)?;

    if (data.len() - first) < period + 1 {
        return Err(RsiError::NotEnoughValidData {
            needed: period + 1,
            valid: data.len() - first,
        });
    }

    let mut values = vec![f64::NAN; data.len()];
    rsi_scalar(data, period, first, &mut values);
    Ok(RsiOutput { values })
}

// avg = delta / period + (1 - 1/period) * avg, seeded with the arithmetic
// mean of the first `period` deltas. A zero gain+loss denominator yields
// NaN (0/0).
pub(crate) fn rsi_scalar(data: &[f64], period: usize, first: usize, out: &mut [f64]) {
    let inv_period = 1.0 / period as f64;
    let beta = 1.0 - inv_period;

    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for i in (first + 1)..=(first + period) {
        let delta = data[i] - data[i - 1];
        if delta > 0.0 {
            avg_gain += delta;
        } else {
            avg_loss += -delta;
        }
    }
    avg_gain *= inv_period;
    avg_loss *= inv_period;

    out[first + period] = 100.0 * avg_gain / (avg_gain + avg_loss);

    for i in (first + period + 1)..data.len() {
        let delta = data[i] - data[i - 1];
        let gain = if delta > 0.0 { delta } else { 0.0 };
        let loss = if delta < 0.0 { -delta } else { 0.0 };
        avg_gain = inv_period * gain + beta * avg_gain;
        avg_loss = inv_period * loss + beta * avg_loss;
        out[i] = 100.0 * avg_gain / (avg_gain + avg_loss);
    }
}
