//! # Rolling Standard Deviation (STDDEV)
//!
//! Standard deviation of a trailing window, emitted per bar. Uses
//! **population variance** (dividing by n): the window is treated as the
//! entire population of interest, which is the convention for technical
//! indicators.
//!
//! ## Parameters
//! - **period**: Window size (number of bars, default: 10).
//!
//! ## Errors
//! - **EmptyData**: stddev: Input data slice is empty.
//! - **AllValuesNaN**: stddev: All input values are `NaN`.
//! - **InvalidPeriod**: stddev: `period` is zero or exceeds the data length.
//! - **NotEnoughValidData**: stddev: Not enough valid data points for the requested `period`.
//!
//! ## Returns
//! - **`Ok(StdDevOutput)`** on success, containing a `Vec<f64>` of length matching the input.
//! - **`Err(StdDevError)`** otherwise.

use crate::utilities::data_loader::Candles;
use thiserror::Error;

#[derive(Debug, Clone)]
pub enum StdDevData<'a> {
    Candles {
        candles: &'a Candles,
        source: &'a str,
    },
    Slice(&'a [f64]),
}

#[derive(Debug, Clone)]
pub struct StdDevOutput {
    pub values: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct StdDevParams {
    pub period: Option<usize>,
}

impl Default for StdDevParams {
    fn default() -> Self {
        Self { period: Some(10) }
    }
}

#[derive(Debug, Clone)]
pub struct StdDevInput<'a> {
    pub data: StdDevData<'a>,
    pub params: StdDevParams,
}

impl<'a> StdDevInput<'a> {
    pub fn from_candles(candles: &'a Candles, source: &'a str, params: StdDevParams) -> Self {
        Self {
            data: StdDevData::Candles { candles, source },
            params,
        }
    }

    pub fn from_slice(slice: &'a [f64], params: StdDevParams) -> Self {
        Self {
            data: StdDevData::Slice(slice),
            params,
        }
    }

    pub fn with_default_candles(candles: &'a Candles) -> Self {
        Self::from_candles(candles, "close", StdDevParams::default())
    }

    pub fn get_period(&self) -> usize {
        self.params.period.unwrap_or(10)
    }
}

#[derive(Debug, Error)]
pub enum StdDevError {
    #[error("stddev: Empty data provided.")]
    EmptyData,
    #[error("stddev: All values are NaN.")]
    AllValuesNaN,
    #[error("stddev: Invalid period: period = {period}, data length = {data_len}")]
    InvalidPeriod { period: usize, data_len: usize },
    #[error("stddev: Not enough valid data: needed = {needed}, valid = {valid}")]
    NotEnoughValidData { needed: usize, valid: usize },
    #[error("stddev: {0}")]
    InvalidSource(String),
}

#[inline]
pub fn stddev(input: &StdDevInput) -> Result<StdDevOutput, StdDevError> {
    let data: &[f64] = match &input.data {
        StdDevData::Candles { candles, source } => candles
            .select_candle_field(source)
            .map_err(|e| StdDevError::InvalidSource(e.to_string()))?,
        StdDevData::Slice(slice) => slice,
    };

    if data.is_empty() {
        return Err(StdDevError::EmptyData);
    }

    let period = input.get_period();
    if period == 0 || period > data.len() {
        return Err(StdDevError::InvalidPeriod {
            period,
            data_len: data.len(),
        });
    }

    let first = data
        .iter()
        .position(|&x| !x.is_nan())
        .ok_or(StdDevError::AllValuesNaN)?;

    if (data.len() - first) < period {
        return Err(StdDevError::NotEnoughValidData {
            needed: period,
            valid: data.len() - first,
        });
    }

    let mut values = vec![f64::NAN; data.len()];
    stddev_scalar(data, period, first, &mut values);
    Ok(StdDevOutput { values })
}

// Rolling O(1) update of sum and sum of squares:
//   mean = sum / n; var = sum_sqr / n - mean * mean
// Rounding can push var slightly negative on near-constant windows; it is
// clamped to zero before the square root.
pub(crate) fn stddev_scalar(data: &[f64], period: usize, first: usize, out: &mut [f64]) {
    let den = period as f64;

    let mut sum = 0.0;
    let mut sum_sqr = 0.0;
    for &val in &data[first..first + period] {
        sum += val;
        sum_sqr += val * val;
    }

    let mut mean = sum / den;
    let mut var = (sum_sqr / den) - (mean * mean);
    out[first + period - 1] = if var <= 0.0 { 0.0 } else { var.sqrt() };

    for i in (first + period)..data.len() {
        let old = data[i - period];
        let new = data[i];
        sum += new - old;
        sum_sqr += new * new - old * old;
        mean = sum / den;
        var = (sum_sqr / den) - (mean * mean);
        out[i] = if var <= 0.0 { 0.0 } else { var.sqrt() };
    }
}
