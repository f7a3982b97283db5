//! # Dynamic Momentum Index (DMI)
//!
//! Adaptive-length momentum oscillator. The RSI lookback at each bar is
//! scaled by the ratio of current volatility to average volatility, so the
//! oscillator shortens in fast markets and lengthens in quiet ones. The
//! output carries two constant reference bands for overbought/oversold
//! interpretation.
//!
//! Pipeline per bar: rolling standard deviation of closes (`std_period`),
//! a 10-bar simple moving average of that deviation, their ratio as the
//! volatility index, a trigger length `trunc(rsi_period / vi)` clamped to
//! `[5, 30]`, and an RSI of that trigger length over the trailing
//! sub-window. Undefined ratios and directionless oscillator windows are
//! substituted with `0.0` in one explicit zero-fill step.
//!
//! ## Parameters
//! - **rsi_period**: Base RSI length before adaptation (default: 14).
//! - **std_period**: Standard deviation window (default: 10).
//! - **upper**: Upper band level (default: 70.0).
//! - **lower**: Lower band level (default: 30.0).
//!
//! ## Errors
//! - **EmptyData**: dmi: Input data slice is empty.
//! - **AllValuesNaN**: dmi: All input values are `NaN`.
//! - **InvalidPeriod**: dmi: `rsi_period` or `std_period` is zero.
//! - **InvalidSource**: dmi: Unknown candle source column.
//! - **UnderlyingFunctionFailed**: dmi: A statistics primitive failed unexpectedly.
//! - **InvalidRange**: dmi batch: Invalid sweep configuration.
//!
//! ## Returns
//! - **`Ok(DmiOutput)`** on success: `dmi`, `upper_band`, and `lower_band`
//!   vectors, each of length matching the input.
//! - **`Err(DmiError)`** otherwise.

use crate::indicators::moving_averages::sma::{sma, SmaError, SmaInput, SmaParams};
use crate::indicators::rsi::{rsi, RsiInput, RsiParams};
use crate::indicators::stddev::{stddev, StdDevError, StdDevInput, StdDevParams};
use crate::utilities::data_loader::{Candles, DataError};
use rayon::prelude::*;
use thiserror::Error;

/// Smoothing window applied to the deviation series; fixed, independent of
/// `std_period`.
const SMOOTHING_PERIOD: usize = 10;

/// Trigger-length clamp. `td == 0` (the undefined-volatility sentinel) lands
/// on the floor, so early bars fall back to a 5-bar oscillator window.
const MIN_TRIGGER: usize = 5;
const MAX_TRIGGER: usize = 30;

#[derive(Debug, Clone)]
pub enum DmiData<'a> {
    Candles {
        candles: &'a Candles,
        source: &'a str,
    },
    Slice(&'a [f64]),
}

#[derive(Debug, Clone)]
pub struct DmiOutput {
    pub dmi: Vec<f64>,
    pub upper_band: Vec<f64>,
    pub lower_band: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct DmiParams {
    pub rsi_period: Option<usize>,
    pub std_period: Option<usize>,
    pub upper: Option<f64>,
    pub lower: Option<f64>,
}

impl Default for DmiParams {
    fn default() -> Self {
        Self {
            rsi_period: Some(14),
            std_period: Some(10),
            upper: Some(70.0),
            lower: Some(30.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DmiInput<'a> {
    pub data: DmiData<'a>,
    pub params: DmiParams,
}

impl<'a> DmiInput<'a> {
    #[inline]
    pub fn from_candles(candles: &'a Candles, source: &'a str, params: DmiParams) -> Self {
        Self {
            data: DmiData::Candles { candles, source },
            params,
        }
    }

    #[inline]
    pub fn from_slice(slice: &'a [f64], params: DmiParams) -> Self {
        Self {
            data: DmiData::Slice(slice),
            params,
        }
    }

    #[inline]
    pub fn with_default_candles(candles: &'a Candles) -> Self {
        Self::from_candles(candles, "close", DmiParams::default())
    }

    #[inline]
    pub fn get_rsi_period(&self) -> usize {
        self.params.rsi_period.unwrap_or(14)
    }

    #[inline]
    pub fn get_std_period(&self) -> usize {
        self.params.std_period.unwrap_or(10)
    }

    #[inline]
    pub fn get_upper(&self) -> f64 {
        self.params.upper.unwrap_or(70.0)
    }

    #[inline]
    pub fn get_lower(&self) -> f64 {
        self.params.lower.unwrap_or(30.0)
    }
}

#[derive(Copy, Clone, Debug)]
pub struct DmiBuilder {
    rsi_period: Option<usize>,
    std_period: Option<usize>,
    upper: Option<f64>,
    lower: Option<f64>,
}

impl Default for DmiBuilder {
    fn default() -> Self {
        Self {
            rsi_period: None,
            std_period: None,
            upper: None,
            lower: None,
        }
    }
}

impl DmiBuilder {
    #[inline(always)]
    pub fn new() -> Self {
        Self::default()
    }
    #[inline(always)]
    pub fn rsi_period(mut self, n: usize) -> Self {
        self.rsi_period = Some(n);
        self
    }
    #[inline(always)]
    pub fn std_period(mut self, n: usize) -> Self {
        self.std_period = Some(n);
        self
    }
    #[inline(always)]
    pub fn upper(mut self, level: f64) -> Self {
        self.upper = Some(level);
        self
    }
    #[inline(always)]
    pub fn lower(mut self, level: f64) -> Self {
        self.lower = Some(level);
        self
    }
    #[inline(always)]
    fn params(self) -> DmiParams {
        DmiParams {
            rsi_period: self.rsi_period,
            std_period: self.std_period,
            upper: self.upper,
            lower: self.lower,
        }
    }
    #[inline(always)]
    pub fn apply(self, candles: &Candles) -> Result<DmiOutput, DmiError> {
        dmi(&DmiInput::from_candles(candles, "close", self.params()))
    }
    #[inline(always)]
    pub fn apply_slice(self, data: &[f64]) -> Result<DmiOutput, DmiError> {
        dmi(&DmiInput::from_slice(data, self.params()))
    }
}

#[derive(Debug, Error)]
pub enum DmiError {
    #[error("dmi: Empty data provided.")]
    EmptyData,
    #[error("dmi: All values are NaN.")]
    AllValuesNaN,
    #[error("dmi: Invalid period: rsi_period = {rsi_period}, std_period = {std_period}")]
    InvalidPeriod {
        rsi_period: usize,
        std_period: usize,
    },
    #[error("dmi: Invalid source column: {0}")]
    InvalidSource(#[from] DataError),
    #[error("dmi: Underlying function failed: {0}")]
    UnderlyingFunctionFailed(String),
    #[error("dmi: Invalid batch range for {axis}: ({start}, {end}, {step})")]
    InvalidRange {
        axis: &'static str,
        start: usize,
        end: usize,
        step: usize,
    },
}

#[inline]
pub fn dmi(input: &DmiInput) -> Result<DmiOutput, DmiError> {
    let data: &[f64] = match &input.data {
        DmiData::Candles { candles, source } => candles.select_candle_field(source)?,
        DmiData::Slice(slice) => slice,
    };

    if data.is_empty() {
        return Err(DmiError::EmptyData);
    }

    let rsi_period = input.get_rsi_period();
    let std_period = input.get_std_period();
    if rsi_period == 0 || std_period == 0 {
        return Err(DmiError::InvalidPeriod {
            rsi_period,
            std_period,
        });
    }

    if data.iter().all(|x| x.is_nan()) {
        return Err(DmiError::AllValuesNaN);
    }

    dmi_from_closes(
        data,
        rsi_period,
        std_period,
        input.get_upper(),
        input.get_lower(),
    )
}

// Core pass over a validated close series. Insufficient history at any stage
// degrades to the zero sentinel rather than failing; the output length always
// equals the input length.
fn dmi_from_closes(
    closes: &[f64],
    rsi_period: usize,
    std_period: usize,
    upper: f64,
    lower: f64,
) -> Result<DmiOutput, DmiError> {
    let n = closes.len();

    let sdev = deviation_series(closes, std_period, n)?;
    let stda = smoothed_deviation_series(&sdev, n)?;
    let vi = volatility_index(&sdev, &stda);
    let td = trigger_lengths(&vi, rsi_period);

    let mut dm = vec![0.0; n];
    for i in 0..n {
        let period = td[i];
        if i > period {
            dm[i] = zero_fill(momentum_at(closes, i, period));
        }
    }

    Ok(DmiOutput {
        dmi: dm,
        upper_band: vec![upper; n],
        lower_band: vec![lower; n],
    })
}

// Rolling standard deviation of the closes. A series shorter than the window
// has no defined value anywhere: that is warmup, not an error.
fn deviation_series(closes: &[f64], std_period: usize, n: usize) -> Result<Vec<f64>, DmiError> {
    let input = StdDevInput::from_slice(
        closes,
        StdDevParams {
            period: Some(std_period),
        },
    );
    match stddev(&input) {
        Ok(output) => Ok(output.values),
        Err(StdDevError::InvalidPeriod { .. }) | Err(StdDevError::NotEnoughValidData { .. }) => {
            Ok(vec![f64::NAN; n])
        }
        Err(e) => Err(DmiError::UnderlyingFunctionFailed(e.to_string())),
    }
}

// 10-bar SMA of the deviation series; the deviation warmup prefix shifts the
// SMA warmup accordingly. An entirely-NaN deviation series smooths to NaN.
fn smoothed_deviation_series(sdev: &[f64], n: usize) -> Result<Vec<f64>, DmiError> {
    let input = SmaInput::from_slice(
        sdev,
        SmaParams {
            period: Some(SMOOTHING_PERIOD),
        },
    );
    match sma(&input) {
        Ok(output) => Ok(output.values),
        Err(SmaError::AllValuesNaN)
        | Err(SmaError::InvalidPeriod { .. })
        | Err(SmaError::NotEnoughValidData { .. }) => Ok(vec![f64::NAN; n]),
        Err(e) => Err(DmiError::UnderlyingFunctionFailed(e.to_string())),
    }
}

/// Explicit zero substitution: undefined and non-finite values become the
/// `0.0` sentinel.
#[inline]
fn zero_fill(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

// vi = sdev / stda where both operands are defined and non-zero, else 0.
fn volatility_index(sdev: &[f64], stda: &[f64]) -> Vec<f64> {
    sdev.iter()
        .zip(stda.iter())
        .map(|(&s, &a)| {
            if s.is_nan() || a.is_nan() || s == 0.0 || a == 0.0 {
                0.0
            } else {
                zero_fill(s / a)
            }
        })
        .collect()
}

// td = trunc(rsi_period / vi), clamped to [MIN_TRIGGER, MAX_TRIGGER]. The
// vi == 0 sentinel maps to td = 0, which the clamp sends to the floor.
fn trigger_lengths(vi: &[f64], rsi_period: usize) -> Vec<usize> {
    vi.iter()
        .map(|&v| {
            let raw = if v != 0.0 {
                (rsi_period as f64 / v) as usize
            } else {
                0
            };
            if raw <= MIN_TRIGGER {
                MIN_TRIGGER
            } else if raw >= MAX_TRIGGER {
                MAX_TRIGGER
            } else {
                raw
            }
        })
        .collect()
}

// RSI of length `period` over the trailing sub-window ending at bar i - 1.
// The window holds period + 1 closes, so the oscillator is defined exactly at
// its last element. Windows the oscillator cannot price (flat, or NaN-laden)
// come back NaN and are zero-filled by the caller.
fn momentum_at(closes: &[f64], i: usize, period: usize) -> f64 {
    let window = &closes[i - period - 1..i];
    let input = RsiInput::from_slice(
        window,
        RsiParams {
            period: Some(period),
        },
    );
    match rsi(&input) {
        Ok(output) => output.values.last().copied().unwrap_or(f64::NAN),
        Err(_) => f64::NAN,
    }
}

// --- Batch grid/range support ---

#[derive(Clone, Debug)]
pub struct DmiBatchRange {
    pub rsi_period: (usize, usize, usize),
    pub std_period: (usize, usize, usize),
}

impl Default for DmiBatchRange {
    fn default() -> Self {
        Self {
            rsi_period: (14, 14, 0),
            std_period: (10, 10, 0),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DmiBatchBuilder {
    range: DmiBatchRange,
    upper: f64,
    lower: f64,
}

impl Default for DmiBatchBuilder {
    fn default() -> Self {
        Self {
            range: DmiBatchRange::default(),
            upper: 70.0,
            lower: 30.0,
        }
    }
}

impl DmiBatchBuilder {
    pub fn new() -> Self {
        Self::default()
    }
    #[inline]
    pub fn rsi_period_range(mut self, start: usize, end: usize, step: usize) -> Self {
        self.range.rsi_period = (start, end, step);
        self
    }
    #[inline]
    pub fn rsi_period_static(mut self, p: usize) -> Self {
        self.range.rsi_period = (p, p, 0);
        self
    }
    #[inline]
    pub fn std_period_range(mut self, start: usize, end: usize, step: usize) -> Self {
        self.range.std_period = (start, end, step);
        self
    }
    #[inline]
    pub fn std_period_static(mut self, p: usize) -> Self {
        self.range.std_period = (p, p, 0);
        self
    }
    #[inline]
    pub fn upper(mut self, level: f64) -> Self {
        self.upper = level;
        self
    }
    #[inline]
    pub fn lower(mut self, level: f64) -> Self {
        self.lower = level;
        self
    }
    pub fn apply_slice(self, data: &[f64]) -> Result<DmiBatchOutput, DmiError> {
        dmi_batch(data, &self.range, self.upper, self.lower)
    }
    pub fn apply_candles(self, candles: &Candles, source: &str) -> Result<DmiBatchOutput, DmiError> {
        let slice = candles.select_candle_field(source)?;
        dmi_batch(slice, &self.range, self.upper, self.lower)
    }
    pub fn with_default_candles(candles: &Candles) -> Result<DmiBatchOutput, DmiError> {
        DmiBatchBuilder::new().apply_candles(candles, "close")
    }
}

/// One oscillator row per parameter combination; the band levels are shared
/// constants, not per-row series.
#[derive(Clone, Debug)]
pub struct DmiBatchOutput {
    pub values: Vec<f64>,
    pub combos: Vec<DmiParams>,
    pub rows: usize,
    pub cols: usize,
    pub upper: f64,
    pub lower: f64,
}

impl DmiBatchOutput {
    pub fn row_for_params(&self, params: &DmiParams) -> Option<usize> {
        self.combos.iter().position(|c| {
            c.rsi_period.unwrap_or(14) == params.rsi_period.unwrap_or(14)
                && c.std_period.unwrap_or(10) == params.std_period.unwrap_or(10)
        })
    }
    pub fn values_for(&self, params: &DmiParams) -> Option<&[f64]> {
        self.row_for_params(params).map(|row| {
            let start = row * self.cols;
            &self.values[start..start + self.cols]
        })
    }
}

#[inline(always)]
fn axis_usize((start, end, step): (usize, usize, usize)) -> Vec<usize> {
    if step == 0 || start == end {
        return vec![start];
    }
    (start..=end).step_by(step).collect()
}

fn expand_grid(range: &DmiBatchRange) -> Vec<DmiParams> {
    let rsi_periods = axis_usize(range.rsi_period);
    let std_periods = axis_usize(range.std_period);
    let mut combos = Vec::with_capacity(rsi_periods.len() * std_periods.len());
    for &rp in &rsi_periods {
        for &sp in &std_periods {
            combos.push(DmiParams {
                rsi_period: Some(rp),
                std_period: Some(sp),
                upper: None,
                lower: None,
            });
        }
    }
    combos
}

pub fn dmi_batch(
    data: &[f64],
    range: &DmiBatchRange,
    upper: f64,
    lower: f64,
) -> Result<DmiBatchOutput, DmiError> {
    if data.is_empty() {
        return Err(DmiError::EmptyData);
    }
    if data.iter().all(|x| x.is_nan()) {
        return Err(DmiError::AllValuesNaN);
    }
    for (axis, (start, end, step)) in [
        ("rsi_period", range.rsi_period),
        ("std_period", range.std_period),
    ] {
        if start == 0 || axis_usize((start, end, step)).is_empty() {
            return Err(DmiError::InvalidRange {
                axis,
                start,
                end,
                step,
            });
        }
    }

    let combos = expand_grid(range);
    let rows = combos.len();
    let cols = data.len();
    let mut values = vec![0.0; rows * cols];

    values
        .par_chunks_mut(cols)
        .enumerate()
        .try_for_each(|(row, out_row)| -> Result<(), DmiError> {
            let combo = &combos[row];
            let output = dmi_from_closes(
                data,
                combo.rsi_period.unwrap_or(14),
                combo.std_period.unwrap_or(10),
                upper,
                lower,
            )?;
            out_row.copy_from_slice(&output.dmi);
            Ok(())
        })?;

    Ok(DmiBatchOutput {
        values,
        combos,
        rows,
        cols,
        upper,
        lower,
    })
}

// ---- Tests ----
