use crate::utilities::data_loader::Candles;
use thiserror::Error;

#[derive(Debug, Clone)]
pub enum SmaData<'a> {
    Candles {
        candles: &'a Candles,
        source: &'a str,
    },
    Slice(&'a [f64]),
}

#[derive(Debug, Clone)]
pub struct SmaOutput {
    pub values: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct SmaParams {
    pub period: Option<usize>,
}

impl Default for SmaParams {
    fn default() -> Self {
        Self { period: Some(10) }
    }
}

#[derive(Debug, Clone)]
pub struct SmaInput<'a> {
    pub data: SmaData<'a>,
    pub params: SmaParams,
}

impl<'a> SmaInput<'a> {
    pub fn from_candles(candles: &'a Candles, source: &'a str, params: SmaParams) -> Self {
        Self {
            data: SmaData::Candles { candles, source },
            params,
        }
    }

    pub fn from_slice(slice: &'a [f64], params: SmaParams) -> Self {
        Self {
            data: SmaData::Slice(slice),
            params,
        }
    }

    pub fn with_default_candles(candles: &'a Candles) -> Self {
        Self::from_candles(candles, "close", SmaParams::default())
    }

    pub fn get_period(&self) -> usize {
        self.params.period.unwrap_or(10)
    }
}

#[derive(Debug, Error)]
pub enum SmaError {
    #[error("sma: Empty data provided.")]
    EmptyData,
    #[error("sma: All values are NaN.")]
    AllValuesNaN,
    #[error("sma: Invalid period: period = {period}, data length = {data_len}")]
    InvalidPeriod { period: usize, data_len: usize },
    #[error("sma: Not enough valid data: needed = {needed}, valid = {valid}")]
    NotEnoughValidData { needed: usize, valid: usize },
    #[error("sma: {0}")]
    InvalidSource(String),
}

/// Rolling arithmetic mean over a trailing window.
///
/// The warmup prefix is `NaN` until a full window of non-`NaN` input is
/// available; the window is counted from the first non-`NaN` value, so the
/// function composes with inputs that themselves carry a warmup prefix.
#[inline]
pub fn sma(input: &SmaInput) -> Result<SmaOutput, SmaError> {
    let data: &[f64] = match &input.data {
        SmaData::Candles { candles, source } => candles
            .select_candle_field(source)
            .map_err(|e| SmaError::InvalidSource(e.to_string()))?,
        SmaData::Slice(slice) => slice,
    };

    if data.is_empty() {
        return Err(SmaError::EmptyData);
    }

    let period = input.get_period();
    if period == 0 || period > data.len() {
        return Err(SmaError::InvalidPeriod {
            period,
            data_len: data.len(),
        });
    }

    let first = data
        .iter()
        .position(|&x| !x.is_nan())
        .ok_or(SmaError::AllValuesNaN)?;

    if (data.len() - first) < period {
        return Err(SmaError::NotEnoughValidData {
            needed: period,
            valid: data.len() - first,
        });
    }

    let mut values = vec![f64::NAN; data.len()];
    let mut sum = 0.0;
    for &value in &data[first..first + period] {
        sum += value;
    }

    let inv_period = 1.0 / period as f64;
    values[first + period - 1] = sum * inv_period;

    for i in (first + period)..data.len() {
        sum += data[i] - data[i - period];
        values[i] = sum * inv_period;
    }

    Ok(SmaOutput { values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utilities::data_loader::read_candles_from_csv;

    const FIXTURE: &str = "src/data/ohlcv_sample_daily.csv";

    #[test]
    fn test_sma_small_reference() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        let input = SmaInput::from_slice(&data, SmaParams { period: Some(3) });
        let output = sma(&input).expect("Failed to calculate SMA");

        assert!(output.values[0].is_nan());
        assert!(output.values[1].is_nan());
        assert_eq!(output.values[2], 2.0);
        assert_eq!(output.values[3], 3.0);
        assert_eq!(output.values[4], 4.0);
    }

    #[test]
    fn test_sma_accuracy() {
        let candles = read_candles_from_csv(FIXTURE).expect("Failed to load test candles");
        let input = SmaInput::from_candles(&candles, "close", SmaParams { period: Some(10) });
        let output = sma(&input).expect("Failed to calculate SMA");

        assert_eq!(output.values.len(), candles.close.len());

        let expected_last_five = [103.256, 103.564, 103.847, 104.443, 104.735];
        let start = output.values.len() - 5;
        for (i, &value) in output.values[start..].iter().enumerate() {
            assert!(
                (value - expected_last_five[i]).abs() < 1e-6,
                "SMA mismatch at last-5 index {}: expected {}, got {}",
                i,
                expected_last_five[i],
                value
            );
        }

        for i in 0..9 {
            assert!(output.values[i].is_nan(), "Expected NaN warmup at index {}", i);
        }
        assert!(!output.values[9].is_nan(), "Expected first SMA value at index 9");
    }

    #[test]
    fn test_sma_nan_prefix_input() {
        // A derived series (e.g. a rolling deviation) starts with a NaN run;
        // the window must be counted from the first valid value.
        let data = [f64::NAN, f64::NAN, 1.0, 2.0, 3.0, 4.0];
        let input = SmaInput::from_slice(&data, SmaParams { period: Some(3) });
        let output = sma(&input).expect("Failed to calculate SMA");

        for i in 0..4 {
            assert!(output.values[i].is_nan(), "Expected NaN at index {}", i);
        }
        assert_eq!(output.values[4], 2.0);
        assert_eq!(output.values[5], 3.0);
    }

    #[test]
    fn test_sma_default_params() {
        let default_params = SmaParams::default();
        assert_eq!(default_params.period, Some(10));

        let candles = read_candles_from_csv(FIXTURE).expect("Failed to load test candles");
        let input = SmaInput::with_default_candles(&candles);
        match input.data {
            SmaData::Candles { source, .. } => assert_eq!(source, "close"),
            _ => panic!("Expected SmaData::Candles variant"),
        }
        let output = sma(&input).expect("Failed SMA with default params");
        assert_eq!(output.values.len(), candles.close.len());
    }

    #[test]
    fn test_sma_with_zero_period() {
        let data = [10.0, 20.0, 30.0];
        let input = SmaInput::from_slice(&data, SmaParams { period: Some(0) });
        let result = sma(&input);
        assert!(result.is_err(), "Expected an error for zero period");
        if let Err(e) = result {
            assert!(
                e.to_string().contains("Invalid period"),
                "Expected 'Invalid period' error message, got: {}",
                e
            );
        }
    }

    #[test]
    fn test_sma_with_period_exceeding_data_length() {
        let data = [10.0, 20.0, 30.0];
        let input = SmaInput::from_slice(&data, SmaParams { period: Some(10) });
        assert!(sma(&input).is_err(), "Expected an error for period > data.len()");
    }

    #[test]
    fn test_sma_empty_data() {
        let data: [f64; 0] = [];
        let input = SmaInput::from_slice(&data, SmaParams { period: Some(3) });
        assert!(matches!(sma(&input), Err(SmaError::EmptyData)));
    }

    #[test]
    fn test_sma_all_nan() {
        let data = [f64::NAN, f64::NAN, f64::NAN];
        let input = SmaInput::from_slice(&data, SmaParams { period: Some(2) });
        assert!(matches!(sma(&input), Err(SmaError::AllValuesNaN)));
    }

    #[test]
    fn test_sma_not_enough_valid_data() {
        let data = [f64::NAN, f64::NAN, 1.0, 2.0];
        let input = SmaInput::from_slice(&data, SmaParams { period: Some(3) });
        assert!(matches!(
            sma(&input),
            Err(SmaError::NotEnoughValidData { needed: 3, valid: 2 })
        ));
    }

    #[test]
    fn test_sma_unknown_source() {
        let candles = read_candles_from_csv(FIXTURE).expect("Failed to load test candles");
        let input = SmaInput::from_candles(&candles, "vwap", SmaParams::default());
        assert!(matches!(sma(&input), Err(SmaError::InvalidSource(_))));
    }
}
