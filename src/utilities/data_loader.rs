use csv::ReaderBuilder;
use std::fs::File;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataError {
    #[error("data_loader: Unknown candle field: {0}")]
    UnknownField(String),
    #[error("data_loader: Failed to read CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("data_loader: Failed to open file: {0}")]
    Io(#[from] std::io::Error),
    #[error("data_loader: Failed to parse {column} on record {record}: {value}")]
    Parse {
        column: &'static str,
        record: usize,
        value: String,
    },
}

#[derive(Debug, Clone)]
pub struct Candles {
    pub timestamp: Vec<i64>,
    pub open: Vec<f64>,
    pub high: Vec<f64>,
    pub low: Vec<f64>,
    pub close: Vec<f64>,
    pub volume: Vec<f64>,
}

impl Candles {
    pub fn new(
        timestamp: Vec<i64>,
        open: Vec<f64>,
        high: Vec<f64>,
        low: Vec<f64>,
        close: Vec<f64>,
        volume: Vec<f64>,
    ) -> Self {
        Candles {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    pub fn len(&self) -> usize {
        self.close.len()
    }

    pub fn is_empty(&self) -> bool {
        self.close.is_empty()
    }

    pub fn select_candle_field(&self, field: &str) -> Result<&[f64], DataError> {
        match field.to_lowercase().as_str() {
            "open" => Ok(&self.open),
            "high" => Ok(&self.high),
            "low" => Ok(&self.low),
            "close" => Ok(&self.close),
            "volume" => Ok(&self.volume),
            _ => Err(DataError::UnknownField(field.to_string())),
        }
    }

    pub fn get_calculated_field(&self, field: &str) -> Result<Vec<f64>, DataError> {
        match field.to_lowercase().as_str() {
            "hl2" => Ok(self.hl2()),
            "hlc3" => Ok(self.hlc3()),
            "ohlc4" => Ok(self.ohlc4()),
            "hlcc4" => Ok(self.hlcc4()),
            _ => Err(DataError::UnknownField(field.to_string())),
        }
    }

    pub fn hl2(&self) -> Vec<f64> {
        self.high
            .iter()
            .zip(self.low.iter())
            .map(|(&high, &low)| (high + low) / 2.0)
            .collect()
    }

    pub fn hlc3(&self) -> Vec<f64> {
        self.high
            .iter()
            .zip(self.low.iter())
            .zip(self.close.iter())
            .map(|((&high, &low), &close)| (high + low + close) / 3.0)
            .collect()
    }

    pub fn ohlc4(&self) -> Vec<f64> {
        self.open
            .iter()
            .zip(self.high.iter())
            .zip(self.low.iter())
            .zip(self.close.iter())
            .map(|(((&open, &high), &low), &close)| (open + high + low + close) / 4.0)
            .collect()
    }

    pub fn hlcc4(&self) -> Vec<f64> {
        self.high
            .iter()
            .zip(self.low.iter())
            .zip(self.close.iter())
            .map(|((&high, &low), &close)| (high + low + 2.0 * close) / 4.0)
            .collect()
    }
}

fn parse_f64(field: &str, column: &'static str, record: usize) -> Result<f64, DataError> {
    field.parse::<f64>().map_err(|_| DataError::Parse {
        column,
        record,
        value: field.to_string(),
    })
}

/// Reads OHLCV candles from a CSV file with a
/// `timestamp,open,high,low,close,volume` header row.
pub fn read_candles_from_csv(file_path: &str) -> Result<Candles, DataError> {
    let file = File::open(file_path)?;
    let mut rdr = ReaderBuilder::new().has_headers(true).from_reader(file);

    let mut timestamp = Vec::new();
    let mut open = Vec::new();
    let mut high = Vec::new();
    let mut low = Vec::new();
    let mut close = Vec::new();
    let mut volume = Vec::new();

    for (idx, result) in rdr.records().enumerate() {
        let record = result?;
        timestamp.push(record[0].parse::<i64>().map_err(|_| DataError::Parse {
            column: "timestamp",
            record: idx,
            value: record[0].to_string(),
        })?);
        open.push(parse_f64(&record[1], "open", idx)?);
        high.push(parse_f64(&record[2], "high", idx)?);
        low.push(parse_f64(&record[3], "low", idx)?);
        close.push(parse_f64(&record[4], "close", idx)?);
        volume.push(parse_f64(&record[5], "volume", idx)?);
    }

    Ok(Candles::new(timestamp, open, high, low, close, volume))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = "src/data/ohlcv_sample_daily.csv";

    #[test]
    fn test_field_congruency() {
        let candles = read_candles_from_csv(FIXTURE).expect("Failed to load CSV for testing");

        let len = candles.timestamp.len();
        assert!(len > 0, "Fixture is empty");
        assert_eq!(candles.open.len(), len, "Open length mismatch");
        assert_eq!(candles.high.len(), len, "High length mismatch");
        assert_eq!(candles.low.len(), len, "Low length mismatch");
        assert_eq!(candles.close.len(), len, "Close length mismatch");
        assert_eq!(candles.volume.len(), len, "Volume length mismatch");
        assert_eq!(candles.len(), len);
        assert!(!candles.is_empty());
    }

    #[test]
    fn test_select_candle_field() {
        let candles = read_candles_from_csv(FIXTURE).expect("Failed to load CSV for testing");

        let close = candles
            .select_candle_field("close")
            .expect("Failed to select close");
        assert_eq!(close.len(), candles.close.len());
        assert_eq!(close[0], candles.close[0]);

        let upper_case = candles
            .select_candle_field("Close")
            .expect("Field lookup should be case-insensitive");
        assert_eq!(upper_case[0], candles.close[0]);

        let unknown = candles.select_candle_field("bid");
        assert!(unknown.is_err(), "Expected error for unknown field");
    }

    #[test]
    fn test_calculated_fields_accuracy() {
        let candles = read_candles_from_csv(FIXTURE).expect("Failed to load CSV for testing");

        let hl2 = candles.get_calculated_field("hl2").expect("Failed to get HL2");
        let hlc3 = candles.get_calculated_field("hlc3").expect("Failed to get HLC3");
        let ohlc4 = candles
            .get_calculated_field("ohlc4")
            .expect("Failed to get OHLC4");
        let hlcc4 = candles
            .get_calculated_field("hlcc4")
            .expect("Failed to get HLCC4");

        let len = candles.timestamp.len();
        assert_eq!(hl2.len(), len, "HL2 length mismatch");
        assert_eq!(hlc3.len(), len, "HLC3 length mismatch");
        assert_eq!(ohlc4.len(), len, "OHLC4 length mismatch");
        assert_eq!(hlcc4.len(), len, "HLCC4 length mismatch");

        let expected_last_5_hl2 = [104.88, 106.35, 106.51, 105.66, 105.71];
        let expected_last_5_hlc3 = [104.94, 106.5566666667, 106.4133333333, 105.6833333333, 105.6466666667];
        let expected_last_5_ohlc4 = [104.895, 106.1825, 106.5525, 105.8175, 105.6675];
        let expected_last_5_hlcc4 = [104.97, 106.66, 106.365, 105.695, 105.615];

        fn compare_last_five(actual: &[f64], expected: &[f64], field_name: &str) {
            let start = actual.len().saturating_sub(5);
            for (i, (&a, &e)) in actual[start..].iter().zip(expected.iter()).enumerate() {
                assert!(
                    (a - e).abs() < 1e-8,
                    "Mismatch in {} at last-5 index {}: expected {}, got {}",
                    field_name,
                    i,
                    e,
                    a
                );
            }
        }
        compare_last_five(&hl2, &expected_last_5_hl2, "HL2");
        compare_last_five(&hlc3, &expected_last_5_hlc3, "HLC3");
        compare_last_five(&ohlc4, &expected_last_5_ohlc4, "OHLC4");
        compare_last_five(&hlcc4, &expected_last_5_hlcc4, "HLCC4");

        let unknown = candles.get_calculated_field("median");
        assert!(unknown.is_err(), "Expected error for unknown calculated field");
    }

    #[test]
    fn test_missing_file() {
        let result = read_candles_from_csv("src/data/does_not_exist.csv");
        assert!(result.is_err(), "Expected error for missing file");
    }
}
