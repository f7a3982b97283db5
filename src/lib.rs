#![allow(clippy::needless_range_loop)]

pub mod indicators;
pub mod utilities;

pub use indicators::dmi::{
    dmi, dmi_batch, DmiBatchBuilder, DmiBatchOutput, DmiBatchRange, DmiBuilder, DmiData, DmiError,
    DmiInput, DmiOutput, DmiParams,
};
pub use utilities::data_loader::{read_candles_from_csv, Candles, DataError};
