pub mod dmi;
pub mod moving_averages;
pub mod rsi;
pub mod stddev;

pub use dmi::{
    dmi, dmi_batch, DmiBatchBuilder, DmiBatchOutput, DmiBatchRange, DmiBuilder, DmiData, DmiError,
    DmiInput, DmiOutput, DmiParams,
};
pub use rsi::{rsi, RsiData, RsiError, RsiInput, RsiOutput, RsiParams};
pub use stddev::{stddev, StdDevData, StdDevError, StdDevInput, StdDevOutput, StdDevParams};
