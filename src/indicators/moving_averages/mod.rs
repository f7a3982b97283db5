pub mod sma;

pub use sma::{sma, SmaData, SmaError, SmaInput, SmaOutput, SmaParams};
