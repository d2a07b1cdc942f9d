//! 연료 가스(천연가스, LPG) 배관 관경 산정.

pub mod gas_piping;

pub use gas_piping::{
    required_diameter, select_gas_pipe, GasError, GasPipeSizingInput, GasPipeSizingResult,
    GasType, HIGH_PRESSURE_THRESHOLD_KPA,
};
