//! 배관망 사이징: 깊이별 상향 선정 → 하향 압력 전파 → 검토.

mod edge;
pub mod engine;
pub mod result;

pub use edge::{device_pressure_kpa, select_device_size};
pub use engine::{
    role_max_velocity_m_s, role_temperature_c, Cancellation, SizingEngine, SizingError,
    SizingSettings,
};
pub use result::{
    DeviceResult, EdgeResult, FixtureResult, Severity, SizingReport, Violation, ViolationKind,
};
