//! 보고서 출력용 단위 변환. 엔진 내부는 항상 kPa, L/s, m/s, m(mm) 기준이다.

pub mod flow;
pub mod length;
pub mod pressure;
pub mod velocity;

pub use flow::{convert_flow, FlowUnit};
pub use length::{convert_length, LengthUnit};
pub use pressure::{convert_pressure, PressureUnit};
pub use velocity::{convert_velocity, VelocityUnit};
