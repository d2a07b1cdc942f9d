use serde::{Deserialize, Serialize};

use crate::hydraulics::GRAVITY;

/// 압력 단위. 내부 기준은 kPa(게이지)이다.
/// 수두(mH2O)는 4°C 물(1000 kg/m³)과 표준 중력으로 환산한다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PressureUnit {
    KiloPascal,
    Pascal,
    Bar,
    Psi,
    MeterWater,
}

const PA_PER_PSI: f64 = 6_894.757;
const WATER_DENSITY: f64 = 1000.0;

impl PressureUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            PressureUnit::KiloPascal => "kPa",
            PressureUnit::Pascal => "Pa",
            PressureUnit::Bar => "bar",
            PressureUnit::Psi => "psi",
            PressureUnit::MeterWater => "mH2O",
        }
    }
}

/// 주어진 압력을 kPa 로 변환한다.
pub fn to_kpa(value: f64, unit: PressureUnit) -> f64 {
    match unit {
        PressureUnit::KiloPascal => value,
        PressureUnit::Pascal => value / 1000.0,
        PressureUnit::Bar => value * 100.0,
        PressureUnit::Psi => value * PA_PER_PSI / 1000.0,
        PressureUnit::MeterWater => value * WATER_DENSITY * GRAVITY / 1000.0,
    }
}

/// kPa 값을 원하는 단위로 변환한다.
pub fn from_kpa(value_kpa: f64, unit: PressureUnit) -> f64 {
    match unit {
        PressureUnit::KiloPascal => value_kpa,
        PressureUnit::Pascal => value_kpa * 1000.0,
        PressureUnit::Bar => value_kpa / 100.0,
        PressureUnit::Psi => value_kpa * 1000.0 / PA_PER_PSI,
        PressureUnit::MeterWater => value_kpa * 1000.0 / (WATER_DENSITY * GRAVITY),
    }
}

/// 압력을 원하는 단위로 변환한다.
pub fn convert_pressure(value: f64, from: PressureUnit, to: PressureUnit) -> f64 {
    from_kpa(to_kpa(value, from), to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_metres_of_water_is_about_98_kpa() {
        let kpa = convert_pressure(10.0, PressureUnit::MeterWater, PressureUnit::KiloPascal);
        assert!((kpa - 98.0665).abs() < 1e-9);
    }

    #[test]
    fn bar_and_psi() {
        let psi = convert_pressure(1.0, PressureUnit::Bar, PressureUnit::Psi);
        assert!((psi - 14.5038).abs() < 1e-3);
    }
}
