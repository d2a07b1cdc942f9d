use serde::{Deserialize, Serialize};

/// 체적 유량 단위. 내부 기준은 L/s이다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowUnit {
    LitrePerSecond,
    LitrePerMinute,
    CubicMeterPerHour,
    UsGallonPerMinute,
}

const LITRES_PER_US_GALLON: f64 = 3.785_411_784;

impl FlowUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            FlowUnit::LitrePerSecond => "L/s",
            FlowUnit::LitrePerMinute => "L/min",
            FlowUnit::CubicMeterPerHour => "m3/h",
            FlowUnit::UsGallonPerMinute => "gpm",
        }
    }
}

fn to_ls(value: f64, unit: FlowUnit) -> f64 {
    match unit {
        FlowUnit::LitrePerSecond => value,
        FlowUnit::LitrePerMinute => value / 60.0,
        FlowUnit::CubicMeterPerHour => value / 3.6,
        FlowUnit::UsGallonPerMinute => value * LITRES_PER_US_GALLON / 60.0,
    }
}

fn from_ls(value_ls: f64, unit: FlowUnit) -> f64 {
    match unit {
        FlowUnit::LitrePerSecond => value_ls,
        FlowUnit::LitrePerMinute => value_ls * 60.0,
        FlowUnit::CubicMeterPerHour => value_ls * 3.6,
        FlowUnit::UsGallonPerMinute => value_ls * 60.0 / LITRES_PER_US_GALLON,
    }
}

/// 유량을 변환한다.
pub fn convert_flow(value: f64, from: FlowUnit, to: FlowUnit) -> f64 {
    from_ls(to_ls(value, from), to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_litre_per_second() {
        let m3h = convert_flow(1.0, FlowUnit::LitrePerSecond, FlowUnit::CubicMeterPerHour);
        assert!((m3h - 3.6).abs() < 1e-12);
        let gpm = convert_flow(1.0, FlowUnit::LitrePerSecond, FlowUnit::UsGallonPerMinute);
        assert!((gpm - 15.850_323).abs() < 1e-5);
    }
}
