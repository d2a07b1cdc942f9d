use serde::{Deserialize, Serialize};

use crate::catalog::PipeSize;

/// 평균 압력이 이 값 이상이면 고압식을 쓴다 [kPa(g)]
pub const HIGH_PRESSURE_THRESHOLD_KPA: f64 = 10.3;

const FT_PER_M: f64 = 3.28084;
const IN_PER_M: f64 = 39.3701;
const MM_PER_IN: f64 = 25.4;
const PSI_PER_KPA: f64 = 0.145038;
/// kPa → m 수주
const M_WC_PER_KPA: f64 = 0.10199773339984054;
const ATM_PSI: f64 = 14.7;

/// 연료 가스 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum GasType {
    NaturalGas,
    Lpg,
}

impl GasType {
    /// 공기 대비 비중(Cr)
    pub fn relative_density(&self) -> f64 {
        match self {
            GasType::NaturalGas => 0.6094,
            GasType::Lpg => 1.2462,
        }
    }

    /// 고압식 압축성 보정계수(Y)
    pub fn expansion_factor(&self) -> f64 {
        match self {
            GasType::NaturalGas => 0.9992,
            GasType::Lpg => 0.9910,
        }
    }

    /// 열량 입력 [MJ/h] → 체적 유량 [ft³/h]
    pub fn cubic_feet_per_hour(&self, input_mj_per_h: f64) -> f64 {
        match self {
            GasType::NaturalGas => input_mj_per_h * 0.94782,
            GasType::Lpg => input_mj_per_h / 2.620,
        }
    }
}

/// 가스 배관 관경 산정 입력.
#[derive(Debug, Clone)]
pub struct GasPipeSizingInput {
    pub gas: GasType,
    /// 기구 열량 입력 합계 [MJ/h]
    pub input_rate_mj_per_h: f64,
    /// 배관 길이 [m]
    pub length_m: f64,
    /// 입구 압력 [kPa(g)]
    pub inlet_pressure_kpa: f64,
    /// 허용 최저 출구 압력 [kPa(g)]
    pub outlet_pressure_kpa: f64,
}

/// 가스 배관 관경 산정 결과.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GasPipeSizingResult {
    /// 필요 내경 [mm]
    pub required_diameter_mm: f64,
    /// 체적 유량 [ft³/h]
    pub flow_cfh: f64,
    /// 고압식 사용 여부
    pub high_pressure: bool,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GasError {
    #[error("입력 {name} = {value}이 잘못되었습니다")]
    InvalidInput { name: &'static str, value: f64 },
    #[error("출구 압력 {outlet_kpa} kPa가 입구 압력 {inlet_kpa} kPa보다 낮아야 합니다")]
    NoPressureDrop { inlet_kpa: f64, outlet_kpa: f64 },
}

/// 허용 압력 강하 안에서 열량을 보내는 데 필요한 내경.
/// 평균 압력이 낮으면 수주 손실식, 높으면 절대 압력 제곱차 식을 쓴다.
pub fn required_diameter(input: &GasPipeSizingInput) -> Result<GasPipeSizingResult, GasError> {
    let checks = [
        ("input_rate_mj_per_h", input.input_rate_mj_per_h, 0.0),
        ("length_m", input.length_m, f64::MIN_POSITIVE),
        ("inlet_pressure_kpa", input.inlet_pressure_kpa, 0.0),
        ("outlet_pressure_kpa", input.outlet_pressure_kpa, 0.0),
    ];
    for (name, value, min) in checks {
        if !value.is_finite() || value < min {
            return Err(GasError::InvalidInput { name, value });
        }
    }
    if input.outlet_pressure_kpa >= input.inlet_pressure_kpa {
        return Err(GasError::NoPressureDrop {
            inlet_kpa: input.inlet_pressure_kpa,
            outlet_kpa: input.outlet_pressure_kpa,
        });
    }

    let gas = input.gas;
    let flow_cfh = gas.cubic_feet_per_hour(input.input_rate_mj_per_h);
    let mean_kpa = (input.inlet_pressure_kpa + input.outlet_pressure_kpa) / 2.0;
    let high_pressure = mean_kpa >= HIGH_PRESSURE_THRESHOLD_KPA;
    if flow_cfh == 0.0 {
        return Ok(GasPipeSizingResult {
            required_diameter_mm: 0.0,
            flow_cfh,
            high_pressure,
        });
    }

    let length_ft = input.length_m * FT_PER_M;
    let cr = gas.relative_density();
    let diameter_in = if high_pressure {
        let p1 = input.inlet_pressure_kpa * PSI_PER_KPA + ATM_PSI;
        let p2 = input.outlet_pressure_kpa * PSI_PER_KPA + ATM_PSI;
        let term = (p1 * p1 - p2 * p2) * gas.expansion_factor() / (cr * length_ft);
        flow_cfh.powf(0.381) / (18.93 * term.powf(0.206))
    } else {
        let head_loss_in =
            (input.inlet_pressure_kpa - input.outlet_pressure_kpa) * M_WC_PER_KPA * IN_PER_M;
        flow_cfh.powf(0.381) / (19.17 * (head_loss_in / (cr * length_ft)).powf(0.206))
    };

    Ok(GasPipeSizingResult {
        required_diameter_mm: diameter_in * MM_PER_IN,
        flow_cfh,
        high_pressure,
    })
}

/// 내경이 필요 내경 이상인 가장 작은 호칭경. 없으면 가장 큰 호칭경과 `true`(부족)를 돌려준다.
pub fn select_gas_pipe(sizes: &[PipeSize], required_diameter_mm: f64) -> Option<(PipeSize, bool)> {
    sizes
        .iter()
        .find(|s| s.internal_diameter_mm >= required_diameter_mm)
        .map(|s| (*s, false))
        .or_else(|| sizes.last().map(|s| (*s, true)))
}
