//! 운전 온도/압력에서의 유체 물성.
//! iapws97 모델은 seuif97 Region 1(압축수) 비체적으로 밀도를 구한다.

use seuif97::{pt, OV};
use serde::Serialize;

use crate::catalog::{Fluid, FluidModel};
use crate::interpolation::InterpolationError;

const ATM_KPA: f64 = 101.325;

/// seuif97 Region 1 에서 쓰는 온도 범위 [°C]
pub const IAPWS_LIQUID_RANGE_C: (f64, f64) = (0.0, 370.0);

/// 계산에 쓰는 물성 한 벌.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FluidProperties {
    pub density_kg_m3: f64,
    pub dynamic_viscosity_pa_s: f64,
}

/// 물성과, 자료 범위 밖이었다면 대신 사용한 경계 온도.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FluidLookup {
    pub properties: FluidProperties,
    pub clamped_temperature_c: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FluidError {
    #[error("유체 '{uid}' 물성을 {temperature_c}°C, {pressure_kpa} kPa(g)에서 계산할 수 없습니다")]
    OutOfRange {
        uid: String,
        temperature_c: f64,
        pressure_kpa: f64,
    },
    #[error("유체 '{0}'에 물성 자료가 부족합니다")]
    Incomplete(String),
}

/// 물 점성계수 Vogel 근사식 [Pa·s], 0~370°C.
pub fn liquid_water_viscosity(temp_c: f64) -> f64 {
    let exponent = 247.8 / (temp_c + 133.15);
    2.414e-5 * 10f64.powf(exponent)
}

/// 압축수 밀도 [kg/m³]. 압력은 게이지 kPa.
pub fn iapws_water_density(temp_c: f64, pressure_kpa_gauge: f64) -> Option<f64> {
    let p_mpa = (pressure_kpa_gauge + ATM_KPA) / 1000.0;
    let v = pt(p_mpa, temp_c, (OV, 1));
    if v.is_finite() && v > 0.0 {
        Some(1.0 / v)
    } else {
        None
    }
}

/// 온도/압력에서의 밀도와 점성계수.
/// 자료 범위 밖 온도는 가장 가까운 경계 온도의 물성을 쓰고 `clamped_temperature_c`에 남긴다.
pub fn properties(
    fluid: &Fluid,
    temperature_c: f64,
    pressure_kpa_gauge: f64,
) -> Result<FluidLookup, FluidError> {
    let out_of_range = || FluidError::OutOfRange {
        uid: fluid.uid.clone(),
        temperature_c,
        pressure_kpa: pressure_kpa_gauge,
    };
    if !temperature_c.is_finite() {
        return Err(out_of_range());
    }
    match fluid.model {
        FluidModel::Table => {
            let density_kg_m3 = fluid
                .density_kg_m3
                .ok_or_else(|| FluidError::Incomplete(fluid.uid.clone()))?;
            let table = fluid
                .viscosity_by_temp
                .as_ref()
                .ok_or_else(|| FluidError::Incomplete(fluid.uid.clone()))?;
            let (viscosity, clamped_temperature_c) = match table.interpolate(temperature_c) {
                Ok(v) => (v, None),
                Err(InterpolationError::OutOfRange {
                    lower,
                    upper,
                    nearest,
                    ..
                }) => (nearest, Some(temperature_c.clamp(lower, upper))),
                Err(_) => return Err(out_of_range()),
            };
            if viscosity <= 0.0 {
                return Err(out_of_range());
            }
            Ok(FluidLookup {
                properties: FluidProperties {
                    density_kg_m3,
                    dynamic_viscosity_pa_s: viscosity,
                },
                clamped_temperature_c,
            })
        }
        FluidModel::Iapws97 => {
            let (lo, hi) = IAPWS_LIQUID_RANGE_C;
            let used_c = temperature_c.clamp(lo, hi);
            let density_kg_m3 =
                iapws_water_density(used_c, pressure_kpa_gauge).ok_or_else(out_of_range)?;
            Ok(FluidLookup {
                properties: FluidProperties {
                    density_kg_m3,
                    dynamic_viscosity_pa_s: liquid_water_viscosity(used_c),
                },
                clamped_temperature_c: (used_c != temperature_c).then_some(used_c),
            })
        }
    }
}
