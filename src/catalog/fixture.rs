use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::CatalogError;

/// 배관망이 공급하는 유체 계통.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FluidRole {
    ColdWater,
    HotWater,
    WarmWater,
}

impl FluidRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            FluidRole::ColdWater => "cold-water",
            FluidRole::HotWater => "hot-water",
            FluidRole::WarmWater => "warm-water",
        }
    }

    /// 세대 온수/냉수 표에서 사용할 열. 온수(warm 포함)는 hot 열을 쓴다.
    pub fn is_hot(&self) -> bool {
        !matches!(self, FluidRole::ColdWater)
    }
}

/// 위생기구 사양. 제조사별 변형이 하나의 사양을 공유한다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixtureSpec {
    #[serde(default)]
    pub uid: String,
    pub name: String,
    /// 기준 UID → 계통(cold-water 등) → 부하 단위(LU)
    #[serde(default)]
    pub loading_units: BTreeMap<String, BTreeMap<String, f64>>,
    /// 제조사 → 옵션 → 설계 유량 [L/s]
    #[serde(default)]
    pub design_flow_ls: BTreeMap<String, BTreeMap<String, f64>>,
    /// 동시사용률과 무관하게 더해지는 연속 유량 [L/s]
    #[serde(default)]
    pub continuous_flow_ls: Option<f64>,
    /// 최소 입구 압력 [kPa]
    pub min_inlet_pressure_kpa: f64,
    /// 최대 입구 압력 [kPa]
    pub max_inlet_pressure_kpa: f64,
    #[serde(default)]
    pub probability_of_use_pct: Option<f64>,
    /// AS/NZS 3500.2 배수 기구 단위(FU)
    #[serde(default)]
    pub asnz_fixture_units: Option<f64>,
    /// EN 12056 배수 단위(DU)
    #[serde(default)]
    pub en_discharge_units: Option<f64>,
    /// 바닥 기준 토출구 높이 [m]
    #[serde(default)]
    pub outlet_above_floor_m: f64,
}

impl FixtureSpec {
    /// 기준/계통별 부하 단위. 다른 기준의 값으로 대신하지 않는다.
    pub fn loading_units(&self, standard: &str, role: FluidRole) -> Option<f64> {
        self.loading_units
            .get(standard)
            .and_then(|by_role| by_role.get(role.as_str()).copied())
    }

    /// 제조사/옵션의 설계 유량. 없으면 generic/default 로 폴백한다.
    pub fn design_flow(&self, manufacturer: &str, option: &str) -> Option<f64> {
        let by_option = self
            .design_flow_ls
            .get(manufacturer)
            .or_else(|| self.design_flow_ls.get("generic"))?;
        by_option
            .get(option)
            .or_else(|| by_option.get("default"))
            .copied()
    }

    pub(crate) fn validate(&self) -> Result<(), CatalogError> {
        let malformed = |msg: String| CatalogError::Malformed {
            uid: self.uid.clone(),
            message: msg,
        };
        if self.min_inlet_pressure_kpa < 0.0
            || self.min_inlet_pressure_kpa > self.max_inlet_pressure_kpa
        {
            return Err(malformed(format!(
                "입구 압력 범위 {}~{} kPa가 잘못되었습니다",
                self.min_inlet_pressure_kpa, self.max_inlet_pressure_kpa
            )));
        }
        let numbers = self
            .loading_units
            .values()
            .flat_map(|m| m.values())
            .chain(self.design_flow_ls.values().flat_map(|m| m.values()))
            .chain(self.continuous_flow_ls.iter())
            .chain(self.asnz_fixture_units.iter())
            .chain(self.en_discharge_units.iter());
        for v in numbers {
            if !v.is_finite() || *v < 0.0 {
                return Err(malformed(format!("음수 또는 유한하지 않은 값 {v}")));
            }
        }
        if let Some(p) = self.probability_of_use_pct {
            if !(0.0..=100.0).contains(&p) {
                return Err(malformed(format!("사용 확률 {p}%가 범위를 벗어났습니다")));
            }
        }
        Ok(())
    }
}
