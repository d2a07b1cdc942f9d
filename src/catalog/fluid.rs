use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::CatalogError;
use crate::interpolation::{LowerBound, Table1D};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FluidState {
    Liquid,
    Gas,
}

/// 물성 산출 방식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FluidModel {
    /// 고정 밀도 + 온도별 점도표
    #[default]
    Table,
    /// IAPWS-IF97 밀도 + Vogel 점도식 (물 전용)
    Iapws97,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FluidRecord {
    pub name: String,
    pub state: FluidState,
    #[serde(default)]
    pub model: FluidModel,
    #[serde(default)]
    pub density_kg_m3: Option<f64>,
    /// 온도 [°C] → 점성계수 [Pa·s]
    #[serde(default)]
    pub dynamic_viscosity_pa_s: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fluid {
    pub uid: String,
    pub name: String,
    pub state: FluidState,
    pub model: FluidModel,
    pub density_kg_m3: Option<f64>,
    pub viscosity_by_temp: Option<Table1D>,
}

impl Fluid {
    pub(crate) fn from_record(uid: &str, record: FluidRecord) -> Result<Self, CatalogError> {
        let malformed = |message: &str| CatalogError::Malformed {
            uid: uid.to_string(),
            message: message.to_string(),
        };
        let viscosity_by_temp = if record.dynamic_viscosity_pa_s.is_empty() {
            None
        } else {
            let table = Table1D::points_from_map(&record.dynamic_viscosity_pa_s)
                .and_then(Table1D::new)
                .map_err(|source| CatalogError::Table {
                    uid: uid.to_string(),
                    source,
                })?;
            // 표 밖 온도는 외삽하지 않고 경계값과 경고로 처리한다
            let ceiling = table.max_key();
            let table = table
                .with_lower_bound(LowerBound::Strict)
                .with_ceiling(Some(ceiling));
            if table.values().iter().any(|v| *v <= 0.0) {
                return Err(malformed("점성계수는 0보다 커야 합니다"));
            }
            Some(table)
        };
        if let Some(rho) = record.density_kg_m3 {
            if !rho.is_finite() || rho <= 0.0 {
                return Err(malformed("밀도는 0보다 커야 합니다"));
            }
        }
        if record.model == FluidModel::Table
            && (record.density_kg_m3.is_none() || viscosity_by_temp.is_none())
        {
            return Err(malformed("table 모델은 밀도와 점성계수 표가 필요합니다"));
        }
        if record.model == FluidModel::Iapws97 && record.state != FluidState::Liquid {
            return Err(malformed("iapws97 모델은 액체 물에만 사용할 수 있습니다"));
        }
        Ok(Self {
            uid: uid.to_string(),
            name: record.name,
            state: record.state,
            model: record.model,
            density_kg_m3: record.density_kg_m3,
            viscosity_by_temp,
        })
    }
}
