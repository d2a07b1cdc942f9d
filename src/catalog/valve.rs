use std::collections::BTreeMap;

use serde::Deserialize;

use super::CatalogError;
use crate::interpolation::{InterpolationError, RangedTable};

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ValveRecord {
    pub name: String,
    /// "15-16" 같은 구경 범위 → K
    pub k_values: BTreeMap<String, f64>,
}

/// 밸브/이음쇠. 구경 범위별 손실계수 K.
#[derive(Debug, Clone, PartialEq)]
pub struct Valve {
    pub uid: String,
    pub name: String,
    k_values: RangedTable<f64>,
}

impl Valve {
    /// 호칭경을 포함하는 범위의 K. 일치하는 범위가 없으면 카탈로그 결함이다.
    pub fn k_value(&self, nominal_mm: f64) -> Result<f64, InterpolationError> {
        self.k_values.lookup(nominal_mm).copied()
    }

    pub(crate) fn from_record(uid: &str, record: ValveRecord) -> Result<Self, CatalogError> {
        let table_err = |source| CatalogError::Table {
            uid: uid.to_string(),
            source,
        };
        if let Some((k, v)) = record
            .k_values
            .iter()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(CatalogError::Malformed {
                uid: uid.to_string(),
                message: format!("범위 {k}의 K 값 {v}이 잘못되었습니다"),
            });
        }
        let k_values = RangedTable::parse(record.k_values.iter().map(|(k, v)| (k.as_str(), *v)))
            .map_err(table_err)?;
        Ok(Self {
            uid: uid.to_string(),
            name: record.name,
            k_values,
        })
    }
}
