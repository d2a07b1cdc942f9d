use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::CatalogError;
use crate::interpolation::{LowerBound, Table1D};

/// 유량-압력 곡선을 가진 기기의 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    MixingValve,
    BackflowPreventer,
    /// 곡선 값만큼 압력을 올린다.
    Pump,
    Plant,
}

impl DeviceKind {
    pub fn boosts(&self) -> bool {
        matches!(self, DeviceKind::Pump)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DeviceRecord {
    pub name: String,
    pub kind: DeviceKind,
    pub manufacturers: BTreeMap<String, BTreeMap<String, DeviceSizeRecord>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DeviceSizeRecord {
    #[serde(default)]
    pub min_flow_ls: f64,
    pub max_flow_ls: f64,
    #[serde(default)]
    pub min_inlet_pressure_kpa: Option<f64>,
    #[serde(default)]
    pub max_inlet_pressure_kpa: Option<f64>,
    /// 유량 [L/s] → 압력 손실(펌프는 승압) [kPa]
    pub pressure_kpa: BTreeMap<String, f64>,
}

/// 기기의 한 사이즈.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceSize {
    pub label: String,
    pub min_flow_ls: f64,
    pub max_flow_ls: f64,
    pub min_inlet_pressure_kpa: Option<f64>,
    pub max_inlet_pressure_kpa: Option<f64>,
    /// 최소 유량 아래는 첫 값 유지, 최대 유량 초과는 범위 밖
    pub curve: Table1D,
}

impl DeviceSize {
    pub fn contains_flow(&self, flow_ls: f64) -> bool {
        flow_ls >= self.min_flow_ls && flow_ls <= self.max_flow_ls
    }
}

/// 혼합밸브, 역류방지기, 펌프, 열원 설비.
#[derive(Debug, Clone, PartialEq)]
pub struct Device {
    pub uid: String,
    pub name: String,
    pub kind: DeviceKind,
    manufacturers: BTreeMap<String, Vec<DeviceSize>>,
}

impl Device {
    /// 최대 유량 오름차순 사이즈 목록. 없는 제조사는 generic 으로 폴백한다.
    pub fn sizes(&self, manufacturer: &str) -> Option<&[DeviceSize]> {
        self.manufacturers
            .get(manufacturer)
            .or_else(|| self.manufacturers.get("generic"))
            .map(Vec::as_slice)
    }

    pub(crate) fn from_record(uid: &str, record: DeviceRecord) -> Result<Self, CatalogError> {
        let malformed = |message: String| CatalogError::Malformed {
            uid: uid.to_string(),
            message,
        };
        let mut manufacturers = BTreeMap::new();
        for (manufacturer, sizes) in record.manufacturers {
            let mut list = Vec::with_capacity(sizes.len());
            for (label, s) in sizes {
                if !(s.min_flow_ls >= 0.0 && s.min_flow_ls <= s.max_flow_ls) {
                    return Err(malformed(format!(
                        "{manufacturer}/{label}: 유량 범위 {}~{}가 잘못되었습니다",
                        s.min_flow_ls, s.max_flow_ls
                    )));
                }
                if let (Some(lo), Some(hi)) = (s.min_inlet_pressure_kpa, s.max_inlet_pressure_kpa)
                {
                    if lo > hi {
                        return Err(malformed(format!(
                            "{manufacturer}/{label}: 입구 압력 범위 {lo}~{hi}가 잘못되었습니다"
                        )));
                    }
                }
                let curve = Table1D::points_from_map(&s.pressure_kpa)
                    .and_then(Table1D::new)
                    .map_err(|source| CatalogError::Table {
                        uid: uid.to_string(),
                        source,
                    })?
                    .with_lower_bound(LowerBound::HoldLow)
                    .with_ceiling(Some(s.max_flow_ls));
                list.push(DeviceSize {
                    label,
                    min_flow_ls: s.min_flow_ls,
                    max_flow_ls: s.max_flow_ls,
                    min_inlet_pressure_kpa: s.min_inlet_pressure_kpa,
                    max_inlet_pressure_kpa: s.max_inlet_pressure_kpa,
                    curve,
                });
            }
            if list.is_empty() {
                return Err(malformed(format!("{manufacturer}: 사이즈가 없습니다")));
            }
            list.sort_by(|a, b| a.max_flow_ls.total_cmp(&b.max_flow_ls));
            manufacturers.insert(manufacturer, list);
        }
        if manufacturers.is_empty() {
            return Err(malformed("제조사가 없습니다".into()));
        }
        Ok(Self {
            uid: uid.to_string(),
            name: record.name,
            kind: record.kind,
            manufacturers,
        })
    }
}
