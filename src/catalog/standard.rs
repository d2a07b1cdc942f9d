use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::CatalogError;
use crate::demand::equation::Formula;
use crate::interpolation::{InterpolationError, LowerBound, MaxKeyedTable, Table1D};

/// 기준이 기구별로 합산하는 양.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accumulation {
    /// 기준별 부하 단위(LU)
    #[default]
    LoadingUnits,
    /// EN 배수 단위(DU)
    DischargeUnits,
    /// 기구 설계 유량 [L/s] (DIN 1988-300 방식)
    DesignFlow,
}

/// EN 사용 빈도 계수. 기구마다 한 번 곱한다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Intermittent,
    Frequent,
    Congested,
    Special,
}

impl Frequency {
    pub fn factor(&self) -> f64 {
        match self {
            Frequency::Intermittent => 0.5,
            Frequency::Frequent => 0.7,
            Frequency::Congested => 1.0,
            Frequency::Special => 1.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HotCold {
    pub cold: f64,
    pub hot: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum StandardKindRecord {
    Equation {
        equation: String,
        #[serde(default)]
        variables: BTreeMap<String, f64>,
    },
    LoadingUnitTable {
        table: BTreeMap<String, f64>,
    },
    MaxLoadingUnitTable {
        tables: BTreeMap<String, BTreeMap<String, f64>>,
    },
    DwellingHotColdTable {
        table: BTreeMap<String, HotCold>,
    },
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct StandardRecord {
    pub name: String,
    #[serde(default)]
    pub accumulate: Accumulation,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default)]
    pub ceiling: Option<f64>,
    #[serde(default)]
    pub lower_bound: LowerBound,
    #[serde(flatten)]
    pub kind: StandardKindRecord,
}

/// 동시사용 유량 기준의 네 가지 형태.
#[derive(Debug, Clone, PartialEq)]
pub enum PsdKind {
    Equation(Formula),
    LoadingUnitTable(Table1D),
    MaxLoadingUnitTable(MaxKeyedTable),
    /// 세대 수 → 냉수/온수 유량, 정확히 일치하는 행만 사용
    DwellingHotColdTable(BTreeMap<u32, HotCold>),
}

/// 동시사용 유량(PSD) 기준.
#[derive(Debug, Clone, PartialEq)]
pub struct PsdStandard {
    pub uid: String,
    pub name: String,
    pub accumulate: Accumulation,
    pub frequency: Option<Frequency>,
    pub kind: PsdKind,
}

impl PsdStandard {
    pub(crate) fn from_record(uid: &str, record: StandardRecord) -> Result<Self, CatalogError> {
        let table_err = |source: InterpolationError| CatalogError::Table {
            uid: uid.to_string(),
            source,
        };
        let finish = |t: Table1D| {
            t.with_lower_bound(record.lower_bound)
                .with_ceiling(record.ceiling)
        };
        let kind = match record.kind {
            StandardKindRecord::Equation {
                equation,
                variables,
            } => PsdKind::Equation(Formula::parse(&equation, &variables).map_err(|source| {
                CatalogError::Formula {
                    uid: uid.to_string(),
                    source,
                }
            })?),
            StandardKindRecord::LoadingUnitTable { table } => {
                let points = Table1D::points_from_map(&table).map_err(table_err)?;
                PsdKind::LoadingUnitTable(finish(
                    Table1D::non_decreasing(points).map_err(table_err)?,
                ))
            }
            StandardKindRecord::MaxLoadingUnitTable { tables } => {
                let mut subs = Vec::with_capacity(tables.len());
                for (key, table) in &tables {
                    let max_key = key.trim().parse::<f64>().map_err(|_| {
                        table_err(InterpolationError::Malformed(format!(
                            "숫자가 아닌 최대 부하 키 '{key}'"
                        )))
                    })?;
                    let points = Table1D::points_from_map(table).map_err(table_err)?;
                    subs.push((
                        max_key,
                        finish(Table1D::non_decreasing(points).map_err(table_err)?),
                    ));
                }
                PsdKind::MaxLoadingUnitTable(MaxKeyedTable::new(subs).map_err(table_err)?)
            }
            StandardKindRecord::DwellingHotColdTable { table } => {
                PsdKind::DwellingHotColdTable(dwelling_rows(&table).map_err(table_err)?)
            }
        };
        Ok(Self {
            uid: uid.to_string(),
            name: record.name,
            accumulate: record.accumulate,
            frequency: record.frequency,
            kind,
        })
    }
}

// 세대 수 키는 1부터 빈틈없이 이어지고 두 열 모두 감소하지 않아야 한다.
fn dwelling_rows(
    table: &BTreeMap<String, HotCold>,
) -> Result<BTreeMap<u32, HotCold>, InterpolationError> {
    let mut rows = BTreeMap::new();
    for (key, row) in table {
        let count = key
            .trim()
            .parse::<u32>()
            .map_err(|_| InterpolationError::Malformed(format!("세대 수 키 '{key}'")))?;
        if !(row.cold.is_finite() && row.hot.is_finite()) || row.cold < 0.0 || row.hot < 0.0 {
            return Err(InterpolationError::Malformed(format!(
                "세대 수 {count}의 유량이 잘못되었습니다"
            )));
        }
        if rows.insert(count, *row).is_some() {
            return Err(InterpolationError::Malformed(format!("중복 세대 수 {count}")));
        }
    }
    if rows.is_empty() {
        return Err(InterpolationError::Malformed("빈 세대 표".into()));
    }
    let mut prev: Option<(u32, HotCold)> = None;
    for (&count, &row) in &rows {
        if let Some((pc, pr)) = prev {
            if count != pc + 1 {
                return Err(InterpolationError::Malformed(format!(
                    "세대 수 {pc} 다음 행이 {count}입니다"
                )));
            }
            if row.cold < pr.cold || row.hot < pr.hot {
                return Err(InterpolationError::Malformed(format!(
                    "세대 수 {count}에서 유량이 감소합니다"
                )));
            }
        }
        prev = Some((count, row));
    }
    Ok(rows)
}
