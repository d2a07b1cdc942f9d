use serde::{Deserialize, Serialize};

use super::{CatalogError, FixtureSpec};
use crate::interpolation::{Range, RangedTable};
use crate::network::PipeRun;

/// 배수 부하로 합산하는 기구 값.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrainageUnits {
    /// AS/NZS 3500.2 기구 단위(FU)
    #[default]
    FixtureUnits,
    /// EN 12056 배수 단위(DU)
    DischargeUnits,
}

impl DrainageUnits {
    pub fn of(&self, fixture: &FixtureSpec) -> Option<f64> {
        match self {
            DrainageUnits::FixtureUnits => fixture.asnz_fixture_units,
            DrainageUnits::DischargeUnits => fixture.en_discharge_units,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DrainageUnits::FixtureUnits => "기구 단위",
            DrainageUnits::DischargeUnits => "배수 단위",
        }
    }
}

fn diminish_default() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DrainageRecord {
    pub name: String,
    #[serde(default)]
    pub units: DrainageUnits,
    /// false면 스택 전체를 최대 부하 구간의 관경으로 맞춘다
    #[serde(default = "diminish_default")]
    pub stack_size_diminish: bool,
    pub stack: Vec<SizingRow>,
    pub horizontal: Vec<SizingRow>,
    pub vent: Vec<SizingRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SizingRow {
    pub min_units: f64,
    pub max_units: f64,
    pub size_mm: f64,
    #[serde(default)]
    pub grade_pct: Option<f64>,
}

/// 부하 범위 하나에 대응하는 관경. 횡주관은 최소 구배를 함께 가진다.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DrainageSize {
    pub nominal_mm: f64,
    pub grade_pct: Option<f64>,
}

/// 부하 범위 → 관경 표. 범위는 겹치지 않고, 부하가 클수록 관경도 크다.
#[derive(Debug, Clone, PartialEq)]
pub struct DrainageTable {
    ranges: RangedTable<DrainageSize>,
    max_units: f64,
    largest: DrainageSize,
}

impl DrainageTable {
    fn from_rows(uid: &str, run: PipeRun, rows: Vec<SizingRow>) -> Result<Self, CatalogError> {
        let malformed = |message: String| CatalogError::Malformed {
            uid: uid.to_string(),
            message: format!("{} 관경표: {message}", run.as_str()),
        };
        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let numbers = [row.min_units, row.max_units, row.size_mm];
            if numbers.iter().any(|v| !v.is_finite() || *v < 0.0) || row.size_mm == 0.0 {
                return Err(malformed(format!(
                    "잘못된 행 {}-{} → {} mm",
                    row.min_units, row.max_units, row.size_mm
                )));
            }
            if row.min_units > row.max_units {
                return Err(malformed(format!(
                    "최소 부하 {}가 최대 부하 {}보다 큽니다",
                    row.min_units, row.max_units
                )));
            }
            match (run, row.grade_pct) {
                (PipeRun::Horizontal, None) => {
                    return Err(malformed(format!("{} mm 행에 구배가 없습니다", row.size_mm)))
                }
                (_, Some(g)) if !g.is_finite() || g <= 0.0 => {
                    return Err(malformed(format!("구배 {g}%")))
                }
                _ => {}
            }
            entries.push((
                Range {
                    lower: row.min_units,
                    upper: row.max_units,
                },
                DrainageSize {
                    nominal_mm: row.size_mm,
                    grade_pct: row.grade_pct,
                },
            ));
        }
        let ranges = RangedTable::new(entries).map_err(|source| CatalogError::Table {
            uid: uid.to_string(),
            source,
        })?;
        if let Some(w) = ranges
            .entries()
            .windows(2)
            .find(|w| w[1].1.nominal_mm < w[0].1.nominal_mm)
        {
            return Err(malformed(format!(
                "부하 {} 이후 관경이 작아집니다 ({} → {} mm)",
                w[1].0, w[0].1.nominal_mm, w[1].1.nominal_mm
            )));
        }
        let Some((last_range, largest)) = ranges.entries().last().copied() else {
            return Err(malformed("행이 없습니다".into()));
        };
        Ok(Self {
            max_units: last_range.upper,
            largest,
            ranges,
        })
    }

    /// 부하를 감당하는 가장 작은 관경. 범위 사이의 값은 다음 범위로 올린다.
    /// 모든 범위를 넘으면 `None`.
    pub fn select(&self, units: f64) -> Option<DrainageSize> {
        self.ranges
            .entries()
            .iter()
            .find(|(range, _)| range.upper >= units)
            .map(|(_, size)| *size)
    }

    pub fn max_units(&self) -> f64 {
        self.max_units
    }

    pub fn largest(&self) -> DrainageSize {
        self.largest
    }
}

/// 배수 계통(하수/오수)의 관경 선정 규칙.
#[derive(Debug, Clone, PartialEq)]
pub struct DrainageSystem {
    pub uid: String,
    pub name: String,
    pub units: DrainageUnits,
    pub stack_size_diminish: bool,
    stack: DrainageTable,
    horizontal: DrainageTable,
    vent: DrainageTable,
}

impl DrainageSystem {
    pub fn table(&self, run: PipeRun) -> &DrainageTable {
        match run {
            PipeRun::Stack => &self.stack,
            PipeRun::Horizontal => &self.horizontal,
            PipeRun::Vent => &self.vent,
        }
    }

    pub(crate) fn from_record(uid: &str, record: DrainageRecord) -> Result<Self, CatalogError> {
        Ok(Self {
            uid: uid.to_string(),
            name: record.name,
            units: record.units,
            stack_size_diminish: record.stack_size_diminish,
            stack: DrainageTable::from_rows(uid, PipeRun::Stack, record.stack)?,
            horizontal: DrainageTable::from_rows(uid, PipeRun::Horizontal, record.horizontal)?,
            vent: DrainageTable::from_rows(uid, PipeRun::Vent, record.vent)?,
        })
    }
}
