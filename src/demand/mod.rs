//! 동시사용 유량(PSD) 기준 해석.
//! 누적된 부하 단위/배수 단위/설계 유량과 최대 단일 부하로 설계 유량 [L/s]을 구한다.

pub mod equation;

use serde::Serialize;

pub use equation::{Formula, FormulaError};

use crate::catalog::{Accumulation, FixtureSpec, FluidRole, HotCold, PsdKind, PsdStandard};
use crate::interpolation::{InterpolationError, Lookup};

/// 결과를 낼 수 없는 기준 해석 오류.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DemandError {
    #[error("기준 '{standard}' 표 조회 실패: {source}")]
    Lookup {
        standard: String,
        source: InterpolationError,
    },
    #[error("기준 '{standard}' 수식 계산 실패: {source}")]
    Formula {
        standard: String,
        source: FormulaError,
    },
    #[error("기구 '{fixture}'에 기준 '{standard}'에 필요한 {quantity} 값이 없습니다")]
    MissingFixtureValue {
        fixture: String,
        standard: String,
        quantity: &'static str,
    },
}

/// 경계값으로 대체해 계산을 이어간 경우.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DemandWarning {
    /// 표의 최대 키를 넘어 외삽함
    Extrapolated { standard: String, key: f64 },
    /// 표 범위 밖이라 경계값을 사용함
    OutOfRange {
        standard: String,
        key: f64,
        nearest: f64,
    },
    /// 세대 표 최대 행을 넘는 세대 수
    UnsupportedDwellingCount {
        standard: String,
        count: u32,
        max: u32,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DemandEstimate {
    pub flow_ls: f64,
    pub warnings: Vec<DemandWarning>,
}

impl DemandEstimate {
    fn exact(flow_ls: f64) -> Self {
        Self {
            flow_ls,
            warnings: Vec::new(),
        }
    }
}

/// 기구 하나가 기준에 기여하는 양(빈도 계수 적용 후).
pub fn fixture_units(
    fixture: &FixtureSpec,
    standard: &PsdStandard,
    role: FluidRole,
    manufacturer: &str,
    option: &str,
) -> Result<f64, DemandError> {
    let (value, quantity) = match standard.accumulate {
        Accumulation::LoadingUnits => (
            fixture.loading_units(&standard.uid, role),
            "부하 단위",
        ),
        Accumulation::DischargeUnits => (fixture.en_discharge_units, "배수 단위"),
        Accumulation::DesignFlow => (fixture.design_flow(manufacturer, option), "설계 유량"),
    };
    let value = value.ok_or_else(|| DemandError::MissingFixtureValue {
        fixture: fixture.uid.clone(),
        standard: standard.uid.clone(),
        quantity,
    })?;
    let factor = standard.frequency.map(|f| f.factor()).unwrap_or(1.0);
    Ok(value * factor)
}

/// 누적값과 최대 단일 부하로 설계 유량을 구한다. 누적값이 0이면 유량도 0이다.
pub fn estimate(
    standard: &PsdStandard,
    role: FluidRole,
    accumulated: f64,
    max_single: f64,
) -> Result<DemandEstimate, DemandError> {
    if accumulated <= 0.0 {
        return Ok(DemandEstimate::exact(0.0));
    }
    let mut estimate = match &standard.kind {
        PsdKind::Equation(formula) => {
            let mut flow = formula
                .evaluate(accumulated)
                .map_err(|source| DemandError::Formula {
                    standard: standard.uid.clone(),
                    source,
                })?;
            if standard.accumulate == Accumulation::DesignFlow {
                // 동시사용 유량은 단순 합계를 넘지 않는다
                flow = flow.min(accumulated);
            }
            DemandEstimate::exact(flow)
        }
        PsdKind::LoadingUnitTable(table) => {
            from_lookup(standard, accumulated, table.interpolate_detailed(accumulated))?
        }
        PsdKind::MaxLoadingUnitTable(tables) => from_lookup(
            standard,
            accumulated,
            tables.interpolate(max_single, accumulated),
        )?,
        PsdKind::DwellingHotColdTable(rows) => {
            let count = accumulated.ceil() as u32;
            let pick = |row: &HotCold| if role.is_hot() { row.hot } else { row.cold };
            match rows.get(&count) {
                Some(row) => DemandEstimate::exact(pick(row)),
                None => match (rows.first_key_value(), rows.last_key_value()) {
                    (Some((&min, row)), _) if count < min => DemandEstimate::exact(pick(row)),
                    (_, Some((&max, row))) => {
                        tracing::warn!(
                            standard = %standard.uid,
                            count,
                            max,
                            "세대 표 범위를 넘는 세대 수"
                        );
                        DemandEstimate {
                            flow_ls: pick(row),
                            warnings: vec![DemandWarning::UnsupportedDwellingCount {
                                standard: standard.uid.clone(),
                                count,
                                max,
                            }],
                        }
                    }
                    _ => DemandEstimate::exact(0.0),
                },
            }
        }
    };
    estimate.flow_ls = estimate.flow_ls.max(0.0);
    Ok(estimate)
}

fn from_lookup(
    standard: &PsdStandard,
    key: f64,
    result: Result<Lookup, InterpolationError>,
) -> Result<DemandEstimate, DemandError> {
    match result {
        Ok(Lookup {
            value,
            extrapolated: false,
        }) => Ok(DemandEstimate::exact(value)),
        Ok(Lookup {
            value,
            extrapolated: true,
        }) => Ok(DemandEstimate {
            flow_ls: value,
            warnings: vec![DemandWarning::Extrapolated {
                standard: standard.uid.clone(),
                key,
            }],
        }),
        Err(InterpolationError::OutOfRange { nearest, .. }) => {
            tracing::warn!(standard = %standard.uid, key, nearest, "기준 표 범위 밖, 경계값 사용");
            Ok(DemandEstimate {
                flow_ls: nearest,
                warnings: vec![DemandWarning::OutOfRange {
                    standard: standard.uid.clone(),
                    key,
                    nearest,
                }],
            })
        }
        Err(source) => Err(DemandError::Lookup {
            standard: standard.uid.clone(),
            source,
        }),
    }
}
