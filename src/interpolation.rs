//! 카탈로그 전반에서 재사용하는 보간/조회 도구.
//! - 1차원 구간 선형 보간 (하한 유지/엄격, 상한 외삽/천장)
//! - 최대 단일 부하 기준 2차원 조회
//! - 구경 범위("15-16", "65-80") 조회

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 보간/조회 오류.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InterpolationError {
    /// 테이블 범위를 벗어난 조회. `nearest`는 대신 사용할 경계값이다.
    #[error("조회 키 {key}가 테이블 범위({lower}~{upper})를 벗어났습니다 (경계값 {nearest} 사용)")]
    OutOfRange {
        key: f64,
        lower: f64,
        upper: f64,
        nearest: f64,
    },
    /// 범위 조회 결과가 정확히 하나가 아님
    #[error("값 {value}에 일치하는 범위가 {matches}개입니다")]
    NoMatchingRange { value: f64, matches: usize },
    /// 테이블 자체가 잘못됨
    #[error("잘못된 테이블: {0}")]
    Malformed(String),
}

/// 최소 키 아래 조회 시 동작.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LowerBound {
    /// 최소 키의 값을 그대로 사용
    #[default]
    HoldLow,
    /// 범위 밖 오류
    Strict,
}

/// 보간 결과와 외삽 여부.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lookup {
    pub value: f64,
    /// true면 최대 키를 넘어 마지막 기울기로 외삽한 값이다.
    pub extrapolated: bool,
}

/// 키 오름차순 1차원 테이블.
#[derive(Debug, Clone, PartialEq)]
pub struct Table1D {
    keys: Vec<f64>,
    values: Vec<f64>,
    lower: LowerBound,
    ceiling: Option<f64>,
}

impl Table1D {
    /// (키, 값) 목록으로 테이블을 만든다. 키는 정렬되며 중복은 허용하지 않는다.
    pub fn new(mut points: Vec<(f64, f64)>) -> Result<Self, InterpolationError> {
        if points.is_empty() {
            return Err(InterpolationError::Malformed("빈 테이블".into()));
        }
        for &(k, v) in &points {
            if !k.is_finite() || !v.is_finite() {
                return Err(InterpolationError::Malformed(format!(
                    "유한하지 않은 항목 ({k}, {v})"
                )));
            }
            if v < 0.0 {
                return Err(InterpolationError::Malformed(format!(
                    "키 {k}의 값 {v}이 음수입니다"
                )));
            }
        }
        points.sort_by(|a, b| a.0.total_cmp(&b.0));
        if let Some(w) = points.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(InterpolationError::Malformed(format!("중복 키 {}", w[0].0)));
        }
        let (keys, values) = points.into_iter().unzip();
        Ok(Self {
            keys,
            values,
            lower: LowerBound::HoldLow,
            ceiling: None,
        })
    }

    /// 값이 키를 따라 감소하지 않아야 하는 테이블(동시사용 유량표 등).
    pub fn non_decreasing(points: Vec<(f64, f64)>) -> Result<Self, InterpolationError> {
        let table = Self::new(points)?;
        for i in 1..table.values.len() {
            if table.values[i] < table.values[i - 1] {
                return Err(InterpolationError::Malformed(format!(
                    "키 {}에서 값이 감소합니다 ({} → {})",
                    table.keys[i],
                    table.values[i - 1],
                    table.values[i]
                )));
            }
        }
        Ok(table)
    }

    /// 문자열 키 맵(TOML 테이블)을 숫자 키 목록으로 바꾼다.
    pub fn points_from_map(
        map: &BTreeMap<String, f64>,
    ) -> Result<Vec<(f64, f64)>, InterpolationError> {
        map.iter()
            .map(|(k, v)| {
                k.trim()
                    .parse::<f64>()
                    .map(|key| (key, *v))
                    .map_err(|_| InterpolationError::Malformed(format!("숫자가 아닌 키 '{k}'")))
            })
            .collect()
    }

    pub fn with_lower_bound(mut self, lower: LowerBound) -> Self {
        self.lower = lower;
        self
    }

    pub fn with_ceiling(mut self, ceiling: Option<f64>) -> Self {
        self.ceiling = ceiling;
        self
    }

    pub fn keys(&self) -> &[f64] {
        &self.keys
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn min_key(&self) -> f64 {
        self.keys[0]
    }

    pub fn max_key(&self) -> f64 {
        self.keys[self.keys.len() - 1]
    }

    pub fn ceiling(&self) -> Option<f64> {
        self.ceiling
    }

    /// 보간값만 필요할 때 사용한다.
    pub fn interpolate(&self, key: f64) -> Result<f64, InterpolationError> {
        self.interpolate_detailed(key).map(|l| l.value)
    }

    /// 경계 정책을 적용해 보간한다.
    pub fn interpolate_detailed(&self, key: f64) -> Result<Lookup, InterpolationError> {
        if !key.is_finite() {
            return Err(InterpolationError::Malformed(format!("조회 키 {key}")));
        }
        if let Some(ceiling) = self.ceiling {
            if key > ceiling {
                return Err(InterpolationError::OutOfRange {
                    key,
                    lower: self.min_key(),
                    upper: ceiling,
                    nearest: self.evaluate(ceiling).value,
                });
            }
        }
        if key < self.min_key() {
            return match self.lower {
                LowerBound::HoldLow => Ok(Lookup {
                    value: self.values[0],
                    extrapolated: false,
                }),
                LowerBound::Strict => Err(InterpolationError::OutOfRange {
                    key,
                    lower: self.min_key(),
                    upper: self.ceiling.unwrap_or_else(|| self.max_key()),
                    nearest: self.values[0],
                }),
            };
        }
        Ok(self.evaluate(key))
    }

    // key >= min_key 가정. 최대 키 위는 마지막 기울기로 외삽한다.
    fn evaluate(&self, key: f64) -> Lookup {
        let n = self.keys.len();
        if key <= self.keys[0] {
            return Lookup {
                value: self.values[0],
                extrapolated: false,
            };
        }
        let idx = self.keys.partition_point(|k| *k < key);
        if idx < n {
            if self.keys[idx] == key {
                return Lookup {
                    value: self.values[idx],
                    extrapolated: false,
                };
            }
            return Lookup {
                value: lerp(
                    self.keys[idx - 1],
                    self.values[idx - 1],
                    self.keys[idx],
                    self.values[idx],
                    key,
                ),
                extrapolated: false,
            };
        }
        if n == 1 {
            return Lookup {
                value: self.values[0],
                extrapolated: true,
            };
        }
        let value = lerp(
            self.keys[n - 2],
            self.values[n - 2],
            self.keys[n - 1],
            self.values[n - 1],
            key,
        );
        Lookup {
            value: value.max(0.0),
            extrapolated: true,
        }
    }
}

fn lerp(x0: f64, y0: f64, x1: f64, y1: f64, x: f64) -> f64 {
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// 닫힌 구간 [lower, upper]. upper가 무한대면 상한 없음.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Range {
    pub lower: f64,
    pub upper: f64,
}

impl Range {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    pub fn overlaps(&self, other: &Range) -> bool {
        self.lower <= other.upper && other.lower <= self.upper
    }
}

impl FromStr for Range {
    type Err = InterpolationError;

    /// "20", "15-16", "65-80", "0-1000000000", "300-"(상한 없음)을 받는다.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || InterpolationError::Malformed(format!("범위 형식 오류 '{s}'"));
        let parse = |t: &str| t.trim().parse::<f64>().map_err(|_| bad());
        let trimmed = s.trim();
        let range = match trimmed.split_once('-') {
            Some((lo, hi)) if hi.trim().is_empty() => Range {
                lower: parse(lo)?,
                upper: f64::INFINITY,
            },
            Some((lo, hi)) => Range {
                lower: parse(lo)?,
                upper: parse(hi)?,
            },
            None => {
                let v = parse(trimmed)?;
                Range { lower: v, upper: v }
            }
        };
        if range.lower.is_nan() || range.upper.is_nan() || range.lower > range.upper {
            return Err(bad());
        }
        Ok(range)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.upper.is_infinite() {
            write!(f, "{}-", self.lower)
        } else if self.lower == self.upper {
            write!(f, "{}", self.lower)
        } else {
            write!(f, "{}-{}", self.lower, self.upper)
        }
    }
}

/// 서로 겹치지 않는 범위 → 값 테이블.
#[derive(Debug, Clone, PartialEq)]
pub struct RangedTable<T> {
    entries: Vec<(Range, T)>,
}

impl<T> RangedTable<T> {
    pub fn new(mut entries: Vec<(Range, T)>) -> Result<Self, InterpolationError> {
        entries.sort_by(|a, b| a.0.lower.total_cmp(&b.0.lower));
        for w in entries.windows(2) {
            if w[0].0.overlaps(&w[1].0) {
                return Err(InterpolationError::Malformed(format!(
                    "범위 {}와 {}가 겹칩니다",
                    w[0].0, w[1].0
                )));
            }
        }
        Ok(Self { entries })
    }

    /// 문자열 범위 키를 한 번만 파싱해 테이블을 만든다.
    pub fn parse<'a, I>(raw: I) -> Result<Self, InterpolationError>
    where
        I: IntoIterator<Item = (&'a str, T)>,
    {
        let entries = raw
            .into_iter()
            .map(|(k, v)| k.parse::<Range>().map(|r| (r, v)))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(entries)
    }

    /// 값을 포함하는 유일한 범위의 항목을 돌려준다.
    pub fn lookup(&self, value: f64) -> Result<&T, InterpolationError> {
        let mut found = self.entries.iter().filter(|(r, _)| r.contains(value));
        match (found.next(), found.next()) {
            (Some((_, v)), None) => Ok(v),
            (None, _) => Err(InterpolationError::NoMatchingRange { value, matches: 0 }),
            (Some(_), Some(_)) => Err(InterpolationError::NoMatchingRange {
                value,
                matches: 2 + found.count(),
            }),
        }
    }

    pub fn entries(&self) -> &[(Range, T)] {
        &self.entries
    }
}

/// 최대 단일 부하 키 → 1차원 테이블.
#[derive(Debug, Clone, PartialEq)]
pub struct MaxKeyedTable {
    tables: Vec<(f64, Table1D)>,
}

impl MaxKeyedTable {
    pub fn new(mut tables: Vec<(f64, Table1D)>) -> Result<Self, InterpolationError> {
        if tables.is_empty() {
            return Err(InterpolationError::Malformed("하위 테이블 없음".into()));
        }
        tables.sort_by(|a, b| a.0.total_cmp(&b.0));
        if let Some(w) = tables.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(InterpolationError::Malformed(format!(
                "중복 최대 부하 키 {}",
                w[0].0
            )));
        }
        Ok(Self { tables })
    }

    /// `max_single` 이하인 가장 큰 키의 하위 테이블. 모든 키보다 작으면 첫 테이블.
    pub fn select(&self, max_single: f64) -> (f64, &Table1D) {
        let idx = self.tables.partition_point(|(k, _)| *k <= max_single);
        let (key, table) = &self.tables[idx.saturating_sub(1)];
        (*key, table)
    }

    pub fn interpolate(&self, max_single: f64, total: f64) -> Result<Lookup, InterpolationError> {
        self.select(max_single).1.interpolate_detailed(total)
    }

    pub fn keys(&self) -> impl Iterator<Item = f64> + '_ {
        self.tables.iter().map(|(k, _)| *k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> Table1D {
        Table1D::non_decreasing(vec![(1.0, 0.1), (3.0, 0.3), (5.0, 0.4)]).unwrap()
    }

    #[test]
    fn exact_at_breakpoints_and_linear_between() {
        let t = table();
        assert_eq!(t.interpolate(3.0).unwrap(), 0.3);
        assert!((t.interpolate(2.0).unwrap() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn below_lowest_key_follows_policy() {
        assert_eq!(table().interpolate(0.0).unwrap(), 0.1);
        let strict = table().with_lower_bound(LowerBound::Strict);
        assert!(matches!(
            strict.interpolate(0.5),
            Err(InterpolationError::OutOfRange { nearest, .. }) if nearest == 0.1
        ));
    }

    #[test]
    fn above_highest_key_extrapolates_unless_ceiling() {
        let l = table().interpolate_detailed(7.0).unwrap();
        assert!(l.extrapolated);
        assert!((l.value - 0.5).abs() < 1e-12);

        let capped = table().with_ceiling(Some(5.0));
        assert!(matches!(
            capped.interpolate(6.0),
            Err(InterpolationError::OutOfRange { nearest, .. }) if nearest == 0.4
        ));
    }

    #[test]
    fn rejects_decreasing_and_duplicate_keys() {
        assert!(Table1D::non_decreasing(vec![(1.0, 0.5), (2.0, 0.4)]).is_err());
        assert!(Table1D::new(vec![(1.0, 0.5), (1.0, 0.6)]).is_err());
        assert!(Table1D::new(vec![]).is_err());
    }

    #[test]
    fn range_parsing() {
        assert_eq!(
            "65-80".parse::<Range>().unwrap(),
            Range {
                lower: 65.0,
                upper: 80.0
            }
        );
        assert_eq!("20".parse::<Range>().unwrap().upper, 20.0);
        assert!("300-".parse::<Range>().unwrap().upper.is_infinite());
        assert!("abc".parse::<Range>().is_err());
        assert!("80-65".parse::<Range>().is_err());
    }

    #[test]
    fn ranged_lookup_requires_unique_match() {
        let t = RangedTable::parse([("15-16", 0.81), ("20", 0.75), ("65-80", 0.54)]).unwrap();
        assert_eq!(*t.lookup(70.0).unwrap(), 0.54);
        assert_eq!(*t.lookup(16.0).unwrap(), 0.81);
        assert!(matches!(
            t.lookup(18.0),
            Err(InterpolationError::NoMatchingRange { matches: 0, .. })
        ));
        assert!(RangedTable::parse([("15-20", 1.0), ("20-25", 2.0)]).is_err());
    }

    #[test]
    fn max_keyed_selects_greatest_key_not_above() {
        let sub = |v: f64| Table1D::new(vec![(0.0, 0.0), (10.0, v)]).unwrap();
        let t = MaxKeyedTable::new(vec![(2.0, sub(1.0)), (3.0, sub(2.0)), (5.0, sub(3.0))])
            .unwrap();
        assert_eq!(t.select(4.0).0, 3.0);
        assert_eq!(t.select(5.0).0, 5.0);
        assert_eq!(t.select(1.0).0, 2.0);
        assert_eq!(t.interpolate(9.0, 10.0).unwrap().value, 3.0);
    }
}
