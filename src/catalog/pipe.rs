use std::collections::BTreeMap;

use serde::Deserialize;

use super::CatalogError;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PipeRecord {
    pub name: String,
    #[serde(default)]
    pub abbreviation: String,
    pub manufacturers: BTreeMap<String, BTreeMap<String, PipeSizeRecord>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PipeSizeRecord {
    pub internal_diameter_mm: f64,
    pub outside_diameter_mm: f64,
    pub colebrook_roughness_mm: f64,
    pub safe_working_pressure_kpa: f64,
}

/// 호칭경 하나의 치수/조도/허용 압력.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipeSize {
    pub nominal_mm: f64,
    pub internal_diameter_mm: f64,
    pub outside_diameter_mm: f64,
    /// Colebrook-White 절대 조도 [mm]
    pub roughness_mm: f64,
    pub safe_working_pressure_kpa: f64,
}

/// 배관 재질. 제조사마다 호칭경 오름차순 목록을 가진다.
#[derive(Debug, Clone, PartialEq)]
pub struct PipeMaterial {
    pub uid: String,
    pub name: String,
    pub abbreviation: String,
    manufacturers: BTreeMap<String, Vec<PipeSize>>,
}

impl PipeMaterial {
    /// 제조사의 호칭경 목록(오름차순). 없으면 generic 으로 폴백한다.
    pub fn sizes(&self, manufacturer: &str) -> Option<&[PipeSize]> {
        self.manufacturers
            .get(manufacturer)
            .or_else(|| self.manufacturers.get("generic"))
            .map(Vec::as_slice)
    }

    pub(crate) fn from_record(uid: &str, record: PipeRecord) -> Result<Self, CatalogError> {
        let malformed = |message: String| CatalogError::Malformed {
            uid: uid.to_string(),
            message,
        };
        let mut manufacturers = BTreeMap::new();
        for (manufacturer, sizes) in record.manufacturers {
            let mut list = Vec::with_capacity(sizes.len());
            for (nominal, s) in sizes {
                let nominal_mm = nominal
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| malformed(format!("호칭경 '{nominal}'이 숫자가 아닙니다")))?;
                let fields = [
                    nominal_mm,
                    s.internal_diameter_mm,
                    s.outside_diameter_mm,
                    s.colebrook_roughness_mm,
                    s.safe_working_pressure_kpa,
                ];
                if fields.iter().any(|v| !v.is_finite() || *v < 0.0) {
                    return Err(malformed(format!("호칭경 {nominal_mm}의 값이 잘못되었습니다")));
                }
                if s.internal_diameter_mm <= 0.0 || s.internal_diameter_mm > s.outside_diameter_mm
                {
                    return Err(malformed(format!(
                        "호칭경 {nominal_mm}: 내경 {}이 외경 {}보다 큽니다",
                        s.internal_diameter_mm, s.outside_diameter_mm
                    )));
                }
                list.push(PipeSize {
                    nominal_mm,
                    internal_diameter_mm: s.internal_diameter_mm,
                    outside_diameter_mm: s.outside_diameter_mm,
                    roughness_mm: s.colebrook_roughness_mm,
                    safe_working_pressure_kpa: s.safe_working_pressure_kpa,
                });
            }
            list.sort_by(|a, b| a.nominal_mm.total_cmp(&b.nominal_mm));
            if let Some(w) = list.windows(2).find(|w| w[0].nominal_mm == w[1].nominal_mm) {
                return Err(malformed(format!(
                    "{manufacturer}: 호칭경 {}이 중복됩니다",
                    w[0].nominal_mm
                )));
            }
            if list.is_empty() {
                return Err(malformed(format!("{manufacturer}: 호칭경이 없습니다")));
            }
            manufacturers.insert(manufacturer, list);
        }
        if manufacturers.is_empty() {
            return Err(malformed("제조사가 없습니다".into()));
        }
        Ok(Self {
            uid: uid.to_string(),
            name: record.name,
            abbreviation: record.abbreviation,
            manufacturers,
        })
    }
}
