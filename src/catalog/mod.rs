//! 참조 카탈로그(기구, 배관, 밸브, 기기, 유량 기준, 유체, 배수 계통).
//! TOML 레코드를 한 번 읽어 검증된 불변 타입으로 바꾸고, 이후에는 `Arc<Catalog>`로 공유한다.

pub mod device;
pub mod drainage;
pub mod fixture;
pub mod fluid;
pub mod pipe;
pub mod standard;
pub mod valve;

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

pub use device::{Device, DeviceKind, DeviceSize};
pub use drainage::{DrainageSize, DrainageSystem, DrainageTable, DrainageUnits};
pub use fixture::{FixtureSpec, FluidRole};
pub use fluid::{Fluid, FluidModel, FluidState};
pub use pipe::{PipeMaterial, PipeSize};
pub use standard::{Accumulation, Frequency, HotCold, PsdKind, PsdStandard};
pub use valve::Valve;

use crate::demand::equation::FormulaError;
use crate::interpolation::InterpolationError;

/// 카탈로그 로드/조회 오류. 모두 치명적이다.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("카탈로그 파일 입출력 오류: {0}")]
    Io(#[from] std::io::Error),
    #[error("카탈로그 파싱 오류: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("카탈로그에 {kind} '{uid}' 항목이 없습니다")]
    UnknownEntry { kind: &'static str, uid: String },
    #[error("카탈로그 항목 '{uid}' 오류: {message}")]
    Malformed { uid: String, message: String },
    #[error("카탈로그 항목 '{uid}' 표 오류: {source}")]
    Table {
        uid: String,
        source: InterpolationError,
    },
    #[error("카탈로그 항목 '{uid}' 수식 오류: {source}")]
    Formula { uid: String, source: FormulaError },
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    fixtures: BTreeMap<String, FixtureSpec>,
    #[serde(default)]
    pipes: BTreeMap<String, pipe::PipeRecord>,
    #[serde(default)]
    valves: BTreeMap<String, valve::ValveRecord>,
    #[serde(default)]
    devices: BTreeMap<String, device::DeviceRecord>,
    #[serde(default)]
    psd_standards: BTreeMap<String, standard::StandardRecord>,
    #[serde(default)]
    dwelling_standards: BTreeMap<String, standard::StandardRecord>,
    #[serde(default)]
    fluids: BTreeMap<String, fluid::FluidRecord>,
    #[serde(default)]
    drainage_systems: BTreeMap<String, drainage::DrainageRecord>,
}

/// 한 번의 실행 동안 바뀌지 않는 참조 데이터.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub fixtures: BTreeMap<String, FixtureSpec>,
    pub pipes: BTreeMap<String, PipeMaterial>,
    pub valves: BTreeMap<String, Valve>,
    pub devices: BTreeMap<String, Device>,
    pub psd_standards: BTreeMap<String, PsdStandard>,
    pub dwelling_standards: BTreeMap<String, PsdStandard>,
    pub fluids: BTreeMap<String, Fluid>,
    pub drainage_systems: BTreeMap<String, DrainageSystem>,
}

impl Catalog {
    /// 파일에서 카탈로그를 읽는다.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(src: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(src)?;
        let mut catalog = Catalog::default();

        for (uid, mut spec) in file.fixtures {
            spec.uid = uid.clone();
            spec.validate()?;
            catalog.fixtures.insert(uid, spec);
        }
        for (uid, record) in file.pipes {
            let material = PipeMaterial::from_record(&uid, record)?;
            catalog.pipes.insert(uid, material);
        }
        for (uid, record) in file.valves {
            let valve = Valve::from_record(&uid, record)?;
            catalog.valves.insert(uid, valve);
        }
        for (uid, record) in file.devices {
            let device = Device::from_record(&uid, record)?;
            catalog.devices.insert(uid, device);
        }
        for (uid, record) in file.psd_standards {
            let standard = PsdStandard::from_record(&uid, record)?;
            catalog.psd_standards.insert(uid, standard);
        }
        for (uid, record) in file.dwelling_standards {
            let standard = PsdStandard::from_record(&uid, record)?;
            if !matches!(
                standard.kind,
                PsdKind::Equation(_) | PsdKind::DwellingHotColdTable(_)
            ) {
                return Err(CatalogError::Malformed {
                    uid,
                    message: "세대 기준은 수식 또는 세대 냉온수 표여야 합니다".into(),
                });
            }
            catalog.dwelling_standards.insert(uid, standard);
        }
        for (uid, record) in file.fluids {
            let fluid = Fluid::from_record(&uid, record)?;
            catalog.fluids.insert(uid, fluid);
        }
        for (uid, record) in file.drainage_systems {
            let system = DrainageSystem::from_record(&uid, record)?;
            catalog.drainage_systems.insert(uid, system);
        }

        tracing::debug!(
            fixtures = catalog.fixtures.len(),
            pipes = catalog.pipes.len(),
            valves = catalog.valves.len(),
            devices = catalog.devices.len(),
            psd_standards = catalog.psd_standards.len(),
            drainage_systems = catalog.drainage_systems.len(),
            "카탈로그 로드 완료"
        );
        Ok(catalog)
    }

    pub fn fixture(&self, uid: &str) -> Result<&FixtureSpec, CatalogError> {
        lookup(&self.fixtures, "기구", uid)
    }

    pub fn pipe(&self, uid: &str) -> Result<&PipeMaterial, CatalogError> {
        lookup(&self.pipes, "배관 재질", uid)
    }

    pub fn valve(&self, uid: &str) -> Result<&Valve, CatalogError> {
        lookup(&self.valves, "밸브", uid)
    }

    pub fn device(&self, uid: &str) -> Result<&Device, CatalogError> {
        lookup(&self.devices, "기기", uid)
    }

    pub fn psd_standard(&self, uid: &str) -> Result<&PsdStandard, CatalogError> {
        lookup(&self.psd_standards, "동시사용 기준", uid)
    }

    pub fn dwelling_standard(&self, uid: &str) -> Result<&PsdStandard, CatalogError> {
        lookup(&self.dwelling_standards, "세대 기준", uid)
    }

    pub fn fluid(&self, uid: &str) -> Result<&Fluid, CatalogError> {
        lookup(&self.fluids, "유체", uid)
    }

    pub fn drainage_system(&self, uid: &str) -> Result<&DrainageSystem, CatalogError> {
        lookup(&self.drainage_systems, "배수 계통", uid)
    }
}

fn lookup<'a, T>(
    map: &'a BTreeMap<String, T>,
    kind: &'static str,
    uid: &str,
) -> Result<&'a T, CatalogError> {
    map.get(uid).ok_or_else(|| CatalogError::UnknownEntry {
        kind,
        uid: uid.to_string(),
    })
}
