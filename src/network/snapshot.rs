use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::catalog::FluidRole;

#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("프로젝트 파일 입출력 오류: {0}")]
    Io(#[from] std::io::Error),
    #[error("프로젝트 파일 파싱 오류: {0}")]
    Parse(#[from] toml::de::Error),
}

fn generic() -> String {
    "generic".to_string()
}

fn default_option() -> String {
    "default".to_string()
}

fn one() -> u32 {
    1
}

/// 한 번의 계산에 넘기는 배관망 스냅샷. 엔진은 이것을 수정하지 않는다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSnapshot {
    pub name: String,
    pub role: FluidRole,
    /// 동시사용 유량 기준 UID
    pub psd_standard: String,
    /// 세대 기준 UID. 지정하면 부하 노드의 세대 유량을 더한다.
    #[serde(default)]
    pub dwelling_standard: Option<String>,
    /// 유체 UID
    pub fluid: String,
    #[serde(default)]
    pub temperature_c: Option<f64>,
    #[serde(default)]
    pub spare_capacity_pct: Option<f64>,
    #[serde(default)]
    pub max_velocity_m_s: Option<f64>,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
}

impl ProjectSnapshot {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(src: &str) -> Result<Self, SnapshotError> {
        Ok(toml::from_str(src)?)
    }
}

/// 배수 계통 스냅샷. 방류점을 뿌리로 하고 기구가 말단이다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrainageProject {
    pub name: String,
    /// 배수 계통 UID
    pub drainage_system: String,
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
}

impl DrainageProject {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SnapshotError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(src: &str) -> Result<Self, SnapshotError> {
        Ok(toml::from_str(src)?)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub uid: String,
    /// 기준면 대비 높이 [m]
    #[serde(default)]
    pub elevation_m: f64,
    #[serde(flatten)]
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    /// 공급점. 게이지 압력 [kPa]
    Source { pressure_kpa: f64 },
    /// 배수 계통의 방류점(공공 하수관 연결부)
    Outlet,
    Fixture {
        fixture: String,
        #[serde(default = "generic")]
        manufacturer: String,
        #[serde(default = "default_option")]
        option: String,
    },
    /// 집계된 부하. `loading_units`는 기준이 합산하는 양으로 적는다.
    LoadNode {
        #[serde(default)]
        loading_units: f64,
        #[serde(default)]
        max_single_units: f64,
        #[serde(default)]
        dwellings: u32,
        #[serde(default)]
        continuous_flow_ls: f64,
    },
    Junction,
}

/// 배수 배관의 용도. 급수 계통에서는 쓰지 않는다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipeRun {
    /// 구배를 가진 횡주관
    #[default]
    Horizontal,
    /// 입상(스택)
    Stack,
    /// 통기관
    Vent,
}

impl PipeRun {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipeRun::Horizontal => "horizontal",
            PipeRun::Stack => "stack",
            PipeRun::Vent => "vent",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub uid: String,
    /// 뿌리(공급점/방류점) 쪽 노드 UID
    pub from: String,
    /// 말단 쪽 노드 UID
    pub to: String,
    pub length_m: f64,
    /// 배관 재질 UID
    pub material: String,
    #[serde(default = "generic")]
    pub manufacturer: String,
    /// 고정 호칭경 [mm]. 지정하면 선정 대신 검토만 한다.
    #[serde(default)]
    pub nominal_mm: Option<f64>,
    #[serde(default)]
    pub max_velocity_m_s: Option<f64>,
    #[serde(default)]
    pub spare_capacity_pct: Option<f64>,
    #[serde(default)]
    pub fittings: Vec<FittingRef>,
    #[serde(default)]
    pub devices: Vec<DeviceRef>,
    #[serde(default)]
    pub run: PipeRun,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittingRef {
    pub valve: String,
    #[serde(default = "one")]
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceRef {
    pub device: String,
    #[serde(default = "generic")]
    pub manufacturer: String,
}
