use serde::Serialize;

use crate::demand::DemandWarning;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// 검토에서 발견한 문제.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ViolationKind {
    /// 어떤 호칭경도 유속/압력 조건을 만족하지 못해 최대 호칭경을 사용함
    NoSuitablePipeSize {
        design_flow_ls: f64,
        velocity_m_s: f64,
        max_velocity_m_s: f64,
    },
    /// 고정 호칭경이 조건을 만족하지 못함
    OverriddenSizeInsufficient {
        nominal_mm: f64,
        velocity_m_s: f64,
        max_velocity_m_s: f64,
    },
    /// 마찰계수 반복이 수렴하지 않아 구간을 풀지 못함
    Convergence { iterations: u32 },
    Extrapolated { standard: String, key: f64 },
    OutOfRange {
        standard: String,
        key: f64,
        nearest: f64,
    },
    UnsupportedDwellingCount {
        standard: String,
        count: u32,
        max: u32,
    },
    PipePressureExceeded {
        pressure_kpa: f64,
        safe_working_pressure_kpa: f64,
    },
    DeviceMaxFlowExceeded {
        device: String,
        flow_ls: f64,
        max_flow_ls: f64,
    },
    DeviceBelowMinFlow {
        device: String,
        flow_ls: f64,
        min_flow_ls: f64,
    },
    DeviceInletPressureLow {
        device: String,
        pressure_kpa: f64,
        min_kpa: f64,
    },
    DeviceInletPressureHigh {
        device: String,
        pressure_kpa: f64,
        max_kpa: f64,
    },
    InsufficientPressure { residual_kpa: f64, min_kpa: f64 },
    FixturePressureExceeded { residual_kpa: f64, max_kpa: f64 },
    /// 상류 구간이 풀리지 않아 압력을 전파하지 못함
    UpstreamUnresolved,
    /// 운전 온도가 유체 물성 자료 범위 밖이라 경계 온도의 물성을 사용함
    FluidTemperatureOutOfRange {
        fluid: String,
        temperature_c: f64,
        used_temperature_c: f64,
    },
    /// 배수 부하가 관경표의 최대 부하를 넘어 가장 큰 관경을 사용함
    DrainageLoadExceeded { units: f64, max_units: f64 },
    /// 고정 호칭경이 배수 부하에 필요한 관경보다 작음
    DrainageSizeInsufficient { nominal_mm: f64, required_mm: f64 },
}

impl ViolationKind {
    pub fn severity(&self) -> Severity {
        match self {
            ViolationKind::Extrapolated { .. }
            | ViolationKind::OutOfRange { .. }
            | ViolationKind::UnsupportedDwellingCount { .. }
            | ViolationKind::DeviceMaxFlowExceeded { .. }
            | ViolationKind::DeviceBelowMinFlow { .. }
            | ViolationKind::FluidTemperatureOutOfRange { .. }
            | ViolationKind::DeviceInletPressureHigh { .. }
            | ViolationKind::FixturePressureExceeded { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// 번역 키 접미사로 쓰는 짧은 코드.
    pub fn code(&self) -> &'static str {
        match self {
            ViolationKind::NoSuitablePipeSize { .. } => "no_suitable_pipe_size",
            ViolationKind::OverriddenSizeInsufficient { .. } => "overridden_size_insufficient",
            ViolationKind::Convergence { .. } => "convergence",
            ViolationKind::Extrapolated { .. } => "extrapolated",
            ViolationKind::OutOfRange { .. } => "out_of_range",
            ViolationKind::UnsupportedDwellingCount { .. } => "unsupported_dwelling_count",
            ViolationKind::PipePressureExceeded { .. } => "pipe_pressure_exceeded",
            ViolationKind::DeviceMaxFlowExceeded { .. } => "device_max_flow_exceeded",
            ViolationKind::DeviceBelowMinFlow { .. } => "device_below_min_flow",
            ViolationKind::DeviceInletPressureLow { .. } => "device_inlet_pressure_low",
            ViolationKind::DeviceInletPressureHigh { .. } => "device_inlet_pressure_high",
            ViolationKind::InsufficientPressure { .. } => "insufficient_pressure",
            ViolationKind::FixturePressureExceeded { .. } => "fixture_pressure_exceeded",
            ViolationKind::UpstreamUnresolved => "upstream_unresolved",
            ViolationKind::FluidTemperatureOutOfRange { .. } => "fluid_temperature_out_of_range",
            ViolationKind::DrainageLoadExceeded { .. } => "drainage_load_exceeded",
            ViolationKind::DrainageSizeInsufficient { .. } => "drainage_size_insufficient",
        }
    }
}

impl From<DemandWarning> for ViolationKind {
    fn from(value: DemandWarning) -> Self {
        match value {
            DemandWarning::Extrapolated { standard, key } => {
                ViolationKind::Extrapolated { standard, key }
            }
            DemandWarning::OutOfRange {
                standard,
                key,
                nearest,
            } => ViolationKind::OutOfRange {
                standard,
                key,
                nearest,
            },
            DemandWarning::UnsupportedDwellingCount {
                standard,
                count,
                max,
            } => ViolationKind::UnsupportedDwellingCount {
                standard,
                count,
                max,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    /// 문제가 된 구간/노드 UID. 실행 전체에 대한 경고는 유체 UID.
    pub entity_uid: String,
    pub severity: Severity,
    #[serde(flatten)]
    pub kind: ViolationKind,
}

impl Violation {
    pub fn new(entity_uid: impl Into<String>, kind: ViolationKind) -> Self {
        Self {
            entity_uid: entity_uid.into(),
            severity: kind.severity(),
            kind,
        }
    }
}

/// 구간에 선정된 기기.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceResult {
    pub device: String,
    pub manufacturer: String,
    pub size: String,
    pub flow_ls: f64,
    /// 손실이면 양수, 펌프 승압이면 음수 [kPa]
    pub pressure_change_kpa: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgeResult {
    pub uid: String,
    pub from: String,
    pub to: String,
    /// 여유율 적용 전 유량 [L/s]
    pub raw_flow_ls: f64,
    pub design_flow_ls: f64,
    pub nominal_mm: Option<f64>,
    pub internal_diameter_mm: Option<f64>,
    pub velocity_m_s: f64,
    pub friction_loss_kpa: f64,
    pub fitting_loss_kpa: f64,
    pub device_loss_kpa: f64,
    /// 높이차에 의한 압력 변화(상승이면 양수) [kPa]
    pub static_head_kpa: f64,
    pub total_loss_kpa: f64,
    pub upstream_pressure_kpa: Option<f64>,
    pub downstream_pressure_kpa: Option<f64>,
    /// false면 손실을 구하지 못해 압력 전파에서 제외됨
    pub resolved: bool,
    pub devices: Vec<DeviceResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixtureResult {
    pub uid: String,
    pub fixture: String,
    pub node_pressure_kpa: Option<f64>,
    /// 토출구 높이를 뺀 잔압 [kPa]
    pub residual_pressure_kpa: Option<f64>,
    pub min_inlet_pressure_kpa: f64,
    pub max_inlet_pressure_kpa: f64,
}

/// 한 번의 사이징 결과. 위반 사항은 오류가 먼저, 이후 구간 순서대로 정렬된다.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SizingReport {
    pub project: String,
    pub psd_standard: String,
    pub edges: Vec<EdgeResult>,
    pub fixtures: Vec<FixtureResult>,
    pub violations: Vec<Violation>,
}

impl SizingReport {
    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == Severity::Error)
    }

    pub fn edge(&self, uid: &str) -> Option<&EdgeResult> {
        self.edges.iter().find(|e| e.uid == uid)
    }

    pub fn fixture(&self, uid: &str) -> Option<&FixtureResult> {
        self.fixtures.iter().find(|f| f.uid == uid)
    }

    pub fn violations_for<'a>(&'a self, uid: &'a str) -> impl Iterator<Item = &'a Violation> {
        self.violations.iter().filter(move |v| v.entity_uid == uid)
    }
}
