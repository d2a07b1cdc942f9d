use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::edge::{size_edge, EdgePlan, SizedEdge};
use super::result::{EdgeResult, FixtureResult, Severity, SizingReport, Violation, ViolationKind};
use crate::catalog::{Catalog, CatalogError, FluidRole, PsdStandard};
use crate::demand::DemandError;
use crate::hydraulics::{self, FluidError, FluidProperties, FrictionError, SolverSettings};
use crate::interpolation::InterpolationError;
use crate::network::{
    self, AccumulateError, LoadTotals, Network, NodeId, NodeKind, ProjectSnapshot, TopologyError,
};

/// 결과를 만들 수 없는 치명적 오류. 부분 결과는 내지 않는다.
#[derive(Debug, thiserror::Error)]
pub enum SizingError {
    #[error("배관망 구조 오류: {0}")]
    Topology(#[from] TopologyError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Demand(#[from] DemandError),
    #[error(transparent)]
    Accumulate(#[from] AccumulateError),
    #[error(transparent)]
    Fluid(#[from] FluidError),
    #[error("'{entity}' 카탈로그 표 조회 실패: {source}")]
    Lookup {
        entity: String,
        source: InterpolationError,
    },
    #[error("구간 '{edge}' 손실 계산 실패: {source}")]
    Friction { edge: String, source: FrictionError },
    #[error("구간 '{edge}'의 고정 호칭경 {nominal_mm} mm가 재질 '{material}'에 없습니다")]
    UnknownPipeSize {
        edge: String,
        material: String,
        nominal_mm: f64,
    },
    #[error("구간 '{edge}'에 사용할 호칭경 목록이 없습니다")]
    MissingPipeSizes { edge: String },
    #[error("기기 '{device}'에 사용할 사이즈가 없습니다")]
    MissingDeviceSizes { device: String },
    #[error("설정 오류: {0}")]
    InvalidSetting(String),
    #[error("계산이 취소되었습니다")]
    Cancelled,
}

/// 엔진 기본값. 프로젝트/구간 값이 있으면 그쪽이 우선한다.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingSettings {
    pub solver: SolverSettings,
    /// 없으면 계통별 기본 유속
    pub default_max_velocity_m_s: Option<f64>,
    pub default_spare_capacity_pct: f64,
    /// 없으면 계통별 기본 온도
    pub default_temperature_c: Option<f64>,
}

impl Default for SizingSettings {
    fn default() -> Self {
        Self {
            solver: SolverSettings::default(),
            default_max_velocity_m_s: None,
            default_spare_capacity_pct: 0.0,
            default_temperature_c: None,
        }
    }
}

/// 계통별 기본 운전 온도 [°C]
pub fn role_temperature_c(role: FluidRole) -> f64 {
    match role {
        FluidRole::ColdWater => 20.0,
        FluidRole::HotWater => 65.0,
        FluidRole::WarmWater => 50.0,
    }
}

/// 계통별 기본 최대 유속 [m/s]
pub fn role_max_velocity_m_s(role: FluidRole) -> f64 {
    match role {
        FluidRole::ColdWater => 1.5,
        FluidRole::HotWater | FluidRole::WarmWater => 1.2,
    }
}

/// 구간 사이에서 확인하는 협조적 취소 플래그.
#[derive(Debug, Clone, Default)]
pub struct Cancellation(Arc<AtomicBool>);

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// 한 번의 실행에 필요한 불변 데이터.
pub(crate) struct RunContext<'a> {
    pub network: Network,
    pub settings: &'a SizingSettings,
    pub standard: &'a PsdStandard,
    pub dwelling_standard: Option<&'a PsdStandard>,
    pub role: FluidRole,
    pub fluid: FluidProperties,
    pub totals: Vec<LoadTotals>,
    pub plans: Vec<EdgePlan<'a>>,
    /// 공급 압력에서 높이차만 뺀 노드별 가용 압력 [kPa]
    pub static_available_kpa: Vec<f64>,
    /// 특정 구간/노드에 속하지 않는 경고
    pub run_violations: Vec<Violation>,
}

/// 배관망 사이징 엔진. 카탈로그는 한 번 읽어 공유한다.
#[derive(Debug, Clone)]
pub struct SizingEngine {
    catalog: Arc<Catalog>,
    settings: SizingSettings,
}

impl SizingEngine {
    pub fn new(catalog: Arc<Catalog>, settings: SizingSettings) -> Self {
        Self { catalog, settings }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn settings(&self) -> &SizingSettings {
        &self.settings
    }

    pub fn size(&self, snapshot: &ProjectSnapshot) -> Result<SizingReport, SizingError> {
        self.size_with_cancel(snapshot, &Cancellation::new())
    }

    /// 같은 스냅샷을 여러 유량 기준으로 동시에 계산한다. 결과는 입력 순서를 따른다.
    pub fn size_with_standards(
        &self,
        snapshot: &ProjectSnapshot,
        standards: &[String],
    ) -> Vec<(String, Result<SizingReport, SizingError>)> {
        standards
            .par_iter()
            .map(|uid| {
                let mut variant = snapshot.clone();
                variant.psd_standard = uid.clone();
                (uid.clone(), self.size(&variant))
            })
            .collect()
    }

    pub fn size_with_cancel(
        &self,
        snapshot: &ProjectSnapshot,
        cancel: &Cancellation,
    ) -> Result<SizingReport, SizingError> {
        let span = tracing::info_span!("size", project = %snapshot.name);
        let _guard = span.enter();
        tracing::info!(
            nodes = snapshot.nodes.len(),
            edges = snapshot.edges.len(),
            standard = %snapshot.psd_standard,
            "사이징 시작"
        );

        let ctx = self.prepare(snapshot)?;
        let sized = self.size_bottom_up(&ctx, cancel)?;
        let report = self.propagate(snapshot, &ctx, sized);

        tracing::info!(
            violations = report.violations.len(),
            errors = report.violations.iter().filter(|v| v.severity == Severity::Error).count(),
            "사이징 완료"
        );
        Ok(report)
    }

    fn prepare<'a>(&'a self, snapshot: &'a ProjectSnapshot) -> Result<RunContext<'a>, SizingError> {
        let catalog = self.catalog.as_ref();
        let network = Network::from_snapshot(snapshot)?;
        let role = snapshot.role;
        let standard = catalog.psd_standard(&snapshot.psd_standard)?;
        let dwelling_standard = snapshot
            .dwelling_standard
            .as_deref()
            .map(|uid| catalog.dwelling_standard(uid))
            .transpose()?;

        let root = network.root();
        let source_pressure_kpa = match network.node(root).kind {
            NodeKind::Source { pressure_kpa } => pressure_kpa,
            _ => return Err(SizingError::Topology(TopologyError::MissingSource)),
        };
        let temperature_c = snapshot
            .temperature_c
            .or(self.settings.default_temperature_c)
            .unwrap_or_else(|| role_temperature_c(role));
        let lookup = hydraulics::properties(
            catalog.fluid(&snapshot.fluid)?,
            temperature_c,
            source_pressure_kpa,
        )?;
        let fluid = lookup.properties;
        let mut run_violations = Vec::new();
        if let Some(used_temperature_c) = lookup.clamped_temperature_c {
            tracing::warn!(
                fluid = %snapshot.fluid,
                temperature_c,
                used_temperature_c,
                "유체 물성 자료 범위 밖, 경계 온도 사용"
            );
            run_violations.push(Violation::new(
                &snapshot.fluid,
                ViolationKind::FluidTemperatureOutOfRange {
                    fluid: snapshot.fluid.clone(),
                    temperature_c,
                    used_temperature_c,
                },
            ));
        }

        let spare_default = snapshot
            .spare_capacity_pct
            .unwrap_or(self.settings.default_spare_capacity_pct);
        let velocity_default = snapshot
            .max_velocity_m_s
            .or(self.settings.default_max_velocity_m_s)
            .unwrap_or_else(|| role_max_velocity_m_s(role));

        let mut plans = Vec::with_capacity(network.edge_count());
        for id in network.edge_ids() {
            let edge = network.edge(id);
            let material = catalog.pipe(&edge.material)?;
            let sizes = material
                .sizes(&edge.manufacturer)
                .ok_or_else(|| SizingError::MissingPipeSizes {
                    edge: edge.uid.clone(),
                })?;
            let fixed = match edge.nominal_mm {
                Some(nominal) => Some(
                    sizes
                        .iter()
                        .find(|s| s.nominal_mm == nominal)
                        .copied()
                        .ok_or_else(|| SizingError::UnknownPipeSize {
                            edge: edge.uid.clone(),
                            material: material.uid.clone(),
                            nominal_mm: nominal,
                        })?,
                ),
                None => None,
            };
            let mut fittings = Vec::with_capacity(edge.fittings.len());
            for fitting in &edge.fittings {
                fittings.push((catalog.valve(&fitting.valve)?, fitting.count));
            }
            let mut devices = Vec::with_capacity(edge.devices.len());
            for reference in &edge.devices {
                let device = catalog.device(&reference.device)?;
                let device_sizes = device.sizes(&reference.manufacturer).ok_or_else(|| {
                    SizingError::MissingDeviceSizes {
                        device: device.uid.clone(),
                    }
                })?;
                devices.push((device, device_sizes, reference.manufacturer.clone()));
            }
            let max_velocity_m_s = edge.max_velocity_m_s.unwrap_or(velocity_default);
            let spare_capacity_pct = edge.spare_capacity_pct.unwrap_or(spare_default);
            if !(max_velocity_m_s > 0.0) {
                return Err(SizingError::InvalidSetting(format!(
                    "구간 '{}' 최대 유속 {max_velocity_m_s}",
                    edge.uid
                )));
            }
            if !(spare_capacity_pct >= 0.0) {
                return Err(SizingError::InvalidSetting(format!(
                    "구간 '{}' 여유율 {spare_capacity_pct}%",
                    edge.uid
                )));
            }
            plans.push(EdgePlan {
                sizes,
                fixed,
                fittings,
                devices,
                max_velocity_m_s,
                spare_capacity_pct,
            });
        }

        let totals = network::accumulate(&network, catalog, standard, role)?;

        let root_elevation = network.node(root).elevation_m;
        let static_available_kpa = (0..network.node_count())
            .map(|i| {
                let dz = network.node(NodeId(i)).elevation_m - root_elevation;
                source_pressure_kpa
                    - hydraulics::head_to_kpa(
                        dz,
                        fluid.density_kg_m3,
                        self.settings.solver.gravity_m_s2,
                    )
            })
            .collect();

        Ok(RunContext {
            network,
            settings: &self.settings,
            standard,
            dwelling_standard,
            role,
            fluid,
            totals,
            plans,
            static_available_kpa,
            run_violations,
        })
    }

    // 가장 깊은 단계부터 구간을 병렬로 선정한다. 단계 사이가 곧 동기화 지점이다.
    fn size_bottom_up(
        &self,
        ctx: &RunContext<'_>,
        cancel: &Cancellation,
    ) -> Result<Vec<Option<SizedEdge>>, SizingError> {
        let network = &ctx.network;
        let mut sized: Vec<Option<SizedEdge>> = vec![None; network.edge_count()];
        let mut required_kpa = vec![0.0_f64; network.node_count()];

        for level in network.levels_bottom_up() {
            for &e in &level {
                let n = network.edge_to(e);
                let own = self.node_requirement_kpa(ctx, n)?;
                let below = network
                    .downstream_edges(n)
                    .iter()
                    .filter_map(|c| sized[c.0].as_ref())
                    .map(|s| s.required_upstream_kpa)
                    .fold(0.0_f64, f64::max);
                required_kpa[n.0] = own.max(below);
            }

            let results = level
                .par_iter()
                .map(|&e| {
                    if cancel.is_cancelled() {
                        return Err(SizingError::Cancelled);
                    }
                    let n = network.edge_to(e);
                    size_edge(ctx, e, required_kpa[n.0]).map(|s| (e, s))
                })
                .collect::<Result<Vec<_>, _>>()?;
            for (e, s) in results {
                sized[e.0] = Some(s);
            }
        }
        Ok(sized)
    }

    // 기구 노드에서 필요한 압력: 최소 입구 압력 + 토출구 높이
    fn node_requirement_kpa(&self, ctx: &RunContext<'_>, id: NodeId) -> Result<f64, SizingError> {
        match &ctx.network.node(id).kind {
            NodeKind::Fixture { fixture, .. } => {
                let spec = self.catalog.fixture(fixture)?;
                Ok(spec.min_inlet_pressure_kpa
                    + hydraulics::head_to_kpa(
                        spec.outlet_above_floor_m,
                        ctx.fluid.density_kg_m3,
                        self.settings.solver.gravity_m_s2,
                    ))
            }
            _ => Ok(0.0),
        }
    }

    // 모든 구간 선정이 끝난 뒤 공급점부터 압력을 내려보내며 검토한다.
    fn propagate(
        &self,
        snapshot: &ProjectSnapshot,
        ctx: &RunContext<'_>,
        sized: Vec<Option<SizedEdge>>,
    ) -> SizingReport {
        let network = &ctx.network;
        let g = self.settings.solver.gravity_m_s2;
        let rho = ctx.fluid.density_kg_m3;
        let mut pressure: Vec<Option<f64>> = vec![None; network.node_count()];
        let root = network.root();
        if let NodeKind::Source { pressure_kpa } = network.node(root).kind {
            pressure[root.0] = Some(pressure_kpa);
        }

        for &n in network.top_down() {
            let Some(e) = network.upstream_edge(n) else {
                continue;
            };
            let u = network.edge_from(e);
            pressure[n.0] = match (&sized[e.0], pressure[u.0]) {
                (Some(s), Some(p)) if s.resolved => Some(p - s.pressure_drop_kpa()),
                _ => None,
            };
        }

        let mut edge_violations: Vec<Vec<Violation>> = vec![Vec::new(); network.edge_count()];
        let mut edges = Vec::with_capacity(network.edge_count());
        for id in network.edge_ids() {
            let edge = network.edge(id);
            let u = network.edge_from(id);
            let n = network.edge_to(id);
            let Some(s) = sized[id.0].as_ref() else {
                continue;
            };
            let violations = &mut edge_violations[id.0];
            violations.extend(s.violations.iter().cloned());

            if let (Some(size), Some(p_up)) = (s.size, pressure[u.0]) {
                let peak = pressure[n.0].map_or(p_up, |p_down| p_up.max(p_down));
                if peak > size.safe_working_pressure_kpa {
                    violations.push(Violation::new(
                        &edge.uid,
                        ViolationKind::PipePressureExceeded {
                            pressure_kpa: peak,
                            safe_working_pressure_kpa: size.safe_working_pressure_kpa,
                        },
                    ));
                }
            }
            if let Some(p_up) = pressure[u.0] {
                for (result, (device, device_sizes, _)) in s.devices.iter().zip(&ctx.plans[id.0].devices) {
                    let Some(size) = device_sizes.iter().find(|d| d.label == result.size) else {
                        continue;
                    };
                    if let Some(min_kpa) = size.min_inlet_pressure_kpa {
                        if p_up < min_kpa {
                            violations.push(Violation::new(
                                &edge.uid,
                                ViolationKind::DeviceInletPressureLow {
                                    device: device.uid.clone(),
                                    pressure_kpa: p_up,
                                    min_kpa,
                                },
                            ));
                        }
                    }
                    if let Some(max_kpa) = size.max_inlet_pressure_kpa {
                        if p_up > max_kpa {
                            violations.push(Violation::new(
                                &edge.uid,
                                ViolationKind::DeviceInletPressureHigh {
                                    device: device.uid.clone(),
                                    pressure_kpa: p_up,
                                    max_kpa,
                                },
                            ));
                        }
                    }
                }
            }

            edges.push(EdgeResult {
                uid: edge.uid.clone(),
                from: edge.from.clone(),
                to: edge.to.clone(),
                raw_flow_ls: s.raw_flow_ls,
                design_flow_ls: s.design_flow_ls,
                nominal_mm: s.size.map(|z| z.nominal_mm),
                internal_diameter_mm: s.size.map(|z| z.internal_diameter_mm),
                velocity_m_s: s.loss.velocity_m_s,
                friction_loss_kpa: s.loss.friction_loss_kpa,
                fitting_loss_kpa: s.loss.fitting_loss_kpa,
                device_loss_kpa: s.device_net_kpa,
                static_head_kpa: s.static_head_kpa,
                total_loss_kpa: s.pressure_drop_kpa(),
                upstream_pressure_kpa: pressure[u.0],
                downstream_pressure_kpa: pressure[n.0],
                resolved: s.resolved,
                devices: s.devices.clone(),
            });
        }

        let mut node_violations = Vec::new();
        let mut fixtures = Vec::new();
        for (i, node) in snapshot.nodes.iter().enumerate() {
            let NodeKind::Fixture { fixture, .. } = &node.kind else {
                continue;
            };
            // 카탈로그 참조는 prepare 단계에서 이미 확인됨
            let Ok(spec) = self.catalog.fixture(fixture) else {
                continue;
            };
            let outlet_kpa = hydraulics::head_to_kpa(spec.outlet_above_floor_m, rho, g);
            let node_pressure = pressure[i];
            let residual = node_pressure.map(|p| p - outlet_kpa);
            match residual {
                None => node_violations.push(Violation::new(
                    &node.uid,
                    ViolationKind::UpstreamUnresolved,
                )),
                Some(r) if r < spec.min_inlet_pressure_kpa => node_violations.push(Violation::new(
                    &node.uid,
                    ViolationKind::InsufficientPressure {
                        residual_kpa: r,
                        min_kpa: spec.min_inlet_pressure_kpa,
                    },
                )),
                Some(r) if r > spec.max_inlet_pressure_kpa => node_violations.push(Violation::new(
                    &node.uid,
                    ViolationKind::FixturePressureExceeded {
                        residual_kpa: r,
                        max_kpa: spec.max_inlet_pressure_kpa,
                    },
                )),
                Some(_) => {}
            }
            fixtures.push(FixtureResult {
                uid: node.uid.clone(),
                fixture: fixture.clone(),
                node_pressure_kpa: node_pressure,
                residual_pressure_kpa: residual,
                min_inlet_pressure_kpa: spec.min_inlet_pressure_kpa,
                max_inlet_pressure_kpa: spec.max_inlet_pressure_kpa,
            });
        }

        let mut violations: Vec<Violation> = ctx
            .run_violations
            .iter()
            .cloned()
            .chain(edge_violations.into_iter().flatten())
            .chain(node_violations)
            .collect();
        violations.sort_by_key(|v| v.severity);

        SizingReport {
            project: snapshot.name.clone(),
            psd_standard: snapshot.psd_standard.clone(),
            edges,
            fixtures,
            violations,
        }
    }
}
