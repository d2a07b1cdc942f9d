//! 구간 하나의 설계 유량, 기기 선정, 호칭경 선정.

use super::engine::{RunContext, SizingError};
use super::result::{DeviceResult, Violation, ViolationKind};
use crate::catalog::{Device, DeviceSize, PipeSize, Valve};
use crate::demand::{self, DemandEstimate};
use crate::hydraulics::{self, FrictionError, SegmentLoss, SegmentLossInput};
use crate::interpolation::InterpolationError;
use crate::network::EdgeId;

/// 카탈로그 참조를 미리 풀어 둔 구간 계획.
#[derive(Debug)]
pub(crate) struct EdgePlan<'a> {
    pub sizes: &'a [PipeSize],
    pub fixed: Option<PipeSize>,
    pub fittings: Vec<(&'a Valve, u32)>,
    pub devices: Vec<(&'a Device, &'a [DeviceSize], String)>,
    pub max_velocity_m_s: f64,
    pub spare_capacity_pct: f64,
}

/// 상향 단계에서 한 구간을 처리한 결과.
#[derive(Debug, Clone)]
pub(crate) struct SizedEdge {
    pub raw_flow_ls: f64,
    pub design_flow_ls: f64,
    pub size: Option<PipeSize>,
    pub loss: SegmentLoss,
    pub devices: Vec<DeviceResult>,
    /// 기기 손실 합 - 펌프 승압 [kPa]
    pub device_net_kpa: f64,
    /// 하류가 높으면 양수 [kPa]
    pub static_head_kpa: f64,
    /// 이 구간 상류 끝에서 필요한 압력 [kPa]
    pub required_upstream_kpa: f64,
    pub resolved: bool,
    pub violations: Vec<Violation>,
}

impl SizedEdge {
    /// 상류에서 하류로 갈 때의 압력 변화(손실 양수).
    pub fn pressure_drop_kpa(&self) -> f64 {
        self.loss.total_loss_kpa + self.device_net_kpa + self.static_head_kpa
    }
}

/// 유량을 포함하는 가장 작은 기기 사이즈.
/// 최소 유량에 못 미치면 최대 유량이 충분한 첫 사이즈와 경고를,
/// 최대 유량을 넘으면 가장 큰 사이즈와 경고를 돌려준다. 무유량은 경고하지 않는다.
pub fn select_device_size<'a>(
    device: &Device,
    sizes: &'a [DeviceSize],
    flow_ls: f64,
) -> Option<(&'a DeviceSize, Option<ViolationKind>)> {
    if let Some(size) = sizes.iter().find(|s| s.contains_flow(flow_ls)) {
        return Some((size, None));
    }
    if let Some(size) = sizes.iter().find(|s| s.max_flow_ls >= flow_ls) {
        let warning = (flow_ls > 0.0).then(|| ViolationKind::DeviceBelowMinFlow {
            device: device.uid.clone(),
            flow_ls,
            min_flow_ls: size.min_flow_ls,
        });
        return Some((size, warning));
    }
    let largest = sizes.last()?;
    Some((
        largest,
        Some(ViolationKind::DeviceMaxFlowExceeded {
            device: device.uid.clone(),
            flow_ls,
            max_flow_ls: largest.max_flow_ls,
        }),
    ))
}

/// 기기 곡선의 압력 변화. 무유량이면 0, 범위를 넘으면 경계값을 쓴다.
pub fn device_pressure_kpa(size: &DeviceSize, flow_ls: f64) -> Result<f64, InterpolationError> {
    if flow_ls <= 0.0 {
        return Ok(0.0);
    }
    match size.curve.interpolate(flow_ls) {
        Ok(v) => Ok(v),
        Err(InterpolationError::OutOfRange { nearest, .. }) => Ok(nearest),
        Err(e) => Err(e),
    }
}

pub(crate) fn size_edge(
    ctx: &RunContext<'_>,
    id: EdgeId,
    required_downstream_kpa: f64,
) -> Result<SizedEdge, SizingError> {
    let network = &ctx.network;
    let edge = network.edge(id);
    let plan = &ctx.plans[id.0];
    let upstream = network.edge_from(id);
    let downstream = network.edge_to(id);
    let totals = ctx.totals[downstream.0];
    let mut violations = Vec::new();

    // 1) 설계 유량
    let psd = demand::estimate(
        ctx.standard,
        ctx.role,
        totals.units,
        totals.max_single_units,
    )?;
    let dwelling = match ctx.dwelling_standard {
        Some(standard) if totals.dwellings > 0 => {
            demand::estimate(standard, ctx.role, f64::from(totals.dwellings), 0.0)?
        }
        _ => DemandEstimate {
            flow_ls: 0.0,
            warnings: Vec::new(),
        },
    };
    for warning in psd.warnings.into_iter().chain(dwelling.warnings) {
        violations.push(Violation::new(&edge.uid, warning.into()));
    }
    let raw_flow_ls = psd.flow_ls + dwelling.flow_ls + totals.continuous_flow_ls;
    let design_flow_ls = raw_flow_ls * (1.0 + plan.spare_capacity_pct / 100.0);

    // 2) 기기
    let mut devices = Vec::with_capacity(plan.devices.len());
    let mut device_net_kpa = 0.0;
    for (device, sizes, manufacturer) in &plan.devices {
        let (size, warning) = select_device_size(device, sizes, design_flow_ls).ok_or_else(
            || SizingError::MissingDeviceSizes {
                device: device.uid.clone(),
            },
        )?;
        if let Some(kind) = warning {
            violations.push(Violation::new(&edge.uid, kind));
        }
        let magnitude =
            device_pressure_kpa(size, design_flow_ls).map_err(|source| SizingError::Lookup {
                entity: device.uid.clone(),
                source,
            })?;
        let change = if device.kind.boosts() {
            -magnitude
        } else {
            magnitude
        };
        device_net_kpa += change;
        devices.push(DeviceResult {
            device: device.uid.clone(),
            manufacturer: manufacturer.clone(),
            size: size.label.clone(),
            flow_ls: design_flow_ls,
            pressure_change_kpa: change,
        });
    }

    let dz = network.node(downstream).elevation_m - network.node(upstream).elevation_m;
    let static_head_kpa = hydraulics::head_to_kpa(
        dz,
        ctx.fluid.density_kg_m3,
        ctx.settings.solver.gravity_m_s2,
    );
    let available_kpa = ctx.static_available_kpa[upstream.0];

    // 3) 호칭경 후보를 작은 것부터 시험
    let candidates: &[PipeSize] = match &plan.fixed {
        Some(fixed) => std::slice::from_ref(fixed),
        None => plan.sizes,
    };
    let mut chosen: Option<(PipeSize, SegmentLoss)> = None;
    let mut fallback: Option<(PipeSize, SegmentLoss)> = None;
    for size in candidates {
        let mut k_total = 0.0;
        for (valve, count) in &plan.fittings {
            let k = valve
                .k_value(size.nominal_mm)
                .map_err(|source| SizingError::Lookup {
                    entity: valve.uid.clone(),
                    source,
                })?;
            k_total += k * f64::from(*count);
        }
        let input = SegmentLossInput {
            flow_ls: design_flow_ls,
            internal_diameter_mm: size.internal_diameter_mm,
            length_m: edge.length_m,
            roughness_mm: size.roughness_mm,
            density_kg_m3: ctx.fluid.density_kg_m3,
            dynamic_viscosity_pa_s: ctx.fluid.dynamic_viscosity_pa_s,
            k_total,
        };
        let loss = match hydraulics::segment_loss(input, &ctx.settings.solver) {
            Ok(loss) => loss,
            Err(FrictionError::Convergence { iterations, .. }) => {
                tracing::warn!(edge = %edge.uid, iterations, "마찰계수 수렴 실패, 구간 미해결");
                violations.push(Violation::new(
                    &edge.uid,
                    ViolationKind::Convergence { iterations },
                ));
                return Ok(SizedEdge {
                    raw_flow_ls,
                    design_flow_ls,
                    size: None,
                    loss: SegmentLoss::default(),
                    devices,
                    device_net_kpa,
                    static_head_kpa,
                    required_upstream_kpa: required_downstream_kpa
                        + device_net_kpa
                        + static_head_kpa,
                    resolved: false,
                    violations,
                });
            }
            Err(e) => {
                return Err(SizingError::Friction {
                    edge: edge.uid.clone(),
                    source: e,
                })
            }
        };
        let needed =
            required_downstream_kpa + loss.total_loss_kpa + device_net_kpa + static_head_kpa;
        let accepted = loss.velocity_m_s <= plan.max_velocity_m_s && available_kpa >= needed;
        if accepted {
            chosen = Some((*size, loss));
            break;
        }
        fallback = Some((*size, loss));
    }

    let (size, loss) = match (chosen, fallback) {
        (Some(found), _) => found,
        (None, Some((size, loss))) => {
            let kind = if plan.fixed.is_some() {
                ViolationKind::OverriddenSizeInsufficient {
                    nominal_mm: size.nominal_mm,
                    velocity_m_s: loss.velocity_m_s,
                    max_velocity_m_s: plan.max_velocity_m_s,
                }
            } else {
                ViolationKind::NoSuitablePipeSize {
                    design_flow_ls,
                    velocity_m_s: loss.velocity_m_s,
                    max_velocity_m_s: plan.max_velocity_m_s,
                }
            };
            violations.push(Violation::new(&edge.uid, kind));
            (size, loss)
        }
        (None, None) => {
            return Err(SizingError::MissingPipeSizes {
                edge: edge.uid.clone(),
            })
        }
    };

    tracing::debug!(
        edge = %edge.uid,
        flow_ls = design_flow_ls,
        nominal_mm = size.nominal_mm,
        velocity_m_s = loss.velocity_m_s,
        loss_kpa = loss.total_loss_kpa,
        "구간 호칭경 선정"
    );

    Ok(SizedEdge {
        raw_flow_ls,
        design_flow_ls,
        size: Some(size),
        required_upstream_kpa: required_downstream_kpa
            + loss.total_loss_kpa
            + device_net_kpa
            + static_head_kpa,
        loss,
        devices,
        device_net_kpa,
        static_head_kpa,
        resolved: true,
        violations,
    })
}
