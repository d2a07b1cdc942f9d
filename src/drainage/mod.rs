//! 배수(오수) 배관 사이징.
//! 기구 배수 부하를 방류점 쪽으로 합산하고, 구간 용도(스택/횡주관/통기관)별 관경표에서 호칭경과 구배를 고른다.

use serde::Serialize;

use crate::catalog::{Catalog, CatalogError, DrainageSystem, DrainageUnits};
use crate::network::{DrainageProject, Network, NodeId, NodeKind, PipeRun, TopologyError};
use crate::sizing::{Severity, Violation, ViolationKind};

#[derive(Debug, thiserror::Error)]
pub enum DrainageError {
    #[error("배관망 구조 오류: {0}")]
    Topology(#[from] TopologyError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("기구 '{fixture}'에 배수 계통 '{system}'에 필요한 {quantity} 값이 없습니다")]
    MissingFixtureValue {
        fixture: String,
        system: String,
        quantity: &'static str,
    },
    #[error("통기관 '{0}' 아래에 배수 부하가 있습니다")]
    LoadOnVent(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrainageEdgeResult {
    pub uid: String,
    pub from: String,
    pub to: String,
    pub run: PipeRun,
    /// 구간이 받는 배수 부하. 통기관은 분기한 배수 노드의 부하다.
    pub units: f64,
    /// 관경 선정에 쓴 부하. 고정 스택이면 스택 최대 부하다.
    pub sizing_units: f64,
    pub nominal_mm: f64,
    pub internal_diameter_mm: Option<f64>,
    /// 횡주관 최소 구배 [%]
    pub grade_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrainageReport {
    pub project: String,
    pub drainage_system: String,
    pub units: DrainageUnits,
    pub edges: Vec<DrainageEdgeResult>,
    pub violations: Vec<Violation>,
}

impl DrainageReport {
    pub fn has_errors(&self) -> bool {
        self.violations.iter().any(|v| v.severity == Severity::Error)
    }

    pub fn edge(&self, uid: &str) -> Option<&DrainageEdgeResult> {
        self.edges.iter().find(|e| e.uid == uid)
    }
}

/// 배수 배관망 전체의 관경을 고른다.
pub fn size_drainage(
    catalog: &Catalog,
    project: &DrainageProject,
) -> Result<DrainageReport, DrainageError> {
    let span = tracing::info_span!("size_drainage", project = %project.name);
    let _guard = span.enter();

    let network = Network::from_drainage(project)?;
    let system = catalog.drainage_system(&project.drainage_system)?;
    tracing::info!(
        nodes = network.node_count(),
        edges = network.edge_count(),
        system = %system.uid,
        "배수 사이징 시작"
    );

    let totals = accumulate_units(&network, catalog, system)?;

    let mut units = vec![0.0_f64; network.edge_count()];
    for id in network.edge_ids() {
        let edge = network.edge(id);
        let below = totals[network.edge_to(id).0];
        units[id.0] = if edge.run == PipeRun::Vent {
            if below > 0.0 {
                return Err(DrainageError::LoadOnVent(edge.uid.clone()));
            }
            totals[vent_root(&network, network.edge_from(id)).0]
        } else {
            below
        };
    }
    let sizing_units = if system.stack_size_diminish {
        units.clone()
    } else {
        fixed_stack_units(&network, &units)
    };

    let mut edges = Vec::with_capacity(network.edge_count());
    let mut violations = Vec::new();
    for id in network.edge_ids() {
        let edge = network.edge(id);
        let table = system.table(edge.run);
        let load = sizing_units[id.0];
        let size = match table.select(load) {
            Some(size) => size,
            None => {
                tracing::warn!(edge = %edge.uid, units = load, "배수 부하가 관경표를 넘음");
                violations.push(Violation::new(
                    &edge.uid,
                    ViolationKind::DrainageLoadExceeded {
                        units: load,
                        max_units: table.max_units(),
                    },
                ));
                table.largest()
            }
        };
        let nominal_mm = match edge.nominal_mm {
            Some(fixed) => {
                if fixed < size.nominal_mm {
                    violations.push(Violation::new(
                        &edge.uid,
                        ViolationKind::DrainageSizeInsufficient {
                            nominal_mm: fixed,
                            required_mm: size.nominal_mm,
                        },
                    ));
                }
                fixed
            }
            None => size.nominal_mm,
        };
        let internal_diameter_mm = catalog
            .pipe(&edge.material)?
            .sizes(&edge.manufacturer)
            .and_then(|sizes| sizes.iter().find(|s| s.nominal_mm == nominal_mm))
            .map(|s| s.internal_diameter_mm);

        tracing::debug!(
            edge = %edge.uid,
            run = edge.run.as_str(),
            units = load,
            nominal_mm,
            "배수 구간 관경 선정"
        );
        edges.push(DrainageEdgeResult {
            uid: edge.uid.clone(),
            from: edge.from.clone(),
            to: edge.to.clone(),
            run: edge.run,
            units: units[id.0],
            sizing_units: load,
            nominal_mm,
            internal_diameter_mm,
            grade_pct: size.grade_pct,
        });
    }
    violations.sort_by_key(|v| v.severity);

    tracing::info!(violations = violations.len(), "배수 사이징 완료");
    Ok(DrainageReport {
        project: project.name.clone(),
        drainage_system: system.uid.clone(),
        units: system.units,
        edges,
        violations,
    })
}

// 노드 아래 가지 전체의 배수 부하. 결과는 노드 인덱스 순서다.
fn accumulate_units(
    network: &Network,
    catalog: &Catalog,
    system: &DrainageSystem,
) -> Result<Vec<f64>, DrainageError> {
    let mut totals = vec![0.0_f64; network.node_count()];
    for &id in network.top_down().iter().rev() {
        let own = match &network.node(id).kind {
            NodeKind::Fixture { fixture, .. } => {
                let spec = catalog.fixture(fixture)?;
                system
                    .units
                    .of(spec)
                    .ok_or_else(|| DrainageError::MissingFixtureValue {
                        fixture: spec.uid.clone(),
                        system: system.uid.clone(),
                        quantity: system.units.label(),
                    })?
            }
            NodeKind::LoadNode { loading_units, .. } => *loading_units,
            _ => 0.0,
        };
        totals[id.0] += own;
        if let Some(e) = network.upstream_edge(id) {
            let parent = network.edge_from(e);
            totals[parent.0] += totals[id.0];
        }
    }
    Ok(totals)
}

// 통기관이 분기한 배수 노드: 통기관이 아닌 구간을 만날 때까지 방류점 쪽으로 올라간다
fn vent_root(network: &Network, start: NodeId) -> NodeId {
    let mut node = start;
    while let Some(e) = network.upstream_edge(node) {
        if network.edge(e).run != PipeRun::Vent {
            break;
        }
        node = network.edge_from(e);
    }
    node
}

// 이어진 스택 구간을 한 묶음으로 보고 묶음의 최대 부하로 맞춘다
fn fixed_stack_units(network: &Network, units: &[f64]) -> Vec<f64> {
    let mut group: Vec<Option<usize>> = vec![None; network.edge_count()];
    let mut group_max: Vec<f64> = Vec::new();
    for &n in network.top_down() {
        let Some(e) = network.upstream_edge(n) else {
            continue;
        };
        if network.edge(e).run != PipeRun::Stack {
            continue;
        }
        let parent_group = network
            .upstream_edge(network.edge_from(e))
            .and_then(|p| group[p.0]);
        let g = match parent_group {
            Some(g) => g,
            None => {
                group_max.push(0.0);
                group_max.len() - 1
            }
        };
        group[e.0] = Some(g);
        group_max[g] = group_max[g].max(units[e.0]);
    }
    units
        .iter()
        .zip(&group)
        .map(|(u, g)| g.map_or(*u, |g| group_max[g]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::{EdgeSpec, NodeSpec, RootKind};

    fn node(uid: &str, kind: NodeKind) -> NodeSpec {
        NodeSpec {
            uid: uid.into(),
            elevation_m: 0.0,
            kind,
        }
    }

    fn edge(uid: &str, from: &str, to: &str, run: PipeRun) -> EdgeSpec {
        EdgeSpec {
            uid: uid.into(),
            from: from.into(),
            to: to.into(),
            length_m: 3.0,
            material: "pvc".into(),
            manufacturer: "generic".into(),
            nominal_mm: None,
            max_velocity_m_s: None,
            spare_capacity_pct: None,
            fittings: Vec::new(),
            devices: Vec::new(),
            run,
        }
    }

    fn load(units: f64) -> NodeKind {
        NodeKind::LoadNode {
            loading_units: units,
            max_single_units: 0.0,
            dwellings: 0,
            continuous_flow_ls: 0.0,
        }
    }

    #[test]
    fn contiguous_stack_segments_share_the_largest_load() {
        // outlet ─h─ base ─s─ l1 ─s─ l2, 각 층에 부하
        let nodes = vec![
            node("outlet", NodeKind::Outlet),
            node("base", NodeKind::Junction),
            node("l1", load(10.0)),
            node("l2", load(5.0)),
        ];
        let edges = vec![
            edge("drain", "outlet", "base", PipeRun::Horizontal),
            edge("s1", "base", "l1", PipeRun::Stack),
            edge("s2", "l1", "l2", PipeRun::Stack),
        ];
        let network = Network::build(nodes, edges, RootKind::Outlet).unwrap();
        let units = [15.0, 15.0, 5.0];
        assert_eq!(fixed_stack_units(&network, &units), vec![15.0, 15.0, 15.0]);
    }

    #[test]
    fn vent_takes_load_of_the_node_it_leaves() {
        let nodes = vec![
            node("outlet", NodeKind::Outlet),
            node("j", load(8.0)),
            node("v1", NodeKind::Junction),
            node("v2", NodeKind::Junction),
        ];
        let edges = vec![
            edge("drain", "outlet", "j", PipeRun::Horizontal),
            edge("vent1", "j", "v1", PipeRun::Vent),
            edge("vent2", "v1", "v2", PipeRun::Vent),
        ];
        let network = Network::build(nodes, edges, RootKind::Outlet).unwrap();
        let v2 = NodeId(3);
        assert_eq!(vent_root(&network, v2), NodeId(1));
    }
}
