use serde::Serialize;

use super::snapshot::NodeKind;
use super::topology::{Network, NodeId};
use crate::catalog::{Catalog, CatalogError, FluidRole, PsdStandard};
use crate::demand::{self, DemandError};

#[derive(Debug, thiserror::Error)]
pub enum AccumulateError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Demand(#[from] DemandError),
}

/// 노드 아래 가지 전체의 부하 합계.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct LoadTotals {
    /// 기준이 합산하는 양(LU, DU 또는 L/s)
    pub units: f64,
    pub max_single_units: f64,
    pub dwellings: u32,
    pub continuous_flow_ls: f64,
    pub fixture_count: u32,
}

impl LoadTotals {
    pub fn merge(&mut self, other: &LoadTotals) {
        self.units += other.units;
        self.max_single_units = self.max_single_units.max(other.max_single_units);
        self.dwellings += other.dwellings;
        self.continuous_flow_ls += other.continuous_flow_ls;
        self.fixture_count += other.fixture_count;
    }
}

/// 노드 자신의 부하.
pub fn node_load(
    network: &Network,
    id: NodeId,
    catalog: &Catalog,
    standard: &PsdStandard,
    role: FluidRole,
) -> Result<LoadTotals, AccumulateError> {
    let totals = match &network.node(id).kind {
        NodeKind::Fixture {
            fixture,
            manufacturer,
            option,
        } => {
            let spec = catalog.fixture(fixture)?;
            let units = demand::fixture_units(spec, standard, role, manufacturer, option)?;
            LoadTotals {
                units,
                max_single_units: units,
                dwellings: 0,
                continuous_flow_ls: spec.continuous_flow_ls.unwrap_or(0.0),
                fixture_count: 1,
            }
        }
        NodeKind::LoadNode {
            loading_units,
            max_single_units,
            dwellings,
            continuous_flow_ls,
        } => LoadTotals {
            units: *loading_units,
            max_single_units: *max_single_units,
            dwellings: *dwellings,
            continuous_flow_ls: *continuous_flow_ls,
            fixture_count: 0,
        },
        NodeKind::Source { .. } | NodeKind::Outlet | NodeKind::Junction => LoadTotals::default(),
    };
    Ok(totals)
}

/// 하류에서 상류로 부하를 합산한다. 결과는 노드 인덱스 순서다.
pub fn accumulate(
    network: &Network,
    catalog: &Catalog,
    standard: &PsdStandard,
    role: FluidRole,
) -> Result<Vec<LoadTotals>, AccumulateError> {
    let mut totals = vec![LoadTotals::default(); network.node_count()];
    for &id in network.top_down().iter().rev() {
        let own = node_load(network, id, catalog, standard, role)?;
        totals[id.0].merge(&own);
        if let Some(e) = network.upstream_edge(id) {
            let parent = network.edge_from(e);
            let subtree = totals[id.0];
            totals[parent.0].merge(&subtree);
        }
    }
    Ok(totals)
}
