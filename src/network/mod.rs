//! 공급점(급수) 또는 방류점(배수)을 뿌리로 하는 배관망 트리.
//! 스냅샷(serde) → 인덱스 기반 아레나 검증 → 하향 순서/깊이별 단계 → 부하 상향 합산.

pub mod accumulate;
pub mod snapshot;
pub mod topology;

pub use accumulate::{accumulate, node_load, AccumulateError, LoadTotals};
pub use snapshot::{
    DeviceRef, DrainageProject, EdgeSpec, FittingRef, NodeKind, NodeSpec, PipeRun,
    ProjectSnapshot, SnapshotError,
};
pub use topology::{EdgeId, Network, NodeId, RootKind, TopologyError};
