use std::collections::{HashMap, HashSet, VecDeque};

use super::snapshot::{DrainageProject, EdgeSpec, NodeKind, NodeSpec, ProjectSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub usize);

/// 트리의 뿌리가 되는 노드 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    /// 급수/급탕: 공급점
    Source,
    /// 배수: 방류점
    Outlet,
}

impl RootKind {
    fn matches(&self, kind: &NodeKind) -> bool {
        match self {
            RootKind::Source => matches!(kind, NodeKind::Source { .. }),
            RootKind::Outlet => matches!(kind, NodeKind::Outlet),
        }
    }

    // 다른 계통의 뿌리 노드는 쓸 수 없다
    fn forbids(&self, kind: &NodeKind) -> bool {
        match self {
            RootKind::Source => matches!(kind, NodeKind::Outlet),
            RootKind::Outlet => matches!(kind, NodeKind::Source { .. }),
        }
    }
}

/// 배관망이 공급점/방류점을 뿌리로 하는 트리가 아님. 항상 치명적이다.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TopologyError {
    #[error("노드 UID '{0}'가 중복됩니다")]
    DuplicateNode(String),
    #[error("구간 UID '{0}'가 중복됩니다")]
    DuplicateEdge(String),
    #[error("구간 '{edge}'가 없는 노드 '{node}'를 참조합니다")]
    UnknownNode { edge: String, node: String },
    #[error("공급점(source) 노드가 없습니다")]
    MissingSource,
    #[error("공급점이 여러 개입니다: {0:?}")]
    MultipleSources(Vec<String>),
    #[error("방류점(outlet) 노드가 없습니다")]
    MissingOutlet,
    #[error("방류점이 여러 개입니다: {0:?}")]
    MultipleOutlets(Vec<String>),
    #[error("노드 '{0}'의 종류는 이 계통에서 쓸 수 없습니다")]
    UnexpectedNodeKind(String),
    #[error("노드 '{node}'의 상류 구간이 여러 개입니다: {edges:?}")]
    MultipleUpstream { node: String, edges: Vec<String> },
    #[error("뿌리 노드 '{0}'에 상류 구간이 있습니다")]
    RootHasUpstream(String),
    #[error("기구 노드 '{0}'에서 하류로 나가는 구간이 있습니다")]
    FixtureNotLeaf(String),
    #[error("노드 '{0}'가 순환 경로에 있습니다")]
    Cycle(String),
    #[error("노드 '{0}'가 뿌리 노드와 연결되어 있지 않습니다")]
    Disconnected(String),
    #[error("구간 '{edge}' 오류: {message}")]
    InvalidEdge { edge: String, message: String },
}

/// 인덱스로 다루는 트리형 배관망. 생성 시 구조를 모두 검증한다.
#[derive(Debug, Clone)]
pub struct Network {
    nodes: Vec<NodeSpec>,
    edges: Vec<EdgeSpec>,
    root: NodeId,
    edge_from: Vec<NodeId>,
    edge_to: Vec<NodeId>,
    upstream: Vec<Option<EdgeId>>,
    downstream: Vec<Vec<EdgeId>>,
    depth: Vec<usize>,
    top_down: Vec<NodeId>,
}

impl Network {
    /// 급수/급탕 스냅샷. 공급점이 뿌리다.
    pub fn from_snapshot(snapshot: &ProjectSnapshot) -> Result<Self, TopologyError> {
        Self::build(
            snapshot.nodes.clone(),
            snapshot.edges.clone(),
            RootKind::Source,
        )
    }

    /// 배수 스냅샷. 방류점이 뿌리다.
    pub fn from_drainage(project: &DrainageProject) -> Result<Self, TopologyError> {
        Self::build(
            project.nodes.clone(),
            project.edges.clone(),
            RootKind::Outlet,
        )
    }

    pub fn build(
        nodes: Vec<NodeSpec>,
        edges: Vec<EdgeSpec>,
        root_kind: RootKind,
    ) -> Result<Self, TopologyError> {
        if let Some(node) = nodes.iter().find(|n| root_kind.forbids(&n.kind)) {
            return Err(TopologyError::UnexpectedNodeKind(node.uid.clone()));
        }

        let mut index: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
        for (i, node) in nodes.iter().enumerate() {
            if index.insert(node.uid.as_str(), i).is_some() {
                return Err(TopologyError::DuplicateNode(node.uid.clone()));
            }
        }
        let mut edge_uids: HashSet<&str> = HashSet::with_capacity(edges.len());
        let mut edge_from = Vec::with_capacity(edges.len());
        let mut edge_to = Vec::with_capacity(edges.len());
        let mut upstream_lists: Vec<Vec<EdgeId>> = vec![Vec::new(); nodes.len()];
        let mut downstream: Vec<Vec<EdgeId>> = vec![Vec::new(); nodes.len()];

        for (i, edge) in edges.iter().enumerate() {
            if !edge_uids.insert(edge.uid.as_str()) {
                return Err(TopologyError::DuplicateEdge(edge.uid.clone()));
            }
            let resolve = |uid: &str| {
                index
                    .get(uid)
                    .copied()
                    .ok_or_else(|| TopologyError::UnknownNode {
                        edge: edge.uid.clone(),
                        node: uid.to_string(),
                    })
            };
            let from = resolve(&edge.from)?;
            let to = resolve(&edge.to)?;
            if from == to {
                return Err(TopologyError::InvalidEdge {
                    edge: edge.uid.clone(),
                    message: "양 끝 노드가 같습니다".into(),
                });
            }
            if !edge.length_m.is_finite() || edge.length_m < 0.0 {
                return Err(TopologyError::InvalidEdge {
                    edge: edge.uid.clone(),
                    message: format!("길이 {}", edge.length_m),
                });
            }
            edge_from.push(NodeId(from));
            edge_to.push(NodeId(to));
            upstream_lists[to].push(EdgeId(i));
            downstream[from].push(EdgeId(i));
        }

        let roots: Vec<usize> = nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| root_kind.matches(&n.kind))
            .map(|(i, _)| i)
            .collect();
        let root = match (roots.as_slice(), root_kind) {
            ([], RootKind::Source) => return Err(TopologyError::MissingSource),
            ([], RootKind::Outlet) => return Err(TopologyError::MissingOutlet),
            ([one], _) => *one,
            (many, kind) => {
                let uids = many.iter().map(|i| nodes[*i].uid.clone()).collect();
                return Err(match kind {
                    RootKind::Source => TopologyError::MultipleSources(uids),
                    RootKind::Outlet => TopologyError::MultipleOutlets(uids),
                });
            }
        };
        if !upstream_lists[root].is_empty() {
            return Err(TopologyError::RootHasUpstream(nodes[root].uid.clone()));
        }
        for (i, list) in upstream_lists.iter().enumerate() {
            if list.len() > 1 {
                return Err(TopologyError::MultipleUpstream {
                    node: nodes[i].uid.clone(),
                    edges: list.iter().map(|e| edges[e.0].uid.clone()).collect(),
                });
            }
            if matches!(nodes[i].kind, NodeKind::Fixture { .. }) && !downstream[i].is_empty() {
                return Err(TopologyError::FixtureNotLeaf(nodes[i].uid.clone()));
            }
        }
        let upstream: Vec<Option<EdgeId>> =
            upstream_lists.iter().map(|l| l.first().copied()).collect();

        // 뿌리에서 너비 우선으로 내려가며 깊이와 하향 순서를 만든다
        let mut depth = vec![usize::MAX; nodes.len()];
        let mut top_down = Vec::with_capacity(nodes.len());
        let mut queue = VecDeque::from([root]);
        depth[root] = 0;
        while let Some(n) = queue.pop_front() {
            top_down.push(NodeId(n));
            for e in &downstream[n] {
                let child = edge_to[e.0].0;
                if depth[child] == usize::MAX {
                    depth[child] = depth[n] + 1;
                    queue.push_back(child);
                }
            }
        }
        if let Some(lost) = (0..nodes.len()).find(|i| depth[*i] == usize::MAX) {
            return Err(unreachable_kind(lost, &nodes, &upstream, &edge_from));
        }

        Ok(Self {
            nodes,
            edges,
            root: NodeId(root),
            edge_from,
            edge_to,
            upstream,
            downstream,
            depth,
            top_down,
        })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &NodeSpec {
        &self.nodes[id.0]
    }

    pub fn edge(&self, id: EdgeId) -> &EdgeSpec {
        &self.edges[id.0]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn edge_ids(&self) -> impl Iterator<Item = EdgeId> {
        (0..self.edges.len()).map(EdgeId)
    }

    pub fn edge_from(&self, id: EdgeId) -> NodeId {
        self.edge_from[id.0]
    }

    pub fn edge_to(&self, id: EdgeId) -> NodeId {
        self.edge_to[id.0]
    }

    pub fn upstream_edge(&self, id: NodeId) -> Option<EdgeId> {
        self.upstream[id.0]
    }

    pub fn downstream_edges(&self, id: NodeId) -> &[EdgeId] {
        &self.downstream[id.0]
    }

    pub fn depth(&self, id: NodeId) -> usize {
        self.depth[id.0]
    }

    /// 뿌리부터의 너비 우선 순서. 부모가 항상 자식보다 앞에 온다.
    pub fn top_down(&self) -> &[NodeId] {
        &self.top_down
    }

    /// 하류 노드 깊이별로 묶은 구간들. 가장 깊은 단계가 먼저 온다.
    /// 같은 단계의 구간끼리는 서로 독립이다.
    pub fn levels_bottom_up(&self) -> Vec<Vec<EdgeId>> {
        let max_depth = self.depth.iter().copied().max().unwrap_or(0);
        let mut levels: Vec<Vec<EdgeId>> = vec![Vec::new(); max_depth];
        for e in self.edge_ids() {
            let d = self.depth(self.edge_to(e));
            levels[d - 1].push(e);
        }
        levels.reverse();
        levels
    }
}

// 도달하지 못한 노드에서 상류로 거슬러 올라가 순환인지 단절인지 판정한다.
fn unreachable_kind(
    start: usize,
    nodes: &[NodeSpec],
    upstream: &[Option<EdgeId>],
    edge_from: &[NodeId],
) -> TopologyError {
    let mut seen = vec![false; nodes.len()];
    let mut current = start;
    loop {
        if seen[current] {
            return TopologyError::Cycle(nodes[current].uid.clone());
        }
        seen[current] = true;
        match upstream[current] {
            Some(e) => current = edge_from[e.0].0,
            None => return TopologyError::Disconnected(nodes[start].uid.clone()),
        }
    }
}
