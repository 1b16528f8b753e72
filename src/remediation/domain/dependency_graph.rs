use super::{PackageName, PackageVersion};
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::collections::{HashMap, HashSet, VecDeque};

/// Node identity: one (name, version) pair per graph
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PackageId {
    name: PackageName,
    version: PackageVersion,
}

impl PackageId {
    pub fn new(name: PackageName, version: PackageVersion) -> Self {
        Self { name, version }
    }

    pub fn name(&self) -> &PackageName {
        &self.name
    }

    pub fn version(&self) -> &PackageVersion {
        &self.version
    }
}

impl std::fmt::Display for PackageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}=={}", self.name, self.version)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PackageNode {
    #[serde(flatten)]
    id: PackageId,
    is_direct: bool,
    depth: u32,
}

impl PackageNode {
    pub fn id(&self) -> &PackageId {
        &self.id
    }

    pub fn is_direct(&self) -> bool {
        self.is_direct
    }

    /// 1 for direct requirements, parent depth + 1 otherwise
    pub fn depth(&self) -> u32 {
        self.depth
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyEdge<'a> {
    pub from: &'a PackageId,
    pub to: &'a PackageId,
}

/// DependencyGraph aggregate: an arena of nodes addressed by identity.
///
/// Nodes are unique by [`PackageId`] and keep the attributes they were
/// created with. Edges never form self-loops; cycles are allowed.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: Vec<PackageNode>,
    index: HashMap<PackageId, usize>,
    edges: Vec<(usize, usize)>,
    edge_set: HashSet<(usize, usize)>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a node unless one with the same identity exists.
    /// Returns true when the node is new.
    pub fn add_node(&mut self, id: PackageId, is_direct: bool, depth: u32) -> bool {
        if self.index.contains_key(&id) {
            return false;
        }
        self.index.insert(id.clone(), self.nodes.len());
        self.nodes.push(PackageNode {
            id,
            is_direct,
            depth,
        });
        true
    }

    /// Adds an edge between two existing nodes. Self-loops, duplicates and
    /// unknown endpoints are ignored (returns false).
    pub fn add_edge(&mut self, from: &PackageId, to: &PackageId) -> bool {
        let (Some(&f), Some(&t)) = (self.index.get(from), self.index.get(to)) else {
            return false;
        };
        if f == t || !self.edge_set.insert((f, t)) {
            return false;
        }
        self.edges.push((f, t));
        true
    }

    pub fn contains(&self, id: &PackageId) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &PackageId) -> Option<&PackageNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    pub fn nodes(&self) -> &[PackageNode] {
        &self.nodes
    }

    pub fn edges(&self) -> impl Iterator<Item = DependencyEdge<'_>> {
        self.edges.iter().map(|&(f, t)| DependencyEdge {
            from: &self.nodes[f].id,
            to: &self.nodes[t].id,
        })
    }

    pub fn children(&self, id: &PackageId) -> Vec<&PackageId> {
        let Some(&i) = self.index.get(id) else {
            return Vec::new();
        };
        self.edges
            .iter()
            .filter(|(f, _)| *f == i)
            .map(|&(_, t)| &self.nodes[t].id)
            .collect()
    }

    pub fn total_package_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn direct_dependency_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_direct).count()
    }

    pub fn transitive_dependency_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.is_direct).count()
    }

    /// Nodes that cannot be reached from any direct requirement
    pub fn unreachable_nodes(&self) -> Vec<&PackageId> {
        let mut adjacency: HashMap<usize, Vec<usize>> = HashMap::new();
        for &(f, t) in &self.edges {
            adjacency.entry(f).or_default().push(t);
        }

        let mut seen: HashSet<usize> = HashSet::new();
        let mut queue: VecDeque<usize> = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.is_direct)
            .map(|(i, _)| i)
            .collect();

        while let Some(i) = queue.pop_front() {
            if !seen.insert(i) {
                continue;
            }
            if let Some(next) = adjacency.get(&i) {
                queue.extend(next.iter().copied().filter(|t| !seen.contains(t)));
            }
        }

        self.nodes
            .iter()
            .enumerate()
            .filter(|(i, _)| !seen.contains(i))
            .map(|(_, n)| &n.id)
            .collect()
    }
}

impl Serialize for DependencyGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let edges: Vec<DependencyEdge<'_>> = self.edges().collect();
        let mut state = serializer.serialize_struct("DependencyGraph", 2)?;
        state.serialize_field("nodes", &self.nodes)?;
        state.serialize_field("edges", &edges)?;
        state.end()
    }
}
