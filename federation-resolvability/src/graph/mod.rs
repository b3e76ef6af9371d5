//! The resolvability graph: one node per (subgraph, type) pair, connected by field edges within a
//! subgraph and by entity edges across subgraphs.

use std::fmt;
use std::fmt::Display;
use std::sync::Arc;

use apollo_compiler::Name;
use apollo_compiler::name;
use indexmap::IndexMap;
use indexmap::IndexSet;
use petgraph::graph::DiGraph;
use petgraph::graph::EdgeIndex;
use petgraph::graph::NodeIndex;
use petgraph::visit::Dfs;
use petgraph::visit::EdgeFiltered;
use petgraph::visit::EdgeRef;
use strum::IntoEnumIterator;

use crate::composition::resolvability::PathSegment;
use crate::error::FederationError;
use crate::error::SingleFederationError;

pub mod build_graph;
pub mod output;

/// The source used for root nodes, which do not belong to any single subgraph.
pub(crate) const FEDERATED_GRAPH_ROOT_SOURCE: &str = "_";

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    strum_macros::Display,
    strum_macros::EnumIter,
)]
pub enum RootKind {
    Query,
    Mutation,
    Subscription,
}

impl RootKind {
    pub fn from_type_name(type_name: &str) -> Option<Self> {
        match type_name {
            "Query" => Some(Self::Query),
            "Mutation" => Some(Self::Mutation),
            "Subscription" => Some(Self::Subscription),
            _ => None,
        }
    }

    pub fn type_name(self) -> Name {
        match self {
            Self::Query => name!("Query"),
            Self::Mutation => name!("Mutation"),
            Self::Subscription => name!("Subscription"),
        }
    }

    /// The first segment of every selection path under this root, e.g. `query`.
    pub(crate) fn path_segment(self) -> Name {
        match self {
            Self::Query => name!("query"),
            Self::Mutation => name!("mutation"),
            Self::Subscription => name!("subscription"),
        }
    }
}

/// Merged metadata about one field of a type, shared by every node of that type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: Name,
    pub named_type_name: Name,
    pub is_leaf: bool,
    /// The subgraphs that can resolve the field, i.e. define it without `@external`.
    pub subgraph_names: IndexSet<Arc<str>>,
}

/// Accessible fields of a type merged across all subgraphs, in first-seen order.
pub type FieldData = Arc<IndexMap<Name, FieldInfo>>;

#[derive(Debug, Clone)]
pub struct GraphNode {
    pub(crate) subgraph_name: Arc<str>,
    pub(crate) type_name: Name,
    pub(crate) root_kind: Option<RootKind>,
    pub(crate) field_data: FieldData,
    /// For concrete nodes, the edge of each field keyed by field name. For abstract nodes, the
    /// edge to each member keyed by the member type name.
    pub(crate) field_edges: IndexMap<Name, EdgeIndex>,
    pub(crate) entity_edges: Vec<EdgeIndex>,
    pub(crate) satisfied_field_sets: IndexSet<String>,
    pub(crate) is_abstract: bool,
    pub(crate) is_leaf: bool,
    pub(crate) is_inaccessible: bool,
    pub(crate) has_entity_siblings: bool,
}

impl GraphNode {
    pub(crate) fn new(subgraph_name: Arc<str>, type_name: Name) -> Self {
        Self {
            subgraph_name,
            type_name,
            root_kind: None,
            field_data: FieldData::default(),
            field_edges: IndexMap::default(),
            entity_edges: Vec::new(),
            satisfied_field_sets: IndexSet::default(),
            is_abstract: false,
            is_leaf: false,
            is_inaccessible: false,
            has_entity_siblings: false,
        }
    }

    pub fn subgraph_name(&self) -> &str {
        &self.subgraph_name
    }

    pub fn type_name(&self) -> &Name {
        &self.type_name
    }

    pub fn field_data(&self) -> &FieldData {
        &self.field_data
    }

    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    pub fn is_leaf(&self) -> bool {
        self.is_leaf
    }

    pub fn is_inaccessible(&self) -> bool {
        self.is_inaccessible
    }

    pub fn has_entity_siblings(&self) -> bool {
        self.has_entity_siblings
    }

    pub fn satisfied_field_sets(&self) -> &IndexSet<String> {
        &self.satisfied_field_sets
    }
}

impl Display for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_name, self.subgraph_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeKind {
    /// A root operation field of one subgraph.
    RootField { field_name: Name },
    Field { field_name: Name, is_external: bool },
    /// From an interface or union to one of its members.
    AbstractMember { type_condition: Name },
    /// A key-based jump to the same entity in another subgraph.
    KeyResolution,
}

#[derive(Debug, Clone)]
pub struct GraphEdge {
    pub(crate) kind: EdgeKind,
    pub(crate) is_inaccessible: bool,
}

impl GraphEdge {
    pub(crate) fn new(kind: EdgeKind) -> Self {
        Self {
            kind,
            is_inaccessible: false,
        }
    }

    pub fn kind(&self) -> &EdgeKind {
        &self.kind
    }

    pub fn is_inaccessible(&self) -> bool {
        self.is_inaccessible
    }

    pub(crate) fn is_external(&self) -> bool {
        matches!(
            self.kind,
            EdgeKind::Field {
                is_external: true,
                ..
            }
        )
    }

    pub(crate) fn path_segment(&self) -> Result<PathSegment, FederationError> {
        match &self.kind {
            EdgeKind::RootField { field_name } | EdgeKind::Field { field_name, .. } => {
                Ok(PathSegment::Field(field_name.clone()))
            }
            EdgeKind::AbstractMember { type_condition } => {
                Ok(PathSegment::TypeCondition(type_condition.clone()))
            }
            EdgeKind::KeyResolution => Err(FederationError::internal(
                "Entity edges do not contribute to selection paths",
            )),
        }
    }
}

impl Display for GraphEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            EdgeKind::RootField { field_name } => write!(f, "{field_name}")?,
            EdgeKind::Field {
                field_name,
                is_external,
            } => {
                write!(f, "{field_name}")?;
                if *is_external {
                    write!(f, " @external")?;
                }
            }
            EdgeKind::AbstractMember { type_condition } => write!(f, "... on {type_condition}")?,
            EdgeKind::KeyResolution => write!(f, "key()")?,
        }
        if self.is_inaccessible {
            write!(f, " @inaccessible")?;
        }
        Ok(())
    }
}

/// The entry point of one root operation type, shared by every subgraph that defines it.
#[derive(Debug, Clone)]
pub struct RootNode {
    pub(crate) kind: RootKind,
    pub(crate) node: NodeIndex,
    /// For each root field, the edges of every subgraph that defines it. More than one edge means
    /// the root field is shared.
    pub(crate) shared_edges: IndexMap<Name, Vec<EdgeIndex>>,
}

impl RootNode {
    pub fn kind(&self) -> RootKind {
        self.kind
    }

    pub fn field_names(&self) -> impl Iterator<Item = &Name> {
        self.shared_edges.keys()
    }

    pub(crate) fn field_edges(&self, field_name: &Name) -> &[EdgeIndex] {
        self.shared_edges
            .get(field_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// The key field sets of one entity type, indexed both ways.
#[derive(Debug, Clone, Default)]
pub struct EntityIndex {
    pub(crate) target_subgraph_names_by_field_set: IndexMap<String, IndexSet<Arc<str>>>,
    pub(crate) field_sets_by_target_subgraph_name: IndexMap<Arc<str>, IndexSet<String>>,
}

impl EntityIndex {
    /// Records that `subgraph_name` can resolve the entity when given `field_set`.
    pub fn add_target_subgraph_by_field_set(
        &mut self,
        field_set: impl Into<String>,
        subgraph_name: Arc<str>,
    ) {
        let field_set = field_set.into();
        self.target_subgraph_names_by_field_set
            .entry(field_set.clone())
            .or_default()
            .insert(subgraph_name.clone());
        self.field_sets_by_target_subgraph_name
            .entry(subgraph_name)
            .or_default()
            .insert(field_set);
    }

    pub fn target_subgraph_names(&self, field_set: &str) -> Option<&IndexSet<Arc<str>>> {
        self.target_subgraph_names_by_field_set.get(field_set)
    }

    pub fn field_sets(&self, subgraph_name: &str) -> Option<&IndexSet<String>> {
        self.field_sets_by_target_subgraph_name.get(subgraph_name)
    }
}

#[derive(Debug, Clone)]
pub struct FederatedGraph {
    pub(crate) graph: DiGraph<GraphNode, GraphEdge>,
    pub(crate) nodes_by_subgraph_name: IndexMap<Arc<str>, IndexMap<Name, NodeIndex>>,
    pub(crate) nodes_by_type_name: IndexMap<Name, Vec<NodeIndex>>,
    pub(crate) root_nodes: IndexMap<RootKind, RootNode>,
    pub(crate) entity_indices: IndexMap<Name, EntityIndex>,
}

impl FederatedGraph {
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub(crate) fn node_weight(&self, node: NodeIndex) -> Result<&GraphNode, FederationError> {
        self.graph.node_weight(node).ok_or_else(|| {
            SingleFederationError::Internal {
                message: "Node unexpectedly missing".to_owned(),
            }
            .into()
        })
    }

    pub(crate) fn edge_weight(&self, edge: EdgeIndex) -> Result<&GraphEdge, FederationError> {
        self.graph.edge_weight(edge).ok_or_else(|| {
            SingleFederationError::Internal {
                message: "Edge unexpectedly missing".to_owned(),
            }
            .into()
        })
    }

    pub(crate) fn edge_tail(&self, edge: EdgeIndex) -> Result<NodeIndex, FederationError> {
        self.graph
            .edge_endpoints(edge)
            .map(|(_, tail)| tail)
            .ok_or_else(|| {
                SingleFederationError::Internal {
                    message: "Edge unexpectedly missing".to_owned(),
                }
                .into()
            })
    }

    pub fn node_index(&self, subgraph_name: &str, type_name: &str) -> Option<NodeIndex> {
        self.nodes_by_subgraph_name
            .get(subgraph_name)?
            .get(type_name)
            .copied()
    }

    pub fn node(&self, subgraph_name: &str, type_name: &str) -> Option<&GraphNode> {
        self.node_index(subgraph_name, type_name)
            .and_then(|node| self.graph.node_weight(node))
    }

    /// Every node of the type, in creation order.
    pub(crate) fn nodes_for_type(&self, type_name: &Name) -> &[NodeIndex] {
        self.nodes_by_type_name
            .get(type_name)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Root nodes in operation order: query, then mutation, then subscription.
    pub fn root_nodes(&self) -> impl Iterator<Item = &RootNode> {
        RootKind::iter().filter_map(|kind| self.root_nodes.get(&kind))
    }

    pub fn root_node(&self, kind: RootKind) -> Option<&RootNode> {
        self.root_nodes.get(&kind)
    }

    pub fn entity_index(&self, type_name: &str) -> Option<&EntityIndex> {
        self.entity_indices.get(type_name)
    }

    /// An edge is unusable if it was pruned itself or if it leads to an inaccessible node.
    pub(crate) fn is_edge_inaccessible(&self, edge: EdgeIndex) -> Result<bool, FederationError> {
        Ok(self.edge_weight(edge)?.is_inaccessible
            || self.node_weight(self.edge_tail(edge)?)?.is_inaccessible)
    }

    pub(crate) fn type_has_entity_edges(&self, type_name: &Name) -> bool {
        self.nodes_for_type(type_name)
            .iter()
            .any(|&node| !self.graph[node].entity_edges.is_empty())
    }

    /// Every node reachable from `node` through accessible entity edges, following chains of
    /// key jumps transitively. The node itself is excluded.
    pub(crate) fn accessible_entity_closure(&self, node: NodeIndex) -> IndexSet<NodeIndex> {
        let entity_edges = EdgeFiltered::from_fn(&self.graph, |edge| {
            edge.weight().kind == EdgeKind::KeyResolution
                && !edge.weight().is_inaccessible
                && !self.graph[edge.target()].is_inaccessible
        });
        let mut dfs = Dfs::new(&entity_edges, node);
        let mut closure = IndexSet::default();
        while let Some(reached) = dfs.next(&entity_edges) {
            if reached != node {
                closure.insert(reached);
            }
        }
        closure
    }
}
