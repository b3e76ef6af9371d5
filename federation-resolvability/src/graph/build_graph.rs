use std::sync::Arc;

use apollo_compiler::Name;
use indexmap::IndexMap;
use indexmap::IndexSet;
use petgraph::graph::DiGraph;
use petgraph::graph::EdgeIndex;
use petgraph::graph::NodeIndex;
use tracing::trace;

use crate::bail;
use crate::error::FederationError;
use crate::error::name;
use crate::graph::EdgeKind;
use crate::graph::EntityIndex;
use crate::graph::FEDERATED_GRAPH_ROOT_SOURCE;
use crate::graph::FederatedGraph;
use crate::graph::FieldInfo;
use crate::graph::GraphEdge;
use crate::graph::GraphNode;
use crate::graph::RootKind;
use crate::graph::RootNode;

#[derive(Debug, Clone, Copy, Default)]
pub struct NodeOptions {
    pub is_abstract: bool,
    pub is_leaf: bool,
}

/// Assembles a [`FederatedGraph`] one subgraph at a time.
///
/// Nodes and edges are added per subgraph after calling [`GraphBuilder::set_subgraph_name`].
/// Once every subgraph has been added, [`GraphBuilder::initialize_node`] installs the merged field
/// data of each type, which also prunes inaccessible edges and derives entity edges; the entity
/// index and satisfied field sets must be complete by then.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: DiGraph<GraphNode, GraphEdge>,
    subgraph_name: Option<Arc<str>>,
    nodes_by_subgraph_name: IndexMap<Arc<str>, IndexMap<Name, NodeIndex>>,
    nodes_by_type_name: IndexMap<Name, Vec<NodeIndex>>,
    root_nodes: IndexMap<RootKind, RootNode>,
    entity_indices: IndexMap<Name, EntityIndex>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_subgraph_name(&mut self, subgraph_name: &str) {
        self.subgraph_name = Some(Arc::from(subgraph_name));
    }

    fn current_subgraph_name(&self) -> Result<Arc<str>, FederationError> {
        match &self.subgraph_name {
            Some(subgraph_name) => Ok(subgraph_name.clone()),
            None => bail!("Nodes can only be added once a subgraph name has been set"),
        }
    }

    fn node_mut(&mut self, node: NodeIndex) -> Result<&mut GraphNode, FederationError> {
        match self.graph.node_weight_mut(node) {
            Some(weight) => Ok(weight),
            None => bail!("Node unexpectedly missing"),
        }
    }

    /// Returns the node of `type_name` in the current subgraph, creating it if needed. Flags are
    /// only ever turned on.
    pub fn add_or_update_node(
        &mut self,
        type_name: &str,
        options: NodeOptions,
    ) -> Result<NodeIndex, FederationError> {
        let subgraph_name = self.current_subgraph_name()?;
        let existing = self
            .nodes_by_subgraph_name
            .get(&subgraph_name)
            .and_then(|nodes| nodes.get(type_name))
            .copied();
        let node = match existing {
            Some(node) => node,
            None => {
                let type_name = name(type_name)?;
                let node = self
                    .graph
                    .add_node(GraphNode::new(subgraph_name.clone(), type_name.clone()));
                self.nodes_by_subgraph_name
                    .entry(subgraph_name)
                    .or_default()
                    .insert(type_name.clone(), node);
                self.nodes_by_type_name
                    .entry(type_name)
                    .or_default()
                    .push(node);
                node
            }
        };
        let weight = self.node_mut(node)?;
        weight.is_abstract |= options.is_abstract;
        weight.is_leaf |= options.is_leaf;
        Ok(node)
    }

    pub fn add_edge(
        &mut self,
        head: NodeIndex,
        tail: NodeIndex,
        field_name: &str,
    ) -> Result<EdgeIndex, FederationError> {
        self.add_field_edge(head, tail, field_name, false)
    }

    /// Adds the edge of a field the head's subgraph declares `@external`. Such edges are never
    /// traversed.
    pub fn add_external_edge(
        &mut self,
        head: NodeIndex,
        tail: NodeIndex,
        field_name: &str,
    ) -> Result<EdgeIndex, FederationError> {
        self.add_field_edge(head, tail, field_name, true)
    }

    fn add_field_edge(
        &mut self,
        head: NodeIndex,
        tail: NodeIndex,
        field_name: &str,
        is_external: bool,
    ) -> Result<EdgeIndex, FederationError> {
        let field_name = name(field_name)?;
        let edge = self.graph.add_edge(
            head,
            tail,
            GraphEdge::new(EdgeKind::Field {
                field_name: field_name.clone(),
                is_external,
            }),
        );
        self.node_mut(head)?.field_edges.insert(field_name, edge);
        Ok(edge)
    }

    /// Adds an edge from an interface or union to one of its members, named after the member.
    pub fn add_abstract_edge(
        &mut self,
        head: NodeIndex,
        tail: NodeIndex,
    ) -> Result<EdgeIndex, FederationError> {
        let Some(tail_weight) = self.graph.node_weight(tail) else {
            bail!("Node unexpectedly missing");
        };
        let type_condition = tail_weight.type_name.clone();
        let head_weight = self.node_mut(head)?;
        if !head_weight.is_abstract {
            bail!(
                "Cannot add a member edge to \"{type_condition}\" from non-abstract node \"{head_weight}\""
            );
        }
        if let Some(&edge) = head_weight.field_edges.get(&type_condition) {
            return Ok(edge);
        }
        let edge = self.graph.add_edge(
            head,
            tail,
            GraphEdge::new(EdgeKind::AbstractMember {
                type_condition: type_condition.clone(),
            }),
        );
        self.node_mut(head)?
            .field_edges
            .insert(type_condition, edge);
        Ok(edge)
    }

    /// Adds the edge of a root field in the current subgraph to the shared edges of the root
    /// node.
    pub fn add_root_edge(
        &mut self,
        kind: RootKind,
        tail: NodeIndex,
        field_name: &str,
    ) -> Result<EdgeIndex, FederationError> {
        let field_name = name(field_name)?;
        let root = match self.root_nodes.get(&kind) {
            Some(root) => root.node,
            None => {
                let mut weight = GraphNode::new(
                    Arc::from(FEDERATED_GRAPH_ROOT_SOURCE),
                    kind.type_name(),
                );
                weight.root_kind = Some(kind);
                let node = self.graph.add_node(weight);
                self.root_nodes.insert(
                    kind,
                    RootNode {
                        kind,
                        node,
                        shared_edges: IndexMap::default(),
                    },
                );
                node
            }
        };
        let edge = self.graph.add_edge(
            root,
            tail,
            GraphEdge::new(EdgeKind::RootField {
                field_name: field_name.clone(),
            }),
        );
        if let Some(root) = self.root_nodes.get_mut(&kind) {
            root.shared_edges.entry(field_name).or_default().push(edge);
        }
        Ok(edge)
    }

    pub fn entity_index_mut(&mut self, type_name: &str) -> Result<&mut EntityIndex, FederationError> {
        Ok(self.entity_indices.entry(name(type_name)?).or_default())
    }

    pub fn add_satisfied_field_set(
        &mut self,
        node: NodeIndex,
        field_set: impl Into<String>,
    ) -> Result<(), FederationError> {
        self.node_mut(node)?
            .satisfied_field_sets
            .insert(field_set.into());
        Ok(())
    }

    /// Marks every node of the type, in every subgraph, inaccessible.
    pub fn set_node_inaccessible(&mut self, type_name: &str) {
        let Some(nodes) = self.nodes_by_type_name.get(type_name) else {
            return;
        };
        for &node in nodes {
            self.graph[node].is_inaccessible = true;
        }
    }

    /// Installs the merged, accessible-only field data of a type on every node of that type.
    ///
    /// Field edges whose field is missing from the data are marked inaccessible. When the type is
    /// an entity, entity edges are added from each node to the node of every other subgraph that
    /// one of its satisfied field sets targets. For a root type, root fields missing from the
    /// data are pruned instead.
    pub fn initialize_node(
        &mut self,
        type_name: &str,
        field_data: IndexMap<Name, FieldInfo>,
    ) -> Result<(), FederationError> {
        let field_data = Arc::new(field_data);
        if let Some(kind) = RootKind::from_type_name(type_name) {
            if let Some(root) = self.root_nodes.get(&kind) {
                let root_node = root.node;
                let pruned_edges = root
                    .shared_edges
                    .iter()
                    .filter(|(field_name, _)| !field_data.contains_key(*field_name))
                    .flat_map(|(_, edges)| edges.iter().copied())
                    .collect::<Vec<_>>();
                for edge in pruned_edges {
                    self.graph[edge].is_inaccessible = true;
                }
                self.node_mut(root_node)?.field_data = field_data;
            }
            return Ok(());
        }

        let Some(nodes) = self.nodes_by_type_name.get(type_name).cloned() else {
            return Ok(());
        };
        let entity_index = self.entity_indices.get(type_name).cloned();
        let has_entity_siblings = entity_index.is_some() && nodes.len() > 1;
        for &node in &nodes {
            let weight = self.node_mut(node)?;
            weight.field_data = field_data.clone();
            weight.has_entity_siblings = has_entity_siblings;
            let subgraph_name = weight.subgraph_name.clone();
            if !weight.is_abstract {
                let inaccessible_edges = weight
                    .field_edges
                    .iter()
                    .filter(|(field_name, _)| !field_data.contains_key(*field_name))
                    .map(|(_, &edge)| edge)
                    .collect::<Vec<_>>();
                for edge in inaccessible_edges {
                    self.graph[edge].is_inaccessible = true;
                }
            }

            let Some(entity_index) = &entity_index else {
                continue;
            };
            let mut targets = IndexSet::new();
            for field_set in &self.graph[node].satisfied_field_sets {
                let Some(target_subgraph_names) = entity_index.target_subgraph_names(field_set)
                else {
                    continue;
                };
                for target_subgraph_name in target_subgraph_names {
                    if *target_subgraph_name == subgraph_name {
                        continue;
                    }
                    let sibling = self
                        .nodes_by_subgraph_name
                        .get(target_subgraph_name)
                        .and_then(|nodes| nodes.get(type_name));
                    if let Some(&sibling) = sibling {
                        targets.insert(sibling);
                    }
                }
            }
            for sibling in targets {
                trace!(
                    node = %self.graph[node],
                    sibling = %self.graph[sibling],
                    "adding entity edge"
                );
                let edge = self
                    .graph
                    .add_edge(node, sibling, GraphEdge::new(EdgeKind::KeyResolution));
                self.node_mut(node)?.entity_edges.push(edge);
            }
        }
        Ok(())
    }

    pub fn build(mut self) -> FederatedGraph {
        for weight in self.graph.node_weights_mut() {
            if weight.root_kind.is_none() && !weight.is_abstract && weight.field_edges.is_empty() {
                weight.is_leaf = true;
            }
        }
        FederatedGraph {
            graph: self.graph,
            nodes_by_subgraph_name: self.nodes_by_subgraph_name,
            nodes_by_type_name: self.nodes_by_type_name,
            root_nodes: self.root_nodes,
            entity_indices: self.entity_indices,
        }
    }
}
