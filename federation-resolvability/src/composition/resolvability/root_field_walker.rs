use apollo_compiler::Name;
use indexmap::IndexMap;
use indexmap::IndexSet;
use petgraph::graph::EdgeIndex;
use petgraph::graph::NodeIndex;
use tracing::trace;

use super::EdgeVisits;
use super::EntityOutcome;
use super::UnresolvedPath;
use super::VisitResult;
use super::WalkIndex;
use super::resolution_state::ResolutionState;
use super::selection_path::SelectionPath;
use crate::error::FederationError;
use crate::graph::FederatedGraph;
use crate::graph::RootNode;
use crate::internal_error;
use crate::utils::logging::snapshot;

/// Entities reached under a shared root field: the route through `path` succeeds if any of the
/// `nodes` can provide what the walk could not.
#[derive(Debug, Clone)]
pub(crate) struct SharedEntityPath {
    pub(crate) path: SelectionPath,
    pub(crate) nodes: IndexSet<NodeIndex>,
}

#[derive(Debug, Default)]
pub(crate) struct RootFieldWalk {
    /// Paths no subgraph can complete, outside of any entity.
    pub(crate) unresolved_paths: Vec<UnresolvedPath>,
    /// Entities to validate from the path they were reached at.
    pub(crate) entity_paths: Vec<(NodeIndex, SelectionPath)>,
    pub(crate) shared_entity_paths: Vec<SharedEntityPath>,
}

/// Walks the subtree of one root field, stopping at entities that exist in other subgraphs.
///
/// A root field defined by a single subgraph is walked with one resolution state per node. A
/// shared root field is walked once per defining subgraph into per-path states, so that the
/// fields each subgraph reaches at the same path add up.
pub(crate) struct RootFieldWalker<'a> {
    graph: &'a FederatedGraph,
    visits: &'a mut EdgeVisits,
    outcomes: &'a IndexMap<NodeIndex, EntityOutcome>,
    walk_index: WalkIndex,
    resolution_by_node: IndexMap<NodeIndex, ResolutionState>,
    resolution_by_path: IndexMap<SelectionPath, ResolutionState>,
    paths_by_entity_node: IndexMap<NodeIndex, IndexSet<SelectionPath>>,
    entity_nodes_by_path: IndexMap<SelectionPath, IndexSet<NodeIndex>>,
    unresolvable_paths: IndexSet<SelectionPath>,
}

impl<'a> RootFieldWalker<'a> {
    pub(crate) fn new(
        graph: &'a FederatedGraph,
        visits: &'a mut EdgeVisits,
        outcomes: &'a IndexMap<NodeIndex, EntityOutcome>,
        walk_index: WalkIndex,
    ) -> Self {
        Self {
            graph,
            visits,
            outcomes,
            walk_index,
            resolution_by_node: IndexMap::default(),
            resolution_by_path: IndexMap::default(),
            paths_by_entity_node: IndexMap::default(),
            entity_nodes_by_path: IndexMap::default(),
            unresolvable_paths: IndexSet::default(),
        }
    }

    pub(crate) fn walk(
        mut self,
        root: &RootNode,
        field_name: &Name,
    ) -> Result<RootFieldWalk, FederationError> {
        let path = SelectionPath::root(root.kind);
        let mut edges = Vec::new();
        for &edge in root.field_edges(field_name) {
            if !self.graph.is_edge_inaccessible(edge)? {
                edges.push(edge);
            }
        }
        let is_shared = edges.len() > 1;
        for edge in edges {
            if !is_shared {
                self.visit_edge(edge, &path)?;
                continue;
            }
            if self.visit_shared_edge(edge, &path)?.are_subtrees_resolved {
                trace!(
                    root_field = %field_name,
                    "shared root field is fully resolved by a single subgraph"
                );
                self.unresolvable_paths.clear();
                self.entity_nodes_by_path.clear();
                break;
            }
        }
        snapshot!(
            self.unresolvable_paths,
            "unresolvable paths after root field walk"
        );
        self.into_walk(is_shared)
    }

    fn into_walk(self, is_shared: bool) -> Result<RootFieldWalk, FederationError> {
        let mut walk = RootFieldWalk::default();
        let mut shared_entity_paths: IndexMap<SelectionPath, IndexSet<NodeIndex>> =
            IndexMap::default();
        for path in self.unresolvable_paths {
            if is_shared {
                let entity_path = self
                    .entity_nodes_by_path
                    .iter()
                    .filter(|(entity_path, _)| path.starts_with(entity_path))
                    .max_by_key(|(entity_path, _)| entity_path.len());
                if let Some((entity_path, nodes)) = entity_path {
                    trace!(
                        path = %path,
                        entity_path = %entity_path,
                        "deferring unresolvable path to shared entity route"
                    );
                    shared_entity_paths
                        .entry(entity_path.clone())
                        .or_insert_with(|| nodes.clone());
                    continue;
                }
            }
            let state = self
                .resolution_by_path
                .get(&path)
                .cloned()
                .ok_or_else(|| internal_error!("No resolution data for path \"{path}\""))?;
            walk.unresolved_paths.push(UnresolvedPath::new(path, state));
        }
        walk.entity_paths = self
            .paths_by_entity_node
            .into_iter()
            .flat_map(|(node, paths)| paths.into_iter().map(move |path| (node, path)))
            .collect();
        walk.shared_entity_paths = shared_entity_paths
            .into_iter()
            .map(|(path, nodes)| SharedEntityPath { path, nodes })
            .collect();
        Ok(walk)
    }

    fn visit_edge(
        &mut self,
        edge: EdgeIndex,
        path: &SelectionPath,
    ) -> Result<VisitResult, FederationError> {
        let graph = self.graph;
        let weight = graph.edge_weight(edge)?;
        let tail = graph.edge_tail(edge)?;
        let node = graph.node_weight(tail)?;
        if weight.is_inaccessible || node.is_inaccessible {
            return Ok(VisitResult::UNVISITED);
        }
        if weight.is_external() {
            return Ok(VisitResult::EXTERNAL);
        }
        if node.is_leaf {
            return Ok(VisitResult::RESOLVED);
        }
        if !self.visits.visit(edge, self.walk_index) {
            trace!(edge = %weight, node = %node, "edge already visited by this walk");
            return Ok(VisitResult::RESOLVED);
        }
        let path = path.child(weight.path_segment()?);
        if node.has_entity_siblings {
            if self
                .outcomes
                .get(&tail)
                .is_some_and(EntityOutcome::is_success)
            {
                return Ok(VisitResult::RESOLVED);
            }
            trace!(node = %node, path = %path, "handing off to entity walk");
            self.paths_by_entity_node
                .entry(tail)
                .or_default()
                .insert(path);
            return Ok(VisitResult::visited(false));
        }
        if node.is_abstract {
            self.visit_abstract_node(tail, &path, false)
        } else {
            self.visit_concrete_node(tail, &path)
        }
    }

    /// An abstract node's subtree is resolved when the subtree of every accessible member is.
    fn visit_abstract_node(
        &mut self,
        node_index: NodeIndex,
        path: &SelectionPath,
        is_shared: bool,
    ) -> Result<VisitResult, FederationError> {
        let graph = self.graph;
        let node = graph.node_weight(node_index)?;
        let mut accessible_count = 0;
        let mut resolved_count = 0;
        for &edge in node.field_edges.values() {
            if graph.is_edge_inaccessible(edge)? {
                continue;
            }
            accessible_count += 1;
            let result = if is_shared {
                self.visit_shared_edge(edge, path)?
            } else {
                self.visit_edge(edge, path)?
            };
            if result.are_subtrees_resolved {
                resolved_count += 1;
            }
        }
        Ok(VisitResult::visited(resolved_count == accessible_count))
    }

    fn visit_concrete_node(
        &mut self,
        node_index: NodeIndex,
        path: &SelectionPath,
    ) -> Result<VisitResult, FederationError> {
        let graph = self.graph;
        let node = graph.node_weight(node_index)?;
        if node.field_edges.is_empty() {
            return Ok(VisitResult::RESOLVED);
        }
        // A node reached again through another path contributes nothing new.
        if let Some(state) = self.resolution_by_node.get(&node_index) {
            return Ok(VisitResult::visited(state.are_subtrees_resolved()));
        }
        let state = ResolutionState::new(node.type_name.clone(), node.field_data.clone());
        self.resolution_by_path
            .entry(path.clone())
            .or_insert_with(|| state.clone());
        self.resolution_by_node.insert(node_index, state);

        for (field_name, &edge) in &node.field_edges {
            let result = self.visit_edge(edge, path)?;
            let Some(state) = self.resolution_by_node.get_mut(&node_index) else {
                return Err(internal_error!("No resolution data for node \"{node}\""));
            };
            state.record_visit(field_name, result, &node.subgraph_name)?;
            if let Some(state) = self.resolution_by_path.get_mut(path) {
                state.record_visit(field_name, result, &node.subgraph_name)?;
            }
        }

        let Some(state) = self.resolution_by_node.get_mut(&node_index) else {
            return Err(internal_error!("No resolution data for node \"{node}\""));
        };
        let is_resolved = state.is_resolved();
        let are_subtrees_resolved = state.are_subtrees_resolved();
        self.update_unresolvable_path(path, is_resolved, are_subtrees_resolved);
        Ok(VisitResult::visited(are_subtrees_resolved))
    }

    fn visit_shared_edge(
        &mut self,
        edge: EdgeIndex,
        path: &SelectionPath,
    ) -> Result<VisitResult, FederationError> {
        let graph = self.graph;
        let weight = graph.edge_weight(edge)?;
        let tail = graph.edge_tail(edge)?;
        let node = graph.node_weight(tail)?;
        if weight.is_inaccessible || node.is_inaccessible {
            return Ok(VisitResult::UNVISITED);
        }
        if weight.is_external() {
            return Ok(VisitResult::EXTERNAL);
        }
        if node.is_leaf {
            return Ok(VisitResult::RESOLVED);
        }
        if !self.visits.visit(edge, self.walk_index) {
            trace!(edge = %weight, node = %node, "edge already visited by this walk");
            return Ok(VisitResult::RESOLVED);
        }
        let path = path.child(weight.path_segment()?);
        if node.has_entity_siblings {
            trace!(node = %node, path = %path, "registering shared entity route");
            self.entity_nodes_by_path
                .entry(path.clone())
                .or_default()
                .insert(tail);
        }
        if node.is_abstract {
            self.visit_abstract_node(tail, &path, true)
        } else {
            self.visit_shared_concrete_node(tail, &path)
        }
    }

    fn visit_shared_concrete_node(
        &mut self,
        node_index: NodeIndex,
        path: &SelectionPath,
    ) -> Result<VisitResult, FederationError> {
        let graph = self.graph;
        let node = graph.node_weight(node_index)?;
        if node.field_edges.is_empty() {
            return Ok(VisitResult::RESOLVED);
        }
        if !self.resolution_by_path.contains_key(path) {
            let seed = self
                .resolution_by_node
                .entry(node_index)
                .or_insert_with(|| {
                    ResolutionState::new(node.type_name.clone(), node.field_data.clone())
                })
                .clone();
            self.resolution_by_path.insert(path.clone(), seed);
        }
        if self
            .resolution_by_path
            .get_mut(path)
            .is_some_and(|state| state.is_resolved() && state.are_subtrees_resolved())
        {
            return Ok(VisitResult::RESOLVED);
        }

        for (field_name, &edge) in &node.field_edges {
            let result = self.visit_shared_edge(edge, path)?;
            if let Some(state) = self.resolution_by_node.get_mut(&node_index) {
                state.record_visit(field_name, result, &node.subgraph_name)?;
            }
            let Some(state) = self.resolution_by_path.get_mut(path) else {
                return Err(internal_error!("No resolution data for path \"{path}\""));
            };
            state.record_visit(field_name, result, &node.subgraph_name)?;
        }

        let Some(state) = self.resolution_by_path.get_mut(path) else {
            return Err(internal_error!("No resolution data for path \"{path}\""));
        };
        let is_resolved = state.is_resolved();
        let are_subtrees_resolved = state.are_subtrees_resolved();
        self.update_unresolvable_path(path, is_resolved, are_subtrees_resolved);
        Ok(VisitResult::visited(are_subtrees_resolved))
    }

    /// Paths proven complete later in the walk stop being unresolvable, and so do their
    /// descendants once nothing beneath them is missing.
    fn update_unresolvable_path(
        &mut self,
        path: &SelectionPath,
        is_resolved: bool,
        are_subtrees_resolved: bool,
    ) {
        if !is_resolved {
            self.unresolvable_paths.insert(path.clone());
            return;
        }
        self.unresolvable_paths.shift_remove(path);
        if are_subtrees_resolved {
            self.unresolvable_paths
                .retain(|unresolvable_path| !unresolvable_path.is_descendant_of(path));
        }
    }
}
