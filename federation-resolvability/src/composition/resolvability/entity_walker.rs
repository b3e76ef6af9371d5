use std::sync::Arc;

use indexmap::IndexMap;
use indexmap::IndexSet;
use petgraph::graph::EdgeIndex;
use petgraph::graph::NodeIndex;
use tracing::debug;
use tracing::trace;

use super::EdgeVisits;
use super::EntityOutcome;
use super::EntityScheduler;
use super::UnresolvedPath;
use super::VisitResult;
use super::WalkIndex;
use super::diagnostics::EntityAncestor;
use super::resolution_state::ResolutionState;
use super::selection_path::SelectionPath;
use crate::error::FederationError;
use crate::graph::FederatedGraph;
use crate::graph::GraphNode;
use crate::internal_error;
use crate::utils::logging::snapshot;

#[derive(Debug)]
pub(crate) struct EntityWalk {
    pub(crate) outcome: EntityOutcome,
    /// The unresolved paths of the outcome, joined onto each origin the entity was reached from.
    pub(crate) origin_unresolved_paths: Vec<UnresolvedPath>,
}

/// Validates everything beneath one entity node, jumping to the same entity in every other
/// subgraph its keys can reach.
///
/// Paths are recorded relative to the entity so the outcome can be reused wherever else the
/// entity is reached. Nested entities are never walked inline: they are handed to the
/// scheduler, which validates each entity once.
pub(crate) struct EntityWalker<'a> {
    graph: &'a FederatedGraph,
    visits: &'a mut EdgeVisits,
    scheduler: &'a mut EntityScheduler,
    walk_index: WalkIndex,
    entity_node: NodeIndex,
    origins: &'a [SelectionPath],
    resolution_by_relative_path: IndexMap<SelectionPath, ResolutionState>,
    resolution_by_origin_path: IndexMap<SelectionPath, ResolutionState>,
    unresolvable_paths: IndexSet<SelectionPath>,
    failed_subgraph_names_by_path: IndexMap<SelectionPath, IndexSet<Arc<str>>>,
    walked_subgraph_names: IndexSet<Arc<str>>,
}

impl<'a> EntityWalker<'a> {
    pub(crate) fn new(
        graph: &'a FederatedGraph,
        visits: &'a mut EdgeVisits,
        scheduler: &'a mut EntityScheduler,
        walk_index: WalkIndex,
        entity_node: NodeIndex,
        origins: &'a [SelectionPath],
    ) -> Self {
        Self {
            graph,
            visits,
            scheduler,
            walk_index,
            entity_node,
            origins,
            resolution_by_relative_path: IndexMap::default(),
            resolution_by_origin_path: IndexMap::default(),
            unresolvable_paths: IndexSet::default(),
            failed_subgraph_names_by_path: IndexMap::default(),
            walked_subgraph_names: IndexSet::default(),
        }
    }

    pub(crate) fn walk(mut self) -> Result<EntityWalk, FederationError> {
        let graph = self.graph;
        let entity = graph.node_weight(self.entity_node)?;
        debug!(node = %entity, origins = self.origins.len(), "validating entity");
        let root = SelectionPath::default();
        self.walked_subgraph_names
            .insert(entity.subgraph_name.clone());
        self.visit_concrete_node(self.entity_node, &root)?;

        if !self.unresolvable_paths.is_empty() {
            let closure = graph.accessible_entity_closure(self.entity_node);
            for &sibling in graph.nodes_for_type(&entity.type_name) {
                if self.unresolvable_paths.is_empty() {
                    break;
                }
                if !closure.contains(&sibling) {
                    continue;
                }
                let sibling_weight = graph.node_weight(sibling)?;
                trace!(node = %entity, sibling = %sibling_weight, "jumping to entity sibling");
                self.walked_subgraph_names
                    .insert(sibling_weight.subgraph_name.clone());
                self.visit_concrete_node(sibling, &root)?;
            }
        }

        let walk = self.into_walk(entity)?;
        debug!(
            node = %entity,
            unresolved_paths = walk.outcome.unresolved_paths.len(),
            "validated entity"
        );
        Ok(walk)
    }

    fn into_walk(self, entity: &GraphNode) -> Result<EntityWalk, FederationError> {
        let ancestor = EntityAncestor {
            type_name: entity.type_name.clone(),
            subgraph_names: IndexSet::from_iter([entity.subgraph_name.clone()]),
            field_sets_by_target_subgraph_name: self
                .graph
                .entity_index(&entity.type_name)
                .map(|index| index.field_sets_by_target_subgraph_name.clone())
                .unwrap_or_default(),
        };
        let mut unresolved_paths = Vec::with_capacity(self.unresolvable_paths.len());
        for path in &self.unresolvable_paths {
            let state = self
                .resolution_by_relative_path
                .get(path)
                .cloned()
                .ok_or_else(|| internal_error!("No resolution data for path \"{path}\""))?;
            snapshot!(
                "ResolutionState",
                state.to_string(),
                "unresolved entity path"
            );
            let mut unresolved = UnresolvedPath::new(path.clone(), state);
            unresolved.reached_subgraph_names = self.walked_subgraph_names.clone();
            if let Some(failed) = self.failed_subgraph_names_by_path.get(path) {
                unresolved
                    .reached_subgraph_names
                    .extend(failed.iter().cloned());
            }
            unresolved_paths.push(unresolved);
        }

        let mut origin_unresolved_paths = Vec::new();
        for origin in self.origins {
            for unresolved in &unresolved_paths {
                let path = origin.join(&unresolved.path);
                let state = self
                    .resolution_by_origin_path
                    .get(&path)
                    .cloned()
                    .unwrap_or_else(|| unresolved.state.clone());
                origin_unresolved_paths.push(UnresolvedPath {
                    path,
                    state,
                    reached_subgraph_names: unresolved.reached_subgraph_names.clone(),
                });
            }
        }

        Ok(EntityWalk {
            outcome: EntityOutcome {
                ancestor,
                unresolved_paths,
            },
            origin_unresolved_paths,
        })
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
            trace!(node = %node, path = %path, "reached nested entity");
            let origins = self.origins.iter().map(|origin| origin.join(&path));
            return Ok(self.scheduler.encounter(tail, origins));
        }
        if node.is_abstract {
            self.visit_abstract_node(tail, &path)
        } else {
            self.visit_concrete_node(tail, &path)
        }
    }

    fn visit_abstract_node(
        &mut self,
        node_index: NodeIndex,
        path: &SelectionPath,
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
            if self.visit_edge(edge, path)?.are_subtrees_resolved {
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
        let state = self
            .resolution_by_relative_path
            .entry(path.clone())
            .or_insert_with(|| {
                ResolutionState::new(node.type_name.clone(), node.field_data.clone())
            });
        if state.is_resolved() && state.are_subtrees_resolved() {
            return Ok(VisitResult::RESOLVED);
        }

        for (field_name, &edge) in &node.field_edges {
            let Some(state) = self.resolution_by_relative_path.get(path) else {
                return Err(internal_error!("No resolution data for path \"{path}\""));
            };
            if state.is_subtree_resolved(field_name) {
                continue;
            }
            // The entity under an already resolved field was handed off by the node that resolved
            // it. Another copy of that entity must not be validated for the same path.
            if state.is_field_resolved(field_name)
                && graph.node_weight(graph.edge_tail(edge)?)?.has_entity_siblings
            {
                continue;
            }
            let result = self.visit_edge(edge, path)?;
            let Some(state) = self.resolution_by_relative_path.get_mut(path) else {
                return Err(internal_error!("No resolution data for path \"{path}\""));
            };
            state.record_visit(field_name, result, &node.subgraph_name)?;
            for origin in self.origins {
                self.resolution_by_origin_path
                    .entry(origin.join(path))
                    .or_insert_with(|| {
                        ResolutionState::new(node.type_name.clone(), node.field_data.clone())
                    })
                    .record_visit(field_name, result, &node.subgraph_name)?;
            }
        }

        let Some(state) = self.resolution_by_relative_path.get_mut(path) else {
            return Err(internal_error!("No resolution data for path \"{path}\""));
        };
        let is_resolved = state.is_resolved();
        let are_subtrees_resolved = state.are_subtrees_resolved();
        if is_resolved {
            self.unresolvable_paths.shift_remove(path);
            if are_subtrees_resolved {
                self.unresolvable_paths
                    .retain(|unresolvable_path| !unresolvable_path.is_descendant_of(path));
            }
        } else {
            self.unresolvable_paths.insert(path.clone());
            self.failed_subgraph_names_by_path
                .entry(path.clone())
                .or_default()
                .insert(node.subgraph_name.clone());
        }
        Ok(VisitResult::visited(are_subtrees_resolved))
    }
}
