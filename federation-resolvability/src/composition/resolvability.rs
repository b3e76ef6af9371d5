//! Resolvability validation: proves that every field reachable from a root operation field can
//! actually be resolved by some route through the subgraphs, and explains the fields that
//! cannot.
//!
//! Each root field is validated in two phases. A root field walker first walks the subtree of
//! the root field inside the subgraphs that define it, handing off every entity that also exists
//! in other subgraphs. The entities are then drained from a work list in discovery order, one
//! entity walker per entity node; nested entities found along the way are appended to the
//! work list. Because an entity walk only depends on the entity itself, its outcome is cached and
//! reused for every other path, root field included, that reaches it.

mod diagnostics;
mod entity_walker;
mod resolution_state;
mod root_field_walker;
mod selection_path;

use std::sync::Arc;

use apollo_compiler::Name;
use indexmap::IndexMap;
use indexmap::IndexSet;
use petgraph::graph::EdgeIndex;
use petgraph::graph::NodeIndex;
use tracing::debug;
use tracing::trace;

pub use self::diagnostics::UnresolvablePathError;
use self::diagnostics::EntityAncestor;
use self::diagnostics::RootFieldData;
use self::entity_walker::EntityWalker;
use self::resolution_state::ResolutionState;
use self::root_field_walker::RootFieldWalker;
use self::root_field_walker::SharedEntityPath;
pub use self::selection_path::PathSegment;
pub use self::selection_path::SelectionPath;
use crate::composition::ResolvabilityOptions;
use crate::error::CompositionError;
use crate::error::FederationError;
use crate::graph::FederatedGraph;
use crate::graph::RootNode;
use crate::internal_error;

/// Identifies one walk. Edges remember which walks traversed them, which is what stops cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct WalkIndex(usize);

/// The walks that have traversed each edge, kept beside the graph so that the graph itself stays
/// immutable during validation.
#[derive(Debug, Default)]
pub(crate) struct EdgeVisits(IndexMap<EdgeIndex, IndexSet<WalkIndex>>);

impl EdgeVisits {
    /// Tags the edge with the walk. Returns `false` if the walk had already traversed it.
    pub(crate) fn visit(&mut self, edge: EdgeIndex, walk_index: WalkIndex) -> bool {
        self.0.entry(edge).or_default().insert(walk_index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct VisitResult {
    pub(crate) visited: bool,
    pub(crate) are_subtrees_resolved: bool,
    pub(crate) is_external: bool,
}

impl VisitResult {
    pub(crate) const UNVISITED: Self = Self {
        visited: false,
        are_subtrees_resolved: false,
        is_external: false,
    };

    pub(crate) const EXTERNAL: Self = Self {
        visited: false,
        are_subtrees_resolved: false,
        is_external: true,
    };

    pub(crate) const RESOLVED: Self = Self::visited(true);

    pub(crate) const fn visited(are_subtrees_resolved: bool) -> Self {
        Self {
            visited: true,
            are_subtrees_resolved,
            is_external: false,
        }
    }
}

/// A selection path at which at least one declared field was never reached.
#[derive(Debug, Clone)]
pub(crate) struct UnresolvedPath {
    pub(crate) path: SelectionPath,
    pub(crate) state: ResolutionState,
    /// Subgraphs an entity walk reached for this path without finding the missing fields.
    pub(crate) reached_subgraph_names: IndexSet<Arc<str>>,
}

impl UnresolvedPath {
    pub(crate) fn new(path: SelectionPath, state: ResolutionState) -> Self {
        Self {
            path,
            state,
            reached_subgraph_names: IndexSet::default(),
        }
    }
}

/// The result of validating an entity node, with paths relative to the entity.
#[derive(Debug, Clone)]
pub(crate) struct EntityOutcome {
    pub(crate) ancestor: EntityAncestor,
    pub(crate) unresolved_paths: Vec<UnresolvedPath>,
}

impl EntityOutcome {
    pub(crate) fn is_success(&self) -> bool {
        self.unresolved_paths.is_empty()
    }

    fn is_missing(&self, path: &SelectionPath, field_name: &Name) -> bool {
        self.unresolved_paths.iter().any(|unresolved| {
            unresolved.path == *path
                && unresolved
                    .state
                    .unresolved_fields()
                    .any(|field| field.name == *field_name)
        })
    }
}

/// The entity work list, shared between the driver and entity walks.
#[derive(Debug, Default)]
pub(crate) struct EntityScheduler {
    /// Entities awaiting validation, with the paths they were reached from.
    pending: IndexMap<NodeIndex, IndexSet<SelectionPath>>,
    in_progress: Option<NodeIndex>,
    outcomes: IndexMap<NodeIndex, EntityOutcome>,
    /// Paths that reached an entity after it was already decided.
    late_origins: Vec<(NodeIndex, SelectionPath)>,
}

impl EntityScheduler {
    /// Queues an entity for validation. An entity reached without an origin is only validated;
    /// its outcome is consumed by a shared route.
    fn schedule(&mut self, node: NodeIndex, origin: Option<SelectionPath>) {
        if self.outcomes.contains_key(&node) {
            self.late_origins.extend(origin.map(|origin| (node, origin)));
            return;
        }
        let origins = self.pending.entry(node).or_default();
        origins.extend(origin);
    }

    /// Called when an entity walk reaches another entity.
    ///
    /// The first encounter queues the entity and leaves the field's subtree unresolved. Entities
    /// that are already queued or currently being walked are optimistically treated as resolved,
    /// since their own walk reports anything missing beneath them.
    pub(crate) fn encounter(
        &mut self,
        node: NodeIndex,
        origins: impl IntoIterator<Item = SelectionPath>,
    ) -> VisitResult {
        if self.in_progress == Some(node) {
            trace!(node = node.index(), "entity is already being validated");
            return VisitResult::RESOLVED;
        }
        if let Some(outcome) = self.outcomes.get(&node) {
            if outcome.is_success() {
                return VisitResult::RESOLVED;
            }
            self.late_origins
                .extend(origins.into_iter().map(|origin| (node, origin)));
            return VisitResult::visited(false);
        }
        if let Some(pending) = self.pending.get_mut(&node) {
            trace!(node = node.index(), "entity is already queued");
            pending.extend(origins);
            return VisitResult::RESOLVED;
        }
        self.pending.insert(node, origins.into_iter().collect());
        VisitResult::visited(false)
    }
}

struct ResolvabilityValidator<'a> {
    graph: &'a FederatedGraph,
    visits: EdgeVisits,
    next_walk_index: usize,
    scheduler: EntityScheduler,
    reported: IndexSet<(SelectionPath, Name, Name)>,
    errors: Vec<CompositionError>,
}

/// Validates that every field of the federated graph can be resolved from the root fields.
///
/// The outer `Result` fails only on internal errors, which abort validation. Otherwise all
/// unresolvable fields of all root fields are collected, deduplicated by path and field, in the
/// order they were found.
pub fn validate_resolvability(
    graph: &FederatedGraph,
    options: &ResolvabilityOptions,
) -> Result<Result<(), Vec<CompositionError>>, FederationError> {
    if options.disable_resolvability_validation {
        debug!("resolvability validation is disabled");
        return Ok(Ok(()));
    }
    let errors = ResolvabilityValidator::new(graph).validate()?;
    if errors.is_empty() {
        Ok(Ok(()))
    } else {
        Ok(Err(errors))
    }
}

impl<'a> ResolvabilityValidator<'a> {
    fn new(graph: &'a FederatedGraph) -> Self {
        Self {
            graph,
            visits: EdgeVisits::default(),
            next_walk_index: 0,
            scheduler: EntityScheduler::default(),
            reported: IndexSet::default(),
            errors: Vec::new(),
        }
    }

    fn next_walk_index(&mut self) -> WalkIndex {
        let walk_index = WalkIndex(self.next_walk_index);
        self.next_walk_index += 1;
        walk_index
    }

    fn validate(mut self) -> Result<Vec<CompositionError>, FederationError> {
        let graph = self.graph;
        for root in graph.root_nodes() {
            for field_name in root.field_names() {
                self.validate_root_field(root, field_name)?;
            }
        }
        Ok(self.errors)
    }

    fn root_field_data(
        &self,
        root: &RootNode,
        field_name: &Name,
    ) -> Result<Option<RootFieldData>, FederationError> {
        let mut subgraph_names = IndexSet::default();
        for &edge in root.field_edges(field_name) {
            if !self.graph.is_edge_inaccessible(edge)? {
                let tail = self.graph.node_weight(self.graph.edge_tail(edge)?)?;
                subgraph_names.insert(tail.subgraph_name.clone());
            }
        }
        if subgraph_names.is_empty() {
            return Ok(None);
        }
        Ok(Some(RootFieldData {
            coordinates: format!("{}.{field_name}", root.kind.type_name()),
            is_shared: subgraph_names.len() > 1,
            subgraph_names,
        }))
    }

    fn validate_root_field(
        &mut self,
        root: &RootNode,
        field_name: &Name,
    ) -> Result<(), FederationError> {
        let Some(root_field) = self.root_field_data(root, field_name)? else {
            trace!(root_field = %field_name, "skipping inaccessible root field");
            return Ok(());
        };
        debug!(root_field = %root_field.coordinates, "validating root field");
        let error_count = self.errors.len();

        let walk_index = self.next_walk_index();
        let walk = RootFieldWalker::new(
            self.graph,
            &mut self.visits,
            &self.scheduler.outcomes,
            walk_index,
        )
        .walk(root, field_name)?;
        for unresolved in &walk.unresolved_paths {
            self.report(&root_field, unresolved, None);
        }
        for (node, path) in walk.entity_paths {
            self.scheduler.schedule(node, Some(path));
        }
        for shared in &walk.shared_entity_paths {
            for &node in &shared.nodes {
                self.scheduler.schedule(node, None);
            }
        }

        self.drain_entities(&root_field)?;
        for shared in &walk.shared_entity_paths {
            self.validate_shared_entity_path(&root_field, shared)?;
        }
        debug!(
            root_field = %root_field.coordinates,
            errors = self.errors.len() - error_count,
            "validated root field"
        );
        Ok(())
    }

    fn drain_entities(&mut self, root_field: &RootFieldData) -> Result<(), FederationError> {
        self.report_late_origins(root_field)?;
        while let Some((node, origins)) = self.scheduler.pending.shift_remove_index(0) {
            let origins = origins.into_iter().collect::<Vec<_>>();
            let walk_index = self.next_walk_index();
            self.scheduler.in_progress = Some(node);
            let walk = EntityWalker::new(
                self.graph,
                &mut self.visits,
                &mut self.scheduler,
                walk_index,
                node,
                &origins,
            )
            .walk()?;
            self.scheduler.in_progress = None;
            for unresolved in &walk.origin_unresolved_paths {
                self.report(root_field, unresolved, Some(&walk.outcome.ancestor));
            }
            self.scheduler.outcomes.insert(node, walk.outcome);
            self.report_late_origins(root_field)?;
        }
        Ok(())
    }

    /// Reports the cached failure of an entity at every path that reached it after it was
    /// decided.
    fn report_late_origins(&mut self, root_field: &RootFieldData) -> Result<(), FederationError> {
        let late_origins = std::mem::take(&mut self.scheduler.late_origins);
        for (node, origin) in late_origins {
            let outcome = self
                .scheduler
                .outcomes
                .get(&node)
                .cloned()
                .ok_or_else(|| internal_error!("Entity outcome unexpectedly missing"))?;
            for unresolved in &outcome.unresolved_paths {
                let unresolved = UnresolvedPath {
                    path: origin.join(&unresolved.path),
                    state: unresolved.state.clone(),
                    reached_subgraph_names: unresolved.reached_subgraph_names.clone(),
                };
                self.report(root_field, &unresolved, Some(&outcome.ancestor));
            }
        }
        Ok(())
    }

    /// A shared route through an entity succeeds if any of its entity nodes succeeds. Otherwise
    /// the fields missing from every one of them are reported.
    fn validate_shared_entity_path(
        &mut self,
        root_field: &RootFieldData,
        shared: &SharedEntityPath,
    ) -> Result<(), FederationError> {
        let mut outcomes = Vec::with_capacity(shared.nodes.len());
        for node in &shared.nodes {
            let outcome = self
                .scheduler
                .outcomes
                .get(node)
                .ok_or_else(|| internal_error!("Entity outcome unexpectedly missing"))?;
            if outcome.is_success() {
                trace!(path = %shared.path, "shared entity route is resolvable");
                return Ok(());
            }
            outcomes.push(outcome.clone());
        }
        let Some((first, others)) = outcomes.split_first() else {
            return Ok(());
        };
        let ancestor = EntityAncestor::merge(outcomes.iter().map(|outcome| &outcome.ancestor));
        for unresolved in &first.unresolved_paths {
            let mut reached_subgraph_names = unresolved.reached_subgraph_names.clone();
            for other in others {
                for other_unresolved in &other.unresolved_paths {
                    if other_unresolved.path == unresolved.path {
                        reached_subgraph_names
                            .extend(other_unresolved.reached_subgraph_names.iter().cloned());
                    }
                }
            }
            let full_path = UnresolvedPath {
                path: shared.path.join(&unresolved.path),
                state: unresolved.state.clone(),
                reached_subgraph_names,
            };
            for field in unresolved.state.unresolved_fields() {
                if others
                    .iter()
                    .all(|other| other.is_missing(&unresolved.path, &field.name))
                {
                    self.report_field(root_field, &full_path, &field.name, ancestor.as_ref());
                }
            }
        }
        Ok(())
    }

    fn report(
        &mut self,
        root_field: &RootFieldData,
        unresolved: &UnresolvedPath,
        ancestor: Option<&EntityAncestor>,
    ) {
        for field in unresolved.state.unresolved_fields() {
            self.report_field(root_field, unresolved, &field.name, ancestor);
        }
    }

    fn report_field(
        &mut self,
        root_field: &RootFieldData,
        unresolved: &UnresolvedPath,
        field_name: &Name,
        ancestor: Option<&EntityAncestor>,
    ) {
        let Some(field) = unresolved
            .state
            .unresolved_fields()
            .find(|field| field.name == *field_name)
        else {
            return;
        };
        let key = (
            unresolved.path.clone(),
            unresolved.state.type_name().clone(),
            field.name.clone(),
        );
        if !self.reported.insert(key) {
            return;
        }
        trace!(
            path = %unresolved.path,
            field = %field.name,
            "unresolvable field"
        );
        let error =
            UnresolvablePathError::new(self.graph, root_field, unresolved, field, ancestor);
        self.errors.push(error.into());
    }
}
