use std::fmt;
use std::fmt::Display;
use std::sync::Arc;

use apollo_compiler::Name;
use indexmap::IndexMap;
use indexmap::IndexSet;
use itertools::Itertools;
use serde::Serialize;

use super::VisitResult;
use crate::bail;
use crate::error::FederationError;
use crate::graph::FieldData;
use crate::graph::FieldInfo;

/// Tracks which fields of one type have been proven reachable during a walk.
///
/// The declared field data is an immutable snapshot shared by every clone; only the resolution
/// sets are copied. Cloning is how a walk seeds the data of a new path from what is already known
/// about a node, so that facts gathered along one path never leak into another.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct ResolutionState {
    type_name: Name,
    #[serde(skip)]
    declared_fields: FieldData,
    resolved_fields: IndexSet<Name>,
    resolved_subtrees: IndexSet<Name>,
    external_subgraph_names_by_field: IndexMap<Name, IndexSet<Arc<str>>>,
    is_resolved: bool,
}

impl ResolutionState {
    pub(crate) fn new(type_name: Name, declared_fields: FieldData) -> Self {
        Self {
            type_name,
            declared_fields,
            resolved_fields: IndexSet::default(),
            resolved_subtrees: IndexSet::default(),
            external_subgraph_names_by_field: IndexMap::default(),
            is_resolved: false,
        }
    }

    pub(crate) fn type_name(&self) -> &Name {
        &self.type_name
    }

    fn ensure_declared(&self, field_name: &Name) -> Result<(), FederationError> {
        if !self.declared_fields.contains_key(field_name) {
            bail!(
                "Field \"{}.{field_name}\" was resolved but is not declared on the type",
                self.type_name
            );
        }
        Ok(())
    }

    pub(crate) fn mark_field_resolved(&mut self, field_name: &Name) -> Result<(), FederationError> {
        self.ensure_declared(field_name)?;
        self.resolved_fields.insert(field_name.clone());
        Ok(())
    }

    /// Marks the field and everything reachable beneath it as resolved. A resolved subtree
    /// implies a resolved field.
    pub(crate) fn mark_subtree_resolved(
        &mut self,
        field_name: &Name,
    ) -> Result<(), FederationError> {
        self.mark_field_resolved(field_name)?;
        self.resolved_subtrees.insert(field_name.clone());
        Ok(())
    }

    pub(crate) fn add_external_subgraph_name(&mut self, field_name: &Name, subgraph_name: Arc<str>) {
        self.external_subgraph_names_by_field
            .entry(field_name.clone())
            .or_default()
            .insert(subgraph_name);
    }

    /// Applies the result of visiting the edge of `field_name` from a node of `subgraph_name`.
    pub(crate) fn record_visit(
        &mut self,
        field_name: &Name,
        result: VisitResult,
        subgraph_name: &Arc<str>,
    ) -> Result<(), FederationError> {
        if result.is_external {
            self.add_external_subgraph_name(field_name, subgraph_name.clone());
            return Ok(());
        }
        if !result.visited {
            return Ok(());
        }
        if result.are_subtrees_resolved {
            self.mark_subtree_resolved(field_name)
        } else {
            self.mark_field_resolved(field_name)
        }
    }

    pub(crate) fn external_subgraph_names(&self, field_name: &Name) -> Option<&IndexSet<Arc<str>>> {
        self.external_subgraph_names_by_field.get(field_name)
    }

    pub(crate) fn is_field_resolved(&self, field_name: &Name) -> bool {
        self.resolved_fields.contains(field_name)
    }

    pub(crate) fn is_subtree_resolved(&self, field_name: &Name) -> bool {
        self.resolved_subtrees.contains(field_name)
    }

    /// Whether every declared field has been resolved. Once true, stays true.
    pub(crate) fn is_resolved(&mut self) -> bool {
        if !self.is_resolved {
            self.is_resolved = self
                .declared_fields
                .keys()
                .all(|field_name| self.resolved_fields.contains(field_name));
        }
        self.is_resolved
    }

    pub(crate) fn are_subtrees_resolved(&self) -> bool {
        self.declared_fields
            .keys()
            .all(|field_name| self.resolved_subtrees.contains(field_name))
    }

    /// Declared fields that no walk has reached yet, in declaration order.
    pub(crate) fn unresolved_fields(&self) -> impl Iterator<Item = &FieldInfo> {
        self.declared_fields
            .values()
            .filter(|field| !self.resolved_fields.contains(&field.name))
    }
}

impl Display for ResolutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]",
            self.type_name,
            self.declared_fields
                .keys()
                .map(|field_name| {
                    if self.resolved_subtrees.contains(field_name) {
                        format!("{field_name}*")
                    } else if self.resolved_fields.contains(field_name) {
                        field_name.to_string()
                    } else {
                        format!("!{field_name}")
                    }
                })
                .join(", ")
        )
    }
}
