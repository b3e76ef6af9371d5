use std::fmt;
use std::fmt::Display;
use std::sync::Arc;

use apollo_compiler::Name;
use indexmap::IndexMap;
use indexmap::IndexSet;

use super::UnresolvedPath;
use super::selection_path::SelectionPath;
use super::selection_path::UnresolvableSelection;
use crate::graph::FederatedGraph;
use crate::graph::FieldInfo;
use crate::utils::human_readable::following_subgraph_names;
use crate::utils::human_readable::human_readable_subgraph_names;
use crate::utils::human_readable::pluralize;

/// The root field a walk started from.
#[derive(Debug, Clone)]
pub(crate) struct RootFieldData {
    pub(crate) coordinates: String,
    pub(crate) subgraph_names: IndexSet<Arc<str>>,
    pub(crate) is_shared: bool,
}

/// The entity (or entities, for a shared route) from which a nested field could not be reached.
#[derive(Debug, Clone)]
pub(crate) struct EntityAncestor {
    pub(crate) type_name: Name,
    pub(crate) subgraph_names: IndexSet<Arc<str>>,
    pub(crate) field_sets_by_target_subgraph_name: IndexMap<Arc<str>, IndexSet<String>>,
}

impl EntityAncestor {
    /// Combines the ancestors of the same type in several subgraphs.
    pub(crate) fn merge<'a>(ancestors: impl IntoIterator<Item = &'a EntityAncestor>) -> Option<Self> {
        let mut ancestors = ancestors.into_iter();
        let mut merged = ancestors.next()?.clone();
        for ancestor in ancestors {
            merged
                .subgraph_names
                .extend(ancestor.subgraph_names.iter().cloned());
            for (subgraph_name, field_sets) in &ancestor.field_sets_by_target_subgraph_name {
                merged
                    .field_sets_by_target_subgraph_name
                    .entry(subgraph_name.clone())
                    .or_default()
                    .extend(field_sets.iter().cloned());
            }
        }
        Some(merged)
    }
}

/// A field that no route can reach at a given selection path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvablePathError {
    pub field_name: Name,
    pub type_name: Name,
    pub path: SelectionPath,
    pub selection_set: String,
    pub reasons: Vec<String>,
}

impl Display for UnresolvablePathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "The field \"{}\" is unresolvable at the following path:\n{}\nThis is because:",
            self.field_name, self.selection_set
        )?;
        for reason in &self.reasons {
            write!(f, "\n - {reason}")?;
        }
        Ok(())
    }
}

impl std::error::Error for UnresolvablePathError {}

impl UnresolvablePathError {
    pub(crate) fn new(
        graph: &FederatedGraph,
        root_field: &RootFieldData,
        unresolved: &UnresolvedPath,
        field: &FieldInfo,
        ancestor: Option<&EntityAncestor>,
    ) -> Self {
        let type_name = unresolved.state.type_name();
        let coordinates = format!("{type_name}.{}", field.name);
        let mut reasons = vec![format!(
            "The root type field \"{}\" is defined in the {}.",
            root_field.coordinates,
            following_subgraph_names(&root_field.subgraph_names)
        )];
        if field.subgraph_names.is_empty() {
            reasons.push(format!(
                "The field \"{coordinates}\" is not defined in any subgraph that can resolve it."
            ));
        } else {
            reasons.push(format!(
                "The field \"{coordinates}\" is defined in the {}.",
                following_subgraph_names(&field.subgraph_names)
            ));
        }
        if let Some(external_subgraph_names) = unresolved.state.external_subgraph_names(&field.name) {
            reasons.push(format!(
                "The field \"{coordinates}\" is declared \"@external\" in the {}.",
                following_subgraph_names(external_subgraph_names)
            ));
        }

        match ancestor {
            Some(ancestor) => {
                let ancestor_subgraphs = human_readable_subgraph_names(&ancestor.subgraph_names);
                let mut has_target = false;
                for subgraph_name in &field.subgraph_names {
                    let Some(field_sets) =
                        ancestor.field_sets_by_target_subgraph_name.get(subgraph_name)
                    else {
                        continue;
                    };
                    has_target = true;
                    if unresolved.reached_subgraph_names.contains(subgraph_name) {
                        continue;
                    }
                    for field_set in field_sets {
                        reasons.push(format!(
                            "The entity ancestor \"{}\" in {ancestor_subgraphs} does not satisfy the key field set \"{field_set}\" to access subgraph \"{subgraph_name}\".",
                            ancestor.type_name,
                        ));
                    }
                }
                if !has_target {
                    reasons.push(format!(
                        "The entity ancestor \"{}\" in {ancestor_subgraphs} has no accessible target entities (resolvable @key directives) in the {} where \"{coordinates}\" is defined.",
                        ancestor.type_name,
                        pluralize("subgraph", field.subgraph_names.len()),
                    ));
                }
                reasons.push(format!(
                    "The type \"{type_name}\" is not a descendant of any other entity ancestors that can provide a shared route to access \"{}\".",
                    field.name
                ));
            }
            None => {
                if root_field.is_shared {
                    reasons.push(format!(
                        "None of the subgraphs that share the same root type field \"{}\" can provide a route to access \"{}\".",
                        root_field.coordinates, field.name
                    ));
                }
                reasons.push(format!(
                    "The type \"{type_name}\" is not a descendant of an entity ancestor that can provide a shared route to access \"{}\".",
                    field.name
                ));
            }
        }
        if !graph.type_has_entity_edges(type_name) {
            reasons.push(format!(
                "The type \"{type_name}\" has no entity edges, so \"{}\" cannot be reached by jumping to another subgraph from it.",
                field.name
            ));
        }

        Self {
            field_name: field.name.clone(),
            type_name: type_name.clone(),
            path: unresolved.path.clone(),
            selection_set: UnresolvableSelection {
                path: &unresolved.path,
                field,
            }
            .to_string(),
            reasons,
        }
    }
}
