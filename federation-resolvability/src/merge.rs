//! The minimal merge needed to validate resolvability: it builds the [`FederatedGraph`] of a set
//! of subgraphs without checking them for type or field conflicts.

use std::sync::Arc;

use apollo_compiler::Name;
use indexmap::IndexMap;
use indexmap::IndexSet;
use tracing::debug;

use crate::error::FederationError;
use crate::error::SingleFederationError;
use crate::error::name;
use crate::graph::FederatedGraph;
use crate::graph::FieldInfo;
use crate::graph::RootKind;
use crate::graph::build_graph::GraphBuilder;
use crate::graph::build_graph::NodeOptions;
use crate::subgraph::SubgraphDefinition;
use crate::subgraph::TypeDefinition;
use crate::subgraph::TypeKind;
use crate::subgraph::field_set::KeyFieldSet;

struct MergedType {
    kind: TypeKind,
    inaccessible: bool,
    fields: IndexMap<Name, FieldInfo>,
    inaccessible_fields: IndexSet<Name>,
}

struct Merger<'a> {
    subgraphs: &'a [SubgraphDefinition],
    builder: GraphBuilder,
    /// The first kind each type was declared with, across all subgraphs.
    kinds: IndexMap<&'a str, TypeKind>,
    /// Every key field set of each object type, across all subgraphs.
    key_field_sets: IndexMap<&'a str, Vec<KeyFieldSet>>,
    merged_types: IndexMap<Name, MergedType>,
}

/// Builds the resolvability graph of the given subgraphs.
///
/// Entities are object types with at least one `@key`. A subgraph satisfies a key field set of
/// an entity when it declares every top-level field of that set without `@external`; only
/// resolvable keys make a subgraph a target of entity jumps.
pub fn build_federated_graph(
    subgraphs: &[SubgraphDefinition],
) -> Result<FederatedGraph, FederationError> {
    let mut merger = Merger::new(subgraphs)?;
    merger.index_entities()?;
    for subgraph in subgraphs {
        merger.add_subgraph(subgraph)?;
    }
    merger.merge_field_data()?;
    merger.initialize_nodes()?;
    let graph = merger.builder.build();
    debug!(
        subgraphs = subgraphs.len(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "built federated graph"
    );
    Ok(graph)
}

impl<'a> Merger<'a> {
    fn new(subgraphs: &'a [SubgraphDefinition]) -> Result<Self, FederationError> {
        let mut subgraph_names = IndexSet::new();
        let mut kinds = IndexMap::new();
        for subgraph in subgraphs {
            if !subgraph_names.insert(subgraph.name.as_str()) {
                return Err(SingleFederationError::InvalidSubgraph {
                    message: format!("A subgraph named \"{}\" already exists", subgraph.name),
                }
                .into());
            }
            for type_definition in &subgraph.types {
                kinds
                    .entry(type_definition.name.as_str())
                    .or_insert(type_definition.kind);
            }
        }
        Ok(Self {
            subgraphs,
            builder: GraphBuilder::new(),
            kinds,
            key_field_sets: IndexMap::new(),
            merged_types: IndexMap::new(),
        })
    }

    fn node_options(&self, local_kinds: &IndexMap<&str, TypeKind>, type_name: &str) -> NodeOptions {
        let kind = local_kinds
            .get(type_name)
            .or_else(|| self.kinds.get(type_name));
        match kind {
            Some(kind) if kind.is_composite() => NodeOptions {
                is_abstract: kind.is_abstract(),
                is_leaf: false,
            },
            _ => NodeOptions {
                is_abstract: false,
                is_leaf: true,
            },
        }
    }

    fn index_entities(&mut self) -> Result<(), FederationError> {
        for subgraph in self.subgraphs {
            let subgraph_name: Arc<str> = Arc::from(subgraph.name.as_str());
            for type_definition in &subgraph.types {
                if type_definition.kind != TypeKind::Object || type_definition.keys.is_empty() {
                    continue;
                }
                let entity_index = self.builder.entity_index_mut(&type_definition.name)?;
                let field_sets = self
                    .key_field_sets
                    .entry(type_definition.name.as_str())
                    .or_default();
                for key in &type_definition.keys {
                    let field_set = KeyFieldSet::parse(&type_definition.name, &key.fields)?;
                    if key.resolvable {
                        entity_index.add_target_subgraph_by_field_set(
                            field_set.normalized(),
                            subgraph_name.clone(),
                        );
                    }
                    if !field_sets.contains(&field_set) {
                        field_sets.push(field_set);
                    }
                }
            }
        }
        Ok(())
    }

    fn add_subgraph(&mut self, subgraph: &'a SubgraphDefinition) -> Result<(), FederationError> {
        self.builder.set_subgraph_name(&subgraph.name);
        let local_kinds = subgraph
            .types
            .iter()
            .map(|type_definition| (type_definition.name.as_str(), type_definition.kind))
            .collect::<IndexMap<_, _>>();

        for type_definition in &subgraph.types {
            match type_definition.kind {
                TypeKind::Object => {
                    if let Some(kind) = RootKind::from_type_name(&type_definition.name) {
                        for field in &type_definition.fields {
                            let options = self.node_options(&local_kinds, &field.type_name);
                            let tail = self.builder.add_or_update_node(&field.type_name, options)?;
                            self.builder.add_root_edge(kind, tail, &field.name)?;
                        }
                    } else {
                        self.add_object(&local_kinds, type_definition)?;
                    }
                }
                TypeKind::Interface => {
                    self.builder
                        .add_or_update_node(&type_definition.name, NodeOptions {
                            is_abstract: true,
                            is_leaf: false,
                        })?;
                }
                TypeKind::Union => {
                    let head = self
                        .builder
                        .add_or_update_node(&type_definition.name, NodeOptions {
                            is_abstract: true,
                            is_leaf: false,
                        })?;
                    for member in &type_definition.members {
                        let options = self.node_options(&local_kinds, member);
                        let tail = self.builder.add_or_update_node(member, options)?;
                        self.builder.add_abstract_edge(head, tail)?;
                    }
                }
                TypeKind::Scalar | TypeKind::Enum | TypeKind::Input => {
                    self.builder
                        .add_or_update_node(&type_definition.name, NodeOptions {
                            is_abstract: false,
                            is_leaf: true,
                        })?;
                }
            }
        }
        Ok(())
    }

    fn add_object(
        &mut self,
        local_kinds: &IndexMap<&str, TypeKind>,
        type_definition: &'a TypeDefinition,
    ) -> Result<(), FederationError> {
        let head = self
            .builder
            .add_or_update_node(&type_definition.name, NodeOptions::default())?;
        for field in &type_definition.fields {
            let options = self.node_options(local_kinds, &field.type_name);
            let tail = self.builder.add_or_update_node(&field.type_name, options)?;
            if field.external {
                self.builder.add_external_edge(head, tail, &field.name)?;
            } else {
                self.builder.add_edge(head, tail, &field.name)?;
            }
        }
        for interface_name in &type_definition.implements {
            let interface = self.builder.add_or_update_node(interface_name, NodeOptions {
                is_abstract: true,
                is_leaf: false,
            })?;
            self.builder.add_abstract_edge(interface, head)?;
        }

        let Some(field_sets) = self.key_field_sets.get(type_definition.name.as_str()) else {
            return Ok(());
        };
        let provided_fields = type_definition
            .fields
            .iter()
            .filter(|field| !field.external)
            .map(|field| field.name.as_str())
            .collect::<IndexSet<_>>();
        for field_set in field_sets {
            let is_satisfied = field_set
                .top_level_field_names()
                .all(|field_name| provided_fields.contains(field_name.as_str()));
            if is_satisfied {
                self.builder
                    .add_satisfied_field_set(head, field_set.normalized())?;
            }
        }
        Ok(())
    }

    fn merge_field_data(&mut self) -> Result<(), FederationError> {
        for subgraph in self.subgraphs {
            let subgraph_name: Arc<str> = Arc::from(subgraph.name.as_str());
            for type_definition in &subgraph.types {
                let type_name = name(&type_definition.name)?;
                let merged = self
                    .merged_types
                    .entry(type_name)
                    .or_insert_with(|| MergedType {
                        kind: type_definition.kind,
                        inaccessible: false,
                        fields: IndexMap::new(),
                        inaccessible_fields: IndexSet::new(),
                    });
                merged.inaccessible |= type_definition.inaccessible;
                if !matches!(type_definition.kind, TypeKind::Object | TypeKind::Interface) {
                    continue;
                }
                for field in &type_definition.fields {
                    let field_name = name(&field.name)?;
                    if field.inaccessible {
                        merged.inaccessible_fields.insert(field_name.clone());
                    }
                    if !merged.fields.contains_key(&field_name) {
                        let is_leaf = !self
                            .kinds
                            .get(field.type_name.as_str())
                            .is_some_and(|kind| kind.is_composite());
                        merged.fields.insert(field_name.clone(), FieldInfo {
                            name: field_name.clone(),
                            named_type_name: name(&field.type_name)?,
                            is_leaf,
                            subgraph_names: IndexSet::new(),
                        });
                    }
                    if !field.external {
                        if let Some(info) = merged.fields.get_mut(&field_name) {
                            info.subgraph_names.insert(subgraph_name.clone());
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Installs the accessible field data of every object and interface. A field is dropped when
    /// it or its named type is `@inaccessible` in any subgraph.
    fn initialize_nodes(&mut self) -> Result<(), FederationError> {
        let inaccessible_types = self
            .merged_types
            .iter()
            .filter(|(_, merged)| merged.inaccessible)
            .map(|(type_name, _)| type_name.clone())
            .collect::<IndexSet<_>>();
        for type_name in &inaccessible_types {
            self.builder.set_node_inaccessible(type_name);
        }
        for (type_name, merged) in &self.merged_types {
            if !matches!(merged.kind, TypeKind::Object | TypeKind::Interface) {
                continue;
            }
            let field_data = merged
                .fields
                .iter()
                .filter(|(field_name, info)| {
                    !merged.inaccessible_fields.contains(*field_name)
                        && !inaccessible_types.contains(&info.named_type_name)
                })
                .map(|(field_name, info)| (field_name.clone(), info.clone()))
                .collect();
            self.builder.initialize_node(type_name, field_data)?;
        }
        Ok(())
    }
}
