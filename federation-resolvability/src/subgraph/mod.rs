//! A serializable description of the type graph of one subgraph: the input of
//! [`build_federated_graph`](crate::merge::build_federated_graph).

use serde::Deserialize;
use serde::Serialize;

pub(crate) mod field_set;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubgraphDefinition {
    pub name: String,
    #[serde(default)]
    pub types: Vec<TypeDefinition>,
}

impl SubgraphDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            types: Vec::new(),
        }
    }

    pub fn with_type(mut self, type_definition: TypeDefinition) -> Self {
        self.types.push(type_definition);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    Object,
    Interface,
    Union,
    Scalar,
    Enum,
    Input,
}

impl TypeKind {
    pub fn is_composite(self) -> bool {
        matches!(self, Self::Object | Self::Interface | Self::Union)
    }

    pub fn is_abstract(self) -> bool {
        matches!(self, Self::Interface | Self::Union)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeDefinition {
    pub name: String,
    pub kind: TypeKind,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    #[serde(default)]
    pub keys: Vec<KeyDefinition>,
    /// Interfaces implemented by an object or interface.
    #[serde(default)]
    pub implements: Vec<String>,
    /// Members of a union.
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub inaccessible: bool,
}

impl TypeDefinition {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            fields: Vec::new(),
            keys: Vec::new(),
            implements: Vec::new(),
            members: Vec::new(),
            inaccessible: false,
        }
    }

    pub fn object(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Object)
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Interface)
    }

    pub fn union<T: Into<String>>(
        name: impl Into<String>,
        members: impl IntoIterator<Item = T>,
    ) -> Self {
        let mut union = Self::new(name, TypeKind::Union);
        union.members = members.into_iter().map(Into::into).collect();
        union
    }

    pub fn scalar(name: impl Into<String>) -> Self {
        Self::new(name, TypeKind::Scalar)
    }

    pub fn field(mut self, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        self.fields.push(FieldDefinition::new(name, type_name));
        self
    }

    pub fn external_field(
        mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        let mut field = FieldDefinition::new(name, type_name);
        field.external = true;
        self.fields.push(field);
        self
    }

    pub fn inaccessible_field(
        mut self,
        name: impl Into<String>,
        type_name: impl Into<String>,
    ) -> Self {
        let mut field = FieldDefinition::new(name, type_name);
        field.inaccessible = true;
        self.fields.push(field);
        self
    }

    pub fn key(mut self, fields: impl Into<String>) -> Self {
        self.keys.push(KeyDefinition {
            fields: fields.into(),
            resolvable: true,
        });
        self
    }

    /// A `@key(fields: ..., resolvable: false)`: the subgraph can reference the entity but
    /// cannot be jumped to.
    pub fn unresolvable_key(mut self, fields: impl Into<String>) -> Self {
        self.keys.push(KeyDefinition {
            fields: fields.into(),
            resolvable: false,
        });
        self
    }

    pub fn implements(mut self, interface_name: impl Into<String>) -> Self {
        self.implements.push(interface_name.into());
        self
    }

    pub fn inaccessible(mut self) -> Self {
        self.inaccessible = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDefinition {
    pub name: String,
    /// The named type of the field, without list or non-null wrappers.
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub external: bool,
    #[serde(default)]
    pub inaccessible: bool,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            external: false,
            inaccessible: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeyDefinition {
    pub fields: String,
    #[serde(default = "default_resolvable")]
    pub resolvable: bool,
}

fn default_resolvable() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn deserializes_with_defaults() {
        let subgraph: SubgraphDefinition = serde_json::from_str(
            r#"{
                "name": "subgraph-a",
                "types": [
                    { "name": "Query", "kind": "object", "fields": [{ "name": "entity", "type": "Entity" }] },
                    {
                        "name": "Entity",
                        "kind": "object",
                        "keys": [{ "fields": "id" }, { "fields": "upc", "resolvable": false }],
                        "fields": [{ "name": "id", "type": "ID" }, { "name": "name", "type": "String", "external": true }]
                    }
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(
            subgraph,
            SubgraphDefinition::new("subgraph-a")
                .with_type(TypeDefinition::object("Query").field("entity", "Entity"))
                .with_type(
                    TypeDefinition::object("Entity")
                        .key("id")
                        .unresolvable_key("upc")
                        .field("id", "ID")
                        .external_field("name", "String")
                )
        );
    }

    #[test]
    fn rejects_unknown_properties() {
        let result = serde_json::from_str::<SubgraphDefinition>(
            r#"{ "name": "a", "types": [{ "name": "Query", "kind": "object", "shareable": true }] }"#,
        );
        assert!(result.is_err());
    }
}
