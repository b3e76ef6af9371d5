use federation_resolvability::error::CompositionError;
use federation_resolvability::subgraph::SubgraphDefinition;
use federation_resolvability::subgraph::TypeDefinition;
use pretty_assertions::assert_eq;

use super::assert_resolvable;
use super::messages;
use super::validate;

#[test]
fn entity_without_a_key_into_the_defining_subgraph_is_unresolvable() {
    insta::assert_snapshot!(messages(&[
        SubgraphDefinition::new("subgraph-w")
            .with_type(TypeDefinition::object("Query").field("entity", "Entity"))
            .with_type(TypeDefinition::object("Entity").key("id").field("id", "ID")),
        SubgraphDefinition::new("subgraph-v")
            .with_type(
                TypeDefinition::object("Entity")
                    .field("id", "ID")
                    .field("nestedObject", "NestedObject"),
            )
            .with_type(TypeDefinition::object("NestedObject").field("name", "String")),
    ]), @r###"
    The field "nestedObject" is unresolvable at the following path:
    query {
      entity {
        nestedObject { ... } <--
      }
    }
    This is because:
     - The root type field "Query.entity" is defined in the following subgraph: "subgraph-w".
     - The field "Entity.nestedObject" is defined in the following subgraph: "subgraph-v".
     - The entity ancestor "Entity" in subgraph "subgraph-w" has no accessible target entities (resolvable @key directives) in the subgraph where "Entity.nestedObject" is defined.
     - The type "Entity" is not a descendant of any other entity ancestors that can provide a shared route to access "nestedObject".
    "###);
}

fn user(subgraph_name: &str, field_name: &str) -> SubgraphDefinition {
    SubgraphDefinition::new(subgraph_name).with_type(
        TypeDefinition::object("User")
            .key("id")
            .field("id", "ID")
            .field(field_name, "String"),
    )
}

#[test]
fn entity_fields_are_reached_through_keys() {
    assert_resolvable(&[
        user("subgraph-a", "name")
            .with_type(TypeDefinition::object("Query").field("user", "User")),
        user("subgraph-b", "age"),
    ]);
}

#[test]
fn key_jumps_are_transitive() {
    assert_resolvable(&[
        user("subgraph-a", "name")
            .with_type(TypeDefinition::object("Query").field("user", "User")),
        SubgraphDefinition::new("subgraph-b").with_type(
            TypeDefinition::object("User")
                .key("id")
                .field("id", "ID")
                .field("email", "String"),
        ),
        SubgraphDefinition::new("subgraph-c").with_type(
            TypeDefinition::object("User")
                .key("email")
                .field("email", "String")
                .field("age", "Int"),
        ),
    ]);
}

#[test]
fn unresolvable_keys_are_not_jump_targets() {
    let subgraphs = [
        SubgraphDefinition::new("subgraph-a")
            .with_type(
                TypeDefinition::object("Query")
                    .field("user", "User")
                    .field("me", "User"),
            )
            .with_type(TypeDefinition::object("User").key("id").field("id", "ID")),
        SubgraphDefinition::new("subgraph-b").with_type(
            TypeDefinition::object("User")
                .unresolvable_key("id")
                .field("id", "ID")
                .field("age", "Int"),
        ),
    ];
    insta::assert_snapshot!(messages(&subgraphs), @r###"
    The field "age" is unresolvable at the following path:
    query {
      user {
        age <--
      }
    }
    This is because:
     - The root type field "Query.user" is defined in the following subgraph: "subgraph-a".
     - The field "User.age" is defined in the following subgraph: "subgraph-b".
     - The entity ancestor "User" in subgraph "subgraph-a" has no accessible target entities (resolvable @key directives) in the subgraph where "User.age" is defined.
     - The type "User" is not a descendant of any other entity ancestors that can provide a shared route to access "age".

    The field "age" is unresolvable at the following path:
    query {
      me {
        age <--
      }
    }
    This is because:
     - The root type field "Query.me" is defined in the following subgraph: "subgraph-a".
     - The field "User.age" is defined in the following subgraph: "subgraph-b".
     - The entity ancestor "User" in subgraph "subgraph-a" has no accessible target entities (resolvable @key directives) in the subgraph where "User.age" is defined.
     - The type "User" is not a descendant of any other entity ancestors that can provide a shared route to access "age".
    "###);
}

#[test]
fn unsatisfied_key_field_sets_are_explained() {
    insta::assert_snapshot!(messages(&[
        SubgraphDefinition::new("subgraph-a")
            .with_type(TypeDefinition::object("Query").field("user", "User"))
            .with_type(
                TypeDefinition::object("User")
                    .key("id")
                    .field("id", "ID")
                    .field("name", "String"),
            ),
        SubgraphDefinition::new("subgraph-b").with_type(
            TypeDefinition::object("User")
                .key("email")
                .field("email", "String")
                .field("age", "Int"),
        ),
    ]), @r###"
    The field "email" is unresolvable at the following path:
    query {
      user {
        email <--
      }
    }
    This is because:
     - The root type field "Query.user" is defined in the following subgraph: "subgraph-a".
     - The field "User.email" is defined in the following subgraph: "subgraph-b".
     - The entity ancestor "User" in subgraph "subgraph-a" does not satisfy the key field set "email" to access subgraph "subgraph-b".
     - The type "User" is not a descendant of any other entity ancestors that can provide a shared route to access "email".
     - The type "User" has no entity edges, so "email" cannot be reached by jumping to another subgraph from it.

    The field "age" is unresolvable at the following path:
    query {
      user {
        age <--
      }
    }
    This is because:
     - The root type field "Query.user" is defined in the following subgraph: "subgraph-a".
     - The field "User.age" is defined in the following subgraph: "subgraph-b".
     - The entity ancestor "User" in subgraph "subgraph-a" does not satisfy the key field set "email" to access subgraph "subgraph-b".
     - The type "User" is not a descendant of any other entity ancestors that can provide a shared route to access "age".
     - The type "User" has no entity edges, so "age" cannot be reached by jumping to another subgraph from it.
    "###);
}

#[test]
fn nested_entities_are_reported_at_their_full_path() {
    insta::assert_snapshot!(messages(&[
        SubgraphDefinition::new("subgraph-a")
            .with_type(TypeDefinition::object("Query").field("user", "User"))
            .with_type(
                TypeDefinition::object("User")
                    .key("id")
                    .field("id", "ID")
                    .field("favoriteProduct", "Product"),
            )
            .with_type(TypeDefinition::object("Product").key("upc").field("upc", "ID")),
        SubgraphDefinition::new("subgraph-b")
            .with_type(TypeDefinition::object("User").key("id").field("id", "ID"))
            .with_type(
                TypeDefinition::object("Product")
                    .unresolvable_key("upc")
                    .field("upc", "ID")
                    .field("price", "Int"),
            ),
    ]), @r###"
    The field "price" is unresolvable at the following path:
    query {
      user {
        favoriteProduct {
          price <--
        }
      }
    }
    This is because:
     - The root type field "Query.user" is defined in the following subgraph: "subgraph-a".
     - The field "Product.price" is defined in the following subgraph: "subgraph-b".
     - The entity ancestor "Product" in subgraph "subgraph-a" has no accessible target entities (resolvable @key directives) in the subgraph where "Product.price" is defined.
     - The type "Product" is not a descendant of any other entity ancestors that can provide a shared route to access "price".
    "###);
}

#[test]
fn entities_keying_each_other_are_resolvable() {
    let subgraph = |name: &str, with_references: bool| {
        let mut a = TypeDefinition::object("A").key("id").field("id", "ID");
        let mut b = TypeDefinition::object("B").key("id").field("id", "ID");
        if with_references {
            a = a.field("b", "B");
            b = b.field("a", "A");
        } else {
            a = a.field("name", "String");
            b = b.field("name", "String");
        }
        SubgraphDefinition::new(name).with_type(a).with_type(b)
    };
    assert_resolvable(&[
        subgraph("subgraph-a", true)
            .with_type(TypeDefinition::object("Query").field("a", "A")),
        subgraph("subgraph-b", false),
    ]);
}

#[test]
fn self_referencing_entities_are_resolvable() {
    assert_resolvable(&[
        SubgraphDefinition::new("subgraph-a")
            .with_type(TypeDefinition::object("Query").field("user", "User"))
            .with_type(
                TypeDefinition::object("User")
                    .key("id")
                    .field("id", "ID")
                    .field("name", "String")
                    .field("bestFriend", "User"),
            ),
        user("subgraph-b", "age"),
    ]);
}

#[test]
fn shared_root_field_reaching_entities_needs_one_complete_route() {
    assert_resolvable(&[
        user("subgraph-a", "name")
            .with_type(TypeDefinition::object("Query").field("user", "User")),
        user("subgraph-b", "age")
            .with_type(TypeDefinition::object("Query").field("user", "User")),
    ]);
}

#[test]
fn shared_root_field_reports_fields_no_entity_route_provides() {
    let subgraphs = [
        user("subgraph-a", "name")
            .with_type(TypeDefinition::object("Query").field("user", "User")),
        user("subgraph-b", "age")
            .with_type(TypeDefinition::object("Query").field("user", "User")),
        SubgraphDefinition::new("subgraph-c").with_type(
            TypeDefinition::object("User")
                .unresolvable_key("id")
                .field("id", "ID")
                .field("email", "String"),
        ),
    ];
    let errors = validate(&subgraphs);
    assert_eq!(errors.len(), 1);
    insta::assert_snapshot!(messages(&subgraphs), @r###"
    The field "email" is unresolvable at the following path:
    query {
      user {
        email <--
      }
    }
    This is because:
     - The root type field "Query.user" is defined in the following subgraphs: "subgraph-a", "subgraph-b".
     - The field "User.email" is defined in the following subgraph: "subgraph-c".
     - The entity ancestor "User" in subgraphs "subgraph-a", "subgraph-b" has no accessible target entities (resolvable @key directives) in the subgraph where "User.email" is defined.
     - The type "User" is not a descendant of any other entity ancestors that can provide a shared route to access "email".
    "###);
}

#[test]
fn entity_outcomes_are_shared_between_root_fields() {
    let errors = validate(&[
        SubgraphDefinition::new("subgraph-a")
            .with_type(
                TypeDefinition::object("Query")
                    .field("user", "User")
                    .field("users", "User"),
            )
            .with_type(TypeDefinition::object("User").key("id").field("id", "ID")),
        SubgraphDefinition::new("subgraph-b")
            .with_type(TypeDefinition::object("User").field("id", "ID").field("age", "Int")),
    ]);
    let paths = errors
        .iter()
        .map(|CompositionError::UnresolvablePath(error)| {
            format!("{}.{}", error.path, error.field_name)
        })
        .collect::<Vec<_>>();
    assert_eq!(paths, vec!["query.user.age", "query.users.age"]);
}

fn user_with_product(subgraph_name: &str, field_name: &str) -> SubgraphDefinition {
    SubgraphDefinition::new(subgraph_name).with_type(
        TypeDefinition::object("User")
            .key("id")
            .field("id", "ID")
            .field(field_name, "String")
            .field("product", "Product"),
    )
}

#[test]
fn entity_siblings_do_not_revalidate_resolved_nested_entities() {
    assert_resolvable(&[
        user_with_product("subgraph-a", "name")
            .with_type(TypeDefinition::object("Query").field("user", "User"))
            .with_type(
                TypeDefinition::object("Product")
                    .key("upc")
                    .field("upc", "ID")
                    .field("price", "Int"),
            ),
        user_with_product("subgraph-b", "age")
            .with_type(TypeDefinition::object("Product").field("price", "Int")),
    ]);
}

#[test]
fn nested_entity_fields_missing_from_every_reachable_copy_are_reported() {
    let errors = validate(&[
        user_with_product("subgraph-a", "name")
            .with_type(TypeDefinition::object("Query").field("user", "User"))
            .with_type(
                TypeDefinition::object("Product")
                    .key("upc")
                    .field("upc", "ID")
                    .field("price", "Int"),
            ),
        user_with_product("subgraph-b", "age")
            .with_type(TypeDefinition::object("Product").field("price", "Int")),
        SubgraphDefinition::new("subgraph-c").with_type(
            TypeDefinition::object("Product")
                .unresolvable_key("upc")
                .field("upc", "ID")
                .field("weight", "Int"),
        ),
    ]);
    let paths = errors
        .iter()
        .map(|CompositionError::UnresolvablePath(error)| {
            format!("{}.{}", error.path, error.field_name)
        })
        .collect::<Vec<_>>();
    assert_eq!(paths, vec!["query.user.product.weight"]);
}
