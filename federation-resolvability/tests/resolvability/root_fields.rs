use federation_resolvability::composition::ResolvabilityOptions;
use federation_resolvability::composition::validate_subgraphs;
use federation_resolvability::error::CompositionError;
use federation_resolvability::subgraph::SubgraphDefinition;
use federation_resolvability::subgraph::TypeDefinition;
use pretty_assertions::assert_eq;

use super::assert_resolvable;
use super::messages;
use super::validate;

fn friend_split_across_subgraphs() -> Vec<SubgraphDefinition> {
    vec![
        SubgraphDefinition::new("subgraph-d")
            .with_type(TypeDefinition::object("Query").field("friend", "Friend"))
            .with_type(TypeDefinition::object("Friend").field("name", "String")),
        SubgraphDefinition::new("subgraph-f")
            .with_type(TypeDefinition::object("Friend").field("age", "Int")),
    ]
}

#[test]
fn field_of_another_subgraph_is_unresolvable_without_keys() {
    insta::assert_snapshot!(messages(&friend_split_across_subgraphs()), @r###"
    The field "age" is unresolvable at the following path:
    query {
      friend {
        age <--
      }
    }
    This is because:
     - The root type field "Query.friend" is defined in the following subgraph: "subgraph-d".
     - The field "Friend.age" is defined in the following subgraph: "subgraph-f".
     - The type "Friend" is not a descendant of an entity ancestor that can provide a shared route to access "age".
     - The type "Friend" has no entity edges, so "age" cannot be reached by jumping to another subgraph from it.
    "###);
}

#[test]
fn diagnostics_carry_their_location() {
    let errors = validate(&friend_split_across_subgraphs());
    assert_eq!(errors.len(), 1);
    let CompositionError::UnresolvablePath(error) = &errors[0];
    assert_eq!(errors[0].code(), "UNRESOLVABLE_PATH");
    assert_eq!(error.field_name.as_str(), "age");
    assert_eq!(error.type_name.as_str(), "Friend");
    assert_eq!(error.path.to_string(), "query.friend");
    assert_eq!(error.reasons.len(), 4);
}

#[test]
fn shared_root_field_combines_the_fields_of_each_subgraph() {
    assert_resolvable(&[
        SubgraphDefinition::new("subgraph-a")
            .with_type(TypeDefinition::object("Query").field("friend", "Friend"))
            .with_type(TypeDefinition::object("Friend").field("name", "String")),
        SubgraphDefinition::new("subgraph-e")
            .with_type(TypeDefinition::object("Query").field("friend", "Friend"))
            .with_type(TypeDefinition::object("Friend").field("age", "Int")),
    ]);
}

#[test]
fn shared_root_field_resolves_nested_chains_per_subgraph() {
    let subgraph = |name: &str, leaf_field: &str| {
        SubgraphDefinition::new(name)
            .with_type(TypeDefinition::object("Query").field("nested", "Nested"))
            .with_type(TypeDefinition::object("Nested").field("nested2", "Nested2"))
            .with_type(TypeDefinition::object("Nested2").field("nested3", "Nested3"))
            .with_type(TypeDefinition::object("Nested3").field("nested4", "Nested4"))
            .with_type(TypeDefinition::object("Nested4").field(leaf_field, "String"))
    };
    assert_resolvable(&[subgraph("subgraph-a", "name"), subgraph("subgraph-b", "age")]);
}

#[test]
fn cycles_are_walked_once() {
    assert_resolvable(&[SubgraphDefinition::new("subgraph-a")
        .with_type(TypeDefinition::object("Query").field("user", "User"))
        .with_type(
            TypeDefinition::object("User")
                .field("name", "String")
                .field("friends", "User"),
        )]);
}

#[test]
fn cycles_report_the_first_path_only() {
    let errors = validate(&[
        SubgraphDefinition::new("subgraph-a")
            .with_type(TypeDefinition::object("Query").field("user", "User"))
            .with_type(
                TypeDefinition::object("User")
                    .field("name", "String")
                    .field("friends", "User"),
            ),
        SubgraphDefinition::new("subgraph-b")
            .with_type(TypeDefinition::object("User").field("age", "Int")),
    ]);
    let paths = errors
        .iter()
        .map(|CompositionError::UnresolvablePath(error)| {
            format!("{}.{}", error.path, error.field_name)
        })
        .collect::<Vec<_>>();
    assert_eq!(paths, vec!["query.user.age"]);
}

#[test]
fn diamonds_report_the_shared_node_once() {
    insta::assert_snapshot!(messages(&[
        SubgraphDefinition::new("subgraph-a")
            .with_type(TypeDefinition::object("Query").field("a", "A"))
            .with_type(TypeDefinition::object("A").field("b", "B").field("c", "C"))
            .with_type(TypeDefinition::object("B").field("d", "D"))
            .with_type(TypeDefinition::object("C").field("d", "D"))
            .with_type(TypeDefinition::object("D").field("name", "String")),
        SubgraphDefinition::new("subgraph-b")
            .with_type(TypeDefinition::object("D").field("age", "Int")),
    ]), @r###"
    The field "age" is unresolvable at the following path:
    query {
      a {
        b {
          d {
            age <--
          }
        }
      }
    }
    This is because:
     - The root type field "Query.a" is defined in the following subgraph: "subgraph-a".
     - The field "D.age" is defined in the following subgraph: "subgraph-b".
     - The type "D" is not a descendant of an entity ancestor that can provide a shared route to access "age".
     - The type "D" has no entity edges, so "age" cannot be reached by jumping to another subgraph from it.
    "###);
}

#[test]
fn external_declarations_are_explained() {
    insta::assert_snapshot!(messages(&[
        SubgraphDefinition::new("subgraph-a")
            .with_type(TypeDefinition::object("Query").field("product", "Product"))
            .with_type(
                TypeDefinition::object("Product")
                    .field("id", "ID")
                    .external_field("price", "Int"),
            ),
        SubgraphDefinition::new("subgraph-b").with_type(
            TypeDefinition::object("Product")
                .field("id", "ID")
                .field("price", "Int"),
        ),
    ]), @r###"
    The field "price" is unresolvable at the following path:
    query {
      product {
        price <--
      }
    }
    This is because:
     - The root type field "Query.product" is defined in the following subgraph: "subgraph-a".
     - The field "Product.price" is defined in the following subgraph: "subgraph-b".
     - The field "Product.price" is declared "@external" in the following subgraph: "subgraph-a".
     - The type "Product" is not a descendant of an entity ancestor that can provide a shared route to access "price".
     - The type "Product" has no entity edges, so "price" cannot be reached by jumping to another subgraph from it.
    "###);
}

#[test]
fn root_types_are_validated_in_operation_order() {
    let errors = validate(&[
        SubgraphDefinition::new("subgraph-a")
            .with_type(TypeDefinition::object("Mutation").field("updateFriend", "Friend"))
            .with_type(TypeDefinition::object("Query").field("friend", "Friend"))
            .with_type(TypeDefinition::object("Friend").field("name", "String")),
        SubgraphDefinition::new("subgraph-b")
            .with_type(TypeDefinition::object("Friend").field("age", "Int")),
    ]);
    let paths = errors
        .iter()
        .map(|CompositionError::UnresolvablePath(error)| {
            format!("{}.{}", error.path, error.field_name)
        })
        .collect::<Vec<_>>();
    assert_eq!(paths, vec!["query.friend.age", "mutation.updateFriend.age"]);
}

#[test]
fn diagnostics_are_deterministic() {
    let subgraphs = friend_split_across_subgraphs();
    assert_eq!(messages(&subgraphs), messages(&subgraphs));
}

#[test]
fn disabled_validation_reports_nothing() {
    let options = ResolvabilityOptions {
        disable_resolvability_validation: true,
    };
    let result = validate_subgraphs(&friend_split_across_subgraphs(), &options).unwrap();
    assert!(result.is_ok());
}
