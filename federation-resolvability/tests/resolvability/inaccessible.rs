use federation_resolvability::subgraph::SubgraphDefinition;
use federation_resolvability::subgraph::TypeDefinition;

use super::assert_resolvable;

fn user_with_name() -> SubgraphDefinition {
    SubgraphDefinition::new("subgraph-a")
        .with_type(TypeDefinition::object("Query").field("user", "User"))
        .with_type(TypeDefinition::object("User").field("name", "String"))
}

#[test]
fn inaccessible_fields_do_not_block_their_parent() {
    assert_resolvable(&[
        user_with_name(),
        SubgraphDefinition::new("subgraph-b").with_type(
            TypeDefinition::object("User")
                .field("name", "String")
                .inaccessible_field("secret", "String"),
        ),
    ]);
}

#[test]
fn fields_of_inaccessible_types_are_excluded() {
    assert_resolvable(&[
        user_with_name(),
        SubgraphDefinition::new("subgraph-b")
            .with_type(
                TypeDefinition::object("User")
                    .field("name", "String")
                    .field("account", "Account"),
            )
            .with_type(TypeDefinition::object("Account").inaccessible().field("id", "ID")),
    ]);
}

#[test]
fn inaccessible_root_fields_are_skipped() {
    assert_resolvable(&[
        SubgraphDefinition::new("subgraph-a")
            .with_type(TypeDefinition::object("Query").inaccessible_field("user", "User"))
            .with_type(TypeDefinition::object("User").field("name", "String")),
        SubgraphDefinition::new("subgraph-b")
            .with_type(TypeDefinition::object("User").field("age", "Int")),
    ]);
}

#[test]
fn inaccessible_union_members_are_not_walked() {
    assert_resolvable(&[
        SubgraphDefinition::new("subgraph-a")
            .with_type(TypeDefinition::object("Query").field("pet", "Pet"))
            .with_type(TypeDefinition::union("Pet", ["Cat", "Dog"]))
            .with_type(TypeDefinition::object("Cat").field("name", "String"))
            .with_type(TypeDefinition::object("Dog").inaccessible().field("name", "String")),
        SubgraphDefinition::new("subgraph-b")
            .with_type(TypeDefinition::object("Dog").field("breed", "String")),
    ]);
}
