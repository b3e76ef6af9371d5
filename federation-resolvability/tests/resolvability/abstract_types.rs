use federation_resolvability::subgraph::SubgraphDefinition;
use federation_resolvability::subgraph::TypeDefinition;
use rstest::rstest;

use super::assert_resolvable;
use super::messages;

fn pets(as_union: bool) -> SubgraphDefinition {
    let subgraph = SubgraphDefinition::new("subgraph-a")
        .with_type(TypeDefinition::object("Query").field("pet", "Pet"));
    let (subgraph, cat, dog) = if as_union {
        (
            subgraph.with_type(TypeDefinition::union("Pet", ["Cat", "Dog"])),
            TypeDefinition::object("Cat"),
            TypeDefinition::object("Dog"),
        )
    } else {
        (
            subgraph.with_type(TypeDefinition::interface("Pet").field("name", "String")),
            TypeDefinition::object("Cat").implements("Pet"),
            TypeDefinition::object("Dog").implements("Pet"),
        )
    };
    subgraph
        .with_type(cat.field("name", "String"))
        .with_type(dog.field("name", "String"))
}

#[rstest]
#[case::interface(false)]
#[case::union(true)]
fn abstract_types_resolve_when_every_member_does(#[case] as_union: bool) {
    assert_resolvable(&[pets(as_union)]);
}

#[rstest]
#[case::interface(false)]
#[case::union(true)]
fn one_unresolvable_member_makes_the_selection_unresolvable(#[case] as_union: bool) {
    let messages = messages(&[
        pets(as_union),
        SubgraphDefinition::new("subgraph-b")
            .with_type(TypeDefinition::object("Dog").field("breed", "String")),
    ]);
    insta::allow_duplicates! {
        insta::assert_snapshot!(messages, @r###"
        The field "breed" is unresolvable at the following path:
        query {
          pet {
            ... on Dog {
              breed <--
            }
          }
        }
        This is because:
         - The root type field "Query.pet" is defined in the following subgraph: "subgraph-a".
         - The field "Dog.breed" is defined in the following subgraph: "subgraph-b".
         - The type "Dog" is not a descendant of an entity ancestor that can provide a shared route to access "breed".
         - The type "Dog" has no entity edges, so "breed" cannot be reached by jumping to another subgraph from it.
        "###);
    }
}

#[test]
fn abstract_members_reach_entities_through_keys() {
    assert_resolvable(&[
        SubgraphDefinition::new("subgraph-a")
            .with_type(TypeDefinition::object("Query").field("pet", "Pet"))
            .with_type(TypeDefinition::interface("Pet").field("name", "String"))
            .with_type(
                TypeDefinition::object("Cat")
                    .implements("Pet")
                    .field("name", "String")
                    .field("owner", "Owner"),
            )
            .with_type(
                TypeDefinition::object("Dog")
                    .implements("Pet")
                    .field("name", "String"),
            )
            .with_type(TypeDefinition::object("Owner").key("id").field("id", "ID")),
        SubgraphDefinition::new("subgraph-b").with_type(
            TypeDefinition::object("Owner")
                .key("id")
                .field("id", "ID")
                .field("name", "String"),
        ),
    ]);
}
