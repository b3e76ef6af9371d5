use apollo_compiler::Name;
use apollo_compiler::ast;
use itertools::Itertools;

use crate::error::FederationError;
use crate::error::SingleFederationError;

/// A parsed `@key(fields: ...)` selection set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct KeyFieldSet {
    selections: Vec<KeySelection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct KeySelection {
    field_name: Name,
    selections: Vec<KeySelection>,
}

impl KeyFieldSet {
    pub(crate) fn parse(type_name: &str, fields: &str) -> Result<Self, FederationError> {
        let invalid = |message: String| SingleFederationError::InvalidFieldSet {
            type_name: type_name.to_string(),
            field_set: fields.to_string(),
            message,
        };
        // A field set is a selection set without its braces.
        let document = ast::Document::parse(format!("{{ {fields} }}"), "key_field_set.graphql")
            .map_err(|err| invalid(err.errors.to_string()))?;
        let [ast::Definition::OperationDefinition(operation)] = document.definitions.as_slice()
        else {
            return Err(invalid("a field set must be a single selection set".to_owned()).into());
        };

        fn build_selections(
            selections: &[ast::Selection],
        ) -> Result<Vec<KeySelection>, String> {
            selections
                .iter()
                .map(|selection| match selection {
                    ast::Selection::Field(field) => Ok(KeySelection {
                        field_name: field.name.clone(),
                        selections: build_selections(&field.selection_set)?,
                    }),
                    ast::Selection::FragmentSpread(_) | ast::Selection::InlineFragment(_) => {
                        Err("fragments are not allowed in key field sets".to_owned())
                    }
                })
                .collect()
        }

        let selections = build_selections(&operation.selection_set).map_err(invalid)?;
        if selections.is_empty() {
            return Err(invalid("a field set cannot be empty".to_owned()).into());
        }
        Ok(Self { selections })
    }

    pub(crate) fn top_level_field_names(&self) -> impl Iterator<Item = &Name> {
        self.selections.iter().map(|selection| &selection.field_name)
    }

    /// The canonical text of the field set, so that equivalent field sets written with different
    /// whitespace index the same key.
    pub(crate) fn normalized(&self) -> String {
        fn write_selections(selections: &[KeySelection]) -> String {
            selections
                .iter()
                .map(|selection| {
                    if selection.selections.is_empty() {
                        selection.field_name.to_string()
                    } else {
                        format!(
                            "{} {{ {} }}",
                            selection.field_name,
                            write_selections(&selection.selections)
                        )
                    }
                })
                .join(" ")
        }
        write_selections(&self.selections)
    }
}
