use federation_resolvability::composition::ResolvabilityOptions;
use federation_resolvability::composition::validate_subgraphs;
use federation_resolvability::error::CompositionError;
use federation_resolvability::subgraph::SubgraphDefinition;

mod abstract_types;
mod entities;
mod inaccessible;
mod root_fields;

/// Runs the resolvability pass, panicking on internal errors.
pub(crate) fn validate(subgraphs: &[SubgraphDefinition]) -> Vec<CompositionError> {
    match validate_subgraphs(subgraphs, &ResolvabilityOptions::default())
        .expect("resolvability validation failed internally")
    {
        Ok(()) => Vec::new(),
        Err(errors) => errors,
    }
}

/// The messages of every diagnostic, separated by blank lines.
pub(crate) fn messages(subgraphs: &[SubgraphDefinition]) -> String {
    validate(subgraphs)
        .iter()
        .map(CompositionError::message)
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[track_caller]
pub(crate) fn assert_resolvable(subgraphs: &[SubgraphDefinition]) {
    let errors = validate(subgraphs);
    assert!(
        errors.is_empty(),
        "expected no diagnostics, got:\n{}",
        errors
            .iter()
            .map(CompositionError::message)
            .collect::<Vec<_>>()
            .join("\n\n")
    );
}
