mod options;
pub mod resolvability;

pub use self::options::ResolvabilityOptions;
pub use self::resolvability::validate_resolvability;
use crate::error::CompositionError;
use crate::error::FederationError;
use crate::merge::build_federated_graph;
use crate::subgraph::SubgraphDefinition;

/// Builds the federated graph of the subgraphs and checks that every field is resolvable.
///
/// The outer `Result` fails when the subgraphs cannot be merged into a graph at all.
pub fn validate_subgraphs(
    subgraphs: &[SubgraphDefinition],
    options: &ResolvabilityOptions,
) -> Result<Result<(), Vec<CompositionError>>, FederationError> {
    let graph = build_federated_graph(subgraphs)?;
    validate_resolvability(&graph, options)
}
