//! ## Usage
//!
//! This crate implements the resolvability pass of federated schema composition. Given the
//! subgraphs of a federated graph, it proves that every field a client can select is reachable
//! from some root field through the subgraphs that define it, possibly by jumping between
//! subgraphs through entity keys, and explains every field that is not.
//!
//! ```rust
//! use federation_resolvability::composition::ResolvabilityOptions;
//! use federation_resolvability::composition::validate_subgraphs;
//! use federation_resolvability::subgraph::SubgraphDefinition;
//! use federation_resolvability::subgraph::TypeDefinition;
//!
//! let subgraphs = [SubgraphDefinition::new("users").with_type(
//!     TypeDefinition::object("Query").field("me", "String"),
//! )];
//! let result = validate_subgraphs(&subgraphs, &ResolvabilityOptions::default()).unwrap();
//! assert!(result.is_ok());
//! ```
//!
//! ## Crate versioning
//!
//! The `federation-resolvability` crate does **not** adhere to [Semantic Versioning](https://semver.org/).
//! Any version may have breaking API changes, as this API is expected to only be used by the
//! composition pipeline.

#![warn(
    rustdoc::broken_intra_doc_links,
    unreachable_pub,
    unreachable_patterns,
    unused,
    unused_qualifications,
    dead_code,
    while_true,
    unconditional_panic,
    clippy::all
)]

pub mod composition;
mod display_helpers;
pub mod error;
pub mod graph;
pub mod merge;
pub mod subgraph;
pub(crate) mod utils;

pub use crate::composition::ResolvabilityOptions;
pub use crate::composition::validate_resolvability;
pub use crate::composition::validate_subgraphs;
pub use crate::graph::FederatedGraph;
pub use crate::merge::build_federated_graph;
