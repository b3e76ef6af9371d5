use serde::Deserialize;

/// Options for the resolvability pass of composition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct ResolvabilityOptions {
    /// Skips the pass entirely, reporting no diagnostics.
    pub disable_resolvability_validation: bool,
}
