/// Emits a `trace!` record tagged with a `snapshot` name and serialized `data`, so a walk's
/// resolution data can be inspected from the logs. Compiled out unless the `snapshot_tracing`
/// feature is enabled.
///
/// With one value, the tag is the value's type name and the data is its JSON serialization:
/// ```ignore
/// snapshot!(unresolvable_paths, "unresolvable paths after root field walk");
/// ```
/// With an explicit tag, the data is passed through as a `tracing` value:
/// ```ignore
/// snapshot!("ResolutionState", state.to_string(), "unresolved entity path");
/// ```
macro_rules! snapshot {
    ($value:expr, $msg:literal) => {
        #[cfg(feature = "snapshot_tracing")]
        tracing::trace!(
            snapshot = std::any::type_name_of_val(&$value),
            data = serde_json::to_string(&$value).unwrap_or_default(),
            $msg
        );
    };
    ($name:literal, $value:expr, $msg:literal) => {
        #[cfg(feature = "snapshot_tracing")]
        tracing::trace!(snapshot = $name, data = $value, $msg);
    };
}

pub(crate) use snapshot;
