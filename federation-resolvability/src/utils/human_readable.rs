use itertools::Itertools;

/// Quotes and joins names the way they are printed in composition diagnostics:
/// `"a", "b", "c"`.
pub(crate) fn quoted_list<T: AsRef<str>>(names: impl IntoIterator<Item = T>) -> String {
    names
        .into_iter()
        .map(|name| format!("\"{}\"", name.as_ref()))
        .join(", ")
}

/// Prints `subgraph "a"` or `subgraphs "a", "b"` depending on how many names there are.
pub(crate) fn human_readable_subgraph_names<T: AsRef<str>>(
    names: impl IntoIterator<Item = T>,
) -> String {
    let names = names.into_iter().collect::<Vec<_>>();
    format!(
        "{} {}",
        pluralize("subgraph", names.len()),
        quoted_list(names)
    )
}

/// Prints `following subgraph: "a"` or `following subgraphs: "a", "b"`.
pub(crate) fn following_subgraph_names<T: AsRef<str>>(
    names: impl IntoIterator<Item = T>,
) -> String {
    let names = names.into_iter().collect::<Vec<_>>();
    format!(
        "following {}: {}",
        pluralize("subgraph", names.len()),
        quoted_list(names)
    )
}

pub(crate) fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_subgraph_is_not_pluralized() {
        assert_eq!(human_readable_subgraph_names(["a"]), r#"subgraph "a""#);
        assert_eq!(following_subgraph_names(["a"]), r#"following subgraph: "a""#);
    }

    #[test]
    fn several_subgraphs_are_pluralized() {
        assert_eq!(
            human_readable_subgraph_names(["a", "b"]),
            r#"subgraphs "a", "b""#
        );
        assert_eq!(
            following_subgraph_names(["a", "b", "c"]),
            r#"following subgraphs: "a", "b", "c""#
        );
    }
}
