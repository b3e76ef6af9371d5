use std::fmt;
use std::fmt::Display;
use std::str::FromStr;

use apollo_compiler::Name;
use serde::Serialize;

use crate::display_helpers::State;
use crate::error::FederationError;
use crate::error::SingleFederationError;
use crate::graph::FieldInfo;
use crate::graph::RootKind;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum PathSegment {
    Field(Name),
    TypeCondition(Name),
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => write!(f, "{name}"),
            Self::TypeCondition(name) => write!(f, "... on {name}"),
        }
    }
}

/// The location of a selection inside an operation, from the root operation type down.
///
/// Paths recorded by entity walks are relative to the entity and have no root segment; they are
/// joined onto the path at which the entity was reached when diagnostics are produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct SelectionPath(Vec<PathSegment>);

impl SelectionPath {
    pub fn root(kind: RootKind) -> Self {
        Self(vec![PathSegment::Field(kind.path_segment())])
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub(crate) fn child(&self, segment: PathSegment) -> Self {
        let mut segments = Vec::with_capacity(self.0.len() + 1);
        segments.extend(self.0.iter().cloned());
        segments.push(segment);
        Self(segments)
    }

    pub(crate) fn join(&self, relative: &SelectionPath) -> Self {
        Self(self.0.iter().chain(relative.0.iter()).cloned().collect())
    }

    /// Whether `self` is `prefix` or one of its descendants.
    pub fn starts_with(&self, prefix: &SelectionPath) -> bool {
        self.0.starts_with(&prefix.0)
    }

    /// Whether `self` is a strict descendant of `ancestor`.
    pub fn is_descendant_of(&self, ancestor: &SelectionPath) -> bool {
        self.0.len() > ancestor.0.len() && self.starts_with(ancestor)
    }
}

impl Display for SelectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut segments = self.0.iter();
        if let Some(first) = segments.next() {
            write!(f, "{first}")?;
        }
        segments.try_for_each(|segment| write!(f, ".{segment}"))
    }
}

impl FromStr for SelectionPath {
    type Err = FederationError;

    /// Parses the dotted form produced by `Display`, e.g. `query.pets.... on Cat.name`.
    ///
    /// Only periods that separate segments are split on; the leading `...` of a type condition
    /// belongs to its segment.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SingleFederationError::InvalidSubgraph {
            message: format!("Invalid selection path \"{s}\""),
        };
        let mut segments = Vec::new();
        let mut rest = s;
        while !rest.is_empty() {
            let (segment, remainder) = if let Some(condition) = rest.strip_prefix("...") {
                let condition = condition.trim_start();
                let condition = condition.strip_prefix("on").ok_or_else(invalid)?;
                let condition = condition.trim_start();
                let end = condition.find('.').unwrap_or(condition.len());
                let type_name = Name::new(condition[..end].trim_end())?;
                (PathSegment::TypeCondition(type_name), &condition[end..])
            } else {
                let end = rest.find('.').unwrap_or(rest.len());
                (PathSegment::Field(Name::new(&rest[..end])?), &rest[end..])
            };
            segments.push(segment);
            rest = match remainder.strip_prefix('.') {
                Some("") => return Err(invalid().into()),
                Some(next) => next,
                None => remainder,
            };
        }
        Ok(Self(segments))
    }
}

/// Renders the selection set that leads to an unresolvable field, flagging the field itself:
///
/// ```text
/// query {
///   friend {
///     age <--
///   }
/// }
/// ```
pub(crate) struct UnresolvableSelection<'a> {
    pub(crate) path: &'a SelectionPath,
    pub(crate) field: &'a FieldInfo,
}

impl Display for UnresolvableSelection<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut state = State::new(f);
        for segment in self.path.segments() {
            state.write(segment)?;
            state.write(" {")?;
            state.indent()?;
        }
        state.write(&self.field.name)?;
        if !self.field.is_leaf {
            state.write(" { ... }")?;
        }
        state.write(" <--")?;
        for _ in self.path.segments() {
            state.dedent()?;
            state.write("}")?;
        }
        Ok(())
    }
}
