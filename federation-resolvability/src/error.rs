use std::fmt::Display;
use std::fmt::Formatter;
use std::fmt::Write;

use apollo_compiler::InvalidNameError;
use apollo_compiler::Name;

use crate::composition::resolvability::UnresolvablePathError;

/// Create an internal error.
///
/// # Example
/// ```rust
/// use federation_resolvability::internal_error;
/// use federation_resolvability::error::FederationError;
/// # fn may_be_none() -> Option<()> { None }
///
/// const NAME: &str = "the thing";
/// let result: Result<(), FederationError> = may_be_none()
///     .ok_or_else(|| internal_error!("Expected {NAME} to be Some"));
/// ```
#[macro_export]
macro_rules! internal_error {
    ( $( $arg:tt )+ ) => {
        $crate::error::FederationError::internal(format!( $( $arg )+ ))
    }
}

/// Break out of the current function, returning an internal error.
///
/// # Example
/// ```rust
/// use federation_resolvability::bail;
/// use federation_resolvability::error::FederationError;
/// # fn may_be_none() -> Option<()> { None }
///
/// fn example() -> Result<(), FederationError> {
///     bail!("Something went horribly wrong");
///     unreachable!()
/// }
/// #
/// # _ = example();
/// ```
#[macro_export]
macro_rules! bail {
    ( $( $arg:tt )+ ) => {
        return Err($crate::internal_error!( $( $arg )+ ).into())
    }
}

/// An error that aborts graph construction or validation entirely. These are never reported to
/// users as composition diagnostics: they indicate malformed input or a broken invariant.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SingleFederationError {
    #[error(
        "An internal error has occurred in resolvability validation, please report this bug.\n\nDetails: {message}"
    )]
    Internal { message: String },
    #[error("{message}")]
    InvalidName { message: String },
    #[error("{message}")]
    InvalidSubgraph { message: String },
    #[error("Invalid field set \"{field_set}\" for type \"{type_name}\": {message}")]
    InvalidFieldSet {
        type_name: String,
        field_set: String,
        message: String,
    },
}

impl SingleFederationError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Internal { .. } => "INTERNAL",
            Self::InvalidName { .. } => "INVALID_GRAPHQL",
            Self::InvalidSubgraph { .. } => "INVALID_SUBGRAPH",
            Self::InvalidFieldSet { .. } => "KEY_FIELDS_INVALID",
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub struct MultipleFederationErrors {
    pub errors: Vec<SingleFederationError>,
}

impl MultipleFederationErrors {
    pub fn push(&mut self, error: FederationError) {
        match error {
            FederationError::SingleFederationError(error) => {
                self.errors.push(error);
            }
            FederationError::MultipleFederationErrors(errors) => {
                self.errors.extend(errors.errors);
            }
        }
    }
}

impl Display for MultipleFederationErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "The following errors occurred:")?;
        for error in &self.errors {
            write!(f, "\n  - ")?;
            for c in error.to_string().chars() {
                if c == '\n' {
                    write!(f, "\n    ")?;
                } else {
                    f.write_char(c)?;
                }
            }
        }
        Ok(())
    }
}

impl FromIterator<SingleFederationError> for MultipleFederationErrors {
    fn from_iter<T: IntoIterator<Item = SingleFederationError>>(iter: T) -> Self {
        Self {
            errors: iter.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum FederationError {
    #[error(transparent)]
    SingleFederationError(#[from] SingleFederationError),
    #[error(transparent)]
    MultipleFederationErrors(#[from] MultipleFederationErrors),
}

impl FederationError {
    pub fn internal(message: impl Into<String>) -> Self {
        SingleFederationError::Internal {
            message: message.into(),
        }
        .into()
    }

    pub fn merge(self, other: Self) -> Self {
        let mut result = MultipleFederationErrors { errors: Vec::new() };
        result.push(self);
        result.push(other);
        result.into()
    }

    pub fn errors(&self) -> Vec<&SingleFederationError> {
        match self {
            Self::SingleFederationError(error) => vec![error],
            Self::MultipleFederationErrors(errors) => errors.errors.iter().collect(),
        }
    }

    pub fn has_invalid_graphql_error(&self) -> bool {
        self.errors()
            .into_iter()
            .any(|e| matches!(e, SingleFederationError::InvalidName { .. }))
    }
}

impl From<InvalidNameError> for FederationError {
    fn from(err: InvalidNameError) -> Self {
        SingleFederationError::InvalidName {
            message: err.to_string(),
        }
        .into()
    }
}

/// Validates a GraphQL name coming from user input.
pub(crate) fn name(value: &str) -> Result<Name, FederationError> {
    Ok(Name::new(value)?)
}

/// A user-facing composition diagnostic. Unlike [`FederationError`], these never abort the
/// validation run: all of them are collected and reported together.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CompositionError {
    #[error(transparent)]
    UnresolvablePath(#[from] UnresolvablePathError),
}

impl CompositionError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnresolvablePath(_) => "UNRESOLVABLE_PATH",
        }
    }

    pub fn message(&self) -> String {
        self.to_string()
    }
}
