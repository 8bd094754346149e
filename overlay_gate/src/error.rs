use thiserror::Error;

/// Static-configuration defects. These can never be fixed by polling again,
/// so construction fails fast instead of deferring to the readiness loop.
#[derive(Debug, Error)]
pub enum GateError {
    #[error("condition name may not be empty")]
    EmptyConditionName,
    #[error("condition '{0}' is declared more than once")]
    DuplicateCondition(String),
    #[error("dependency '{0}' is declared more than once")]
    DuplicateDependency(String),
    #[error("dependency '{0}' is not registered")]
    UnknownDependency(String),
    #[error("interception pattern '{0}' must capture exactly one identifier")]
    InvalidPattern(String),
    #[error("interception pattern failed to parse: {0}")]
    PatternSyntax(#[from] regex::Error),
}
