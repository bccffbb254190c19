use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectionError {
    /// User input that must be rejected before simulation (bad salary or
    /// balance). Surfaced to the caller as a blocked calculation.
    #[error("invalid input: {0}")]
    Validation(String),

    /// A plan identifier absent from the registry. This is a configuration
    /// defect, not a user error, and is propagated rather than recovered.
    #[error("unknown loan plan '{0}'")]
    UnknownPlan(String),
}
