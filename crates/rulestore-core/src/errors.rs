/// Caller-side contract violations. Raised before any storage round-trip.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    #[error("policy type must not be empty")]
    EmptyPolicyType,

    #[error("rule must carry at least one value")]
    EmptyRule,

    #[error("rule has {len} values, at most 6 are supported")]
    TooManyFields { len: usize },

    #[error("field position {index} is outside 0..6")]
    FieldOutOfRange { index: usize },

    #[error("filter does not constrain any column")]
    UnconstrainedFilter,

    #[error("batch size mismatch: {old} old rules vs {new} new rules")]
    BatchMismatch { old: usize, new: usize },

    #[error("policy type {0:?} does not belong to a known section")]
    UnknownSection(String),

    #[error("malformed policy line: {0}")]
    MalformedLine(String),
}
