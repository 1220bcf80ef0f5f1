use thiserror::Error;

/// Fatal extraction failures. Each of these means a structural assumption
/// about the analyzed application no longer holds, so the whole run aborts
/// with no partial output. Local pattern mismatches are not errors at all:
/// the scanners simply skip the candidate and move on.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// A type-graph node uses a generic/array/scalar shape outside the fixed
    /// supported set.
    #[error("unsupported type shape: {0}")]
    UnsupportedShape(String),

    /// A required anchor type/method/field is absent from the metadata.
    #[error("missing anchor {kind} `{name}`")]
    MissingAnchor { kind: &'static str, name: String },

    /// More than one candidate satisfied a uniqueness constraint.
    #[error("ambiguous match: {0}")]
    AmbiguousMatch(String),
}

impl ExtractError {
    pub fn missing_anchor(kind: &'static str, name: impl Into<String>) -> Self {
        ExtractError::MissingAnchor {
            kind,
            name: name.into(),
        }
    }
}
