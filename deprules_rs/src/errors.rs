//! Error taxonomy for rule text and graph computations.
//!
//! Malformed rule text always fails fast with a typed error; a pattern that
//! matches nothing is an empty result, not an error.

use thiserror::Error;

/// Malformed wildcard or raw-regex pattern text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid pattern `{fragment}`: {message}")]
pub struct PatternSyntaxError {
    /// The offending pattern fragment as written by the user.
    pub fragment: String,
    pub message: String,
}

/// Marker name outside the allowed character set.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid marker name `{name}`: {message}")]
pub struct MarkerFormatError {
    pub name: String,
    pub message: String,
}

/// Unparseable path pattern text.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("path pattern syntax error at offset {position} near `{fragment}`: {message}")]
pub struct PathRegexSyntaxError {
    /// Byte offset into the path pattern source.
    pub position: usize,
    /// The substring the parser choked on.
    pub fragment: String,
    pub message: String,
}

/// Path pattern that parsed but cannot describe a valid alternating path.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid path pattern: {reason} (between `{left}` and `{right}`)")]
pub struct PathRegexValidationError {
    /// Rendering of the earlier of the two conflicting elements.
    pub left: String,
    /// Rendering of the later element (or the enclosing group).
    pub right: String,
    pub reason: String,
}

/// Invalid source/target sets handed to the minimum-cut computation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CutError {
    #[error("minimum cut requires at least one source item")]
    EmptySources,
    #[error("minimum cut requires at least one target item")]
    EmptyTargets,
    #[error("source and target sets overlap at `{item}`")]
    Overlapping { item: String },
}

/// Umbrella error for anything that can go wrong while building rules.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RuleError {
    #[error(transparent)]
    Pattern(#[from] PatternSyntaxError),
    #[error(transparent)]
    Marker(#[from] MarkerFormatError),
    #[error(transparent)]
    PathSyntax(#[from] PathRegexSyntaxError),
    #[error(transparent)]
    PathValidation(#[from] PathRegexValidationError),
    #[error(transparent)]
    Cut(#[from] CutError),
}
