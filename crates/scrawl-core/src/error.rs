use thiserror::Error;

/// Errors that can occur while training or decoding with scrawl models.
#[derive(Debug, Error)]
pub enum ScrawlError {
    /// A symbol outside `a..=z` was supplied.
    #[error("invalid symbol {symbol:?} in {context}")]
    Validation {
        /// The offending character.
        symbol: char,
        /// Where the symbol was encountered.
        context: String,
    },

    /// An operation was invoked out of sequence.
    #[error("invalid state: {0}")]
    State(String),

    /// Training input was empty or contained nothing usable.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A probability lookup produced a missing or non-finite value.
    #[error("model invariant violated: {0}")]
    ModelInvariant(String),

    /// A regex pattern failed to compile (should not happen with static patterns).
    #[error("regex compilation error: {0}")]
    RegexError(#[from] regex::Error),

    /// The model blob could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ScrawlError {
    pub(crate) fn invalid_symbol(symbol: char, context: impl Into<String>) -> Self {
        Self::Validation {
            symbol,
            context: context.into(),
        }
    }
}

/// Result type alias for scrawl operations.
pub type Result<T> = std::result::Result<T, ScrawlError>;
