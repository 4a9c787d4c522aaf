//! # Error Types

/// Errors from pairmill operations.
#[derive(Debug, thiserror::Error)]
pub enum PairmillError {
    /// Invalid pre-tokenizer or trainer configuration.
    #[error("config error: {0}")]
    Config(String),

    /// A regex pattern failed to compile or to match.
    #[error("pattern error: {0}")]
    Pattern(String),

    /// Vocab size is below the minimum (256, the byte space).
    #[error("vocab size ({size}) must be >= 256")]
    VocabSizeTooSmall {
        /// The vocab size that was too small.
        size: usize,
    },

    /// Vocab size exceeds the capacity of the target token type.
    #[error("vocab size ({size}) exceeds token type capacity")]
    VocabSizeOverflow {
        /// The vocab size that exceeded the capacity.
        size: usize,
    },

    /// I/O error.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Model file is malformed.
    #[error("model format: {0}")]
    ModelFormat(String),

    /// A token identifier is outside the vocabulary.
    #[error("token {token} out of vocab range ({size})")]
    TokenOutOfRange {
        /// The offending identifier.
        token: u64,
        /// The vocabulary size.
        size: usize,
    },

    /// Decoded bytes are not valid UTF-8.
    #[error(transparent)]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Result type for pairmill operations.
pub type PmResult<T> = core::result::Result<T, PairmillError>;
