//! # Pre-Tokenizer
//!
//! The boundary-imposing front end of the tokenizer: maps a raw byte buffer
//! to a sequence of chunk ranges so that no merge ever crosses a word
//! boundary.
//!
//! Two kinds of [`SplitRule`] are recognized:
//! * *Regex* — a pattern whose matches delimit chunks; bytes between
//!   matches are discarded (GPT-style pre-tokenization, where the pattern
//!   is designed to cover all input).
//! * *Split bytes* — a set of byte values, each of which starts a new chunk.

mod chunker;
mod rule;

pub use chunker::{chunk_ranges, resolve_workers};
pub use rule::SplitRule;

/// A GPT-style word split pattern.
///
/// Requires a PCRE-compatible engine for the lookahead.
pub const GPT_STYLE_PATTERN: &str =
    r"'(?:[sdmt]|ll|ve|re)| ?\p{L}+| ?\p{N}+| ?[^\s\p{L}\p{N}]+|\s+(?!\S)|\s+";
