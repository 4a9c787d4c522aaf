//! # `pairmill` BPE Tokenizer
//!
//! A byte pair encoding tokenizer built around an incremental training
//! engine: instead of recounting every pair on every iteration, the corpus
//! lives in a doubly-linked token stream and an indexed max-heap tracks the
//! occurrence set of every adjacent pair, so each merge costs time
//! proportional to the occurrences it rewrites.
//!
//! See:
//! * [`Tokenizer`] for the user-facing model (`fit` / `encode` / `decode` /
//!   `save` / `load`).
//! * [`pretok`] for the chunk-boundary rules (regex or split bytes).
//! * [`training`] for the stream + heap engine.
//!
//! ```rust,ignore
//! use pairmill::{SplitRule, Tokenizer};
//!
//! let mut tok: Tokenizer<u32> = Tokenizer::new(SplitRule::split_bytes(" "));
//! let effective = tok.fit_file(50_000, "corpus.txt", None)?;
//!
//! let ids = tok.encode("hello world")?;
//! assert_eq!(tok.decode_to_string(&ids)?, "hello world");
//!
//! tok.save("tokenizer.bpe")?;
//! ```
#![warn(missing_docs, unused)]

pub mod encode;
pub mod errors;
pub mod pretok;
pub mod training;
pub mod types;
pub mod vocab;

mod tokenizer;

#[doc(inline)]
pub use errors::{PairmillError, PmResult};
#[doc(inline)]
pub use pretok::SplitRule;
#[doc(inline)]
pub use tokenizer::Tokenizer;
#[doc(inline)]
pub use training::{PairStreamTrainer, TrainOutcome, TrainerOptions};
#[doc(inline)]
pub use types::{Pair, TokenType};
#[doc(inline)]
pub use vocab::MergeVocab;
