//! # Training Engine
//!
//! Incremental BPE training over a doubly-linked token stream:
//!
//! * [`TokenStream`] — the corpus as a mutable linked sequence of tokens,
//!   arena-backed with `u32` node handles.
//! * [`PairHeap`] — an indexed max-heap over *pair → occurrence count*,
//!   where each entry carries the set of stream positions of its pair.
//! * [`PairStreamTrainer`] — the merge driver: pop the most frequent pair,
//!   rewrite every occurrence, patch the index for the affected neighbors,
//!   repeat.
//!
//! Each merge iteration costs time proportional to the occurrences of the
//! merged pair (plus heap sifts), not to the corpus length.

mod pair_heap;
mod token_stream;
mod trainer;

pub use pair_heap::PairHeap;
pub use token_stream::{NIL, TokenStream};
pub use trainer::{PairStreamTrainer, TrainOutcome, TrainerOptions, check_vocab_size};
