//! # Pair Stream Trainer

use core::marker::PhantomData;
use core::ops::Range;

use crate::errors::{PairmillError, PmResult};
use crate::pretok::{SplitRule, chunk_ranges, resolve_workers};
use crate::training::pair_heap::PairHeap;
use crate::training::token_stream::{NIL, TokenStream};
use crate::types::{BYTE_TOKENS, Pair, TokenType, boundary};

/// Validate a target vocab size against `T`.
///
/// The size must cover at least the byte tokens, and every identifier
/// `0..size` must be representable below the boundary sentinel
/// (`T::max_value()`).
pub fn check_vocab_size<T: TokenType>(size: usize) -> PmResult<()> {
    if size < BYTE_TOKENS {
        return Err(PairmillError::VocabSizeTooSmall { size });
    }
    if T::from_usize(size).is_none() {
        return Err(PairmillError::VocabSizeOverflow { size });
    }
    Ok(())
}

/// Options for [`PairStreamTrainer`].
#[derive(Debug, Clone)]
pub struct TrainerOptions {
    /// The pre-tokenizer rule.
    pub rule: SplitRule,

    /// The target vocab size.
    pub vocab_size: usize,

    /// Worker count for pre-tokenization; defaults to available parallelism.
    pub workers: Option<usize>,

    /// Cap the heap at `vocab_size - 256` entries after every iteration.
    ///
    /// On by default. Bounds memory at the cost of forgetting occurrence
    /// sets of low-count pairs; a dropped pair re-enters the index when it
    /// gains new occurrences.
    pub truncate_heap: bool,
}

impl TrainerOptions {
    /// Create new options.
    ///
    /// ## Arguments
    /// * `rule` - The pre-tokenizer rule.
    /// * `vocab_size` - The target vocabulary size.
    pub fn new(
        rule: SplitRule,
        vocab_size: usize,
    ) -> Self {
        Self {
            rule,
            vocab_size,
            workers: None,
            truncate_heap: true,
        }
    }

    /// Sets the vocab size.
    pub fn with_vocab_size(
        self,
        vocab_size: usize,
    ) -> Self {
        Self { vocab_size, ..self }
    }

    /// Sets the pre-tokenization worker count.
    pub fn with_workers(
        self,
        workers: usize,
    ) -> Self {
        Self {
            workers: Some(workers),
            ..self
        }
    }

    /// Enables or disables per-iteration heap truncation.
    pub fn with_heap_truncation(
        self,
        truncate_heap: bool,
    ) -> Self {
        Self {
            truncate_heap,
            ..self
        }
    }

    /// Initializes a [`PairStreamTrainer`] from these options.
    pub fn init<T: TokenType>(self) -> PairStreamTrainer<T> {
        PairStreamTrainer::new(self)
    }
}

/// Results of a training run.
#[derive(Debug, Clone)]
pub struct TrainOutcome<T: TokenType> {
    /// Learned merges: the i-th record defines identifier `256 + i`.
    pub merges: Vec<Pair<T>>,

    /// The effective vocab size, `256 + merges.len()`.
    ///
    /// Smaller than the requested size when the heap empties early.
    pub vocab_size: usize,
}

/// Trainer for learning binary pair merges over a linked token stream.
pub struct PairStreamTrainer<T: TokenType> {
    /// Trainer options.
    pub options: TrainerOptions,

    _marker: PhantomData<T>,
}

impl<T: TokenType> PairStreamTrainer<T> {
    /// Initializes a [`PairStreamTrainer`].
    pub fn new(options: TrainerOptions) -> Self {
        Self {
            options,
            _marker: PhantomData,
        }
    }

    /// Train merges from a corpus.
    ///
    /// Pre-tokenizes the corpus, populates the stream and the pair heap,
    /// then repeatedly merges the most frequent pair until the vocab target
    /// is reached or the heap empties.
    ///
    /// ## Arguments
    /// * `corpus` - The training bytes.
    ///
    /// ## Returns
    /// The learned merges and the effective vocab size.
    pub fn fit(
        &self,
        corpus: &[u8],
    ) -> PmResult<TrainOutcome<T>> {
        check_vocab_size::<T>(self.options.vocab_size)?;
        let num_merges = self.options.vocab_size - BYTE_TOKENS;

        let workers = resolve_workers(self.options.workers);
        let chunks = chunk_ranges(&self.options.rule, corpus, workers)?;
        let mut stream = build_stream::<T>(corpus, &chunks);
        log::info!(
            "stream loaded: {} tokens across {} chunks",
            stream.len(),
            chunks.len()
        );

        let mut heap = PairHeap::new();
        let mut n = stream.head();
        while n != NIL {
            heap.add_position_unsifted(&stream, n);
            n = stream.next(n);
        }
        heap.make_heap();
        log::info!("indexed {} distinct pairs", heap.len());

        if self.options.truncate_heap {
            heap.truncate(num_merges);
        }

        let mut merges: Vec<Pair<T>> = Vec::with_capacity(num_merges);
        let mut last_log_percent = 0;

        for i in 0..num_merges {
            let Some(top) = heap.pop_top() else {
                log::warn!(
                    "pair heap exhausted after {} merges; effective vocab size {}",
                    merges.len(),
                    BYTE_TOKENS + merges.len()
                );
                break;
            };

            let pair = heap.pair_of(top);
            let count = heap.count_of(top);
            let id = T::from_usize(BYTE_TOKENS + i).expect("id fits T by check_vocab_size");
            merges.push(pair);

            for n in heap.take_positions(top) {
                // Revalidate: an earlier position of a self-overlapping run
                // may have consumed this node.
                let q = stream.next(n);
                if q == NIL || stream.value(n) != pair.0 || stream.value(q) != pair.1 {
                    continue;
                }
                let p = stream.prev(n);

                heap.remove_position(&stream, p);
                heap.remove_position(&stream, q);

                stream.set_value(n, id);
                stream.remove(q);

                heap.add_position(&stream, p);
                heap.add_position(&stream, n);
            }

            heap.remove_entry(top);

            #[cfg(debug_assertions)]
            heap.validate_invariants(&stream);

            if self.options.truncate_heap {
                heap.truncate(num_merges);
            }

            // Log progress every 1%.
            let current_percent = ((i + 1) * 100) / num_merges;
            if current_percent > last_log_percent {
                log::info!(
                    "progress: {current_percent}% ({}/{num_merges} merges), \
                     last {pair:?} -> {id} (frequency {count})",
                    i + 1,
                );
                last_log_percent = current_percent;
            }
        }

        Ok(TrainOutcome {
            vocab_size: BYTE_TOKENS + merges.len(),
            merges,
        })
    }
}

/// Lay chunks out as a token stream, boundary-separated.
fn build_stream<T: TokenType>(
    corpus: &[u8],
    chunks: &[Range<usize>],
) -> TokenStream<T> {
    let mut stream = TokenStream::with_capacity(corpus.len() + chunks.len());
    for (k, range) in chunks.iter().enumerate() {
        if k > 0 {
            stream.append(boundary::<T>());
        }
        for &b in &corpus[range.clone()] {
            stream.append(T::from_u8(b).expect("byte tokens fit any TokenType"));
        }
    }
    stream
}
