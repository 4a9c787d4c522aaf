//! # Merge Vocabulary
//!
//! The persistent output of training: the ordered merge records, the derived
//! byte-string vocabulary, and the pair → identifier map used for encoding.
//!
//! Entry `i < 256` is the single byte `i`; entry `256 + k` is the
//! concatenation of the k-th merge's two components.

use crate::errors::{PairmillError, PmResult};
use crate::types::{BYTE_TOKENS, CommonHashMap, Pair, TokenType};

/// An immutable trained vocabulary.
#[derive(Debug, Clone)]
pub struct MergeVocab<T: TokenType> {
    /// Learned merges, in rank order.
    merges: Vec<Pair<T>>,

    /// Byte strings by identifier; `spans[i]` decodes identifier `i`.
    spans: Vec<Vec<u8>>,

    /// Map from pair to the identifier its merge produces.
    pair_map: CommonHashMap<Pair<T>, T>,
}

impl<T: TokenType> MergeVocab<T> {
    /// Build a vocabulary from merge records.
    ///
    /// Validates closure: the i-th merge may only reference identifiers
    /// below `256 + i`.
    ///
    /// ## Arguments
    /// * `merges` - The learned merges, in rank order.
    ///
    /// ## Returns
    /// The vocabulary, or a model-format error on a closure violation.
    pub fn from_merges(merges: Vec<Pair<T>>) -> PmResult<Self> {
        let mut spans: Vec<Vec<u8>> = Vec::with_capacity(BYTE_TOKENS + merges.len());
        for b in 0..=255u8 {
            spans.push(vec![b]);
        }

        let mut pair_map: CommonHashMap<Pair<T>, T> = CommonHashMap::with_capacity(merges.len());

        for (k, &(a, b)) in merges.iter().enumerate() {
            let id = BYTE_TOKENS + k;
            let (a, b) = (token_index(a), token_index(b));
            if a >= id || b >= id {
                return Err(PairmillError::ModelFormat(format!(
                    "merge {k} references identifiers not yet defined ({a}, {b})"
                )));
            }

            let mut span = spans[a].clone();
            span.extend_from_slice(&spans[b]);
            spans.push(span);

            // Keep the earliest rank if a model file repeats a pair.
            pair_map
                .entry(merges[k])
                .or_insert(T::from_usize(id).expect("id fits: it indexes a defined merge"));
        }

        Ok(Self {
            merges,
            spans,
            pair_map,
        })
    }

    /// The vocabulary size, `256 + merges.len()`.
    pub fn vocab_size(&self) -> usize {
        self.spans.len()
    }

    /// The learned merges, in rank order.
    pub fn merges(&self) -> &[Pair<T>] {
        &self.merges
    }

    /// The identifier produced by merging `pair`, if learned.
    ///
    /// Identifier order is rank order, so comparing lookup results compares
    /// merge ranks.
    pub fn lookup_pair(
        &self,
        pair: &Pair<T>,
    ) -> Option<T> {
        self.pair_map.get(pair).copied()
    }

    /// The two parents of a merged identifier.
    pub fn parents_of(
        &self,
        id: T,
    ) -> Option<Pair<T>> {
        let idx = token_index(id);
        if idx < BYTE_TOKENS {
            return None;
        }
        self.merges.get(idx - BYTE_TOKENS).copied()
    }

    /// The byte string an identifier decodes to.
    pub fn span_of(
        &self,
        id: T,
    ) -> Option<&[u8]> {
        self.spans.get(token_index(id)).map(Vec::as_slice)
    }

    /// Decode a sequence of identifiers to bytes.
    ///
    /// ## Arguments
    /// * `ids` - The identifier sequence.
    ///
    /// ## Returns
    /// The concatenated byte strings, or an out-of-range error.
    pub fn decode_bytes(
        &self,
        ids: &[T],
    ) -> PmResult<Vec<u8>> {
        let mut out = Vec::with_capacity(ids.len() * 4);
        for &id in ids {
            let span = self
                .span_of(id)
                .ok_or_else(|| PairmillError::TokenOutOfRange {
                    token: id.to_u64().unwrap_or(u64::MAX),
                    size: self.vocab_size(),
                })?;
            out.extend_from_slice(span);
        }
        Ok(out)
    }
}

impl<T: TokenType> Default for MergeVocab<T> {
    /// The byte-only vocabulary: 256 single-byte entries, no merges.
    fn default() -> Self {
        Self::from_merges(Vec::new()).expect("byte-only vocab is always valid")
    }
}

fn token_index<T: TokenType>(id: T) -> usize {
    id.to_usize().unwrap_or(usize::MAX)
}
