//! # Chunk Encoding
//!
//! Encoding applies learned merges to one chunk at a time. Within a chunk
//! the applicable merge with the smallest rank (the earliest learned) is
//! applied everywhere before looking again; rank-minimum ordering, not
//! left-to-right first-match, is what makes encoding agree with training.

use std::sync::Mutex;

use compact_str::CompactString;

use crate::types::{CommonHashMap, TokenType};
use crate::vocab::MergeVocab;

/// Encode one chunk of bytes, appending identifiers to `out`.
///
/// Starts from the raw byte identifiers and repeatedly applies the
/// lowest-ranked merge present in the chunk until none applies.
pub fn encode_chunk_append<T: TokenType>(
    vocab: &MergeVocab<T>,
    chunk: &[u8],
    out: &mut Vec<T>,
) {
    let mut working: Vec<T> = chunk
        .iter()
        .map(|&b| T::from_u8(b).expect("byte tokens fit any TokenType"))
        .collect();

    while working.len() > 1 {
        // The minimum merged identifier is the minimum rank.
        let best = working
            .windows(2)
            .filter_map(|w| vocab.lookup_pair(&(w[0], w[1])))
            .min();

        let Some(id) = best else {
            break;
        };
        let pair = vocab
            .parents_of(id)
            .expect("lookup_pair only returns merged identifiers");

        apply_merge(&mut working, pair, id);
    }

    out.extend_from_slice(&working);
}

/// Merge every non-overlapping occurrence of `pair` in place, left to right.
///
/// Two-cursor sweep: on a match, write the replacement and advance the read
/// cursor by two; otherwise copy one token.
pub fn apply_merge<T: TokenType>(
    tokens: &mut Vec<T>,
    pair: (T, T),
    replacement: T,
) {
    let n = tokens.len();
    let mut w = 0;
    let mut r = 0;

    while r < n {
        if r + 1 < n && tokens[r] == pair.0 && tokens[r + 1] == pair.1 {
            tokens[w] = replacement;
            r += 2;
        } else {
            tokens[w] = tokens[r];
            r += 1;
        }
        w += 1;
    }

    tokens.truncate(w);
}

/// A chunk → identifier-sequence memo.
///
/// Accelerates repeated chunks; not part of the persisted model, and reset
/// on each fresh fit. Keys are the chunk text, so non-UTF-8 chunks bypass
/// the memo.
#[derive(Debug, Default)]
pub struct ChunkCache<T: TokenType> {
    map: Mutex<CommonHashMap<CompactString, Vec<T>>>,
}

impl<T: TokenType> ChunkCache<T> {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            map: Mutex::new(CommonHashMap::new()),
        }
    }

    /// Drop all memoized chunks.
    pub fn clear(&self) {
        self.map.lock().unwrap().clear();
    }

    /// Encode `chunk` through the memo.
    pub fn encode_chunk_append(
        &self,
        vocab: &MergeVocab<T>,
        chunk: &[u8],
        out: &mut Vec<T>,
    ) {
        let Ok(key) = core::str::from_utf8(chunk) else {
            encode_chunk_append(vocab, chunk, out);
            return;
        };

        if let Some(tokens) = self.map.lock().unwrap().get(key) {
            out.extend_from_slice(tokens);
            return;
        }

        let start = out.len();
        encode_chunk_append(vocab, chunk, out);
        self.map
            .lock()
            .unwrap()
            .insert(CompactString::from(key), out[start..].to_vec());
    }
}
