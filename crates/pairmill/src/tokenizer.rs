//! # Tokenizer Facade
//!
//! The user-facing model: a split rule plus a trained [`MergeVocab`],
//! with `fit` / `encode` / `decode` / `save` / `load` operations.
//!
//! ## Model file format
//!
//! Text, line oriented:
//!
//! ```text
//! line 1:   the split rule (`regex:<pattern>` or `bytes:<escaped>`)
//! line 2:   the decimal vocab size V
//! lines 3+: one "<a> <b>" merge per line; exactly V - 256 of them
//! ```

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::encode::ChunkCache;
use crate::errors::{PairmillError, PmResult};
use crate::pretok::{SplitRule, chunk_ranges};
use crate::training::{TrainerOptions, check_vocab_size};
use crate::types::{BYTE_TOKENS, Pair, TokenType};
use crate::vocab::MergeVocab;

/// A BPE tokenizer model.
#[derive(Debug)]
pub struct Tokenizer<T: TokenType = u32> {
    rule: SplitRule,
    vocab: MergeVocab<T>,
    cache: ChunkCache<T>,
}

impl<T: TokenType> Tokenizer<T> {
    /// Create an untrained tokenizer.
    ///
    /// Until `fit`, the vocabulary holds only the 256 byte identifiers.
    pub fn new(rule: SplitRule) -> Self {
        Self {
            rule,
            vocab: MergeVocab::default(),
            cache: ChunkCache::new(),
        }
    }

    /// The pre-tokenizer rule.
    pub fn rule(&self) -> &SplitRule {
        &self.rule
    }

    /// The trained vocabulary.
    pub fn vocab(&self) -> &MergeVocab<T> {
        &self.vocab
    }

    /// The vocabulary size.
    pub fn vocab_size(&self) -> usize {
        self.vocab.vocab_size()
    }

    /// The learned merges, in rank order.
    pub fn merges(&self) -> &[Pair<T>] {
        self.vocab.merges()
    }

    /// Train from a corpus buffer, replacing any prior merges.
    ///
    /// ## Arguments
    /// * `vocab_size` - The target vocabulary size.
    /// * `corpus` - The training bytes.
    /// * `workers` - Pre-tokenization worker count; `None` for all cores.
    ///
    /// ## Returns
    /// The effective vocabulary size; smaller than requested if the pair
    /// heap empties early.
    pub fn fit_bytes(
        &mut self,
        vocab_size: usize,
        corpus: &[u8],
        workers: Option<usize>,
    ) -> PmResult<usize> {
        let mut options = TrainerOptions::new(self.rule.clone(), vocab_size);
        options.workers = workers;

        let outcome = options.init::<T>().fit(corpus)?;

        self.vocab = MergeVocab::from_merges(outcome.merges)?;
        self.cache.clear();
        Ok(outcome.vocab_size)
    }

    /// Train from a corpus file, replacing any prior merges.
    ///
    /// See [`Self::fit_bytes`].
    pub fn fit_file<P: AsRef<Path>>(
        &mut self,
        vocab_size: usize,
        path: P,
        workers: Option<usize>,
    ) -> PmResult<usize> {
        let corpus = std::fs::read(path)?;
        log::info!("corpus read: {} bytes", corpus.len());
        self.fit_bytes(vocab_size, &corpus, workers)
    }

    /// Encode text into identifiers.
    ///
    /// Chunks are encoded independently and concatenated; in regex mode,
    /// bytes between matches are discarded.
    pub fn encode(
        &self,
        text: &str,
    ) -> PmResult<Vec<T>> {
        let data = text.as_bytes();
        let chunks = chunk_ranges(&self.rule, data, 1)?;

        let mut out = Vec::with_capacity(data.len() / 4 + 1);
        for range in chunks {
            self.cache
                .encode_chunk_append(&self.vocab, &data[range], &mut out);
        }
        Ok(out)
    }

    /// Encode a batch of texts on the rayon pool.
    pub fn encode_batch(
        &self,
        texts: &[&str],
    ) -> PmResult<Vec<Vec<T>>> {
        use rayon::prelude::*;

        let results: Vec<PmResult<Vec<T>>> =
            texts.par_iter().map(|text| self.encode(text)).collect();

        results.into_iter().collect()
    }

    /// Decode identifiers into bytes.
    pub fn decode(
        &self,
        ids: &[T],
    ) -> PmResult<Vec<u8>> {
        self.vocab.decode_bytes(ids)
    }

    /// Decode identifiers into a string.
    ///
    /// Fails if the decoded bytes are not valid UTF-8.
    pub fn decode_to_string(
        &self,
        ids: &[T],
    ) -> PmResult<String> {
        Ok(String::from_utf8(self.decode(ids)?)?)
    }

    /// Save the model to a writer.
    pub fn save_to_writer<W: Write>(
        &self,
        writer: &mut W,
    ) -> PmResult<()> {
        writeln!(writer, "{}", self.rule.to_model_line())?;
        writeln!(writer, "{}", self.vocab_size())?;
        for &(a, b) in self.merges() {
            writeln!(writer, "{a} {b}")?;
        }
        Ok(())
    }

    /// Save the model to a file.
    pub fn save<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> PmResult<()> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.save_to_writer(&mut writer)
    }

    /// Load a model from a reader.
    pub fn load_from_reader<R: BufRead>(reader: R) -> PmResult<Self> {
        let missing = |what: &str| PairmillError::ModelFormat(format!("missing {what} line"));

        let mut lines = reader.lines();

        let rule_line = lines.next().ok_or_else(|| missing("rule"))??;
        let rule = SplitRule::from_model_line(&rule_line)?;

        let size_line = lines.next().ok_or_else(|| missing("vocab size"))??;
        let vocab_size: usize = size_line.trim().parse().map_err(|_| {
            PairmillError::ModelFormat(format!("bad vocab size {size_line:?}"))
        })?;
        check_vocab_size::<T>(vocab_size)?;

        let num_merges = vocab_size - BYTE_TOKENS;
        let mut merges: Vec<Pair<T>> = Vec::with_capacity(num_merges);
        for line in lines {
            let line = line?;
            let lineno = merges.len() + 3;
            if merges.len() == num_merges {
                return Err(PairmillError::ModelFormat(format!(
                    "expected {num_merges} merge lines, found more"
                )));
            }
            merges.push(parse_merge_line::<T>(&line, lineno)?);
        }
        if merges.len() != num_merges {
            return Err(PairmillError::ModelFormat(format!(
                "expected {num_merges} merge lines, found {}",
                merges.len()
            )));
        }

        Ok(Self {
            rule,
            vocab: MergeVocab::from_merges(merges)?,
            cache: ChunkCache::new(),
        })
    }

    /// Load a model from a file.
    ///
    /// Fails if the file is absent or malformed.
    pub fn load<P: AsRef<Path>>(path: P) -> PmResult<Self> {
        Self::load_from_reader(BufReader::new(File::open(path)?))
    }
}

fn parse_merge_line<T: TokenType>(
    line: &str,
    lineno: usize,
) -> PmResult<Pair<T>> {
    let bad = |msg: String| PairmillError::ModelFormat(format!("line {lineno}: {msg}"));

    let mut fields = line.split_whitespace();
    let (Some(a), Some(b), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(bad(format!("expected two fields, got {line:?}")));
    };

    let parse = |field: &str| -> PmResult<T> {
        let raw: u64 = field
            .parse()
            .map_err(|_| bad(format!("non-numeric identifier {field:?}")))?;
        T::from_u64(raw).ok_or_else(|| bad(format!("identifier {raw} out of token range")))
    };

    Ok((parse(a)?, parse(b)?))
}
