use std::time::Instant;

use anyhow::Context;
use pairmill::pretok::GPT_STYLE_PATTERN;
use pairmill::{SplitRule, Tokenizer};

use crate::LogArgs;

/// Args for the fit command.
#[derive(clap::Args, Debug)]
#[clap(group(
    clap::ArgGroup::new("rule").args(["regex", "split_bytes"]),
))]
pub struct FitArgs {
    /// Corpus file to train on.
    corpus: String,

    #[clap(flatten)]
    pub logging: LogArgs,

    /// Max vocab size.
    #[arg(long, default_value = "50000")]
    vocab_size: usize,

    /// Word split regex; the default is a GPT-style pattern.
    #[arg(long)]
    regex: Option<String>,

    /// Word split bytes (hard chunk boundaries) instead of a regex.
    #[arg(long)]
    split_bytes: Option<String>,

    /// Pre-tokenization worker count; defaults to all cores.
    #[arg(long)]
    workers: Option<usize>,

    /// Output model path.
    #[arg(long, default_value = "tokenizer.bpe")]
    output: String,
}

impl FitArgs {
    pub fn run(&self) -> anyhow::Result<()> {
        self.logging.setup_logging(3)?;

        let rule = match (&self.regex, &self.split_bytes) {
            (Some(pattern), None) => SplitRule::regex(pattern.clone())?,
            (None, Some(bytes)) => SplitRule::split_bytes(bytes),
            (None, None) => SplitRule::regex(GPT_STYLE_PATTERN)?,
            _ => unreachable!("clap rejects conflicting rules"),
        };

        let mut tokenizer: Tokenizer<u32> = Tokenizer::new(rule);

        log::info!("training on {} (vocab size {})", self.corpus, self.vocab_size);
        let start = Instant::now();
        let effective = tokenizer
            .fit_file(self.vocab_size, &self.corpus, self.workers)
            .with_context(|| format!("training on {:?} failed", self.corpus))?;
        log::info!("trained in {:?}", start.elapsed());

        if effective < self.vocab_size {
            log::warn!(
                "corpus exhausted at vocab size {effective} (requested {})",
                self.vocab_size
            );
        }

        tokenizer
            .save(&self.output)
            .with_context(|| format!("saving model to {:?} failed", self.output))?;
        log::info!("model written to {}", self.output);

        Ok(())
    }
}
