use std::io::{BufRead, Write};

use anyhow::Context;
use pairmill::Tokenizer;

use crate::LogArgs;

/// Args for the encode command.
#[derive(clap::Args, Debug)]
pub struct EncodeArgs {
    #[clap(flatten)]
    pub logging: LogArgs,

    /// Model path.
    #[arg(long, default_value = "tokenizer.bpe")]
    model: String,
}

impl EncodeArgs {
    /// Read lines from stdin; print the identifier sequence, the
    /// per-identifier decoded strings, and the decoded concatenation.
    pub fn run(&self) -> anyhow::Result<()> {
        self.logging.setup_logging(2)?;

        let tokenizer: Tokenizer<u32> = Tokenizer::load(&self.model)
            .with_context(|| format!("loading model from {:?} failed", self.model))?;
        log::info!("model loaded: vocab size {}", tokenizer.vocab_size());

        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();

        loop {
            writeln!(stdout, "Text:")?;
            stdout.flush()?;

            let mut line = String::new();
            if stdin.lock().read_line(&mut line)? == 0 {
                return Ok(());
            }
            let text = line.trim_end_matches(['\n', '\r']);

            let ids = tokenizer.encode(text)?;

            let pieces: Vec<String> = ids
                .iter()
                .map(|&id| {
                    let bytes = tokenizer.decode(&[id]).expect("encoded ids are in vocab");
                    format!("{:?}", String::from_utf8_lossy(&bytes))
                })
                .collect();

            writeln!(
                stdout,
                "{}",
                ids.iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            )?;
            writeln!(stdout, "[{}]", pieces.join(", "))?;
            writeln!(stdout, "{}", tokenizer.decode_to_string(&ids)?)?;
        }
    }
}
