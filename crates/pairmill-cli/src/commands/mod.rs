use crate::commands::{encode::EncodeArgs, fit::FitArgs};

pub mod encode;
pub mod fit;

/// Subcommands for pairmill-cli
#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Train a tokenizer on a corpus file.
    Fit(FitArgs),

    /// Interactively encode lines with a trained tokenizer.
    Encode(EncodeArgs),
}

impl Commands {
    /// Run the subcommand.
    pub fn run(&self) -> anyhow::Result<()> {
        match self {
            Commands::Fit(cmd) => cmd.run(),
            Commands::Encode(cmd) => cmd.run(),
        }
    }
}
