//! CLI argument parsing for markov-gen

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "markov-gen")]
#[command(version)]
#[command(about = "Word-level Markov chain text generator", long_about = None)]
pub struct Cli {
    /// Seed words to steer generation toward
    #[arg(value_name = "SEED")]
    pub seed_words: Vec<String>,

    /// TOML configuration file (chain_order, store_dir, initial_sources)
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Chain order, overrides the configuration
    #[arg(short = 'o', long = "order", value_name = "N")]
    pub order: Option<usize>,

    /// Snapshot directory, overrides the configuration
    #[arg(long = "store-dir", value_name = "DIR")]
    pub store_dir: Option<PathBuf>,

    /// Train on a newline-delimited text file (repeatable)
    #[arg(short = 'f', long = "train-file", value_name = "FILE")]
    pub train_files: Vec<PathBuf>,

    /// Train on raw text (repeatable)
    #[arg(short = 't', long = "text", value_name = "TEXT")]
    pub texts: Vec<String>,

    /// Load a snapshot before training, replacing the configured corpus
    #[arg(short = 'l', long = "load", value_name = "NAME")]
    pub load: Option<String>,

    /// Save the corpus as a snapshot after training
    #[arg(short = 's', long = "save", value_name = "NAME")]
    pub save: Option<String>,

    /// Sentences per generated text (0 = until the chain ends)
    #[arg(short = 'n', long = "sentences", value_name = "N")]
    pub sentences: Option<usize>,

    /// Number of texts to generate
    #[arg(long = "count", value_name = "N", default_value_t = 1)]
    pub count: usize,

    /// Maximum tokens per generated text
    #[arg(long = "max-tokens", value_name = "N")]
    pub max_tokens: Option<usize>,

    /// Enable debug logging on stderr
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["markov-gen"]);
        assert!(cli.seed_words.is_empty());
        assert_eq!(cli.count, 1);
        assert_eq!(cli.order, None);
        assert!(!cli.debug);
    }

    #[test]
    fn test_repeatable_sources_and_seeds() {
        let cli = Cli::parse_from([
            "markov-gen", "-f", "a.txt", "--train-file", "b.txt", "-t", "Hi.", "-n", "2", "--save", "dump", "sun",
            "moon",
        ]);
        assert_eq!(cli.train_files, vec![PathBuf::from("a.txt"), PathBuf::from("b.txt")]);
        assert_eq!(cli.texts, vec!["Hi."]);
        assert_eq!(cli.sentences, Some(2));
        assert_eq!(cli.save.as_deref(), Some("dump"));
        assert_eq!(cli.seed_words, vec!["sun", "moon"]);
    }
}
