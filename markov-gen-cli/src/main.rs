mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use markov_gen_core::config::ModelConfig;
use markov_gen_core::{GenerationOptions, MarkovModel, ModelStore, TrainingSource};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

/// Initialize tracing subscriber on stderr.
///
/// Warnings are always shown; `--debug` lowers the level to debug.
fn init_tracing(debug: bool) {
    let level = if debug { tracing::Level::DEBUG } else { tracing::Level::WARN };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .init();
}

/// Reads the configuration file, if any, and applies the command line overrides.
fn build_config(cli: &Cli) -> Result<ModelConfig> {
    let mut config = match &cli.config {
        Some(path) => ModelConfig::from_file(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => ModelConfig::default(),
    };

    if let Some(order) = cli.order {
        config.chain_order = order;
    }
    if let Some(dir) = &cli.store_dir {
        config.store_dir = dir.clone();
    }
    config.validate()?;
    Ok(config)
}

/// Builds the generation options from the command line.
fn build_options(cli: &Cli) -> GenerationOptions {
    let mut options = GenerationOptions::new().with_seed_words(cli.seed_words.iter().cloned());
    options.set_sentence_count(cli.sentences);
    if let Some(max_tokens) = cli.max_tokens {
        options = options.with_max_tokens(max_tokens);
    }
    options
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = build_config(&cli)?;
    let store = ModelStore::new(&config.store_dir);

    // Configured sources first: missing files there are skipped
    let mut model = MarkovModel::from_config(&config)?;

    // A snapshot replaces whatever was learned so far
    if let Some(name) = &cli.load {
        model
            .load_snapshot(&store, Some(name.as_str()))
            .with_context(|| format!("loading snapshot {name:?}"))?;
    }

    // Explicit command line sources must exist
    let sources = cli
        .train_files
        .iter()
        .cloned()
        .map(TrainingSource::File)
        .chain(cli.texts.iter().cloned().map(TrainingSource::Text));
    for source in sources {
        let added = model.update(&source)?;
        info!(?source, added, "training source applied");
    }

    if let Some(name) = &cli.save {
        let path = model.save_snapshot(&store, Some(name.as_str()))?;
        println!("Saved {} tokens to {}", model.tokens().len(), path.display());
    }

    // Generate the requested number of texts
    let options = build_options(&cli);
    for _ in 0..cli.count {
        let text = model
            .generate(&options)
            .context("nothing to generate from, train the model or load a snapshot")?;
        println!("{text}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_apply_on_defaults() {
        let cli = Cli::parse_from(["markov-gen", "--order", "3", "--store-dir", "/tmp/snapshots"]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.chain_order, 3);
        assert_eq!(config.store_dir, std::path::PathBuf::from("/tmp/snapshots"));
    }

    #[test]
    fn test_order_zero_is_rejected() {
        let cli = Cli::parse_from(["markov-gen", "--order", "0"]);
        assert!(build_config(&cli).is_err());
    }

    #[test]
    fn test_options_from_cli() {
        let cli = Cli::parse_from(["markov-gen", "-n", "0", "--max-tokens", "10", "sun"]);
        let options = build_options(&cli);
        assert_eq!(options.seed_words, vec!["sun"]);
        assert_eq!(options.sentence_count(), None);
        assert_eq!(options.max_tokens(), 10);
    }
}
