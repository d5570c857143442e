// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses the command line with clap and routes each subcommand
// to the application layer. Status lines and generated tweets
// are printed here and nowhere else.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, GenerateArgs, InitArgs, ListArgs, TrainArgs};

use crate::application::session::{Session, BASE_MODEL};
use crate::ml::model::CharRnnConfig;

#[derive(Parser, Debug)]
#[command(
    name = "tweet-rnn",
    version = "0.1.0",
    about = "Fine-tune a character-level LSTM on a Twitter user's tweets, then generate new ones."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Init(args)     => run_init(args),
            Commands::List(args)     => run_list(args),
            Commands::Train(args)    => run_train(args),
            Commands::Generate(args) => run_generate(args),
        }
    }
}

fn run_init(args: InitArgs) -> Result<()> {
    let architecture = CharRnnConfig::new(0)
        .with_embedding_dim(args.embedding_dim)
        .with_hidden_size(args.hidden_size)
        .with_num_layers(args.num_layers);

    // Nothing is downloaded by init
    let session = Session::open(&args.models_dir, &args.models_dir);
    if session.ensure_base_model(&architecture)? {
        println!("Created '{}' in '{}'.", BASE_MODEL, args.models_dir);
    } else {
        println!("'{}' already exists in '{}'.", BASE_MODEL, args.models_dir);
    }
    Ok(())
}

fn run_list(args: ListArgs) -> Result<()> {
    let session = Session::open(&args.models_dir, &args.models_dir);
    let models  = session.list_models()?;
    if models.is_empty() {
        println!("No models saved. Run `tweet-rnn init` first.");
    }
    for name in models {
        println!("{name}");
    }
    Ok(())
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Training '{}' on tweets by {}", args.model, args.user);
    let use_case = TrainUseCase::new(args.into());

    let mut print_epoch = |epoch: usize, loss: f64, val_loss: f64| {
        println!("Training epoch #{epoch} loss: {loss:.2}, val loss: {val_loss:.2}");
    };
    let outcome = use_case.execute(&mut print_epoch)?;

    println!("Model saved to '{}'. Done.", outcome.saved_as);
    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    use crate::application::generate_use_case::GenerateUseCase;

    let tweets = GenerateUseCase::new(args.into()).execute()?;
    for tweet in tweets {
        println!("{tweet}");
    }
    Ok(())
}
