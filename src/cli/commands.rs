// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Four subcommands, one per action of the app:
//
//   init      — create base-model if missing
//   list      — list stored models
//   train     — fine-tune a model on an author's tweets
//   generate  — sample tweets from a model
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::generate_use_case::GenerateConfig;
use crate::application::session::BASE_MODEL;
use crate::application::train_use_case::TrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the untrained base model if it does not exist yet
    Init(InitArgs),

    /// List the stored models
    List(ListArgs),

    /// Fine-tune a model on a Twitter user's tweets
    Train(TrainArgs),

    /// Generate tweets with a stored model
    Generate(GenerateArgs),
}

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Directory holding one sub-directory per saved model
    #[arg(long, default_value = "models")]
    pub models_dir: String,

    /// Size of each character's embedding vector
    #[arg(long, default_value_t = 64)]
    pub embedding_dim: usize,

    /// Units per LSTM layer
    #[arg(long, default_value_t = 256)]
    pub hidden_size: usize,

    /// Number of stacked LSTM layers
    #[arg(long, default_value_t = 2)]
    pub num_layers: usize,
}

#[derive(Args, Debug)]
pub struct ListArgs {
    #[arg(long, default_value = "models")]
    pub models_dir: String,
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Twitter handle to train on, e.g. @barackobama
    #[arg(long)]
    pub user: String,

    /// Model to start from
    #[arg(long, default_value = BASE_MODEL)]
    pub model: String,

    #[arg(long, default_value = "models")]
    pub models_dir: String,

    /// Directory with one <handle>.txt file per user, one tweet per line
    #[arg(long, default_value = "data/tweets")]
    pub tweets_dir: String,

    /// Where metrics.csv is written
    #[arg(long, default_value = "logs")]
    pub metrics_dir: String,

    /// Number of full passes through the tweets
    #[arg(long, default_value_t = 2)]
    pub epochs: usize,

    /// Windows processed together in one step
    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    /// Characters per training window
    #[arg(long, default_value_t = 64)]
    pub seq_len: usize,

    /// Dropout after each LSTM layer while training
    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,

    /// Leading fraction of the tweets held out for validation
    #[arg(long, default_value_t = 0.2)]
    pub val_split: f64,

    /// Adam learning rate
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,
}

impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            user:        a.user,
            model:       a.model,
            models_dir:  a.models_dir,
            tweets_dir:  a.tweets_dir,
            metrics_dir: a.metrics_dir,
            epochs:      a.epochs,
            batch_size:  a.batch_size,
            seq_len:     a.seq_len,
            dropout:     a.dropout,
            val_split:   a.val_split,
            lr:          a.lr,
        }
    }
}

/// All arguments for the `generate` command
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Model to sample from
    #[arg(long, default_value = BASE_MODEL)]
    pub model: String,

    #[arg(long, default_value = "models")]
    pub models_dir: String,

    /// Text the generated sequence starts with
    #[arg(long, default_value = "This is a seed sentence.")]
    pub seed: String,

    /// Characters to generate, seed included
    #[arg(long, default_value_t = 2048)]
    pub length: usize,

    /// Sample among the N most probable characters; 1 is greedy
    #[arg(long, default_value_t = 3)]
    pub top_n: usize,

    /// Fix the random generator for reproducible output
    #[arg(long)]
    pub rng_seed: Option<u64>,
}

impl From<GenerateArgs> for GenerateConfig {
    fn from(a: GenerateArgs) -> Self {
        GenerateConfig {
            model:      a.model,
            models_dir: a.models_dir,
            seed:       a.seed,
            length:     a.length,
            top_n:      a.top_n,
            rng_seed:   a.rng_seed,
        }
    }
}
