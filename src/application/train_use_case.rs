// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates one fine-tuning run:
//
//   Step 1: Make sure base-model exists    (Layer 6 - infra)
//   Step 2: Load the author's tweets       (Layer 4 - data)
//   Step 3: Load the starting model        (Layer 6 - infra)
//   Step 4: Transform, split, fine-tune    (Layer 5 - ml)
//   Step 5: Save under the author's name   (Layer 6 - infra)
//
// Every epoch is reported to the caller's observer and appended
// to metrics.csv.
//
// Reference: Burn Book §5 (Training)

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::application::session::{Session, TrainOutcome, TrainRequest, BASE_MODEL};
use crate::domain::options::TrainingOptions;
use crate::domain::traits::EpochObserver;
use crate::infra::metrics::MetricsLogger;
use crate::ml::model::CharRnnConfig;

// ─── Training Configuration ──────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Twitter handle whose tweets are trained on
    pub user:        String,
    /// Model to start from
    pub model:       String,
    pub models_dir:  String,
    pub tweets_dir:  String,
    pub metrics_dir: String,
    pub epochs:      usize,
    pub batch_size:  usize,
    pub seq_len:     usize,
    pub dropout:     f64,
    pub val_split:   f64,
    pub lr:          f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            user:        String::new(),
            model:       BASE_MODEL.to_string(),
            models_dir:  "models".to_string(),
            tweets_dir:  "data/tweets".to_string(),
            metrics_dir: "logs".to_string(),
            epochs:      2,
            batch_size:  64,
            seq_len:     64,
            dropout:     0.1,
            val_split:   0.2,
            lr:          1e-3,
        }
    }
}

impl TrainConfig {
    fn request(&self) -> TrainRequest {
        TrainRequest {
            epochs:  self.epochs,
            options: TrainingOptions {
                batch_size:     self.batch_size,
                seq_len:        self.seq_len,
                dropout:        self.dropout,
                one_hot_labels: true,
            },
            val_fraction:  self.val_split,
            learning_rate: self.lr,
        }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Run the fine-tuning pipeline end to end.
    pub fn execute(&self, observer: &mut dyn EpochObserver) -> Result<TrainOutcome> {
        let cfg     = &self.config;
        let session = Session::open(&cfg.models_dir, &cfg.tweets_dir);

        // ── Step 1: base-model on first run ───────────────────────────────────
        if session.ensure_base_model(&CharRnnConfig::new(0))? {
            tracing::info!("Created '{}' in '{}'", BASE_MODEL, cfg.models_dir);
        }

        // ── Step 2: tweets ────────────────────────────────────────────────────
        tracing::info!("Downloading twitter data for {}...", cfg.user);
        let tokens = session.download(&cfg.user)?;
        tracing::info!("Loaded {} characters of tweets", tokens);

        // ── Step 3: starting model ────────────────────────────────────────────
        tracing::info!("Loading model from \"{}\"...", cfg.model);
        session.load_model(&cfg.model)?;

        // ── Step 4 + 5: fine-tune and save ────────────────────────────────────
        let mut metrics = MetricsLogger::new(&cfg.metrics_dir)?;
        let mut report_epoch = |epoch: usize, loss: f64, val_loss: f64| {
            metrics.on_epoch_end(epoch, loss, val_loss);
            observer.on_epoch_end(epoch, loss, val_loss);
        };

        session.train(&cfg.request(), &mut report_epoch)
    }
}
