// ============================================================
// Layer 2 — GenerateUseCase
// ============================================================
// Loads a stored model and samples tweets from it:
//
//   Step 1: Load the model              (Layer 6 - infra)
//   Step 2: Switch to inference shape   (Layer 5 - ml)
//   Step 3: Sample from the seed        (Layer 5 - ml)
//   Step 4: Split into tweets           (this layer)

use anyhow::Result;
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::application::session::{Session, BASE_MODEL};
use crate::domain::options::SamplerOptions;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateConfig {
    pub model:      String,
    pub models_dir: String,
    pub seed:       String,
    /// Characters to generate, seed included
    pub length:     usize,
    pub top_n:      usize,
    /// Fixed RNG seed for reproducible output
    pub rng_seed:   Option<u64>,
}

impl Default for GenerateConfig {
    fn default() -> Self {
        Self {
            model:      BASE_MODEL.to_string(),
            models_dir: "models".to_string(),
            seed:       "This is a seed sentence.".to_string(),
            length:     2048,
            top_n:      3,
            rng_seed:   None,
        }
    }
}

pub struct GenerateUseCase {
    config: GenerateConfig,
}

impl GenerateUseCase {
    pub fn new(config: GenerateConfig) -> Self {
        Self { config }
    }

    /// Returns the generated tweets in order.
    pub fn execute(&self) -> Result<Vec<String>> {
        let cfg = &self.config;
        // No tweets are read when generating
        let session = Session::open(&cfg.models_dir, &cfg.models_dir);
        session.load_model(&cfg.model)?;

        let mut rng = match cfg.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None       => StdRng::from_entropy(),
        };
        let options = SamplerOptions { max_length: cfg.length, top_n: cfg.top_n };

        let tweets = session.generate(&cfg.seed, &options, &mut rng)?;
        tracing::info!("Finished generating text using {}", cfg.model);
        Ok(tweets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::CharRnnConfig;

    #[test]
    fn test_fixed_rng_seed_is_reproducible() {
        let tmp = tempfile::tempdir().unwrap();
        let models_dir = tmp.path().display().to_string();
        Session::open(&models_dir, &models_dir)
            .ensure_base_model(&CharRnnConfig::new(0).with_embedding_dim(4).with_hidden_size(8))
            .unwrap();

        let cfg = GenerateConfig {
            models_dir,
            length:   64,
            rng_seed: Some(9),
            ..GenerateConfig::default()
        };
        let first  = GenerateUseCase::new(cfg.clone()).execute().unwrap();
        let second = GenerateUseCase::new(cfg).execute().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_model_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = GenerateConfig {
            model:      "ghost".into(),
            models_dir: tmp.path().display().to_string(),
            ..GenerateConfig::default()
        };
        let err = GenerateUseCase::new(cfg).execute().unwrap_err();
        assert!(format!("{err:#}").contains("ghost"));
    }
}
