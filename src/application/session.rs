// ============================================================
// Layer 2 — Session
// ============================================================
// The state one user works with between actions:
//
//   corpus — the last author's downloaded tweets
//   model  — the currently loaded model, its name and vocabulary
//   busy   — set while a train or generate request runs
//
// Actions mirror the buttons of a desktop front end:
//
//   ensure_base_model → list_models → download → load_model
//     → train (fine-tune, save) → generate (sample, split)
//
// Every method takes `&self`, so an epoch observer may call back
// into the session while training runs. Such a call is refused
// with `CoreError::Busy` instead of touching the model mid-run.
//
// Training works on a transformed copy of the loaded model. The
// loaded model is only replaced, and only saved, when every
// requested epoch finished.

use anyhow::{Context, Result};
use rand::Rng;
use std::{cell::{Cell, RefCell}, path::PathBuf};

use crate::data::batcher::{BatchGenerator, BatchOptions};
use crate::data::loader::TweetArchive;
use crate::data::splitter::split_corpus;
use crate::domain::corpus::EncodedCorpus;
use crate::domain::error::CoreError;
use crate::domain::options::{SamplerOptions, TrainingOptions};
use crate::domain::traits::{CorpusSource, EpochObserver};
use crate::domain::vocab::{CharVocab, DELIMITER};
use crate::infra::checkpoint::{CheckpointStore, ModelStore, StoredModel};
use crate::ml::architecture::transform;
use crate::ml::backend::{default_device, Device, TrainBackend};
use crate::ml::model::CharRnnConfig;
use crate::ml::sampler;
use crate::ml::state::{Mode, ModelState};
use crate::ml::trainer::{FineTuner, TrainingReport};

/// Name the untrained starting model is stored under.
pub const BASE_MODEL: &str = "base-model";

/// One author's tweets, and the vocabulary they were encoded with.
pub struct DownloadedCorpus {
    pub author: String,
    pub text:   String,
    pub tokens: EncodedCorpus,
    vocab:      CharVocab,
}

impl DownloadedCorpus {
    /// The corpus in `vocab`'s token ids.
    fn encoded_with(&self, vocab: &CharVocab) -> EncodedCorpus {
        if *vocab == self.vocab {
            self.tokens.clone()
        } else {
            EncodedCorpus::new(vocab.encode(&self.text))
        }
    }
}

pub struct LoadedModel {
    pub name:  String,
    pub model: ModelState<TrainBackend>,
    pub vocab: CharVocab,
}

#[derive(Debug, Clone)]
pub struct TrainRequest {
    pub epochs:        usize,
    pub options:       TrainingOptions,
    pub val_fraction:  f64,
    pub learning_rate: f64,
}

#[derive(Debug)]
pub struct TrainOutcome {
    pub report:      TrainingReport,
    pub saved_as:    String,
    /// A model of that name existed and was replaced
    pub overwritten: bool,
}

struct BusyGuard<'a>(&'a Cell<bool>);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a Cell<bool>) -> Result<Self, CoreError> {
        if flag.replace(true) {
            return Err(CoreError::Busy);
        }
        Ok(Self(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

pub struct Session<S: ModelStore = CheckpointStore, C: CorpusSource = TweetArchive> {
    store:  S,
    source: C,
    device: Device,
    corpus: RefCell<Option<DownloadedCorpus>>,
    model:  RefCell<Option<LoadedModel>>,
    busy:   Cell<bool>,
}

impl Session<CheckpointStore, TweetArchive> {
    /// A session over the filesystem model store and tweet archive.
    pub fn open(models_dir: impl Into<PathBuf>, tweets_dir: impl Into<PathBuf>) -> Self {
        Self::new(CheckpointStore::new(models_dir), TweetArchive::new(tweets_dir))
    }
}

impl<S: ModelStore, C: CorpusSource> Session<S, C> {
    pub fn new(store: S, source: C) -> Self {
        Self {
            store,
            source,
            device: default_device(),
            corpus: RefCell::new(None),
            model:  RefCell::new(None),
            busy:   Cell::new(false),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn is_busy(&self) -> bool {
        self.busy.get()
    }

    /// Name of the loaded model, if any.
    pub fn model_name(&self) -> Option<String> {
        self.model.borrow().as_ref().map(|m| m.name.clone())
    }

    /// Author of the downloaded corpus, if any.
    pub fn corpus_author(&self) -> Option<String> {
        self.corpus.borrow().as_ref().map(|c| c.author.clone())
    }

    /// Save a randomly initialised model as `base-model` unless one
    /// exists. `architecture.vocab_size` is replaced by the size of
    /// the default vocabulary. Returns whether a model was created.
    pub fn ensure_base_model(&self, architecture: &CharRnnConfig) -> Result<bool> {
        if self.store.contains(BASE_MODEL) {
            return Ok(false);
        }
        let vocab = CharVocab::default();
        let mut config = architecture.clone();
        config.vocab_size = vocab.len();
        let model = ModelState::<TrainBackend>::init(config, &self.device);

        tracing::info!("Creating '{}' ({} parameters)", BASE_MODEL, model.num_params());
        self.store
            .save(&model, &vocab, BASE_MODEL)
            .context("Cannot save the base model")?;
        Ok(true)
    }

    pub fn list_models(&self) -> Result<Vec<String>> {
        Ok(self.store.list()?)
    }

    /// Fetch and encode an author's tweets, replacing any earlier
    /// download. Returns the number of tokens.
    pub fn download(&self, author: &str) -> Result<usize> {
        let _busy  = BusyGuard::acquire(&self.busy)?;
        let handle = TweetArchive::normalise_handle(author);
        let vocab  = self
            .model
            .borrow()
            .as_ref()
            .map(|m| m.vocab.clone())
            .unwrap_or_default();

        let (text, tokens) = self
            .source
            .fetch(&handle, &vocab)
            .with_context(|| format!("Error downloading twitter data for {author}"))?;

        let len = tokens.len();
        tracing::info!("Downloaded twitter data for {} ({} tokens)", handle, len);
        *self.corpus.borrow_mut() = Some(DownloadedCorpus { author: handle, text, tokens, vocab });
        Ok(len)
    }

    pub fn load_model(&self, key: &str) -> Result<()> {
        let _busy = BusyGuard::acquire(&self.busy)?;
        let name  = CheckpointStore::model_name(key)?.to_string();

        let StoredModel { model, vocab } = self
            .store
            .load::<TrainBackend>(key, &self.device)
            .with_context(|| format!("Error loading model from \"{key}\""))?;

        *self.model.borrow_mut() = Some(LoadedModel { name, model, vocab });
        Ok(())
    }

    /// Fine-tune the loaded model on the downloaded corpus and save it.
    ///
    /// A model whose name differs from the corpus author is saved as
    /// a new model named after the author. A run that stops early
    /// leaves the loaded model and the store untouched.
    pub fn train<O>(&self, request: &TrainRequest, observer: &mut O) -> Result<TrainOutcome>
    where
        O: EpochObserver + ?Sized,
    {
        let _busy = BusyGuard::acquire(&self.busy)?;

        let (author, vocab, mut model, tokens) = {
            let corpus = self.corpus.borrow();
            let model  = self.model.borrow();
            let loaded = model.as_ref().ok_or(CoreError::ModelNotLoaded)?;
            let corpus = corpus
                .as_ref()
                .ok_or_else(|| CoreError::data_unavailable("", "no tweets downloaded"))?;

            tracing::info!("Updating model architecture...");
            let training = transform(&loaded.model, Mode::Training, &request.options, loaded.vocab.len())?;
            (corpus.author.clone(), loaded.vocab.clone(), training, corpus.encoded_with(&loaded.vocab))
        };

        let (train_tokens, val_tokens) = split_corpus(&tokens, request.val_fraction);
        tracing::info!(
            "Training model on {} tokens ({} held out for validation)",
            train_tokens.len(),
            val_tokens.len(),
        );

        let batch_opts = BatchOptions::from_training(&request.options, vocab.len());
        let train_gen  = BatchGenerator::new(&train_tokens, batch_opts)?;
        let val_gen    = BatchGenerator::new(&val_tokens, batch_opts)?;

        let report = FineTuner::new(request.learning_rate)
            .fine_tune(&mut model, request.epochs, request.options.batch_size, &train_gen, &val_gen, observer)
            .context("Error training model")?;

        let trained  = transform(&model, Mode::Inference, &request.options, vocab.len())?;
        // base-model trained on @someone becomes a new model "someone";
        // a model already named after the author is overwritten
        let saved_as    = author;
        let overwritten = self.store.contains(&saved_as);
        if overwritten {
            tracing::info!("Overwriting model '{}' with the trained weights", saved_as);
        } else {
            tracing::info!("Saving trained model as new model '{}'", saved_as);
        }
        self.store
            .save(&trained, &vocab, &saved_as)
            .with_context(|| format!("Cannot save trained model as '{saved_as}'"))?;

        *self.model.borrow_mut() = Some(LoadedModel { name: saved_as.clone(), model: trained, vocab });
        Ok(TrainOutcome { report, saved_as, overwritten })
    }

    /// Sample text from the loaded model and split it into tweets.
    pub fn generate<R: Rng + ?Sized>(&self, seed: &str, options: &SamplerOptions, rng: &mut R) -> Result<Vec<String>> {
        let _busy = BusyGuard::acquire(&self.busy)?;

        let model  = self.model.borrow();
        let loaded = model.as_ref().ok_or(CoreError::ModelNotLoaded)?;

        // Sampling needs no gradients: run on the inner backend
        let single = transform(&loaded.model, Mode::Inference, &TrainingOptions::default(), loaded.vocab.len())?;
        let mut single = single.valid();

        tracing::info!("Generating text using {}", loaded.name);
        let text = sampler::generate(&mut single, &loaded.vocab, seed, options, rng)
            .with_context(|| format!("Error generating text using {}", loaded.name))?;
        Ok(split_tweets(&text))
    }
}

/// Split generated text into tweets. The first and last fragments
/// are usually cut mid-tweet, so they are dropped when there are
/// more than two.
pub fn split_tweets(text: &str) -> Vec<String> {
    let mut tweets: Vec<String> = text.split(DELIMITER).map(str::to_string).collect();
    if tweets.len() > 2 {
        tweets.remove(0);
        tweets.pop();
    }
    tweets
}
