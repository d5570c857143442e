// ============================================================
// Layer 6 — Checkpoint Store
// ============================================================
// Saves and restores named models using Burn's CompactRecorder.
//
// What gets saved per model:
//   1. Model weights (model.mpk.gz) — all learned parameters
//   2. model_config.json            — network architecture
//   3. vocab.json                   — the character vocabulary
//
// The config is saved separately because the network must be
// rebuilt with the same architecture before the weights can be
// loaded into it. The vocabulary fixes the meaning of every
// token id the weights were trained on.
//
// Layout:
//   models/
//     base-model/
//       model.mpk.gz
//       model_config.json
//       vocab.json
//     barackobama/
//       ...
//
// Keys are opaque strings. A URL-style key such as
// "indexeddb://base-model" names the directory after "://".
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use std::{fs, path::{Path, PathBuf}};

use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};

use crate::domain::error::CoreError;
use crate::domain::vocab::CharVocab;
use crate::ml::model::CharRnnConfig;
use crate::ml::state::ModelState;

const WEIGHTS_FILE: &str = "model";
const CONFIG_FILE:  &str = "model_config.json";
const VOCAB_FILE:   &str = "vocab.json";

/// A model read back from a store, with the vocabulary it was
/// trained on.
pub struct StoredModel<B: Backend> {
    pub model: ModelState<B>,
    pub vocab: CharVocab,
}

/// Persistence for named models.
pub trait ModelStore {
    fn load<B: Backend>(&self, key: &str, device: &B::Device) -> Result<StoredModel<B>, CoreError>;

    fn save<B: Backend>(&self, model: &ModelState<B>, vocab: &CharVocab, key: &str) -> Result<(), CoreError>;

    /// Names of every stored model, sorted.
    fn list(&self) -> Result<Vec<String>, CoreError>;

    fn contains(&self, key: &str) -> bool;
}

/// Filesystem store: one directory per model under `root`.
pub struct CheckpointStore {
    root: PathBuf,
}

impl CheckpointStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// "indexeddb://base-model" → "base-model"
    pub fn model_name(key: &str) -> Result<&str, CoreError> {
        let name = key.split_once("://").map_or(key, |(_, name)| name);
        if name.is_empty() || name.starts_with('.') || name.contains(['/', '\\']) {
            return Err(CoreError::store_io(key, "invalid model name"));
        }
        Ok(name)
    }

    fn model_dir(&self, key: &str) -> Result<PathBuf, CoreError> {
        Ok(self.root.join(Self::model_name(key)?))
    }
}

impl ModelStore for CheckpointStore {
    fn load<B: Backend>(&self, key: &str, device: &B::Device) -> Result<StoredModel<B>, CoreError> {
        let dir = self.model_dir(key)?;
        if !dir.join(CONFIG_FILE).exists() {
            return Err(CoreError::store_io(key, format!("no model at '{}'", dir.display())));
        }

        let config = CharRnnConfig::load(dir.join(CONFIG_FILE))
            .map_err(|e| CoreError::store_io(key, format!("cannot read {CONFIG_FILE}: {e}")))?;

        let json = fs::read_to_string(dir.join(VOCAB_FILE))
            .map_err(|e| CoreError::store_io(key, format!("cannot read {VOCAB_FILE}: {e}")))?;
        let vocab: CharVocab = serde_json::from_str(&json)
            .map_err(|e| CoreError::store_io(key, format!("cannot parse {VOCAB_FILE}: {e}")))?;

        if vocab.len() != config.vocab_size {
            return Err(CoreError::shape_mismatch("embedding", config.vocab_size, vocab.len()));
        }

        // Rebuild the architecture, then pour the saved weights into it
        let network = config.init::<B>(device);
        let record  = CompactRecorder::new()
            .load(dir.join(WEIGHTS_FILE), device)
            .map_err(|e| CoreError::store_io(key, format!("cannot load weights: {e}")))?;
        let network = network.load_record(record);

        tracing::info!("Loaded model '{}' ({} parameters)", key, network.num_params());
        Ok(StoredModel { model: ModelState::new(network, config), vocab })
    }

    fn save<B: Backend>(&self, model: &ModelState<B>, vocab: &CharVocab, key: &str) -> Result<(), CoreError> {
        if vocab.len() != model.vocab_size() {
            return Err(CoreError::shape_mismatch("embedding", model.vocab_size(), vocab.len()));
        }

        let dir = self.model_dir(key)?;
        fs::create_dir_all(&dir)
            .map_err(|e| CoreError::store_io(key, format!("cannot create '{}': {e}", dir.display())))?;

        // Recorder adds the .mpk.gz extension
        CompactRecorder::new()
            .record(model.network().clone().into_record(), dir.join(WEIGHTS_FILE))
            .map_err(|e| CoreError::store_io(key, format!("cannot save weights: {e}")))?;

        model
            .config()
            .save(dir.join(CONFIG_FILE))
            .map_err(|e| CoreError::store_io(key, format!("cannot write {CONFIG_FILE}: {e}")))?;

        let json = serde_json::to_string(vocab)
            .map_err(|e| CoreError::store_io(key, e))?;
        fs::write(dir.join(VOCAB_FILE), json)
            .map_err(|e| CoreError::store_io(key, format!("cannot write {VOCAB_FILE}: {e}")))?;

        tracing::info!("Saved model '{}' to '{}'", key, dir.display());
        Ok(())
    }

    fn list(&self) -> Result<Vec<String>, CoreError> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let root_key = self.root.display().to_string();
        let entries  = fs::read_dir(&self.root).map_err(|e| CoreError::store_io(&root_key, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| CoreError::store_io(&root_key, e))?;
            if entry.path().join(CONFIG_FILE).is_file() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    fn contains(&self, key: &str) -> bool {
        self.model_dir(key)
            .map(|dir| dir.join(CONFIG_FILE).is_file())
            .unwrap_or(false)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn tiny_model(vocab: &CharVocab) -> ModelState<TestBackend> {
        let config = CharRnnConfig::new(vocab.len()).with_embedding_dim(3).with_hidden_size(4);
        ModelState::init(config, &Default::default())
    }

    #[test]
    fn test_model_name_strips_the_scheme() {
        assert_eq!(CheckpointStore::model_name("indexeddb://base-model").unwrap(), "base-model");
        assert_eq!(CheckpointStore::model_name("barackobama").unwrap(), "barackobama");
        assert!(CheckpointStore::model_name("file://../etc").is_err());
        assert!(CheckpointStore::model_name("").is_err());
    }

    #[test]
    fn test_save_then_load_restores_weights_and_vocab() {
        let tmp   = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(tmp.path());
        let vocab = CharVocab::from_text("hello");
        let mut model = tiny_model(&vocab);

        store.save(&model, &vocab, "indexeddb://hello").unwrap();
        assert!(store.contains("hello"));

        let StoredModel { model: mut loaded, vocab: loaded_vocab } =
            store.load::<TestBackend>("hello", &Default::default()).unwrap();
        assert_eq!(loaded_vocab, vocab);
        assert_eq!(loaded.config().hidden_size, 4);
        // CompactRecorder stores half precision
        let expected = model.step(1).unwrap();
        let actual   = loaded.step(1).unwrap();
        for (a, e) in actual.iter().zip(&expected) {
            assert!((a - e).abs() < 1e-2, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn test_list_returns_sorted_model_names() {
        let tmp   = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(tmp.path().join("models"));
        assert!(store.list().unwrap().is_empty());

        let vocab = CharVocab::from_text("ab");
        let model = tiny_model(&vocab);
        store.save(&model, &vocab, "zeta").unwrap();
        store.save(&model, &vocab, "alpha").unwrap();
        fs::create_dir_all(store.root().join("not-a-model")).unwrap();

        assert_eq!(store.list().unwrap(), vec!["alpha".to_string(), "zeta".to_string()]);
    }

    #[test]
    fn test_missing_model_is_a_store_error() {
        let tmp   = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(tmp.path());
        assert!(!store.contains("ghost"));
        assert!(matches!(
            store.load::<TestBackend>("ghost", &Default::default()),
            Err(CoreError::StoreIo { .. })
        ));
    }

    #[test]
    fn test_vocab_must_match_the_model() {
        let tmp   = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(tmp.path());
        let model = tiny_model(&CharVocab::from_text("ab"));
        let err   = store.save(&model, &CharVocab::from_text("abc"), "bad").unwrap_err();
        assert!(matches!(err, CoreError::ShapeMismatch { .. }));
    }
}
