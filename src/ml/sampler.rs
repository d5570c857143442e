// ============================================================
// Layer 5 — Autoregressive Sampler
// ============================================================
// Generates text one character at a time:
//
//   Seeded   — reset the hidden state, encode the seed
//   Warming  — feed every seed token but the last, outputs
//              discarded, so the state has read the seed
//   Sampling — feed the current token → next-token distribution
//              → keep the top_n candidates → renormalise
//              → draw one with the caller's RNG
//   Done     — max_length tokens produced
//
// The output starts with the seed and is extended until it holds
// exactly max_length tokens. An empty seed starts from the
// vocabulary's start token, which is not part of the output.
// top_n = 1 is arg-max decoding.

use rand::{distributions::WeightedIndex, prelude::Distribution, Rng};
use burn::prelude::Backend;

use crate::domain::error::CoreError;
use crate::domain::options::SamplerOptions;
use crate::domain::vocab::CharVocab;
use crate::ml::state::ModelState;

// ─── NextTokenModel ───────────────────────────────────────────────────────────
/// A stateful model that turns one token into a distribution over
/// the next one.
pub trait NextTokenModel {
    fn vocab_size(&self) -> usize;

    fn reset_state(&mut self);

    /// Feed `token`, advance the recurrent state by one step and
    /// return `vocab_size` probabilities.
    fn next_distribution(&mut self, token: u32) -> Result<Vec<f32>, CoreError>;
}

impl<B: Backend> NextTokenModel for ModelState<B> {
    fn vocab_size(&self) -> usize {
        ModelState::vocab_size(self)
    }

    fn reset_state(&mut self) {
        ModelState::reset_state(self)
    }

    fn next_distribution(&mut self, token: u32) -> Result<Vec<f32>, CoreError> {
        self.step(token)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerPhase {
    Seeded,
    Warming,
    Sampling,
    Done,
}

// ─── SampleStream ─────────────────────────────────────────────────────────────
/// Iterator over sampled token ids. Yields the tokens that follow
/// the seed, stopping once seed + samples reach `max_length`.
/// The stream ends after the first error.
pub struct SampleStream<'a, M: NextTokenModel + ?Sized, R: Rng + ?Sized> {
    model:     &'a mut M,
    rng:       &'a mut R,
    top_n:     usize,
    current:   u32,
    remaining: usize,
    phase:     SamplerPhase,
}

impl<'a, M: NextTokenModel + ?Sized, R: Rng + ?Sized> SampleStream<'a, M, R> {
    /// Reset `model` and warm it up on `seed`.
    pub fn new(
        model:       &'a mut M,
        seed:        &[u32],
        start_token: u32,
        max_length:  usize,
        top_n:       usize,
        rng:         &'a mut R,
    ) -> Result<Self, CoreError> {
        let mut stream = Self {
            model,
            rng,
            top_n,
            current: start_token,
            remaining: max_length.saturating_sub(seed.len()),
            phase: SamplerPhase::Seeded,
        };
        stream.model.reset_state();

        if stream.remaining == 0 {
            stream.phase = SamplerPhase::Done;
            return Ok(stream);
        }

        if let Some((&last, warmup)) = seed.split_last() {
            stream.phase = SamplerPhase::Warming;
            for &token in warmup {
                stream.model.next_distribution(token)?;
            }
            stream.current = last;
            tracing::debug!("Warmed up on {} seed tokens", warmup.len());
        }

        stream.phase = SamplerPhase::Sampling;
        Ok(stream)
    }

    pub fn phase(&self) -> SamplerPhase {
        self.phase
    }
}

impl<M: NextTokenModel + ?Sized, R: Rng + ?Sized> Iterator for SampleStream<'_, M, R> {
    type Item = Result<u32, CoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.phase != SamplerPhase::Sampling {
            return None;
        }
        if self.remaining == 0 {
            self.phase = SamplerPhase::Done;
            return None;
        }

        let next = self
            .model
            .next_distribution(self.current)
            .and_then(|probs| sample_top_n(&probs, self.top_n, self.rng));

        match next {
            Ok(token) => {
                self.current    = token;
                self.remaining -= 1;
                Some(Ok(token))
            }
            Err(e) => {
                self.phase = SamplerPhase::Done;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.phase {
            SamplerPhase::Sampling => (0, Some(self.remaining)),
            _ => (0, Some(0)),
        }
    }
}

/// Draw one index from the `top_n` most probable entries of `probs`,
/// weighted by their renormalised mass. Ties keep the lower index.
/// NaN and negative probabilities count as zero; if every candidate
/// has zero mass the pick is uniform among them.
pub fn sample_top_n<R: Rng + ?Sized>(probs: &[f32], top_n: usize, rng: &mut R) -> Result<u32, CoreError> {
    if probs.is_empty() || top_n == 0 {
        return Err(CoreError::InvalidConfig(format!(
            "cannot sample top {top_n} of {} probabilities",
            probs.len()
        )));
    }

    let mut ranked: Vec<(usize, f32)> = probs
        .iter()
        .map(|&p| if p.is_finite() && p > 0.0 { p } else { 0.0 })
        .enumerate()
        .collect();
    // descending by probability; sort_by is stable
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(top_n);

    let index = match WeightedIndex::new(ranked.iter().map(|&(_, p)| p)) {
        Ok(dist) => dist.sample(rng),
        Err(_)   => rng.gen_range(0..ranked.len()),
    };
    Ok(ranked[index].0 as u32)
}

/// Generate `options.max_length` characters from `seed`.
pub fn generate<M, R>(
    model:   &mut M,
    vocab:   &CharVocab,
    seed:    &str,
    options: &SamplerOptions,
    rng:     &mut R,
) -> Result<String, CoreError>
where
    M: NextTokenModel + ?Sized,
    R: Rng + ?Sized,
{
    options.validate(vocab.len())?;
    if model.vocab_size() != vocab.len() {
        return Err(CoreError::shape_mismatch("head", vocab.len(), model.vocab_size()));
    }

    let seed_tokens = vocab.encode(seed);
    let mut tokens: Vec<u32> = seed_tokens.iter().take(options.max_length).copied().collect();

    let stream = SampleStream::new(
        model,
        &seed_tokens,
        vocab.start_token(),
        options.max_length,
        options.top_n,
        rng,
    )?;
    for token in stream {
        tokens.push(token?);
    }

    tracing::debug!("Sampled {} tokens from a seed of {}", tokens.len(), seed_tokens.len());
    Ok(vocab.decode(&tokens))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::model::CharRnnConfig;
    use burn::backend::NdArray;
    use rand::{rngs::StdRng, SeedableRng};

    /// Predicts a → b and b → a with certainty; anything else is uniform.
    struct Alternator {
        vocab: CharVocab,
        fed:   Vec<u32>,
        resets: usize,
    }

    impl Alternator {
        fn new() -> Self {
            Self { vocab: CharVocab::from_text("ab"), fed: Vec::new(), resets: 0 }
        }
    }

    impl NextTokenModel for Alternator {
        fn vocab_size(&self) -> usize {
            self.vocab.len()
        }

        fn reset_state(&mut self) {
            self.fed.clear();
            self.resets += 1;
        }

        fn next_distribution(&mut self, token: u32) -> Result<Vec<f32>, CoreError> {
            self.fed.push(token);
            let a = self.vocab.char_to_index('a').unwrap() as usize;
            let b = self.vocab.char_to_index('b').unwrap() as usize;
            let n = self.vocab.len();
            let mut probs = vec![0.0; n];
            if token as usize == a {
                probs[b] = 1.0;
            } else if token as usize == b {
                probs[a] = 1.0;
            } else {
                probs.iter_mut().for_each(|p| *p = 1.0 / n as f32);
            }
            Ok(probs)
        }
    }

    fn opts(max_length: usize, top_n: usize) -> SamplerOptions {
        SamplerOptions { max_length, top_n }
    }

    #[test]
    fn test_alternating_double_gives_ababa() {
        let mut model = Alternator::new();
        let vocab     = model.vocab.clone();
        let mut rng   = StdRng::seed_from_u64(0);

        let text = generate(&mut model, &vocab, "a", &opts(5, 1), &mut rng).unwrap();
        assert_eq!(text, "ababa");
        assert_eq!(model.resets, 1);
    }

    #[test]
    fn test_warmup_feeds_the_whole_seed_in_order() {
        let mut model = Alternator::new();
        let vocab     = model.vocab.clone();
        let mut rng   = StdRng::seed_from_u64(0);

        let text = generate(&mut model, &vocab, "abb", &opts(5, 1), &mut rng).unwrap();
        assert_eq!(text, "abbab");
        assert_eq!(vocab.decode(&model.fed), "abba");
    }

    #[test]
    fn test_long_seed_is_truncated_without_sampling() {
        let mut model = Alternator::new();
        let vocab     = model.vocab.clone();
        let mut rng   = StdRng::seed_from_u64(0);

        let text = generate(&mut model, &vocab, "aaaaaa", &opts(4, 1), &mut rng).unwrap();
        assert_eq!(text, "aaaa");
        assert!(model.fed.is_empty());
    }

    #[test]
    fn test_empty_seed_starts_from_the_start_token() {
        let mut model = Alternator::new();
        let vocab     = model.vocab.clone();
        let mut rng   = StdRng::seed_from_u64(3);

        let text = generate(&mut model, &vocab, "", &opts(6, 2), &mut rng).unwrap();
        assert_eq!(text.chars().count(), 6);
        assert_eq!(model.fed.first(), Some(&vocab.start_token()));
    }

    #[test]
    fn test_stream_phases() {
        let mut model = Alternator::new();
        let mut rng   = StdRng::seed_from_u64(0);
        let a = model.vocab.char_to_index('a').unwrap();

        let mut stream = SampleStream::new(&mut model, &[a], 0, 3, 1, &mut rng).unwrap();
        assert_eq!(stream.phase(), SamplerPhase::Sampling);
        assert_eq!(stream.by_ref().count(), 2);
        assert_eq!(stream.phase(), SamplerPhase::Done);
    }

    #[test]
    fn test_top_one_is_argmax() {
        let mut rng = StdRng::seed_from_u64(7);
        let probs   = [0.1, 0.6, 0.05, 0.25];
        for _ in 0..20 {
            assert_eq!(sample_top_n(&probs, 1, &mut rng).unwrap(), 1);
        }
    }

    #[test]
    fn test_top_n_restricts_candidates() {
        let mut rng = StdRng::seed_from_u64(11);
        let probs   = [0.3, 0.05, 0.4, 0.05, 0.2];
        for _ in 0..200 {
            let pick = sample_top_n(&probs, 2, &mut rng).unwrap();
            assert!(pick == 0 || pick == 2, "picked {pick}");
        }
    }

    #[test]
    fn test_nan_and_zero_mass_fall_back_to_uniform() {
        let mut rng = StdRng::seed_from_u64(5);
        let probs   = [f32::NAN, 0.0, 0.0];
        let pick    = sample_top_n(&probs, 3, &mut rng).unwrap();
        assert!(pick < 3);
        assert!(sample_top_n(&[], 1, &mut rng).is_err());
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let mut model = Alternator::new();
        let vocab     = model.vocab.clone();
        let mut rng   = StdRng::seed_from_u64(0);
        assert!(matches!(
            generate(&mut model, &vocab, "a", &opts(0, 1), &mut rng),
            Err(CoreError::InvalidConfig(_))
        ));
        assert!(generate(&mut model, &vocab, "a", &opts(5, vocab.len() + 1), &mut rng).is_err());
    }

    #[test]
    fn test_real_model_is_reproducible_with_a_seeded_rng() {
        let vocab  = CharVocab::from_text("hello world");
        let config = CharRnnConfig::new(vocab.len()).with_embedding_dim(4).with_hidden_size(8);
        let mut model = ModelState::<NdArray>::init(config, &Default::default());

        let first  = generate(&mut model, &vocab, "he", &opts(12, 3), &mut StdRng::seed_from_u64(42)).unwrap();
        let second = generate(&mut model, &vocab, "he", &opts(12, 3), &mut StdRng::seed_from_u64(42)).unwrap();

        assert_eq!(first, second);
        assert_eq!(first.chars().count(), 12);
        assert!(first.starts_with("he"));
    }
}
