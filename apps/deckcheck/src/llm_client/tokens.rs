use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use tiktoken_rs::CoreBPE;
use tracing::warn;

/// Built encoders per model name. `None` marks a model without a known encoding.
static ENCODERS: OnceLock<Mutex<HashMap<String, Option<Arc<CoreBPE>>>>> = OnceLock::new();

/// Estimates the token count of `text` for `model`.
///
/// Uses the model's tiktoken encoding; models without a known encoding fall
/// back to `ceil(len / 4)`. Estimation only, never used for billing.
/// Encoders are built once per model and cached.
pub fn count_tokens(text: &str, model: &str) -> usize {
    match encoder_for(model) {
        Some(bpe) => bpe.encode_with_special_tokens(text).len(),
        None => estimate_tokens(text),
    }
}

fn encoder_for(model: &str) -> Option<Arc<CoreBPE>> {
    let cache = ENCODERS.get_or_init(Default::default);
    if let Ok(cache) = cache.lock() {
        if let Some(cached) = cache.get(model) {
            return cached.clone();
        }
    }

    // Built outside the lock; a concurrent first call may build twice.
    let built = match tiktoken_rs::get_bpe_from_model(model) {
        Ok(bpe) => Some(Arc::new(bpe)),
        Err(e) => {
            warn!(model, "No tokenizer for model, using length estimate: {e}");
            None
        }
    };
    if let Ok(mut cache) = cache.lock() {
        cache.insert(model.to_string(), built.clone());
    }
    built
}

fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_model_falls_back_to_length_estimate() {
        assert_eq!(count_tokens("abcdefghi", "not-a-real-model"), 3);
        assert_eq!(count_tokens("", "not-a-real-model"), 0);
        assert!(encoder_for("not-a-real-model").is_none());
    }

    #[test]
    fn test_estimate_rounds_up() {
        assert_eq!(estimate_tokens("abcd"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }

    #[test]
    fn test_encoder_built_once_per_model() {
        assert!(count_tokens("Teams lose four hours a week", "gpt-4o-mini") > 0);
        let first = encoder_for("gpt-4o-mini").unwrap();
        let second = encoder_for("gpt-4o-mini").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }
}
