//! Token-count estimate for downstream budget planning.
//!
//! The count is an estimate only: the indexing layer may embed with a
//! different tokenizer. `cl100k_base` is loaded once per process; if it
//! cannot be built the estimate falls back to one token per four characters.

use once_cell::sync::Lazy;
use tiktoken_rs::{cl100k_base, CoreBPE};
use tracing::warn;

static ENCODER: Lazy<Option<CoreBPE>> = Lazy::new(|| match cl100k_base() {
    Ok(bpe) => Some(bpe),
    Err(e) => {
        warn!("cl100k_base unavailable, using character heuristic: {}", e);
        None
    }
});

/// Estimate how many tokens `text` occupies.
///
/// CPU-bound for large inputs; call from a blocking context.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    match ENCODER.as_ref() {
        Some(bpe) => bpe.encode_ordinary(text).len(),
        None => char_estimate(text),
    }
}

fn char_estimate(text: &str) -> usize {
    text.chars().count().div_ceil(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_zero() {
        assert_eq!(estimate_tokens(""), 0);
    }

    #[test]
    fn nonempty_text_is_positive() {
        let n = estimate_tokens("The quick brown fox jumps over the lazy dog.");
        assert!(n > 0);
        assert!(n < 44, "should be well below the char count, got {n}");
    }

    #[test]
    fn char_estimate_rounds_up() {
        assert_eq!(char_estimate("abc"), 1);
        assert_eq!(char_estimate("abcde"), 2);
    }
}
