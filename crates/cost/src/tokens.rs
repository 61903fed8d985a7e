use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;
#[cfg(feature = "tiktoken")]
use std::sync::OnceLock;

/// A real tokenizer that can count tokens for a model family.
pub trait Tokenizer: Send + Sync {
    /// Counts the tokens in `text`, or returns `None` if the text cannot
    /// be encoded.
    fn count_tokens(&self, text: &str) -> Option<u64>;
}

/// Counts tokens with the `cl100k_base` encoding.
#[cfg(feature = "tiktoken")]
pub struct Cl100kTokenizer {
    bpe: tiktoken_rs::CoreBPE,
}

#[cfg(feature = "tiktoken")]
impl Cl100kTokenizer {
    /// Loads the encoding, or returns `None` if its ranks cannot be parsed.
    pub fn load() -> Option<Self> {
        match tiktoken_rs::cl100k_base() {
            Ok(bpe) => Some(Self { bpe }),
            Err(err) => {
                warn!("failed to load cl100k_base: {err}");
                None
            }
        }
    }

    /// The process-wide instance, loaded on first use.
    pub fn shared() -> Option<Arc<Self>> {
        static SHARED: OnceLock<Option<Arc<Cl100kTokenizer>>> = OnceLock::new();
        SHARED.get_or_init(|| Self::load().map(Arc::new)).clone()
    }
}

#[cfg(feature = "tiktoken")]
impl Tokenizer for Cl100kTokenizer {
    fn count_tokens(&self, text: &str) -> Option<u64> {
        Some(self.bpe.encode_with_special_tokens(text).len() as u64)
    }
}

/// Estimates token counts before a call is made.
///
/// The default estimator uses [`Cl100kTokenizer`] when the `tiktoken`
/// feature is on. Without a tokenizer, or when the tokenizer fails, one
/// token is assumed per four characters.
#[derive(Clone)]
pub struct TokenEstimator {
    tokenizer: Option<Arc<dyn Tokenizer>>,
}

impl Default for TokenEstimator {
    fn default() -> Self {
        #[cfg(feature = "tiktoken")]
        if let Some(tokenizer) = Cl100kTokenizer::shared() {
            return Self {
                tokenizer: Some(tokenizer),
            };
        }
        Self::by_chars()
    }
}

impl TokenEstimator {
    /// Creates an estimator that only uses the character heuristic.
    #[inline]
    pub fn by_chars() -> Self {
        Self { tokenizer: None }
    }

    /// Creates an estimator backed by the given tokenizer.
    #[inline]
    pub fn with_tokenizer<T: Tokenizer + 'static>(tokenizer: T) -> Self {
        Self {
            tokenizer: Some(Arc::new(tokenizer)),
        }
    }

    /// Returns `true` if a tokenizer backs this estimator.
    #[inline]
    pub fn has_tokenizer(&self) -> bool {
        self.tokenizer.is_some()
    }

    /// Estimates the number of tokens in `text`.
    pub fn estimate(&self, text: &str) -> u64 {
        if let Some(tokenizer) = &self.tokenizer {
            match tokenizer.count_tokens(text) {
                Some(count) => return count,
                None => warn!("tokenizer failed, using character estimate"),
            }
        }
        Self::estimate_by_chars(text)
    }

    /// The four-characters-per-token heuristic.
    #[inline]
    pub fn estimate_by_chars(text: &str) -> u64 {
        text.chars().count() as u64 / 4
    }
}

impl Debug for TokenEstimator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenEstimator")
            .field("has_tokenizer", &self.tokenizer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct WordTokenizer;

    impl Tokenizer for WordTokenizer {
        fn count_tokens(&self, text: &str) -> Option<u64> {
            if text.contains('\0') {
                return None;
            }
            Some(text.split_whitespace().count() as u64)
        }
    }

    #[test]
    fn test_fallback_estimate() {
        let estimator = TokenEstimator::by_chars();
        assert!(!estimator.has_tokenizer());
        assert_eq!(estimator.estimate(""), 0);
        assert_eq!(estimator.estimate("abc"), 0);
        assert_eq!(estimator.estimate("abcd"), 1);
        assert_eq!(estimator.estimate(&"x".repeat(4096)), 1024);
        // Characters, not bytes.
        assert_eq!(estimator.estimate("日本語のテキスト"), 2);
    }

    #[test]
    fn test_tokenizer_and_its_failure() {
        let estimator = TokenEstimator::with_tokenizer(WordTokenizer);
        assert_eq!(estimator.estimate("one two three"), 3);
        assert_eq!(estimator.estimate("broken\0 input text"), 4);
    }

    #[cfg(feature = "tiktoken")]
    #[test]
    fn test_default_uses_cl100k() {
        let estimator = TokenEstimator::default();
        assert!(estimator.has_tokenizer());
        // "Hello", ",", " world", "!"; the heuristic would say 3.
        assert_eq!(estimator.estimate("Hello, world!"), 4);
        assert_eq!(estimator.estimate(""), 0);

        let tokenizer = Cl100kTokenizer::load().unwrap();
        assert_eq!(tokenizer.count_tokens("Hello, world!"), Some(4));
    }
}
