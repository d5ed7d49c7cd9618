//! Token counting
//!
//! BPE encodings come from `tiktoken-rs` when the `tiktoken` feature is on.
//! Without it, or when no encoding loads, counts fall back to whitespace words.

/// Encodings tried when neither a model nor an explicit encoding resolves
pub const DEFAULT_ENCODINGS: [&str; 2] = ["o200k_base", "cl100k_base"];

/// Token counting over plain text.
pub trait Tokenizer: Send + Sync {
    /// Count the number of tokens in `text`. Empty text counts 0.
    fn count_tokens(&self, text: &str) -> usize;

    /// Human readable name, e.g. `o200k_base` or `whitespace`
    fn name(&self) -> &str;

    /// True for the whitespace approximation
    fn is_approximate(&self) -> bool {
        false
    }
}

impl<T: Tokenizer + ?Sized> Tokenizer for &T {
    fn count_tokens(&self, text: &str) -> usize {
        (*self).count_tokens(text)
    }

    fn name(&self) -> &str {
        (*self).name()
    }

    fn is_approximate(&self) -> bool {
        (*self).is_approximate()
    }
}

/// Counts whitespace-separated words
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }

    fn name(&self) -> &str {
        "whitespace"
    }

    fn is_approximate(&self) -> bool {
        true
    }
}

#[cfg(feature = "tiktoken")]
mod bpe {
    use super::Tokenizer;
    use tiktoken_rs::CoreBPE;

    pub struct BpeTokenizer {
        name: String,
        bpe: CoreBPE,
    }

    impl Tokenizer for BpeTokenizer {
        fn count_tokens(&self, text: &str) -> usize {
            if text.is_empty() {
                return 0;
            }
            self.bpe.encode_ordinary(text).len()
        }

        fn name(&self) -> &str {
            &self.name
        }
    }

    pub fn for_encoding(name: &str) -> Option<BpeTokenizer> {
        let bpe = match name {
            "o200k_base" => tiktoken_rs::o200k_base(),
            "cl100k_base" => tiktoken_rs::cl100k_base(),
            "p50k_base" => tiktoken_rs::p50k_base(),
            "p50k_edit" => tiktoken_rs::p50k_edit(),
            "r50k_base" | "gpt2" => tiktoken_rs::r50k_base(),
            _ => return None,
        };
        match bpe {
            Ok(bpe) => Some(BpeTokenizer {
                name: name.to_string(),
                bpe,
            }),
            Err(err) => {
                tracing::debug!("failed to load encoding {}: {}", name, err);
                None
            }
        }
    }

    pub fn for_model(model: &str) -> Option<BpeTokenizer> {
        match tiktoken_rs::get_bpe_from_model(model) {
            Ok(bpe) => Some(BpeTokenizer {
                name: model.to_string(),
                bpe,
            }),
            Err(_) => {
                tracing::debug!("no encoding known for model {}", model);
                None
            }
        }
    }
}

#[cfg(feature = "tiktoken")]
fn resolve_bpe(model: Option<&str>, encoding: Option<&str>) -> Option<Box<dyn Tokenizer>> {
    let from_model = model
        .filter(|m| !m.is_empty())
        .and_then(bpe::for_model);
    if let Some(tok) = from_model {
        return Some(Box::new(tok));
    }
    let from_encoding = encoding
        .filter(|e| !e.is_empty())
        .and_then(bpe::for_encoding);
    if let Some(tok) = from_encoding {
        return Some(Box::new(tok));
    }
    DEFAULT_ENCODINGS
        .iter()
        .find_map(|name| bpe::for_encoding(name))
        .map(|tok| Box::new(tok) as Box<dyn Tokenizer>)
}

#[cfg(not(feature = "tiktoken"))]
fn resolve_bpe(_model: Option<&str>, _encoding: Option<&str>) -> Option<Box<dyn Tokenizer>> {
    None
}

/// Resolve a tokenizer: model first, then encoding, then the default chain,
/// then whitespace counting.
pub fn load_tokenizer(model: Option<&str>, encoding: Option<&str>) -> Box<dyn Tokenizer> {
    match resolve_bpe(model, encoding) {
        Some(tok) => {
            tracing::debug!("using tokenizer {}", tok.name());
            tok
        }
        None => {
            tracing::warn!("BPE tokenizer not available; using whitespace token counts");
            Box::new(WhitespaceTokenizer)
        }
    }
}
