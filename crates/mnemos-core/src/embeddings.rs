//! Embedding provider contract.
//!
//! The engine never runs an embedding model itself — callers that want
//! semantic recall supply vectors through this trait (e.g. backed by an
//! HTTP call to an inference service, or a local ONNX model they own). The
//! engine's job is to store, search, and score those vectors, not to
//! produce them.

/// A caller-supplied source of query and document embeddings.
///
/// Implementors must always return vectors of the same fixed dimension; a
/// store created with one dimension can't mix vectors from a different one.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single piece of text for storage or querying.
    fn embed(&self, text: &str) -> Option<Vec<f32>>;

    /// Dimensionality this provider produces, if known up front.
    fn dimension(&self) -> Option<usize> {
        None
    }
}

/// The default provider: embeds nothing. Recall falls back to lexical and
/// graph-based candidate generation only.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProvider;

impl EmbeddingProvider for NoopProvider {
    fn embed(&self, _text: &str) -> Option<Vec<f32>> {
        None
    }
}

/// Which embedding provider an engine instance should use.
#[derive(Default)]
pub enum ProviderSelection {
    /// No semantic search; lexical and graph candidates only.
    #[default]
    None,
    /// A caller-supplied implementation.
    Custom(Box<dyn EmbeddingProvider>),
}

impl std::fmt::Debug for ProviderSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderSelection::None => write!(f, "ProviderSelection::None"),
            ProviderSelection::Custom(_) => write!(f, "ProviderSelection::Custom(..)"),
        }
    }
}

impl ProviderSelection {
    pub fn embed(&self, text: &str) -> Option<Vec<f32>> {
        match self {
            ProviderSelection::None => None,
            ProviderSelection::Custom(provider) => provider.embed(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoLengthProvider;
    impl EmbeddingProvider for EchoLengthProvider {
        fn embed(&self, text: &str) -> Option<Vec<f32>> {
            Some(vec![text.len() as f32])
        }
        fn dimension(&self) -> Option<usize> {
            Some(1)
        }
    }

    #[test]
    fn noop_provider_never_embeds() {
        assert_eq!(NoopProvider.embed("hello"), None);
    }

    #[test]
    fn selection_none_never_embeds() {
        assert_eq!(ProviderSelection::None.embed("hello"), None);
    }

    #[test]
    fn selection_custom_delegates_to_provider() {
        let selection = ProviderSelection::Custom(Box::new(EchoLengthProvider));
        assert_eq!(selection.embed("hello"), Some(vec![5.0]));
    }
}
