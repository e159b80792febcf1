use crossbeam_channel::RecvTimeoutError;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use lexdb_core::error::EmbeddingError;
use lexdb_core::traits::EmbeddingProvider;
use tracing::warn;

/// Bounds every call on the wrapped provider.
///
/// The call runs on a helper thread; if it misses the deadline the caller gets
/// [`EmbeddingError::Timeout`] and the late result is discarded.
pub struct TimeoutEmbedder {
    inner: Arc<dyn EmbeddingProvider>,
    timeout: Duration,
}

impl TimeoutEmbedder {
    pub fn new(inner: Arc<dyn EmbeddingProvider>, timeout: Duration) -> Self { Self { inner, timeout } }

    fn bounded<T, F>(&self, op: &'static str, f: F) -> Result<T, EmbeddingError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn EmbeddingProvider) -> Result<T, EmbeddingError> + Send + 'static,
    {
        // One slot: the worker never blocks on send, even after the caller gave up.
        let (tx, rx) = crossbeam_channel::bounded(1);
        let inner = Arc::clone(&self.inner);
        thread::Builder::new()
            .name("lexdb-embed".into())
            .spawn(move || {
                // Receiver may be gone after a timeout.
                let _ = tx.send(f(inner.as_ref()));
            })
            .map_err(|e| EmbeddingError::Unavailable(e.to_string()))?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => {
                warn!(op, timeout_ms = self.timeout.as_millis() as u64, "embedding call timed out");
                Err(EmbeddingError::Timeout(self.timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(EmbeddingError::Unavailable("embedding worker exited without a result".into()))
            }
        }
    }
}

impl EmbeddingProvider for TimeoutEmbedder {
    fn dim(&self) -> usize { self.inner.dim() }

    fn embed_documents(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let texts = texts.to_vec();
        self.bounded("embed_documents", move |p| p.embed_documents(&texts))
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let text = text.to_string();
        self.bounded("embed_query", move |p| p.embed_query(&text))
    }
}
