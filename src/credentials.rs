use async_trait::async_trait;

/// The interactive key-selection flow the video path consults before
/// submitting work. The library never owns UI; the embedding application
/// decides what "select a key" looks like.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Whether a key has been selected for the video service.
    async fn has_selected_key(&self) -> bool;

    /// Ask the surrounding application to open its key-selection flow.
    /// Selection state is re-checked after this returns.
    async fn request_key_selection(&self);
}

/// Provider for headless embeddings where the configured key is already
/// the selected key.
#[derive(Debug, Clone, Copy, Default)]
pub struct PreselectedKey;

#[async_trait]
impl CredentialProvider for PreselectedKey {
    async fn has_selected_key(&self) -> bool {
        true
    }

    async fn request_key_selection(&self) {}
}
