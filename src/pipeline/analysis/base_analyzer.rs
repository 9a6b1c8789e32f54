use crate::data_model::DocumentInfo;
use crate::error::Result;
use async_trait::async_trait;

/// Analysis capability: turns raw document text into a metadata record.
///
/// Implementations cap the input they send and treat every field of the model's
/// answer as untrusted; an unparseable answer yields the sentinel record rather
/// than an error.
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    fn name(&self) -> &'static str;

    async fn analyze(&self, text: &str) -> Result<DocumentInfo>;
}
