//! Backend trait for submitting and refreshing long-running operations.

use crate::error::Result;
use crate::video::operation::Operation;
use crate::video::types::GenerationRequest;
use async_trait::async_trait;

/// A remote service that runs video generation as long-running operations.
#[async_trait]
pub trait OperationBackend: Send + Sync {
    /// Starts a job for `request` and returns its handle.
    async fn submit(&self, request: &GenerationRequest) -> Result<Operation>;

    /// Fetches the current state of `operation`.
    async fn refresh(&self, operation: &Operation) -> Result<Operation>;

    /// Returns the name of this backend for display.
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: OperationBackend + ?Sized> OperationBackend for std::sync::Arc<T> {
    async fn submit(&self, request: &GenerationRequest) -> Result<Operation> {
        (**self).submit(request).await
    }

    async fn refresh(&self, operation: &Operation) -> Result<Operation> {
        (**self).refresh(operation).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
