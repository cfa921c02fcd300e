//! # Linked object store
//!
//! The assembler reads every object a virtual service links to through
//! [`LinkedObjectStore`]. Each read races the caller's cancellation token, so
//! an assembly stops at the next fetch once its reconciliation is abandoned.

pub mod memory;

pub use memory::InMemoryStore;

use crate::domain::{
    AccessLogConfigIntent, ClusterIntent, CredentialObject, HttpFilterSetIntent, PolicyIntent,
    ResourceRef, RouteSetIntent,
};
use crate::errors::{EdgeplaneError, Result};
use async_trait::async_trait;
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Read access to the objects a virtual service references.
///
/// Missing objects are reported as [`EdgeplaneError::NotFound`].
#[async_trait]
pub trait LinkedObjectStore: Send + Sync {
    async fn get_route_set(&self, id: &ResourceRef) -> Result<RouteSetIntent>;

    async fn get_http_filter_set(&self, id: &ResourceRef) -> Result<HttpFilterSetIntent>;

    async fn get_access_log_config(&self, id: &ResourceRef) -> Result<AccessLogConfigIntent>;

    async fn get_policy(&self, id: &ResourceRef) -> Result<PolicyIntent>;

    async fn get_credential(&self, id: &ResourceRef) -> Result<CredentialObject>;

    /// All cluster objects of a namespace, in a stable order.
    async fn list_clusters(&self, namespace: &str) -> Result<Vec<ClusterIntent>>;
}

/// Run a store operation unless `cancel` fires first.
pub async fn guarded<T, F>(cancel: &CancellationToken, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(EdgeplaneError::cancelled(operation)),
        result = fut => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[tokio::test]
    async fn guarded_passes_result_through() {
        let cancel = CancellationToken::new();
        let value = guarded(&cancel, "noop", async { Ok(7) }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn guarded_reports_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = guarded(&cancel, "get route set", std::future::pending::<Result<()>>())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Cancelled);
        assert!(err.is_retryable());
    }
}
