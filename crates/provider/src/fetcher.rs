use std::sync::Arc;

use async_trait::async_trait;
use infracheck_core::{LookupError, LookupRequest, ResourceCategory, ResourceDescription};

/// Read-only access to the live state of one category of resources.
///
/// Implementations issue a single describe/get call per request (two for
/// lookups that must resolve a version first) and never mutate provider
/// state. Failures are returned as classified [`LookupError`]s.
#[async_trait]
pub trait ResourceFetcher: Send + Sync {
    /// The category this fetcher serves.
    fn category(&self) -> ResourceCategory;

    /// Returns the list of resource types this fetcher supports.
    fn supported_resource_types(&self) -> Vec<String>;

    /// Describe the resource identified by `request`.
    async fn fetch(&self, request: &LookupRequest) -> Result<ResourceDescription, LookupError>;
}

#[async_trait]
impl<T: ResourceFetcher + ?Sized> ResourceFetcher for Arc<T> {
    fn category(&self) -> ResourceCategory {
        (**self).category()
    }

    fn supported_resource_types(&self) -> Vec<String> {
        (**self).supported_resource_types()
    }

    async fn fetch(&self, request: &LookupRequest) -> Result<ResourceDescription, LookupError> {
        (**self).fetch(request).await
    }
}

/// `InvalidInput` error for a resource type the fetcher does not serve.
pub fn unsupported_resource_type(request: &LookupRequest) -> LookupError {
    LookupError::invalid_input(format!(
        "unsupported {} resource type: {}",
        request.category, request.resource_type
    ))
}
