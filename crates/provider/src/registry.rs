use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use infracheck_core::{LookupError, LookupRequest, ResourceCategory, ResourceDescription};
use tracing::debug;

use crate::fetcher::ResourceFetcher;

/// Routes lookup requests to the fetcher registered for their category.
///
/// Built once before the validations run and then shared behind an `Arc`.
/// The registry is itself a [`ResourceFetcher`], so a validator can be handed
/// either a single fetcher or the whole registry.
pub struct FetcherRegistry {
    fetchers: HashMap<ResourceCategory, Arc<dyn ResourceFetcher>>,
}

impl FetcherRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            fetchers: HashMap::new(),
        }
    }

    /// Register a fetcher under its own category, replacing any previous one.
    pub fn register(&mut self, fetcher: Arc<dyn ResourceFetcher>) {
        self.fetchers.insert(fetcher.category(), fetcher);
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, fetcher: Arc<dyn ResourceFetcher>) -> Self {
        self.register(fetcher);
        self
    }

    pub fn get(&self, category: ResourceCategory) -> Option<Arc<dyn ResourceFetcher>> {
        self.fetchers.get(&category).cloned()
    }

    /// Registered categories in declaration order.
    pub fn list(&self) -> Vec<ResourceCategory> {
        ResourceCategory::ALL
            .into_iter()
            .filter(|c| self.fetchers.contains_key(c))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fetchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetchers.is_empty()
    }
}

impl Default for FetcherRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceFetcher for FetcherRegistry {
    /// A registry spans categories; it reports the first registered one.
    fn category(&self) -> ResourceCategory {
        self.list().first().copied().unwrap_or(ResourceCategory::Ec2)
    }

    fn supported_resource_types(&self) -> Vec<String> {
        self.list()
            .into_iter()
            .filter_map(|category| self.fetchers.get(&category))
            .flat_map(|fetcher| {
                let category = fetcher.category();
                fetcher
                    .supported_resource_types()
                    .into_iter()
                    .map(move |t| format!("{category}/{t}"))
            })
            .collect()
    }

    async fn fetch(&self, request: &LookupRequest) -> Result<ResourceDescription, LookupError> {
        let Some(fetcher) = self.fetchers.get(&request.category) else {
            return Err(LookupError::invalid_input(format!(
                "no fetcher registered for category {}",
                request.category
            )));
        };
        debug!(category = %request.category, resource_type = %request.resource_type, "routing lookup");
        fetcher.fetch(request).await
    }
}
