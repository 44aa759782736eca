pub mod fetcher;
pub mod registry;
pub mod static_fetcher;

pub use fetcher::{ResourceFetcher, unsupported_resource_type};
pub use registry::FetcherRegistry;
pub use static_fetcher::StaticFetcher;
