/// Network adapters for external API calls
mod cached_fetcher;
mod caching_registry;
mod depsdev_client;
mod fallback;
mod http;
mod openai_client;
mod osv_client;
mod pypi_client;
mod retrying_fetcher;
mod retrying_registry;

pub use cached_fetcher::CachedFetcher;
pub use caching_registry::CachingReleaseRegistry;
pub use depsdev_client::{DepsDevClient, DepsDevDependencySource};
pub use fallback::FallbackMetadataSource;
pub use http::DEFAULT_TIMEOUT_SECS;
pub use openai_client::OpenAiReasoningClient;
pub use osv_client::OsvClient;
pub use pypi_client::{PyPiClient, PyPiDependencySource};
pub use retrying_fetcher::RetryingFetcher;
pub use retrying_registry::RetryingReleaseRegistry;
