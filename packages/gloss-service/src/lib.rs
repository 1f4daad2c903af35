pub mod reconcile;
pub mod search;
pub mod transaction;
pub mod users;

mod error;

pub use error::{Error, Result};
pub use gloss_providers::elasticsearch::BackendRequest;
pub use search::{
	RequestContext, Search, SearchResult, SearchSettings,
	aggregation::{Aggregation, AggregationRegistry},
	params::SearchParams,
	query::{Builder, Filter, Matcher, SearchExtensions, UriExpander},
};

use std::{future::Future, pin::Pin};

use serde_json::Value;

use gloss_providers::elasticsearch::ElasticsearchClient;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The search server boundary. Implementations return the raw JSON response.
pub trait SearchBackend
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		request: &'a BackendRequest,
	) -> BoxFuture<'a, gloss_providers::Result<Value>>;
}

/// Elasticsearch over HTTP.
pub struct DefaultBackend {
	client: ElasticsearchClient,
}
impl DefaultBackend {
	pub fn new(cfg: &gloss_config::SearchBackend) -> Result<Self> {
		Ok(Self { client: ElasticsearchClient::new(cfg)? })
	}
}

impl SearchBackend for DefaultBackend {
	fn search<'a>(
		&'a self,
		request: &'a BackendRequest,
	) -> BoxFuture<'a, gloss_providers::Result<Value>> {
		Box::pin(self.client.search(request))
	}
}
