pub mod aggregation;
pub mod params;
pub mod query;

use std::{collections::BTreeMap, sync::Arc};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use gloss_config::SearchLimits;

use crate::{
	BackendRequest, Result, SearchBackend,
	search::{
		aggregation::Aggregation,
		params::SearchParams,
		query::{
			Builder, Filter, Matcher, NoExpansion, RepliesMatcher, SearchExtensions,
			TopLevelAnnotationsFilter, UriExpander, default_querybuilder,
		},
	},
};

/// Who is searching and which extensions apply to their request.
#[derive(Clone)]
pub struct RequestContext {
	pub authenticated_userid: Option<String>,
	pub auth_domain: String,
	pub uri_expander: Arc<dyn UriExpander>,
	pub extensions: Arc<SearchExtensions>,
}
impl RequestContext {
	pub fn anonymous(auth_domain: impl Into<String>) -> Self {
		Self {
			authenticated_userid: None,
			auth_domain: auth_domain.into(),
			uri_expander: Arc::new(NoExpansion),
			extensions: Arc::new(SearchExtensions::default()),
		}
	}

	pub fn with_user(mut self, userid: impl Into<String>) -> Self {
		self.authenticated_userid = Some(userid.into());

		self
	}

	pub fn with_uri_expander(mut self, expander: Arc<dyn UriExpander>) -> Self {
		self.uri_expander = expander;

		self
	}

	pub fn with_extensions(mut self, extensions: SearchExtensions) -> Self {
		self.extensions = Arc::new(extensions);

		self
	}
}

/// Where searches are sent and how large their pages may be.
#[derive(Clone, Debug)]
pub struct SearchSettings {
	pub index: String,
	pub doc_type: String,
	pub limits: SearchLimits,
}
impl SearchSettings {
	pub fn from_config(cfg: &gloss_config::Search) -> Self {
		Self {
			index: cfg.backend.index.clone(),
			doc_type: cfg.backend.doc_type.clone(),
			limits: cfg.limits(),
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SearchResult {
	/// Matches reported by the backend, which may exceed the ids returned.
	pub total: u64,
	pub annotation_ids: Vec<String>,
	/// Relevance per returned annotation. Absent when the backend sorted by a field.
	pub annotation_scores: BTreeMap<String, Option<f64>>,
	pub reply_ids: Vec<String>,
	pub aggregations: BTreeMap<String, Value>,
}

/// One search request: annotations matching the parameters, optionally with their replies
/// fetched separately.
pub struct Search {
	backend: Arc<dyn SearchBackend>,
	settings: SearchSettings,
	separate_replies: bool,
	builder: Builder,
	reply_builder: Builder,
}
impl Search {
	pub fn new(
		backend: Arc<dyn SearchBackend>,
		settings: SearchSettings,
		context: &RequestContext,
		separate_replies: bool,
	) -> Self {
		let reply_limit = settings.limits.reply_limit;
		let builder = default_querybuilder(context, settings.limits);
		let reply_builder = default_querybuilder(context, SearchLimits {
			default_limit: reply_limit,
			max_limit: reply_limit,
			reply_limit,
		});

		Self { backend, settings, separate_replies, builder, reply_builder }
	}

	pub fn append_filter(&mut self, filter: Arc<dyn Filter>) {
		self.builder.append_filter(filter.clone());
		self.reply_builder.append_filter(filter);
	}

	pub fn append_matcher(&mut self, matcher: Arc<dyn Matcher>) {
		self.builder.append_matcher(matcher.clone());
		self.reply_builder.append_matcher(matcher);
	}

	pub fn append_aggregation(&mut self, aggregation: Arc<dyn Aggregation>) {
		self.builder.append_aggregation(aggregation);
	}

	pub async fn run(mut self, params: &SearchParams) -> Result<SearchResult> {
		if self.separate_replies {
			self.builder.append_filter(Arc::new(TopLevelAnnotationsFilter));
		}

		let body = self.builder.build(params);
		let response = self.execute(body).await?;
		let annotation_ids: Vec<String> =
			response.hits.hits.iter().map(|hit| hit.id.clone()).collect();
		let annotation_scores: BTreeMap<String, Option<f64>> =
			response.hits.hits.iter().map(|hit| (hit.id.clone(), hit.score)).collect();
		let reply_ids = if self.separate_replies && !annotation_ids.is_empty() {
			self.search_replies(&annotation_ids).await?
		} else {
			Vec::new()
		};
		let aggregations = self.parse_aggregations(response.aggregations.as_ref());

		Ok(SearchResult {
			total: response.hits.total.value(),
			annotation_ids,
			annotation_scores,
			reply_ids,
			aggregations,
		})
	}

	async fn search_replies(&self, annotation_ids: &[String]) -> Result<Vec<String>> {
		let reply_limit = self.settings.limits.reply_limit;
		let mut builder = self.reply_builder.clone();

		builder.append_matcher(Arc::new(RepliesMatcher::new(annotation_ids.to_vec())));

		let response = self.execute(builder.build(&SearchParams::new())).await?;
		let total = response.hits.total.value();

		if total > response.hits.hits.len() as u64 {
			tracing::warn!(
				total,
				returned = response.hits.hits.len(),
				reply_limit,
				"Reply search returned fewer hits than matched; replies were truncated."
			);
		}

		Ok(response.hits.hits.into_iter().map(|hit| hit.id).collect())
	}

	async fn execute(&self, body: Value) -> Result<SearchResponse> {
		let request = BackendRequest {
			index: self.settings.index.clone(),
			doc_type: self.settings.doc_type.clone(),
			body,
			source: false,
		};
		let raw = self.backend.search(&request).await?;

		serde_json::from_value(raw).map_err(|err| {
			gloss_providers::Error::InvalidResponse { message: err.to_string() }.into()
		})
	}

	fn parse_aggregations(&self, raw: Option<&Map<String, Value>>) -> BTreeMap<String, Value> {
		let mut parsed = BTreeMap::new();
		let Some(raw) = raw else {
			return parsed;
		};

		for (key, payload) in raw {
			let Some(aggregation) =
				self.builder.aggregations().iter().find(|aggregation| aggregation.key() == key)
			else {
				continue;
			};

			parsed.insert(key.clone(), aggregation.parse_result(payload));
		}

		parsed
	}
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
	hits: Hits,
	#[serde(default)]
	aggregations: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct Hits {
	total: HitsTotal,
	#[serde(default)]
	hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum HitsTotal {
	Count(u64),
	Object { value: u64 },
}
impl HitsTotal {
	fn value(&self) -> u64 {
		match self {
			Self::Count(value) | Self::Object { value } => *value,
		}
	}
}

#[derive(Debug, Deserialize)]
struct Hit {
	#[serde(rename = "_id")]
	id: String,
	#[serde(rename = "_score", default)]
	score: Option<f64>,
}
