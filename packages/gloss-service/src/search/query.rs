//! Translation of search parameters into an Elasticsearch request body.
//!
//! A [`Builder`] holds ordered filters, matchers and aggregations. Building consumes parameters
//! from a private copy: each component removes the keys it understands and every key left over
//! becomes a plain `match` on the field of the same name.

use std::sync::Arc;

use serde_json::{Map, Value, json};

use gloss_config::SearchLimits;
use gloss_storage::{documents, memory::MemoryStore};

use crate::search::{RequestContext, aggregation::Aggregation, params::SearchParams};

/// Fields searched by the `any` parameter.
pub const ANY_FIELDS: [&str; 5] = ["quote", "tags", "text", "uri.parts", "user"];

/// Restricts the result set without affecting relevance.
pub trait Filter
where
	Self: Send + Sync,
{
	fn build(&self, params: &mut SearchParams) -> Option<Value>;
}

/// Contributes a relevance-scored clause.
pub trait Matcher
where
	Self: Send + Sync,
{
	fn build(&self, params: &mut SearchParams) -> Option<Value>;
}

/// Resolves a URI to every equivalent URI a search for it should cover.
pub trait UriExpander
where
	Self: Send + Sync,
{
	fn expand(&self, uri: &str) -> Vec<String>;
}

/// Treats every URI as standing only for itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoExpansion;
impl UriExpander for NoExpansion {
	fn expand(&self, uri: &str) -> Vec<String> {
		vec![uri.to_string()]
	}
}

impl UriExpander for MemoryStore {
	fn expand(&self, uri: &str) -> Vec<String> {
		documents::expand_uri(&self.session(), uri)
	}
}

pub type FilterFactory = Arc<dyn Fn(&RequestContext) -> Arc<dyn Filter> + Send + Sync>;
pub type MatcherFactory = Arc<dyn Fn(&RequestContext) -> Arc<dyn Matcher> + Send + Sync>;

/// Filters and matchers contributed by code outside this crate.
///
/// Factories run once per default builder, after the built-in components, in registration order.
#[derive(Clone, Default)]
pub struct SearchExtensions {
	filters: Vec<FilterFactory>,
	matchers: Vec<MatcherFactory>,
}
impl SearchExtensions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register_filter<F>(&mut self, factory: F)
	where
		F: Fn(&RequestContext) -> Arc<dyn Filter> + Send + Sync + 'static,
	{
		self.filters.push(Arc::new(factory));
	}

	pub fn register_matcher<F>(&mut self, factory: F)
	where
		F: Fn(&RequestContext) -> Arc<dyn Matcher> + Send + Sync + 'static,
	{
		self.matchers.push(Arc::new(factory));
	}
}

#[derive(Clone)]
pub struct Builder {
	limits: SearchLimits,
	filters: Vec<Arc<dyn Filter>>,
	matchers: Vec<Arc<dyn Matcher>>,
	aggregations: Vec<Arc<dyn Aggregation>>,
}
impl Builder {
	pub fn new(limits: SearchLimits) -> Self {
		Self { limits, filters: Vec::new(), matchers: Vec::new(), aggregations: Vec::new() }
	}

	pub fn append_filter(&mut self, filter: Arc<dyn Filter>) {
		self.filters.push(filter);
	}

	pub fn append_matcher(&mut self, matcher: Arc<dyn Matcher>) {
		self.matchers.push(matcher);
	}

	pub fn append_aggregation(&mut self, aggregation: Arc<dyn Aggregation>) {
		self.aggregations.push(aggregation);
	}

	pub fn aggregations(&self) -> &[Arc<dyn Aggregation>] {
		&self.aggregations
	}

	pub fn build(&self, params: &SearchParams) -> Value {
		let mut params = params.clone();
		let from = extract_offset(&mut params);
		let size = extract_limit(&mut params, self.limits);
		let sort = extract_sort(&mut params);
		let filters: Vec<Value> =
			self.filters.iter().filter_map(|filter| filter.build(&mut params)).collect();
		let mut matchers: Vec<Value> =
			self.matchers.iter().filter_map(|matcher| matcher.build(&mut params)).collect();
		let aggs: Map<String, Value> = self
			.aggregations
			.iter()
			.map(|aggregation| (aggregation.key().to_string(), aggregation.request(&params)))
			.collect();

		for (key, value) in params.iter() {
			matchers.push(json!({ "match": { key: value } }));
		}

		let mut query = if matchers.is_empty() {
			json!({ "match_all": {} })
		} else {
			json!({ "bool": { "must": matchers } })
		};

		if !filters.is_empty() {
			query = json!({ "bool": { "filter": filters, "must": query } });
		}

		json!({
			"from": from,
			"size": size,
			"sort": sort,
			"query": query,
			"aggs": aggs,
		})
	}
}

/// The builder every search starts from: the built-in filters and matchers followed by whatever
/// `context.extensions` contributes.
pub fn default_querybuilder(context: &RequestContext, limits: SearchLimits) -> Builder {
	let mut builder = Builder::new(limits);

	builder.append_filter(Arc::new(AuthFilter::new(context.authenticated_userid.clone())));
	builder.append_filter(Arc::new(UriFilter::new(context.uri_expander.clone())));
	builder.append_filter(Arc::new(GroupFilter));
	builder.append_filter(Arc::new(UserFilter));
	builder.append_matcher(Arc::new(AnyMatcher));
	builder.append_matcher(Arc::new(TagsMatcher));

	for factory in &context.extensions.filters {
		builder.append_filter(factory(context));
	}
	for factory in &context.extensions.matchers {
		builder.append_matcher(factory(context));
	}

	builder
}

/// Shared annotations, plus the caller's own when authenticated.
#[derive(Clone, Debug)]
pub struct AuthFilter {
	userid: Option<String>,
}
impl AuthFilter {
	pub fn new(userid: Option<String>) -> Self {
		Self { userid }
	}
}
impl Filter for AuthFilter {
	fn build(&self, _params: &mut SearchParams) -> Option<Value> {
		let public = json!({ "term": { "shared": true } });
		let Some(userid) = &self.userid else {
			return Some(public);
		};

		Some(json!({
			"bool": {
				"should": [public, { "term": { "user_raw": userid } }],
				"minimum_should_match": 1,
			}
		}))
	}
}

/// Annotations on any URI equivalent to the `uri` and `url` parameters.
pub struct UriFilter {
	expander: Arc<dyn UriExpander>,
}
impl UriFilter {
	pub fn new(expander: Arc<dyn UriExpander>) -> Self {
		Self { expander }
	}
}
impl Filter for UriFilter {
	fn build(&self, params: &mut SearchParams) -> Option<Value> {
		let mut requested = params.pop_all("uri");

		requested.extend(params.pop_all("url"));

		if requested.is_empty() {
			return None;
		}

		let mut scopes: Vec<String> = Vec::new();

		for uri in requested {
			for expanded in self.expander.expand(&uri) {
				let normalized = gloss_domain::uri::normalize(&expanded);

				if !scopes.contains(&normalized) {
					scopes.push(normalized);
				}
			}
		}

		Some(json!({ "terms": { "target.scope": scopes } }))
	}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct GroupFilter;
impl Filter for GroupFilter {
	fn build(&self, params: &mut SearchParams) -> Option<Value> {
		let group = params.pop("group")?;

		Some(json!({ "term": { "group": group } }))
	}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct UserFilter;
impl Filter for UserFilter {
	fn build(&self, params: &mut SearchParams) -> Option<Value> {
		let users: Vec<String> =
			params.pop_all("user").into_iter().map(|user| user.to_lowercase()).collect();

		if users.is_empty() {
			return None;
		}

		Some(json!({ "terms": { "user": users } }))
	}
}

/// Only annotations that do not reply to anything.
#[derive(Clone, Copy, Debug, Default)]
pub struct TopLevelAnnotationsFilter;
impl Filter for TopLevelAnnotationsFilter {
	fn build(&self, _params: &mut SearchParams) -> Option<Value> {
		Some(json!({ "bool": { "must_not": { "exists": { "field": "references" } } } }))
	}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct AnyMatcher;
impl Matcher for AnyMatcher {
	fn build(&self, params: &mut SearchParams) -> Option<Value> {
		let terms = params.pop_all("any");

		if terms.is_empty() {
			return None;
		}

		Some(json!({
			"simple_query_string": {
				"fields": ANY_FIELDS,
				"query": terms.join(" "),
			}
		}))
	}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct TagsMatcher;
impl Matcher for TagsMatcher {
	fn build(&self, params: &mut SearchParams) -> Option<Value> {
		let mut tags: Vec<String> = Vec::new();

		for tag in params.pop_all("tag").into_iter().chain(params.pop_all("tags")) {
			if !tags.contains(&tag) {
				tags.push(tag);
			}
		}

		if tags.is_empty() {
			return None;
		}

		let clauses: Vec<Value> = tags
			.iter()
			.map(|tag| json!({ "match": { "tags": { "query": tag, "operator": "and" } } }))
			.collect();

		Some(json!({ "bool": { "must": clauses } }))
	}
}

/// Annotations replying to any of a fixed set of annotations.
#[derive(Clone, Debug)]
pub struct RepliesMatcher {
	ids: Vec<String>,
}
impl RepliesMatcher {
	pub fn new(ids: Vec<String>) -> Self {
		Self { ids }
	}
}
impl Matcher for RepliesMatcher {
	fn build(&self, _params: &mut SearchParams) -> Option<Value> {
		Some(json!({ "terms": { "references": self.ids } }))
	}
}

fn extract_offset(params: &mut SearchParams) -> u64 {
	params.pop("offset").and_then(|raw| raw.trim().parse::<u64>().ok()).unwrap_or(0)
}

fn extract_limit(params: &mut SearchParams, limits: SearchLimits) -> u64 {
	let limit = params
		.pop("limit")
		.and_then(|raw| raw.trim().parse::<u64>().ok())
		.unwrap_or(u64::from(limits.default_limit));

	limit.min(u64::from(limits.max_limit))
}

fn extract_sort(params: &mut SearchParams) -> Value {
	let field = params.pop("sort").unwrap_or_else(|| "updated".to_string());
	let order = params.pop("order").unwrap_or_else(|| "desc".to_string());

	json!([{ field: { "ignore_unmapped": true, "order": order } }])
}
