use std::{collections::BTreeMap, sync::Arc};

use serde::Serialize;
use serde_json::Value;

use crate::{Error, Result, search::params::SearchParams};

pub const TAGS: &str = "tags";
pub const USERS: &str = "users";

/// A named aggregation: the request fragment sent to the backend and the parser for its payload.
pub trait Aggregation
where
	Self: Send + Sync,
{
	/// The key the request is sent under and the response is read back from.
	fn key(&self) -> &str;

	fn request(&self, params: &SearchParams) -> Value;

	fn parse_result(&self, raw: &Value) -> Value;
}

pub type AggregationFactory = Arc<dyn Fn(u32) -> Arc<dyn Aggregation> + Send + Sync>;

/// Most used tags across the matching annotations.
#[derive(Clone, Debug, Default)]
pub struct TagsAggregation {
	pub limit: u32,
}
impl Aggregation for TagsAggregation {
	fn key(&self) -> &str {
		TAGS
	}

	fn request(&self, _params: &SearchParams) -> Value {
		terms_request("tags_raw", self.limit)
	}

	fn parse_result(&self, raw: &Value) -> Value {
		let buckets: Vec<TagCount> = buckets(raw)
			.map(|(tag, count)| TagCount { tag: tag.to_string(), count })
			.collect();

		serde_json::to_value(buckets).unwrap_or(Value::Array(Vec::new()))
	}
}

/// Most active users across the matching annotations.
#[derive(Clone, Debug, Default)]
pub struct UsersAggregation {
	pub limit: u32,
}
impl Aggregation for UsersAggregation {
	fn key(&self) -> &str {
		USERS
	}

	fn request(&self, _params: &SearchParams) -> Value {
		terms_request("user_raw", self.limit)
	}

	fn parse_result(&self, raw: &Value) -> Value {
		let buckets: Vec<UserCount> = buckets(raw)
			.map(|(user, count)| UserCount { user: user.to_string(), count })
			.collect();

		serde_json::to_value(buckets).unwrap_or(Value::Array(Vec::new()))
	}
}

#[derive(Debug, Serialize)]
struct TagCount {
	tag: String,
	count: u64,
}

#[derive(Debug, Serialize)]
struct UserCount {
	user: String,
	count: u64,
}

/// Aggregations resolvable by name at runtime.
#[derive(Clone)]
pub struct AggregationRegistry {
	factories: BTreeMap<String, AggregationFactory>,
}
impl AggregationRegistry {
	pub fn empty() -> Self {
		Self { factories: BTreeMap::new() }
	}

	pub fn with_builtins() -> Self {
		let mut registry = Self::empty();

		registry.register(TAGS, |limit| Arc::new(TagsAggregation { limit }));
		registry.register(USERS, |limit| Arc::new(UsersAggregation { limit }));

		registry
	}

	/// Registers `factory` under `name`, replacing any previous registration.
	pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
	where
		F: Fn(u32) -> Arc<dyn Aggregation> + Send + Sync + 'static,
	{
		self.factories.insert(name.into(), Arc::new(factory));
	}

	pub fn create(&self, name: &str, limit: u32) -> Result<Arc<dyn Aggregation>> {
		let factory = self.factories.get(name).ok_or_else(|| Error::InvalidRequest {
			message: format!("Unknown aggregation {name:?}."),
		})?;

		Ok(factory(limit))
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.factories.keys().map(String::as_str)
	}
}
impl Default for AggregationRegistry {
	fn default() -> Self {
		Self::with_builtins()
	}
}

fn terms_request(field: &str, limit: u32) -> Value {
	if limit == 0 {
		return serde_json::json!({ "terms": { "field": field } });
	}

	serde_json::json!({ "terms": { "field": field, "size": limit } })
}

fn buckets(raw: &Value) -> impl Iterator<Item = (&str, u64)> {
	raw.get("buckets").and_then(Value::as_array).into_iter().flatten().filter_map(|bucket| {
		let key = bucket.get("key")?.as_str()?;
		let count = bucket.get("doc_count")?.as_u64()?;

		Some((key, count))
	})
}
