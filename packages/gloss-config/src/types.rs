use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	#[serde(default)]
	pub storage: Storage,
	pub search: Search,
	#[serde(default)]
	pub auth: Auth,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Storage {
	/// Attempts made by the transaction runner before a conflict is reported as a transient
	/// failure.
	pub retry_attempts: u32,
}
impl Default for Storage {
	fn default() -> Self {
		Self { retry_attempts: 3 }
	}
}

#[derive(Debug, Deserialize)]
pub struct Search {
	pub backend: SearchBackend,
	#[serde(default = "default_limit")]
	pub default_limit: u32,
	#[serde(default = "max_limit")]
	pub max_limit: u32,
	/// Page size of the reply search. Replies beyond it are dropped with a warning.
	#[serde(default = "reply_limit")]
	pub reply_limit: u32,
	/// Bucket count requested by the built-in aggregations. Zero leaves it to the backend.
	#[serde(default)]
	pub aggregation_limit: u32,
}
impl Search {
	pub fn limits(&self) -> SearchLimits {
		SearchLimits {
			default_limit: self.default_limit,
			max_limit: self.max_limit,
			reply_limit: self.reply_limit,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
	pub default_limit: u32,
	pub max_limit: u32,
	pub reply_limit: u32,
}
impl Default for SearchLimits {
	fn default() -> Self {
		Self { default_limit: default_limit(), max_limit: max_limit(), reply_limit: reply_limit() }
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchBackend {
	pub url: String,
	pub index: String,
	#[serde(default = "default_doc_type")]
	pub doc_type: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Auth {
	/// Authority for local accounts. Callers fall back to the request host when unset.
	pub auth_domain: Option<String>,
	/// Trust the `X-Forwarded-User` header set by a reverse proxy.
	pub proxy_auth: bool,
}
impl Auth {
	pub fn auth_domain_or<'a>(&'a self, request_domain: &'a str) -> &'a str {
		self.auth_domain.as_deref().unwrap_or(request_domain)
	}
}

fn default_limit() -> u32 {
	20
}

fn max_limit() -> u32 {
	200
}

fn reply_limit() -> u32 {
	200
}

fn default_doc_type() -> String {
	"annotation".to_string()
}
