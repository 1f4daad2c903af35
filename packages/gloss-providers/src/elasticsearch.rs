use std::time::Duration;

use reqwest::{Client, header::HeaderMap};
use serde::Serialize;
use serde_json::Value;

use crate::{Error, Result};

/// One search call against an index.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BackendRequest {
	pub index: String,
	pub doc_type: String,
	pub body: Value,
	/// Whether hits should carry their stored source documents.
	pub source: bool,
}

pub struct ElasticsearchClient {
	client: Client,
	base_url: String,
	headers: HeaderMap,
}
impl ElasticsearchClient {
	pub fn new(cfg: &gloss_config::SearchBackend) -> Result<Self> {
		let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
		let headers = crate::default_headers(&cfg.default_headers)?;

		Ok(Self { client, base_url: cfg.url.trim_end_matches('/').to_string(), headers })
	}

	pub async fn search(&self, request: &BackendRequest) -> Result<Value> {
		let res = self
			.client
			.post(search_url(&self.base_url, request))
			.headers(self.headers.clone())
			.json(&request.body)
			.send()
			.await?;
		let json: Value = res.error_for_status()?.json().await?;

		if !json.is_object() {
			return Err(Error::InvalidResponse {
				message: "Search response is not a JSON object.".to_string(),
			});
		}

		Ok(json)
	}
}

pub fn search_url(base_url: &str, request: &BackendRequest) -> String {
	let mut url = format!("{base_url}/{}/{}/_search", request.index, request.doc_type);

	if !request.source {
		url.push_str("?_source=false");
	}

	url
}

#[cfg(test)]
mod tests {
	use super::*;

	fn request(source: bool) -> BackendRequest {
		BackendRequest {
			index: "annotator".to_string(),
			doc_type: "annotation".to_string(),
			body: serde_json::json!({ "query": { "match_all": {} } }),
			source,
		}
	}

	#[test]
	fn suppresses_source_in_url() {
		assert_eq!(
			search_url("http://localhost:9200", &request(false)),
			"http://localhost:9200/annotator/annotation/_search?_source=false"
		);
		assert_eq!(
			search_url("http://localhost:9200", &request(true)),
			"http://localhost:9200/annotator/annotation/_search"
		);
	}
}
