use serde_json::{Map, Value};

use gloss_providers::{Error, elasticsearch::ElasticsearchClient};

fn backend(default_headers: Map<String, Value>) -> gloss_config::SearchBackend {
	gloss_config::SearchBackend {
		url: "http://localhost:9200/".to_string(),
		index: "annotator".to_string(),
		doc_type: "annotation".to_string(),
		timeout_ms: 1_000,
		default_headers,
	}
}

#[test]
fn builds_default_headers() {
	let mut raw = Map::new();

	raw.insert("X-Request-Source".to_string(), Value::String("gloss".to_string()));

	let headers = gloss_providers::default_headers(&raw).expect("Failed to build headers.");

	assert_eq!(headers.get("x-request-source").expect("Missing header."), "gloss");
}

#[test]
fn rejects_non_string_header_values() {
	let mut raw = Map::new();

	raw.insert("X-Retries".to_string(), Value::from(3));

	let err = gloss_providers::default_headers(&raw).expect_err("Expected invalid header.");

	assert!(matches!(err, Error::InvalidConfig { .. }));
}

#[test]
fn rejects_invalid_header_names() {
	let mut raw = Map::new();

	raw.insert("bad header".to_string(), Value::String("x".to_string()));

	assert!(matches!(
		gloss_providers::default_headers(&raw),
		Err(Error::InvalidHeaderName(_))
	));
}

#[test]
fn builds_client_from_config() {
	ElasticsearchClient::new(&backend(Map::new())).expect("Failed to build client.");
}
