use serde::{Deserialize, Serialize};

/// The URI is the page's own address, asserted by the page itself.
pub const SELF_CLAIM: &str = "self-claim";
/// The URI came from a `rel=canonical` link hint.
pub const REL_CANONICAL: &str = "rel-canonical";
/// Metadata type whose first value is denormalized onto the document title.
pub const TITLE: &str = "title";

/// An observed assertion that a document is reachable at `uri`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UriClaim {
	pub claimant: String,
	pub uri: String,
	#[serde(default, rename = "type")]
	pub uri_type: Option<String>,
	#[serde(default)]
	pub content_type: Option<String>,
}
impl UriClaim {
	pub fn new(claimant: impl Into<String>, uri: impl Into<String>) -> Self {
		Self { claimant: claimant.into(), uri: uri.into(), uri_type: None, content_type: None }
	}

	pub fn with_type(mut self, uri_type: impl Into<String>) -> Self {
		self.uri_type = Some(uri_type.into());

		self
	}

	pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
		self.content_type = Some(content_type.into());

		self
	}

	/// The uniqueness key of the claim with absent parts stored as empty strings.
	pub fn key(&self) -> UriClaimKey {
		UriClaimKey {
			claimant: self.claimant.clone(),
			uri: self.uri.clone(),
			uri_type: self.uri_type.clone().unwrap_or_default(),
			content_type: self.content_type.clone().unwrap_or_default(),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct UriClaimKey {
	pub claimant: String,
	pub uri: String,
	pub uri_type: String,
	pub content_type: String,
}

/// An observed assertion that a document carries metadata `meta_type` with `value`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaClaim {
	pub claimant: String,
	#[serde(rename = "type")]
	pub meta_type: String,
	pub value: Vec<String>,
}
impl MetaClaim {
	pub fn new(
		claimant: impl Into<String>,
		meta_type: impl Into<String>,
		value: impl IntoIterator<Item = impl Into<String>>,
	) -> Self {
		Self {
			claimant: claimant.into(),
			meta_type: meta_type.into(),
			value: value.into_iter().map(Into::into).collect(),
		}
	}
}
