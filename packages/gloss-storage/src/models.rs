use std::fmt::{Display, Formatter};

use time::OffsetDateTime;

use gloss_domain::claim::UriClaimKey;

macro_rules! row_id {
	($name:ident) => {
		#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
		pub struct $name(pub u64);
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
				write!(f, "{}", self.0)
			}
		}
	};
}

row_id!(DocumentId);
row_id!(DocumentUriId);
row_id!(DocumentMetaId);

/// A logical web resource. URIs and metadata claims point back at it by id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Document {
	pub id: DocumentId,
	/// First http(s) URI claimed for the document.
	pub web_uri: Option<String>,
	/// First title claimed for the document.
	pub title: Option<String>,
	pub created: OffsetDateTime,
	pub updated: OffsetDateTime,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentUri {
	pub id: DocumentUriId,
	pub claimant: String,
	pub uri: String,
	pub uri_type: String,
	pub content_type: String,
	pub document: DocumentId,
	pub created: OffsetDateTime,
	pub updated: OffsetDateTime,
}
impl DocumentUri {
	pub fn key(&self) -> UriClaimKey {
		UriClaimKey {
			claimant: self.claimant.clone(),
			uri: self.uri.clone(),
			uri_type: self.uri_type.clone(),
			content_type: self.content_type.clone(),
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentMeta {
	pub id: DocumentMetaId,
	pub claimant: String,
	pub meta_type: String,
	pub value: Vec<String>,
	pub document: DocumentId,
	pub created: OffsetDateTime,
	pub updated: OffsetDateTime,
}

#[derive(Clone, Debug)]
pub struct NewDocument {
	pub web_uri: Option<String>,
	pub title: Option<String>,
	pub created: OffsetDateTime,
	pub updated: OffsetDateTime,
}

#[derive(Clone, Debug)]
pub struct NewDocumentUri {
	pub key: UriClaimKey,
	pub document: DocumentId,
	pub created: OffsetDateTime,
	pub updated: OffsetDateTime,
}

#[derive(Clone, Debug)]
pub struct NewDocumentMeta {
	pub claimant: String,
	pub meta_type: String,
	pub value: Vec<String>,
	pub document: DocumentId,
	pub created: OffsetDateTime,
	pub updated: OffsetDateTime,
}
