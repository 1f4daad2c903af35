//! The unit of work the document store runs against.
//!
//! A [`Session`] exposes row-level reads and writes over documents and their claims. Writes are
//! staged until [`Session::flush`], which checks every table constraint and reports violations as
//! a [`FlushError`]. The store operations in [`crate::documents`] translate any flush failure into
//! [`crate::Error::Retryable`].

use std::collections::BTreeSet;

use gloss_domain::claim::UriClaimKey;

use crate::models::{
	Document, DocumentId, DocumentMeta, DocumentMetaId, DocumentUri, DocumentUriId, NewDocument,
	NewDocumentMeta, NewDocumentUri,
};

pub const DOCUMENT_URI_UNIQUE: &str = "uq__document_uri__claimant_uri_type_content_type";
pub const DOCUMENT_META_UNIQUE: &str = "uq__document_meta__claimant_type";

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum FlushError {
	#[error("Unique constraint {constraint} violated: {detail}.")]
	UniqueViolation { constraint: &'static str, detail: String },
	#[error("{row} references missing document {document}.")]
	ForeignKeyViolation { row: String, document: DocumentId },
	#[error("{row} was changed or removed by a concurrent transaction.")]
	StaleRow { row: String },
}

pub trait Session {
	fn document(&self, id: DocumentId) -> Option<&Document>;

	/// Mutable access marks the row as changed.
	fn document_mut(&mut self, id: DocumentId) -> Option<&mut Document>;

	/// All live document ids in ascending order.
	fn document_ids(&self) -> Vec<DocumentId>;

	/// Distinct ids of documents owning a URI claim whose `uri` is in `uris`, ascending.
	fn documents_by_uris(&self, uris: &BTreeSet<String>) -> Vec<DocumentId>;

	/// URI claims owned by `document`, in insertion order.
	fn document_uris(&self, document: DocumentId) -> Vec<&DocumentUri>;

	/// Metadata claims owned by `document`, in insertion order.
	fn document_metas(&self, document: DocumentId) -> Vec<&DocumentMeta>;

	fn document_uri(&self, id: DocumentUriId) -> Option<&DocumentUri>;

	fn document_uri_mut(&mut self, id: DocumentUriId) -> Option<&mut DocumentUri>;

	fn find_document_uri(&self, key: &UriClaimKey) -> Option<&DocumentUri>;

	fn document_meta(&self, id: DocumentMetaId) -> Option<&DocumentMeta>;

	fn document_meta_mut(&mut self, id: DocumentMetaId) -> Option<&mut DocumentMeta>;

	fn find_document_meta(&self, claimant: &str, meta_type: &str) -> Option<&DocumentMeta>;

	fn add_document(&mut self, document: NewDocument) -> DocumentId;

	fn add_document_uri(&mut self, uri: NewDocumentUri) -> DocumentUriId;

	fn add_document_meta(&mut self, meta: NewDocumentMeta) -> DocumentMetaId;

	/// Deletes the document together with every claim it still owns.
	fn delete_document(&mut self, id: DocumentId);

	fn flush(&mut self) -> Result<(), FlushError>;
}
