//! Document identity operations: lookup by URI, claim upserts, and duplicate merging.
//!
//! Every write path ends with a flush. Any constraint failure reported by the flush means a
//! concurrent transaction won a race; it is returned as [`Error::Retryable`] and never retried
//! here.

use std::collections::BTreeSet;

use time::OffsetDateTime;

use gloss_domain::{
	claim::{MetaClaim, REL_CANONICAL, SELF_CLAIM, UriClaim, UriClaimKey},
	denormalize::{self, fill_if_unset},
};

use crate::{
	Error, Result,
	models::{
		Document, DocumentId, DocumentMetaId, DocumentUriId, NewDocument, NewDocumentMeta,
		NewDocumentUri,
	},
	session::Session,
};

/// Documents owning a claim on any of a set of URIs.
///
/// The query is lazy: nothing is read until one of the fetch methods runs, and every call
/// re-executes against the session it is given.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentQuery {
	uris: BTreeSet<String>,
}
impl DocumentQuery {
	/// Matching document ids, oldest first.
	pub fn fetch<S>(&self, session: &S) -> Vec<DocumentId>
	where
		S: Session + ?Sized,
	{
		if self.uris.is_empty() {
			return Vec::new();
		}

		session.documents_by_uris(&self.uris)
	}

	pub fn count<S>(&self, session: &S) -> usize
	where
		S: Session + ?Sized,
	{
		self.fetch(session).len()
	}

	pub fn first<S>(&self, session: &S) -> Option<DocumentId>
	where
		S: Session + ?Sized,
	{
		self.fetch(session).into_iter().next()
	}

	/// The single matching document, if any. More than one match is an error.
	pub fn one_or_none<S>(&self, session: &S) -> Result<Option<DocumentId>>
	where
		S: Session + ?Sized,
	{
		match self.fetch(session).as_slice() {
			[] => Ok(None),
			[document] => Ok(Some(*document)),
			found => Err(Error::InvalidArgument(format!(
				"Expected at most one document, found {}.",
				found.len()
			))),
		}
	}
}

#[derive(Clone, Copy, Debug)]
enum DocumentField {
	WebUri,
	Title,
}
impl DocumentField {
	fn slot(self, document: &Document) -> &Option<String> {
		match self {
			Self::WebUri => &document.web_uri,
			Self::Title => &document.title,
		}
	}

	fn slot_mut(self, document: &mut Document) -> &mut Option<String> {
		match self {
			Self::WebUri => &mut document.web_uri,
			Self::Title => &mut document.title,
		}
	}
}

pub fn find_by_uris<I, U>(uris: I) -> DocumentQuery
where
	I: IntoIterator<Item = U>,
	U: Into<String>,
{
	DocumentQuery { uris: uris.into_iter().map(Into::into).collect() }
}

/// Returns the documents matching `target_uri` or any of `other_uris`, creating one when none
/// exist.
///
/// More than one id in the result means duplicate documents were detected; callers are expected
/// to merge them. A new document gets a single `self-claim` URI for `target_uri`.
pub fn find_or_create_by_uris<S>(
	session: &mut S,
	target_uri: &str,
	other_uris: &[String],
	created: OffsetDateTime,
	updated: OffsetDateTime,
) -> Result<Vec<DocumentId>>
where
	S: Session + ?Sized,
{
	let query =
		find_by_uris(std::iter::once(target_uri).chain(other_uris.iter().map(String::as_str)));
	let found = query.fetch(session);

	if !found.is_empty() {
		return Ok(found);
	}

	let document =
		session.add_document(NewDocument { web_uri: None, title: None, created, updated });

	session.add_document_uri(NewDocumentUri {
		key: UriClaimKey {
			claimant: target_uri.to_string(),
			uri: target_uri.to_string(),
			uri_type: SELF_CLAIM.to_string(),
			content_type: String::new(),
		},
		document,
		created,
		updated,
	});
	denormalize_field(
		session,
		document,
		DocumentField::WebUri,
		denormalize::web_uri_candidate(target_uri),
	)?;
	session.flush().map_err(Error::retryable("document creation"))?;

	tracing::debug!(document_id = %document, target_uri, "Created document.");

	Ok(query.fetch(session))
}

/// Records that `claim.claimant` asserts `document` is reachable at `claim.uri`.
///
/// An existing claim with the same key only has `updated` refreshed. Missing `type` and
/// `content_type` are stored as empty strings.
pub fn create_or_update_document_uri<S>(
	session: &mut S,
	claim: &UriClaim,
	document: DocumentId,
	created: OffsetDateTime,
	updated: OffsetDateTime,
) -> Result<DocumentUriId>
where
	S: Session + ?Sized,
{
	ensure_document(session, document)?;

	let key = claim.key();
	let existing = session.find_document_uri(&key).map(|row| (row.id, row.document));
	let id = match existing {
		Some((id, owner)) => {
			if owner != document {
				tracing::warn!(
					document_uri_id = %id,
					existing_document_id = %owner,
					document_id = %document,
					"DocumentURI is already owned by a different document."
				);
			}
			if let Some(row) = session.document_uri_mut(id) {
				row.updated = updated;
			}

			id
		},
		None => session.add_document_uri(NewDocumentUri { key, document, created, updated }),
	};

	denormalize_field(
		session,
		document,
		DocumentField::WebUri,
		denormalize::web_uri_candidate(&claim.uri),
	)?;
	session.flush().map_err(Error::retryable("document URI upsert"))?;

	Ok(id)
}

/// Records that `claim.claimant` asserts `document` carries the metadata in `claim`.
///
/// Claims are keyed by claimant and type only. An existing claim has its `value` and `updated`
/// overwritten while `created` and the owning document are kept.
pub fn create_or_update_document_meta<S>(
	session: &mut S,
	claim: &MetaClaim,
	document: DocumentId,
	created: OffsetDateTime,
	updated: OffsetDateTime,
) -> Result<DocumentMetaId>
where
	S: Session + ?Sized,
{
	ensure_document(session, document)?;

	let existing = session
		.find_document_meta(&claim.claimant, &claim.meta_type)
		.map(|row| (row.id, row.document));
	let id = match existing {
		Some((id, owner)) => {
			if owner != document {
				tracing::warn!(
					document_meta_id = %id,
					existing_document_id = %owner,
					document_id = %document,
					"DocumentMeta is already owned by a different document."
				);
			}
			if let Some(row) = session.document_meta_mut(id) {
				row.value = claim.value.clone();
				row.updated = updated;
			}

			id
		},
		None => session.add_document_meta(NewDocumentMeta {
			claimant: claim.claimant.clone(),
			meta_type: claim.meta_type.clone(),
			value: claim.value.clone(),
			document,
			created,
			updated,
		}),
	};

	denormalize_field(
		session,
		document,
		DocumentField::Title,
		denormalize::title_candidate(&claim.meta_type, &claim.value),
	)?;
	session.flush().map_err(Error::retryable("document meta upsert"))?;

	Ok(id)
}

/// Folds every document in `documents` into the first one and returns it.
///
/// Claims owned by the later documents are moved to the first, the later documents are deleted,
/// and any denormalized field the survivor lacks is taken from them in input order.
pub fn merge_documents<S>(
	session: &mut S,
	documents: &[DocumentId],
	updated: Option<OffsetDateTime>,
) -> Result<DocumentId>
where
	S: Session + ?Sized,
{
	let Some((&master, duplicates)) = documents.split_first() else {
		return Err(Error::InvalidArgument("merge_documents requires at least one document.".into()));
	};

	ensure_document(session, master)?;

	let mut merged = BTreeSet::new();

	for &duplicate in duplicates {
		if duplicate == master || !merged.insert(duplicate) {
			continue;
		}

		let (web_uri, title) = match session.document(duplicate) {
			Some(document) => (document.web_uri.clone(), document.title.clone()),
			None => return Err(Error::NotFound(format!("Document {duplicate}."))),
		};
		let uris: Vec<DocumentUriId> =
			session.document_uris(duplicate).iter().map(|row| row.id).collect();
		let metas: Vec<DocumentMetaId> =
			session.document_metas(duplicate).iter().map(|row| row.id).collect();

		for id in uris {
			if let Some(row) = session.document_uri_mut(id) {
				row.document = master;
			}
		}
		for id in metas {
			if let Some(row) = session.document_meta_mut(id) {
				row.document = master;
			}
		}

		denormalize_field(session, master, DocumentField::WebUri, web_uri.as_deref())?;
		denormalize_field(session, master, DocumentField::Title, title.as_deref())?;
		session.delete_document(duplicate);
	}

	if let Some(updated) = updated
		&& let Some(document) = session.document_mut(master)
	{
		document.updated = updated;
	}

	session.flush().map_err(Error::retryable("document merge"))?;

	tracing::info!(
		document_id = %master,
		merged = merged.len(),
		"Merged duplicate documents."
	);

	Ok(master)
}

/// URIs a search for `uri` should cover.
///
/// A URI nobody has claimed, or one claimed as a canonical link, stands for itself. Otherwise the
/// search covers every URI of the owning document.
pub fn expand_uri<S>(session: &S, uri: &str) -> Vec<String>
where
	S: Session + ?Sized,
{
	let documents = find_by_uris([uri]).fetch(session);

	if documents.is_empty() {
		return vec![uri.to_string()];
	}

	let mut expanded = Vec::new();

	for document in documents {
		for row in session.document_uris(document) {
			if row.uri == uri && row.uri_type == REL_CANONICAL {
				return vec![uri.to_string()];
			}
			if !expanded.contains(&row.uri) {
				expanded.push(row.uri.clone());
			}
		}
	}

	expanded
}

fn ensure_document<S>(session: &S, document: DocumentId) -> Result<()>
where
	S: Session + ?Sized,
{
	match session.document(document) {
		Some(_) => Ok(()),
		None => Err(Error::NotFound(format!("Document {document}."))),
	}
}

fn denormalize_field<S>(
	session: &mut S,
	document: DocumentId,
	field: DocumentField,
	candidate: Option<&str>,
) -> Result<bool>
where
	S: Session + ?Sized,
{
	let Some(candidate) = candidate else {
		return Ok(false);
	};
	let Some(current) = session.document(document) else {
		return Err(Error::NotFound(format!("Document {document}.")));
	};
	let mut slot = field.slot(current).clone();

	if !fill_if_unset(&mut slot, candidate) {
		return Ok(false);
	}
	if let Some(row) = session.document_mut(document) {
		*field.slot_mut(row) = slot;
	}

	Ok(true)
}
