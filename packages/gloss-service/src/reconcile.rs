use time::OffsetDateTime;

use gloss_domain::claim::{MetaClaim, UriClaim};
use gloss_storage::{
	documents::{
		create_or_update_document_meta, create_or_update_document_uri, find_or_create_by_uris,
		merge_documents,
	},
	models::DocumentId,
	session::Session,
};

use crate::{Error, Result};

/// The parts of an annotation that decide which document it belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotationRef {
	pub id: String,
	pub target_uri: String,
	pub created: OffsetDateTime,
	pub updated: OffsetDateTime,
}

/// Attaches the document claims carried by `annotation` to its document and returns that
/// document.
///
/// Documents already known under any of the claimed URIs are merged first, so the claims always
/// land on a single survivor. Claims are stamped with the annotation's timestamps.
pub fn update_document_metadata<S>(
	session: &mut S,
	annotation: &AnnotationRef,
	meta_claims: &[MetaClaim],
	uri_claims: &[UriClaim],
) -> Result<DocumentId>
where
	S: Session + ?Sized,
{
	let other_uris: Vec<String> = uri_claims.iter().map(|claim| claim.uri.clone()).collect();
	let candidates = find_or_create_by_uris(
		session,
		&annotation.target_uri,
		&other_uris,
		annotation.created,
		annotation.updated,
	)?;
	let document = match candidates.as_slice() {
		[] => {
			return Err(Error::NotFound {
				message: format!("No document for annotation {}.", annotation.id),
			});
		},
		[document] => *document,
		_ => {
			tracing::info!(
				annotation_id = %annotation.id,
				documents = candidates.len(),
				"Annotation claims span duplicate documents."
			);

			merge_documents(session, &candidates, Some(annotation.updated))?
		},
	};

	if let Some(row) = session.document_mut(document) {
		row.updated = annotation.updated;
	}

	for claim in meta_claims {
		create_or_update_document_meta(
			session,
			claim,
			document,
			annotation.created,
			annotation.updated,
		)?;
	}
	for claim in uri_claims {
		create_or_update_document_uri(
			session,
			claim,
			document,
			annotation.created,
			annotation.updated,
		)?;
	}

	Ok(document)
}
