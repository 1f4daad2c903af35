use gloss_domain::claim::{MetaClaim, UriClaim};
use gloss_storage::{
	documents::{
		create_or_update_document_meta, create_or_update_document_uri, find_or_create_by_uris,
		merge_documents,
	},
	memory::MemoryStore,
	session::{DOCUMENT_URI_UNIQUE, FlushError, Session},
};
use gloss_testkit::{now, yesterday};

#[test]
fn flush_does_not_publish_and_commit_does() {
	let store = MemoryStore::new();
	let mut session = store.session();
	let found = find_or_create_by_uris(&mut session, "http://example.com", &[], now(), now())
		.expect("Failed to create document.");

	assert!(session.has_changes());
	assert!(store.session().document_ids().is_empty());

	session.commit().expect("Failed to commit.");

	assert_eq!(store.session().document_ids(), found);
}

#[test]
fn rollback_discards_changes() {
	let store = MemoryStore::new();
	let mut session = store.session();

	find_or_create_by_uris(&mut session, "http://example.com", &[], now(), now())
		.expect("Failed to create document.");
	session.rollback();

	assert!(store.session().document_ids().is_empty());
}

#[test]
fn concurrent_claims_on_the_same_uri_conflict_at_commit() {
	let store = MemoryStore::new();
	let mut first = store.session();
	let mut second = store.session();

	find_or_create_by_uris(&mut first, "http://example.com", &[], now(), now())
		.expect("Failed to create document in first session.");
	find_or_create_by_uris(&mut second, "http://example.com", &[], now(), now())
		.expect("Failed to create document in second session.");
	first.commit().expect("Failed to commit first session.");

	let err = second.commit().expect_err("Expected the second commit to conflict.");

	assert!(matches!(
		err,
		FlushError::UniqueViolation { constraint: DOCUMENT_URI_UNIQUE, .. }
	));
	assert_eq!(store.session().document_ids().len(), 1);
}

#[test]
fn a_late_flush_reports_the_conflict_as_retryable() {
	let store = MemoryStore::new();
	let mut first = store.session();
	let mut second = store.session();

	find_or_create_by_uris(&mut first, "http://example.com", &[], now(), now())
		.expect("Failed to create document in first session.");
	first.commit().expect("Failed to commit first session.");

	let err = find_or_create_by_uris(&mut second, "http://example.com", &[], now(), now())
		.expect_err("Expected a conflict on flush.");

	assert!(err.is_retryable());
}

#[test]
fn updating_a_concurrently_deleted_row_is_stale() {
	let store = MemoryStore::new();
	let mut setup = store.session();
	let document = find_or_create_by_uris(&mut setup, "http://example.com", &[], now(), now())
		.expect("Failed to create document.")[0];

	setup.commit().expect("Failed to commit setup.");

	let mut deleter = store.session();
	let mut writer = store.session();

	deleter.delete_document(document);
	deleter.commit().expect("Failed to commit delete.");

	if let Some(row) = writer.document_mut(document) {
		row.updated = yesterday();
	}

	assert!(matches!(writer.commit(), Err(FlushError::StaleRow { .. })));
}

#[test]
fn claiming_a_uri_on_a_concurrently_deleted_document_breaks_the_foreign_key() {
	let store = MemoryStore::new();
	let mut setup = store.session();
	let document = find_or_create_by_uris(&mut setup, "http://example.com", &[], now(), now())
		.expect("Failed to create document.")[0];

	setup.commit().expect("Failed to commit setup.");

	let mut deleter = store.session();
	let mut writer = store.session();

	create_or_update_document_uri(
		&mut writer,
		&UriClaim::new("http://example.com", "http://example.org"),
		document,
		now(),
		now(),
	)
	.expect("Failed to claim URI.");
	deleter.delete_document(document);
	deleter.commit().expect("Failed to commit delete.");

	assert!(matches!(writer.commit(), Err(FlushError::ForeignKeyViolation { .. })));
	assert!(store.session().document_ids().is_empty());
}

#[test]
fn a_stale_update_cannot_revert_a_committed_title() {
	let store = MemoryStore::new();
	let mut setup = store.session();
	let document = find_or_create_by_uris(&mut setup, "http://example.com", &[], now(), now())
		.expect("Failed to create document.")[0];

	setup.commit().expect("Failed to commit setup.");

	let mut stale = store.session();
	let mut titler = store.session();

	create_or_update_document_meta(
		&mut titler,
		&MetaClaim::new("http://example.com", "title", ["Winner"]),
		document,
		now(),
		now(),
	)
	.expect("Failed to claim title.");
	titler.commit().expect("Failed to commit title.");

	if let Some(row) = stale.document_mut(document) {
		row.updated = yesterday();
	}

	assert!(matches!(stale.flush(), Err(FlushError::StaleRow { .. })));
	assert!(matches!(stale.commit(), Err(FlushError::StaleRow { .. })));

	let session = store.session();
	let row = session.document(document).expect("Missing document.");

	assert_eq!(row.title.as_deref(), Some("Winner"));
}

#[test]
fn sequential_updates_of_the_same_row_both_commit() {
	let store = MemoryStore::new();
	let mut setup = store.session();
	let document = find_or_create_by_uris(&mut setup, "http://example.com", &[], now(), now())
		.expect("Failed to create document.")[0];

	setup.commit().expect("Failed to commit setup.");

	for title in ["First", "Second"] {
		let mut session = store.session();

		if let Some(row) = session.document_mut(document) {
			row.title = Some(title.to_string());
		}

		session.commit().expect("Failed to commit update.");
	}

	let session = store.session();

	assert_eq!(
		session.document(document).and_then(|row| row.title.clone()).as_deref(),
		Some("Second")
	);
}

#[test]
fn merging_a_concurrently_updated_duplicate_is_stale() {
	let store = MemoryStore::new();
	let mut setup = store.session();
	let master = find_or_create_by_uris(&mut setup, "http://example.com/a", &[], now(), now())
		.expect("Failed to create master.")[0];
	let duplicate = find_or_create_by_uris(&mut setup, "http://example.com/b", &[], now(), now())
		.expect("Failed to create duplicate.")[0];

	setup.commit().expect("Failed to commit setup.");

	let mut merger = store.session();
	let mut writer = store.session();

	if let Some(row) = writer.document_mut(duplicate) {
		row.title = Some("Late title".to_string());
	}

	writer.commit().expect("Failed to commit writer.");

	let err = merge_documents(&mut merger, &[master, duplicate], Some(now()))
		.expect_err("Expected the merge to conflict.");

	assert!(err.is_retryable());
	assert_eq!(store.session().document_ids(), vec![master, duplicate]);
}
