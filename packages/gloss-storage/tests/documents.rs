use gloss_domain::claim::{MetaClaim, REL_CANONICAL, SELF_CLAIM, UriClaim};
use gloss_storage::{
	Error,
	documents::{
		create_or_update_document_meta, create_or_update_document_uri, expand_uri, find_by_uris,
		find_or_create_by_uris, merge_documents,
	},
	memory::{MemorySession, MemoryStore},
	models::{DocumentId, NewDocument},
	session::Session,
};
use gloss_testkit::{CapturedLogs, ConflictOnFlush, now, yesterday};

fn create_document(session: &mut MemorySession, uri: &str) -> DocumentId {
	let found = find_or_create_by_uris(session, uri, &[], yesterday(), yesterday())
		.expect("Failed to create document.");

	assert_eq!(found.len(), 1);

	found[0]
}

fn claim_uri(session: &mut MemorySession, document: DocumentId, claimant: &str, uri: &str) {
	create_or_update_document_uri(
		session,
		&UriClaim::new(claimant, uri),
		document,
		yesterday(),
		yesterday(),
	)
	.expect("Failed to claim URI.");
}

#[test]
fn find_by_uris_matches_any_claimed_uri() {
	let store = MemoryStore::new();
	let mut session = store.session();
	let first = create_document(&mut session, "http://example.com/a");
	let second = create_document(&mut session, "http://example.com/b");

	create_document(&mut session, "http://example.com/c");

	let query = find_by_uris(["http://example.com/b", "http://example.com/a", "urn:x-unknown"]);

	assert_eq!(query.fetch(&session), vec![first, second]);
	assert_eq!(query.count(&session), 2);
	assert_eq!(query.first(&session), Some(first));
	assert!(matches!(query.one_or_none(&session), Err(Error::InvalidArgument(_))));
	assert_eq!(
		find_by_uris(["http://example.com/b"]).one_or_none(&session).ok(),
		Some(Some(second))
	);
	assert_eq!(find_by_uris(["urn:x-unknown"]).one_or_none(&session).ok(), Some(None));
	assert!(find_by_uris(Vec::<String>::new()).fetch(&session).is_empty());
}

#[test]
fn find_or_create_creates_one_document_with_a_self_claim() {
	let store = MemoryStore::new();
	let mut session = store.session();
	let created = yesterday();
	let updated = now();
	let found = find_or_create_by_uris(
		&mut session,
		"https://example.com/article",
		&["urn:doi:10.1000/182".to_string()],
		created,
		updated,
	)
	.expect("Failed to find or create document.");

	assert_eq!(found.len(), 1);
	assert_eq!(session.document_ids(), found);

	let document = session.document(found[0]).expect("Missing document.");

	assert_eq!(document.created, created);
	assert_eq!(document.updated, updated);
	assert_eq!(document.web_uri.as_deref(), Some("https://example.com/article"));

	let uris = session.document_uris(found[0]);

	assert_eq!(uris.len(), 1);
	assert_eq!(uris[0].uri, "https://example.com/article");
	assert_eq!(uris[0].claimant, "https://example.com/article");
	assert_eq!(uris[0].uri_type, SELF_CLAIM);
	assert_eq!(uris[0].content_type, "");

	let again = find_or_create_by_uris(
		&mut session,
		"urn:doi:10.1000/182",
		&["https://example.com/article".to_string()],
		now(),
		now(),
	)
	.expect("Failed to find document.");

	assert_eq!(again, found);
	assert_eq!(session.document_ids().len(), 1);
}

#[test]
fn repeated_uri_claims_refresh_updated_only() {
	let store = MemoryStore::new();
	let mut session = store.session();
	let document = create_document(&mut session, "http://example.com");
	let claim = UriClaim::new("http://example.com", "http://example.org").with_type("rel-alternate");
	let created = yesterday();
	let first = create_or_update_document_uri(&mut session, &claim, document, created, created)
		.expect("Failed to create document URI.");
	let later = now();
	let second = create_or_update_document_uri(&mut session, &claim, document, later, later)
		.expect("Failed to update document URI.");

	assert_eq!(first, second);
	assert_eq!(session.document_uris(document).len(), 2);

	let row = session.document_uri(first).expect("Missing document URI.");

	assert_eq!(row.created, created);
	assert_eq!(row.updated, later);
	assert_eq!(row.uri_type, "rel-alternate");
	assert_eq!(row.content_type, "");
}

#[test]
fn uri_claims_differing_only_in_content_type_are_distinct() {
	let store = MemoryStore::new();
	let mut session = store.session();
	let document = create_document(&mut session, "http://example.com/paper");
	let html = UriClaim::new("http://example.com/paper", "http://example.com/paper.pdf");
	let pdf = html.clone().with_content_type("application/pdf");
	let first = create_or_update_document_uri(&mut session, &html, document, now(), now())
		.expect("Failed to create document URI.");
	let second = create_or_update_document_uri(&mut session, &pdf, document, now(), now())
		.expect("Failed to create document URI.");

	assert_ne!(first, second);
	assert_eq!(session.document_uris(document).len(), 3);
}

#[test]
fn repeated_meta_claims_keep_created_and_owner() {
	let store = MemoryStore::new();
	let mut session = store.session();
	let owner = create_document(&mut session, "http://example.com/one");
	let other = create_document(&mut session, "http://example.com/two");
	let created = yesterday();
	let first = create_or_update_document_meta(
		&mut session,
		&MetaClaim::new("http://example.com/one", "og.description", ["first"]),
		owner,
		created,
		created,
	)
	.expect("Failed to create document meta.");
	let later = now();
	let second = create_or_update_document_meta(
		&mut session,
		&MetaClaim::new("http://example.com/one", "og.description", ["second"]),
		other,
		later,
		later,
	)
	.expect("Failed to update document meta.");

	assert_eq!(first, second);

	let row = session.document_meta(first).expect("Missing document meta.");

	assert_eq!(row.value, vec!["second".to_string()]);
	assert_eq!(row.created, created);
	assert_eq!(row.updated, later);
	assert_eq!(row.document, owner);
	assert!(session.document_metas(other).is_empty());
}

#[test]
fn web_uri_is_taken_from_the_first_http_claim() {
	let store = MemoryStore::new();
	let mut session = store.session();
	let document = create_document(&mut session, "urn:x-pdf:0c3a1b");

	assert_eq!(session.document(document).and_then(|doc| doc.web_uri.clone()), None);

	claim_uri(&mut session, document, "urn:x-pdf:0c3a1b", "file:///tmp/paper.pdf");
	claim_uri(&mut session, document, "urn:x-pdf:0c3a1b", "https://example.com/paper.pdf");
	claim_uri(&mut session, document, "urn:x-pdf:0c3a1b", "https://mirror.example.com/paper.pdf");

	let document = session.document(document).expect("Missing document.");

	assert_eq!(document.web_uri.as_deref(), Some("https://example.com/paper.pdf"));
}

#[test]
fn title_is_never_overwritten() {
	let store = MemoryStore::new();
	let mut session = store.session();
	let document = create_document(&mut session, "http://example.com");

	create_or_update_document_meta(
		&mut session,
		&MetaClaim::new("http://example.com", "og.title", ["Not a title claim"]),
		document,
		now(),
		now(),
	)
	.expect("Failed to create document meta.");

	assert_eq!(session.document(document).and_then(|doc| doc.title.clone()), None);

	for (claimant, title) in [("http://example.com", "First"), ("http://example.org", "Second")] {
		create_or_update_document_meta(
			&mut session,
			&MetaClaim::new(claimant, "title", [title]),
			document,
			now(),
			now(),
		)
		.expect("Failed to create title meta.");
	}

	let document = session.document(document).expect("Missing document.");

	assert_eq!(document.title.as_deref(), Some("First"));
}

#[test]
fn merge_folds_duplicates_into_the_first_document() {
	let store = MemoryStore::new();
	let mut session = store.session();
	let master = create_document(&mut session, "urn:x-master");
	let duplicate = create_document(&mut session, "https://example.com/duplicate");

	claim_uri(&mut session, duplicate, "https://example.com/duplicate", "https://example.com/dup2");

	let metas = [("https://example.com/duplicate", "title"), ("urn:x-other", "author")];

	for (claimant, meta_type) in metas {
		create_or_update_document_meta(
			&mut session,
			&MetaClaim::new(claimant, meta_type, ["Duplicate"]),
			duplicate,
			now(),
			now(),
		)
		.expect("Failed to create document meta.");
	}

	let stamped = now();
	let merged = merge_documents(&mut session, &[master, duplicate, duplicate], Some(stamped))
		.expect("Failed to merge documents.");

	assert_eq!(merged, master);
	assert!(session.document(duplicate).is_none());
	assert_eq!(session.document_ids(), vec![master]);
	assert_eq!(session.document_uris(master).len(), 3);
	assert_eq!(session.document_metas(master).len(), 2);

	let document = session.document(master).expect("Missing document.");

	assert_eq!(document.web_uri.as_deref(), Some("https://example.com/duplicate"));
	assert_eq!(document.title.as_deref(), Some("Duplicate"));
	assert_eq!(document.updated, stamped);

	session.commit().expect("Failed to commit merge.");

	let fresh = store.session();

	assert_eq!(fresh.document_ids(), vec![master]);
	assert_eq!(fresh.document_uris(master).len(), 3);
}

#[test]
fn merge_rejects_bad_input() {
	let store = MemoryStore::new();
	let mut session = store.session();
	let document = create_document(&mut session, "http://example.com");

	assert!(matches!(merge_documents(&mut session, &[], None), Err(Error::InvalidArgument(_))));
	assert!(matches!(
		merge_documents(&mut session, &[document, DocumentId(9_999)], None),
		Err(Error::NotFound(_))
	));
	assert_eq!(merge_documents(&mut session, &[document], None).ok(), Some(document));
}

#[test]
fn merging_a_rel_canonical_duplicate_of_main_page() {
	let store = MemoryStore::new();
	let mut session = store.session();
	let main_page = "https://en.wikipedia.org/wiki/Main_Page";
	let mobile = "https://m.en.wikipedia.org/wiki/Main_Page";
	let title = "Wikipedia, the free encyclopedia";
	let master = create_document(&mut session, main_page);
	let duplicate = session.add_document(NewDocument {
		web_uri: None,
		title: None,
		created: yesterday(),
		updated: yesterday(),
	});

	create_or_update_document_uri(
		&mut session,
		&UriClaim::new(mobile, main_page).with_type(REL_CANONICAL),
		duplicate,
		yesterday(),
		yesterday(),
	)
	.expect("Failed to claim URI.");

	for (claimant, document) in [(main_page, master), (mobile, duplicate)] {
		create_or_update_document_meta(
			&mut session,
			&MetaClaim::new(claimant, "title", [title]),
			document,
			yesterday(),
			yesterday(),
		)
		.expect("Failed to claim title.");
	}

	let found = find_or_create_by_uris(&mut session, main_page, &[], now(), now())
		.expect("Failed to find documents.");

	assert_eq!(found, vec![master, duplicate]);

	let survivor = merge_documents(&mut session, &found, Some(now())).expect("Failed to merge.");

	assert_eq!(survivor, master);
	assert_eq!(session.document_ids(), vec![master]);
	assert_eq!(session.document_uris(master).len(), 2);
	assert_eq!(session.document_metas(master).len(), 2);
	assert_eq!(session.document(master).and_then(|row| row.title.as_deref()), Some(title));
}

#[test]
fn claiming_a_uri_owned_by_another_document_warns_and_keeps_the_owner() {
	let logs = CapturedLogs::default();
	let _guard = logs.install();
	let store = MemoryStore::new();
	let mut session = store.session();
	let owner = create_document(&mut session, "http://example.com/one");
	let other = create_document(&mut session, "http://example.com/two");
	let claim = UriClaim::new("http://example.com/one", "http://example.com/one")
		.with_type(SELF_CLAIM);
	let id = create_or_update_document_uri(&mut session, &claim, other, now(), now())
		.expect("Failed to update document URI.");

	assert_eq!(
		logs.count("WARN", "DocumentURI is already owned by a different document."),
		1
	);
	assert_eq!(session.document_uri(id).map(|row| row.document), Some(owner));
	assert_eq!(session.document_uris(other).len(), 1);
}

#[test]
fn claiming_meta_owned_by_another_document_warns_and_keeps_the_owner() {
	let logs = CapturedLogs::default();
	let _guard = logs.install();
	let store = MemoryStore::new();
	let mut session = store.session();
	let owner = create_document(&mut session, "http://example.com/one");
	let other = create_document(&mut session, "http://example.com/two");
	let id = create_or_update_document_meta(
		&mut session,
		&MetaClaim::new("http://example.com/claimant", "title", ["old value"]),
		owner,
		yesterday(),
		yesterday(),
	)
	.expect("Failed to create document meta.");

	assert_eq!(logs.count("WARN", "already owned by a different document"), 0);

	create_or_update_document_meta(
		&mut session,
		&MetaClaim::new("http://example.com/claimant", "title", ["new value"]),
		other,
		now(),
		now(),
	)
	.expect("Failed to update document meta.");

	assert_eq!(
		logs.count("WARN", "DocumentMeta is already owned by a different document."),
		1
	);

	let row = session.document_meta(id).expect("Missing document meta.");

	assert_eq!(row.document, owner);
	assert_eq!(row.value, vec!["new value".to_string()]);
	assert!(session.document_metas(other).is_empty());
}

#[test]
fn every_write_path_surfaces_flush_conflicts_as_retryable() {
	let store = MemoryStore::new();
	let mut setup = store.session();
	let first = create_document(&mut setup, "http://example.com/1");
	let second = create_document(&mut setup, "http://example.com/2");

	setup.commit().expect("Failed to commit setup.");

	let mut session = ConflictOnFlush::new(store.session());
	let results = [
		find_or_create_by_uris(&mut session, "http://example.com/new", &[], now(), now()).err(),
		create_or_update_document_uri(
			&mut session,
			&UriClaim::new("http://example.com/1", "http://example.org/1"),
			first,
			now(),
			now(),
		)
		.err(),
		create_or_update_document_meta(
			&mut session,
			&MetaClaim::new("http://example.com/1", "title", ["One"]),
			first,
			now(),
			now(),
		)
		.err(),
		merge_documents(&mut session, &[first, second], None).err(),
	];

	for err in results {
		let err = err.expect("Expected a flush conflict.");

		assert!(err.is_retryable(), "unexpected error: {err}");
	}

	assert_eq!(session.flushes(), 4);
}

#[test]
fn expand_uri_covers_every_uri_of_the_owning_document() {
	let store = MemoryStore::new();
	let mut session = store.session();
	let document = create_document(&mut session, "http://example.com/a");

	claim_uri(&mut session, document, "http://example.com/a", "http://example.com/b");
	create_or_update_document_uri(
		&mut session,
		&UriClaim::new("http://example.com/a", "http://example.com/canonical").with_type(REL_CANONICAL),
		document,
		now(),
		now(),
	)
	.expect("Failed to claim canonical URI.");

	assert_eq!(expand_uri(&session, "http://unknown.example.com"), vec![
		"http://unknown.example.com".to_string()
	]);
	assert_eq!(expand_uri(&session, "http://example.com/b"), vec![
		"http://example.com/a".to_string(),
		"http://example.com/b".to_string(),
		"http://example.com/canonical".to_string(),
	]);
	assert_eq!(expand_uri(&session, "http://example.com/canonical"), vec![
		"http://example.com/canonical".to_string()
	]);
}
