//! In-memory arena implementation of [`Session`].
//!
//! [`MemoryStore`] holds the committed tables. Each [`MemorySession`] works on a snapshot taken
//! when it was opened and records which rows it inserted, updated or deleted. Flushing replays
//! those changes over the latest committed tables and validates every constraint without
//! publishing anything; committing does the same and then publishes the result atomically. A
//! session that loses a race against another committed session therefore fails at flush or
//! commit time and leaves the committed tables untouched.
//!
//! Every committed row carries a version bumped on each published update. Updating or deleting a
//! row whose committed version moved past the session's snapshot is a [`FlushError::StaleRow`].

use std::{
	collections::{BTreeMap, BTreeSet, HashMap},
	sync::{
		Arc, Mutex,
		atomic::{AtomicU64, Ordering},
	},
};

use gloss_domain::claim::UriClaimKey;

use crate::{
	models::{
		Document, DocumentId, DocumentMeta, DocumentMetaId, DocumentUri, DocumentUriId,
		NewDocument, NewDocumentMeta, NewDocumentUri,
	},
	session::{DOCUMENT_META_UNIQUE, DOCUMENT_URI_UNIQUE, FlushError, Session},
};

#[derive(Clone, Debug, Default)]
struct Tables {
	documents: BTreeMap<DocumentId, Document>,
	uris: BTreeMap<DocumentUriId, DocumentUri>,
	metas: BTreeMap<DocumentMetaId, DocumentMeta>,
	versions: Versions,
}

#[derive(Clone, Debug, Default)]
struct Versions {
	documents: BTreeMap<DocumentId, u64>,
	uris: BTreeMap<DocumentUriId, u64>,
	metas: BTreeMap<DocumentMetaId, u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Change {
	Insert,
	Update,
	Delete,
}

#[derive(Debug, Default)]
struct ChangeSet {
	documents: BTreeMap<DocumentId, Change>,
	uris: BTreeMap<DocumentUriId, Change>,
	metas: BTreeMap<DocumentMetaId, Change>,
}
impl ChangeSet {
	fn is_empty(&self) -> bool {
		self.documents.is_empty() && self.uris.is_empty() && self.metas.is_empty()
	}
}

#[derive(Debug)]
struct Shared {
	committed: Mutex<Tables>,
	next_id: AtomicU64,
}

#[derive(Clone, Debug)]
pub struct MemoryStore {
	shared: Arc<Shared>,
}
impl MemoryStore {
	pub fn new() -> Self {
		Self {
			shared: Arc::new(Shared {
				committed: Mutex::new(Tables::default()),
				next_id: AtomicU64::new(1),
			}),
		}
	}

	/// Opens a unit of work over a snapshot of the committed tables.
	pub fn session(&self) -> MemorySession {
		let tables = self.shared.committed.lock().unwrap_or_else(|err| err.into_inner()).clone();

		MemorySession { shared: self.shared.clone(), tables, changes: ChangeSet::default() }
	}
}
impl Default for MemoryStore {
	fn default() -> Self {
		Self::new()
	}
}

#[derive(Debug)]
pub struct MemorySession {
	shared: Arc<Shared>,
	tables: Tables,
	changes: ChangeSet,
}
impl MemorySession {
	/// Validates and publishes the session's changes.
	pub fn commit(self) -> Result<(), FlushError> {
		if self.changes.is_empty() {
			return Ok(());
		}

		let mut committed = self.shared.committed.lock().unwrap_or_else(|err| err.into_inner());
		let next = self.replay_over(&committed)?;

		validate(&next)?;

		*committed = next;

		Ok(())
	}

	/// Discards the session's changes.
	pub fn rollback(self) {}

	pub fn has_changes(&self) -> bool {
		!self.changes.is_empty()
	}

	fn next_id(&self) -> u64 {
		self.shared.next_id.fetch_add(1, Ordering::Relaxed)
	}

	fn replay_over(&self, committed: &Tables) -> Result<Tables, FlushError> {
		let mut next = committed.clone();
		let snapshot = &self.tables.versions;

		replay(
			&self.changes.documents,
			(&self.tables.documents, &snapshot.documents),
			(&mut next.documents, &mut next.versions.documents),
			|id| format!("Document {id}"),
		)?;
		replay(
			&self.changes.uris,
			(&self.tables.uris, &snapshot.uris),
			(&mut next.uris, &mut next.versions.uris),
			|id| format!("DocumentURI {id}"),
		)?;
		replay(
			&self.changes.metas,
			(&self.tables.metas, &snapshot.metas),
			(&mut next.metas, &mut next.versions.metas),
			|id| format!("DocumentMeta {id}"),
		)?;

		// Claims still owned by a deleted document in the committed tables go with it.
		let deleted: BTreeSet<DocumentId> = self
			.changes
			.documents
			.iter()
			.filter(|(_, change)| **change == Change::Delete)
			.map(|(id, _)| *id)
			.collect();

		if !deleted.is_empty() {
			next.uris.retain(|_, row| !deleted.contains(&row.document));
			next.metas.retain(|_, row| !deleted.contains(&row.document));

			let Tables { uris, metas, versions, .. } = &mut next;

			versions.uris.retain(|id, _| uris.contains_key(id));
			versions.metas.retain(|id, _| metas.contains_key(id));
		}

		Ok(next)
	}

	fn mark<K: Ord>(changes: &mut BTreeMap<K, Change>, id: K, change: Change) {
		match (changes.get(&id).copied(), change) {
			(Some(Change::Insert), Change::Update) => {},
			(Some(Change::Insert), Change::Delete) => {
				changes.remove(&id);
			},
			_ => {
				changes.insert(id, change);
			},
		}
	}
}
impl Session for MemorySession {
	fn document(&self, id: DocumentId) -> Option<&Document> {
		self.tables.documents.get(&id)
	}

	fn document_mut(&mut self, id: DocumentId) -> Option<&mut Document> {
		let row = self.tables.documents.get_mut(&id)?;

		Self::mark(&mut self.changes.documents, id, Change::Update);

		Some(row)
	}

	fn document_ids(&self) -> Vec<DocumentId> {
		self.tables.documents.keys().copied().collect()
	}

	fn documents_by_uris(&self, uris: &BTreeSet<String>) -> Vec<DocumentId> {
		let owners: BTreeSet<DocumentId> = self
			.tables
			.uris
			.values()
			.filter(|row| uris.contains(&row.uri))
			.map(|row| row.document)
			.filter(|document| self.tables.documents.contains_key(document))
			.collect();

		owners.into_iter().collect()
	}

	fn document_uris(&self, document: DocumentId) -> Vec<&DocumentUri> {
		self.tables.uris.values().filter(|row| row.document == document).collect()
	}

	fn document_metas(&self, document: DocumentId) -> Vec<&DocumentMeta> {
		self.tables.metas.values().filter(|row| row.document == document).collect()
	}

	fn document_uri(&self, id: DocumentUriId) -> Option<&DocumentUri> {
		self.tables.uris.get(&id)
	}

	fn document_uri_mut(&mut self, id: DocumentUriId) -> Option<&mut DocumentUri> {
		let row = self.tables.uris.get_mut(&id)?;

		Self::mark(&mut self.changes.uris, id, Change::Update);

		Some(row)
	}

	fn find_document_uri(&self, key: &UriClaimKey) -> Option<&DocumentUri> {
		self.tables.uris.values().find(|row| {
			row.claimant == key.claimant
				&& row.uri == key.uri
				&& row.uri_type == key.uri_type
				&& row.content_type == key.content_type
		})
	}

	fn document_meta(&self, id: DocumentMetaId) -> Option<&DocumentMeta> {
		self.tables.metas.get(&id)
	}

	fn document_meta_mut(&mut self, id: DocumentMetaId) -> Option<&mut DocumentMeta> {
		let row = self.tables.metas.get_mut(&id)?;

		Self::mark(&mut self.changes.metas, id, Change::Update);

		Some(row)
	}

	fn find_document_meta(&self, claimant: &str, meta_type: &str) -> Option<&DocumentMeta> {
		self.tables.metas.values().find(|row| row.claimant == claimant && row.meta_type == meta_type)
	}

	fn add_document(&mut self, document: NewDocument) -> DocumentId {
		let id = DocumentId(self.next_id());

		self.tables.documents.insert(
			id,
			Document {
				id,
				web_uri: document.web_uri,
				title: document.title,
				created: document.created,
				updated: document.updated,
			},
		);
		Self::mark(&mut self.changes.documents, id, Change::Insert);

		id
	}

	fn add_document_uri(&mut self, uri: NewDocumentUri) -> DocumentUriId {
		let id = DocumentUriId(self.next_id());
		let UriClaimKey { claimant, uri: address, uri_type, content_type } = uri.key;

		self.tables.uris.insert(
			id,
			DocumentUri {
				id,
				claimant,
				uri: address,
				uri_type,
				content_type,
				document: uri.document,
				created: uri.created,
				updated: uri.updated,
			},
		);
		Self::mark(&mut self.changes.uris, id, Change::Insert);

		id
	}

	fn add_document_meta(&mut self, meta: NewDocumentMeta) -> DocumentMetaId {
		let id = DocumentMetaId(self.next_id());

		self.tables.metas.insert(
			id,
			DocumentMeta {
				id,
				claimant: meta.claimant,
				meta_type: meta.meta_type,
				value: meta.value,
				document: meta.document,
				created: meta.created,
				updated: meta.updated,
			},
		);
		Self::mark(&mut self.changes.metas, id, Change::Insert);

		id
	}

	fn delete_document(&mut self, id: DocumentId) {
		if self.tables.documents.remove(&id).is_none() {
			return;
		}

		Self::mark(&mut self.changes.documents, id, Change::Delete);

		let uris: Vec<DocumentUriId> = self
			.tables
			.uris
			.values()
			.filter(|row| row.document == id)
			.map(|row| row.id)
			.collect();

		for uri in uris {
			self.tables.uris.remove(&uri);
			Self::mark(&mut self.changes.uris, uri, Change::Delete);
		}

		let metas: Vec<DocumentMetaId> = self
			.tables
			.metas
			.values()
			.filter(|row| row.document == id)
			.map(|row| row.id)
			.collect();

		for meta in metas {
			self.tables.metas.remove(&meta);
			Self::mark(&mut self.changes.metas, meta, Change::Delete);
		}
	}

	fn flush(&mut self) -> Result<(), FlushError> {
		validate(&self.tables)?;

		if self.changes.is_empty() {
			return Ok(());
		}

		let committed = self.shared.committed.lock().unwrap_or_else(|err| err.into_inner());

		validate(&self.replay_over(&committed)?)
	}
}

fn replay<K, V, F>(
	changes: &BTreeMap<K, Change>,
	(local, snapshot): (&BTreeMap<K, V>, &BTreeMap<K, u64>),
	(target, versions): (&mut BTreeMap<K, V>, &mut BTreeMap<K, u64>),
	describe: F,
) -> Result<(), FlushError>
where
	K: Ord + Copy,
	V: Clone,
	F: Fn(K) -> String,
{
	for (id, change) in changes {
		match change {
			Change::Insert => {
				if let Some(row) = local.get(id) {
					target.insert(*id, row.clone());
					versions.insert(*id, 1);
				}
			},
			Change::Update => {
				let Some(read) = snapshot.get(id).copied().filter(|read| versions.get(id) == Some(read))
				else {
					return Err(FlushError::StaleRow { row: describe(*id) });
				};

				if let Some(row) = local.get(id) {
					target.insert(*id, row.clone());
					versions.insert(*id, read + 1);
				}
			},
			Change::Delete => {
				if versions.get(id).copied() != snapshot.get(id).copied() {
					return Err(FlushError::StaleRow { row: describe(*id) });
				}

				target.remove(id);
				versions.remove(id);
			},
		}
	}

	Ok(())
}

fn validate(tables: &Tables) -> Result<(), FlushError> {
	let mut uri_keys: HashMap<UriClaimKey, DocumentUriId> = HashMap::new();

	for row in tables.uris.values() {
		if !tables.documents.contains_key(&row.document) {
			return Err(FlushError::ForeignKeyViolation {
				row: format!("DocumentURI {}", row.id),
				document: row.document,
			});
		}
		if let Some(existing) = uri_keys.insert(row.key(), row.id) {
			return Err(FlushError::UniqueViolation {
				constraint: DOCUMENT_URI_UNIQUE,
				detail: format!(
					"DocumentURI {} and {} both claim {:?} for {:?}",
					existing, row.id, row.uri, row.claimant
				),
			});
		}
	}

	let mut meta_keys: HashMap<(&str, &str), DocumentMetaId> = HashMap::new();

	for row in tables.metas.values() {
		if !tables.documents.contains_key(&row.document) {
			return Err(FlushError::ForeignKeyViolation {
				row: format!("DocumentMeta {}", row.id),
				document: row.document,
			});
		}
		if let Some(existing) =
			meta_keys.insert((row.claimant.as_str(), row.meta_type.as_str()), row.id)
		{
			return Err(FlushError::UniqueViolation {
				constraint: DOCUMENT_META_UNIQUE,
				detail: format!(
					"DocumentMeta {} and {} both claim {:?} for {:?}",
					existing, row.id, row.meta_type, row.claimant
				),
			});
		}
	}

	Ok(())
}
