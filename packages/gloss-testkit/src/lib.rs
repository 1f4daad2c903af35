//! Shared doubles for gloss integration tests.

use std::{
	collections::{BTreeSet, VecDeque},
	io,
	sync::{Arc, Mutex},
};

use serde_json::Value;
use time::{Duration, OffsetDateTime};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

use gloss_domain::claim::UriClaimKey;
use gloss_providers::elasticsearch::BackendRequest;
use gloss_service::{BoxFuture, SearchBackend};
use gloss_storage::{
	models::{
		Document, DocumentId, DocumentMeta, DocumentMetaId, DocumentUri, DocumentUriId,
		NewDocument, NewDocumentMeta, NewDocumentUri,
	},
	session::{DOCUMENT_URI_UNIQUE, FlushError, Session},
};

/// Current time truncated to whole seconds so timestamps compare cleanly.
pub fn now() -> OffsetDateTime {
	let now = OffsetDateTime::now_utc();

	now.replace_nanosecond(0).unwrap_or(now)
}

pub fn yesterday() -> OffsetDateTime {
	now() - Duration::days(1)
}

/// Log lines emitted on the current thread while the guard from [`CapturedLogs::install`] lives.
#[derive(Clone, Default)]
pub struct CapturedLogs {
	buffer: Arc<Mutex<Vec<u8>>>,
}
impl CapturedLogs {
	pub fn install(&self) -> DefaultGuard {
		let subscriber = tracing_subscriber::fmt()
			.with_writer(self.clone())
			.with_ansi(false)
			.with_max_level(tracing::Level::DEBUG)
			.finish();

		tracing::subscriber::set_default(subscriber)
	}

	pub fn contents(&self) -> String {
		String::from_utf8_lossy(&self.buffer.lock().unwrap_or_else(|err| err.into_inner()))
			.into_owned()
	}

	/// Lines at `level` (e.g. `WARN`) containing `message`.
	pub fn count(&self, level: &str, message: &str) -> usize {
		self.contents()
			.lines()
			.filter(|line| line.contains(level) && line.contains(message))
			.count()
	}
}
impl<'a> MakeWriter<'a> for CapturedLogs {
	type Writer = CapturedWriter;

	fn make_writer(&'a self) -> Self::Writer {
		CapturedWriter { buffer: self.buffer.clone() }
	}
}

pub struct CapturedWriter {
	buffer: Arc<Mutex<Vec<u8>>>,
}
impl io::Write for CapturedWriter {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.buffer.lock().unwrap_or_else(|err| err.into_inner()).extend_from_slice(buf);

		Ok(buf.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		Ok(())
	}
}

/// Session wrapper whose flush always reports a lost race.
///
/// Reads and staged writes go to the wrapped session, so a test can observe how far an
/// operation got before the conflict surfaced.
pub struct ConflictOnFlush<S> {
	inner: S,
	flushes: usize,
}
impl<S> ConflictOnFlush<S>
where
	S: Session,
{
	pub fn new(inner: S) -> Self {
		Self { inner, flushes: 0 }
	}

	pub fn flushes(&self) -> usize {
		self.flushes
	}
}
impl<S> Session for ConflictOnFlush<S>
where
	S: Session,
{
	fn document(&self, id: DocumentId) -> Option<&Document> {
		self.inner.document(id)
	}

	fn document_mut(&mut self, id: DocumentId) -> Option<&mut Document> {
		self.inner.document_mut(id)
	}

	fn document_ids(&self) -> Vec<DocumentId> {
		self.inner.document_ids()
	}

	fn documents_by_uris(&self, uris: &BTreeSet<String>) -> Vec<DocumentId> {
		self.inner.documents_by_uris(uris)
	}

	fn document_uris(&self, document: DocumentId) -> Vec<&DocumentUri> {
		self.inner.document_uris(document)
	}

	fn document_metas(&self, document: DocumentId) -> Vec<&DocumentMeta> {
		self.inner.document_metas(document)
	}

	fn document_uri(&self, id: DocumentUriId) -> Option<&DocumentUri> {
		self.inner.document_uri(id)
	}

	fn document_uri_mut(&mut self, id: DocumentUriId) -> Option<&mut DocumentUri> {
		self.inner.document_uri_mut(id)
	}

	fn find_document_uri(&self, key: &UriClaimKey) -> Option<&DocumentUri> {
		self.inner.find_document_uri(key)
	}

	fn document_meta(&self, id: DocumentMetaId) -> Option<&DocumentMeta> {
		self.inner.document_meta(id)
	}

	fn document_meta_mut(&mut self, id: DocumentMetaId) -> Option<&mut DocumentMeta> {
		self.inner.document_meta_mut(id)
	}

	fn find_document_meta(&self, claimant: &str, meta_type: &str) -> Option<&DocumentMeta> {
		self.inner.find_document_meta(claimant, meta_type)
	}

	fn add_document(&mut self, document: NewDocument) -> DocumentId {
		self.inner.add_document(document)
	}

	fn add_document_uri(&mut self, uri: NewDocumentUri) -> DocumentUriId {
		self.inner.add_document_uri(uri)
	}

	fn add_document_meta(&mut self, meta: NewDocumentMeta) -> DocumentMetaId {
		self.inner.add_document_meta(meta)
	}

	fn delete_document(&mut self, id: DocumentId) {
		self.inner.delete_document(id)
	}

	fn flush(&mut self) -> Result<(), FlushError> {
		self.flushes += 1;

		Err(FlushError::UniqueViolation {
			constraint: DOCUMENT_URI_UNIQUE,
			detail: "simulated concurrent insert".to_string(),
		})
	}
}

/// Search backend that replays canned responses in order and records every request.
#[derive(Default)]
pub struct RecordingBackend {
	responses: Mutex<VecDeque<Value>>,
	requests: Mutex<Vec<BackendRequest>>,
}
impl RecordingBackend {
	pub fn new<I>(responses: I) -> Self
	where
		I: IntoIterator<Item = Value>,
	{
		Self {
			responses: Mutex::new(responses.into_iter().collect()),
			requests: Mutex::new(Vec::new()),
		}
	}

	pub fn requests(&self) -> Vec<BackendRequest> {
		self.requests.lock().unwrap_or_else(|err| err.into_inner()).clone()
	}
}
impl SearchBackend for RecordingBackend {
	fn search<'a>(
		&'a self,
		request: &'a BackendRequest,
	) -> BoxFuture<'a, gloss_providers::Result<Value>> {
		Box::pin(async move {
			self.requests.lock().unwrap_or_else(|err| err.into_inner()).push(request.clone());

			self.responses.lock().unwrap_or_else(|err| err.into_inner()).pop_front().ok_or_else(
				|| gloss_providers::Error::InvalidResponse {
					message: "No canned search response left.".to_string(),
				},
			)
		})
	}
}

/// Search backend that fails every request.
pub struct FailingBackend;
impl SearchBackend for FailingBackend {
	fn search<'a>(
		&'a self,
		_request: &'a BackendRequest,
	) -> BoxFuture<'a, gloss_providers::Result<Value>> {
		Box::pin(async move {
			Err(gloss_providers::Error::InvalidResponse {
				message: "Search backend is unavailable.".to_string(),
			})
		})
	}
}

/// A search response reporting `total` matches of which `ids` were returned.
pub fn hits_response<I, S>(ids: I, total: u64) -> Value
where
	I: IntoIterator<Item = S>,
	S: AsRef<str>,
{
	let hits: Vec<Value> = ids
		.into_iter()
		.enumerate()
		.map(|(rank, id)| {
			serde_json::json!({
				"_id": id.as_ref(),
				"_score": 1.0 / (rank as f64 + 1.0),
			})
		})
		.collect();

	serde_json::json!({ "hits": { "total": total, "hits": hits } })
}

/// `count` sequential ids with a common prefix.
pub fn numbered_ids(prefix: &str, count: usize) -> Vec<String> {
	(0..count).map(|n| format!("{prefix}{n}")).collect()
}
