//! Retrying units of work against a [`MemoryStore`].

use gloss_storage::memory::{MemorySession, MemoryStore};

use crate::{Error, Result};

/// State that lives for exactly one transaction and must be dropped at its end.
pub trait TransactionScoped {
	fn end_transaction(&mut self);
}
impl TransactionScoped for () {
	fn end_transaction(&mut self) {}
}

/// Runs `f` in a fresh session and commits it, retrying from scratch whenever the attempt loses a
/// race.
///
/// Non-retryable errors roll back and return at once. After `attempts` lost races the last
/// conflict is reported as [`Error::TransientFailure`].
pub fn run_in_transaction<T, F>(store: &MemoryStore, attempts: u32, mut f: F) -> Result<T>
where
	F: FnMut(&mut MemorySession) -> Result<T>,
{
	run_in_transaction_with(store, attempts, &mut (), |session, _| f(session))
}

/// Like [`run_in_transaction`], with `scoped` handed to every attempt and ended at every commit
/// or rollback.
pub fn run_in_transaction_with<C, T, F>(
	store: &MemoryStore,
	attempts: u32,
	scoped: &mut C,
	mut f: F,
) -> Result<T>
where
	C: TransactionScoped + ?Sized,
	F: FnMut(&mut MemorySession, &mut C) -> Result<T>,
{
	let mut last_conflict = String::from("no attempt was made");

	for attempt in 1..=attempts {
		let mut session = store.session();
		let outcome = f(&mut session, scoped);
		let conflict = match outcome {
			Ok(value) => {
				let committed = session.commit();

				scoped.end_transaction();

				match committed {
					Ok(()) => return Ok(value),
					Err(err) => Error::from(err),
				}
			},
			Err(err) => {
				session.rollback();
				scoped.end_transaction();

				if !err.is_retryable() {
					return Err(err);
				}

				err
			},
		};

		tracing::warn!(attempt, attempts, error = %conflict, "Transaction attempt conflicted.");

		last_conflict = conflict.to_string();
	}

	Err(Error::TransientFailure { attempts, message: last_conflict })
}
