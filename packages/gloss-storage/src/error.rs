use crate::session::FlushError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// A write lost a race against a concurrent transaction. The whole unit of work should be
	/// re-run from a fresh read.
	#[error("Concurrent update conflict during {operation}.")]
	Retryable {
		operation: &'static str,
		#[source]
		source: FlushError,
	},
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Not found: {0}")]
	NotFound(String),
}
impl Error {
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Retryable { .. })
	}

	pub(crate) fn retryable(operation: &'static str) -> impl FnOnce(FlushError) -> Self {
		move |source| Self::Retryable { operation, source }
	}
}
