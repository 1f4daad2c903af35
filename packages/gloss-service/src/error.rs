pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Retryable conflict: {message}")]
	Retryable { message: String },
	#[error("Transient failure after {attempts} attempts: {message}")]
	TransientFailure { attempts: u32, message: String },
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error(transparent)]
	Backend(#[from] gloss_providers::Error),
}
impl Error {
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::Retryable { .. })
	}
}

impl From<gloss_storage::Error> for Error {
	fn from(err: gloss_storage::Error) -> Self {
		match err {
			gloss_storage::Error::Retryable { operation, source } =>
				Self::Retryable { message: format!("{operation}: {source}") },
			gloss_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			gloss_storage::Error::NotFound(message) => Self::NotFound { message },
		}
	}
}

impl From<gloss_storage::session::FlushError> for Error {
	fn from(err: gloss_storage::session::FlushError) -> Self {
		Self::Retryable { message: err.to_string() }
	}
}
