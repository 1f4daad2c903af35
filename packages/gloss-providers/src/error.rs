pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Search backend request failed: {0}")]
	Http(#[from] reqwest::Error),
	#[error("Invalid default header name: {0}")]
	InvalidHeaderName(#[from] reqwest::header::InvalidHeaderName),
	#[error("Invalid default header value: {0}")]
	InvalidHeaderValue(#[from] reqwest::header::InvalidHeaderValue),
	#[error("{message}")]
	InvalidConfig { message: String },
	#[error("Invalid search response: {message}")]
	InvalidResponse { message: String },
}
