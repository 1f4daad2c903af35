mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Auth, Config, Search, SearchBackend, SearchLimits, Service, Storage};

use std::{
	fs,
	path::{Path, PathBuf},
};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	finish(cfg)
}

/// Parses an inline TOML document, as used by tests and embedded defaults.
pub fn parse(raw: &str) -> Result<Config> {
	let cfg: Config = toml::from_str(raw)
		.map_err(|err| Error::ParseConfig { path: PathBuf::from("<inline>"), source: err })?;

	finish(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.storage.retry_attempts == 0 {
		return Err(Error::Validation {
			message: "storage.retry_attempts must be greater than zero.".to_string(),
		});
	}

	let backend = &cfg.search.backend;

	if !backend.url.starts_with("http://") && !backend.url.starts_with("https://") {
		return Err(Error::Validation {
			message: "search.backend.url must be an http or https URL.".to_string(),
		});
	}

	for (label, value) in
		[("search.backend.index", &backend.index), ("search.backend.doc_type", &backend.doc_type)]
	{
		if value.trim().is_empty() {
			return Err(Error::Validation { message: format!("{label} must be non-empty.") });
		}
	}

	if backend.timeout_ms == 0 {
		return Err(Error::Validation {
			message: "search.backend.timeout_ms must be greater than zero.".to_string(),
		});
	}
	if cfg.search.max_limit == 0 {
		return Err(Error::Validation {
			message: "search.max_limit must be greater than zero.".to_string(),
		});
	}
	if cfg.search.default_limit > cfg.search.max_limit {
		return Err(Error::Validation {
			message: "search.default_limit must be less than or equal to search.max_limit."
				.to_string(),
		});
	}
	if cfg.search.reply_limit == 0 {
		return Err(Error::Validation {
			message: "search.reply_limit must be greater than zero.".to_string(),
		});
	}

	for (name, value) in &backend.default_headers {
		if !value.is_string() {
			return Err(Error::Validation {
				message: format!("search.backend.default_headers.{name} must be a string."),
			});
		}
	}

	Ok(())
}

fn finish(mut cfg: Config) -> Result<Config> {
	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

fn normalize(cfg: &mut Config) {
	if cfg.auth.auth_domain.as_deref().map(|domain| domain.trim().is_empty()).unwrap_or(false) {
		cfg.auth.auth_domain = None;
	}

	let url = cfg.search.backend.url.trim().trim_end_matches('/');

	cfg.search.backend.url = url.to_string();
}
