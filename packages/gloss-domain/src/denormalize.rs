//! Copying claim values onto the owning document.
//!
//! Both denormalized document fields follow one rule: the first non-empty value wins and is never
//! replaced afterwards.

use crate::{claim::TITLE, uri::is_web_uri};

/// Stores `candidate` in `slot` when the slot is absent or empty. Returns whether it was stored.
pub fn fill_if_unset(slot: &mut Option<String>, candidate: &str) -> bool {
	if slot.as_deref().is_some_and(|current| !current.is_empty()) || candidate.is_empty() {
		return false;
	}

	*slot = Some(candidate.to_string());

	true
}

/// The `web_uri` candidate carried by a URI claim, if the URI is an http(s) address.
pub fn web_uri_candidate(uri: &str) -> Option<&str> {
	is_web_uri(uri).then_some(uri)
}

/// The `title` candidate carried by a metadata claim: the first value of a `title` claim.
pub fn title_candidate<'a>(meta_type: &str, value: &'a [String]) -> Option<&'a str> {
	if meta_type != TITLE {
		return None;
	}

	value.first().map(String::as_str)
}
