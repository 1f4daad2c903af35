//! URI comparison rules shared by ingestion and search.

/// Query parameters that only carry tracking data and never identify a resource.
const TRACKING_PARAM_PREFIXES: [&str; 2] = ["utm_", "via"];

/// Whether `uri` is an http or https address.
pub fn is_web_uri(uri: &str) -> bool {
	uri.starts_with("http://") || uri.starts_with("https://")
}

/// Normalizes a URI for equality comparison in the search index.
///
/// http and https addresses collapse onto the `httpx` scheme, hosts are lower-cased, default ports,
/// fragments, trailing slashes and tracking parameters are dropped, and the remaining query
/// parameters are sorted by name. Other schemes (`urn:`, `doi:`, `file://`) are only trimmed.
pub fn normalize(uri: &str) -> String {
	let trimmed = uri.trim();
	let Some((scheme, rest)) = trimmed.split_once("://") else {
		return trimmed.to_string();
	};
	let scheme = scheme.to_ascii_lowercase();

	if scheme != "http" && scheme != "https" {
		return format!("{scheme}://{rest}");
	}

	let rest = rest.split_once('#').map(|(head, _)| head).unwrap_or(rest);
	let (rest, query) = match rest.split_once('?') {
		Some((head, query)) => (head, Some(query)),
		None => (rest, None),
	};
	let (authority, path) = match rest.find('/') {
		Some(idx) => rest.split_at(idx),
		None => (rest, ""),
	};
	let mut out = format!("httpx://{}", normalize_authority(authority, &scheme));

	out.push_str(path.trim_end_matches('/'));

	if let Some(query) = query.map(normalize_query).filter(|query| !query.is_empty()) {
		out.push('?');
		out.push_str(&query);
	}

	out
}

fn normalize_authority(authority: &str, scheme: &str) -> String {
	let (userinfo, hostport) = match authority.rsplit_once('@') {
		Some((userinfo, hostport)) => (Some(userinfo), hostport),
		None => (None, authority),
	};
	// IPv6 literals carry colons inside the brackets.
	let port_sep = match hostport.rfind(']') {
		Some(end) => hostport[end..].find(':').map(|idx| end + idx),
		None => hostport.rfind(':'),
	};
	let (host, port) = match port_sep {
		Some(idx) => (&hostport[..idx], Some(&hostport[idx + 1..])),
		None => (hostport, None),
	};
	let default_port = if scheme == "https" { "443" } else { "80" };
	let mut out = String::with_capacity(authority.len());

	if let Some(userinfo) = userinfo {
		out.push_str(userinfo);
		out.push('@');
	}

	out.push_str(&host.to_ascii_lowercase());

	if let Some(port) = port.filter(|port| !port.is_empty() && *port != default_port) {
		out.push(':');
		out.push_str(port);
	}

	out
}

fn normalize_query(query: &str) -> String {
	let mut pairs: Vec<&str> = query
		.split('&')
		.filter(|pair| !pair.is_empty() && !is_tracking_param(param_name(pair)))
		.collect();

	pairs.sort_by_key(|pair| param_name(*pair));

	pairs.join("&")
}

fn param_name(pair: &str) -> &str {
	pair.split_once('=').map(|(name, _)| name).unwrap_or(pair)
}

fn is_tracking_param(name: &str) -> bool {
	TRACKING_PARAM_PREFIXES.iter().any(|prefix| {
		if prefix.ends_with('_') { name.starts_with(prefix) } else { name == *prefix }
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn keeps_non_default_ports() {
		assert_eq!(normalize_authority("Example.COM:8080", "http"), "example.com:8080");
		assert_eq!(normalize_authority("example.com:443", "https"), "example.com");
		assert_eq!(normalize_authority("example.com:443", "http"), "example.com:443");
	}

	#[test]
	fn handles_ipv6_hosts() {
		assert_eq!(normalize_authority("[::1]:80", "http"), "[::1]");
		assert_eq!(normalize_authority("[::1]", "http"), "[::1]");
	}

	#[test]
	fn sorts_query_by_name_only() {
		assert_eq!(normalize_query("b=2&a=9&a=1"), "a=9&a=1&b=2");
	}
}
