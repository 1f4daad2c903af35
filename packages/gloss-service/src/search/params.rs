/// Search request parameters: an ordered multi-map where a key may repeat.
///
/// Query components consume the keys they understand with [`SearchParams::pop`] or
/// [`SearchParams::pop_all`]; whatever is left over becomes a plain field match.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchParams {
	pairs: Vec<(String, String)>,
}
impl SearchParams {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.pairs.push((key.into(), value.into()));
	}

	pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.push(key, value);

		self
	}

	/// Parses a `key=value` argument. A missing `=` yields an empty value.
	pub fn push_pair(&mut self, pair: &str) {
		match pair.split_once('=') {
			Some((key, value)) => self.push(key, value),
			None => self.push(pair, ""),
		}
	}

	pub fn get(&self, key: &str) -> Option<&str> {
		self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
	}

	pub fn get_all(&self, key: &str) -> Vec<&str> {
		self.pairs.iter().filter(|(k, _)| k == key).map(|(_, v)| v.as_str()).collect()
	}

	pub fn contains(&self, key: &str) -> bool {
		self.pairs.iter().any(|(k, _)| k == key)
	}

	/// Removes every value of `key` and returns the first.
	pub fn pop(&mut self, key: &str) -> Option<String> {
		self.pop_all(key).into_iter().next()
	}

	/// Removes and returns every value of `key` in insertion order.
	pub fn pop_all(&mut self, key: &str) -> Vec<String> {
		let mut popped = Vec::new();

		self.pairs.retain(|(k, v)| {
			if k == key {
				popped.push(v.clone());

				false
			} else {
				true
			}
		});

		popped
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
	}

	pub fn len(&self) -> usize {
		self.pairs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pairs.is_empty()
	}
}
impl<K, V> FromIterator<(K, V)> for SearchParams
where
	K: Into<String>,
	V: Into<String>,
{
	fn from_iter<I>(iter: I) -> Self
	where
		I: IntoIterator<Item = (K, V)>,
	{
		Self { pairs: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
	}
}
