use std::collections::HashMap;

use crate::{Error, Result, transaction::TransactionScoped};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct User {
	/// `acct:{username}@{authority}`.
	pub userid: String,
	pub username: String,
	pub authority: String,
	pub display_name: Option<String>,
}

/// Where user records are looked up.
pub trait UserDirectory {
	fn find_user(&self, userid: &str) -> Option<User>;
}
impl UserDirectory for HashMap<String, User> {
	fn find_user(&self, userid: &str) -> Option<User> {
		self.get(userid).cloned()
	}
}

/// User lookups memoized for the length of one transaction, misses included.
pub struct UserService<D> {
	directory: D,
	cache: HashMap<String, Option<User>>,
}
impl<D> UserService<D>
where
	D: UserDirectory,
{
	pub fn new(directory: D) -> Self {
		Self { directory, cache: HashMap::new() }
	}

	pub fn fetch(&mut self, userid: &str) -> Option<&User> {
		let directory = &self.directory;

		self.cache
			.entry(userid.to_string())
			.or_insert_with(|| directory.find_user(userid))
			.as_ref()
	}

	pub fn cached(&self) -> usize {
		self.cache.len()
	}

	/// Forgets every cached lookup. Must run whenever the surrounding transaction commits or
	/// rolls back.
	pub fn end_transaction(&mut self) {
		self.cache.clear();
	}
}
impl<D> TransactionScoped for UserService<D>
where
	D: UserDirectory,
{
	fn end_transaction(&mut self) {
		UserService::end_transaction(self);
	}
}

/// Splits `acct:{username}@{authority}` into its parts.
pub fn split_userid(userid: &str) -> Result<(&str, &str)> {
	userid
		.strip_prefix("acct:")
		.and_then(|rest| rest.rsplit_once('@'))
		.filter(|(username, authority)| !username.is_empty() && !authority.is_empty())
		.ok_or_else(|| Error::InvalidRequest { message: format!("Invalid userid {userid:?}.") })
}

pub fn userid(username: &str, authority: &str) -> String {
	format!("acct:{username}@{authority}")
}
