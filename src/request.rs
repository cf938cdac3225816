//! Outgoing request envelope and its metadata map.

// std
use std::collections::BTreeMap;
// self
use crate::_prelude::*;

/// String metadata attached to a request (headers, gRPC metadata, and similar).
///
/// Ordered so that two requests carrying the same entries render identically.
pub type Metadata = BTreeMap<String, String>;

/// Outgoing operation: an opaque body plus mutable metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Request<B> {
	/// Payload handed to the transport untouched.
	pub body: B,
	/// Metadata the transport turns into headers.
	pub metadata: Metadata,
}
impl<B> Request<B> {
	/// Creates a request with empty metadata.
	pub fn new(body: B) -> Self {
		Self { body, metadata: Metadata::new() }
	}

	/// Replaces the metadata map.
	pub fn with_metadata(mut self, metadata: Metadata) -> Self {
		self.metadata = metadata;

		self
	}

	/// Inserts a single metadata entry, overriding any previous value.
	pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.metadata.insert(key.into(), value.into());

		self
	}

	/// Merges `incoming` into the current metadata; incoming keys win.
	pub fn merge_metadata(&mut self, incoming: Metadata) {
		self.metadata.extend(incoming);
	}

	/// Consuming variant of [`Request::merge_metadata`].
	pub fn merged(mut self, incoming: Metadata) -> Self {
		self.merge_metadata(incoming);

		self
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn merge_overrides_same_named_keys_and_keeps_the_rest() {
		let request = Request::new(())
			.with_entry("authorization", "Bearer stale")
			.with_entry("x-trace", "abc")
			.merged(Metadata::from([
				("authorization".to_owned(), "Bearer fresh".to_owned()),
				("x-tenant".to_owned(), "acme".to_owned()),
			]));

		assert_eq!(
			request.metadata,
			Metadata::from([
				("authorization".to_owned(), "Bearer fresh".to_owned()),
				("x-tenant".to_owned(), "acme".to_owned()),
				("x-trace".to_owned(), "abc".to_owned()),
			])
		);
	}

	#[test]
	fn merging_the_same_entries_twice_is_idempotent() {
		let headers = Metadata::from([("authorization".to_owned(), "Bearer v1".to_owned())]);
		let once = Request::new("body").merged(headers.clone());
		let twice = once.clone().merged(headers);

		assert_eq!(once, twice);
	}
}
