//! Credential contract plus a ready-made bearer token shape.
//!
//! The coordinator treats credentials as opaque values: it only needs to clone them, hand them
//! to the refresh executor, and ask whether they are expired at a given instant. Replacement is
//! always a whole-value substitution through the store.

pub mod bearer;
pub mod secret;

pub use bearer::*;
pub use secret::*;

// self
use crate::_prelude::*;

/// Opaque authorization value with an expiry predicate.
pub trait Credential
where
	Self: 'static + Clone + Send + Sync,
{
	/// Returns `true` if the credential must not be used at `instant`.
	fn is_expired_at(&self, instant: OffsetDateTime) -> bool;

	/// Evaluates [`Credential::is_expired_at`] against the current UTC clock.
	fn is_expired(&self) -> bool {
		self.is_expired_at(OffsetDateTime::now_utc())
	}
}
