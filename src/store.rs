//! Credential storage contract and built-in stores.
//!
//! A store holds at most one credential. "Empty" is a valid state distinct from "expired", and
//! the coordinator that owns a store is its only writer.

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

// self
use crate::_prelude::*;

/// Boxed future returned by every [`TokenStorage`] operation.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend for the current credential.
pub trait TokenStorage<T>
where
	Self: Send + Sync,
{
	/// Returns the current credential, if any.
	fn read(&self) -> StoreFuture<'_, Option<T>>;

	/// Replaces the current credential.
	fn write(&self, credential: T) -> StoreFuture<'_, ()>;

	/// Removes the current credential.
	fn clear(&self) -> StoreFuture<'_, ()>;

	/// Returns `true` if a credential is stored and it is expired. An empty store is not expired.
	fn is_expired(&self) -> StoreFuture<'_, bool>;
}

/// Error type produced by [`TokenStorage`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Adds a fixed leeway to the clock so credentials are treated as expired slightly early.
pub(crate) fn expiry_instant(leeway: Duration) -> OffsetDateTime {
	OffsetDateTime::now_utc() + leeway
}

/// Clamps negative leeways to zero.
pub(crate) fn sanitize_leeway(leeway: Duration) -> Duration {
	if leeway.is_negative() { Duration::ZERO } else { leeway }
}
