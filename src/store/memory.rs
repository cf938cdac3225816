//! Thread-safe in-memory [`TokenStorage`] for embedding and tests.

// self
use crate::{
	_prelude::*,
	credential::Credential,
	store::{self, StoreFuture, TokenStorage},
};

type Slot<T> = Arc<RwLock<Option<T>>>;

/// Keeps the current credential in process memory.
#[derive(Clone, Debug)]
pub struct MemoryStorage<T> {
	slot: Slot<T>,
	leeway: Duration,
}
impl<T> MemoryStorage<T>
where
	T: Credential,
{
	/// Creates an empty store.
	pub fn new() -> Self {
		Self { slot: Default::default(), leeway: Duration::ZERO }
	}

	/// Seeds the store with an initial credential.
	pub fn with_credential(self, credential: T) -> Self {
		*self.slot.write() = Some(credential);

		self
	}

	/// Treats credentials as expired `leeway` before their actual expiry.
	pub fn with_leeway(mut self, leeway: Duration) -> Self {
		self.leeway = store::sanitize_leeway(leeway);

		self
	}

	/// Returns a copy of the stored credential without going through the async contract.
	pub fn snapshot(&self) -> Option<T> {
		self.slot.read().clone()
	}

	fn is_expired_now(slot: &Slot<T>, leeway: Duration) -> bool {
		let instant = store::expiry_instant(leeway);

		slot.read().as_ref().is_some_and(|credential| credential.is_expired_at(instant))
	}
}
impl<T> Default for MemoryStorage<T>
where
	T: Credential,
{
	fn default() -> Self {
		Self::new()
	}
}
impl<T> TokenStorage<T> for MemoryStorage<T>
where
	T: Credential,
{
	fn read(&self) -> StoreFuture<'_, Option<T>> {
		let slot = self.slot.clone();

		Box::pin(async move { Ok(slot.read().clone()) })
	}

	fn write(&self, credential: T) -> StoreFuture<'_, ()> {
		let slot = self.slot.clone();

		Box::pin(async move {
			*slot.write() = Some(credential);

			Ok(())
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let slot = self.slot.clone();

		Box::pin(async move {
			slot.write().take();

			Ok(())
		})
	}

	fn is_expired(&self) -> StoreFuture<'_, bool> {
		let slot = self.slot.clone();
		let leeway = self.leeway;

		Box::pin(async move { Ok(Self::is_expired_now(&slot, leeway)) })
	}
}
