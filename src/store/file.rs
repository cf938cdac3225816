//! File-backed [`TokenStorage`] that keeps the credential across process restarts.
//!
//! The file holds the JSON form of the credential, or nothing at all. Writes land in a sibling
//! `.tmp` file that is synced and renamed over the real one, so readers never observe a torn
//! credential. [`TokenStorage::clear`] deletes the file.

// std
use std::{
	fs::{self, OpenOptions},
	io::{self, ErrorKind, Write},
	path::{Path, PathBuf},
};
// crates.io
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	credential::Credential,
	store::{self, StoreError, StoreFuture, TokenStorage},
};

/// JSON file store with an in-memory copy of the current credential.
#[derive(Clone, Debug)]
pub struct FileStorage<T> {
	location: PathBuf,
	cached: Arc<RwLock<Option<T>>>,
	leeway: Duration,
}
impl<T> FileStorage<T>
where
	T: Credential + Serialize + DeserializeOwned,
{
	/// Loads the credential at `location`; a missing or blank file opens as an empty store.
	///
	/// Missing parent directories are created.
	pub fn open(location: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let location = location.into();

		create_parent(&location)?;

		let cached = Arc::new(RwLock::new(load(&location)?));

		Ok(Self { location, cached, leeway: Duration::ZERO })
	}

	/// Treats credentials as expired `leeway` before their actual expiry.
	pub fn with_leeway(mut self, leeway: Duration) -> Self {
		self.leeway = store::sanitize_leeway(leeway);

		self
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.location
	}

	fn save(&self, credential: &T) -> Result<(), StoreError> {
		let json = serde_json::to_vec_pretty(credential).map_err(|e| StoreError::Serialization {
			message: format!("Credential could not be encoded: {e}"),
		})?;
		let staging = self.location.with_extension("tmp");

		create_parent(&self.location)?;

		let mut file = OpenOptions::new()
			.write(true)
			.create(true)
			.truncate(true)
			.open(&staging)
			.map_err(backend("open", &staging))?;

		file.write_all(&json).map_err(backend("write", &staging))?;
		file.sync_all().map_err(backend("sync", &staging))?;
		drop(file);

		fs::rename(&staging, &self.location).map_err(backend("replace", &self.location))
	}

	fn delete(&self) -> Result<(), StoreError> {
		match fs::remove_file(&self.location) {
			Err(e) if e.kind() != ErrorKind::NotFound => Err(backend("delete", &self.location)(e)),
			_ => Ok(()),
		}
	}
}
impl<T> TokenStorage<T> for FileStorage<T>
where
	T: Credential + Serialize + DeserializeOwned,
{
	fn read(&self) -> StoreFuture<'_, Option<T>> {
		Box::pin(async move { Ok(self.cached.read().clone()) })
	}

	fn write(&self, credential: T) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut cached = self.cached.write();

			self.save(&credential)?;
			*cached = Some(credential);

			Ok(())
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut cached = self.cached.write();

			self.delete()?;
			*cached = None;

			Ok(())
		})
	}

	fn is_expired(&self) -> StoreFuture<'_, bool> {
		Box::pin(async move {
			let instant = store::expiry_instant(self.leeway);

			Ok(self.cached.read().as_ref().is_some_and(|credential| credential.is_expired_at(instant)))
		})
	}
}

fn load<T>(location: &Path) -> Result<Option<T>, StoreError>
where
	T: DeserializeOwned,
{
	let raw = match fs::read(location) {
		Ok(raw) => raw,
		Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
		Err(e) => return Err(backend("read", location)(e)),
	};

	if raw.trim_ascii().is_empty() {
		return Ok(None);
	}

	serde_json::from_slice(&raw).map(Some).map_err(|e| StoreError::Serialization {
		message: format!("{} does not hold a credential: {e}", location.display()),
	})
}

fn create_parent(location: &Path) -> Result<(), StoreError> {
	match location.parent() {
		Some(parent) if !parent.as_os_str().is_empty() =>
			fs::create_dir_all(parent).map_err(backend("create directory", parent)),
		_ => Ok(()),
	}
}

fn backend(action: &'static str, path: &Path) -> impl FnOnce(io::Error) -> StoreError {
	let path = path.display().to_string();

	move |e| StoreError::Backend { message: format!("Could not {action} {path}: {e}") }
}
