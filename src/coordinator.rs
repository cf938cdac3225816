//! Request coordinator that owns the credential store and the in-flight refresh.
//!
//! [`RefreshCoordinator`] is the only writer of its [`TokenStorage`]. It attaches credential
//! metadata to outgoing requests, refreshes expired credentials before sending, and resubmits a
//! request once when a response reports the credential as rejected. See
//! [`RefreshCoordinator::intercept`] for the pipeline and
//! [`RefreshCoordinator::refresh_if_needed`] for the refresh protocol.

pub mod intercept;
pub mod refresh;

pub use refresh::*;

// self
use crate::{
	_prelude::*,
	credential::{BearerToken, Credential, bearer_headers},
	http::TransportProvider,
	request::Metadata,
	store::TokenStorage,
};

/// Predicate deciding whether a response means "credential rejected".
pub type ShouldRefresh<R> = Arc<dyn Fn(&R) -> bool + Send + Sync>;

/// Maps a credential to the metadata attached to outgoing requests.
pub type HeaderBuilder<T> = Arc<dyn Fn(&T) -> Metadata + Send + Sync>;

/// Observable credential state, derived from the store, the expiry predicate, and the in-flight
/// refresh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CredentialState {
	/// The store is empty.
	NoCredential,
	/// A credential is stored and not expired.
	Fresh,
	/// A credential is stored but expired.
	Expired,
	/// A refresh is in flight.
	Refreshing,
}

/// Intercepts requests, keeps their credential fresh, and coordinates single-flight refreshes.
///
/// `T` is the credential, `R` the response type observed by the pipeline, and `P` the provider
/// of transport clients handed to the refresh executor. Clones share the store, the executor,
/// and the in-flight refresh, so a clone is as good as the original for concurrency purposes.
pub struct RefreshCoordinator<T, R, P = ()>
where
	P: TransportProvider,
{
	storage: Arc<dyn TokenStorage<T>>,
	executor: Arc<dyn RefreshExecutor<T, P::Client>>,
	provider: Arc<P>,
	should_refresh: ShouldRefresh<R>,
	header_builder: HeaderBuilder<T>,
	in_flight: SingleFlight<T>,
	refresh_metrics: Arc<RefreshMetrics>,
}
impl<T, R, P> RefreshCoordinator<T, R, P>
where
	T: Credential,
	P: TransportProvider,
{
	/// Creates a coordinator over `storage` that refreshes through `executor`.
	///
	/// Responses never trigger a refresh and no metadata is attached until
	/// [`with_should_refresh`](Self::with_should_refresh) and
	/// [`with_header_builder`](Self::with_header_builder) are configured.
	pub fn new(
		storage: Arc<dyn TokenStorage<T>>,
		executor: impl 'static + RefreshExecutor<T, P::Client>,
		provider: impl Into<Arc<P>>,
	) -> Self {
		Self {
			storage,
			executor: Arc::new(executor),
			provider: provider.into(),
			should_refresh: Arc::new(|_: &R| false),
			header_builder: Arc::new(|_: &T| Metadata::new()),
			in_flight: SingleFlight::new(),
			refresh_metrics: Default::default(),
		}
	}

	/// Sets the predicate that flags a response as "credential rejected".
	pub fn with_should_refresh(
		mut self,
		should_refresh: impl 'static + Send + Sync + Fn(&R) -> bool,
	) -> Self {
		self.should_refresh = Arc::new(should_refresh);

		self
	}

	/// Sets the function that turns a credential into request metadata.
	pub fn with_header_builder(
		mut self,
		header_builder: impl 'static + Send + Sync + Fn(&T) -> Metadata,
	) -> Self {
		self.header_builder = Arc::new(header_builder);

		self
	}

	/// Reads the current credential.
	pub async fn credential(&self) -> Result<Option<T>> {
		Ok(self.storage.read().await?)
	}

	/// Drops the current credential, whatever state it is in.
	pub async fn clear_token(&self) -> Result<()> {
		Ok(self.storage.clear().await?)
	}

	/// Returns `true` while a refresh is in flight.
	pub fn is_refreshing(&self) -> bool {
		self.in_flight.is_active()
	}

	/// Derives the current [`CredentialState`].
	pub async fn state(&self) -> Result<CredentialState> {
		if self.is_refreshing() {
			return Ok(CredentialState::Refreshing);
		}
		if self.storage.read().await?.is_none() {
			return Ok(CredentialState::NoCredential);
		}

		let state = if self.storage.is_expired().await? {
			CredentialState::Expired
		} else {
			CredentialState::Fresh
		};

		Ok(state)
	}

	/// Shared counters for refresh outcomes.
	pub fn refresh_metrics(&self) -> &Arc<RefreshMetrics> {
		&self.refresh_metrics
	}

	/// Reads the current credential, treating storage failures as "no credential".
	pub(crate) async fn current_credential(&self) -> Option<T> {
		self.storage.read().await.ok().flatten()
	}
}
impl<R, P> RefreshCoordinator<BearerToken, R, P>
where
	P: TransportProvider,
{
	/// Attaches `authorization: Bearer <access token>` to every request.
	pub fn with_bearer_headers(self) -> Self {
		self.with_header_builder(bearer_headers)
	}
}
impl<T, R, P> Clone for RefreshCoordinator<T, R, P>
where
	P: TransportProvider,
{
	fn clone(&self) -> Self {
		Self {
			storage: self.storage.clone(),
			executor: self.executor.clone(),
			provider: self.provider.clone(),
			should_refresh: self.should_refresh.clone(),
			header_builder: self.header_builder.clone(),
			in_flight: self.in_flight.clone(),
			refresh_metrics: self.refresh_metrics.clone(),
		}
	}
}
impl<T, R, P> Debug for RefreshCoordinator<T, R, P>
where
	P: TransportProvider,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RefreshCoordinator")
			.field("refreshing", &self.in_flight.is_active())
			.field("refresh_metrics", &self.refresh_metrics)
			.finish()
	}
}
