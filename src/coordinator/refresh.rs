//! Single-flight credential refresh.
//!
//! [`RefreshCoordinator::refresh_if_needed`] runs at most one executor call at a time per
//! coordinator. Callers arriving while a refresh is in flight await that refresh's outcome
//! instead of starting their own. Successful refreshes replace the stored credential, revocations
//! clear it, and any other executor failure leaves it untouched.

mod metrics;
mod singleflight;

pub use metrics::RefreshMetrics;

pub(crate) use singleflight::{FlightRole, SingleFlight};

// self
use crate::{
	_prelude::*,
	coordinator::RefreshCoordinator,
	credential::Credential,
	error::ExecutorError,
	http::TransportProvider,
	obs::{self, FlowKind, FlowOutcome, FlowSpan, InFlightGuard},
	store::TokenStorage,
};

/// Boxed future returned by [`RefreshExecutor::refresh`].
pub type ExecutorFuture<'a, T> =
	Pin<Box<dyn Future<Output = Result<T, ExecutorError>> + 'a + Send>>;

/// Mints a replacement for the current credential.
///
/// Implemented for any `Fn(T, C) -> impl Future<Output = Result<T, ExecutorError>>`, so plain
/// async closures work. Return [`ExecutorError::Revoked`] when the credential can never be
/// refreshed again; the coordinator then clears it from the store.
pub trait RefreshExecutor<T, C>
where
	Self: Send + Sync,
{
	/// Exchanges `current` for a new credential using the scoped transport `client`.
	fn refresh(&self, current: T, client: C) -> ExecutorFuture<'_, T>;
}
impl<T, C, F, Fut> RefreshExecutor<T, C> for F
where
	F: Send + Sync + Fn(T, C) -> Fut,
	Fut: 'static + Send + Future<Output = Result<T, ExecutorError>>,
{
	fn refresh(&self, current: T, client: C) -> ExecutorFuture<'_, T> {
		Box::pin(self(current, client))
	}
}

impl<T, R, P> RefreshCoordinator<T, R, P>
where
	T: Credential,
	P: TransportProvider,
{
	/// Refreshes the stored credential, joining a refresh already in flight when there is one.
	///
	/// # Errors
	///
	/// - [`Error::NoCredential`] when the store is empty.
	/// - [`Error::Revoked`] when the executor revoked the credential; the store is cleared.
	/// - [`Error::Executor`] for any other executor failure; the store is untouched.
	/// - [`Error::Storage`] or [`Error::Transport`] when a collaborator fails.
	pub async fn refresh_if_needed(&self) -> Result<T> {
		const KIND: FlowKind = FlowKind::Refresh;

		let (handle, role) = self.in_flight.join_or_start(|| {
			let task = RefreshTask {
				storage: self.storage.clone(),
				executor: self.executor.clone(),
				provider: self.provider.clone(),
				metrics: self.refresh_metrics.clone(),
			};

			FlowSpan::new(KIND, "refresh_if_needed").instrument(task.run())
		});

		if role == FlightRole::Follower {
			self.refresh_metrics.record_joined();
			obs::record(KIND, FlowOutcome::Joined, None);
		}

		handle.await
	}
}

/// Owned collaborators for one executor run.
///
/// Never holds the in-flight slot, since the slot owns the running future.
struct RefreshTask<T, P>
where
	P: TransportProvider,
{
	storage: Arc<dyn TokenStorage<T>>,
	executor: Arc<dyn RefreshExecutor<T, P::Client>>,
	provider: Arc<P>,
	metrics: Arc<RefreshMetrics>,
}
impl<T, P> RefreshTask<T, P>
where
	T: Credential,
	P: TransportProvider,
{
	const KIND: FlowKind = FlowKind::Refresh;

	async fn run(self) -> Result<T> {
		let _in_flight = InFlightGuard::enter();

		self.metrics.record_attempt();
		obs::record(Self::KIND, FlowOutcome::Attempt, None);

		let outcome = self.execute().await;

		match &outcome {
			Ok(_) => {
				self.metrics.record_success();
				obs::record(Self::KIND, FlowOutcome::Success, None);
			},
			Err(Error::Revoked) => {
				self.metrics.record_revoked();
				obs::record(Self::KIND, FlowOutcome::Revoked, None);
			},
			Err(e) => {
				self.metrics.record_failure();
				obs::record(Self::KIND, FlowOutcome::Failure, Some(e));
			},
		}

		outcome
	}

	async fn execute(&self) -> Result<T> {
		let current = self.storage.read().await?.ok_or(Error::NoCredential)?;
		let client = self.provider.acquire()?;

		match self.executor.refresh(current, client).await {
			Ok(fresh) => {
				self.storage.write(fresh.clone()).await?;

				Ok(fresh)
			},
			Err(ExecutorError::Revoked) => {
				if let Err(e) = self.storage.clear().await {
					obs::record(Self::KIND, FlowOutcome::Failure, Some(&e.into()));
				}

				Err(Error::Revoked)
			},
			Err(ExecutorError::Failed { source }) => Err(Error::executor(source)),
		}
	}
}
