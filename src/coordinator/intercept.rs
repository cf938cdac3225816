//! Request pipeline: proactive refresh, metadata attachment, and retry-once resubmission.
//!
//! For every request the coordinator
//!
//! 1. refreshes an expired credential before sending (failures are swallowed and the request goes
//!    out anyway),
//! 2. merges the credential's metadata over the request's own metadata,
//! 3. forwards the request and watches each response; the first response flagged by the
//!    [`ShouldRefresh`](crate::coordinator::ShouldRefresh) predicate triggers a single-flight
//!    refresh, after which the original response sequence is abandoned and the retried request's
//!    sequence is yielded in its place.
//!
//! Token handling never surfaces as an error on the stream: when the refresh fails, the
//! rejecting response is passed through unchanged.

// self
use crate::{
	_prelude::*,
	coordinator::RefreshCoordinator,
	credential::Credential,
	http::TransportProvider,
	link::{Forward, Link, ResponseStream},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
	request::Request,
};

const KIND: FlowKind = FlowKind::Intercept;

impl<T, R, P> RefreshCoordinator<T, R, P>
where
	T: Credential,
	R: 'static + Send,
	P: TransportProvider,
{
	/// Sends `request` through `next` with a fresh credential attached.
	///
	/// Returns the responses of `next` in order. If a response is flagged as "credential rejected"
	/// and the refresh succeeds, the remaining original responses are dropped and the responses
	/// of the resubmitted request are yielded instead; a rejection on the resubmitted sequence is
	/// passed through. With `next == None` nothing is yielded, but the proactive refresh still
	/// runs once the stream is polled.
	pub fn intercept<B>(
		&self,
		request: Request<B>,
		next: Option<Arc<dyn Forward<B, R>>>,
	) -> ResponseStream<R>
	where
		B: 'static + Clone + Send,
	{
		let this = self.clone();

		async_stream::stream! {
			obs::record(KIND, FlowOutcome::Attempt, None);

			let request = FlowSpan::new(KIND, "prepare").instrument(this.prepare(request)).await;
			let Some(next) = next else {
				return;
			};
			let mut responses = next.forward(request.clone());

			while let Some(response) = responses.next().await {
				let rejected =
					this.current_credential().await.is_some() && (this.should_refresh)(&response);

				if !rejected {
					yield response;

					continue;
				}

				let span = FlowSpan::new(KIND, "reactive_refresh");

				match span.instrument(this.refresh_if_needed()).await {
					Ok(credential) => {
						obs::record(KIND, FlowOutcome::Retried, None);
						drop(responses);

						let retried = request.merged((this.header_builder)(&credential));
						let mut retried_responses = next.forward(retried);

						while let Some(response) = retried_responses.next().await {
							yield response;
						}

						return;
					},
					Err(e) => {
						obs::record(KIND, FlowOutcome::Failure, Some(&e));

						yield response;
					},
				}
			}
		}
		.boxed()
	}

	/// Runs the proactive refresh, then attaches the (possibly refreshed) credential's metadata.
	async fn prepare<B>(&self, request: Request<B>) -> Request<B> {
		self.ensure_fresh().await;

		match self.current_credential().await {
			Some(credential) => request.merged((self.header_builder)(&credential)),
			None => request,
		}
	}

	async fn ensure_fresh(&self) {
		if self.current_credential().await.is_none() {
			return;
		}

		match self.storage.is_expired().await {
			Ok(true) => {},
			Ok(false) => return,
			Err(e) => {
				obs::record(KIND, FlowOutcome::Failure, Some(&e.into()));

				return;
			},
		}

		if let Err(e) = self.refresh_if_needed().await {
			obs::record(KIND, FlowOutcome::Failure, Some(&e));
		}
	}
}
impl<T, R, P, B> Link<B, R> for RefreshCoordinator<T, R, P>
where
	T: Credential,
	R: 'static + Send,
	P: TransportProvider,
	B: 'static + Clone + Send,
{
	fn intercept(
		&self,
		request: Request<B>,
		next: Option<Arc<dyn Forward<B, R>>>,
	) -> ResponseStream<R> {
		RefreshCoordinator::intercept(self, request, next)
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use futures::stream;
	// self
	use super::*;
	use crate::{
		credential::{AUTHORIZATION, BearerToken},
		error::ExecutorError,
		store::{MemoryStorage, TokenStorage},
	};

	#[derive(Clone, Debug, PartialEq, Eq)]
	struct Reply {
		status: u16,
		authorization: Option<String>,
	}

	type Sent = Arc<Mutex<Vec<Request<&'static str>>>>;

	fn recording_forward(sent: &Sent) -> Arc<dyn Forward<&'static str, Reply>> {
		let sent = sent.clone();

		Arc::new(move |request: Request<&'static str>| -> ResponseStream<Reply> {
			let authorization = request.metadata.get(AUTHORIZATION).cloned();
			let status = if authorization.as_deref() == Some("Bearer stale") { 401 } else { 200 };

			sent.lock().push(request);

			stream::iter([Reply { status, authorization }]).boxed()
		})
	}

	fn coordinator(
		store: &Arc<MemoryStorage<BearerToken>>,
		calls: &Arc<AtomicUsize>,
	) -> RefreshCoordinator<BearerToken, Reply> {
		let calls = calls.clone();
		let executor = move |_: BearerToken, _: ()| {
			calls.fetch_add(1, Ordering::SeqCst);

			async { Ok::<_, ExecutorError>(BearerToken::new("fresh")) }
		};

		RefreshCoordinator::new(store.clone(), executor, ())
			.with_bearer_headers()
			.with_should_refresh(|reply: &Reply| reply.status == 401)
	}

	#[tokio::test]
	async fn terminal_link_still_refreshes_proactively() {
		let store = Arc::new(
			MemoryStorage::new()
				.with_credential(BearerToken::new("stale").with_expires_in(Duration::hours(-1))),
		);
		let calls = Arc::new(AtomicUsize::new(0));
		let coordinator = coordinator(&store, &calls);
		let replies: Vec<Reply> = coordinator.intercept(Request::new("ping"), None).collect().await;

		assert!(replies.is_empty());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
		assert_eq!(
			store.snapshot().map(|token| token.access_token.expose().to_owned()),
			Some("fresh".to_owned())
		);
	}

	#[tokio::test]
	async fn caller_metadata_survives_and_credential_keys_win() {
		let store = Arc::new(MemoryStorage::new().with_credential(BearerToken::new("fresh")));
		let calls = Arc::new(AtomicUsize::new(0));
		let sent = Sent::default();
		let coordinator = coordinator(&store, &calls);
		let request = Request::new("ping")
			.with_entry(AUTHORIZATION, "Bearer caller-supplied")
			.with_entry("x-request-id", "42");
		let replies: Vec<Reply> =
			coordinator.intercept(request, Some(recording_forward(&sent))).collect().await;

		assert_eq!(replies.len(), 1);

		let sent = sent.lock();

		assert_eq!(sent[0].metadata.get(AUTHORIZATION).map(String::as_str), Some("Bearer fresh"));
		assert_eq!(sent[0].metadata.get("x-request-id").map(String::as_str), Some("42"));
		assert_eq!(calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn rejection_without_credential_passes_through() {
		let store = Arc::new(MemoryStorage::new().with_credential(BearerToken::new("stale")));
		let calls = Arc::new(AtomicUsize::new(0));
		let coordinator = coordinator(&store, &calls);
		let cleared = store.clone();
		let forward: Arc<dyn Forward<&'static str, Reply>> =
			Arc::new(move |_: Request<&'static str>| -> ResponseStream<Reply> {
				let cleared = cleared.clone();

				stream::once(async move {
					cleared.clear().await.expect("Memory clears should not fail.");

					Reply { status: 401, authorization: None }
				})
				.boxed()
			});
		let replies: Vec<Reply> =
			coordinator.intercept(Request::new("ping"), Some(forward)).collect().await;

		assert_eq!(replies, [Reply { status: 401, authorization: None }]);
		assert_eq!(calls.load(Ordering::SeqCst), 0);
	}

	#[tokio::test]
	async fn retry_replaces_the_rest_of_the_original_stream() {
		let store = Arc::new(MemoryStorage::new().with_credential(BearerToken::new("stale")));
		let calls = Arc::new(AtomicUsize::new(0));
		let coordinator = coordinator(&store, &calls);
		let forward: Arc<dyn Forward<&'static str, Reply>> =
			Arc::new(|request: Request<&'static str>| -> ResponseStream<Reply> {
				let authorization = request.metadata.get(AUTHORIZATION).cloned();

				if authorization.as_deref() == Some("Bearer stale") {
					stream::iter([
						Reply { status: 401, authorization: authorization.clone() },
						Reply { status: 200, authorization: Some("never yielded".into()) },
					])
					.boxed()
				} else {
					stream::iter([
						Reply { status: 200, authorization: authorization.clone() },
						Reply { status: 200, authorization },
					])
					.boxed()
				}
			});
		let replies: Vec<Reply> =
			coordinator.intercept(Request::new("ping"), Some(forward)).collect().await;

		assert_eq!(replies.len(), 2);
		assert!(replies.iter().all(|reply| {
			reply.status == 200 && reply.authorization.as_deref() == Some("Bearer fresh")
		}));
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}
}
