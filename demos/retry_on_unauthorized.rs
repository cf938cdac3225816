//! Demonstrates the retry-once pipeline against an in-memory service.
//!
//! 1. Seed a [`MemoryStorage`] with a bearer token the service no longer accepts.
//! 2. Build a [`RefreshCoordinator`] that maps `401` responses to "credential rejected".
//! 3. Send a request through the coordinator; the rejection triggers one refresh and one resend.
//! 4. Fire a burst of concurrent requests with a fresh token and show they never refresh.

// std
use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};
// crates.io
use color_eyre::Result;
use futures::{StreamExt, future, stream};
// self
use token_link::{
	RefreshCoordinator, Request,
	credential::{AUTHORIZATION, BearerToken},
	error::ExecutorError,
	link::{Chain, Forward, ResponseStream},
	store::MemoryStorage,
};

const ACCEPTED: &str = "Bearer access-2";

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let store = Arc::new(
		MemoryStorage::new()
			.with_credential(BearerToken::new("access-1").with_refresh_token("refresh-1")),
	);
	let refreshes = Arc::new(AtomicUsize::new(0));
	let counter = refreshes.clone();
	let coordinator: RefreshCoordinator<BearerToken, u16> = RefreshCoordinator::new(
		store.clone(),
		move |current: BearerToken, _: ()| {
			let issued = counter.fetch_add(1, Ordering::SeqCst) + 2;

			future::ready(match current.refresh_token {
				Some(secret) => Ok(BearerToken::new(format!("access-{issued}"))
					.with_refresh_token(secret.expose())),
				None => Err(ExecutorError::Revoked),
			})
		},
		(),
	)
	.with_bearer_headers()
	.with_should_refresh(|status: &u16| *status == 401);
	let service = |request: Request<&'static str>| -> ResponseStream<u16> {
		let status = match request.metadata.get(AUTHORIZATION).map(String::as_str) {
			Some(ACCEPTED) => 200,
			_ => 401,
		};

		println!("Service received {} and answered {status}.", request.body);

		stream::iter([status]).boxed()
	};
	let chain = Chain::new().with_link(coordinator.clone()).with_terminal(service);
	let statuses: Vec<u16> = chain.forward(Request::new("GET /profile")).collect().await;

	println!("Caller observed {statuses:?} after {} refresh.", refreshes.load(Ordering::SeqCst));

	let burst = (0..4).map(|_| chain.forward(Request::new("GET /feed")).collect::<Vec<u16>>());

	for statuses in future::join_all(burst).await {
		println!("Burst caller observed {statuses:?}.");
	}

	println!(
		"Total refreshes: {}; coordinator state: {:?}.",
		refreshes.load(Ordering::SeqCst),
		coordinator.state().await?
	);

	Ok(())
}
