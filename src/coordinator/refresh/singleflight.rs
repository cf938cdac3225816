//! Shared in-flight slot backing the refresh protocol.
//!
//! The slot holds at most one [`Shared`] future. The first caller that finds it empty installs a
//! new one; everyone else clones the installed handle. The installed future empties the slot once
//! its own work has produced a result, so the next caller starts a fresh attempt. A generation
//! number keeps a finished flight from evicting a newer one.
//!
//! A panic inside the work is caught and turned into [`Error::Executor`], so the slot is released
//! and every waiter sees an ordinary failure instead of a poisoned handle.

// std
use std::{any::Any, panic::AssertUnwindSafe, sync::Weak};
// crates.io
use futures::future::{BoxFuture, FutureExt, Shared};
// self
use crate::_prelude::*;

/// Handle every caller of one flight awaits.
pub(crate) type FlightHandle<T> = Shared<BoxFuture<'static, Result<T>>>;

/// Whether the caller started the flight or joined one already running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum FlightRole {
	Leader,
	Follower,
}

struct InFlight<T> {
	generation: u64,
	handle: FlightHandle<T>,
}

struct FlightState<T> {
	next_generation: u64,
	current: Option<InFlight<T>>,
}

/// Mutex-guarded optional shared future.
pub(crate) struct SingleFlight<T> {
	state: Arc<Mutex<FlightState<T>>>,
}
impl<T> SingleFlight<T>
where
	T: 'static + Clone + Send + Sync,
{
	pub(crate) fn new() -> Self {
		Self { state: Arc::new(Mutex::new(FlightState { next_generation: 0, current: None })) }
	}

	/// Joins the live flight, or installs one built from `start` when none is live.
	///
	/// Check and install happen under one lock, so concurrent callers can never install two.
	pub(crate) fn join_or_start<F>(&self, start: impl FnOnce() -> F) -> (FlightHandle<T>, FlightRole)
	where
		F: 'static + Send + Future<Output = Result<T>>,
	{
		let mut state = self.state.lock();

		if let Some(in_flight) = &state.current {
			return (in_flight.handle.clone(), FlightRole::Follower);
		}

		let generation = state.next_generation;

		state.next_generation = state.next_generation.wrapping_add(1);

		let slot = Arc::downgrade(&self.state);
		let work = start();
		let handle = async move {
			let outcome = AssertUnwindSafe(work)
				.catch_unwind()
				.await
				.unwrap_or_else(|payload| Err(Error::executor(panic_message(payload.as_ref()))));

			Self::release(&slot, generation);

			outcome
		}
		.boxed()
		.shared();

		state.current = Some(InFlight { generation, handle: handle.clone() });

		(handle, FlightRole::Leader)
	}

	fn release(slot: &Weak<Mutex<FlightState<T>>>, generation: u64) {
		let Some(state) = slot.upgrade() else {
			return;
		};
		let mut state = state.lock();

		if state.current.as_ref().is_some_and(|in_flight| in_flight.generation == generation) {
			state.current = None;
		}
	}
}
impl<T> SingleFlight<T> {
	/// Returns `true` while a flight is installed.
	pub(crate) fn is_active(&self) -> bool {
		self.state.lock().current.is_some()
	}
}
impl<T> Clone for SingleFlight<T> {
	fn clone(&self) -> Self {
		Self { state: self.state.clone() }
	}
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
	let detail = payload
		.downcast_ref::<&str>()
		.copied()
		.or_else(|| payload.downcast_ref::<String>().map(String::as_str))
		.unwrap_or("non-string payload");

	format!("Refresh panicked: {detail}.")
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use futures::future;
	// self
	use super::*;

	#[tokio::test]
	async fn concurrent_callers_share_one_run() {
		let flight = <SingleFlight<u32>>::new();
		let runs = Arc::new(AtomicUsize::new(0));
		let (gate_tx, gate_rx) = futures::channel::oneshot::channel::<()>();
		let gate = gate_rx.shared();
		let start = || {
			let runs = runs.clone();
			let gate = gate.clone();

			async move {
				runs.fetch_add(1, Ordering::SeqCst);
				let _ = gate.await;

				Ok(7)
			}
		};
		let (first, first_role) = flight.join_or_start(start);
		let (second, second_role) = flight.join_or_start(start);

		assert_eq!(first_role, FlightRole::Leader);
		assert_eq!(second_role, FlightRole::Follower);
		assert!(flight.is_active());

		gate_tx.send(()).expect("Gate receiver should still be alive.");

		let (a, b) = future::join(first, second).await;

		assert_eq!(a.expect("Leader should observe the shared value."), 7);
		assert_eq!(b.expect("Follower should observe the shared value."), 7);
		assert_eq!(runs.load(Ordering::SeqCst), 1);
		assert!(!flight.is_active());
	}

	#[tokio::test]
	async fn completed_flight_is_not_reused() {
		let flight = <SingleFlight<u32>>::new();
		let (first, _) = flight.join_or_start(|| async { Err(Error::NoCredential) });

		assert!(matches!(first.await, Err(Error::NoCredential)));
		assert!(!flight.is_active());

		let (second, role) = flight.join_or_start(|| async { Ok(2) });

		assert_eq!(role, FlightRole::Leader);
		assert_eq!(second.await.expect("A fresh flight should run its own work."), 2);
	}

	#[tokio::test]
	async fn panicking_work_fails_the_flight_and_frees_the_slot() {
		let flight = <SingleFlight<u32>>::new();
		let explode = true;
		let (first, _) = flight.join_or_start(move || async move {
			if explode {
				panic!("executor exploded");
			}

			Ok(1)
		});
		let err = first.await.expect_err("A panicking flight should resolve to an error.");

		assert!(matches!(err, Error::Executor { .. }));
		assert!(err.to_string().contains("Refresh executor failed"));
		assert!(StdError::source(&err).is_some_and(|source| {
			source.to_string() == "Refresh panicked: executor exploded."
		}));
		assert!(!flight.is_active());

		let (second, role) = flight.join_or_start(|| async { Ok(3) });

		assert_eq!(role, FlightRole::Leader);
		assert_eq!(second.await.expect("The next flight should run normally."), 3);
	}
}
