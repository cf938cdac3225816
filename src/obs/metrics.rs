// self
use crate::obs::{FlowKind, FlowOutcome};

#[cfg(feature = "metrics")] const FLOW_TOTAL: &str = "token_link_flow_total";
#[cfg(feature = "metrics")] const REFRESH_IN_FLIGHT: &str = "token_link_refresh_in_flight";

/// Increments the flow counter; failures carry an extra `reason` label.
pub fn count_outcome(kind: FlowKind, outcome: FlowOutcome, reason: Option<&'static str>) {
	#[cfg(feature = "metrics")]
	match reason {
		Some(reason) => metrics::counter!(
			FLOW_TOTAL,
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str(),
			"reason" => reason
		)
		.increment(1),
		None => metrics::counter!(
			FLOW_TOTAL,
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1),
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome, reason);
	}
}

/// Holds the in-flight refresh gauge up for as long as it lives.
///
/// Dropping the guard lowers the gauge, so a cancelled executor run is accounted for as well.
#[derive(Debug)]
pub struct InFlightGuard {
	_private: (),
}
impl InFlightGuard {
	/// Raises the gauge by one.
	pub fn enter() -> Self {
		#[cfg(feature = "metrics")]
		metrics::gauge!(REFRESH_IN_FLIGHT).increment(1.);

		Self { _private: () }
	}
}
impl Drop for InFlightGuard {
	fn drop(&mut self) {
		#[cfg(feature = "metrics")]
		metrics::gauge!(REFRESH_IN_FLIGHT).decrement(1.);
	}
}
