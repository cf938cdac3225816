// self
use crate::{
	_prelude::*,
	obs::{FlowKind, FlowOutcome},
};

/// Future returned by [`FlowSpan::instrument`]; the bare future when tracing is off.
#[cfg(feature = "tracing")]
pub type InstrumentedFlow<F> = tracing::instrument::Instrumented<F>;
/// Future returned by [`FlowSpan::instrument`]; the bare future when tracing is off.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedFlow<F> = F;

/// Debug span wrapping one stage of a coordinator flow.
#[derive(Clone, Debug)]
pub struct FlowSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl FlowSpan {
	/// Opens a `token_link.flow` span for `stage` of `kind`.
	pub fn new(kind: FlowKind, stage: &'static str) -> Self {
		#[cfg(feature = "tracing")]
		{
			Self { span: tracing::debug_span!("token_link.flow", flow = kind.as_str(), stage) }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = (kind, stage);

			Self {}
		}
	}

	/// Attaches the span to `fut`; it is entered on every poll and never held across `.await`.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedFlow<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			tracing::Instrument::instrument(fut, self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}
}

/// Emits a `debug` event describing `outcome`.
pub fn trace_outcome(kind: FlowKind, outcome: FlowOutcome, error: Option<&Error>) {
	#[cfg(feature = "tracing")]
	match error {
		Some(error) => tracing::debug!(
			flow = kind.as_str(),
			outcome = outcome.as_str(),
			reason = error.reason(),
			error = %error,
			"token_link flow outcome"
		),
		None => tracing::debug!(
			flow = kind.as_str(),
			outcome = outcome.as_str(),
			"token_link flow outcome"
		),
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (kind, outcome, error);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn events_accept_errors() {
		trace_outcome(FlowKind::Intercept, FlowOutcome::Failure, Some(&Error::NoCredential));
		trace_outcome(FlowKind::Refresh, FlowOutcome::Success, None);
	}

	#[tokio::test]
	async fn instrumented_futures_keep_their_output() {
		let span = FlowSpan::new(FlowKind::Intercept, "prepare");
		let output = span.instrument(async { "sent" }).await;

		assert_eq!(output, "sent");
	}
}
