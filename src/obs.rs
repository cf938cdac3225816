//! Optional observability for the refresh protocol and the request pipeline.
//!
//! # Feature Flags
//!
//! - `tracing`: every flow runs inside a `token_link.flow` debug span carrying `flow` and `stage`,
//!   and each recorded outcome becomes a `debug` event. Failures add a `reason` field plus the
//!   error's display text; credential material never appears.
//! - `metrics`: outcomes increment `token_link_flow_total{flow, outcome[, reason]}` and the
//!   `token_link_refresh_in_flight` gauge tracks executor runs currently in progress.
//!
//! With both features off every helper compiles down to nothing.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Which part of the coordinator produced an outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowKind {
	/// [`refresh_if_needed`](crate::RefreshCoordinator::refresh_if_needed).
	Refresh,
	/// [`intercept`](crate::RefreshCoordinator::intercept).
	Intercept,
}
impl FlowKind {
	/// Label used for the `flow` field.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Refresh => "refresh",
			Self::Intercept => "intercept",
		}
	}
}
impl Display for FlowKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// What happened at one step of a flow.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FlowOutcome {
	/// An executor run or an interception started.
	Attempt,
	/// A caller awaited the refresh already in flight instead of starting one.
	Joined,
	/// The executor produced a replacement credential.
	Success,
	/// A failure reached refresh callers, or the pipeline swallowed one.
	Failure,
	/// The executor revoked the credential and the store was cleared.
	Revoked,
	/// A rejected request was resubmitted with the refreshed credential.
	Retried,
}
impl FlowOutcome {
	/// Label used for the `outcome` field.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Attempt => "attempt",
			Self::Joined => "joined",
			Self::Success => "success",
			Self::Failure => "failure",
			Self::Revoked => "revoked",
			Self::Retried => "retried",
		}
	}
}
impl Display for FlowOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Reports an outcome to every enabled backend.
pub fn record(kind: FlowKind, outcome: FlowOutcome, error: Option<&Error>) {
	count_outcome(kind, outcome, error.map(Error::reason));
	trace_outcome(kind, outcome, error);
}
