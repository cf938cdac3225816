//! Transport clients handed to refresh executors.
//!
//! Every refresh acquires a client through [`TransportProvider::acquire`] right before the
//! executor runs and moves it into the executor call, so the client is released as soon as the
//! call resolves. Executors that do not talk to the network can use the `()` provider.

// std
use std::time::Duration as StdDuration;
// crates.io
#[cfg(feature = "reqwest")] use reqwest::redirect::Policy;
// self
use crate::{_prelude::*, error::TransportError};

/// Source of transport clients for refresh calls.
pub trait TransportProvider
where
	Self: 'static + Send + Sync,
{
	/// Client type handed to the executor.
	type Client: 'static + Send;

	/// Acquires a client scoped to a single refresh call.
	fn acquire(&self) -> Result<Self::Client, TransportError>;
}
impl TransportProvider for () {
	type Client = ();

	fn acquire(&self) -> Result<Self::Client, TransportError> {
		Ok(())
	}
}

/// Default timeout applied to freshly built refresh clients.
pub const DEFAULT_REFRESH_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Reqwest-backed [`TransportProvider`].
///
/// By default every refresh receives a freshly built client that does not follow redirects, since
/// token endpoints answer directly. [`ReqwestTransport::with_client`] shares one pooled client
/// instead; reqwest clients are reference-counted, so each refresh then gets a cheap clone.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
pub struct ReqwestTransport(ReqwestSource);
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug)]
enum ReqwestSource {
	Fresh { timeout: StdDuration },
	Shared(ReqwestClient),
}
#[cfg(feature = "reqwest")]
impl ReqwestTransport {
	/// Builds a fresh client per refresh with the provided request timeout.
	pub fn fresh(timeout: StdDuration) -> Self {
		Self(ReqwestSource::Fresh { timeout })
	}

	/// Hands out clones of an existing client.
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(ReqwestSource::Shared(client))
	}
}
#[cfg(feature = "reqwest")]
impl Default for ReqwestTransport {
	fn default() -> Self {
		Self::fresh(DEFAULT_REFRESH_TIMEOUT)
	}
}
#[cfg(feature = "reqwest")]
impl TransportProvider for ReqwestTransport {
	type Client = ReqwestClient;

	fn acquire(&self) -> Result<Self::Client, TransportError> {
		match &self.0 {
			ReqwestSource::Fresh { timeout } => Ok(ReqwestClient::builder()
				.redirect(Policy::none())
				.timeout(*timeout)
				.build()?),
			ReqwestSource::Shared(client) => Ok(client.clone()),
		}
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn unit_provider_always_succeeds() {
		assert!(().acquire().is_ok());
	}

	#[cfg(feature = "reqwest")]
	#[test]
	fn reqwest_transport_builds_and_shares_clients() {
		assert!(ReqwestTransport::default().acquire().is_ok());

		let shared = ReqwestTransport::with_client(ReqwestClient::new());

		assert!(shared.acquire().is_ok());
	}
}
