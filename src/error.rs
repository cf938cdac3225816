//! Error taxonomy shared by the refresh protocol, credential stores, and transport providers.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Boxed error raised by injected collaborators.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Reference-counted error source; lets one refresh outcome be handed to every waiting caller.
pub type SharedError = Arc<dyn StdError + Send + Sync>;

/// Canonical error surfaced by [`RefreshCoordinator::refresh_if_needed`].
///
/// The request pipeline never yields these; they reach direct callers of the refresh
/// protocol only, so those callers can tell a revoked session apart from a temporary failure.
///
/// [`RefreshCoordinator::refresh_if_needed`]: crate::coordinator::RefreshCoordinator::refresh_if_needed
#[derive(Clone, Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// A transport client for the refresh call could not be acquired.
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Refresh was requested while no credential is stored.
	#[error("No credential is stored, so there is nothing to refresh.")]
	NoCredential,
	/// The executor reported the credential as permanently invalid; it has been cleared.
	#[error("Credential has been revoked.")]
	Revoked,
	/// The executor failed for any other reason; the stored credential is untouched.
	#[error("Refresh executor failed.")]
	Executor {
		/// Failure raised by the injected executor.
		#[source]
		source: SharedError,
	},
}
impl Error {
	/// Wraps an executor failure.
	pub fn executor(source: impl Into<BoxError>) -> Self {
		Self::Executor { source: Arc::from(source.into()) }
	}

	/// Returns `true` when the failure means the session is gone for good.
	pub fn is_revoked(&self) -> bool {
		matches!(self, Self::Revoked)
	}

	/// Stable, secret-free label for the failure class, used as a metric label and log field.
	pub const fn reason(&self) -> &'static str {
		match self {
			Self::Storage(_) => "storage",
			Self::Transport(_) => "transport",
			Self::NoCredential => "no_credential",
			Self::Revoked => "revoked",
			Self::Executor { .. } => "executor",
		}
	}
}

/// Outcome signaled by a [`RefreshExecutor`](crate::coordinator::RefreshExecutor) that could not
/// mint a replacement credential.
#[derive(Debug, ThisError)]
pub enum ExecutorError {
	/// The credential cannot be refreshed and must be discarded.
	#[error("Credential was revoked by the issuer.")]
	Revoked,
	/// Any other failure; the caller may try again later.
	#[error("Credential refresh failed.")]
	Failed {
		/// Underlying failure.
		#[source]
		source: BoxError,
	},
}
impl ExecutorError {
	/// Wraps an arbitrary failure as a non-revoking executor error.
	pub fn failed(src: impl Into<BoxError>) -> Self {
		Self::Failed { source: src.into() }
	}
}

/// Failures raised while acquiring the transport client handed to the executor.
#[derive(Clone, Debug, ThisError)]
pub enum TransportError {
	/// The transport client could not be constructed.
	#[error("Transport client could not be constructed.")]
	ClientBuild {
		/// Underlying builder failure.
		#[source]
		source: SharedError,
	},
}
impl TransportError {
	/// Wraps a transport's builder failure.
	pub fn client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::ClientBuild { source: Arc::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::client_build(e)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::store::StoreError;

	#[test]
	fn store_error_converts_with_source() {
		let store_error = StoreError::Backend { message: "disk unavailable".into() };
		let error: Error = store_error.clone().into();

		assert!(matches!(error, Error::Storage(_)));
		assert!(error.to_string().contains("disk unavailable"));

		let source = StdError::source(&error)
			.expect("Storage errors should expose the original store error as their source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn executor_errors_share_their_source_across_clones() {
		let error = Error::executor("upstream timed out");
		let cloned = error.clone();

		let (Error::Executor { source: a }, Error::Executor { source: b }) = (&error, &cloned)
		else {
			panic!("Executor errors should stay executor errors after cloning.");
		};

		assert!(Arc::ptr_eq(a, b));
		assert_eq!(a.to_string(), "upstream timed out");
		assert!(!error.is_revoked());
		assert!(Error::Revoked.is_revoked());
		assert_eq!(error.reason(), "executor");
		assert_eq!(Error::NoCredential.reason(), "no_credential");
	}
}
