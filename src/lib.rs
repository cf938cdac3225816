//! Bearer-credential interception for streamed request pipelines.
//!
//! A [`RefreshCoordinator`] attaches credential metadata to outgoing requests, refreshes expired
//! credentials once per burst of concurrent callers, and resubmits a rejected request a single
//! time with the refreshed credential.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod coordinator;
pub mod credential;
pub mod error;
pub mod http;
pub mod link;
pub mod obs;
pub mod request;
pub mod store;

pub use coordinator::{CredentialState, RefreshCoordinator};
pub use error::{Error, Result};
pub use request::{Metadata, Request};

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use futures::StreamExt;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
#[cfg(test)] use {color_eyre as _, httpmock as _};
