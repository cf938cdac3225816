//! Bearer token credential and its header mapping.

// self
use crate::{_prelude::*, credential::{Credential, TokenSecret}, request::Metadata};

/// Metadata key carrying the bearer credential.
pub const AUTHORIZATION: &str = "authorization";

/// Access token with an optional refresh secret and absolute expiry.
#[derive(Clone, Serialize, Deserialize)]
pub struct BearerToken {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Refresh secret, if the issuer handed one out.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub refresh_token: Option<TokenSecret>,
	/// Expiry instant; `None` never expires.
	#[serde(default, skip_serializing_if = "Option::is_none", with = "time::serde::rfc3339::option")]
	pub expires_at: Option<OffsetDateTime>,
}
impl BearerToken {
	/// Creates a token without refresh secret or expiry.
	pub fn new(access_token: impl Into<String>) -> Self {
		Self { access_token: TokenSecret::new(access_token), refresh_token: None, expires_at: None }
	}

	/// Attaches a refresh secret.
	pub fn with_refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets an absolute expiry instant.
	pub fn with_expires_at(mut self, instant: OffsetDateTime) -> Self {
		self.expires_at = Some(instant);

		self
	}

	/// Sets the expiry relative to the current clock.
	pub fn with_expires_in(self, duration: Duration) -> Self {
		self.with_expires_at(OffsetDateTime::now_utc() + duration)
	}

	/// Formats the `authorization` header value.
	pub fn authorization(&self) -> String {
		format!("Bearer {}", self.access_token.expose())
	}
}
impl Credential for BearerToken {
	fn is_expired_at(&self, instant: OffsetDateTime) -> bool {
		self.expires_at.is_some_and(|expires_at| instant >= expires_at)
	}
}
impl Debug for BearerToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BearerToken")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Header builder for [`BearerToken`] credentials.
pub fn bearer_headers(token: &BearerToken) -> Metadata {
	Metadata::from([(AUTHORIZATION.to_owned(), token.authorization())])
}
