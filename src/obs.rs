//! Optional observability helpers for client requests.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `storefront_client.request` with the `kind`
//!   (protected/public/refresh) and `stage` (call site) fields, plus warnings for recoverable
//!   anomalies such as malformed stored sessions.
//! - Enable `metrics` to increment the `storefront_client_request_total` counter for every
//!   attempt/success/failure, labeled by `kind` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Emits a warning through `tracing` when the feature is enabled.
macro_rules! warn_event {
	($($arg:tt)+) => {{
		#[cfg(feature = "tracing")]
		::tracing::warn!($($arg)+);
		#[cfg(not(feature = "tracing"))]
		let _ = format_args!($($arg)+);
	}};
}
pub(crate) use warn_event;

/// Request kinds observed by the client.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestKind {
	/// Request carrying the session's bearer credential.
	Protected,
	/// Unauthenticated request.
	Public,
	/// Token refresh call issued by a refresh leader.
	Refresh,
}
impl RequestKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestKind::Protected => "protected",
			RequestKind::Public => "public",
			RequestKind::Refresh => "refresh",
		}
	}
}
impl Display for RequestKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestOutcome {
	/// Entry to a client call.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl RequestOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			RequestOutcome::Attempt => "attempt",
			RequestOutcome::Success => "success",
			RequestOutcome::Failure => "failure",
		}
	}
}
impl Display for RequestOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
