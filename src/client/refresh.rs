//! Single-flight token refresh: the leader/follower coordinator and the refresh cycle itself.
//!
//! A protected call that receives a 401 joins the [`RefreshCoordinator`]. The first caller to
//! join while the coordinator is idle becomes the leader and performs the refresh call; callers
//! joining while that cycle is in flight become followers and wait for the leader's outcome.
//! Joining happens synchronously under a lock, so two overlapping cycles can never elect two
//! leaders. When the leader settles, every follower receives the same access token (or the
//! same absence of one) and the coordinator returns to idle. A leader dropped before settling
//! abandons the cycle; its followers join again instead of treating the session as expired.

mod metrics;

pub use metrics::RefreshMetrics;

// std
use std::mem;
// crates.io
use tokio::sync::oneshot;
// self
use crate::{
	_prelude::*,
	auth::{RefreshedTokens, TokenPair, TokenSecret},
	client::ApiClient,
	http::HttpTransport,
	obs::{self, RequestKind, RequestOutcome, RequestSpan},
	request::{Access, OutboundRequest, RequestOptions},
};

type Outcome = Option<TokenSecret>;

/// What a follower observed when its cycle ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
	/// The leader rotated the session.
	Refreshed(TokenSecret),
	/// The leader ran the cycle and the session could not be refreshed.
	Failed,
	/// The leader was dropped before settling; the session is untouched.
	Abandoned,
}

/// Coordinator state.
#[derive(Debug, Default)]
enum RefreshState {
	#[default]
	Idle,
	Refreshing {
		waiters: Vec<oneshot::Sender<Outcome>>,
	},
}

/// Process-wide refresh service shared by every client that uses the same session.
///
/// Instantiate one per session store; clients built with
/// [`ApiClient::with_refresh_coordinator`] share it through an `Arc`.
#[derive(Debug, Default)]
pub struct RefreshCoordinator {
	state: Mutex<RefreshState>,
	/// Counters for elected leaders, joined followers, and cycle outcomes.
	pub metrics: RefreshMetrics,
}
impl RefreshCoordinator {
	/// Joins the current cycle, starting one when idle.
	pub fn join(&self) -> RefreshTicket<'_> {
		let mut state = self.state.lock();

		if let RefreshState::Refreshing { waiters } = &mut *state {
			let (tx, rx) = oneshot::channel();

			waiters.push(tx);
			self.metrics.record_follower();

			return RefreshTicket::Follower(RefreshWaiter(rx));
		}

		*state = RefreshState::Refreshing { waiters: Vec::new() };
		self.metrics.record_cycle();

		RefreshTicket::Leader(RefreshLeader { coordinator: Some(self) })
	}

	/// Returns `true` while a cycle is in flight.
	pub fn is_refreshing(&self) -> bool {
		matches!(*self.state.lock(), RefreshState::Refreshing { .. })
	}

	/// Returns the number of followers parked on the in-flight cycle.
	pub fn waiting(&self) -> usize {
		match &*self.state.lock() {
			RefreshState::Idle => 0,
			RefreshState::Refreshing { waiters } => waiters.len(),
		}
	}

	fn take_waiters(&self) -> Vec<oneshot::Sender<Outcome>> {
		match mem::take(&mut *self.state.lock()) {
			RefreshState::Idle => Vec::new(),
			RefreshState::Refreshing { waiters } => waiters,
		}
	}

	fn release(&self, outcome: Outcome) {
		let waiters = self.take_waiters();

		if outcome.is_some() {
			self.metrics.record_success();
		} else {
			self.metrics.record_failure();
		}

		for waiter in waiters {
			// A follower that stopped waiting has nothing left to release.
			let _ = waiter.send(outcome.clone());
		}
	}

	// Closing the senders wakes every follower with `RefreshOutcome::Abandoned`.
	fn abandon(&self) {
		drop(self.take_waiters());
		self.metrics.record_abandoned();
	}
}

/// Role assigned by [`RefreshCoordinator::join`].
#[derive(Debug)]
pub enum RefreshTicket<'a> {
	/// The caller must perform the refresh and settle the cycle.
	Leader(RefreshLeader<'a>),
	/// The caller waits for the leader's outcome.
	Follower(RefreshWaiter),
}

/// Leadership of one refresh cycle.
///
/// Dropping the leader without calling [`RefreshLeader::settle`] abandons the cycle: the
/// coordinator returns to idle and followers see [`RefreshOutcome::Abandoned`].
#[derive(Debug)]
pub struct RefreshLeader<'a> {
	coordinator: Option<&'a RefreshCoordinator>,
}
impl RefreshLeader<'_> {
	/// Releases every follower with `outcome` and returns the coordinator to idle.
	pub fn settle(mut self, outcome: Option<TokenSecret>) {
		if let Some(coordinator) = self.coordinator.take() {
			coordinator.release(outcome);
		}
	}
}
impl Drop for RefreshLeader<'_> {
	fn drop(&mut self) {
		if let Some(coordinator) = self.coordinator.take() {
			coordinator.abandon();
		}
	}
}

/// Follower handle resolving to the leader's outcome.
#[derive(Debug)]
pub struct RefreshWaiter(oneshot::Receiver<Outcome>);
impl RefreshWaiter {
	/// Waits for the cycle to end.
	pub async fn wait(self) -> RefreshOutcome {
		match self.0.await {
			Ok(Some(token)) => RefreshOutcome::Refreshed(token),
			Ok(None) => RefreshOutcome::Failed,
			Err(_) => RefreshOutcome::Abandoned,
		}
	}
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
	refresh_token: &'a str,
}

impl<T> ApiClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Obtains a token to retry a call whose bearer `rejected` drew a 401.
	///
	/// Returns `None` when the session cannot be refreshed; the stored pair has been cleared by
	/// the cycle's leader in that case. A follower whose leader was dropped joins again.
	pub(crate) async fn refreshed_access_token(&self, rejected: &TokenSecret) -> Outcome {
		loop {
			match self.refresh.join() {
				RefreshTicket::Leader(leader) => {
					let outcome = self.run_refresh_cycle(rejected).await;

					leader.settle(outcome.clone());

					return outcome;
				},
				RefreshTicket::Follower(waiter) => match waiter.wait().await {
					RefreshOutcome::Refreshed(token) => return Some(token),
					RefreshOutcome::Failed => return None,
					RefreshOutcome::Abandoned => {
						obs::warn_event!("Session refresh leader was dropped; joining again.");
					},
				},
			}
		}
	}

	async fn run_refresh_cycle(&self, rejected: &TokenSecret) -> Outcome {
		const KIND: RequestKind = RequestKind::Refresh;

		let span = RequestSpan::new(KIND, "refresh_session");

		obs::record_request_outcome(KIND, RequestOutcome::Attempt);

		let outcome = span
			.instrument(async {
				let current = match self.tokens.load().await {
					Ok(current) => current,
					Err(e) => {
						obs::warn_event!("Session refresh could not read stored tokens: {e}.");

						return self.expire_session().await;
					},
				};
				let Some(current) = current else {
					return None;
				};

				// Another cycle already rotated the pair after this caller's request left.
				if let Some(access) = current.access_token().filter(|access| *access != rejected) {
					return Some(access.clone());
				}

				let Some(refresh_token) = current.refresh_token().cloned() else {
					return self.expire_session().await;
				};

				match self.rotate_session(&refresh_token).await {
					Ok(pair) => Some(pair.access_token),
					Err(e) => {
						obs::warn_event!("Session refresh failed: {e}.");

						self.expire_session().await
					},
				}
			})
			.await;

		match &outcome {
			Some(_) => obs::record_request_outcome(KIND, RequestOutcome::Success),
			None => obs::record_request_outcome(KIND, RequestOutcome::Failure),
		}

		outcome
	}

	async fn rotate_session(&self, refresh_token: &TokenSecret) -> Result<TokenPair> {
		let path = self.config.refresh_path.clone();
		let options = RequestOptions::post()
			.json(&RefreshRequest { refresh_token: refresh_token.expose() })?;
		let request = OutboundRequest::new(path, options, Access::Public);
		let response = self.execute(&request, None).await?;
		let response = Self::ensure_success(&request.path, response)?;
		let refreshed = Self::decode::<RefreshedTokens>(&request.path, response.body())?;
		let pair = refreshed.into_pair(refresh_token);

		self.tokens.save(&pair).await?;

		Ok(pair)
	}

	async fn expire_session(&self) -> Outcome {
		if let Err(e) = self.tokens.clear().await {
			obs::warn_event!("Expired session could not be cleared: {e}.");
		}

		None
	}
}
