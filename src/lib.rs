//! Authenticated REST client for the parts storefront.
//!
//! [`client::ApiClient`] attaches the stored bearer credential to protected calls, refreshes an
//! expired session at most once per [`client::RefreshCoordinator`] no matter how many calls hit a
//! 401 together, and normalizes failures into [`error::Error`]. Sessions persist through any
//! [`store::KeyValueStore`]; the account helpers in [`account`] open and close them.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod account;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod request;
pub mod store;

mod _prelude {
	pub use std::{
		collections::HashMap,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize, de::DeserializeOwned};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use ::http as http_types;
#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
