//! Token models persisted by the client.

pub mod pair;
pub mod secret;
