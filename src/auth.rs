//! Session credentials: the persisted token pair and its redacting secret wrapper.

pub mod token;

pub use token::{pair::*, secret::*};
