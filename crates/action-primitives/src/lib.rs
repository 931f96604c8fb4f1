//! Action executor for replayed steps
//!
//! This crate performs the seven recorded action kinds against a live page:
//! navigate, click, type, select, wait, extract and assert. Interactive
//! actions wait for their target to become interactable, and transient
//! failures get one bounded retry after a short backoff.

pub mod errors;
mod primitives;
pub mod types;
mod waiting;

pub use errors::*;
pub use primitives::*;
pub use types::*;
pub use waiting::*;
