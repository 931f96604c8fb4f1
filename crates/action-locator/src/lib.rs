//! Selector resolution for recorded steps
//!
//! Turns the ordered selector candidates of a step into one live element:
//! - candidates are tried strictly in declared order
//! - each candidate polls inside its own slice of the step timeout
//! - ambiguous and invalid candidates are skipped, never selected
//! - failure reports every attempted strategy with its last observation

pub mod errors;
pub mod resolver;
pub mod strategies;
pub mod types;

pub use errors::*;
pub use resolver::*;
pub use strategies::*;
pub use types::*;
