//! Terminal side of the reconciliation engine
//!
//! Planning, diffing and execution live in the `declarative` crate; this
//! module renders plans and drives execution with a progress bar and a
//! confirmation prompt.

pub mod differ;
pub mod executor;

pub use differ::{display_plan, display_refresh};
pub use executor::{BarProgress, PromptConfirm, print_failures, print_summary};
