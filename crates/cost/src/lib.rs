//! Cost control for model calls.
//!
//! Everything in this crate is synchronous and performs no I/O. The
//! services are meant to be constructed once and shared by every agent of
//! a team behind an `Arc`:
//!
//! - [`ModelRouter`] picks a model tier and generation parameters for a
//!   task.
//! - [`BudgetManager`] keeps the usage ledger and answers admission
//!   queries against a daily spend ceiling.
//! - [`PromptCachePlanner`] decides which request segments carry a cache
//!   hint and tracks cache statistics.

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod budget;
mod cache;
mod pricing;
mod router;
mod tokens;

pub use budget::*;
pub use cache::*;
pub use pricing::*;
pub use router::*;
pub use tokens::*;
