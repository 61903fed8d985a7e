//! A provider-neutral protocol for talking to LLMs.
//!
//! This crate establishes the request and response shapes the agents use
//! to interact with a model provider: a system prompt, tool schemas, the
//! conversation so far, and a stream of events coming back, including
//! token usage and the reason the model stopped.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.
//!
//! Cache hints are advisory. Providers that don't support prompt caching
//! are free to ignore them.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
