//! A team of AI agents that grows a business: a manager that plans and
//! delegates, and five specialists for research, growth, sales,
//! operations and brand.
//!
//! The crate includes a CLI tool for using in the terminal. And you can also
//! use it as a library to bring the team into your own host apps:
//!
//! ```no_run
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use autoteam::{Settings, TeamBuilder};
//!
//! let settings = Settings::from_env()?;
//! let team = TeamBuilder::from_settings(&settings).build()?;
//! let result = team.run("Find our first 100 customers", None, None, 10).await?;
//! println!("{}", result.result.unwrap_or_default());
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

pub mod prompts;
pub mod settings;
mod team;
pub mod tools;

pub use settings::{Settings, SettingsBuilder, SettingsError};
pub use team::{
    AgentDescriptor, DEFAULT_MAX_ITERATIONS, Team, TeamBuilder, TeamError,
};

/// Re-exports of [`autoteam_core`] crate.
pub mod core {
    pub use autoteam_core::*;
}

/// Re-exports of [`autoteam_cost`] crate.
pub mod cost {
    pub use autoteam_cost::*;
}
