//! Human-paced quick-apply automation.
//!
//! A session enumerates search results ([`enumerator`]), waits a randomized
//! interval between attempts ([`rate_limit`]), drives each posting's form
//! through a bounded state machine ([`state_machine`]) and records exactly
//! one outcome per posting ([`recorder`]). The browser itself sits behind
//! the [`port`] traits; [`scripted`] implements them in memory.

// The port traits are only used with generics inside this crate.
#![allow(async_fn_in_trait)]

pub mod anthropic;
pub mod cli;
pub mod config;
pub mod cover_letter;
pub mod demo;
pub mod enumerator;
pub mod error;
pub mod form;
pub mod logging;
pub mod orchestrator;
pub mod port;
pub mod posting;
pub mod profile;
pub mod rate_limit;
pub mod recorder;
pub mod resolver;
pub mod scripted;
pub mod state_machine;
pub mod suspend;
pub mod ui;
