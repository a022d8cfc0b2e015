//! Hardened git process execution.
//!
//! Every invocation passes an allow-list and argument sanitization before a
//! process is spawned, runs under a deadline, and has its captured output
//! capped. Failures come back as typed [`repolens_core::LensError`]s; nothing
//! is retried here.

pub mod executor;
pub mod policy;

pub use executor::{CommandExecutor, CommandOutput, ExitInfo};
pub use policy::{CommandPolicy, MAX_ARG_LEN};
