//! ixexplain - index identity checks over query explain output
//!
//! Runs a hinted find in explain mode and verifies that every index
//! stage of the execution statistics reports the hinted index by name.
//! Explain output comes from the bundled in-process engine or from a
//! document captured from a server.

pub mod check;
pub mod cli;
pub mod engine;
pub mod explain;
pub mod requestor;
pub mod stages;
pub mod verifier;
