//! Explain index-name check
//!
//! Runs a hinted find in explain mode and asserts that the index stages of
//! the execution statistics report the hinted index. Runs whose engine
//! lacks the required capabilities are skipped, not failed.
//!
//! ```text
//! capabilities -> explain -> extract -> verify -> passed
//!      |                                   |
//!      v                                   v
//!   skipped                              failed
//! ```

mod errors;
mod index_name;
mod report;
mod scenario;

pub use errors::{CheckError, CheckResult};
pub use index_name::{CheckOutcome, IndexNameCheck, SBE_FULL_FLAG};
pub use report::{CheckReport, ReportStatus};
pub use scenario::{Scenario, SCENARIO_COLLECTION};
