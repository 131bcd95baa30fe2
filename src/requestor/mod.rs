//! Explain requests and the sources that answer them
//!
//! A source is anything that can run a hinted find in explain mode: the
//! in-process engine, or a document captured from a real server.
//!
//! Failures from the source are surfaced as command failures and are never
//! retried here.

mod errors;
mod request;
mod source;

pub use errors::{RequestError, RequestResult};
pub use request::{ExplainRequest, Hint};
pub use source::{EngineCapabilities, ExplainSource, RecordedExplain};
