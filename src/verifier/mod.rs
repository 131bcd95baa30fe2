//! Stage verification
//!
//! Asserts that collected stages report the expected index identity.
//! Verification is fail-fast: the first offending stage aborts the pass
//! and is carried in the error for diagnosis.

mod errors;
mod verifier;

pub use errors::{VerifyError, VerifyResult};
pub use verifier::{IndexNameVerifier, INDEX_NAME_FIELD};
