//! Stage-kind tags as they appear in explain output.
//!
//! Classic plan stages are upper case. Slot-based execution stages are
//! lower case.

pub const IXSCAN: &str = "IXSCAN";
pub const FETCH: &str = "FETCH";
pub const COLLSCAN: &str = "COLLSCAN";
pub const OR: &str = "OR";

/// Slot-based execution stage names
pub mod sbe {
    /// Index access with seek bounds
    pub const IXSEEK: &str = "ixseek";
    /// Index access over the full key range
    pub const IXSCAN: &str = "ixscan";
    pub const SEEK: &str = "seek";
    pub const NLJ: &str = "nlj";
    pub const LIMIT: &str = "limit";
    pub const FILTER: &str = "filter";
    pub const SCAN: &str = "scan";
    pub const UNION: &str = "union";
    pub const UNIQUE: &str = "unique";
}

/// Returns true for any stage that reads an index, in either engine
pub fn is_index_access(kind: &str) -> bool {
    kind == IXSCAN || kind == sbe::IXSEEK || kind == sbe::IXSCAN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_access_kinds() {
        assert!(is_index_access("IXSCAN"));
        assert!(is_index_access("ixseek"));
        assert!(is_index_access("ixscan"));
        assert!(!is_index_access("FETCH"));
        assert!(!is_index_access("seek"));
    }
}
