use serde::{Deserialize, Serialize};

/// Tunables of the parse engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParseOptions {
    /// Upper bound on simultaneously alive stack versions.
    pub max_versions: usize,
    /// Non-extra tokens examined when looking for a recovery point.
    pub recovery_lookahead: usize,
    /// Deepest stack entry a recovery may pop to.
    pub max_recovery_depth: usize,
    /// Reuse subtrees of the previous tree when reparsing.
    pub reuse: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { max_versions: 6, recovery_lookahead: 8, max_recovery_depth: 64, reuse: true }
    }
}
