//! Refinement strategies and candidate grouping.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a weak criterion gets its replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// One blind rewrite, accepted as is
    Automated,

    /// Blind rewrites reviewed and chosen by the arbiter
    ExpertInTheLoop,

    /// One grounded rewrite per document, averaged into one
    ContextAware,

    /// One rewrite contrasting positive and negative example contexts
    ContextDiscriminative,

    /// Grounded rewrites with annotations, averaged per group, chosen by the arbiter
    Advanced,
}

impl Strategy {
    pub const ALL: [Strategy; 5] = [
        Strategy::Automated,
        Strategy::ExpertInTheLoop,
        Strategy::ContextAware,
        Strategy::ContextDiscriminative,
        Strategy::Advanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Automated => "automated",
            Strategy::ExpertInTheLoop => "expert-in-the-loop",
            Strategy::ContextAware => "context-aware",
            Strategy::ContextDiscriminative => "context-discriminative",
            Strategy::Advanced => "advanced",
        }
    }

    /// Whether the strategy consults the arbiter.
    pub fn needs_arbiter(&self) -> bool {
        matches!(self, Strategy::ExpertInTheLoop | Strategy::Advanced)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown strategy '{}', expected one of: {}",
                    s,
                    Strategy::ALL.map(|st| st.as_str()).join(", ")
                )
            })
    }
}

/// Split candidates into at most `groups` contiguous groups of equal size,
/// the last one possibly shorter.
pub fn group_candidates(candidates: Vec<String>, groups: usize) -> Vec<Vec<String>> {
    let n = candidates.len();
    if n == 0 || groups == 0 {
        return Vec::new();
    }
    let size = n.div_ceil(groups.min(n));
    candidates.chunks(size).map(<[String]>::to_vec).collect()
}
