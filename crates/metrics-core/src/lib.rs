//! Pure checkpoint analytics: summary metrics, population history, and panel read models.

mod history;
mod inspect;
mod summary;

use std::fmt;
use std::str::FromStr;

use contracts::MORAL_AGENT_TYPE;

pub use history::agent_history;
pub use inspect::{agent_detail, agent_roster, grid_view, timeline_bounds, DEFAULT_RECENT_ACTIONS};
pub use summary::{compute_metrics, compute_metrics_with};

/// How an agent's `type` label is compared against `"moral"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoralLabelMatch {
    #[default]
    Exact,
    CaseInsensitive,
}

impl MoralLabelMatch {
    pub fn is_moral(self, label: &str) -> bool {
        match self {
            Self::Exact => label == MORAL_AGENT_TYPE,
            Self::CaseInsensitive => label.eq_ignore_ascii_case(MORAL_AGENT_TYPE),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::CaseInsensitive => "case_insensitive",
        }
    }
}

impl fmt::Display for MoralLabelMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MoralLabelMatch {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "exact" | "case_sensitive" => Ok(Self::Exact),
            "case_insensitive" | "insensitive" => Ok(Self::CaseInsensitive),
            other => Err(format!("unknown moral label match policy: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsConfig {
    pub moral_label_match: MoralLabelMatch,
}
