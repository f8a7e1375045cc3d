//! How an interaction decides that it is nested inside another interaction
//! of the same context instance.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Nested-call detection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReentrancyMode {
    /// Count active calls per context instance.
    #[default]
    DepthCounter,
    /// Look at the top layer of the first declared role's player and treat
    /// the call as nested when it already belongs to this instance.
    FirstRole,
}

impl fmt::Display for ReentrancyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReentrancyMode::DepthCounter => write!(f, "depth_counter"),
            ReentrancyMode::FirstRole => write!(f, "first_role"),
        }
    }
}

impl FromStr for ReentrancyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "depth_counter" | "depth" => Ok(ReentrancyMode::DepthCounter),
            "first_role" => Ok(ReentrancyMode::FirstRole),
            other => Err(format!(
                "unknown reentrancy mode '{other}' (expected depth_counter or first_role)"
            )),
        }
    }
}
